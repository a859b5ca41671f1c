//! Content-page checks: not-found detection and the quality-page link.

use scraper::{Html, Selector};

use super::SiteProfile;

/// Checks the configured not-found phrases against the lowercased body.
///
/// Must run before any anchor search: a not-found page can still contain
/// decoy download anchors.
pub fn is_not_found_page(body: &str, profile: &SiteProfile) -> bool {
    let lowered = body.to_lowercase();
    profile
        .not_found_phrases
        .iter()
        .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}

/// Finds the anchor leading to the quality-selection page: first by a
/// `/download/` target path, then by the download-button class pattern.
/// `None` means the page has no downloadable content.
pub fn find_quality_page_link(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let strategies = [
        "a[href*='/download/']",
        "a[class*='download__btn'], a[class*='downloadBTn']",
    ];

    for raw in strategies {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(href) = document.select(&selector).find_map(|a| a.value().attr("href")) {
            return Some(href.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_PAGE: &str = r#"
    <html><body>
        <h1>مسلسل اسم الحلقة 12</h1>
        <a href="/download/abc123/">تحميل الحلقة</a>
    </body></html>"#;

    const CLASS_ONLY_PAGE: &str = r#"
    <html><body>
        <a class="btn download__btn main" href="/go/xyz">تحميل</a>
    </body></html>"#;

    const NOT_FOUND_PAGE: &str = r#"
    <html><body>
        <p>عذراً، لم يتم العثور على الصفحة المطلوبة.</p>
        <a href="/download/decoy/">روابط مقترحة</a>
    </body></html>"#;

    #[test]
    fn test_find_quality_page_link_by_target() {
        assert_eq!(
            find_quality_page_link(CONTENT_PAGE),
            Some("/download/abc123/".to_string())
        );
    }

    #[test]
    fn test_find_quality_page_link_by_class() {
        assert_eq!(find_quality_page_link(CLASS_ONLY_PAGE), Some("/go/xyz".to_string()));
    }

    #[test]
    fn test_find_quality_page_link_absent() {
        assert_eq!(find_quality_page_link("<html><body><p>nothing</p></body></html>"), None);
    }

    #[test]
    fn test_not_found_page_wins_over_decoy_anchor() {
        let profile = SiteProfile::default();
        // The phrase check fires even though a decoy download anchor exists,
        // so the caller never follows it.
        assert!(is_not_found_page(NOT_FOUND_PAGE, &profile));
        assert!(find_quality_page_link(NOT_FOUND_PAGE).is_some());
    }

    #[test]
    fn test_not_found_phrase_is_case_insensitive() {
        let profile = SiteProfile::default();
        assert!(is_not_found_page("<body>404 Page Not Found</body>", &profile));
        assert!(!is_not_found_page(CONTENT_PAGE, &profile));
    }
}
