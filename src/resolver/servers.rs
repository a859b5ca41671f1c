//! Mirror link enumeration on the quality-selection page.
//!
//! The page lists one anchor per mirror server. Anchors are found by the
//! known `/l/` redirect marker with structural fallbacks, filtered to the
//! configured mirror brand, and labeled with a best-effort quality derived
//! from an ordered chain of strategies.

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::SiteProfile;

pub const UNKNOWN_QUALITY: &str = "Unknown";

/// One mirror anchor with its best-effort quality label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLink {
    pub href: String,
    pub quality: String,
}

/// Lists mirror links in page order, duplicates by quality label suppressed
/// keeping the first occurrence.
pub fn enumerate_server_links(body: &str, profile: &SiteProfile) -> Vec<ServerLink> {
    let document = Html::parse_document(body);
    let anchors = collect_mirror_anchors(&document);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in anchors {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !references_mirror_brand(&anchor, href, profile) {
            continue;
        }
        let quality = quality_label(&anchor);
        if !seen.insert(quality.clone()) {
            continue;
        }
        links.push(ServerLink {
            href: href.to_string(),
            quality,
        });
    }
    links
}

/// Anchor discovery: the `/l/` marker first, then a known list container,
/// then the mirror item class pattern.
fn collect_mirror_anchors(document: &Html) -> Vec<ElementRef<'_>> {
    let strategies = [
        "a[href*='/l/']",
        "ul.downloads__links__list a",
        "a[class*='download__item'], a[class*='arabseed']",
    ];

    for raw in strategies {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let anchors: Vec<_> = document.select(&selector).collect();
        if !anchors.is_empty() {
            return anchors;
        }
    }
    Vec::new()
}

/// An anchor survives only if its target or its visible text references the
/// known mirror brand.
fn references_mirror_brand(anchor: &ElementRef, href: &str, profile: &SiteProfile) -> bool {
    let text = anchor_text(anchor);
    profile
        .mirror_markers
        .iter()
        .any(|marker| href.contains(marker.as_str()) || text.contains(marker.as_str()))
}

fn anchor_text(anchor: &ElementRef) -> String {
    anchor
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives the quality label, trying each strategy in priority order.
fn quality_label(anchor: &ElementRef) -> String {
    quality_from_ancestor(anchor)
        .or_else(|| quality_from_text(anchor))
        .or_else(|| quality_from_preceding_label(anchor))
        .unwrap_or_else(|| UNKNOWN_QUALITY.to_string())
}

/// Strategy 1: an ancestor element carrying `data-quality`.
fn quality_from_ancestor(anchor: &ElementRef) -> Option<String> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|el| el.value().attr("data-quality"))
        .map(|q| q.trim().to_string())
}

/// Strategy 2: a `<digits>p` pattern in the anchor's own text.
fn quality_from_text(anchor: &ElementRef) -> Option<String> {
    let re = Regex::new(r"(\d{3,4}p)").ok()?;
    re.captures(&anchor_text(anchor)).map(|caps| caps[1].to_string())
}

/// Strategy 3: the same pattern in the nearest preceding label-bearing
/// element (a `div` whose class mentions `txt` or `text`), searched through
/// the anchor's preceding siblings and outward through its ancestors'.
fn quality_from_preceding_label(anchor: &ElementRef) -> Option<String> {
    let re = Regex::new(r"(\d{3,4}p)").ok()?;
    for node in std::iter::once(**anchor).chain(anchor.ancestors()) {
        for sibling in node.prev_siblings() {
            let Some(element) = ElementRef::wrap(sibling) else {
                continue;
            };
            if let Some(found) = label_quality(&element, &re) {
                return Some(found);
            }
        }
    }
    None
}

fn label_quality(element: &ElementRef, re: &Regex) -> Option<String> {
    if is_label_div(element) {
        let text = element.text().collect::<Vec<_>>().join(" ");
        if let Some(caps) = re.captures(&text) {
            return Some(caps[1].to_string());
        }
    }

    let selector = Selector::parse("div[class*='txt'], div[class*='text']").ok()?;
    for div in element.select(&selector) {
        let text = div.text().collect::<Vec<_>>().join(" ");
        if let Some(caps) = re.captures(&text) {
            return Some(caps[1].to_string());
        }
    }
    None
}

fn is_label_div(element: &ElementRef) -> bool {
    element.value().name() == "div"
        && element
            .value()
            .attr("class")
            .is_some_and(|class| class.contains("txt") || class.contains("text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUALITY_PAGE: &str = r#"
    <html><body>
    <ul class="downloads__links__list">
        <li data-quality="1080p"><a href="https://mirror.example/l/abc">عرب سيد</a></li>
        <li data-quality="1080p"><a href="https://mirror.example/l/dup">عرب سيد</a></li>
        <li><a href="https://arabseed.example/l/text">تحميل 720p مباشر</a></li>
        <li><a href="https://other.example/l/foreign">سيرفر اخر</a></li>
        <li><a href="https://mirror.example/l/plain">عرب سيد</a></li>
        <li><div class="quality__txt">480p جودة</div><a href="https://mirror.example/l/labeled">عرب سيد</a></li>
    </ul>
    </body></html>"#;

    #[test]
    fn test_enumerate_server_links() {
        let profile = SiteProfile::default();
        let links = enumerate_server_links(QUALITY_PAGE, &profile);

        let pairs: Vec<(&str, &str)> = links
            .iter()
            .map(|link| (link.href.as_str(), link.quality.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                // data-quality ancestor; the second 1080p anchor is dropped.
                ("https://mirror.example/l/abc", "1080p"),
                // quality from the anchor's own text
                ("https://arabseed.example/l/text", "720p"),
                // no label anywhere before it in the list
                ("https://mirror.example/l/plain", "Unknown"),
                // preceding label-bearing sibling
                ("https://mirror.example/l/labeled", "480p"),
            ]
        );
    }

    #[test]
    fn test_brand_filter_drops_foreign_mirrors() {
        let profile = SiteProfile::default();
        let links = enumerate_server_links(QUALITY_PAGE, &profile);
        assert!(links.iter().all(|link| !link.href.contains("other.example")));
    }

    #[test]
    fn test_structural_fallback_selector() {
        let body = r#"
        <ul class="downloads__links__list">
            <li><a href="https://mirror.example/server/1">عرب سيد 1080p</a></li>
        </ul>"#;
        let links = enumerate_server_links(body, &SiteProfile::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].quality, "1080p");
    }

    #[test]
    fn test_no_mirrors() {
        assert!(enumerate_server_links("<body><a href='/x'>x</a></body>", &SiteProfile::default()).is_empty());
    }
}
