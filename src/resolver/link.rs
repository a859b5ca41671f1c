//! URL and path utilities for episode pages.
//!
//! Episode pages carry the episode number as the last all-digits segment of
//! a `-`-separated path. That segment can be read out, rewritten to walk the
//! sequence forward, and used to truncate the page title. Everything in this
//! module is pure; no I/O happens here.

use regex::Regex;
use reqwest::Url;

use super::SiteProfile;

/// `scheme://host` (with the port when one is present).
pub fn base_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}

/// Percent-decoded path of a URL.
pub fn decoded_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|parsed| decode_path(parsed.path()))
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Splits a decoded path into its `-`-separated segments. One trailing
/// `.html` page extension is stripped first so a path like `…-12.html`
/// exposes the trailing digits as their own segment.
fn path_segments(decoded_path: &str) -> Vec<&str> {
    let trimmed = decoded_path.trim_matches('/');
    let trimmed = trimmed.strip_suffix(".html").unwrap_or(trimmed);
    trimmed.split('-').collect()
}

/// Finds the episode-number segment: scanning from the last segment
/// backward, the first one that is entirely decimal digits.
///
/// This is the sole criterion for "this looks like an episode page with a
/// detectable number". It is a heuristic over the site's URL shape, not a
/// guarantee.
pub fn find_episode_segment(decoded_path: &str) -> Option<(usize, &str)> {
    path_segments(decoded_path)
        .iter()
        .enumerate()
        .rev()
        .find(|(_, segment)| {
            !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
        })
        .map(|(index, segment)| (index, *segment))
}

/// Rewrites a content URL to the given episode number.
///
/// The path is truncated to the segments up to and including the numeric
/// one, the number substituted, and the result re-encoded with query and
/// fragment dropped. `None` when no numeric segment exists.
pub fn rewrite_episode_url(url: &str, episode: u32) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let decoded = decode_path(parsed.path());
    let (index, _) = find_episode_segment(&decoded)?;

    let mut segments: Vec<String> = path_segments(&decoded)
        .into_iter()
        .take(index + 1)
        .map(str::to_string)
        .collect();
    *segments.last_mut()? = episode.to_string();

    parsed.set_path(&format!("/{}", segments.join("-")));
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// A content URL paired with its detected episode number, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    url: String,
    episode: Option<u32>,
}

impl EpisodeDescriptor {
    /// Parses a content URL. `episode()` stays `None` when the path carries
    /// no detectable all-digits segment (or one too large for `u32`).
    pub fn parse(url: &str) -> Option<Self> {
        let decoded = decoded_path(url)?;
        let episode =
            find_episode_segment(&decoded).and_then(|(_, digits)| digits.parse().ok());
        Some(Self {
            url: url.to_string(),
            episode,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn episode(&self) -> Option<u32> {
        self.episode
    }

    /// Rewrites the stored URL to the given episode number.
    pub fn url_for(&self, episode: u32) -> Option<String> {
        rewrite_episode_url(&self.url, episode)
    }
}

/// Derives a display title from the content URL's path: decode, `-` to
/// space, page extension dropped, title-cased. Titles starting with the
/// localized series prefix are truncated at the first word containing a
/// digit, which keeps "Series Name 2" instead of the fully decorated slug.
pub fn title_from_url(url: &str, profile: &SiteProfile) -> String {
    let decoded = decoded_path(url).unwrap_or_default();
    let joined = decoded.trim_matches('/').split('-').collect::<Vec<_>>().join(" ");
    let title = title_case(&joined.replace(".html", ""));

    if title.starts_with(&profile.series_title_prefix) {
        let mut kept = Vec::new();
        for word in title.split_whitespace() {
            kept.push(word);
            if word.chars().any(|c| c.is_numeric()) {
                break;
            }
        }
        return kept.join(" ");
    }
    title
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the URL's decoded path carries any of the configured series
/// markers. Heuristic only; see `SiteProfile`.
pub fn looks_like_series(url: &str, profile: &SiteProfile) -> bool {
    decoded_path(url)
        .map(|path| profile.series_markers.iter().any(|marker| path.contains(marker.as_str())))
        .unwrap_or(false)
}

/// Harvests query-parameter-shaped substrings (`[?&]key=value`) from a page
/// body, keeping the first occurrence per key and dropping keys matching
/// `exclude_prefix`. Used to reconstruct a download-trigger URL when the
/// page shows no explicit button.
pub fn harvest_dynamic_params(body: &str, exclude_prefix: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r#"[?&][A-Za-z0-9_]+=[^"&']+"#) else {
        return Vec::new();
    };

    let mut params: Vec<String> = Vec::new();
    for found in re.find_iter(body) {
        let normalized = found.as_str().trim_start_matches(['?', '&']);
        if normalized.to_lowercase().starts_with(exclude_prefix) {
            continue;
        }
        let Some((key, _)) = normalized.split_once('=') else {
            continue;
        };
        if params.iter().any(|p| p.starts_with(&format!("{}=", key))) {
            continue;
        }
        params.push(normalized.to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES_URL: &str = "https://example.site/مسلسل-اسم-الحلقة-12.html";

    #[test]
    fn test_base_url() {
        assert_eq!(
            base_url("https://m.example.site/some/path?q=1"),
            Some("https://m.example.site".to_string())
        );
        assert_eq!(
            base_url("http://example.site:8080/x"),
            Some("http://example.site:8080".to_string())
        );
        assert_eq!(base_url("not a url"), None);
    }

    #[test]
    fn test_find_episode_segment() {
        assert_eq!(find_episode_segment("/مسلسل-اسم-الحلقة-12.html"), Some((3, "12")));
        // Rightmost digits win when several segments are numeric.
        assert_eq!(find_episode_segment("/show-2-episode-5"), Some((3, "5")));
        // Decorated tails after the number are still scanned past.
        assert_eq!(
            find_episode_segment("/مسلسل-اسم-الحلقة-12-مترجمة-اون-لاين.html"),
            Some((3, "12"))
        );
    }

    #[test]
    fn test_find_episode_segment_absent() {
        assert_eq!(find_episode_segment("/فيلم-العتاولة.html"), None);
        assert_eq!(find_episode_segment("/plain-movie-title"), None);
        assert_eq!(find_episode_segment(""), None);
        // Mixed segments are not numbers.
        assert_eq!(find_episode_segment("/show-12a-final"), None);
    }

    #[test]
    fn test_rewrite_episode_url_roundtrip() {
        let rewritten = rewrite_episode_url(SERIES_URL, 13).unwrap();
        let decoded = decoded_path(&rewritten).unwrap();
        assert_eq!(find_episode_segment(&decoded), Some((3, "13")));
        // Everything before the numeric segment is untouched.
        assert!(decoded.starts_with("/مسلسل-اسم-الحلقة-"));
    }

    #[test]
    fn test_rewrite_episode_url_truncates_trailing_segments() {
        let rewritten = rewrite_episode_url("https://example.site/a-b-7-extra.html", 9).unwrap();
        assert_eq!(rewritten, "https://example.site/a-b-9");
    }

    #[test]
    fn test_rewrite_episode_url_drops_query() {
        let rewritten =
            rewrite_episode_url("https://example.site/show-3.html?ref=home#top", 4).unwrap();
        assert_eq!(rewritten, "https://example.site/show-4");
    }

    #[test]
    fn test_rewrite_episode_url_without_number() {
        assert_eq!(rewrite_episode_url("https://example.site/plain-movie", 2), None);
    }

    #[test]
    fn test_episode_descriptor() {
        let descriptor = EpisodeDescriptor::parse(SERIES_URL).unwrap();
        assert_eq!(descriptor.episode(), Some(12));

        let next = descriptor.url_for(13).unwrap();
        let reparsed = EpisodeDescriptor::parse(&next).unwrap();
        assert_eq!(reparsed.episode(), Some(13));
    }

    #[test]
    fn test_episode_descriptor_movie() {
        let descriptor = EpisodeDescriptor::parse("https://example.site/فيلم-العتاولة.html").unwrap();
        assert_eq!(descriptor.episode(), None);
        assert_eq!(descriptor.url_for(2), None);
    }

    #[test]
    fn test_title_from_url_series_truncation() {
        let profile = SiteProfile::default();
        let title = title_from_url(
            "https://example.site/مسلسل-اسم-الحلقة-12-مترجمة-اون-لاين.html",
            &profile,
        );
        assert_eq!(title, "مسلسل اسم الحلقة 12");
    }

    #[test]
    fn test_title_from_url_plain() {
        let profile = SiteProfile::default();
        let title = title_from_url("https://example.site/the-old-man.html", &profile);
        assert_eq!(title, "The Old Man");
    }

    #[test]
    fn test_looks_like_series() {
        let profile = SiteProfile::default();
        assert!(looks_like_series(SERIES_URL, &profile));
        assert!(looks_like_series("https://example.site/الحلقة-الاخيرة", &profile));
        assert!(!looks_like_series("https://example.site/فيلم-العتاولة.html", &profile));
    }

    #[test]
    fn test_harvest_dynamic_params() {
        let body = r#"<script>var u = "/go?r=991&file=ep12&sig=aa99";
            var v = "?file=other&token=zz";</script>"#;
        let params = harvest_dynamic_params(body, "r=");
        // `r` dropped, first occurrence per key wins.
        assert_eq!(params, vec!["file=ep12", "sig=aa99", "token=zz"]);
    }

    #[test]
    fn test_harvest_dynamic_params_empty() {
        assert!(harvest_dynamic_params("<p>no query strings here</p>", "r=").is_empty());
    }
}
