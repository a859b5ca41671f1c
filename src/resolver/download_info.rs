//! Multi-hop extraction of the direct download link from one mirror.
//!
//! A mirror link resolves through: redirect hop → a gateway page carrying a
//! `?r=` token → a trigger page → the final page holding the direct file
//! link. Markup differs between mirrors and changes without notice, so each
//! lookup is an ordered chain of strategies and any miss abandons just this
//! mirror, never the whole episode.

use regex::Regex;
use scraper::{Html, Selector};

use super::Session;
use super::link::{base_url, harvest_dynamic_params};
use super::redirect::follow_redirect;

/// Direct link plus file metadata for one resolved mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub direct_link: String,
    pub file_name: String,
    pub file_size: String,
}

const GATEWAY_MARKER: &str = "?r=";

/// Resolves one mirror link into its direct download info.
///
/// The session must carry the quality page's referer; the gateway rejects
/// requests without it. Any network or parse fault yields `None`.
pub async fn get_download_info(session: &Session, server_href: &str) -> Option<DownloadInfo> {
    let resolved = follow_redirect(session, server_href).await?;

    let gateway_url = if resolved.contains(GATEWAY_MARKER) {
        resolved
    } else {
        locate_gateway_url(session, &resolved).await?
    };

    let gateway_body = fetch_body(session, &gateway_url).await?;
    let trigger_url = find_trigger_url(&gateway_body, &gateway_url);

    let trigger_body = fetch_body(session, &trigger_url).await?;
    let final_link = find_final_link(&trigger_body, &trigger_url)?;

    let file_name =
        extract_file_name(&trigger_body).unwrap_or_else(|| last_path_segment(&final_link));
    let file_size = extract_file_size(&trigger_body).unwrap_or_else(|| "Unknown".to_string());

    tracing::debug!("Mirror resolved to {} ({})", file_name, file_size);

    Some(DownloadInfo {
        direct_link: sanitize_direct_link(&final_link),
        file_name,
        file_size,
    })
}

async fn fetch_body(session: &Session, url: &str) -> Option<String> {
    session.http.get(url).send().await.ok()?.text().await.ok()
}

/// Fetches the redirect target and hunts the `?r=` gateway URL: first in the
/// body text, then the response's own effective URL, then its `Location`
/// header.
async fn locate_gateway_url(session: &Session, resolved: &str) -> Option<String> {
    let response = session.http.get(resolved).send().await.ok()?;
    let effective_url = response.url().to_string();
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.ok()?;

    find_gateway_in_body(&body)
        .or_else(|| effective_url.contains(GATEWAY_MARKER).then_some(effective_url))
        .or_else(|| location.filter(|l| l.contains(GATEWAY_MARKER)))
}

fn find_gateway_in_body(body: &str) -> Option<String> {
    let re = Regex::new(r#"https?://[^"'>\s]+/category/downloadz/\?r=\d+[^"'>\s]*"#).ok()?;
    re.find(body).map(|found| found.as_str().to_string())
}

/// Locates the download-trigger URL on the gateway page: the button anchor
/// by id then class, else the gateway URL with harvested dynamic parameters
/// appended, else the gateway URL itself.
fn find_trigger_url(gateway_body: &str, gateway_url: &str) -> String {
    if let Some(href) = find_button_href(gateway_body) {
        return resolve_root_relative(&href, gateway_url);
    }

    let params = harvest_dynamic_params(gateway_body, "r=");
    if params.is_empty() {
        return gateway_url.to_string();
    }
    let separator = if gateway_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", gateway_url, separator, params.join("&"))
}

/// Button anchor lookup shared by the gateway and trigger pages: by id,
/// then by class, in that priority order.
fn find_button_href(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    for raw in ["a#btn", "a.downloadbtn"] {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(href) = document.select(&selector).find_map(|a| a.value().attr("href")) {
            return Some(href.to_string());
        }
    }
    None
}

/// Locates the final direct-file anchor: the button lookup first, then any
/// href ending in a known video extension.
fn find_final_link(trigger_body: &str, trigger_url: &str) -> Option<String> {
    let href = find_button_href(trigger_body).or_else(|| find_video_href(trigger_body))?;
    Some(resolve_root_relative(&href, trigger_url))
}

const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".m4v", ".mkv", ".webm", ".avi"];

fn find_video_href(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| {
            let path = href.split(['?', '#']).next().unwrap_or(href).to_lowercase();
            VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
        .map(str::to_string)
}

/// Root-relative hrefs resolve against the page's own host.
fn resolve_root_relative(href: &str, page_url: &str) -> String {
    if href.starts_with('/') {
        if let Some(base) = base_url(page_url) {
            return format!("{}{}", base, href);
        }
    }
    href.to_string()
}

/// File name from the known label position on the final page.
fn extract_file_name(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse(".TitleCenteral h3 span").ok()?;
    let name = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!name.is_empty()).then_some(name)
}

/// File size from the second label position, else a localized "size:" scan
/// over the first heading.
fn extract_file_size(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    let labeled = Selector::parse(".TitleCenteral h3:nth-of-type(2) span").ok()?;
    if let Some(span) = document.select(&labeled).next() {
        let size = span.text().collect::<String>().trim().to_string();
        if !size.is_empty() {
            return Some(size);
        }
    }

    let heading = Selector::parse("h3").ok()?;
    let text = document
        .select(&heading)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let re = Regex::new(r"الحجم[:\s\-–]*([\d.,]+\s*(?:MB|GB))").ok()?;
    re.captures(&text).map(|caps| caps[1].to_string())
}

fn last_path_segment(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// Some hosts emit final links containing literal spaces, which break HTTP
/// clients; re-encode them.
fn sanitize_direct_link(link: &str) -> String {
    link.replace(' ', "%20")
}
