pub mod download_info;
pub mod link;
pub mod pipeline;
pub mod quality_page;
pub mod redirect;
pub mod sequencer;
pub mod servers;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};

/// Site heuristics and pacing knobs.
///
/// Everything textual in here is a guess about the upstream site's markup
/// and URL shapes; there is no negotiated contract, and upstream changes
/// break these silently. Keeping them as data makes them replaceable
/// without touching the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub user_agent: String,
    /// Phrases that mark a body as a "not found" page (checked lowercased).
    pub not_found_phrases: Vec<String>,
    /// Decoded-path substrings that mark a URL as series/episode content.
    pub series_markers: Vec<String>,
    /// Title prefix that triggers truncation at the first numbered word.
    pub series_title_prefix: String,
    /// URL substrings resolved through one redirect hop before the content GET.
    pub shortener_markers: Vec<String>,
    /// A mirror anchor must carry one of these in its href or visible text.
    pub mirror_markers: Vec<String>,
    pub request_timeout_secs: u64,
    pub retry_pause_ms: u64,
    pub step_pause_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
            not_found_phrases: vec![
                "لم يتم العثور".to_string(),
                "page not found".to_string(),
                "صفحة غير موجودة".to_string(),
                "not found".to_string(),
            ],
            series_markers: vec!["مسلسل".to_string(), "الحلقة".to_string()],
            series_title_prefix: "مسلسل".to_string(),
            shortener_markers: vec!["/l/".to_string(), "reviewrate.net".to_string()],
            mirror_markers: vec!["arabseed".to_string(), "عرب سيد".to_string()],
            request_timeout_secs: 15,
            retry_pause_ms: 1200,
            step_pause_ms: 1000,
        }
    }
}

/// HTTP clients scoped to a single resolution attempt.
///
/// `http` follows redirects (hop-limited); `probe` never follows, so a raw
/// `Location` header stays readable before the client resolves it away.
/// Both share the cookie jar and default headers. Dropping the session
/// releases its connections, so every exit path cleans up by construction.
pub struct Session {
    pub http: Client,
    pub probe: Client,
}

impl Session {
    pub fn new(profile: &SiteProfile, referer: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = referer {
            headers.insert(
                REFERER,
                HeaderValue::from_str(referer).context("Referer is not a valid header value")?,
            );
        }

        let base = || {
            Client::builder()
                .user_agent(profile.user_agent.as_str())
                .default_headers(headers.clone())
                .cookie_store(true)
                .timeout(Duration::from_secs(profile.request_timeout_secs))
        };

        let http = base()
            .redirect(Policy::limited(10))
            .build()
            .context("Failed to build HTTP client")?;
        let probe = base()
            .redirect(Policy::none())
            .build()
            .context("Failed to build probing HTTP client")?;

        Ok(Self { http, probe })
    }
}
