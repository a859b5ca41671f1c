//! Content-page resolution: one episode URL in, download candidates out.

use reqwest::StatusCode;
use tokio::time::{Duration, sleep};

use super::download_info::{DownloadInfo, get_download_info};
use super::link::{base_url, title_from_url};
use super::quality_page::{find_quality_page_link, is_not_found_page};
use super::redirect::follow_redirect;
use super::servers::{ServerLink, enumerate_server_links};
use super::{Session, SiteProfile};

/// One selectable download option for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCandidate {
    pub quality: String,
    pub file_size: String,
    pub direct_link: String,
}

impl DownloadCandidate {
    /// Transport-facing button label.
    pub fn label(&self) -> String {
        format!("[ {} ]  •  {}", self.file_size, self.quality)
    }
}

/// A fully resolved episode ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEpisode {
    pub title: String,
    pub candidates: Vec<DownloadCandidate>,
}

/// Tri-state result of resolving one content URL.
///
/// `Indeterminate` marks a transient fault; callers may retry once before
/// treating it as `NotFound`. `NotFound` is structural (missing page or
/// markup) and retrying it cannot help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Found(ResolvedEpisode),
    NotFound,
    Indeterminate,
}

/// Seam between the sequencer and the live pipeline, so sequencing is
/// testable against a scripted resolver.
pub trait EpisodeResolver {
    fn resolve(&self, url: &str) -> impl std::future::Future<Output = ResolutionOutcome> + Send;
}

/// Live resolution pipeline against the upstream site.
pub struct SitePipeline {
    profile: SiteProfile,
}

enum PageFetch {
    Body(String),
    NotFound,
    Fault,
}

impl SitePipeline {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    /// Fetches the content page; a 404 is terminal, any other non-200 gets
    /// a short pause and a single retry.
    async fn fetch_content_page(&self, session: &Session, url: &str) -> PageFetch {
        let response = match session.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!("Content page fetch failed: {err:?}");
                return PageFetch::Fault;
            }
        };

        let response = if response.status() == StatusCode::NOT_FOUND {
            return PageFetch::NotFound;
        } else if response.status() != StatusCode::OK {
            sleep(Duration::from_millis(self.profile.retry_pause_ms)).await;
            match session.http.get(url).send().await {
                Ok(retried) if retried.status() == StatusCode::OK => retried,
                Ok(_) => return PageFetch::NotFound,
                Err(_) => return PageFetch::Fault,
            }
        } else {
            response
        };

        match response.text().await {
            Ok(body) => PageFetch::Body(body),
            Err(_) => PageFetch::Fault,
        }
    }

    /// Fetches the quality-selection page; the site expects the content
    /// page's host as referer.
    async fn fetch_quality_page(&self, session: &Session, url: &str, referer: &str) -> PageFetch {
        let request = session.http.get(url).header(reqwest::header::REFERER, referer);
        let response = match request.send().await {
            Ok(response) => response,
            Err(_) => return PageFetch::Fault,
        };
        if response.status() != StatusCode::OK {
            return PageFetch::NotFound;
        }
        match response.text().await {
            Ok(body) => PageFetch::Body(body),
            Err(_) => PageFetch::Fault,
        }
    }
}

/// Structural read of a fetched content body: the quality-page link, unless
/// the body is a not-found page (checked first, decoy anchors exist).
/// `None` is a `NotFound` for the whole pipeline, never `Indeterminate`.
fn quality_link_from_content(body: &str, profile: &SiteProfile) -> Option<String> {
    if is_not_found_page(body, profile) {
        return None;
    }
    find_quality_page_link(body)
}

/// Resolves each mirror in order, keeping successes. One mirror's failure
/// never aborts the others; partial success is a success.
pub async fn collect_candidates<F>(servers: &[ServerLink], fetch: F) -> Vec<DownloadCandidate>
where
    F: AsyncFn(&ServerLink) -> Option<DownloadInfo>,
{
    let mut candidates = Vec::new();
    for server in servers {
        match fetch(server).await {
            Some(info) => {
                candidates.push(DownloadCandidate {
                    quality: server.quality.clone(),
                    file_size: info.file_size,
                    direct_link: info.direct_link,
                });
            }
            None => {
                tracing::debug!("Mirror for {} failed to resolve, skipping", server.quality);
            }
        }
    }
    candidates
}

impl EpisodeResolver for SitePipeline {
    async fn resolve(&self, url: &str) -> ResolutionOutcome {
        let Ok(session) = Session::new(&self.profile, None) else {
            return ResolutionOutcome::Indeterminate;
        };

        // Shortener links get one redirect hop before the content fetch.
        let mut content_url = url.to_string();
        if self
            .profile
            .shortener_markers
            .iter()
            .any(|marker| content_url.contains(marker.as_str()))
        {
            if let Some(resolved) = follow_redirect(&session, &content_url).await {
                content_url = resolved;
            }
        }

        let body = match self.fetch_content_page(&session, &content_url).await {
            PageFetch::Body(body) => body,
            PageFetch::NotFound => return ResolutionOutcome::NotFound,
            PageFetch::Fault => return ResolutionOutcome::Indeterminate,
        };

        let Some(quality_href) = quality_link_from_content(&body, &self.profile) else {
            return ResolutionOutcome::NotFound;
        };
        let Some(base) = base_url(&content_url) else {
            return ResolutionOutcome::NotFound;
        };
        let quality_page_url = if quality_href.starts_with('/') {
            format!("{}{}", base, quality_href)
        } else {
            quality_href
        };

        let referer = format!("{}/", base);
        let quality_body = match self
            .fetch_quality_page(&session, &quality_page_url, &referer)
            .await
        {
            PageFetch::Body(body) => body,
            PageFetch::NotFound => return ResolutionOutcome::NotFound,
            PageFetch::Fault => return ResolutionOutcome::Indeterminate,
        };

        let servers = enumerate_server_links(&quality_body, &self.profile);
        if servers.is_empty() {
            return ResolutionOutcome::NotFound;
        }
        tracing::debug!("Found {} mirror link(s) for {}", servers.len(), content_url);

        let mirror_referer = base_url(&quality_page_url)
            .map(|b| format!("{}/", b))
            .unwrap_or(referer);
        let mirror_profile = self.profile.clone();
        let candidates = collect_candidates(&servers, move |server: &ServerLink| {
            // Fresh cookie-carrying session per mirror, referer included.
            let href = server.href.clone();
            let profile = mirror_profile.clone();
            let referer = mirror_referer.clone();
            Box::pin(async move {
                let session = Session::new(&profile, Some(&referer)).ok()?;
                get_download_info(&session, &href).await
            }) as std::pin::Pin<
                Box<dyn std::future::Future<Output = Option<DownloadInfo>> + Send>,
            >
        })
        .await;

        if candidates.is_empty() {
            return ResolutionOutcome::NotFound;
        }

        ResolutionOutcome::Found(ResolvedEpisode {
            title: title_from_url(&content_url, &self.profile),
            candidates,
        })
    }
}
