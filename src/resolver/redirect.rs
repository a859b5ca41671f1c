//! Redirect resolution for mirror and shortener links.

use reqwest::header::LOCATION;

use super::Session;

/// Resolves one redirect hop, preferring the raw `Location` header.
///
/// The upstream site answers some mirror links with a redirect the client
/// would otherwise chase through information-losing intermediate hops, so a
/// probe request (redirects disabled) reads the first hop verbatim. When no
/// `Location` is present the request is repeated with redirects followed
/// (hop-limited by the client) and the final effective URL is returned.
/// Any network fault yields `None`.
pub async fn follow_redirect(session: &Session, url: &str) -> Option<String> {
    let probed = session.probe.get(url).send().await.ok()?;
    if let Some(location) = probed.headers().get(LOCATION) {
        return location.to_str().ok().map(str::to_string);
    }

    let followed = session.http.get(url).send().await.ok()?;
    Some(followed.url().to_string())
}
