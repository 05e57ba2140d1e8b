//! Shared plumbing for the HTTP capability implementations.

use crate::error::ClientError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Settings shared by every HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("ferry-migrate/{}", crate::VERSION),
        }
    }
}

impl HttpSettings {
    pub(crate) fn build_client(&self) -> Result<Client, ClientError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

/// Appends `segments` to `base`, percent-encoding each one. Empty, `.` and
/// `..` segments are rejected.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ClientError> {
    if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
        return Err(ClientError::Transport(format!("invalid path segment {bad:?}")));
    }
    let mut url =
        Url::parse(base).map_err(|e| ClientError::Transport(format!("invalid base URL {base:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::Transport(format!("{base:?} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Runs `fut` unless `ctx` fires first.
pub(crate) async fn cancellable<T>(
    ctx: &CancellationToken,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    if ctx.is_cancelled() {
        return Err(ClientError::Canceled);
    }
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(ClientError::Canceled),
        result = fut => result,
    }
}

/// Sends a request and maps failure statuses.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        format!("{status} from {url}")
    } else {
        format!("{status} from {url}: {}", truncate(&body, 200))
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(detail),
        StatusCode::NOT_FOUND => ClientError::NotFound(detail),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Conflict(detail),
        _ => ClientError::Transport(detail),
    })
}

/// Sends a request and decodes a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    send(request)
        .await?
        .json()
        .await
        .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
