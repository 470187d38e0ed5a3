use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;

use crate::error::BackendError;

/// Shared HTTP plumbing for the Google Cloud REST adapters.
///
/// Credential resolution happens outside this crate: callers hand in an already
/// minted bearer token, or none at all when talking to a local emulator.
#[derive(Clone)]
pub struct GcpHttpClient {
    client: reqwest::Client,
    access_token: Option<String>,
}

impl GcpHttpClient {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends `request` and turns any non-2xx reply into a [`BackendError`].
    pub async fn send(&self, request: RequestBuilder, subject: &str) -> Result<Response, BackendError> {
        let resp = self.authorize(request).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!("HTTP {} for {}: {}", status.as_u16(), subject, body);
        Err(classify_status(status, subject, &body))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Maps an HTTP failure onto the backend error taxonomy. The message from a
/// Google `{"error": {"message": ...}}` body is preferred over the raw text.
pub fn classify_status(status: StatusCode, subject: &str, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.trim().to_string());
    let detail = if message.is_empty() {
        subject.to_string()
    } else {
        format!("{}: {}", subject, message)
    };

    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::PermissionDenied(detail),
        StatusCode::TOO_MANY_REQUESTS => BackendError::QuotaExceeded(detail),
        other => BackendError::Rejected {
            status: other.as_u16(),
            message: detail,
        },
    }
}

/// Appends percent-encoded path segments to `base`. Each segment is encoded as a
/// whole, so an object name containing `/` stays a single segment.
pub fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url, BackendError> {
    let mut url =
        Url::parse(base).map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| BackendError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
