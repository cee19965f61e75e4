//! Common utilities and types for provider implementations

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use adminsync_core::{AdminSyncError, Result};

/// Transport settings shared by every tenant's client
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout_secs: u64,
    /// Retries for throttled (429) and 5xx responses and transport errors
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub page_size: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 0,
            retry_delay_ms: 1000,
            page_size: 200,
        }
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| {
                AdminSyncError::internal_error(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_retries: settings.max_retries,
            retry_delay_ms: settings.retry_delay_ms,
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute a request, retrying transient failures.
    ///
    /// Client errors other than 429 are returned immediately as
    /// `DirectoryRejected`; everything else that is not a success ends up as
    /// `DirectoryUnavailable` once retries are exhausted. Requests with a
    /// non-idempotent method are only retried on 429, which Okta rejects
    /// before doing any work.
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let idempotent = request_builder
            .try_clone()
            .and_then(|rb| rb.build().ok())
            .map(|request| is_idempotent(request.method()))
            .unwrap_or(false);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay_ms * 2u64.pow(attempt - 1);
                debug!(attempt, delay_ms = delay, "Retrying directory request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let rb = request_builder.try_clone().ok_or_else(|| {
                AdminSyncError::internal_error("Request cannot be cloned for retry")
            })?;

            match rb.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.is_redirection() {
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let message = error_summary(&body);

                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(AdminSyncError::directory_rejected(status.as_u16(), message));
                    }

                    warn!(status = status.as_u16(), "Directory request failed: {}", message);
                    let error = format!("HTTP {} - {}", status, message);
                    if !idempotent && status != StatusCode::TOO_MANY_REQUESTS {
                        return Err(AdminSyncError::directory_unavailable(error));
                    }
                    last_error = Some(error);
                }
                Err(e) => {
                    warn!("Directory request failed: {}", e);
                    if !idempotent {
                        return Err(AdminSyncError::directory_unavailable(e.to_string()));
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(AdminSyncError::directory_unavailable(format!(
            "Request failed after {} retries: {}",
            self.max_retries,
            last_error.unwrap_or_default()
        )))
    }
}

/// Methods that are safe to send again after an unknown outcome
fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::PUT, Method::DELETE, Method::OPTIONS].contains(method)
}

/// Okta error body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: Option<String>,
    error_summary: Option<String>,
}

/// Best-effort human-readable message from an error response body
pub(crate) fn error_summary(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error_code: Some(code),
            error_summary: Some(summary),
        }) => format!("{} ({})", summary, code),
        Ok(ErrorBody {
            error_summary: Some(summary),
            ..
        }) => summary,
        _ => body.trim().to_string(),
    }
}

/// Parse an RFC 8288 `Link` header and return the `rel="next"` target
pub fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let parts: Vec<&str> = part.split(';').map(str::trim).collect();
        if parts.len() < 2 {
            continue;
        }
        let is_next = parts[1..]
            .iter()
            .any(|p| p.eq_ignore_ascii_case("rel=\"next\"") || p.eq_ignore_ascii_case("rel=next"));
        if !is_next {
            continue;
        }
        let url = parts[0];
        if url.starts_with('<') && url.ends_with('>') && url.len() > 2 {
            return Some(url[1..url.len() - 1].to_string());
        }
    }
    None
}
