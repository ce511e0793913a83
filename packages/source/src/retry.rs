//! HTTP retry helper for transient errors.
//!
//! Feed downloads go through [`send_bytes`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so connection failures,
//! timeouts, rate limiting, and server errors get a bounded number of
//! retries with exponential backoff before the run gives up.

use std::time::Duration;

use crate::SourceError;

/// Returns the delay before retry number `attempt` (1-based): 2s, 4s, 8s...
#[must_use]
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Sends an HTTP request and returns the full response body.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
/// Each attempt is bounded by the client's timeout.
///
/// Retries up to `max_retries` times on connection errors, timeouts,
/// HTTP 429, HTTP 5xx, and body read failures. HTTP 4xx (except 429) is
/// permanent and returned immediately.
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after all retries
/// or the server returns a non-retryable status code.
pub async fn send_bytes<F>(build_request: F, max_retries: u32) -> Result<Vec<u8>, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
        };

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            if attempt < max_retries {
                log::warn!("  HTTP {status}");
                last_error = Some(SourceError::Fetch {
                    message: format!("HTTP {status}"),
                });
                continue;
            }
            return Err(SourceError::Fetch {
                message: format!("HTTP {status} after {max_retries} retries"),
            });
        }

        if !status.is_success() {
            return Err(SourceError::Fetch {
                message: format!("HTTP {status}"),
            });
        }

        match response.bytes().await {
            Ok(body) => {
                log::debug!("Downloaded {} bytes", body.len());
                return Ok(body.to_vec());
            }
            Err(e) => {
                if attempt < max_retries {
                    log::warn!("  body read failed: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| SourceError::Fetch {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
