/*
[INPUT]:  Prepared reqwest::Request, idempotency flag, caller cancellation token
[OUTPUT]: Successful response or one terminal TransportError
[POS]:    HTTP layer - authenticate, classify, retry with backoff
[UPDATE]: When changing failure classification or retry loop behavior
*/

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, Request, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::auth::Authenticator;

use super::error::{AttemptFailure, TransportError};
use super::retry::{parse_retry_after, RetryConfig};

/// Header carrying the caller's idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const ERROR_BODY_LIMIT: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Success,
    Transient,
    RateLimited,
    Permanent,
}

fn classify(status: StatusCode) -> Classification {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Classification::RateLimited
    } else if status.is_server_error() {
        Classification::Transient
    } else if status.is_client_error() {
        Classification::Permanent
    } else {
        Classification::Success
    }
}

/// Executes requests through the authenticator with bounded retries
///
/// Holds only read-only state, so one instance can serve any number of
/// concurrent callers. Each call's attempts run sequentially on the
/// calling task.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    authenticator: Arc<dyn Authenticator>,
    retry: RetryConfig,
    span: Span,
}

impl Transport {
    pub fn new(http: Client, authenticator: Arc<dyn Authenticator>, retry: RetryConfig) -> Self {
        Self {
            http,
            authenticator,
            retry,
            span: info_span!("finlink_transport"),
        }
    }

    /// Emit transport events inside the given span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Send a request, retrying transient and rate-limited failures
    ///
    /// With `idempotent` set and no `Idempotency-Key` header on the request,
    /// one key is generated before the first attempt. Whatever key the
    /// request carries is sent unchanged on every attempt.
    pub async fn send(
        &self,
        mut request: Request,
        idempotent: bool,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        if idempotent && !request.headers().contains_key(IDEMPOTENCY_KEY_HEADER) {
            let key = HeaderValue::from_str(&Uuid::new_v4().to_string()).map_err(|_| {
                TransportError::InvalidRequest("generated idempotency key".to_string())
            })?;
            request.headers_mut().insert(IDEMPOTENCY_KEY_HEADER, key);
        }

        self.run(request, cancel).instrument(self.span.clone()).await
    }

    async fn run(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        let method = request.method().clone();
        let path = request.url().path().to_string();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled { attempts });
            }

            let mut attempt = request
                .try_clone()
                .ok_or(TransportError::UnreplayableBody)?;
            self.authenticator.authenticate(&mut attempt)?;
            attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%method, %path, attempt = attempts, "request cancelled in flight");
                    return Err(TransportError::Cancelled { attempts });
                }
                outcome = self.http.execute(attempt) => outcome,
            };

            let failure = match outcome {
                Ok(response) => {
                    let status = response.status();
                    match classify(status) {
                        Classification::Success => {
                            debug!(%method, %path, %status, attempt = attempts, "request succeeded");
                            return Ok(response);
                        }
                        Classification::Permanent => {
                            let body = read_error_body(response).await;
                            warn!(%method, %path, %status, attempt = attempts, "request rejected");
                            return Err(TransportError::Permanent {
                                status,
                                body,
                                attempts,
                            });
                        }
                        Classification::RateLimited => AttemptFailure::RateLimited {
                            status,
                            retry_after: response
                                .headers()
                                .get(RETRY_AFTER)
                                .and_then(|value| value.to_str().ok())
                                .and_then(|value| parse_retry_after(value, Utc::now())),
                        },
                        Classification::Transient => AttemptFailure::Transient {
                            status: Some(status),
                            message: status
                                .canonical_reason()
                                .unwrap_or("server error")
                                .to_string(),
                        },
                    }
                }
                Err(err) if err.is_builder() => {
                    return Err(TransportError::InvalidRequest(err.to_string()));
                }
                Err(err) => AttemptFailure::Transient {
                    status: err.status(),
                    message: err.to_string(),
                },
            };

            let retry = attempts - 1;
            if retry >= self.retry.max_retries {
                warn!(%method, %path, attempts, failure = %failure, "retries exhausted");
                return Err(TransportError::RetriesExhausted {
                    attempts,
                    last: failure,
                });
            }

            let mut delay = self.retry.delay_for(retry);
            if let AttemptFailure::RateLimited {
                retry_after: Some(retry_after),
                ..
            } = &failure
            {
                // Honored even past max_backoff; cancel the token to give up sooner.
                if *retry_after > self.retry.max_backoff {
                    warn!(
                        %method,
                        %path,
                        retry_after_secs = retry_after.as_secs(),
                        max_backoff_ms = self.retry.max_backoff.as_millis() as u64,
                        "server requested a wait beyond max backoff"
                    );
                }
                delay = delay.max(*retry_after);
            }

            warn!(
                %method,
                %path,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                failure = %failure,
                "retrying request"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%method, %path, attempts, "request cancelled during backoff");
                    return Err(TransportError::Cancelled { attempts });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

// Reads at most ERROR_BODY_LIMIT bytes; the rest of the body is never buffered.
async fn read_error_body(mut response: Response) -> String {
    let mut buf = Vec::new();
    while buf.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(ERROR_BODY_LIMIT - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    truncate_utf8(&buf)
}

fn truncate_utf8(bytes: &[u8]) -> String {
    let valid = match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        // Only a character split at the cut is dropped.
        Err(err) if err.error_len().is_none() => err.valid_up_to(),
        Err(_) => bytes.len(),
    };
    String::from_utf8_lossy(&bytes[..valid]).into_owned()
}
