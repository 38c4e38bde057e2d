/*
[INPUT]:  Error sources (credentials, signing, transport, serialization)
[OUTPUT]: Structured error types with attempt counts and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::SigningError;
use crate::credentials::CredentialsError;

/// A retryable failure observed on one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Network-level error or 5xx response
    Transient {
        status: Option<StatusCode>,
        message: String,
    },
    /// 429 response, with the server's Retry-After if it sent one
    RateLimited {
        status: StatusCode,
        retry_after: Option<Duration>,
    },
}

impl AttemptFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AttemptFailure::Transient { status, .. } => *status,
            AttemptFailure::RateLimited { status, .. } => Some(*status),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AttemptFailure::RateLimited { .. })
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Transient {
                status: Some(status),
                message,
            } => write!(f, "transient failure (HTTP {status}): {message}"),
            AttemptFailure::Transient {
                status: None,
                message,
            } => write!(f, "transient failure: {message}"),
            AttemptFailure::RateLimited {
                retry_after: Some(retry_after),
                ..
            } => write!(f, "rate limited, retry after {}s", retry_after.as_secs()),
            AttemptFailure::RateLimited { .. } => write!(f, "rate limited"),
        }
    }
}

/// Terminal outcome of `Transport::send` when no response is returned
#[derive(Error, Debug)]
pub enum TransportError {
    /// 4xx other than 429; never retried
    #[error("request rejected with HTTP {status} after {attempts} attempt(s): {body}")]
    Permanent {
        status: StatusCode,
        body: String,
        attempts: u32,
    },

    /// Every attempt failed transiently or was rate limited
    #[error("gave up after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: AttemptFailure },

    /// The caller's cancellation token fired
    #[error("cancelled by caller after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    /// The request could not be authenticated and was not sent
    #[error("request signing failed: {0}")]
    Signing(#[from] SigningError),

    /// Streaming bodies cannot be re-sent on retry
    #[error("request body cannot be replayed across attempts")]
    UnreplayableBody,

    /// The request itself is malformed (bad URL, bad header)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Attempts that reached the network
    pub fn attempts(&self) -> u32 {
        match self {
            TransportError::Permanent { attempts, .. }
            | TransportError::RetriesExhausted { attempts, .. }
            | TransportError::Cancelled { attempts } => *attempts,
            _ => 0,
        }
    }

    /// Status code of the last response seen, if any
    pub fn last_status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Permanent { status, .. } => Some(*status),
            TransportError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled { .. })
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, TransportError::Permanent { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, TransportError::RetriesExhausted { .. })
    }
}

/// Main error type for finlink client
#[derive(Error, Debug)]
pub enum FinlinkError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building the request or reading the response body failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FinlinkError {
    /// Whether a higher layer may reasonably try the whole call again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FinlinkError::Transport(TransportError::RetriesExhausted { .. })
        )
    }

    /// Check if error indicates an authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            FinlinkError::Credentials(_) => true,
            FinlinkError::Transport(TransportError::Signing(_)) => true,
            FinlinkError::Transport(TransportError::Permanent { status, .. }) => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}

/// Result type alias for finlink operations
pub type Result<T> = std::result::Result<T, FinlinkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InvalidCredentials;

    #[test]
    fn test_exhausted_reports_attempts_and_status() {
        let err = TransportError::RetriesExhausted {
            attempts: 4,
            last: AttemptFailure::Transient {
                status: Some(StatusCode::SERVICE_UNAVAILABLE),
                message: "Service Unavailable".to_string(),
            },
        };
        assert_eq!(err.attempts(), 4);
        assert_eq!(err.last_status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.is_exhausted());
        assert!(err.to_string().contains("gave up after 4 attempt(s)"));
    }

    #[test]
    fn test_error_retryable() {
        let exhausted = FinlinkError::from(TransportError::RetriesExhausted {
            attempts: 1,
            last: AttemptFailure::RateLimited {
                status: StatusCode::TOO_MANY_REQUESTS,
                retry_after: None,
            },
        });
        assert!(exhausted.is_retryable());

        let cancelled = FinlinkError::from(TransportError::Cancelled { attempts: 1 });
        assert!(!cancelled.is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        let rejected = FinlinkError::from(TransportError::Permanent {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
            attempts: 1,
        });
        assert!(rejected.is_auth_error());

        let invalid = FinlinkError::from(CredentialsError::InvalidCredentials {
            provider: "explicit".to_string(),
            reason: InvalidCredentials::MissingSecretKey,
        });
        assert!(invalid.is_auth_error());

        let not_found = FinlinkError::from(TransportError::Permanent {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
            attempts: 1,
        });
        assert!(!not_found.is_auth_error());
    }

    #[test]
    fn test_rate_limited_display() {
        let failure = AttemptFailure::RateLimited {
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(failure.to_string(), "rate limited, retry after 3s");
        assert!(failure.is_rate_limited());
    }
}
