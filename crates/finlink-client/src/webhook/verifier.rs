/*
[INPUT]:  Inbound webhook method, headers, raw body, shared secret, clock
[OUTPUT]: Verified WebhookMetadata or a WebhookError carrying its HTTP status
[POS]:    Webhook layer - authenticity and freshness checks before dispatch
[UPDATE]: When header names, tolerance rules or the status mapping change
*/

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{Clock, ClockError, SystemClock};

use super::signature::verify_webhook_signature;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
pub const EVENT_ID_HEADER: &str = "x-webhook-event-id";
pub const EVENT_TYPE_HEADER: &str = "x-webhook-event-type";
pub const DELIVERY_ID_HEADER: &str = "x-webhook-delivery-id";

pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Receiver settings
#[derive(Clone)]
pub struct WebhookConfig {
    pub secret: String,
    /// Maximum allowed |now - timestamp|, inclusive
    pub tolerance: Duration,
    /// Skip signature and freshness checks entirely
    pub sandbox: bool,
    pub max_body_bytes: usize,
}

impl WebhookConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
            sandbox: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sandbox receiver; accepts unsigned deliveries
    pub fn sandbox() -> Self {
        Self {
            sandbox: true,
            ..Self::new("")
        }
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn validate(&self) -> Result<(), WebhookConfigError> {
        if !self.sandbox && self.secret.is_empty() {
            return Err(WebhookConfigError::MissingSecret);
        }
        if self.max_body_bytes == 0 {
            return Err(WebhookConfigError::ZeroBodyLimit);
        }
        Ok(())
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &if self.secret.is_empty() { "<unset>" } else { "<redacted>" })
            .field("tolerance", &self.tolerance)
            .field("sandbox", &self.sandbox)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookConfigError {
    #[error("webhook secret must be set unless sandbox mode is enabled")]
    MissingSecret,

    #[error("max body size must be greater than zero")]
    ZeroBodyLimit,
}

/// Delivery attributes taken from the request headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMetadata {
    pub event_id: String,
    pub event_type: String,
    pub delivery_id: String,
    pub timestamp: DateTime<Utc>,
    pub raw_unix_seconds: i64,
}

/// Why a delivery was rejected
///
/// `Display` is for logs. Responses use `public_message`, which never
/// says which check failed beyond the status class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("body of {size} bytes exceeds the {limit}-byte limit")]
    BodyTooLarge { size: u64, limit: usize },

    #[error("missing {0} header")]
    MissingAuthHeader(&'static str),

    #[error("timestamp header is not a Unix timestamp")]
    MalformedTimestamp,

    #[error("timestamp is {skew_secs}s from now, tolerance is {tolerance_secs}s")]
    StaleTimestamp { skew_secs: i64, tolerance_secs: u64 },

    #[error("signature verification failed")]
    BadSignature,

    #[error(transparent)]
    Clock(#[from] ClockError),

    /// Verified, but there is no Tokio runtime to run the handler on
    #[error("no async runtime available for the handler")]
    NoRuntime,
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            WebhookError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::MalformedTimestamp => StatusCode::BAD_REQUEST,
            WebhookError::MissingAuthHeader(_)
            | WebhookError::StaleTimestamp { .. }
            | WebhookError::BadSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Clock(_) | WebhookError::NoRuntime => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::MethodNotAllowed(_) => "method not allowed",
            WebhookError::BodyTooLarge { .. } => "payload too large",
            WebhookError::MalformedTimestamp => "invalid timestamp",
            WebhookError::MissingAuthHeader(_)
            | WebhookError::StaleTimestamp { .. }
            | WebhookError::BadSignature => "unauthorized",
            WebhookError::Clock(_) | WebhookError::NoRuntime => "internal error",
        }
    }
}

/// Checks inbound deliveries against the shared secret
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    config: WebhookConfig,
    clock: Arc<dyn Clock>,
}

impl WebhookVerifier {
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: WebhookConfig, clock: Arc<dyn Clock>) -> Result<Self, WebhookConfigError> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Reject a request whose declared Content-Length is over the limit
    ///
    /// Lets a server refuse before buffering the body. `verify` still
    /// checks the actual length.
    pub fn check_content_length(&self, headers: &HeaderMap) -> Result<(), WebhookError> {
        let declared = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        match declared {
            Some(size) if size > self.config.max_body_bytes as u64 => Err(WebhookError::BodyTooLarge {
                size,
                limit: self.config.max_body_bytes,
            }),
            _ => Ok(()),
        }
    }

    /// Run every check in order and return the delivery's metadata
    ///
    /// Order: method, body size, required headers, timestamp format,
    /// freshness, signature. In sandbox mode only the first two apply.
    pub fn verify(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<WebhookMetadata, WebhookError> {
        if *method != Method::POST {
            return Err(WebhookError::MethodNotAllowed(method.clone()));
        }

        if body.len() > self.config.max_body_bytes {
            return Err(WebhookError::BodyTooLarge {
                size: body.len() as u64,
                limit: self.config.max_body_bytes,
            });
        }

        if self.config.sandbox {
            return self.sandbox_metadata(headers);
        }

        let signature =
            header_str(headers, SIGNATURE_HEADER).ok_or(WebhookError::MissingAuthHeader(SIGNATURE_HEADER))?;
        let raw_timestamp = headers
            .get(TIMESTAMP_HEADER)
            .ok_or(WebhookError::MissingAuthHeader(TIMESTAMP_HEADER))?
            .to_str()
            .map_err(|_| WebhookError::MalformedTimestamp)?
            .trim();
        if raw_timestamp.is_empty() {
            return Err(WebhookError::MissingAuthHeader(TIMESTAMP_HEADER));
        }

        let unix_seconds = raw_timestamp
            .parse::<i64>()
            .map_err(|_| WebhookError::MalformedTimestamp)?;
        let timestamp =
            DateTime::<Utc>::from_timestamp(unix_seconds, 0).ok_or(WebhookError::MalformedTimestamp)?;

        let now = self.clock.now_unix()?;
        let skew_secs = now.saturating_sub(unix_seconds);
        let tolerance_secs = self.config.tolerance.as_secs();
        if skew_secs.unsigned_abs() > tolerance_secs {
            return Err(WebhookError::StaleTimestamp {
                skew_secs,
                tolerance_secs,
            });
        }

        if !verify_webhook_signature(&self.config.secret, raw_timestamp, body, signature) {
            return Err(WebhookError::BadSignature);
        }

        Ok(metadata(headers, timestamp, unix_seconds))
    }

    fn sandbox_metadata(&self, headers: &HeaderMap) -> Result<WebhookMetadata, WebhookError> {
        let supplied = header_str(headers, TIMESTAMP_HEADER)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0).map(|ts| (secs, ts)));

        let (unix_seconds, timestamp) = match supplied {
            Some(pair) => pair,
            None => {
                let now = self.clock.now_unix()?;
                let ts = DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_else(Utc::now);
                (now, ts)
            }
        };

        Ok(metadata(headers, timestamp, unix_seconds))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
}

fn metadata(headers: &HeaderMap, timestamp: DateTime<Utc>, unix_seconds: i64) -> WebhookMetadata {
    let text = |name: &str| header_str(headers, name).unwrap_or_default().trim().to_string();
    WebhookMetadata {
        event_id: text(EVENT_ID_HEADER),
        event_type: text(EVENT_TYPE_HEADER),
        delivery_id: text(DELIVERY_ID_HEADER),
        timestamp,
        raw_unix_seconds: unix_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FixedClock;
    use crate::webhook::sign_webhook;
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    const NOW: i64 = 1_700_000_000;

    fn verifier(clock_now: i64) -> WebhookVerifier {
        WebhookVerifier::with_clock(WebhookConfig::new("s"), Arc::new(FixedClock::new(clock_now))).unwrap()
    }

    fn signed_headers(timestamp: &str, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers.insert(EVENT_ID_HEADER, HeaderValue::from_static("evt_1"));
        headers.insert(EVENT_TYPE_HEADER, HeaderValue::from_static("payment.settled"));
        headers.insert(DELIVERY_ID_HEADER, HeaderValue::from_static("dlv_1"));
        headers
    }

    #[test]
    fn test_valid_delivery() {
        let body = br#"{"a":1}"#;
        let signature = sign_webhook("s", NOW, body).unwrap();
        let metadata = verifier(NOW)
            .verify(&Method::POST, &signed_headers("1700000000", &signature), body)
            .unwrap();

        assert_eq!(metadata.event_id, "evt_1");
        assert_eq!(metadata.event_type, "payment.settled");
        assert_eq!(metadata.delivery_id, "dlv_1");
        assert_eq!(metadata.raw_unix_seconds, NOW);
        assert_eq!(metadata.timestamp.timestamp(), NOW);
    }

    #[test]
    fn test_reversed_signature_rejected() {
        let body = br#"{"a":1}"#;
        let reversed: String = sign_webhook("s", NOW, body).unwrap().chars().rev().collect();
        let err = verifier(NOW)
            .verify(&Method::POST, &signed_headers("1700000000", &reversed), body)
            .unwrap_err();
        assert_eq!(err, WebhookError::BadSignature);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case::exactly_at_tolerance(NOW - 300, true)]
    #[case::just_inside(NOW - 299, true)]
    #[case::just_outside(NOW - 301, false)]
    #[case::future_at_tolerance(NOW + 300, true)]
    #[case::future_outside(NOW + 301, false)]
    fn test_freshness_window(#[case] timestamp: i64, #[case] accepted: bool) {
        let body = b"{}";
        let signature = sign_webhook("s", timestamp, body).unwrap();
        let result = verifier(NOW).verify(
            &Method::POST,
            &signed_headers(&timestamp.to_string(), &signature),
            body,
        );

        if accepted {
            assert!(result.is_ok(), "{timestamp} should be accepted: {result:?}");
        } else {
            assert!(matches!(result, Err(WebhookError::StaleTimestamp { .. })));
        }
    }

    #[test]
    fn test_status_mapping() {
        let v = verifier(NOW);
        let body = b"{}";

        let err = v.verify(&Method::GET, &HeaderMap::new(), body).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let err = v.verify(&Method::POST, &HeaderMap::new(), body).unwrap_err();
        assert_eq!(err, WebhookError::MissingAuthHeader(SIGNATURE_HEADER));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = v
            .verify(&Method::POST, &signed_headers("yesterday", "00"), body)
            .unwrap_err();
        assert_eq!(err, WebhookError::MalformedTimestamp);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_body_limit() {
        let config = WebhookConfig::new("s").with_max_body_bytes(8);
        let v = WebhookVerifier::with_clock(config, Arc::new(FixedClock::new(NOW))).unwrap();

        let err = v.verify(&Method::POST, &HeaderMap::new(), &[0u8; 9]).unwrap_err();
        assert_eq!(err, WebhookError::BodyTooLarge { size: 9, limit: 8 });
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));
        assert!(v.check_content_length(&headers).is_err());
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("8"));
        assert!(v.check_content_length(&headers).is_ok());
    }

    #[test]
    fn test_sandbox_skips_signature_and_freshness() {
        let v = WebhookVerifier::with_clock(WebhookConfig::sandbox(), Arc::new(FixedClock::new(NOW))).unwrap();

        let metadata = v.verify(&Method::POST, &signed_headers("42", "garbage"), b"{}").unwrap();
        assert_eq!(metadata.raw_unix_seconds, 42);

        let metadata = v.verify(&Method::POST, &HeaderMap::new(), b"{}").unwrap();
        assert_eq!(metadata.raw_unix_seconds, NOW);
        assert_eq!(metadata.event_id, "");
    }

    #[test]
    fn test_production_requires_secret() {
        assert_eq!(
            WebhookVerifier::new(WebhookConfig::new("")).unwrap_err(),
            WebhookConfigError::MissingSecret
        );
        assert!(WebhookVerifier::new(WebhookConfig::sandbox()).is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", WebhookConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
