/*
[INPUT]:  Resolved credentials and outbound requests
[OUTPUT]: Requests decorated with proof of identity, or a typed signing error
[POS]:    Auth layer - selects HMAC signing or bearer auth once per client
[UPDATE]: When auth schemes or selection rules change
*/

pub mod bearer;
pub mod clock;
pub mod signer;

use std::fmt;
use std::sync::Arc;

use reqwest::Request;
use thiserror::Error;

use crate::credentials::Credentials;

pub use bearer::BearerAuth;
pub use clock::{Clock, ClockError, FixedClock, SystemClock};
pub use signer::{HmacSigner, ACCESS_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Request could not be authenticated; it must not be sent
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error("request body is a stream and cannot be signed")]
    StreamingBody,

    #[error("secret key cannot be used as an HMAC key")]
    InvalidKey,

    #[error("value for header {0} is not a valid header value")]
    InvalidHeaderValue(&'static str),
}

/// Decorates an outbound request with whatever the platform needs to
/// authenticate the caller
///
/// Implementations hold only key material and are shared across
/// concurrent requests.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Scheme name for logs
    fn scheme(&self) -> &'static str;

    fn authenticate(&self, request: &mut Request) -> Result<(), SigningError>;
}

/// Pick the authenticator for resolved credentials
///
/// Sandbox credentials get bearer auth; everything else is HMAC-signed.
pub fn authenticator_for(credentials: &Credentials, clock: Arc<dyn Clock>) -> Arc<dyn Authenticator> {
    if credentials.sandbox {
        Arc::new(BearerAuth::new(credentials))
    } else {
        Arc::new(HmacSigner::with_clock(credentials, clock))
    }
}
