/*
[INPUT]:  A configured credential source
[OUTPUT]: Credentials or a provider error that keeps the originating cause
[POS]:    Credentials layer - provider capability and error types
[UPDATE]: When adding provider failure kinds or changing diagnostics
*/

use thiserror::Error;

use super::model::{Credentials, InvalidCredentials};

/// Capability shared by every credential source
///
/// Providers are pure functions of their configured source: they read,
/// they never write, and they never touch global state.
pub trait ProvideCredentials: Send + Sync {
    /// Short provider name used in diagnostics
    fn name(&self) -> &str;

    /// Produce credentials from the source
    fn retrieve(&self) -> Result<Credentials, ProviderError>;
}

/// Why a provider could not produce credentials
#[derive(Debug, Error)]
pub enum ProviderCause {
    /// The source does not exist (unset variable, missing file, no static values)
    #[error("source not present")]
    Absent,

    /// The source exists but its content is unusable
    #[error("source malformed")]
    Malformed,

    /// The source produced a tuple that fails the validity invariant
    #[error(transparent)]
    Invalid(#[from] InvalidCredentials),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ini::ParseError),
}

/// Failure of a single provider
#[derive(Debug, Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    provider: String,
    message: String,
    #[source]
    cause: ProviderCause,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        message: impl Into<String>,
        cause: ProviderCause,
    ) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
            cause,
        }
    }

    pub fn absent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, message, ProviderCause::Absent)
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, message, ProviderCause::Malformed)
    }

    /// A provider returned a tuple that fails validation
    pub fn invalid(provider: impl Into<String>, reason: InvalidCredentials) -> Self {
        let message = format!("returned invalid credentials ({reason})");
        Self::new(provider, message, ProviderCause::Invalid(reason))
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &ProviderCause {
        &self.cause
    }

    /// True when the source simply was not there
    pub fn is_absent(&self) -> bool {
        matches!(self.cause, ProviderCause::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_provider_error_display_names_provider() {
        let err = ProviderError::absent("env", "ACCESS_KEY is not set");
        assert_eq!(err.to_string(), "env: ACCESS_KEY is not set");
        assert!(err.is_absent());
    }

    #[test]
    fn test_invalid_keeps_reason_as_source() {
        let err = ProviderError::invalid("static", InvalidCredentials::MissingSecretKey);
        assert!(!err.is_absent());
        assert!(err.message().contains("returned invalid credentials"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "secret key is empty and sandbox mode is off");
    }
}
