/*
[INPUT]:  Access key, secret key, base URL and sandbox flag from a provider
[OUTPUT]: Validated, immutable credential tuple
[POS]:    Credentials layer - data model and validity invariant
[UPDATE]: When credential fields or validity rules change
*/

use std::fmt;

use thiserror::Error;

/// Production API base URL, used when a source does not name one
pub const PRODUCTION_BASE_URL: &str = "https://api.finlink.io";

/// Sandbox API base URL, used when a sandbox source does not name one
pub const SANDBOX_BASE_URL: &str = "https://sandbox.finlink.io";

/// Credential tuple used to authenticate every outbound call
///
/// Valid iff `access_key` is non-empty and either `sandbox` is set or
/// `secret_key` is non-empty. `Debug` never prints the secret key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub sandbox: bool,
}

/// Reason a credential tuple failed the validity invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCredentials {
    #[error("access key is empty")]
    MissingAccessKey,

    #[error("secret key is empty and sandbox mode is off")]
    MissingSecretKey,
}

impl Credentials {
    /// Production credentials against the default production base URL
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            base_url: PRODUCTION_BASE_URL.to_string(),
            sandbox: false,
        }
    }

    /// Sandbox credentials; only the access key is used for authentication
    pub fn sandbox(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: String::new(),
            base_url: SANDBOX_BASE_URL.to_string(),
            sandbox: true,
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Check the validity invariant
    pub fn validate(&self) -> Result<(), InvalidCredentials> {
        if self.access_key.trim().is_empty() {
            return Err(InvalidCredentials::MissingAccessKey);
        }
        if !self.sandbox && self.secret_key.is_empty() {
            return Err(InvalidCredentials::MissingSecretKey);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Access key with everything but the first four characters masked
    pub fn redacted_access_key(&self) -> String {
        let visible: String = self.access_key.chars().take(4).collect();
        format!("{visible}****")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.secret_key.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &secret)
            .field("base_url", &self.base_url)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

/// Base URL for the given mode
pub fn default_base_url(sandbox: bool) -> &'static str {
    if sandbox {
        SANDBOX_BASE_URL
    } else {
        PRODUCTION_BASE_URL
    }
}

/// Parse a boolean flag as written in env vars and credential files
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
