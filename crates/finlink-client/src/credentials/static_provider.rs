/*
[INPUT]:  Credential values passed explicitly by the caller
[OUTPUT]: Credentials built from those values
[POS]:    Credentials layer - highest-priority provider
[UPDATE]: When explicit configuration options change
*/

use std::fmt;

use super::model::{default_base_url, Credentials};
use super::provider::{ProvideCredentials, ProviderError};

const NAME: &str = "static";

/// Explicitly configured credentials
#[derive(Clone, Default)]
pub struct StaticProvider {
    access_key: Option<String>,
    secret_key: Option<String>,
    base_url: Option<String>,
    sandbox: bool,
}

impl StaticProvider {
    /// A provider with nothing configured; it reports an absent source
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
            ..Self::default()
        }
    }

    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sandbox mode relaxes the secret-key requirement
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    fn is_unset(&self) -> bool {
        let blank = |value: &Option<String>| value.as_deref().is_none_or(str::is_empty);
        blank(&self.access_key) && blank(&self.secret_key)
    }
}

impl ProvideCredentials for StaticProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn retrieve(&self) -> Result<Credentials, ProviderError> {
        if self.is_unset() {
            return Err(ProviderError::absent(NAME, "no static credentials configured"));
        }

        let credentials = Credentials {
            access_key: self.access_key.clone().unwrap_or_default(),
            secret_key: self.secret_key.clone().unwrap_or_default(),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(self.sandbox).to_string()),
            sandbox: self.sandbox,
        };

        credentials
            .validate()
            .map_err(|reason| ProviderError::invalid(NAME, reason))?;
        Ok(credentials)
    }
}

impl fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticProvider")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}
