/*
[INPUT]:  ACCESS_KEY / SECRET_KEY / BASE_URL / SANDBOX environment variables
[OUTPUT]: Credentials read from the environment
[POS]:    Credentials layer - second provider in the default chain
[UPDATE]: When environment variable names change
*/

use std::collections::HashMap;
use std::fmt;

use super::model::{default_base_url, parse_flag, Credentials};
use super::provider::{ProvideCredentials, ProviderError};

pub const ACCESS_KEY_VAR: &str = "ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "SECRET_KEY";
pub const BASE_URL_VAR: &str = "BASE_URL";
pub const SANDBOX_VAR: &str = "SANDBOX";

const NAME: &str = "env";

#[derive(Clone, Default)]
enum EnvSource {
    #[default]
    Process,
    Vars(HashMap<String, String>),
}

/// Reads credentials from environment variables
///
/// `from_vars` swaps the process environment for a fixed map.
#[derive(Clone, Default)]
pub struct EnvProvider {
    source: EnvSource,
}

impl EnvProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from a fixed set of variables instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            source: EnvSource::Vars(vars),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        let value = match &self.source {
            EnvSource::Process => std::env::var(key).ok(),
            EnvSource::Vars(vars) => vars.get(key).cloned(),
        };
        value.filter(|value| !value.is_empty())
    }
}

impl ProvideCredentials for EnvProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn retrieve(&self) -> Result<Credentials, ProviderError> {
        let access_key = self
            .var(ACCESS_KEY_VAR)
            .ok_or_else(|| ProviderError::absent(NAME, format!("{ACCESS_KEY_VAR} is not set")))?;

        let sandbox = match self.var(SANDBOX_VAR) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ProviderError::malformed(
                    NAME,
                    format!("{SANDBOX_VAR} has unrecognised value {raw:?}"),
                )
            })?,
            None => false,
        };

        let credentials = Credentials {
            access_key,
            secret_key: self.var(SECRET_KEY_VAR).unwrap_or_default(),
            base_url: self
                .var(BASE_URL_VAR)
                .unwrap_or_else(|| default_base_url(sandbox).to_string()),
            sandbox,
        };

        credentials
            .validate()
            .map_err(|reason| ProviderError::invalid(NAME, reason))?;
        Ok(credentials)
    }
}

impl fmt::Debug for EnvProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            EnvSource::Process => "process",
            EnvSource::Vars(_) => "fixed",
        };
        f.debug_struct("EnvProvider").field("source", &source).finish()
    }
}
