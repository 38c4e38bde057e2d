/*
[INPUT]:  Ordered list of credential providers
[OUTPUT]: First valid credentials, or an aggregate of every provider failure
[POS]:    Credentials layer - resolution chain consulted once per client
[UPDATE]: When provider priority or aggregate diagnostics change
*/

use thiserror::Error;
use tracing::debug;

use super::env::EnvProvider;
use super::file::FileProvider;
use super::model::{Credentials, InvalidCredentials};
use super::provider::{ProvideCredentials, ProviderCause, ProviderError};
use super::static_provider::StaticProvider;

/// Errors from credential resolution
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Every provider in the chain failed
    #[error("no valid credentials found: {}", summarize(.failures))]
    NoCredentials { failures: Vec<ProviderError> },

    /// Explicitly supplied credentials fail the validity invariant
    #[error("invalid credentials from {provider}: {reason}")]
    InvalidCredentials {
        provider: String,
        #[source]
        reason: InvalidCredentials,
    },
}

impl CredentialsError {
    /// Per-provider failures, in chain order
    pub fn failures(&self) -> &[ProviderError] {
        match self {
            CredentialsError::NoCredentials { failures } => failures,
            CredentialsError::InvalidCredentials { .. } => &[],
        }
    }
}

fn summarize(failures: &[ProviderError]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The closed set of built-in providers
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    Static(StaticProvider),
    Env(EnvProvider),
    File(FileProvider),
}

impl ProvideCredentials for CredentialProvider {
    fn name(&self) -> &str {
        match self {
            CredentialProvider::Static(provider) => provider.name(),
            CredentialProvider::Env(provider) => provider.name(),
            CredentialProvider::File(provider) => provider.name(),
        }
    }

    fn retrieve(&self) -> Result<Credentials, ProviderError> {
        match self {
            CredentialProvider::Static(provider) => provider.retrieve(),
            CredentialProvider::Env(provider) => provider.retrieve(),
            CredentialProvider::File(provider) => provider.retrieve(),
        }
    }
}

impl From<StaticProvider> for CredentialProvider {
    fn from(provider: StaticProvider) -> Self {
        CredentialProvider::Static(provider)
    }
}

impl From<EnvProvider> for CredentialProvider {
    fn from(provider: EnvProvider) -> Self {
        CredentialProvider::Env(provider)
    }
}

impl From<FileProvider> for CredentialProvider {
    fn from(provider: FileProvider) -> Self {
        CredentialProvider::File(provider)
    }
}

/// Tries providers in order and returns the first valid result
///
/// Providers after the first success are never invoked. A provider whose
/// result fails validation counts as a failure.
#[derive(Debug, Clone)]
pub struct ChainProvider<P = CredentialProvider> {
    providers: Vec<P>,
}

impl ChainProvider<CredentialProvider> {
    /// Static values, then the environment, then the credentials file
    pub fn default_chain(explicit: StaticProvider) -> Self {
        Self::new(vec![
            explicit.into(),
            EnvProvider::new().into(),
            FileProvider::from_env().into(),
        ])
    }
}

impl<P: ProvideCredentials> ChainProvider<P> {
    pub fn new(providers: Vec<P>) -> Self {
        Self { providers }
    }

    pub fn with_provider(mut self, provider: impl Into<P>) -> Self {
        self.providers.push(provider.into());
        self
    }

    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    /// Resolve credentials
    pub fn resolve(&self) -> Result<Credentials, CredentialsError> {
        self.resolve_with_source().map(|(_, credentials)| credentials)
    }

    /// Resolve credentials and report which provider produced them
    pub fn resolve_with_source(&self) -> Result<(String, Credentials), CredentialsError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            match provider.retrieve() {
                Ok(credentials) => match credentials.validate() {
                    Ok(()) => {
                        debug!(provider = name, sandbox = credentials.sandbox, "credentials resolved");
                        return Ok((name.to_string(), credentials));
                    }
                    Err(reason) => {
                        debug!(provider = name, %reason, "provider returned invalid credentials");
                        failures.push(ProviderError::invalid(name, reason));
                    }
                },
                Err(err) => {
                    debug!(provider = name, error = %err, "credential provider failed");
                    failures.push(err);
                }
            }
        }

        Err(CredentialsError::NoCredentials { failures })
    }
}

impl<P: ProvideCredentials> ProvideCredentials for ChainProvider<P> {
    fn name(&self) -> &str {
        "chain"
    }

    fn retrieve(&self) -> Result<Credentials, ProviderError> {
        self.resolve().map_err(|err| {
            let all_absent = err.failures().iter().all(ProviderError::is_absent);
            let cause = if all_absent {
                ProviderCause::Absent
            } else {
                ProviderCause::Malformed
            };
            ProviderError::new("chain", err.to_string(), cause)
        })
    }
}
