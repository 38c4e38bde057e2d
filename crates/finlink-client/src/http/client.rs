/*
[INPUT]:  HTTP configuration (timeouts, retry policy) and resolved credentials
[OUTPUT]: Configured client whose every request goes through the transport
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{info, Span};

use crate::auth::{authenticator_for, Clock, SystemClock};
use crate::credentials::{
    ChainProvider, CredentialsError, Credentials, ProvideCredentials, StaticProvider,
};
use crate::http::retry::RetryConfig;
use crate::http::transport::Transport;
use crate::http::{FinlinkError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            user_agent: format!("finlink-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Main HTTP client for the finlink API
///
/// Credentials are resolved once at construction and held for the client's
/// lifetime; the authenticator is chosen from them at the same time.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    transport: Transport,
    base_url: Url,
    credentials: Arc<Credentials>,
}

impl ApiClient {
    /// Resolve credentials through the default chain (static, env, file)
    pub fn from_default_chain(explicit: StaticProvider, config: ClientConfig) -> Result<Self> {
        Self::from_chain(&ChainProvider::default_chain(explicit), config)
    }

    /// Resolve credentials through a custom chain
    pub fn from_chain<P: ProvideCredentials>(
        chain: &ChainProvider<P>,
        config: ClientConfig,
    ) -> Result<Self> {
        let (source, credentials) = chain.resolve_with_source()?;
        info!(
            provider = %source,
            access_key = %credentials.redacted_access_key(),
            sandbox = credentials.sandbox,
            "credentials resolved"
        );
        Self::with_credentials(credentials, config)
    }

    /// Use explicitly supplied credentials
    pub fn with_credentials(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        Self::with_clock(credentials, config, Arc::new(SystemClock))
    }

    /// Use explicitly supplied credentials and a custom signing clock
    pub fn with_clock(
        credentials: Credentials,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        credentials
            .validate()
            .map_err(|reason| CredentialsError::InvalidCredentials {
                provider: "explicit".to_string(),
                reason,
            })?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        let base_url = normalize_base_url(&credentials.base_url)?;
        let authenticator = authenticator_for(&credentials, clock);
        let transport = Transport::new(http_client.clone(), authenticator, config.retry);

        Ok(Self {
            http_client,
            transport,
            base_url,
            credentials: Arc::new(credentials),
        })
    }

    /// Emit transport events inside the given span
    pub fn with_span(mut self, span: Span) -> Self {
        self.transport = self.transport.with_span(span);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for an endpoint relative to the base URL
    fn url(&self, endpoint: &str) -> std::result::Result<Url, url::ParseError> {
        self.base_url.join(endpoint.trim_start_matches('/'))
    }

    /// Build request builder for an endpoint
    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send through the transport
    ///
    /// Unsafe methods (POST, PUT, PATCH, DELETE) get an idempotency key if
    /// the caller did not set one.
    pub async fn send(&self, builder: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
        let request = builder.build()?;
        let idempotent = !is_safe(request.method());
        Ok(self.transport.send(request, idempotent, cancel).await?)
    }

    /// Send through the transport with an explicit idempotency choice
    pub async fn send_with(
        &self,
        builder: RequestBuilder,
        idempotent: bool,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let request = builder.build()?;
        Ok(self.transport.send(request, idempotent, cancel).await?)
    }

    /// Send and decode a JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.send(builder, cancel).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(FinlinkError::from)
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

// Url::join drops the last path segment unless the base ends with '/'.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(FinlinkError::Config(format!("base URL {raw} cannot be a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_invalid_credentials() {
        let err = ApiClient::with_credentials(Credentials::new("abc", ""), ClientConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            FinlinkError::Credentials(CredentialsError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn test_authenticator_selected_once_from_sandbox_flag() {
        let client =
            ApiClient::with_credentials(Credentials::sandbox("sbx"), ClientConfig::default()).unwrap();
        assert_eq!(client.transport().authenticator().scheme(), "bearer");

        let client =
            ApiClient::with_credentials(Credentials::new("ak", "sk"), ClientConfig::default()).unwrap();
        assert_eq!(client.transport().authenticator().scheme(), "hmac-sha256");
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let creds = Credentials::new("ak", "sk").with_base_url("https://gw.example.com/api/v2");
        let client = ApiClient::with_credentials(creds, ClientConfig::default()).unwrap();
        let request = client
            .request(Method::GET, "/accounts")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "https://gw.example.com/api/v2/accounts");
    }

    #[test]
    fn test_bad_base_url_is_reported() {
        let creds = Credentials::new("ak", "sk").with_base_url("not a url");
        let err = ApiClient::with_credentials(creds, ClientConfig::default()).unwrap_err();
        assert!(matches!(err, FinlinkError::UrlParse(_)));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe(&Method::GET));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::DELETE));
    }
}
