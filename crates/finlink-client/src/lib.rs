/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public finlink client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod credentials;
pub mod http;
pub mod webhook;

// Re-export commonly used types from auth
pub use auth::{
    Authenticator,
    BearerAuth,
    Clock,
    FixedClock,
    HmacSigner,
    SigningError,
    SystemClock,
};

// Re-export commonly used types from credentials
pub use credentials::{
    ChainProvider,
    CredentialProvider,
    Credentials,
    CredentialsError,
    EnvProvider,
    FileProvider,
    ProvideCredentials,
    ProviderError,
    StaticProvider,
};

// Re-export commonly used types from http
pub use http::{
    ApiClient,
    ClientConfig,
    FinlinkError,
    Result,
    RetryConfig,
    Transport,
    TransportError,
};

// Re-export commonly used types from webhook
pub use webhook::{
    sign_webhook,
    WebhookConfig,
    WebhookError,
    WebhookHandler,
    WebhookMetadata,
    WebhookReceiver,
    WebhookResponse,
    WebhookVerifier,
};
