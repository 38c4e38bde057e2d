/*
[INPUT]:  Explicit config, process environment, on-disk credentials file
[OUTPUT]: One validated Credentials tuple per client
[POS]:    Credentials layer - leaf of the trust boundary
[UPDATE]: When adding credential sources or changing resolution order
*/

pub mod chain;
pub mod env;
pub mod file;
pub mod model;
pub mod provider;
pub mod static_provider;

pub use chain::{ChainProvider, CredentialProvider, CredentialsError};
pub use env::EnvProvider;
pub use file::{default_credentials_path, FileProvider};
pub use model::{Credentials, InvalidCredentials, PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
pub use provider::{ProvideCredentials, ProviderCause, ProviderError};
pub use static_provider::StaticProvider;
