/*
[INPUT]:  HTTP client configuration, credentials and outbound requests
[OUTPUT]: Authenticated, retried HTTP responses and typed errors
[POS]:    HTTP layer - REST API communication
[UPDATE]: When changing client behavior or the retry/transport contract
*/

pub mod client;
pub mod error;
pub mod retry;
pub mod transport;

pub use error::{AttemptFailure, FinlinkError, Result, TransportError};
pub use retry::{parse_retry_after, RetryConfig};
pub use transport::{Transport, IDEMPOTENCY_KEY_HEADER};

pub use client::{ApiClient, ClientConfig};
