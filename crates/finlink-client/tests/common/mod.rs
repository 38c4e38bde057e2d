/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for finlink-client tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use finlink_client::{ApiClient, ClientConfig, Credentials, FixedClock, RetryConfig};
use wiremock::MockServer;

pub const ACCESS_KEY: &str = "AKTEST0001";
pub const SECRET_KEY: &str = "sk_test_secret";
pub const FIXED_NOW: i64 = 1_700_000_000;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Production-style credentials pointed at the mock server
pub fn test_credentials(server: &MockServer) -> Credentials {
    Credentials::new(ACCESS_KEY, SECRET_KEY).with_base_url(server.uri())
}

/// Short, deterministic backoff so retry tests stay fast
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries)
        .with_initial_backoff(Duration::from_millis(5))
        .with_max_backoff(Duration::from_millis(20))
        .with_jitter(false)
}

pub fn client_config(retry: RetryConfig) -> ClientConfig {
    ClientConfig {
        timeout: Duration::from_secs(10),
        retry,
        ..ClientConfig::default()
    }
}

/// Client signing with a fixed clock against the mock server
pub fn test_client(server: &MockServer, retry: RetryConfig) -> ApiClient {
    ApiClient::with_clock(
        test_credentials(server),
        client_config(retry),
        Arc::new(FixedClock::new(FIXED_NOW)),
    )
    .expect("test client should build")
}
