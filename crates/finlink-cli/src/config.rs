/*
[INPUT]:  YAML listener configuration file, webhook secret environment variable
[OUTPUT]: Parsed listener configuration and the derived WebhookConfig
[POS]:    Configuration layer - webhook listener setup
[UPDATE]: When adding new listener options
*/

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use finlink_client::webhook::{DEFAULT_MAX_BODY_BYTES, DEFAULT_TOLERANCE};
use finlink_client::WebhookConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the webhook listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Socket address to bind (e.g., "0.0.0.0:8080")
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Route the platform posts deliveries to
    #[serde(default = "default_path")]
    pub path: String,
    /// Shared secret; prefer `secret_env` outside of local testing
    #[serde(default)]
    pub secret: Option<String>,
    /// Environment variable holding the shared secret
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    /// Allowed clock skew in seconds
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,
    /// Accept unsigned deliveries
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Seconds running handlers get to finish after shutdown is requested
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
            secret: None,
            secret_env: default_secret_env(),
            tolerance_secs: default_tolerance_secs(),
            sandbox: false,
            max_body_bytes: default_max_body_bytes(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_path() -> String {
    "/webhooks/finlink".to_string()
}

fn default_secret_env() -> String {
    "FINLINK_WEBHOOK_SECRET".to_string()
}

fn default_tolerance_secs() -> u64 {
    DEFAULT_TOLERANCE.as_secs()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

impl ListenerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        if !config.path.starts_with('/') {
            bail!("listener path must start with '/', got {:?}", config.path);
        }
        Ok(config)
    }

    /// Secret from the file, else from `secret_env`
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .or_else(|| std::env::var(&self.secret_env).ok())
            .filter(|secret| !secret.is_empty())
    }

    pub fn webhook_config(&self) -> anyhow::Result<WebhookConfig> {
        let secret = self.resolve_secret().unwrap_or_default();
        let config = WebhookConfig::new(secret)
            .with_tolerance(Duration::from_secs(self.tolerance_secs))
            .with_sandbox(self.sandbox)
            .with_max_body_bytes(self.max_body_bytes);
        config
            .validate()
            .with_context(|| format!("webhook secret not set (checked `secret` and ${})", self.secret_env))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ListenerConfig::from_yaml("secret: whsec_test\n").unwrap();
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.path, "/webhooks/finlink");
        assert_eq!(config.tolerance_secs, 300);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert!(!config.sandbox);
        assert_eq!(config.shutdown_grace_secs, 30);

        let webhook = config.webhook_config().unwrap();
        assert_eq!(webhook.secret, "whsec_test");
        assert_eq!(webhook.tolerance, Duration::from_secs(300));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
bind: "0.0.0.0:9000"
path: /hooks
secret_env: FINLINK_TEST_UNSET_SECRET_VAR
tolerance_secs: 60
sandbox: true
max_body_bytes: 4096
"#;
        let config = ListenerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.path, "/hooks");

        let webhook = config.webhook_config().unwrap();
        assert!(webhook.sandbox);
        assert_eq!(webhook.max_body_bytes, 4096);
    }

    #[test]
    fn test_production_without_secret_is_rejected() {
        let config = ListenerConfig::from_yaml("secret_env: FINLINK_TEST_UNSET_SECRET_VAR\n").unwrap();
        let err = config.webhook_config().unwrap_err();
        assert!(err.to_string().contains("FINLINK_TEST_UNSET_SECRET_VAR"));
    }

    #[test]
    fn test_relative_path_is_rejected() {
        assert!(ListenerConfig::from_yaml("path: hooks\n").is_err());
    }
}
