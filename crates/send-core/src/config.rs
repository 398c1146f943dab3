use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime settings for the send pipeline.
///
/// There is no commitment setting: every ledger read and the broadcast
/// preflight use `finalized`. Unknown keys are rejected so a setting that
/// nothing reads fails loudly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendConfig {
    /// Ledger JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Transport timeout for each RPC request, in milliseconds.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".to_string()
}

fn default_rpc_timeout_ms() -> u64 {
    30_000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            log_filter: default_log_filter(),
        }
    }
}

impl SendConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config file {path}: {e}")))?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset:
    /// `SEND_RPC_URL`, `SEND_RPC_TIMEOUT_MS`, `SEND_LOG_FILTER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("SEND_RPC_URL") {
            config.rpc_url = url;
        }
        if let Some(timeout) = lookup("SEND_RPC_TIMEOUT_MS") {
            config.rpc_timeout_ms = timeout.trim().parse().map_err(|e| {
                ConfigError::Parse(format!("SEND_RPC_TIMEOUT_MS must be an integer: {e}"))
            })?;
        }
        if let Some(filter) = lookup("SEND_LOG_FILTER") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "rpc_url must be an http(s) URL, got {:?}",
                self.rpc_url
            )));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "rpc_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_devnet() {
        let config = SendConfig::default();
        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(config.rpc_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = SendConfig::from_toml_str(r#"rpc_url = "http://127.0.0.1:8899""#).unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.rpc_timeout_ms, 30_000);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn toml_full() {
        let config = SendConfig::from_toml_str(
            r#"
            rpc_url = "https://rpc.example.org"
            rpc_timeout_ms = 5000
            log_filter = "send_core=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc_timeout_ms, 5000);
        assert_eq!(config.log_filter, "send_core=debug");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SendConfig::from_toml_str("rpc_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SendConfig::from_toml_str(r#"signer_api_key = "pk_test_123""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref m) if m.contains("signer_api_key")));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = SendConfig::from_toml_str(r#"rpc_url = "ws://localhost""#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = SendConfig::from_toml_str("rpc_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SendConfig::from_toml_file("/nonexistent/send.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("SEND_RPC_URL", "http://localhost:8899"),
            ("SEND_RPC_TIMEOUT_MS", "1500"),
            ("SEND_SIGNER_API_KEY", "pk_test_123"),
        ]
        .into_iter()
        .collect();

        let config = SendConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert_eq!(config.rpc_timeout_ms, 1500);
        assert_eq!(config.log_filter, "info");
        assert_eq!(
            config,
            SendConfig {
                rpc_url: "http://localhost:8899".into(),
                rpc_timeout_ms: 1500,
                ..SendConfig::default()
            }
        );
    }

    #[test]
    fn env_bad_timeout_is_a_parse_error() {
        let config = SendConfig::from_lookup(|k| {
            (k == "SEND_RPC_TIMEOUT_MS").then(|| "ten".to_string())
        });
        assert!(matches!(config, Err(ConfigError::Parse(_))));
    }
}
