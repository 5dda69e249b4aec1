//! Startup configuration for the billing stub binary.

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_STUB_ADDR: &str = "0.0.0.0:9001";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{key} has invalid value '{value}': {reason}")]
pub struct StubConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Billing stub settings resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubConfig {
    pub addr: SocketAddr,
    pub reflection: bool,
    /// Artificial delay before every response, for exercising client timeouts.
    pub delay: Option<Duration>,
}

impl StubConfig {
    pub fn from_env() -> Result<Self, StubConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `BILLING_STUB_ADDR`, `BILLING_STUB_ENABLE_REFLECTION` and `BILLING_STUB_DELAY_MS`
    /// through `lookup`. Unset or blank values take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StubConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_addr = value("BILLING_STUB_ADDR").unwrap_or_else(|| DEFAULT_STUB_ADDR.into());
        let addr = raw_addr.parse::<SocketAddr>().map_err(|e| StubConfigError {
            key: "BILLING_STUB_ADDR",
            value: raw_addr.clone(),
            reason: e.to_string(),
        })?;

        let reflection = match value("BILLING_STUB_ENABLE_REFLECTION") {
            None => false,
            Some(v) => v.parse::<bool>().map_err(|_| StubConfigError {
                key: "BILLING_STUB_ENABLE_REFLECTION",
                value: v.clone(),
                reason: "expected 'true' or 'false'".into(),
            })?,
        };

        let delay = value("BILLING_STUB_DELAY_MS")
            .map(|v| {
                v.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| StubConfigError {
                        key: "BILLING_STUB_DELAY_MS",
                        value: v.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?
            .filter(|d| !d.is_zero());

        Ok(Self {
            addr,
            reflection,
            delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<StubConfig, StubConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StubConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).expect("defaults should be valid");

        assert_eq!(config.addr, DEFAULT_STUB_ADDR.parse().unwrap());
        assert!(!config.reflection);
        assert_eq!(config.delay, None);
    }

    #[test]
    fn test_values_override_defaults() {
        let config = config_from(&[
            ("BILLING_STUB_ADDR", "127.0.0.1:9100"),
            ("BILLING_STUB_ENABLE_REFLECTION", "true"),
            ("BILLING_STUB_DELAY_MS", "250"),
        ])
        .expect("config should be valid");

        assert_eq!(config.addr, "127.0.0.1:9100".parse().unwrap());
        assert!(config.reflection);
        assert_eq!(config.delay, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("BILLING_STUB_ADDR", "localhost"),
            ("BILLING_STUB_ENABLE_REFLECTION", "yes"),
            ("BILLING_STUB_DELAY_MS", "-5"),
        ] {
            let err = config_from(&[(key, value)]).expect_err("value should be rejected");
            assert_eq!(err.key, key);
        }
    }
}
