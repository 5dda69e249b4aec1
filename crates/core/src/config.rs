//! Service runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the pieces that
//! need it. Nothing reads process-wide environment variables during request handling.
//!
//! [`ServiceConfig::from_lookup`] takes the variable lookup as a function so tests can supply
//! values without touching the real environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BILLING_ADDR, DEFAULT_BILLING_TIMEOUT_MS, DEFAULT_DATABASE_PATH,
    DEFAULT_EVENT_BUFFER_CAPACITY, DEFAULT_EVENT_HANDOFF_TIMEOUT_MS, DEFAULT_EVENT_TOPIC,
    DEFAULT_REST_ADDR, MAX_EVENT_BUFFER_CAPACITY,
};
use crate::{PatientError, PatientResult};

/// Which [`RecordStore`](crate::store::RecordStore) implementation to run with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(PatientError::InvalidInput(format!(
                "PATIENT_STORE must be 'sqlite' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Patient service configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    rest_addr: String,
    store_kind: StoreKind,
    database_path: PathBuf,
    billing_addr: String,
    billing_timeout: Duration,
    event_broker_url: Option<reqwest::Url>,
    event_topic: String,
    event_buffer_capacity: usize,
    event_handoff_timeout: Duration,
}

impl ServiceConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> PatientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, falling back to defaults for unset or blank
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if a variable is set to a value that cannot be
    /// parsed, if a numeric value is zero, or if the event buffer capacity exceeds
    /// [`MAX_EVENT_BUFFER_CAPACITY`].
    pub fn from_lookup<F>(lookup: F) -> PatientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| non_empty(lookup(key));

        let store_kind = value("PATIENT_STORE")
            .map(|v| v.parse::<StoreKind>())
            .transpose()?
            .unwrap_or_default();

        let event_broker_url = value("EVENT_BROKER_URL")
            .map(|v| {
                reqwest::Url::parse(&v).map_err(|e| {
                    PatientError::InvalidInput(format!("EVENT_BROKER_URL '{v}' is invalid: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            rest_addr: value("PATIENT_REST_ADDR").unwrap_or_else(|| DEFAULT_REST_ADDR.into()),
            store_kind,
            database_path: value("PATIENT_DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into())
                .into(),
            billing_addr: value("BILLING_SERVICE_ADDR")
                .unwrap_or_else(|| DEFAULT_BILLING_ADDR.into()),
            billing_timeout: millis_from_env_value(
                "BILLING_TIMEOUT_MS",
                value("BILLING_TIMEOUT_MS"),
                DEFAULT_BILLING_TIMEOUT_MS,
            )?,
            event_broker_url,
            event_topic: value("EVENT_TOPIC").unwrap_or_else(|| DEFAULT_EVENT_TOPIC.into()),
            event_buffer_capacity: capacity_from_env_value(value("EVENT_BUFFER_CAPACITY"))?,
            event_handoff_timeout: millis_from_env_value(
                "EVENT_HANDOFF_TIMEOUT_MS",
                value("EVENT_HANDOFF_TIMEOUT_MS"),
                DEFAULT_EVENT_HANDOFF_TIMEOUT_MS,
            )?,
        })
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn billing_addr(&self) -> &str {
        &self.billing_addr
    }

    pub fn billing_timeout(&self) -> Duration {
        self.billing_timeout
    }

    /// Kafka REST proxy base URL. `None` means events are only logged.
    pub fn event_broker_url(&self) -> Option<&reqwest::Url> {
        self.event_broker_url.as_ref()
    }

    pub fn event_topic(&self) -> &str {
        &self.event_topic
    }

    pub fn event_buffer_capacity(&self) -> usize {
        self.event_buffer_capacity
    }

    pub fn event_handoff_timeout(&self) -> Duration {
        self.event_handoff_timeout
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a strictly positive integer, returning `default` when `value` is `None`.
fn positive_from_env_value<T>(key: &str, value: Option<String>, default: T) -> PatientResult<T>
where
    T: FromStr + PartialEq + Default,
{
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(PatientError::InvalidInput(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Parse the event buffer capacity, which must lie in `1..=MAX_EVENT_BUFFER_CAPACITY`.
fn capacity_from_env_value(value: Option<String>) -> PatientResult<usize> {
    let capacity = positive_from_env_value(
        "EVENT_BUFFER_CAPACITY",
        value,
        DEFAULT_EVENT_BUFFER_CAPACITY,
    )?;
    if capacity > MAX_EVENT_BUFFER_CAPACITY {
        return Err(PatientError::InvalidInput(format!(
            "EVENT_BUFFER_CAPACITY must be at most {MAX_EVENT_BUFFER_CAPACITY}, got {capacity}"
        )));
    }
    Ok(capacity)
}

fn millis_from_env_value(
    key: &str,
    value: Option<String>,
    default_ms: u64,
) -> PatientResult<Duration> {
    positive_from_env_value(key, value, default_ms).map(Duration::from_millis)
}
