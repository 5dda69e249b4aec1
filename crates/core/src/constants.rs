//! Constants used throughout the patient core crate.

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:4000";

/// Default location of the SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "patient_data/patients.db";

/// Database path value selecting a private in-memory SQLite database.
pub const IN_MEMORY_DATABASE_PATH: &str = ":memory:";

/// Default billing service endpoint.
pub const DEFAULT_BILLING_ADDR: &str = "http://localhost:9001";

/// Default bound on a single provisioning round trip, in milliseconds.
pub const DEFAULT_BILLING_TIMEOUT_MS: u64 = 5_000;

/// Topic patient lifecycle events are published to.
pub const DEFAULT_EVENT_TOPIC: &str = "patient";

/// Default number of events buffered between the orchestrator and the delivery worker.
pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 1_024;

/// Largest accepted event buffer capacity.
pub const MAX_EVENT_BUFFER_CAPACITY: usize = 1_048_576;

/// Default time the orchestrator waits for room in the event buffer, in milliseconds.
pub const DEFAULT_EVENT_HANDOFF_TIMEOUT_MS: u64 = 50;

/// Default timeout for a single broker delivery request, in milliseconds.
pub const DEFAULT_EVENT_DELIVERY_TIMEOUT_MS: u64 = 5_000;

/// Event type carried by events published on patient creation.
pub const PATIENT_CREATED_EVENT: &str = "PATIENT_CREATED";

/// Maximum length of a patient's name, in characters.
pub const MAX_NAME_LEN: usize = 100;
