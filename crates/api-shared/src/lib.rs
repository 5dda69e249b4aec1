//! # API Shared
//!
//! Shared wire definitions for the patient service and its collaborators.
//!
//! Contains:
//! - Protobuf-generated billing RPC types, client and server (`billing` module)
//! - Protobuf-generated patient lifecycle event (`events` module)
//! - The `HealthService` used by the REST API
//!
//! Used by `patient-core`, `api-rest` and `billing-stub`.

// The generated code is placed into OUT_DIR at build time by the build script.
pub mod billing {
    tonic::include_proto!("billing");
}

pub mod events {
    tonic::include_proto!("patient.events");
}

pub mod health;

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("proto_descriptor");

pub use health::{HealthRes, HealthService};
