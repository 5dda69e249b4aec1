//! # Patient Core
//!
//! Core business logic for the patient service write path.
//!
//! This crate holds the patient domain and everything the orchestrator touches:
//! - Input validation and the patient record model
//! - The [`RecordStore`](store::RecordStore) abstraction with SQLite and in-memory backends
//! - Billing account provisioning over gRPC
//! - Lifecycle event publishing through a bounded hand-off to a delivery worker
//! - [`PatientService`], which sequences the above for create, update, delete and list
//!
//! **No API concerns**: HTTP routing, status codes and JSON shapes belong in `api-rest`.

pub mod billing;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod patient;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{ServiceConfig, StoreKind};
pub use error::{PatientError, PatientResult};
pub use patient::{NewPatient, PatientChanges, PatientRecord};
pub use service::PatientService;
pub use validation::{validate_create, validate_update, PatientInput, ValidationErrors};

pub use patient_types::PatientId;
