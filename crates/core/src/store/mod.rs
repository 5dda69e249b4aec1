//! Record store for patient records.
//!
//! The store owns the durable copy of every [`PatientRecord`] and enforces exactly one rule:
//! no two records share an email address. Implementations must enforce that rule atomically
//! with the write, so it holds even when two callers race past the orchestrator's pre-check.
//!
//! Two implementations are provided:
//! - [`SqliteRecordStore`]: a SQLite table with a `UNIQUE` constraint on `email`.
//! - [`InMemoryRecordStore`]: records plus an email index behind a single lock.

mod memory;
mod sqlite;

pub use memory::InMemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use patient_types::{EmailAddress, PatientId};

use crate::patient::PatientRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write would give two records the same email.
    #[error("email already in use: {0}")]
    EmailConflict(String),
    #[error("a record with id {0} already exists")]
    DuplicateId(PatientId),
    /// `save` was called for a record that is no longer stored.
    #[error("no record with id {0}")]
    Missing(PatientId),
    #[error("stored row is not a valid patient record: {0}")]
    Corrupt(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("record store lock poisoned")]
    Poisoned,
    #[error("record store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable keyed storage for patient records with a uniqueness index on email.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns true if any record uses `email`.
    async fn exists_by_email(&self, email: &EmailAddress) -> StoreResult<bool>;

    /// Returns true if any record other than `id` uses `email`.
    async fn exists_by_email_excluding(
        &self,
        email: &EmailAddress,
        id: &PatientId,
    ) -> StoreResult<bool>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmailConflict`] if the email is taken, checked atomically with
    /// the insert, and [`StoreError::DuplicateId`] if the id is taken.
    async fn insert(&self, record: PatientRecord) -> StoreResult<PatientRecord>;

    async fn find_by_id(&self, id: &PatientId) -> StoreResult<Option<PatientRecord>>;

    /// Returns every record in storage order.
    async fn find_all(&self) -> StoreResult<Vec<PatientRecord>>;

    /// Removes the record if present and reports whether one was removed. Removing an absent
    /// record is not an error.
    async fn delete_by_id(&self, id: &PatientId) -> StoreResult<bool>;

    /// Overwrites an existing record in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmailConflict`] if another record uses the new email and
    /// [`StoreError::Missing`] if the record was removed in the meantime.
    async fn save(&self, record: PatientRecord) -> StoreResult<PatientRecord>;
}
