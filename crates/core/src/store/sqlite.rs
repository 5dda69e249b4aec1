//! SQLite-backed record store.
//!
//! ## Schema
//!
//! ```text
//! patients(seq INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT UNIQUE, name, email TEXT UNIQUE,
//!          address, date_of_birth, registered_date)
//! ```
//!
//! `seq` only fixes storage order. The `UNIQUE` index on `email` is the correctness backstop
//! for concurrent creations: whichever insert reaches SQLite second fails with a constraint
//! violation, which is reported as [`StoreError::EmailConflict`].
//!
//! `rusqlite` is blocking, so every call runs on the blocking thread pool while holding the
//! connection mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use patient_types::{EmailAddress, NonEmptyText, PatientId};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{RecordStore, StoreError, StoreResult};
use crate::patient::PatientRecord;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    address TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    registered_date TEXT NOT NULL
);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, name, email, address, date_of_birth, registered_date FROM patients";

/// Record store backed by a single SQLite connection.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open the database at `path`, creating the file and schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::initialise(Connection::open(path)?)
    }

    /// Create a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialise(Connection::open_in_memory()?)
    }

    fn initialise(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

/// A `patients` row as stored, before validation.
struct PatientRow {
    id: String,
    name: String,
    email: String,
    address: String,
    date_of_birth: NaiveDate,
    registered_date: NaiveDate,
}

impl PatientRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            address: row.get(3)?,
            date_of_birth: row.get(4)?,
            registered_date: row.get(5)?,
        })
    }
}

impl TryFrom<PatientRow> for PatientRecord {
    type Error = StoreError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            StoreError::Corrupt(format!("{field} of row {}: {e}", row.id))
        };
        Ok(PatientRecord {
            id: PatientId::parse(&row.id).map_err(|e| corrupt("id", &e))?,
            name: NonEmptyText::new(&row.name).map_err(|e| corrupt("name", &e))?,
            email: EmailAddress::parse(&row.email).map_err(|e| corrupt("email", &e))?,
            address: NonEmptyText::new(&row.address).map_err(|e| corrupt("address", &e))?,
            date_of_birth: row.date_of_birth,
            registered_date: row.registered_date,
        })
    }
}

/// Translate a constraint failure on a write into the matching [`StoreError`].
fn map_write_error(err: rusqlite::Error, record: &PatientRecord) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("patients.email") {
                return StoreError::EmailConflict(record.email.to_string());
            }
            if message.contains("patients.id") {
                return StoreError::DuplicateId(record.id);
            }
        }
    }
    StoreError::Sqlite(err)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn exists_by_email(&self, email: &EmailAddress) -> StoreResult<bool> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM patients WHERE email = ?1)",
                [&email],
                |row| row.get(0),
            )?;
            Ok(found)
        })
        .await
    }

    async fn exists_by_email_excluding(
        &self,
        email: &EmailAddress,
        id: &PatientId,
    ) -> StoreResult<bool> {
        let email = email.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM patients WHERE email = ?1 AND id <> ?2)",
                params![email, id],
                |row| row.get(0),
            )?;
            Ok(found)
        })
        .await
    }

    async fn insert(&self, record: PatientRecord) -> StoreResult<PatientRecord> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO patients (id, name, email, address, date_of_birth, registered_date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.id.to_string(),
                    record.name.as_str(),
                    record.email.as_str(),
                    record.address.as_str(),
                    record.date_of_birth,
                    record.registered_date,
                ],
            )
            .map_err(|e| map_write_error(e, &record))?;
            Ok(record)
        })
        .await
    }

    async fn find_by_id(&self, id: &PatientId) -> StoreResult<Option<PatientRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [&id],
                PatientRow::from_row,
            )
            .optional()?
            .map(PatientRecord::try_from)
            .transpose()
        })
        .await
    }

    async fn find_all(&self) -> StoreResult<Vec<PatientRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY seq"))?;
            let rows = stmt.query_map([], PatientRow::from_row)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(PatientRecord::try_from(row?)?);
            }
            Ok(records)
        })
        .await
    }

    async fn delete_by_id(&self, id: &PatientId) -> StoreResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM patients WHERE id = ?1", [&id])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn save(&self, record: PatientRecord) -> StoreResult<PatientRecord> {
        self.with_conn(move |conn| {
            let updated = conn
                .execute(
                    r#"
                    UPDATE patients SET
                        name = ?2,
                        email = ?3,
                        address = ?4,
                        date_of_birth = ?5,
                        registered_date = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        record.id.to_string(),
                        record.name.as_str(),
                        record.email.as_str(),
                        record.address.as_str(),
                        record.date_of_birth,
                        record.registered_date,
                    ],
                )
                .map_err(|e| map_write_error(e, &record))?;

            if updated == 0 {
                return Err(StoreError::Missing(record.id));
            }
            Ok(record)
        })
        .await
    }
}
