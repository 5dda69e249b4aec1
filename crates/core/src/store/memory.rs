//! In-process record store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use patient_types::{EmailAddress, PatientId};

use super::{RecordStore, StoreError, StoreResult};
use crate::patient::PatientRecord;

#[derive(Default)]
struct Tables {
    // Insertion order is storage order.
    records: Vec<PatientRecord>,
    by_email: HashMap<String, PatientId>,
}

impl Tables {
    fn position(&self, id: &PatientId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }
}

/// Record store kept in memory.
///
/// Records and the email index share one lock, so every check-and-write is atomic.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn exists_by_email(&self, email: &EmailAddress) -> StoreResult<bool> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.by_email.contains_key(email.as_str()))
    }

    async fn exists_by_email_excluding(
        &self,
        email: &EmailAddress,
        id: &PatientId,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .by_email
            .get(email.as_str())
            .is_some_and(|owner| owner != id))
    }

    async fn insert(&self, record: PatientRecord) -> StoreResult<PatientRecord> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        if tables.position(&record.id).is_some() {
            return Err(StoreError::DuplicateId(record.id));
        }
        if tables.by_email.contains_key(record.email.as_str()) {
            return Err(StoreError::EmailConflict(record.email.to_string()));
        }

        tables
            .by_email
            .insert(record.email.to_string(), record.id);
        tables.records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &PatientId) -> StoreResult<Option<PatientRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.records.iter().find(|r| &r.id == id).cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<PatientRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.records.clone())
    }

    async fn delete_by_id(&self, id: &PatientId) -> StoreResult<bool> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let Some(index) = tables.position(id) else {
            return Ok(false);
        };
        let removed = tables.records.remove(index);
        tables.by_email.remove(removed.email.as_str());
        Ok(true)
    }

    async fn save(&self, record: PatientRecord) -> StoreResult<PatientRecord> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let index = tables
            .position(&record.id)
            .ok_or(StoreError::Missing(record.id))?;

        if let Some(owner) = tables.by_email.get(record.email.as_str()) {
            if owner != &record.id {
                return Err(StoreError::EmailConflict(record.email.to_string()));
            }
        }

        let previous_email = tables.records[index].email.to_string();
        tables.by_email.remove(&previous_email);
        tables
            .by_email
            .insert(record.email.to_string(), record.id);
        tables.records[index] = record.clone();
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_then_find() {
        contract::insert_then_find(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        contract::insert_rejects_duplicate_email(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        contract::insert_rejects_duplicate_id(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_exists_excluding_ignores_self() {
        contract::exists_excluding_ignores_self(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_save_updates_in_place() {
        contract::save_updates_in_place(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_save_rejects_taken_email() {
        contract::save_rejects_taken_email(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_save_rejects_missing_record() {
        contract::save_rejects_missing_record(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        contract::delete_is_idempotent(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test]
    async fn test_find_all_keeps_insertion_order() {
        contract::find_all_keeps_insertion_order(&InMemoryRecordStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_admit_one_per_email() {
        contract::concurrent_inserts_admit_one_per_email(Arc::new(InMemoryRecordStore::new()))
            .await;
    }
}
