//! Patient write orchestration.
//!
//! [`PatientService`] sequences the side effects of each patient operation:
//!
//! | operation | effects, in order                                                        |
//! |-----------|--------------------------------------------------------------------------|
//! | create    | email pre-check, insert, billing provisioning, lifecycle event hand-off  |
//! | update    | lookup, email pre-check excluding self, save                             |
//! | delete    | delete (absent ids are fine)                                             |
//! | list      | read all                                                                 |
//!
//! ## Consistency
//!
//! The email pre-check gives a fast, clear failure; the store's own constraint decides races
//! between concurrent writers. Both surface as [`PatientError::EmailAlreadyExists`].
//!
//! Provisioning runs after the insert has committed and is not compensated. If it fails the
//! request fails with [`PatientError::ProvisioningFailed`] while the record stays stored
//! without a confirmed billing account. The lifecycle event is only published after a
//! successful provisioning call, and a failed hand-off is logged and ignored.

use std::sync::Arc;

use patient_types::PatientId;

use crate::billing::{AccountProvisioner, BillingProvisionRequest};
use crate::error::{PatientError, PatientResult};
use crate::events::{EventPublisher, PatientLifecycleEvent};
use crate::patient::{NewPatient, PatientChanges, PatientRecord};
use crate::store::{RecordStore, StoreError};

/// Stateless orchestrator over the record store, billing and event collaborators.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn RecordStore>,
    provisioner: Arc<dyn AccountProvisioner>,
    publisher: Arc<dyn EventPublisher>,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provisioner: Arc<dyn AccountProvisioner>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            provisioner,
            publisher,
        }
    }

    /// Lists all patient records in storage order.
    pub async fn list_patients(&self) -> PatientResult<Vec<PatientRecord>> {
        Ok(self.store.find_all().await?)
    }

    /// Creates a patient record.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if:
    /// - the email is already used by a record ([`PatientError::EmailAlreadyExists`]); nothing
    ///   is written, provisioned or published
    /// - the billing call fails or times out ([`PatientError::ProvisioningFailed`]); the record
    ///   has already been stored and is kept, no event is published
    /// - the record store fails ([`PatientError::Store`])
    pub async fn create_patient(&self, new: NewPatient) -> PatientResult<PatientRecord> {
        if self.store.exists_by_email(&new.email).await? {
            return Err(PatientError::EmailAlreadyExists(new.email.to_string()));
        }

        let record = self
            .store
            .insert(new.into_record(PatientId::new()))
            .await
            .map_err(map_email_conflict)?;
        tracing::info!("patient {} created", record.id);

        let account = self
            .provisioner
            .provision(BillingProvisionRequest::from(&record))
            .await
            .map_err(|source| {
                tracing::error!(
                    "billing provisioning failed for patient {}, record kept: {}",
                    record.id,
                    source
                );
                PatientError::ProvisioningFailed {
                    patient_id: record.id,
                    source,
                }
            })?;
        tracing::debug!(
            "patient {} has billing account {} ({})",
            record.id,
            account.account_id,
            account.status
        );

        if let Err(e) = self
            .publisher
            .publish(PatientLifecycleEvent::created(&record))
            .await
        {
            tracing::warn!("lifecycle event for patient {} not published: {}", record.id, e);
        }

        Ok(record)
    }

    /// Updates the mutable attributes of an existing patient.
    ///
    /// No billing call is made and no event is published.
    ///
    /// # Errors
    ///
    /// Returns `PatientError` if:
    /// - no record has `id` ([`PatientError::PatientNotFound`])
    /// - another record uses the new email ([`PatientError::EmailAlreadyExists`])
    /// - the record store fails ([`PatientError::Store`])
    pub async fn update_patient(
        &self,
        id: &PatientId,
        changes: PatientChanges,
    ) -> PatientResult<PatientRecord> {
        let mut record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(PatientError::PatientNotFound(*id))?;

        if self
            .store
            .exists_by_email_excluding(&changes.email, id)
            .await?
        {
            return Err(PatientError::EmailAlreadyExists(changes.email.to_string()));
        }

        record.apply(changes);

        let record = self.store.save(record).await.map_err(|e| match e {
            StoreError::Missing(id) => PatientError::PatientNotFound(id),
            other => map_email_conflict(other),
        })?;
        tracing::info!("patient {} updated", record.id);

        Ok(record)
    }

    /// Deletes a patient record. Deleting an unknown id succeeds.
    pub async fn delete_patient(&self, id: &PatientId) -> PatientResult<()> {
        if self.store.delete_by_id(id).await? {
            tracing::info!("patient {} deleted", id);
        } else {
            tracing::debug!("delete requested for unknown patient {}", id);
        }
        Ok(())
    }
}

fn map_email_conflict(err: StoreError) -> PatientError {
    match err {
        StoreError::EmailConflict(email) => PatientError::EmailAlreadyExists(email),
        other => PatientError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::ProvisioningError;
    use crate::store::InMemoryRecordStore;
    use crate::testing::{RecordingProvisioner, RecordingPublisher};
    use crate::validation::{validate_create, validate_update, PatientInput};
    use async_trait::async_trait;
    use patient_types::EmailAddress;
    use std::time::Duration;

    struct Harness {
        service: PatientService,
        store: Arc<InMemoryRecordStore>,
        provisioner: Arc<RecordingProvisioner>,
        publisher: Arc<RecordingPublisher>,
    }

    fn harness_with(provisioner: RecordingProvisioner, publisher: RecordingPublisher) -> Harness {
        let store = Arc::new(InMemoryRecordStore::new());
        let provisioner = Arc::new(provisioner);
        let publisher = Arc::new(publisher);
        let service = PatientService::new(store.clone(), provisioner.clone(), publisher.clone());
        Harness {
            service,
            store,
            provisioner,
            publisher,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingProvisioner::default(), RecordingPublisher::default())
    }

    fn input(name: &str, email: &str) -> PatientInput {
        PatientInput {
            name: Some(name.into()),
            email: Some(email.into()),
            address: Some("456 Oak Ave".into()),
            date_of_birth: Some("1985-03-20".into()),
            registered_date: Some("2024-02-08".into()),
        }
    }

    fn new_patient(name: &str, email: &str) -> NewPatient {
        validate_create(&input(name, email)).expect("test input should be valid")
    }

    fn changes(name: &str, email: &str) -> PatientChanges {
        validate_update(&input(name, email)).expect("test input should be valid")
    }

    async fn count_with_email(store: &InMemoryRecordStore, email: &str) -> usize {
        store
            .find_all()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.email.as_str() == email)
            .count()
    }

    #[tokio::test]
    async fn test_create_patient_persists_provisions_and_publishes() {
        let h = harness();

        let record = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect("create should succeed");

        assert_eq!(record.name.as_str(), "Jane Smith");
        assert_eq!(record.email.as_str(), "jane@x.com");
        assert_eq!(record.address.as_str(), "456 Oak Ave");
        assert_eq!(record.date_of_birth.to_string(), "1985-03-20");
        assert_eq!(record.registered_date.to_string(), "2024-02-08");

        assert_eq!(
            h.provisioner.requests(),
            vec![BillingProvisionRequest {
                patient_id: record.id,
                name: "Jane Smith".into(),
                email: "jane@x.com".into(),
            }]
        );
        assert_eq!(
            h.publisher.events(),
            vec![PatientLifecycleEvent::created(&record)]
        );
        assert_eq!(count_with_email(&h.store, "jane@x.com").await, 1);
    }

    #[tokio::test]
    async fn test_create_patient_assigns_fresh_ids() {
        let h = harness();
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = h
                .service
                .create_patient(new_patient("Patient", &format!("p{i}@x.com")))
                .await
                .expect("create should succeed");
            assert!(!ids.contains(&record.id), "id should be fresh");
            ids.push(record.id);
        }
    }

    #[tokio::test]
    async fn test_create_patient_with_taken_email_has_no_side_effects() {
        let h = harness();
        h.service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect("first create should succeed");

        let err = h
            .service
            .create_patient(new_patient("Jane Again", "jane@x.com"))
            .await
            .expect_err("second create should fail");

        assert!(matches!(err, PatientError::EmailAlreadyExists(ref e) if e == "jane@x.com"));
        assert_eq!(h.provisioner.requests().len(), 1, "no second provisioning call");
        assert_eq!(h.publisher.events().len(), 1, "no second event");
        assert_eq!(h.store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_failure_keeps_record_and_skips_event() {
        let h = harness_with(
            RecordingProvisioner::failing(ProvisioningError::TimedOut(Duration::from_secs(5))),
            RecordingPublisher::default(),
        );

        let err = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect_err("create should fail");

        let PatientError::ProvisioningFailed { patient_id, source } = err else {
            panic!("expected ProvisioningFailed");
        };
        assert!(matches!(source, ProvisioningError::TimedOut(_)));

        let listed = h.service.list_patients().await.expect("list should succeed");
        assert_eq!(listed.len(), 1, "record stays persisted");
        assert_eq!(listed[0].id, patient_id);
        assert!(h.publisher.events().is_empty(), "no event after failure");

        // The orphaned record still holds its email.
        let err = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect_err("retry should hit the uniqueness check");
        assert!(matches!(err, PatientError::EmailAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_create() {
        let h = harness_with(RecordingProvisioner::default(), RecordingPublisher::failing());

        let record = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect("create should succeed despite publish failure");

        assert_eq!(h.publisher.events().len(), 1, "publish was attempted");
        assert_eq!(
            h.store.find_by_id(&record.id).await.unwrap(),
            Some(record)
        );
    }

    /// Store whose pre-check always misses, as if a concurrent writer slipped in between.
    struct RacingStore(InMemoryRecordStore);

    #[async_trait]
    impl RecordStore for RacingStore {
        async fn exists_by_email(&self, _: &EmailAddress) -> crate::store::StoreResult<bool> {
            Ok(false)
        }
        async fn exists_by_email_excluding(
            &self,
            _: &EmailAddress,
            _: &PatientId,
        ) -> crate::store::StoreResult<bool> {
            Ok(false)
        }
        async fn insert(&self, record: PatientRecord) -> crate::store::StoreResult<PatientRecord> {
            self.0.insert(record).await
        }
        async fn find_by_id(
            &self,
            id: &PatientId,
        ) -> crate::store::StoreResult<Option<PatientRecord>> {
            self.0.find_by_id(id).await
        }
        async fn find_all(&self) -> crate::store::StoreResult<Vec<PatientRecord>> {
            self.0.find_all().await
        }
        async fn delete_by_id(&self, id: &PatientId) -> crate::store::StoreResult<bool> {
            self.0.delete_by_id(id).await
        }
        async fn save(&self, record: PatientRecord) -> crate::store::StoreResult<PatientRecord> {
            self.0.save(record).await
        }
    }

    #[tokio::test]
    async fn test_storage_constraint_backs_up_missed_precheck() {
        let provisioner = Arc::new(RecordingProvisioner::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let service = PatientService::new(
            Arc::new(RacingStore(InMemoryRecordStore::new())),
            provisioner.clone(),
            publisher.clone(),
        );

        let jane = service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect("first create should succeed");
        let err = service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect_err("constraint should reject the second insert");
        assert!(matches!(err, PatientError::EmailAlreadyExists(_)));

        let john = service
            .create_patient(new_patient("John Smith", "john@x.com"))
            .await
            .expect("create should succeed");
        let err = service
            .update_patient(&john.id, changes("John Smith", "jane@x.com"))
            .await
            .expect_err("constraint should reject the save");
        assert!(matches!(err, PatientError::EmailAlreadyExists(_)));

        assert_eq!(provisioner.requests().len(), 2);
        assert_eq!(publisher.events().len(), 2);
        assert_eq!(service.list_patients().await.unwrap()[0], jane);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_with_same_email_admit_exactly_one() {
        let h = harness();

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = h.service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_patient(new_patient(&format!("Racer {i}"), "race@x.com"))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.expect("task should not panic") {
                Ok(_) => created += 1,
                Err(PatientError::EmailAlreadyExists(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(count_with_email(&h.store, "race@x.com").await, 1);
        assert_eq!(h.provisioner.requests().len(), 1);
        assert_eq!(h.publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn test_update_patient_applies_changes_without_side_effects() {
        let h = harness();
        let jane = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();

        let updated = h
            .service
            .update_patient(&jane.id, changes("Jane Doe", "jane.doe@x.com"))
            .await
            .expect("update should succeed");

        assert_eq!(updated.id, jane.id);
        assert_eq!(updated.name.as_str(), "Jane Doe");
        assert_eq!(updated.email.as_str(), "jane.doe@x.com");
        assert_eq!(updated.registered_date, jane.registered_date);
        assert_eq!(h.store.find_by_id(&jane.id).await.unwrap(), Some(updated));
        assert_eq!(h.provisioner.requests().len(), 1, "update does not provision");
        assert_eq!(h.publisher.events().len(), 1, "update does not publish");
    }

    #[tokio::test]
    async fn test_update_patient_keeping_own_email_succeeds() {
        let h = harness();
        let jane = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();

        let updated = h
            .service
            .update_patient(&jane.id, changes("Jane S. Smith", "jane@x.com"))
            .await
            .expect("self-owned email should be allowed");
        assert_eq!(updated.name.as_str(), "Jane S. Smith");
    }

    #[tokio::test]
    async fn test_update_patient_to_taken_email_fails() {
        let h = harness();
        h.service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();
        let john = h
            .service
            .create_patient(new_patient("John Smith", "john@x.com"))
            .await
            .unwrap();

        let err = h
            .service
            .update_patient(&john.id, changes("John Smith", "jane@x.com"))
            .await
            .expect_err("update should fail");

        assert!(matches!(err, PatientError::EmailAlreadyExists(_)));
        assert_eq!(h.store.find_by_id(&john.id).await.unwrap(), Some(john));
    }

    #[tokio::test]
    async fn test_update_unknown_patient_fails_and_leaves_store_unchanged() {
        let h = harness();
        let jane = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();
        let missing = PatientId::new();

        let err = h
            .service
            .update_patient(&missing, changes("Ghost", "ghost@x.com"))
            .await
            .expect_err("update should fail");

        assert!(matches!(err, PatientError::PatientNotFound(id) if id == missing));
        assert_eq!(h.store.find_all().await.unwrap(), vec![jane]);
    }

    #[tokio::test]
    async fn test_delete_patient_removes_record_and_frees_email() {
        let h = harness();
        let jane = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();

        h.service
            .delete_patient(&jane.id)
            .await
            .expect("delete should succeed");

        assert!(h.service.list_patients().await.unwrap().is_empty());
        h.service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .expect("email should be reusable after delete");
    }

    #[tokio::test]
    async fn test_delete_unknown_patient_succeeds() {
        let h = harness();
        let jane = h
            .service
            .create_patient(new_patient("Jane Smith", "jane@x.com"))
            .await
            .unwrap();

        h.service
            .delete_patient(&PatientId::new())
            .await
            .expect("deleting an unknown id should succeed");

        assert_eq!(h.service.list_patients().await.unwrap(), vec![jane]);
    }
}
