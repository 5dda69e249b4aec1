//! Recording collaborators for tests.
//!
//! Enabled for this crate's own tests and, through the `test-support` feature, for downstream
//! crates that need a [`PatientService`](crate::service::PatientService) without a billing
//! service or broker.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::billing::{AccountProvisioner, BillingAccount, BillingProvisionRequest, ProvisioningError};
use crate::events::{EventPublisher, PatientLifecycleEvent, PublishError};

/// Provisioner that records every request and answers with a fixed outcome.
#[derive(Default)]
pub struct RecordingProvisioner {
    requests: Mutex<Vec<BillingProvisionRequest>>,
    failure: Option<ProvisioningError>,
}

impl RecordingProvisioner {
    /// A provisioner whose calls all fail with `error`.
    pub fn failing(error: ProvisioningError) -> Self {
        Self {
            requests: Mutex::default(),
            failure: Some(error),
        }
    }

    pub fn requests(&self) -> Vec<BillingProvisionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountProvisioner for RecordingProvisioner {
    async fn provision(
        &self,
        request: BillingProvisionRequest,
    ) -> Result<BillingAccount, ProvisioningError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(BillingAccount {
                account_id: "12345".into(),
                status: "ACTIVE".into(),
            }),
        }
    }
}

/// Publisher that records every event it is given.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PatientLifecycleEvent>>,
    fail: bool,
}

impl RecordingPublisher {
    /// A publisher that records events and then reports a closed channel.
    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<PatientLifecycleEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: PatientLifecycleEvent) -> Result<(), PublishError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.fail {
            return Err(PublishError::Closed);
        }
        Ok(())
    }
}
