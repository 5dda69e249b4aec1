//! Billing account provisioning.
//!
//! The orchestrator sees one narrow call, [`AccountProvisioner::provision`]: a single
//! blocking round trip with no retry, no backoff and no idempotency key. Whatever goes wrong
//! (unreachable endpoint, remote rejection, timeout) comes back as a [`ProvisioningError`].

use std::time::Duration;

use api_shared::billing::billing_service_client::BillingServiceClient;
use api_shared::billing::BillingRequest;
use async_trait::async_trait;
use patient_types::PatientId;
use tonic::transport::{Channel, Endpoint};

use crate::patient::PatientRecord;

/// Identity snapshot sent to the billing service, taken right after persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingProvisionRequest {
    pub patient_id: PatientId,
    pub name: String,
    pub email: String,
}

impl From<&PatientRecord> for BillingProvisionRequest {
    fn from(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id,
            name: record.name.to_string(),
            email: record.email.to_string(),
        }
    }
}

/// The billing service's answer. Its contents are opaque to the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingAccount {
    pub account_id: String,
    pub status: String,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("invalid billing endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("billing call rejected ({code}): {message}")]
    Rejected { code: tonic::Code, message: String },
    #[error("billing call timed out after {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Ask the billing service to create an account. Makes at most one attempt.
    async fn provision(
        &self,
        request: BillingProvisionRequest,
    ) -> Result<BillingAccount, ProvisioningError>;
}

/// Provisioner that calls the billing service over plaintext gRPC.
#[derive(Clone, Debug)]
pub struct GrpcBillingClient {
    client: BillingServiceClient<Channel>,
    timeout: Duration,
}

impl GrpcBillingClient {
    /// Creates a client for `endpoint` (for example `http://localhost:9001`).
    ///
    /// The connection is established on first use, so the billing service does not need to
    /// be up when the patient service starts. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidEndpoint`] if `endpoint` is not a valid URI.
    pub fn connect_lazy(endpoint: &str, timeout: Duration) -> Result<Self, ProvisioningError> {
        let channel = Endpoint::from_shared(endpoint.to_owned())
            .map_err(|e| ProvisioningError::InvalidEndpoint {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            })?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();

        Ok(Self {
            client: BillingServiceClient::new(channel),
            timeout,
        })
    }
}

#[async_trait]
impl AccountProvisioner for GrpcBillingClient {
    async fn provision(
        &self,
        request: BillingProvisionRequest,
    ) -> Result<BillingAccount, ProvisioningError> {
        let mut client = self.client.clone();
        let req = BillingRequest {
            patient_id: request.patient_id.to_string(),
            name: request.name,
            email: request.email,
        };

        // The endpoint timeout covers the HTTP exchange; this one also bounds waiting for the
        // lazy connection.
        let res = tokio::time::timeout(self.timeout, client.create_billing_account(req))
            .await
            .map_err(|_| ProvisioningError::TimedOut(self.timeout))?
            .map_err(|status| ProvisioningError::Rejected {
                code: status.code(),
                message: status.message().to_owned(),
            })?
            .into_inner();

        tracing::info!(
            "billing account {} provisioned for patient {} (status {})",
            res.account_id,
            request.patient_id,
            res.status
        );

        Ok(BillingAccount {
            account_id: res.account_id,
            status: res.status,
        })
    }
}
