//! # Billing Stub
//!
//! A stand-in for the billing service, speaking the same gRPC contract.
//!
//! Every `CreateBillingAccount` call is answered with a fixed account id and status. An
//! optional artificial delay lets callers exercise their timeout handling.

#![warn(rust_2018_idioms)]

pub mod config;

pub use config::StubConfig;

use std::time::Duration;

use api_shared::billing::billing_service_server::{BillingService, BillingServiceServer};
use api_shared::billing::{BillingRequest, BillingResponse};
use tonic::{Request, Response, Status};

pub const DEFAULT_ACCOUNT_ID: &str = "12345";
pub const DEFAULT_ACCOUNT_STATUS: &str = "ACTIVE";

#[derive(Clone, Debug)]
pub struct BillingStub {
    account_id: String,
    status: String,
    delay: Option<Duration>,
}

impl Default for BillingStub {
    fn default() -> Self {
        Self {
            account_id: DEFAULT_ACCOUNT_ID.into(),
            status: DEFAULT_ACCOUNT_STATUS.into(),
            delay: None,
        }
    }
}

impl BillingStub {
    /// Delays every response by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Wraps the stub in the generated tonic server type.
    pub fn into_server(self) -> BillingServiceServer<Self> {
        BillingServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl BillingService for BillingStub {
    async fn create_billing_account(
        &self,
        req: Request<BillingRequest>,
    ) -> Result<Response<BillingResponse>, Status> {
        let req = req.into_inner();
        tracing::info!(
            "CreateBillingAccount patient_id={} name={} email={}",
            req.patient_id,
            req.name,
            req.email
        );

        if req.patient_id.is_empty() {
            return Err(Status::invalid_argument("patient_id is required"));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(Response::new(BillingResponse {
            account_id: self.account_id.clone(),
            status: self.status.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_billing_account_returns_fixed_account() {
        let stub = BillingStub::default();
        let res = stub
            .create_billing_account(Request::new(BillingRequest {
                patient_id: "a".into(),
                name: "Jane Smith".into(),
                email: "jane@x.com".into(),
            }))
            .await
            .expect("call should succeed")
            .into_inner();

        assert_eq!(res.account_id, DEFAULT_ACCOUNT_ID);
        assert_eq!(res.status, DEFAULT_ACCOUNT_STATUS);
    }

    #[tokio::test]
    async fn test_create_billing_account_rejects_missing_patient_id() {
        let stub = BillingStub::default();
        let status = stub
            .create_billing_account(Request::new(BillingRequest::default()))
            .await
            .expect_err("empty patient id should be rejected");

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
