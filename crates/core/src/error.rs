use crate::billing::ProvisioningError;
use crate::store::StoreError;
use crate::validation::ValidationErrors;
use patient_types::PatientId;

/// Errors surfaced by the patient orchestrator.
///
/// Every variant is terminal for the request that produced it; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("a patient with this email already exists: {0}")]
    EmailAlreadyExists(String),
    #[error("patient not found with id: {0}")]
    PatientNotFound(PatientId),
    /// The billing account could not be provisioned. The patient record written before the
    /// call is left in place.
    #[error("billing account provisioning failed for patient {patient_id}: {source}")]
    ProvisioningFailed {
        patient_id: PatientId,
        #[source]
        source: ProvisioningError,
    },
    #[error("record store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for PatientError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
