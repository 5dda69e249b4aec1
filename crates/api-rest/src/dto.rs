//! JSON request and response bodies.

use patient_core::{PatientInput, PatientRecord};
use serde::{Deserialize, Serialize};

/// Body of `POST /patients` and `PUT /patients/{id}`.
///
/// Every field is optional here so missing fields are reported by validation with a
/// field-keyed message instead of failing deserialization.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub registered_date: Option<String>,
}

impl From<PatientRequest> for PatientInput {
    fn from(req: PatientRequest) -> Self {
        PatientInput {
            name: req.name,
            email: req.email,
            address: req.address,
            date_of_birth: req.date_of_birth,
            registered_date: req.registered_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub date_of_birth: String,
    pub registered_date: String,
}

impl From<PatientRecord> for PatientResponse {
    fn from(record: PatientRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name.to_string(),
            email: record.email.to_string(),
            address: record.address.to_string(),
            date_of_birth: record.date_of_birth.to_string(),
            registered_date: record.registered_date.to_string(),
        }
    }
}

/// Error body for business errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
