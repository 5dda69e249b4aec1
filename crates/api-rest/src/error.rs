//! Translation of core errors into HTTP responses.
//!
//! | error                              | status | body                                  |
//! |------------------------------------|--------|---------------------------------------|
//! | malformed JSON body                | 400    | `{"message": ...}`                    |
//! | path id is not a UUID              | 400    | `{"message": "Invalid patient id"}`   |
//! | `PatientError::Validation`         | 400    | `{"<field>": "<message>", ...}`       |
//! | `PatientError::InvalidInput`       | 400    | `{"message": ...}`                    |
//! | `PatientError::PatientNotFound`    | 404    | `{"message": "Patient not found"}`    |
//! | `PatientError::EmailAlreadyExists` | 409    | `{"message": "Email address already exists"}` |
//! | `PatientError::ProvisioningFailed` | 502    | `{"message": ...}`                    |
//! | `PatientError::Store`              | 500    | `{"message": "Internal error"}`       |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use patient_core::PatientError;

use crate::dto::MessageResponse;

pub const INVALID_PATIENT_ID: &str = "Invalid patient id";
pub const PATIENT_NOT_FOUND: &str = "Patient not found";
pub const EMAIL_ALREADY_EXISTS: &str = "Email address already exists";
pub const BILLING_UNAVAILABLE: &str = "Billing account could not be created";
pub const INTERNAL_ERROR: &str = "Internal error";

#[derive(Debug)]
pub enum ApiError {
    MalformedBody(String),
    InvalidId,
    Patient(PatientError),
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        Self::Patient(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(MessageResponse::new(text))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::MalformedBody(detail) => return message(StatusCode::BAD_REQUEST, detail),
            ApiError::InvalidId => return message(StatusCode::BAD_REQUEST, INVALID_PATIENT_ID),
            ApiError::Patient(err) => err,
        };

        match err {
            PatientError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors.field_errors().clone())).into_response()
            }
            PatientError::InvalidInput(detail) => message(StatusCode::BAD_REQUEST, detail),
            PatientError::PatientNotFound(id) => {
                tracing::info!("patient {} not found", id);
                message(StatusCode::NOT_FOUND, PATIENT_NOT_FOUND)
            }
            PatientError::EmailAlreadyExists(email) => {
                tracing::info!("email {} already in use", email);
                message(StatusCode::CONFLICT, EMAIL_ALREADY_EXISTS)
            }
            e @ PatientError::ProvisioningFailed { .. } => {
                tracing::error!("{}", e);
                message(StatusCode::BAD_GATEWAY, BILLING_UNAVAILABLE)
            }
            PatientError::Store(e) => {
                tracing::error!("record store error: {:?}", e);
                message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}
