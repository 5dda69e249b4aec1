//! # API REST
//!
//! REST API for the patient service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - JSON request and response bodies
//! - Translating core errors into status codes and error bodies
//!
//! Business rules live in `patient-core`; this crate only parses, delegates and translates.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};

use api_shared::{HealthRes, HealthService};
use patient_core::{
    validate_create, validate_update, PatientError, PatientId, PatientInput, PatientService,
};

use crate::dto::{PatientRequest, PatientResponse};
use crate::error::ApiError;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub patient_service: PatientService,
}

/// Builds the REST router for the patient service.
///
/// Cross-cutting layers (CORS, tracing) are left to the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", put(update_patient).delete(delete_patient))
        .with_state(state)
}

/// Health check endpoint.
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

/// List all patients in storage order.
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<Vec<PatientResponse>>, ApiError> {
    let patients = state.patient_service.list_patients().await?;
    Ok(Json(patients.into_iter().map(PatientResponse::from).collect()))
}

/// Create a patient, provision their billing account and announce the creation.
///
/// # Errors
/// - `400` if the body is malformed or fails validation
/// - `409` if the email is already in use
/// - `502` if billing provisioning fails; the record has still been stored
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    body: Result<Json<PatientRequest>, JsonRejection>,
) -> Result<Json<PatientResponse>, ApiError> {
    let Json(req) = body?;
    let new = validate_create(&PatientInput::from(req)).map_err(PatientError::from)?;

    let record = state.patient_service.create_patient(new).await?;
    Ok(Json(record.into()))
}

/// Update a patient's name, email, address and date of birth.
///
/// # Errors
/// - `400` if the id is not a UUID, or the body is malformed or fails validation
/// - `404` if no patient has the id
/// - `409` if another patient uses the email
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PatientRequest>, JsonRejection>,
) -> Result<Json<PatientResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = body?;
    let changes =
        validate_update(&PatientInput::from(req)).map_err(PatientError::from)?;

    let record = state.patient_service.update_patient(&id, changes).await?;
    Ok(Json(record.into()))
}

/// Delete a patient. Unknown ids also answer `204`.
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.patient_service.delete_patient(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<PatientId, ApiError> {
    PatientId::parse(raw).map_err(|e| {
        tracing::debug!("rejecting patient id: {}", e);
        ApiError::InvalidId
    })
}
