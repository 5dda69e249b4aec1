//! Input validation utilities.
//!
//! Requests arrive as loosely-typed [`PatientInput`] values. The functions here check every
//! field, collect one message per failing field, and only produce a [`NewPatient`] or
//! [`PatientChanges`] when all fields are valid.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use patient_types::{EmailAddress, NonEmptyText, TextError};

use crate::constants::MAX_NAME_LEN;
use crate::patient::{NewPatient, PatientChanges};

/// Field names used as keys in [`ValidationErrors`]. They match the JSON field names.
pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const ADDRESS: &str = "address";
    pub const DATE_OF_BIRTH: &str = "dateOfBirth";
    pub const REGISTERED_DATE: &str = "registeredDate";
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Unvalidated patient attributes as received from a caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub registered_date: Option<String>,
}

/// Per-field validation failures, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // Only the first failure per field is kept.
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Validates a creation request. All five attributes are required.
///
/// # Errors
///
/// Returns every failing field at once.
pub fn validate_create(input: &PatientInput) -> Result<NewPatient, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = check_name(&mut errors, input.name.as_deref());
    let email = check_email(&mut errors, input.email.as_deref());
    let address = check_address(&mut errors, input.address.as_deref());
    let date_of_birth = check_date(
        &mut errors,
        fields::DATE_OF_BIRTH,
        input.date_of_birth.as_deref(),
        "Date of birth is required",
        "Date of birth must be a valid date (YYYY-MM-DD)",
    );
    let registered_date = check_date(
        &mut errors,
        fields::REGISTERED_DATE,
        input.registered_date.as_deref(),
        "Registered date is required",
        "Registered date must be a valid date (YYYY-MM-DD)",
    );

    match (name, email, address, date_of_birth, registered_date) {
        (Some(name), Some(email), Some(address), Some(date_of_birth), Some(registered_date))
            if errors.is_empty() =>
        {
            Ok(NewPatient {
                name,
                email,
                address,
                date_of_birth,
                registered_date,
            })
        }
        _ => Err(errors),
    }
}

/// Validates an update request. The registration date is ignored if present.
///
/// # Errors
///
/// Returns every failing field at once.
pub fn validate_update(input: &PatientInput) -> Result<PatientChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = check_name(&mut errors, input.name.as_deref());
    let email = check_email(&mut errors, input.email.as_deref());
    let address = check_address(&mut errors, input.address.as_deref());
    let date_of_birth = check_date(
        &mut errors,
        fields::DATE_OF_BIRTH,
        input.date_of_birth.as_deref(),
        "Date of birth is required",
        "Date of birth must be a valid date (YYYY-MM-DD)",
    );

    match (name, email, address, date_of_birth) {
        (Some(name), Some(email), Some(address), Some(date_of_birth)) if errors.is_empty() => {
            Ok(PatientChanges {
                name,
                email,
                address,
                date_of_birth,
            })
        }
        _ => Err(errors),
    }
}

fn check_name(errors: &mut ValidationErrors, value: Option<&str>) -> Option<NonEmptyText> {
    match NonEmptyText::with_max_len(value.unwrap_or_default(), MAX_NAME_LEN) {
        Ok(name) => Some(name),
        Err(TextError::TooLong { max }) => {
            errors.add(fields::NAME, format!("Name cannot exceed {max} characters"));
            None
        }
        Err(_) => {
            errors.add(fields::NAME, "Name is required");
            None
        }
    }
}

fn check_email(errors: &mut ValidationErrors, value: Option<&str>) -> Option<EmailAddress> {
    match EmailAddress::parse(value.unwrap_or_default()) {
        Ok(email) => Some(email),
        Err(TextError::Empty) => {
            errors.add(fields::EMAIL, "Email is required");
            None
        }
        Err(_) => {
            errors.add(fields::EMAIL, "Email should be valid");
            None
        }
    }
}

fn check_address(errors: &mut ValidationErrors, value: Option<&str>) -> Option<NonEmptyText> {
    match NonEmptyText::new(value.unwrap_or_default()) {
        Ok(address) => Some(address),
        Err(_) => {
            errors.add(fields::ADDRESS, "Address is required");
            None
        }
    }
}

fn check_date(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    missing: &str,
    malformed: &str,
) -> Option<NaiveDate> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    let Some(value) = value else {
        errors.add(field, missing);
        return None;
    };

    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, malformed);
            None
        }
    }
}
