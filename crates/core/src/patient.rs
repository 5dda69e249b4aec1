//! Patient record model.

use chrono::NaiveDate;
use patient_types::{EmailAddress, NonEmptyText, PatientId};

/// A persisted patient record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    pub id: PatientId,
    pub name: NonEmptyText,
    /// Unique across all records.
    pub email: EmailAddress,
    pub address: NonEmptyText,
    pub date_of_birth: NaiveDate,
    /// Set once at creation.
    pub registered_date: NaiveDate,
}

/// A validated creation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPatient {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub address: NonEmptyText,
    pub date_of_birth: NaiveDate,
    pub registered_date: NaiveDate,
}

impl NewPatient {
    pub fn into_record(self, id: PatientId) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name,
            email: self.email,
            address: self.address,
            date_of_birth: self.date_of_birth,
            registered_date: self.registered_date,
        }
    }
}

/// A validated update request. The registration date is not updatable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientChanges {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub address: NonEmptyText,
    pub date_of_birth: NaiveDate,
}

impl PatientRecord {
    /// Overwrites the mutable attributes with `changes`, keeping id and registration date.
    pub fn apply(&mut self, changes: PatientChanges) {
        self.name = changes.name;
        self.email = changes.email;
        self.address = changes.address;
        self.date_of_birth = changes.date_of_birth;
    }
}
