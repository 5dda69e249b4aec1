//! Validated value types shared by the patient service crates.
//!
//! Each type guarantees its invariant once constructed, so code holding one never has to
//! re-check it:
//! - [`NonEmptyText`]: trimmed text with at least one non-whitespace character.
//! - [`EmailAddress`]: a syntactically valid email address.
//! - [`PatientId`]: a UUID identifying a patient record.

use std::fmt;

use uuid::Uuid;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text is longer than the allowed maximum
    #[error("Text cannot exceed {max} characters")]
    TooLong { max: usize },
    /// The input is not a well-formed email address
    #[error("Invalid email address")]
    InvalidEmail,
}

/// Errors raised when parsing a patient identifier.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("Invalid patient id '{input}': {source}")]
    InvalidUuid {
        input: String,
        #[source]
        source: uuid::Error,
    },
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`], additionally bounding the length in characters.
    pub fn with_max_len(input: impl AsRef<str>, max: usize) -> Result<Self, TextError> {
        let text = Self::new(input)?;
        if text.0.chars().count() > max {
            return Err(TextError::TooLong { max });
        }
        Ok(text)
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An email address that passed syntactic validation.
///
/// The check is deliberately structural: exactly one `@`, a non-empty local part, and a
/// domain made of non-empty dot-separated labels with at least one dot. Whitespace anywhere
/// is rejected. Surrounding whitespace is trimmed before validation; case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and validates an email address.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidEmail`] when the
    /// address is malformed.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TextError::InvalidEmail);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(TextError::InvalidEmail)?;
        if local.is_empty() || domain.contains('@') {
            return Err(TextError::InvalidEmail);
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(TextError::InvalidEmail);
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a patient record.
///
/// Generated as a random (version 4) UUID when a record is created and never changed
/// afterwards. Displays in the standard hyphenated lowercase form, which is also the form
/// used on the wire and in storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(Uuid);

impl PatientId {
    /// Allocates a fresh identifier for a new record.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an externally supplied identifier.
    ///
    /// Accepts any textual UUID form understood by [`Uuid::parse_str`] (hyphenated, simple,
    /// braced or URN), so ids produced by other services round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidUuid`] if `input` is not a UUID.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        Uuid::parse_str(input.trim())
            .map(Self)
            .map_err(|source| IdError::InvalidUuid {
                input: input.to_owned(),
                source,
            })
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Jane Smith ").expect("should accept padded text");
        assert_eq!(text.as_str(), "Jane Smith");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_enforces_max_len() {
        let long = "a".repeat(101);
        assert_eq!(
            NonEmptyText::with_max_len(&long, 100),
            Err(TextError::TooLong { max: 100 })
        );
        assert!(NonEmptyText::with_max_len("a".repeat(100), 100).is_ok());
    }

    #[test]
    fn test_email_accepts_common_addresses() {
        for input in ["jane@x.com", "john.doe+tag@mail.example.org", " a@b.co "] {
            assert!(EmailAddress::parse(input).is_ok(), "{input} should be valid");
        }
    }

    #[test]
    fn test_email_rejects_malformed_addresses() {
        for input in [
            "plainaddress",
            "@x.com",
            "jane@",
            "jane@localhost",
            "jane@x..com",
            "jane@@x.com",
            "jane doe@x.com",
            "jane@x.com.",
        ] {
            assert_eq!(
                EmailAddress::parse(input),
                Err(TextError::InvalidEmail),
                "{input} should be rejected"
            );
        }
        assert_eq!(EmailAddress::parse(""), Err(TextError::Empty));
    }

    #[test]
    fn test_patient_id_display_is_hyphenated() {
        let id = PatientId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(PatientId::parse(&text).expect("should parse own output"), id);
    }

    #[test]
    fn test_patient_id_rejects_garbage() {
        let err = PatientId::parse("not-a-uuid").expect_err("should reject");
        assert!(matches!(err, IdError::InvalidUuid { .. }));
    }
}
