//! Domain model for the document workspace access graph.
//!
//! # Responsibility
//! - Define the records the access engine reads: accounts, organizations,
//!   projects, documents, and the two edge kinds linking them.
//! - Keep storage encodings (role / access integers) next to the enums they
//!   encode so repositories and tests share one mapping.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Every document has exactly one owner account.
//! - Access levels form a closed set; unknown stored values are preserved as
//!   data errors, never coerced into a valid level.

use thiserror::Error;

pub mod account;
pub mod document;
pub mod project;

/// Validation failure for records about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelValidationError {
    /// A required text field is empty after trimming.
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
    /// Writes must carry one of the six known access levels.
    #[error("access level {0} is not a known value")]
    UnrecognizedAccessLevel(i64),
}

pub(crate) fn require_non_empty(
    field: &'static str,
    value: &str,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}
