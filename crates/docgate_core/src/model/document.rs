//! Document model and the closed access-level set.
//!
//! # Responsibility
//! - Define the document record the edit decision is made about.
//! - Own the administrator allow-list over access levels.
//!
//! # Invariants
//! - `owner_id` is always set; a document has exactly one owner.
//! - Only levels in [`ADMINISTRABLE_ACCESS_LEVELS`] are administrable.
//!   `Private` and any unrecognized stored value are not (fail-closed).
//! - The ingestion pipeline moves `Pending` to `Public`, `Organization`,
//!   `Exclusive` or `Error`; this crate only reads the current value.

use super::account::{Account, AccountId, OrganizationId};
use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable document identifier.
pub type DocumentId = Uuid;

/// Document visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Visible to the owner and its collaborators only.
    Private,
    /// Visible to the owner's organization.
    Organization,
    /// Published to a restricted audience.
    Exclusive,
    /// Published to everyone.
    Public,
    /// Still being processed by ingestion.
    Pending,
    /// Ingestion failed.
    Error,
}

/// Access levels an administrator of the owning organization may edit.
///
/// Allow-list: a level missing here is never administrable.
pub const ADMINISTRABLE_ACCESS_LEVELS: [AccessLevel; 5] = [
    AccessLevel::Organization,
    AccessLevel::Exclusive,
    AccessLevel::Public,
    AccessLevel::Pending,
    AccessLevel::Error,
];

impl AccessLevel {
    pub const ALL: [AccessLevel; 6] = [
        Self::Private,
        Self::Organization,
        Self::Exclusive,
        Self::Public,
        Self::Pending,
        Self::Error,
    ];

    /// Integer stored in `documents.access`.
    pub fn as_db(self) -> i64 {
        match self {
            Self::Private => 1,
            Self::Organization => 2,
            Self::Exclusive => 3,
            Self::Public => 4,
            Self::Pending => 5,
            Self::Error => 6,
        }
    }

    /// Decodes a stored access integer.
    pub fn from_db(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_db() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Organization => "organization",
            Self::Exclusive => "exclusive",
            Self::Public => "public",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    /// Whether an administrator of the owning organization may edit a
    /// document at this level.
    pub fn is_administrable(self) -> bool {
        ADMINISTRABLE_ACCESS_LEVELS.contains(&self)
    }
}

/// Access level as read from storage.
///
/// An out-of-range stored integer still lets the document resolve, so the
/// owner keeps access and the anomaly can be reported, but it never matches
/// the administrator allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredAccessLevel {
    Known(AccessLevel),
    Unrecognized(i64),
}

impl StoredAccessLevel {
    pub fn from_db(value: i64) -> Self {
        match AccessLevel::from_db(value) {
            Some(level) => Self::Known(level),
            None => Self::Unrecognized(value),
        }
    }

    pub fn as_db(self) -> i64 {
        match self {
            Self::Known(level) => level.as_db(),
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn known(self) -> Option<AccessLevel> {
        match self {
            Self::Known(level) => Some(level),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn is_administrable(self) -> bool {
        self.known().is_some_and(AccessLevel::is_administrable)
    }
}

impl From<AccessLevel> for StoredAccessLevel {
    fn from(level: AccessLevel) -> Self {
        Self::Known(level)
    }
}

/// A document whose stored access level lies outside the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("document {document_id} has unrecognized access level {raw}")]
pub struct InvalidAccessLevel {
    pub document_id: DocumentId,
    pub raw: i64,
}

/// Uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// The single owning account.
    pub owner_id: AccountId,
    pub organization_id: OrganizationId,
    pub access: StoredAccessLevel,
    pub title: String,
}

impl Document {
    /// Creates a document owned by `owner`, inside the owner's organization.
    pub fn new(owner: &Account, access: AccessLevel, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            organization_id: owner.organization_id,
            access: StoredAccessLevel::Known(access),
            title: title.into(),
        }
    }

    /// Returns the data error for an unrecognized stored access level.
    pub fn invalid_access_level(&self) -> Option<InvalidAccessLevel> {
        match self.access {
            StoredAccessLevel::Known(_) => None,
            StoredAccessLevel::Unrecognized(raw) => Some(InvalidAccessLevel {
                document_id: self.id,
                raw,
            }),
        }
    }

    /// Validates a document before it is written.
    ///
    /// Writes only accept known access levels; `Unrecognized` exists to
    /// represent rows that were corrupted outside this crate.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("document.title", &self.title)?;
        if let StoredAccessLevel::Unrecognized(raw) = self.access {
            return Err(ModelValidationError::UnrecognizedAccessLevel(raw));
        }
        Ok(())
    }
}
