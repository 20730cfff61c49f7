//! Edit-authorization policy.
//!
//! # Responsibility
//! - Decide whether an account may edit a document through ownership,
//!   organization administration, or one-hop collaborative sharing.
//! - Maintain memoized per-account listing sets for browsing views.
//!
//! # Invariants
//! - Edit decisions always read the live graph; they never read
//!   `AccessCache`, whose snapshots may lag behind revoked collaborations.
//! - Every failure path denies. Errors are returned, never mapped to allow.

use crate::model::account::AccountId;
use crate::model::document::{DocumentId, InvalidAccessLevel};
use crate::repo::RepoError;
use serde::Serialize;
use thiserror::Error;

pub mod cache;
pub mod engine;

pub type AccessResult<T> = Result<T, AccessError>;

/// Failure to produce an access decision.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The account id does not resolve; nothing was evaluated.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),
    /// The document id does not resolve; nothing was evaluated.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),
    /// The store failed or returned unreadable data.
    #[error("graph query failed: {0}")]
    GraphQuery(#[source] RepoError),
}

impl AccessError {
    /// Whether the caller may retry the same request.
    ///
    /// Only transport failures qualify; unreadable persisted data fails the
    /// same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GraphQuery(RepoError::Db(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound(_) | Self::DocumentNotFound(_))
    }
}

impl From<RepoError> for AccessError {
    fn from(value: RepoError) -> Self {
        Self::GraphQuery(value)
    }
}

impl From<rusqlite::Error> for AccessError {
    fn from(value: rusqlite::Error) -> Self {
        Self::GraphQuery(value.into())
    }
}

/// Why a collaborator's own identity qualifies for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedBasis {
    CollaboratorOwns,
    CollaboratorAdministers,
}

/// The grant that allowed an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditGrant {
    Owner,
    Administrator,
    /// A co-collaborator on a shared project owns or administers the
    /// document.
    Shared {
        collaborator: AccountId,
        basis: SharedBasis,
    },
}

impl EditGrant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Administrator => "administrator",
            Self::Shared { .. } => "shared",
        }
    }
}

/// Outcome of one edit evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditDecision {
    pub allowed: bool,
    /// First grant found in evaluation order; `None` when denied.
    pub grant: Option<EditGrant>,
    /// Set when the document's stored access level is outside the closed
    /// set. Such documents are never administrable.
    pub invalid_access_level: Option<InvalidAccessLevel>,
}

impl EditDecision {
    pub(crate) fn from_grant(
        grant: Option<EditGrant>,
        invalid_access_level: Option<InvalidAccessLevel>,
    ) -> Self {
        Self {
            allowed: grant.is_some(),
            grant,
            invalid_access_level,
        }
    }
}
