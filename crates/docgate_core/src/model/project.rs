//! Projects and the two edge kinds of the sharing graph.

use super::account::AccountId;
use super::document::DocumentId;
use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// Named bundle of documents shared with a set of collaborating accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Account that created the project. Creating a project does not make
    /// the creator a collaborator.
    pub account_id: AccountId,
    pub title: String,
}

impl Project {
    pub fn new(account_id: AccountId, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("project.title", &self.title)
    }
}

/// Grants `account_id` membership in the collaborator set of `project_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Collaboration {
    pub account_id: AccountId,
    pub project_id: ProjectId,
}

/// Places `document_id` inside `project_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub document_id: DocumentId,
    pub project_id: ProjectId,
}
