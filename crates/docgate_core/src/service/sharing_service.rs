//! Sharing workflow writes paired with cache invalidation.
//!
//! # Responsibility
//! - Add and remove collaborations and project memberships.
//! - Destroy projects together with their edges.
//! - Invalidate every `AccessCache` entry the write can affect, after the
//!   write has committed.
//!
//! # Invariants
//! - Each operation runs in one immediate transaction.
//! - Invalidation only happens when a row actually changed, and always
//!   drops whole entries.

use crate::model::account::AccountId;
use crate::model::document::DocumentId;
use crate::model::project::{Collaboration, ProjectId, ProjectMembership};
use crate::policy::cache::AccessCache;
use crate::repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
use crate::repo::RepoError;
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Service error for sharing writes.
#[derive(Debug, Error)]
pub enum SharingError {
    /// Referenced account, project or document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    /// Persistence-layer failure.
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for SharingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for SharingError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Sharing workflow facade.
pub struct SharingService<'conn> {
    conn: &'conn mut Connection,
    cache: Arc<AccessCache>,
}

impl<'conn> SharingService<'conn> {
    pub fn new(conn: &'conn mut Connection, cache: Arc<AccessCache>) -> Self {
        Self { conn, cache }
    }

    /// Invites `account_id` into the collaborator set of `project_id`.
    ///
    /// Returns `false` when the account already collaborated on it.
    pub fn add_collaborator(
        &mut self,
        project_id: ProjectId,
        account_id: AccountId,
    ) -> Result<bool, SharingError> {
        let edge = Collaboration {
            account_id,
            project_id,
        };
        let added = self.write(|repo| repo.add_collaboration(edge))?;
        if added {
            self.invalidate_collaboration(edge, "collaboration_add");
        }
        Ok(added)
    }

    /// Removes `account_id` from the collaborator set of `project_id`.
    pub fn remove_collaborator(
        &mut self,
        project_id: ProjectId,
        account_id: AccountId,
    ) -> Result<bool, SharingError> {
        let edge = Collaboration {
            account_id,
            project_id,
        };
        let removed = self.write(|repo| repo.remove_collaboration(edge))?;
        if removed {
            self.invalidate_collaboration(edge, "collaboration_remove");
        }
        Ok(removed)
    }

    /// Places a document inside a project.
    pub fn add_document_to_project(
        &mut self,
        project_id: ProjectId,
        document_id: DocumentId,
    ) -> Result<bool, SharingError> {
        let edge = ProjectMembership {
            document_id,
            project_id,
        };
        let added = self.write(|repo| repo.add_membership(edge))?;
        if added {
            self.invalidate_project(project_id, "membership_add");
        }
        Ok(added)
    }

    /// Takes a document out of a project.
    pub fn remove_document_from_project(
        &mut self,
        project_id: ProjectId,
        document_id: DocumentId,
    ) -> Result<bool, SharingError> {
        let edge = ProjectMembership {
            document_id,
            project_id,
        };
        let removed = self.write(|repo| repo.remove_membership(edge))?;
        if removed {
            self.invalidate_project(project_id, "membership_remove");
        }
        Ok(removed)
    }

    /// Deletes a project; its collaborations and memberships cascade.
    pub fn destroy_project(&mut self, project_id: ProjectId) -> Result<(), SharingError> {
        self.write(|repo| repo.delete_project(project_id))?;
        self.invalidate_project(project_id, "project_destroy");
        Ok(())
    }

    fn write<T>(
        &mut self,
        op: impl FnOnce(&SqliteWorkspaceRepository<'_>) -> Result<T, RepoError>,
    ) -> Result<T, SharingError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = {
            let repo = SqliteWorkspaceRepository::try_new(&tx)?;
            op(&repo)?
        };
        tx.commit()?;
        Ok(value)
    }

    fn invalidate_collaboration(&self, edge: Collaboration, trigger: &str) {
        let account_dropped = self.cache.invalidate_account(edge.account_id);
        let project_dropped = self.cache.invalidate_project(edge.project_id);
        info!(
            "event=sharing_write module=sharing status=ok trigger={} account_id={} project_id={} invalidated={}",
            trigger,
            edge.account_id,
            edge.project_id,
            usize::from(account_dropped) + project_dropped
        );
    }

    fn invalidate_project(&self, project_id: ProjectId, trigger: &str) {
        let dropped = self.cache.invalidate_project(project_id);
        info!(
            "event=sharing_write module=sharing status=ok trigger={} project_id={} invalidated={}",
            trigger, project_id, dropped
        );
    }
}
