//! Write-side persistence for the workspace graph.
//!
//! # Responsibility
//! - Persist organizations, accounts, projects and documents created by
//!   ingestion and account management.
//! - Add and remove collaboration / membership edges for the sharing
//!   workflow.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Edge writes are idempotent and report whether a row changed.
//! - Deleting a project cascades to its collaboration and membership rows.
//! - Callers that keep an `AccessCache` must go through `SharingService`
//!   so edge writes are followed by invalidation.

use super::{ensure_tables, RepoError, RepoResult};
use crate::model::account::{Account, AccountId, Organization, OrganizationId};
use crate::model::document::{AccessLevel, Document, DocumentId};
use crate::model::project::{Collaboration, Project, ProjectId, ProjectMembership};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Write contract for workspace records and sharing edges.
pub trait WorkspaceRepository {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId>;
    fn create_account(&self, account: &Account) -> RepoResult<AccountId>;
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId>;
    /// Moves a document to another access level.
    fn set_document_access(&self, document_id: DocumentId, access: AccessLevel) -> RepoResult<()>;
    /// Returns `true` when the edge was newly inserted.
    fn add_collaboration(&self, edge: Collaboration) -> RepoResult<bool>;
    /// Returns `true` when an existing edge was removed.
    fn remove_collaboration(&self, edge: Collaboration) -> RepoResult<bool>;
    /// Returns `true` when the edge was newly inserted.
    fn add_membership(&self, edge: ProjectMembership) -> RepoResult<bool>;
    /// Returns `true` when an existing edge was removed.
    fn remove_membership(&self, edge: ProjectMembership) -> RepoResult<bool>;
    /// Deletes a project together with all of its edges.
    fn delete_project(&self, project_id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed workspace repository.
pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    /// Creates the repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "organizations",
                "accounts",
                "projects",
                "documents",
                "collaborations",
                "project_memberships",
            ],
        )?;
        Ok(Self { conn })
    }

    fn require_row(&self, table: &'static str, entity: &'static str, id: Uuid) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE uuid = ?1);"),
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::NotFound { entity, id })
        }
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn create_organization(&self, organization: &Organization) -> RepoResult<OrganizationId> {
        organization.validate()?;
        self.conn.execute(
            "INSERT INTO organizations (uuid, name) VALUES (?1, ?2);",
            params![organization.id.to_string(), organization.name.as_str()],
        )?;
        Ok(organization.id)
    }

    fn create_account(&self, account: &Account) -> RepoResult<AccountId> {
        account.validate()?;
        self.require_row("organizations", "organization", account.organization_id)?;
        self.conn.execute(
            "INSERT INTO accounts (uuid, organization_uuid, role, display_name)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                account.id.to_string(),
                account.organization_id.to_string(),
                account.role.as_db(),
                account.display_name.as_str(),
            ],
        )?;
        Ok(account.id)
    }

    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;
        self.require_row("accounts", "account", project.account_id)?;
        self.conn.execute(
            "INSERT INTO projects (uuid, account_uuid, title) VALUES (?1, ?2, ?3);",
            params![
                project.id.to_string(),
                project.account_id.to_string(),
                project.title.as_str(),
            ],
        )?;
        Ok(project.id)
    }

    fn create_document(&self, document: &Document) -> RepoResult<DocumentId> {
        document.validate()?;
        self.require_row("accounts", "account", document.owner_id)?;
        self.require_row("organizations", "organization", document.organization_id)?;
        self.conn.execute(
            "INSERT INTO documents (uuid, account_uuid, organization_uuid, access, title)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                document.id.to_string(),
                document.owner_id.to_string(),
                document.organization_id.to_string(),
                document.access.as_db(),
                document.title.as_str(),
            ],
        )?;
        Ok(document.id)
    }

    fn set_document_access(&self, document_id: DocumentId, access: AccessLevel) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                access = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![access.as_db(), document_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "document",
                id: document_id,
            });
        }
        Ok(())
    }

    fn add_collaboration(&self, edge: Collaboration) -> RepoResult<bool> {
        self.require_row("accounts", "account", edge.account_id)?;
        self.require_row("projects", "project", edge.project_id)?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO collaborations (account_uuid, project_uuid) VALUES (?1, ?2);",
            params![edge.account_id.to_string(), edge.project_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn remove_collaboration(&self, edge: Collaboration) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM collaborations WHERE account_uuid = ?1 AND project_uuid = ?2;",
            params![edge.account_id.to_string(), edge.project_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn add_membership(&self, edge: ProjectMembership) -> RepoResult<bool> {
        self.require_row("documents", "document", edge.document_id)?;
        self.require_row("projects", "project", edge.project_id)?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO project_memberships (document_uuid, project_uuid) VALUES (?1, ?2);",
            params![edge.document_id.to_string(), edge.project_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn remove_membership(&self, edge: ProjectMembership) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM project_memberships WHERE document_uuid = ?1 AND project_uuid = ?2;",
            params![edge.document_id.to_string(), edge.project_id.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn delete_project(&self, project_id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM projects WHERE uuid = ?1;",
            [project_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project_id,
            });
        }
        Ok(())
    }
}
