//! Collaboration / membership graph queries.
//!
//! # Responsibility
//! - Expose the project-level relationships the access policy walks.
//! - Resolve documents by id.
//! - Run the co-collaborator intersection as one indexed statement.
//!
//! # Invariants
//! - Read-only; safe to run concurrently on separate connections.
//! - The co-collaborator query never returns the excluded account and
//!   returns each collaborator at most once.
//! - Every join step of the co-collaborator query is an index search keyed
//!   on project id, so its cost follows the collaborations on shared
//!   projects rather than the account x project cross-product.

use super::identity_repo::parse_role;
use super::{ensure_tables, parse_uuid, RepoResult};
use crate::model::account::{AccountId, CollaboratorIdentity};
use crate::model::document::{Document, DocumentId, StoredAccessLevel};
use crate::model::project::ProjectId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;

/// Project ids bound per statement by `documents_in_projects`.
const PROJECT_ID_CHUNK: usize = 500;

/// `S ∩ T` expressed as a join: `mine` is the subject's collaboration on a
/// project, `pm` places the document in that same project, `other` lists
/// everyone collaborating on it.
const COLLABORATORS_ON_DOCUMENT_SQL: &str = "SELECT DISTINCT
    a.uuid AS uuid,
    a.organization_uuid AS organization_uuid,
    a.role AS role
FROM project_memberships pm
INNER JOIN collaborations mine
    ON mine.project_uuid = pm.project_uuid
   AND mine.account_uuid = ?2
INNER JOIN collaborations other
    ON other.project_uuid = pm.project_uuid
INNER JOIN accounts a
    ON a.uuid = other.account_uuid
WHERE pm.document_uuid = ?1
  AND other.account_uuid <> ?2;";

const DOCUMENT_SELECT_SQL: &str = "SELECT
    uuid,
    account_uuid,
    organization_uuid,
    access,
    title
FROM documents";

/// Read contract over the sharing graph.
pub trait ResourceGraph {
    /// Resolves one document, `None` when the id is unknown.
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;

    /// Projects the account collaborates on.
    fn projects_collaborated_by(&self, account_id: AccountId) -> RepoResult<BTreeSet<ProjectId>>;

    /// Accounts collaborating on one project.
    fn collaborators_of(&self, project_id: ProjectId) -> RepoResult<BTreeSet<AccountId>>;

    /// Projects the document belongs to.
    fn projects_containing(&self, document_id: DocumentId) -> RepoResult<BTreeSet<ProjectId>>;

    /// Every account, other than `excluding_account_id`, that collaborates on
    /// a project which both contains `document_id` and has
    /// `excluding_account_id` as a collaborator.
    fn accounts_collaborating_on_document(
        &self,
        document_id: DocumentId,
        excluding_account_id: AccountId,
    ) -> RepoResult<BTreeSet<CollaboratorIdentity>>;

    /// Union of the documents placed in any of `project_ids`.
    fn documents_in_projects(
        &self,
        project_ids: &BTreeSet<ProjectId>,
    ) -> RepoResult<BTreeSet<DocumentId>>;
}

/// SQLite-backed resource graph.
pub struct SqliteResourceGraph<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResourceGraph<'conn> {
    /// Creates the graph from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "accounts",
                "projects",
                "documents",
                "collaborations",
                "project_memberships",
            ],
        )?;
        Ok(Self { conn })
    }

    fn collect_ids(&self, sql: &str, key: &str, column: &str) -> RepoResult<BTreeSet<uuid::Uuid>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query([key])?;
        let mut ids = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.insert(parse_uuid(&value, column)?);
        }
        Ok(ids)
    }
}

impl ResourceGraph for SqliteResourceGraph<'_> {
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{DOCUMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn projects_collaborated_by(&self, account_id: AccountId) -> RepoResult<BTreeSet<ProjectId>> {
        self.collect_ids(
            "SELECT project_uuid FROM collaborations WHERE account_uuid = ?1;",
            &account_id.to_string(),
            "collaborations.project_uuid",
        )
    }

    fn collaborators_of(&self, project_id: ProjectId) -> RepoResult<BTreeSet<AccountId>> {
        self.collect_ids(
            "SELECT account_uuid FROM collaborations WHERE project_uuid = ?1;",
            &project_id.to_string(),
            "collaborations.account_uuid",
        )
    }

    fn projects_containing(&self, document_id: DocumentId) -> RepoResult<BTreeSet<ProjectId>> {
        self.collect_ids(
            "SELECT project_uuid FROM project_memberships WHERE document_uuid = ?1;",
            &document_id.to_string(),
            "project_memberships.project_uuid",
        )
    }

    fn accounts_collaborating_on_document(
        &self,
        document_id: DocumentId,
        excluding_account_id: AccountId,
    ) -> RepoResult<BTreeSet<CollaboratorIdentity>> {
        let mut stmt = self.conn.prepare_cached(COLLABORATORS_ON_DOCUMENT_SQL)?;
        let mut rows = stmt.query(params![
            document_id.to_string(),
            excluding_account_id.to_string()
        ])?;
        let mut collaborators = BTreeSet::new();
        while let Some(row) = rows.next()? {
            collaborators.insert(parse_collaborator_row(row)?);
        }
        Ok(collaborators)
    }

    fn documents_in_projects(
        &self,
        project_ids: &BTreeSet<ProjectId>,
    ) -> RepoResult<BTreeSet<DocumentId>> {
        let ids: Vec<ProjectId> = project_ids.iter().copied().collect();
        let mut documents = BTreeSet::new();
        for chunk in ids.chunks(PROJECT_ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT DISTINCT document_uuid
                 FROM project_memberships
                 WHERE project_uuid IN ({placeholders});"
            );
            let bind_values = chunk.iter().map(|id| Value::Text(id.to_string()));
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                documents.insert(parse_uuid(&value, "project_memberships.document_uuid")?);
            }
        }
        Ok(documents)
    }
}

fn parse_collaborator_row(row: &Row<'_>) -> RepoResult<CollaboratorIdentity> {
    let uuid_text: String = row.get("uuid")?;
    let org_text: String = row.get("organization_uuid")?;
    Ok(CollaboratorIdentity {
        id: parse_uuid(&uuid_text, "accounts.uuid")?,
        organization_id: parse_uuid(&org_text, "accounts.organization_uuid")?,
        role: parse_role(row.get("role")?, "accounts.role")?,
    })
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("account_uuid")?;
    let org_text: String = row.get("organization_uuid")?;
    Ok(Document {
        id: parse_uuid(&uuid_text, "documents.uuid")?,
        owner_id: parse_uuid(&owner_text, "documents.account_uuid")?,
        organization_id: parse_uuid(&org_text, "documents.organization_uuid")?,
        access: StoredAccessLevel::from_db(row.get("access")?),
        title: row.get("title")?,
    })
}
