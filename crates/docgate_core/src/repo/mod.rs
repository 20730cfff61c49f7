//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the read contracts the access engine depends on
//!   (`IdentityStore`, `ResourceGraph`) and the write contract used by the
//!   sharing workflow (`WorkspaceRepository`).
//! - Isolate SQLite query details from policy and service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidData`) in
//!   addition to DB transport errors.
//! - Read paths reject invalid persisted identity data instead of masking it.

use crate::db::DbError;
use crate::model::ModelValidationError;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

pub mod graph_repo;
pub mod identity_repo;
pub mod workspace_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all SQLite-backed stores.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
