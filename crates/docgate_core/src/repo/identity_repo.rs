//! Identity lookups for accounts and organizations.
//!
//! # Responsibility
//! - Resolve accounts and organizations by id.
//! - Answer role and tenancy questions about already-resolved principals.
//!
//! # Invariants
//! - Pure lookups; no writes happen through this contract.
//! - A stored role outside {administrator, contributor} is `InvalidData`.

use super::{ensure_tables, parse_uuid, RepoError, RepoResult};
use crate::model::account::{Account, AccountId, Organization, OrganizationId, Principal, Role};
use rusqlite::{Connection, OptionalExtension, Row};

const ACCOUNT_SELECT_SQL: &str = "SELECT
    uuid,
    organization_uuid,
    role,
    display_name
FROM accounts";

/// Read contract for account and organization identity.
pub trait IdentityStore {
    /// Resolves one account, `None` when the id is unknown.
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>>;

    /// Resolves one organization, `None` when the id is unknown.
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;

    /// Lists the administrators of one organization, ordered by id.
    fn administrators_of(&self, organization_id: OrganizationId) -> RepoResult<Vec<Account>>;

    fn is_administrator(&self, account: &dyn Principal) -> bool {
        account.role() == Role::Administrator
    }

    fn same_organization(&self, a: &dyn Principal, b: &dyn Principal) -> bool {
        a.organization_id() == b.organization_id()
    }
}

/// SQLite-backed identity store.
pub struct SqliteIdentityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["organizations", "accounts"])?;
        Ok(Self { conn })
    }
}

impl IdentityStore for SqliteIdentityStore<'_> {
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{ACCOUNT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_account_row(row)?));
        }
        Ok(None)
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM organizations WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.map(|name| Organization { id, name }))
    }

    fn administrators_of(&self, organization_id: OrganizationId) -> RepoResult<Vec<Account>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{ACCOUNT_SELECT_SQL}
             WHERE organization_uuid = ?1
               AND role = ?2
             ORDER BY uuid ASC;"
        ))?;
        let mut rows = stmt.query(rusqlite::params![
            organization_id.to_string(),
            Role::Administrator.as_db()
        ])?;
        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }
        Ok(accounts)
    }
}

pub(crate) fn parse_role(value: i64, column: &str) -> RepoResult<Role> {
    Role::from_db(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role value `{value}` in {column}")))
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let uuid_text: String = row.get("uuid")?;
    let org_text: String = row.get("organization_uuid")?;
    Ok(Account {
        id: parse_uuid(&uuid_text, "accounts.uuid")?,
        organization_id: parse_uuid(&org_text, "accounts.organization_uuid")?,
        role: parse_role(row.get("role")?, "accounts.role")?,
        display_name: row.get("display_name")?,
    })
}
