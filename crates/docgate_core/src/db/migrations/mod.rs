//! Schema migrations for the workspace database.
//!
//! # Responsibility
//! - Keep the ordered list of schema steps compiled into this binary.
//! - Bring a database up to the latest step under one write lock.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - Pending steps run after re-reading `PRAGMA user_version` inside one
//!   immediate transaction, so concurrent openers never apply a step twice.
//! - A database newer than this binary is rejected untouched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "workspace",
        sql: include_str!("0001_workspace.sql"),
    },
    Migration {
        version: 2,
        name: "sharing_indexes",
        sql: include_str!("0002_sharing_indexes.sql"),
    },
];

/// Highest schema version this binary can produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every step newer than the stored `user_version`.
///
/// Returns the number of steps applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let latest = latest_version();
    // Up-to-date databases are opened without taking the write lock.
    if stored_version(conn)? == latest {
        return Ok(0);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from_version = stored_version(&tx)?;

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending = pending_after(from_version);
    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    if !pending.is_empty() {
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
            from_version,
            latest,
            pending.len()
        );
    }
    Ok(pending.len())
}

fn pending_after(version: u32) -> &'static [Migration] {
    let start = MIGRATIONS.partition_point(|migration| migration.version <= version);
    &MIGRATIONS[start..]
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, pending_after, MIGRATIONS};
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
        assert_eq!(pending_after(0).len(), MIGRATIONS.len());
        assert!(pending_after(latest_version()).is_empty());
    }

    #[test]
    fn upgrade_applies_only_newer_steps() {
        let mut conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(MIGRATIONS[0].sql).expect("first step");
        conn.pragma_update(None, "user_version", 1).expect("version");

        assert_eq!(apply_migrations(&mut conn).expect("upgrade"), MIGRATIONS.len() - 1);
        assert_eq!(apply_migrations(&mut conn).expect("no-op"), 0);

        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .expect("version");
        assert_eq!(version, latest_version());
    }
}
