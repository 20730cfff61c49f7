mod common;

use common::{memory_db, Fixture};
use docgate_core::{IdentityStore, RepoError, Role, SqliteIdentityStore};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn get_account_round_trips_and_unknown_ids_resolve_to_none() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let admin = fixture.account(org, Role::Administrator);

    let store = SqliteIdentityStore::try_new(&conn).unwrap();
    assert_eq!(store.get_account(admin.id).unwrap(), Some(admin));
    assert_eq!(store.get_account(Uuid::new_v4()).unwrap(), None);

    let organization = store.get_organization(org).unwrap().unwrap();
    assert_eq!(organization.name, "org");
    assert!(store.get_organization(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn administrators_of_lists_only_that_organizations_admins() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let other_org = fixture.organization();
    let first = fixture.account(org, Role::Administrator);
    let second = fixture.account(org, Role::Administrator);
    fixture.account(org, Role::Contributor);
    fixture.account(other_org, Role::Administrator);

    let store = SqliteIdentityStore::try_new(&conn).unwrap();
    let admins = store.administrators_of(org).unwrap();

    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(admins.iter().map(|a| a.id).collect::<Vec<_>>(), expected);
}

#[test]
fn role_and_tenancy_checks_read_principal_fields() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let admin = fixture.account(org, Role::Administrator);
    let contributor = fixture.account(org, Role::Contributor);
    let outsider = fixture.account(fixture.organization(), Role::Contributor);

    let store = SqliteIdentityStore::try_new(&conn).unwrap();
    assert!(store.is_administrator(&admin));
    assert!(!store.is_administrator(&contributor));
    assert!(store.same_organization(&admin, &contributor));
    assert!(!store.same_organization(&admin, &outsider));
}

#[test]
fn unknown_stored_role_is_invalid_data() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let account = fixture.account(fixture.organization(), Role::Contributor);
    conn.execute(
        "UPDATE accounts SET role = 7 WHERE uuid = ?1;",
        [account.id.to_string()],
    )
    .unwrap();

    let store = SqliteIdentityStore::try_new(&conn).unwrap();
    let err = store.get_account(account.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("role")));
}

#[test]
fn store_requires_migrated_schema() {
    let conn = Connection::open_in_memory().unwrap();
    match SqliteIdentityStore::try_new(&conn) {
        Err(RepoError::MissingRequiredTable(table)) => assert_eq!(table, "organizations"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("store must reject an unmigrated connection"),
    }
}
