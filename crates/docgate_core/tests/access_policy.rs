mod common;

use common::{memory_db, Fixture};
use docgate_core::{
    AccessCache, AccessError, AccessLevel, AccessPolicyEngine, AccessService, AccountId,
    CollaboratorIdentity, Document, DocumentId, EditGrant, ProjectId, RepoError, RepoResult,
    ResourceGraph, Role, SharedBasis, SharingService, SqliteIdentityStore, SqliteResourceGraph,
    SqliteWorkspaceRepository, WorkspaceRepository,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Delegating graph that records every co-collaborator query.
struct CountingGraph<'a> {
    inner: SqliteResourceGraph<'a>,
    co_collaborator_queries: RefCell<Vec<AccountId>>,
}

impl<'a> CountingGraph<'a> {
    fn new(inner: SqliteResourceGraph<'a>) -> Self {
        Self {
            inner,
            co_collaborator_queries: RefCell::new(Vec::new()),
        }
    }

    fn queried_subjects(&self) -> Vec<AccountId> {
        self.co_collaborator_queries.borrow().clone()
    }
}

impl ResourceGraph for CountingGraph<'_> {
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        self.inner.get_document(id)
    }

    fn projects_collaborated_by(&self, account_id: AccountId) -> RepoResult<BTreeSet<ProjectId>> {
        self.inner.projects_collaborated_by(account_id)
    }

    fn collaborators_of(&self, project_id: ProjectId) -> RepoResult<BTreeSet<AccountId>> {
        self.inner.collaborators_of(project_id)
    }

    fn projects_containing(&self, document_id: DocumentId) -> RepoResult<BTreeSet<ProjectId>> {
        self.inner.projects_containing(document_id)
    }

    fn accounts_collaborating_on_document(
        &self,
        document_id: DocumentId,
        excluding_account_id: AccountId,
    ) -> RepoResult<BTreeSet<CollaboratorIdentity>> {
        self.co_collaborator_queries
            .borrow_mut()
            .push(excluding_account_id);
        self.inner
            .accounts_collaborating_on_document(document_id, excluding_account_id)
    }

    fn documents_in_projects(
        &self,
        project_ids: &BTreeSet<ProjectId>,
    ) -> RepoResult<BTreeSet<DocumentId>> {
        self.inner.documents_in_projects(project_ids)
    }
}

#[test]
fn scenario_same_org_admin_edits_organization_document() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let o1 = fixture.organization();
    let a = fixture.account(o1, Role::Contributor);
    let b = fixture.account(o1, Role::Administrator);
    let d1 = fixture.document(&a, AccessLevel::Organization);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(engine.administers(&b, &d1));
    assert!(!engine.owns(&b, &d1));
    assert!(engine.can_edit(&b, &d1).unwrap());
    assert_eq!(
        engine.evaluate_edit(&b, &d1).unwrap().grant,
        Some(EditGrant::Administrator)
    );
}

#[test]
fn scenario_admin_cannot_edit_private_document_without_path() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let o1 = fixture.organization();
    let a = fixture.account(o1, Role::Contributor);
    let b = fixture.account(o1, Role::Administrator);
    let d2 = fixture.document(&a, AccessLevel::Private);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(!engine.administers(&b, &d2));
    assert!(!engine.can_edit(&b, &d2).unwrap());
}

#[test]
fn scenario_co_collaborator_owner_shares_document() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let a = fixture.account(org, Role::Contributor);
    let c = fixture.account(org, Role::Contributor);
    let p1 = fixture.project(&c);
    let d3 = fixture.document(&c, AccessLevel::Private);
    fixture.collaborate(&a, p1);
    fixture.collaborate(&c, p1);
    fixture.place(&d3, p1);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert_eq!(
        graph.accounts_collaborating_on_document(d3.id, a.id).unwrap(),
        BTreeSet::from([CollaboratorIdentity::from(&c)])
    );
    assert!(engine.shared_via_collaboration(&a, &d3).unwrap());
    assert!(engine.can_edit(&a, &d3).unwrap());
    assert_eq!(
        engine.evaluate_edit(&a, &d3).unwrap().grant,
        Some(EditGrant::Shared {
            collaborator: c.id,
            basis: SharedBasis::CollaboratorOwns,
        })
    );
}

#[test]
fn scenario_no_shared_project_denies() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let a = fixture.account(org, Role::Contributor);
    let owner = fixture.account(org, Role::Contributor);
    let p1 = fixture.project(&a);
    let p2 = fixture.project(&owner);
    let d4 = fixture.document(&owner, AccessLevel::Public);
    fixture.collaborate(&a, p1);
    fixture.collaborate(&owner, p2);
    fixture.place(&d4, p2);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(!engine.can_edit(&a, &d4).unwrap());
}

#[test]
fn collaborating_administrator_shares_within_own_organization_only() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let owner = fixture.account(org, Role::Contributor);
    let admin = fixture.account(org, Role::Administrator);
    let guest = fixture.account(fixture.organization(), Role::Contributor);
    let project = fixture.project(&admin);
    let org_doc = fixture.document(&owner, AccessLevel::Exclusive);
    let private_doc = fixture.document(&owner, AccessLevel::Private);
    for account in [&admin, &guest] {
        fixture.collaborate(account, project);
    }
    fixture.place(&org_doc, project);
    fixture.place(&private_doc, project);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert_eq!(
        engine.evaluate_edit(&guest, &org_doc).unwrap().grant,
        Some(EditGrant::Shared {
            collaborator: admin.id,
            basis: SharedBasis::CollaboratorAdministers,
        })
    );
    assert!(!engine.can_edit(&guest, &private_doc).unwrap());
}

#[test]
fn sharing_does_not_chain_past_direct_co_collaborators() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let a = fixture.account(org, Role::Contributor);
    let b = fixture.account(org, Role::Contributor);
    let c = fixture.account(org, Role::Contributor);
    // a-b share p1, b-c share p2; c owns the document, which sits in both.
    let p1 = fixture.project(&a);
    let p2 = fixture.project(&c);
    let doc = fixture.document(&c, AccessLevel::Private);
    fixture.collaborate(&a, p1);
    fixture.collaborate(&b, p1);
    fixture.collaborate(&b, p2);
    fixture.collaborate(&c, p2);
    fixture.place(&doc, p1);
    fixture.place(&doc, p2);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = CountingGraph::new(SqliteResourceGraph::try_new(&conn).unwrap());
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(!engine.can_edit(&a, &doc).unwrap());
    assert_eq!(graph.queried_subjects(), vec![a.id]);

    assert!(engine.can_edit(&b, &doc).unwrap());
    assert_eq!(graph.queried_subjects(), vec![a.id, b.id]);
}

#[test]
fn local_grants_skip_the_graph_query() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let owner = fixture.account(org, Role::Contributor);
    let admin = fixture.account(org, Role::Administrator);
    let doc = fixture.document(&owner, AccessLevel::Pending);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = CountingGraph::new(SqliteResourceGraph::try_new(&conn).unwrap());
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(engine.can_edit(&owner, &doc).unwrap());
    assert!(engine.can_edit(&admin, &doc).unwrap());
    assert!(engine.owns_or_administers(&admin, &doc));
    assert!(graph.queried_subjects().is_empty());
}

#[test]
fn administers_is_false_for_contributors_at_every_level() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let owner = fixture.account(org, Role::Contributor);
    let peer = fixture.account(org, Role::Contributor);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    for level in AccessLevel::ALL {
        let doc = fixture.document(&owner, level);
        assert!(!engine.administers(&peer, &doc), "level {level:?}");
        assert!(!engine.administers(&owner, &doc), "level {level:?}");
        assert!(engine.can_edit(&owner, &doc).unwrap(), "owner must edit {level:?}");
    }
}

#[test]
fn administrator_of_another_organization_is_denied() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let owner = fixture.account(fixture.organization(), Role::Contributor);
    let foreign_admin = fixture.account(fixture.organization(), Role::Administrator);
    let doc = fixture.document(&owner, AccessLevel::Public);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);

    assert!(!engine.administers(&foreign_admin, &doc));
    assert!(!engine.can_edit(&foreign_admin, &doc).unwrap());
}

#[test]
fn adding_collaboration_grants_and_removing_it_revokes() {
    let mut conn = memory_db();
    let (a, owner, project, doc) = {
        let fixture = Fixture::new(&conn);
        let org = fixture.organization();
        let a = fixture.account(org, Role::Contributor);
        let owner = fixture.account(org, Role::Contributor);
        let project = fixture.project(&owner);
        let doc = fixture.document(&owner, AccessLevel::Private);
        fixture.collaborate(&owner, project);
        fixture.place(&doc, project);
        (a, owner, project, doc)
    };
    let cache = Arc::new(AccessCache::new());

    assert!(!AccessService::new(&mut conn, Arc::clone(&cache))
        .can_edit(a.id, doc.id)
        .unwrap());

    SharingService::new(&mut conn, Arc::clone(&cache))
        .add_collaborator(project, a.id)
        .unwrap();
    assert!(AccessService::new(&mut conn, Arc::clone(&cache))
        .can_edit(a.id, doc.id)
        .unwrap());
    assert!(AccessService::new(&mut conn, Arc::clone(&cache))
        .can_edit(owner.id, doc.id)
        .unwrap());

    SharingService::new(&mut conn, Arc::clone(&cache))
        .remove_collaborator(project, a.id)
        .unwrap();
    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);
    assert!(!engine.shared_via_collaboration(&a, &doc).unwrap());
}

#[test]
fn unknown_ids_report_not_found() {
    let mut conn = memory_db();
    let (account, doc) = {
        let fixture = Fixture::new(&conn);
        let account = fixture.account(fixture.organization(), Role::Administrator);
        let doc = fixture.document(&account, AccessLevel::Public);
        (account, doc)
    };
    let mut service = AccessService::new(&mut conn, Arc::new(AccessCache::new()));

    let missing_account = Uuid::new_v4();
    let missing_doc = Uuid::new_v4();
    assert!(matches!(
        service.can_edit(missing_account, doc.id),
        Err(AccessError::AccountNotFound(id)) if id == missing_account
    ));
    assert!(matches!(
        service.can_edit(account.id, missing_doc),
        Err(AccessError::DocumentNotFound(id)) if id == missing_doc
    ));
    // Account resolution comes first.
    assert!(matches!(
        service.can_edit(missing_account, missing_doc),
        Err(AccessError::AccountNotFound(_))
    ));
    let err = service.can_edit(account.id, missing_doc).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
}

#[test]
fn corrupted_access_level_denies_administrator_and_is_reported() {
    let mut conn = memory_db();
    let (admin, owner, doc) = {
        let fixture = Fixture::new(&conn);
        let org = fixture.organization();
        let owner = fixture.account(org, Role::Contributor);
        let admin = fixture.account(org, Role::Administrator);
        let doc = fixture.document(&owner, AccessLevel::Organization);
        (admin, owner, doc)
    };
    conn.execute(
        "UPDATE documents SET access = 0 WHERE uuid = ?1;",
        [doc.id.to_string()],
    )
    .unwrap();
    let mut service = AccessService::new(&mut conn, Arc::new(AccessCache::new()));

    let decision = service.evaluate_edit(admin.id, doc.id).unwrap();
    assert!(!decision.allowed);
    let invalid = decision.invalid_access_level.unwrap();
    assert_eq!((invalid.document_id, invalid.raw), (doc.id, 0));

    let by_owner = service.evaluate_edit(owner.id, doc.id).unwrap();
    assert_eq!(by_owner.grant, Some(EditGrant::Owner));
    assert!(by_owner.invalid_access_level.is_some());
}

#[test]
fn corrupted_collaborator_role_is_a_graph_query_failure() {
    let mut conn = memory_db();
    let (a, doc) = {
        let fixture = Fixture::new(&conn);
        let org = fixture.organization();
        let a = fixture.account(org, Role::Contributor);
        let c = fixture.account(org, Role::Contributor);
        let project = fixture.project(&c);
        let doc = fixture.document(&c, AccessLevel::Private);
        fixture.collaborate(&a, project);
        fixture.collaborate(&c, project);
        fixture.place(&doc, project);
        conn.execute(
            "UPDATE accounts SET role = 99 WHERE uuid = ?1;",
            [c.id.to_string()],
        )
        .unwrap();
        (a, doc)
    };
    let mut service = AccessService::new(&mut conn, Arc::new(AccessCache::new()));

    let err = service.can_edit(a.id, doc.id).unwrap_err();
    assert!(matches!(err, AccessError::GraphQuery(_)));
    assert!(!err.is_retryable());
}

#[test]
fn raising_access_level_lets_same_org_administrator_edit() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let owner = fixture.account(org, Role::Contributor);
    let admin = fixture.account(org, Role::Administrator);
    let doc = fixture.document(&owner, AccessLevel::Private);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);
    assert!(!engine.administers(&admin, &doc));
    assert!(!engine.can_edit(&admin, &doc).unwrap());

    let repo = SqliteWorkspaceRepository::try_new(&conn).unwrap();
    repo.set_document_access(doc.id, AccessLevel::Organization)
        .unwrap();
    let reloaded = graph.get_document(doc.id).unwrap().unwrap();

    assert_eq!(reloaded.access.known(), Some(AccessLevel::Organization));
    assert!(engine.administers(&admin, &reloaded));
    assert!(engine.can_edit(&admin, &reloaded).unwrap());
    assert_eq!(
        engine.evaluate_edit(&admin, &reloaded).unwrap().grant,
        Some(EditGrant::Administrator)
    );

    repo.set_document_access(doc.id, AccessLevel::Private).unwrap();
    let lowered = graph.get_document(doc.id).unwrap().unwrap();
    assert!(!engine.can_edit(&admin, &lowered).unwrap());
    assert!(engine.can_edit(&owner, &lowered).unwrap());

    let missing = Uuid::new_v4();
    assert!(matches!(
        repo.set_document_access(missing, AccessLevel::Public),
        Err(RepoError::NotFound { entity: "document", id }) if id == missing
    ));
}

#[test]
fn store_failure_on_shared_path_is_retryable_and_never_allows() {
    let conn = memory_db();
    let fixture = Fixture::new(&conn);
    let org = fixture.organization();
    let a = fixture.account(org, Role::Contributor);
    let c = fixture.account(org, Role::Contributor);
    let project = fixture.project(&c);
    let doc = fixture.document(&c, AccessLevel::Private);
    fixture.collaborate(&a, project);
    fixture.collaborate(&c, project);
    fixture.place(&doc, project);

    let identity = SqliteIdentityStore::try_new(&conn).unwrap();
    let graph = SqliteResourceGraph::try_new(&conn).unwrap();
    let engine = AccessPolicyEngine::new(&identity, &graph);
    assert!(engine.can_edit(&a, &doc).unwrap());

    conn.execute_batch("DROP TABLE collaborations;").unwrap();

    let err = engine.can_edit(&a, &doc).unwrap_err();
    assert!(matches!(err, AccessError::GraphQuery(RepoError::Db(_))));
    assert!(err.is_retryable());
    assert!(!err.is_not_found());
    assert!(engine.evaluate_edit(&a, &doc).is_err());
    // Local grants never reach the store.
    assert!(engine.can_edit(&c, &doc).unwrap());
}
