#![allow(dead_code)]

use docgate_core::db::open_db_in_memory;
use docgate_core::{
    AccessLevel, Account, Collaboration, Document, Organization, OrganizationId, Project,
    ProjectId, ProjectMembership, Role, SqliteWorkspaceRepository, WorkspaceRepository,
};
use rusqlite::Connection;

/// Seeds a workspace graph through the write repository.
pub struct Fixture<'conn> {
    repo: SqliteWorkspaceRepository<'conn>,
}

impl<'conn> Fixture<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            repo: SqliteWorkspaceRepository::try_new(conn).unwrap(),
        }
    }

    pub fn organization(&self) -> OrganizationId {
        self.repo
            .create_organization(&Organization::new("org"))
            .unwrap()
    }

    pub fn account(&self, organization_id: OrganizationId, role: Role) -> Account {
        let account = Account::new(organization_id, role, "member");
        self.repo.create_account(&account).unwrap();
        account
    }

    pub fn project(&self, creator: &Account) -> ProjectId {
        self.repo
            .create_project(&Project::new(creator.id, "project"))
            .unwrap()
    }

    pub fn document(&self, owner: &Account, access: AccessLevel) -> Document {
        let document = Document::new(owner, access, "document");
        self.repo.create_document(&document).unwrap();
        document
    }

    pub fn collaborate(&self, account: &Account, project_id: ProjectId) {
        self.repo
            .add_collaboration(Collaboration {
                account_id: account.id,
                project_id,
            })
            .unwrap();
    }

    pub fn place(&self, document: &Document, project_id: ProjectId) {
        self.repo
            .add_membership(ProjectMembership {
                document_id: document.id,
                project_id,
            })
            .unwrap();
    }
}

pub fn memory_db() -> Connection {
    open_db_in_memory().unwrap()
}
