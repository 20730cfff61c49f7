//! Document edit-authorization engine.
//!
//! Decides whether an account may edit a document through ownership,
//! organization administration, or one-hop sharing via project
//! collaboration, and serves cached listing sets for browsing views.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use config::{Config, ConfigError, DatabaseConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{
    Account, AccountId, CollaboratorIdentity, Organization, OrganizationId, Principal, Role,
};
pub use model::document::{
    AccessLevel, Document, DocumentId, InvalidAccessLevel, StoredAccessLevel,
    ADMINISTRABLE_ACCESS_LEVELS,
};
pub use model::project::{Collaboration, Project, ProjectId, ProjectMembership};
pub use model::ModelValidationError;
pub use policy::cache::{AccessCache, AccessSnapshot, CacheStats};
pub use policy::engine::{owns, AccessPolicyEngine};
pub use policy::{AccessError, AccessResult, EditDecision, EditGrant, SharedBasis};
pub use repo::graph_repo::{ResourceGraph, SqliteResourceGraph};
pub use repo::identity_repo::{IdentityStore, SqliteIdentityStore};
pub use repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::access_service::AccessService;
pub use service::sharing_service::{SharingError, SharingService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
