//! Access decision and listing service.
//!
//! # Responsibility
//! - Provide the external entry points: `can_edit`, `accessible_project_ids`
//!   and `accessible_document_ids`.
//! - Bind every decision to one SQLite read transaction so all of its
//!   lookups observe the same snapshot. Listing snapshots are likewise
//!   built inside a single read transaction.
//!
//! # Invariants
//! - Edit decisions query the live graph; only listings use `AccessCache`.
//! - Transactions opened here are never committed. Dropping them rolls
//!   back, so a caller abandoning a call mid-way leaves no trace.

use crate::model::account::AccountId;
use crate::model::document::DocumentId;
use crate::model::project::ProjectId;
use crate::policy::cache::{AccessCache, AccessSnapshot};
use crate::policy::engine::AccessPolicyEngine;
use crate::policy::{AccessError, AccessResult, EditDecision};
use crate::repo::graph_repo::SqliteResourceGraph;
use crate::repo::identity_repo::{IdentityStore, SqliteIdentityStore};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Entry-point service over one connection and a shared cache.
pub struct AccessService<'conn> {
    conn: &'conn mut Connection,
    cache: Arc<AccessCache>,
}

impl<'conn> AccessService<'conn> {
    pub fn new(conn: &'conn mut Connection, cache: Arc<AccessCache>) -> Self {
        Self { conn, cache }
    }

    pub fn cache(&self) -> &Arc<AccessCache> {
        &self.cache
    }

    /// Whether `account_id` may edit `document_id`.
    pub fn can_edit(&mut self, account_id: AccountId, document_id: DocumentId) -> AccessResult<bool> {
        Ok(self.evaluate_edit(account_id, document_id)?.allowed)
    }

    /// Edit decision including the grant that allowed it.
    pub fn evaluate_edit(
        &mut self,
        account_id: AccountId,
        document_id: DocumentId,
    ) -> AccessResult<EditDecision> {
        let started_at = Instant::now();
        let result = self.evaluate_in_snapshot(account_id, document_id);

        match &result {
            Ok(decision) => info!(
                "event=edit_decision module=access status={} account_id={} document_id={} grant={} duration_ms={}",
                if decision.allowed { "ok" } else { "denied" },
                account_id,
                document_id,
                decision.grant.as_ref().map_or("none", |grant| grant.as_str()),
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.is_not_found() => warn!(
                "event=edit_decision module=access status=denied account_id={} document_id={} error_code=not_found error={}",
                account_id, document_id, err
            ),
            Err(err) => error!(
                "event=edit_decision module=access status=error account_id={} document_id={} error_code=graph_query_failed retryable={} error={}",
                account_id,
                document_id,
                err.is_retryable(),
                err
            ),
        }
        result
    }

    /// Projects shared with the account through collaboration.
    pub fn accessible_project_ids(&mut self, account_id: AccountId) -> AccessResult<BTreeSet<ProjectId>> {
        Ok(self.accessible_snapshot(account_id)?.project_ids().clone())
    }

    /// Documents inside any project shared with the account.
    pub fn accessible_document_ids(
        &mut self,
        account_id: AccountId,
    ) -> AccessResult<BTreeSet<DocumentId>> {
        Ok(self.accessible_snapshot(account_id)?.document_ids().clone())
    }

    /// Cached listing snapshot, loaded in one read transaction on a miss.
    ///
    /// The account is resolved live on every call so unknown ids report
    /// `AccountNotFound` even when a snapshot is cached.
    pub fn accessible_snapshot(&mut self, account_id: AccountId) -> AccessResult<Arc<AccessSnapshot>> {
        {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Deferred)?;
            let identity = SqliteIdentityStore::try_new(&tx)?;
            if identity.get_account(account_id)?.is_none() {
                return Err(AccessError::AccountNotFound(account_id));
            }
        }

        // The load transaction starts inside the closure, after the cache
        // has sampled its generation.
        let conn = &mut *self.conn;
        self.cache.get_or_try_load(account_id, || -> AccessResult<AccessSnapshot> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
            let graph = SqliteResourceGraph::try_new(&tx)?;
            Ok(AccessSnapshot::load(&graph, account_id)?)
        })
    }

    fn evaluate_in_snapshot(
        &mut self,
        account_id: AccountId,
        document_id: DocumentId,
    ) -> AccessResult<EditDecision> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let identity = SqliteIdentityStore::try_new(&tx)?;
        let graph = SqliteResourceGraph::try_new(&tx)?;
        let engine = AccessPolicyEngine::new(&identity, &graph);
        let (account, document) = engine.resolve(account_id, document_id)?;
        engine.evaluate_edit(&account, &document)
    }
}
