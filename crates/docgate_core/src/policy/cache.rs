//! Per-account memoized listing sets.
//!
//! # Responsibility
//! - Serve accessible project / document id sets for bulk listing views.
//! - Drop whole entries when collaborations or memberships they depend on
//!   change; the next read rebuilds the entry from the graph.
//!
//! # Invariants
//! - Entries are immutable `Arc<AccessSnapshot>` values replaced per key,
//!   so readers never observe a half-updated set.
//! - `document_ids` is always the membership union over the `project_ids`
//!   of the same snapshot.
//! - A snapshot whose load started before an invalidation is never
//!   published after it.
//! - Entries live until invalidated. `with_max_entries` bounds the map;
//!   once full, misses are served uncached.
//! - Never consulted by edit decisions.

use crate::model::account::AccountId;
use crate::model::document::DocumentId;
use crate::model::project::ProjectId;
use crate::repo::graph_repo::ResourceGraph;
use crate::repo::RepoResult;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Derived listing sets for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessSnapshot {
    project_ids: BTreeSet<ProjectId>,
    document_ids: BTreeSet<DocumentId>,
}

impl AccessSnapshot {
    /// Builds both sets from the graph.
    ///
    /// Callers should pass a graph bound to a single read transaction so the
    /// two queries observe the same data.
    pub fn load<G: ResourceGraph + ?Sized>(graph: &G, account_id: AccountId) -> RepoResult<Self> {
        let project_ids = graph.projects_collaborated_by(account_id)?;
        let document_ids = graph.documents_in_projects(&project_ids)?;
        Ok(Self {
            project_ids,
            document_ids,
        })
    }

    pub fn project_ids(&self) -> &BTreeSet<ProjectId> {
        &self.project_ids
    }

    pub fn document_ids(&self) -> &BTreeSet<DocumentId> {
        &self.document_ids
    }
}

/// Counters for cache diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent per-account snapshot cache.
pub struct AccessCache {
    entries: DashMap<AccountId, Arc<AccessSnapshot>>,
    /// Soft bound: concurrent misses may overshoot it by the number of
    /// loaders racing past the length check.
    max_entries: Option<usize>,
    /// Bumped before every invalidation; loads compare it before publishing.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for AccessCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: None,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache that stops admitting new accounts once `max_entries` are held.
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::new()
        }
    }

    /// Returns the cached snapshot without loading or touching counters.
    pub fn peek(&self, account_id: AccountId) -> Option<Arc<AccessSnapshot>> {
        self.entries
            .get(&account_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the cached snapshot, building it from `graph` on a miss.
    pub fn get_or_load<G: ResourceGraph + ?Sized>(
        &self,
        graph: &G,
        account_id: AccountId,
    ) -> RepoResult<Arc<AccessSnapshot>> {
        self.get_or_try_load(account_id, || AccessSnapshot::load(graph, account_id))
    }

    /// Returns the cached snapshot, running `load` on a miss.
    ///
    /// The generation is sampled before `load` runs, so `load` must open its
    /// read transaction itself. Data read before this call may already be
    /// stale relative to an invalidation the cache has not seen yet.
    pub fn get_or_try_load<E>(
        &self,
        account_id: AccountId,
        load: impl FnOnce() -> Result<AccessSnapshot, E>,
    ) -> Result<Arc<AccessSnapshot>, E> {
        if let Some(snapshot) = self.peek(account_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(snapshot);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::Acquire);
        let snapshot = Arc::new(load()?);
        self.publish(account_id, generation, &snapshot);
        Ok(snapshot)
    }

    /// Drops the entry of one account. Returns whether one was present.
    pub fn invalidate_account(&self, account_id: AccountId) -> bool {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = self.entries.remove(&account_id).is_some();
        debug!(
            "event=cache_invalidate module=cache scope=account account_id={} removed={}",
            account_id,
            usize::from(removed)
        );
        removed
    }

    /// Drops every entry whose project set contains `project_id`.
    pub fn invalidate_project(&self, project_id: ProjectId) -> usize {
        let removed = self.remove_where(|snapshot| snapshot.project_ids.contains(&project_id));
        debug!(
            "event=cache_invalidate module=cache scope=project project_id={} removed={}",
            project_id, removed
        );
        removed
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.remove_where(|_| true);
        debug!(
            "event=cache_invalidate module=cache scope=all removed={}",
            removed
        );
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn publish(&self, account_id: AccountId, generation: u64, snapshot: &Arc<AccessSnapshot>) {
        if self
            .max_entries
            .is_some_and(|max| self.entries.len() >= max && !self.entries.contains_key(&account_id))
        {
            return;
        }
        // The generation is compared while the shard lock is held, so an
        // invalidation either rejects this insert or removes it afterwards.
        let entry = self.entries.entry(account_id);
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        match entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(Arc::clone(snapshot));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(snapshot));
            }
        }
    }

    fn remove_where(&self, predicate: impl Fn(&AccessSnapshot) -> bool) -> usize {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut removed = 0;
        self.entries.retain(|_, snapshot| {
            let drop_entry = predicate(&**snapshot);
            removed += usize::from(drop_entry);
            !drop_entry
        });
        removed
    }
}
