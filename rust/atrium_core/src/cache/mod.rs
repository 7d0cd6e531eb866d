//! Access-checked cache of query results, keyed by scope.
//!
//! Lookups resolve the scope's readers first and deny before touching any
//! entry. A hit needs an entry whose query is at least as specific as the
//! requested one and whose captured reader set still contains the user.
//!
//! Concurrency: the table is a sharded `DashMap` from scope to slot. A slot
//! publishes its entry list as an `Arc` snapshot behind a `RwLock`, so reads
//! only clone an `Arc`. Writers of one slot are serialized by the slot's
//! `Mutex` and never hold a map shard while doing so. Invalidations bump the
//! epoch of the invalidated scope. A miss ticket records the epochs of its
//! scope and every ancestor, so it goes stale only when an invalidation
//! covered its scope.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashSet;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::access::{AccessResolver, GroupMembership, ScopeSnapshot};
use crate::config::CacheConfig;
use crate::error::{AccessError, Result};
use crate::query::Query;
use crate::scope::Scope;

/// A stored query result.
#[derive(Debug)]
struct CacheEntry<H> {
    query: Query,
    /// Readers of the scope at registration time.
    captured_readers: AHashSet<String>,
    handle: H,
    inserted_at: Instant,
}

impl<H> CacheEntry<H> {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.inserted_at.elapsed() >= ttl)
    }

    fn serves(&self, query: &Query, user_id: &str, ttl: Option<Duration>) -> bool {
        !self.is_expired(ttl)
            && self.captured_readers.contains(user_id)
            && self.query.is_more_specific_than(query)
    }
}

type EntryList<H> = Arc<Vec<Arc<CacheEntry<H>>>>;

/// Entries of one scope.
struct ScopeSlot<H> {
    entries: RwLock<EntryList<H>>,
    writer: Mutex<()>,
}

impl<H> ScopeSlot<H> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> EntryList<H> {
        self.entries.read().clone()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Outcome of a permitted lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<H> {
    Hit(H),
    /// Pass the ticket to [`QueryCache::register`] after executing the query.
    Miss(MissTicket),
}

impl<H> Lookup<H> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// Proof of a miss, valid until the next invalidation covering the scope
/// (the scope itself or an ancestor) or the next `clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissTicket {
    generation: u64,
    /// Epochs of the scope, its project and its organization, innermost first.
    epochs: [u64; 3],
}

/// Outcome of [`QueryCache::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Stored,
    /// An invalidation happened after the ticket was issued.
    Stale,
    /// The snapshot has no organization or project.
    NoScope,
}

/// Point-in-time counters. Relaxed atomics; approximate under contention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub denied: u64,
    pub registered: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub invalidated: u64,
}

/// Scope-keyed query result cache.
///
/// Owned by the embedding service; construct empty with [`QueryCache::new`]
/// and drop (or [`clear`](QueryCache::clear)) to tear down. All methods take
/// `&self` and are safe to call from many threads.
pub struct QueryCache<H, M> {
    resolver: AccessResolver<M>,
    config: CacheConfig,
    slots: DashMap<Scope, Arc<ScopeSlot<H>>>,
    /// scope -> invalidation count; absent means zero
    epochs: DashMap<Scope, u64>,
    generation: AtomicU64,

    hits: AtomicU64,
    misses: AtomicU64,
    denied: AtomicU64,
    registered: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
    invalidated: AtomicU64,
}

impl<H: Clone, M: GroupMembership> QueryCache<H, M> {
    pub fn new(resolver: AccessResolver<M>, config: CacheConfig) -> Self {
        Self {
            resolver,
            config,
            slots: DashMap::new(),
            epochs: DashMap::new(),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            registered: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
        }
    }

    pub fn resolver(&self) -> &AccessResolver<M> {
        &self.resolver
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn ticket(&self, scope: &Scope) -> MissTicket {
        let generation = self.generation.load(Ordering::Acquire);
        let mut epochs = [0u64; 3];
        let chain = std::iter::successors(Some(scope.clone()), Scope::parent);
        for (epoch, ancestor) in epochs.iter_mut().zip(chain) {
            *epoch = self.epochs.get(&ancestor).map_or(0, |e| *e);
        }
        MissTicket { generation, epochs }
    }

    /// Find a cached result `user_id` may see for `query` in the snapshot's
    /// scope.
    ///
    /// Fails with `AccessDenied` if the user is not a reader of the scope; in
    /// that case no entry is examined.
    pub fn lookup(
        &self,
        query: &Query,
        snapshot: &ScopeSnapshot<'_>,
        user_id: &str,
    ) -> Result<Lookup<H>> {
        let readers = self.resolver.resolve_readers(snapshot);
        let scope = match snapshot.scope() {
            Some(scope) if readers.contains(user_id) => scope,
            scope => {
                self.denied.fetch_add(1, Ordering::Relaxed);
                let scope = scope.map_or_else(|| "<no workspace>".to_string(), |s| s.to_string());
                debug!(user_id, scope = %scope, "query cache lookup denied");
                return Err(AccessError::AccessDenied {
                    user_id: user_id.to_string(),
                    scope,
                });
            }
        };

        let ticket = self.ticket(&scope);
        let entries = self.slots.get(&scope).map(|slot| slot.snapshot());
        let ttl = self.config.entry_ttl();
        let hit = entries
            .as_deref()
            .and_then(|entries| entries.iter().find(|e| e.serves(query, user_id, ttl)));

        match hit {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(user_id, scope = %scope, "query cache hit");
                Ok(Lookup::Hit(entry.handle.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(user_id, scope = %scope, "query cache miss");
                Ok(Lookup::Miss(ticket))
            }
        }
    }

    /// Store the result of executing `query` after a miss.
    ///
    /// Captures the scope's current readers. An existing entry with an equal
    /// query is replaced; beyond `max_entries_per_scope` the oldest entry is
    /// evicted.
    pub fn register(
        &self,
        query: Query,
        snapshot: &ScopeSnapshot<'_>,
        handle: H,
        ticket: MissTicket,
    ) -> Registration {
        let Some(scope) = snapshot.scope() else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!("query cache registration without workspace");
            return Registration::NoScope;
        };
        if self.ticket(&scope) != ticket {
            return self.reject_stale(&scope);
        }

        let entry = Arc::new(CacheEntry {
            query,
            captured_readers: self.resolver.resolve_readers(snapshot),
            handle,
            inserted_at: Instant::now(),
        });

        let slot = self
            .slots
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(ScopeSlot::new()))
            .value()
            .clone();

        let _writer = slot.writer.lock();
        // An invalidation may have removed this slot since the first check.
        if self.ticket(&scope) != ticket {
            return self.reject_stale(&scope);
        }

        let ttl = self.config.entry_ttl();
        let current = slot.snapshot();
        let mut next: Vec<Arc<CacheEntry<H>>> = current
            .iter()
            .filter(|e| !e.is_expired(ttl) && e.query != entry.query)
            .cloned()
            .collect();

        let max = self.config.max_entries_per_scope;
        let mut evicted = 0u64;
        if max > 0 && next.len() >= max {
            let excess = next.len() + 1 - max;
            next.drain(..excess);
            evicted = excess as u64;
        }
        next.push(entry);
        let len = next.len();
        *slot.entries.write() = Arc::new(next);

        self.registered.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(evicted, Ordering::Relaxed);
        trace!(scope = %scope, entries = len, evicted, "query cache entry registered");
        Registration::Stored
    }

    fn reject_stale(&self, scope: &Scope) -> Registration {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        debug!(scope = %scope, "query cache registration raced an invalidation");
        Registration::Stale
    }

    /// Remove every entry of `scope` and its descendants. Returns the number
    /// of entries removed.
    pub fn invalidate(&self, scope: &Scope) -> usize {
        *self.epochs.entry(scope.clone()).or_insert(0) += 1;

        let mut removed = 0usize;
        self.slots.retain(|key, slot| {
            if scope.contains(key) {
                removed += slot.len();
                false
            } else {
                true
            }
        });

        self.invalidated.fetch_add(removed as u64, Ordering::Relaxed);
        info!(scope = %scope, removed, "query cache invalidated");
        removed
    }

    /// [`invalidate`](Self::invalidate) by scope id (`org[/project[/collection]]`).
    pub fn invalidate_id(&self, scope_id: &str) -> Result<usize> {
        let scope: Scope = scope_id.parse()?;
        Ok(self.invalidate(&scope))
    }

    /// Drop every entry and every outstanding miss ticket.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed: usize = self.slots.iter().map(|slot| slot.len()).sum();
        self.slots.clear();
        self.invalidated.fetch_add(removed as u64, Ordering::Relaxed);
        info!(removed, "query cache cleared");
    }

    /// Number of live entries across all scopes.
    pub fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries registered for exactly `scope`.
    pub fn scope_len(&self, scope: &Scope) -> usize {
        self.slots.get(scope).map_or(0, |slot| slot.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
        }
    }
}
