/// In-memory identity cache
///
/// A process-wide keyed store of resolution results, shared by reference
/// between the orchestrator and the batch scheduler. Two namespaces that can
/// never collide: handle -> DID and DID -> profile. Reads and writes are
/// synchronous; entries past the staleness interval are still returned,
/// flagged stale, and the caller decides whether to refresh in the background.
/// Entries are never actively evicted; writes overwrite (last write wins).
use crate::profile::ResolvedProfile;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Time source, injected so staleness is testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A stored resolution outcome. `None` values are cached too: an identifier
/// that resolved to nothing stays "nothing" until the entry goes stale.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    cached_at: DateTime<Utc>,
}

/// A cache read: the stored value plus whether it is past the staleness
/// interval and due for a background refresh.
#[derive(Debug, Clone)]
pub struct CacheLookup<T> {
    pub value: T,
    pub stale: bool,
}

/// Shared cache of handle and profile resolutions
pub struct ProfileCache {
    clock: Arc<dyn Clock>,
    stale_after: Duration,
    handles: RwLock<HashMap<String, CacheEntry<Option<String>>>>,
    profiles: RwLock<HashMap<String, CacheEntry<Option<ResolvedProfile>>>>,
}

impl ProfileCache {
    /// Create a cache with the given staleness interval
    pub fn new(stale_after: Duration) -> Self {
        Self::with_clock(stale_after, Arc::new(SystemClock))
    }

    /// Create a cache with an injected time source
    pub fn with_clock(stale_after: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            stale_after,
            handles: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached DID for a full handle
    pub fn get_handle(&self, full_handle: &str) -> Option<CacheLookup<Option<String>>> {
        let key = full_handle.to_lowercase();
        let lookup = self
            .handles
            .read()
            .get(&key)
            .map(|entry| self.lookup(entry));
        match &lookup {
            Some(l) => debug!(handle = %key, stale = l.stale, "handle cache hit"),
            None => debug!(handle = %key, "handle cache miss"),
        }
        lookup
    }

    /// Cache the DID a full handle resolved to (or `None` for no match)
    pub fn set_handle(&self, full_handle: &str, did: Option<String>) {
        let key = full_handle.to_lowercase();
        self.handles.write().insert(
            key,
            CacheEntry {
                value: did,
                cached_at: self.clock.now(),
            },
        );
    }

    /// Get the cached profile for a full DID
    pub fn get_profile(&self, full_did: &str) -> Option<CacheLookup<Option<ResolvedProfile>>> {
        let key = full_did.to_lowercase();
        let lookup = self
            .profiles
            .read()
            .get(&key)
            .map(|entry| self.lookup(entry));
        match &lookup {
            Some(l) => debug!(did = %key, stale = l.stale, "profile cache hit"),
            None => debug!(did = %key, "profile cache miss"),
        }
        lookup
    }

    /// Cache the profile a full DID resolved to (or `None` for no match)
    pub fn set_profile(&self, full_did: &str, profile: Option<ResolvedProfile>) {
        let key = full_did.to_lowercase();
        self.profiles.write().insert(
            key,
            CacheEntry {
                value: profile,
                cached_at: self.clock.now(),
            },
        );
    }

    fn lookup<T: Clone>(&self, entry: &CacheEntry<T>) -> CacheLookup<T> {
        CacheLookup {
            value: entry.value.clone(),
            stale: self.clock.now() - entry.cached_at >= self.stale_after,
        }
    }
}
