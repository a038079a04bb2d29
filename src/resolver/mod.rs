/// Identity Resolution Orchestrator
///
/// The public entry point of the core: classifies user input, routes it down
/// the handle or DID path, and composes the handle resolver, batch scheduler
/// and cache into one coherent lookup. Overlapping resolutions of the same
/// identifier converge on one piece of in-flight work, and every failure
/// category collapses to "could not be resolved" at this boundary.

pub mod handle;

pub use handle::HandleResolver;

use crate::{
    batch::ProfileBatcher,
    cache::ProfileCache,
    config::IdentityConfig,
    error::IdentityResult,
    identifier::{self, Identifier},
    profile::ResolvedProfile,
    transport::{HttpTransport, IdentityTransport},
};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An in-flight handle resolution, shareable between overlapping callers
type SharedAttempt = Shared<BoxFuture<'static, Option<String>>>;

/// Main identity resolver - combines caching, batching and the fallback chain
#[derive(Clone)]
pub struct IdentityResolver {
    cache: Arc<ProfileCache>,
    handle_resolver: HandleResolver,
    batcher: Arc<ProfileBatcher>,
    inflight_handles: Arc<Mutex<HashMap<String, SharedAttempt>>>,
}

impl IdentityResolver {
    /// Create a resolver over the production HTTP transport
    pub fn new(config: IdentityConfig) -> IdentityResult<Self> {
        config.validate()?;
        let transport: Arc<dyn IdentityTransport> = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a resolver over an injected transport
    pub fn with_transport(
        config: IdentityConfig,
        transport: Arc<dyn IdentityTransport>,
    ) -> Self {
        let cache = Arc::new(ProfileCache::new(chrono::Duration::seconds(
            config.cache_stale_secs as i64,
        )));
        let batcher = Arc::new(ProfileBatcher::new(
            Arc::clone(&transport),
            Arc::clone(&cache),
            &config,
        ));

        Self {
            cache,
            handle_resolver: HandleResolver::new(transport),
            batcher,
            inflight_handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve a display-layer identifier (handle or DID, short or full, or a
    /// pasted link) to an account profile.
    ///
    /// `None` means the identifier does not resolve. Not found, malformed
    /// input, transport failure and cancellation all surface identically; the
    /// UI must not depend on why.
    pub async fn resolve(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Option<ResolvedProfile> {
        match Identifier::classify(text) {
            Identifier::Did(did) => self.resolve_did_to_profile(&did, cancel).await,
            Identifier::Handle(handle) => {
                let did = self.resolve_handle_to_did(&handle, cancel).await?;
                self.resolve_did_to_profile(&did, cancel).await
            }
        }
    }

    /// Resolve handle input to a full DID, read-through cached.
    ///
    /// Overlapping calls for the same handle share one resolution attempt.
    pub async fn resolve_handle_to_did(
        &self,
        handle: &str,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let full_handle = identifier::full_handle(handle)?;

        // A pasted link may have unwrapped to a DID; route it down the DID
        // path instead of treating it as a domain
        if identifier::likely_did(&full_handle) {
            return identifier::full_did(&full_handle);
        }

        if let Some(cached) = self.cache.get_handle(&full_handle) {
            if cached.stale {
                self.spawn_handle_refresh(&full_handle);
            }
            return cached.value;
        }

        let attempt = self.handle_attempt(&full_handle);
        tokio::select! {
            _ = cancel.cancelled() => None,
            did = attempt => did,
        }
    }

    /// Resolve DID input to a profile, read-through cached, batched.
    pub async fn resolve_did_to_profile(
        &self,
        did: &str,
        cancel: &CancellationToken,
    ) -> Option<ResolvedProfile> {
        let full_did = identifier::full_did(did)?;

        if let Some(cached) = self.cache.get_profile(&full_did) {
            if cached.stale {
                self.spawn_profile_refresh(&full_did);
            }
            return cached.value;
        }

        match self.batcher.fetch(&full_did, cancel).await {
            Ok(profile) => profile,
            Err(e) => {
                if !e.is_cancelled() {
                    debug!("Profile fetch failed for {}: {}", full_did, e);
                }
                None
            }
        }
    }

    /// Get or start the shared resolution attempt for a handle.
    ///
    /// The attempt runs under a detached cancellation token and is driven to
    /// completion by its own task, so a caller abandoning its wait never
    /// cancels work other callers share. The driving task records the outcome
    /// in the cache and retires the attempt.
    fn handle_attempt(&self, full_handle: &str) -> SharedAttempt {
        let mut inflight = self.inflight_handles.lock();

        if let Some(attempt) = inflight.get(full_handle) {
            return attempt.clone();
        }

        let resolver = self.handle_resolver.clone();
        let handle = full_handle.to_string();
        let attempt: SharedAttempt = async move {
            let detached = CancellationToken::new();
            resolver.resolve(&handle, &detached).await.ok().flatten()
        }
        .boxed()
        .shared();

        inflight.insert(full_handle.to_string(), attempt.clone());

        let this = self.clone();
        let handle = full_handle.to_string();
        let driven = attempt.clone();
        tokio::spawn(async move {
            let did = driven.await;
            this.cache.set_handle(&handle, did);
            this.inflight_handles.lock().remove(&handle);
        });

        attempt
    }

    /// Stale handle entry: serve it, refresh behind the caller's back.
    fn spawn_handle_refresh(&self, full_handle: &str) {
        debug!("Refreshing stale handle entry: {}", full_handle);
        // The attempt's driving task records the fresh outcome
        let _ = self.handle_attempt(full_handle);
    }

    /// Stale profile entry: serve it, refetch through the batcher which
    /// rewrites the cache on flush.
    fn spawn_profile_refresh(&self, full_did: &str) {
        debug!("Refreshing stale profile entry: {}", full_did);
        let batcher = Arc::clone(&self.batcher);
        let did = full_did.to_string();
        tokio::spawn(async move {
            let detached = CancellationToken::new();
            if let Err(e) = batcher.fetch(&did, &detached).await {
                if !e.is_cancelled() {
                    debug!("Background profile refresh failed for {}: {}", did, e);
                }
            }
        });
    }
}
