/// Batched profile lookups
///
/// Coalesces near-simultaneous single-DID profile requests into one bulk
/// AppView call and fans the combined response back out to each caller. One
/// window is open at a time; it closes on a short timer or on reaching the
/// maximum batch size, whichever comes first, and flushes exactly once.
use crate::{
    cache::ProfileCache,
    config::IdentityConfig,
    error::{IdentityError, IdentityResult},
    identifier::{full_handle, short_did},
    profile::ResolvedProfile,
    transport::IdentityTransport,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Waiter = oneshot::Sender<IdentityResult<Option<ResolvedProfile>>>;

/// Pending lookups accumulated within one time slice.
///
/// A DID appears at most once in `dids`; additional requests for it attach
/// further waiters to the existing entry. The generation ties the timer task
/// to the window it opened, so a max-size flush cannot be flushed twice.
struct BatchWindow {
    dids: Vec<String>,
    waiters: HashMap<String, Vec<Waiter>>,
    generation: u64,
}

struct WindowSlot {
    current: Option<BatchWindow>,
    next_generation: u64,
}

/// Windowed batch scheduler for DID -> profile resolution
pub struct ProfileBatcher {
    transport: Arc<dyn IdentityTransport>,
    cache: Arc<ProfileCache>,
    window_ms: u64,
    max_batch_size: usize,
    slot: Mutex<WindowSlot>,
}

impl ProfileBatcher {
    /// Create a new batcher sharing the given transport and cache
    pub fn new(
        transport: Arc<dyn IdentityTransport>,
        cache: Arc<ProfileCache>,
        config: &IdentityConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            window_ms: config.batch_window_ms,
            max_batch_size: config.max_batch_size,
            slot: Mutex::new(WindowSlot {
                current: None,
                next_generation: 0,
            }),
        }
    }

    /// Resolve one full DID to a profile through the current batch window.
    ///
    /// Returns `Ok(None)` when the AppView response omits the DID. A second
    /// call for a DID already enqueued in the open window attaches to the same
    /// pending network request. Cancelling abandons only this caller's wait;
    /// the window still flushes for everyone else.
    pub async fn fetch(
        self: &Arc<Self>,
        full_did: &str,
        cancel: &CancellationToken,
    ) -> IdentityResult<Option<ResolvedProfile>> {
        let did = full_did.to_lowercase();
        let (tx, rx) = oneshot::channel();

        let closed_window = {
            let mut slot = self.slot.lock();
            match slot.current.as_mut() {
                Some(window) => {
                    if let Some(waiters) = window.waiters.get_mut(&did) {
                        waiters.push(tx);
                    } else {
                        window.dids.push(did.clone());
                        window.waiters.insert(did, vec![tx]);
                    }
                }
                None => {
                    let generation = slot.next_generation;
                    slot.next_generation += 1;

                    let mut waiters = HashMap::new();
                    waiters.insert(did.clone(), vec![tx]);
                    slot.current = Some(BatchWindow {
                        dids: vec![did],
                        waiters,
                        generation,
                    });

                    let batcher = Arc::clone(self);
                    tokio::spawn(async move {
                        sleep(Duration::from_millis(batcher.window_ms)).await;
                        batcher.flush_generation(generation).await;
                    });
                }
            }

            if slot
                .current
                .as_ref()
                .is_some_and(|window| window.dids.len() >= self.max_batch_size)
            {
                slot.current.take()
            } else {
                None
            }
        };

        // Max size reached: close and flush ahead of the timer
        if let Some(window) = closed_window {
            let batcher = Arc::clone(self);
            tokio::spawn(async move { batcher.flush(window).await });
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(IdentityError::Cancelled),
            result = rx => result.unwrap_or_else(|_| {
                Err(IdentityError::Transport("Batch flush dropped its waiters".to_string()))
            }),
        }
    }

    /// Timer-driven close: flushes the window only if it is still the one the
    /// timer was started for.
    async fn flush_generation(&self, generation: u64) {
        let window = {
            let mut slot = self.slot.lock();
            if slot
                .current
                .as_ref()
                .is_some_and(|w| w.generation == generation)
            {
                slot.current.take()
            } else {
                None
            }
        };

        if let Some(window) = window {
            self.flush(window).await;
        }
    }

    /// Issue the single bulk request for a closed window and fan results out.
    async fn flush(&self, window: BatchWindow) {
        let BatchWindow {
            dids, mut waiters, ..
        } = window;

        debug!(count = dids.len(), "Flushing batch window");

        // The window serves many callers; no individual caller's token governs it
        let cancel = CancellationToken::new();

        match self.transport.get_profiles(&dids, &cancel).await {
            Ok(records) => {
                let mut by_short_did: HashMap<String, ResolvedProfile> = HashMap::new();

                for record in records {
                    let record_did = record.did.to_lowercase();
                    let record_handle = record.handle.clone();
                    let profile = ResolvedProfile::from_record(record);

                    // Warm both namespaces: a batch fetch satisfies its direct
                    // callers and same-session lookups by handle
                    self.cache.set_profile(&record_did, Some(profile.clone()));
                    if let Some(handle_key) = full_handle(&record_handle) {
                        self.cache.set_handle(&handle_key, Some(record_did.clone()));
                    }

                    by_short_did.insert(profile.short_did.clone(), profile);
                }

                // Match waiters to records by identifier value, not position
                for did in dids {
                    let result = by_short_did.get(&short_did(&did)).cloned();
                    if result.is_none() {
                        self.cache.set_profile(&did, None);
                    }
                    if let Some(list) = waiters.remove(&did) {
                        for tx in list {
                            let _ = tx.send(Ok(result.clone()));
                        }
                    }
                }
            }
            Err(e) => {
                // The whole window fails; the next window starts clean
                if !e.is_cancelled() {
                    debug!("Batch profile fetch failed: {}", e);
                }
                for (_, list) in waiters.drain() {
                    for tx in list {
                        let _ = tx.send(Err(e.clone()));
                    }
                }
            }
        }
    }
}
