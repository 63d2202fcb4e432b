/// Persistence bridge between the board store, the local cache and the
/// remote board service.
///
/// States: `Uninitialized -> Loading -> Synced <-> Syncing`.
///
/// Loading pulls the remote state, falling back to the cache and then to a
/// seeded board; the store is only handed out once loading is over, so no
/// save can race the initial load. After that, every committed mutation
/// is written to the cache synchronously and queued for a push. The queue
/// is a `watch` slot holding only the newest snapshot, so mutations made
/// while a push is in flight coalesce into one follow-up push.
///
/// The cache carries an "unpushed" marker from the first commit until the
/// remote accepts the newest snapshot. A load that finds the marker keeps
/// the cached state over the remote copy and pushes it right away.
pub mod remote;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub use remote::{OfflineRemote, RemoteService, SyncError};

use crate::config::SeedBoard;
use crate::storage::LocalCache;
use crate::store::{BoardStore, SnapshotObserver};
use crate::types::BoardsState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Loading,
    Synced,
    Syncing,
}

/// Where the initial snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Cache,
    Seed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Loaded {
        source: LoadSource,
        fetch_error: Option<SyncError>,
    },
    CacheWriteFailed {
        revision: u64,
        message: String,
    },
    PushSucceeded {
        revision: u64,
    },
    PushFailed {
        revision: u64,
        error: SyncError,
    },
}

type Pending = Option<(u64, Arc<BoardsState>)>;

struct Shared {
    cache: Arc<dyn LocalCache>,
    state: watch::Sender<SyncState>,
    pending: watch::Sender<Pending>,
    events: broadcast::Sender<SyncEvent>,
    /// Revision of the newest committed snapshot.
    latest: AtomicU64,
    /// Serializes `latest` updates with the unpushed marker.
    marker: Mutex<()>,
    /// Bumped by every `start`; stores from earlier starts are ignored.
    generation: AtomicU64,
}

impl Shared {
    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn write_cache(&self, revision: u64, snapshot: &BoardsState) {
        if let Err(e) = self.cache.save(snapshot) {
            log::warn!(target: "taskboard.bridge", "Cache write for revision {} failed: {}", revision, e);
            self.emit(SyncEvent::CacheWriteFailed {
                revision,
                message: e.to_string(),
            });
        }
    }

    fn mark_unpushed(&self, revision: u64) {
        let _guard = self.marker.lock();
        self.latest.store(revision, Ordering::SeqCst);
        if let Err(e) = self.cache.set_unpushed(true) {
            log::warn!(target: "taskboard.bridge", "Failed to mark revision {} unpushed: {}", revision, e);
        }
    }

    /// Clear the marker, unless a newer commit is still waiting.
    fn mark_pushed(&self, revision: u64) {
        let _guard = self.marker.lock();
        if self.latest.load(Ordering::SeqCst) != revision {
            return;
        }
        if let Err(e) = self.cache.set_unpushed(false) {
            log::warn!(target: "taskboard.bridge", "Failed to clear unpushed marker: {}", e);
        }
    }

    /// Cached state that never reached the remote, if any.
    fn unpushed_state(&self) -> Option<BoardsState> {
        match self.cache.has_unpushed() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                log::warn!(target: "taskboard.bridge", "Cannot read unpushed marker: {}", e);
                return None;
            }
        }
        match self.cache.load() {
            Ok(state) => state,
            Err(e) => {
                log::warn!(target: "taskboard.bridge", "Unpushed cache is unreadable: {}", e);
                None
            }
        }
    }

    /// Back to `Synced` once the pushed revision is the newest one.
    fn settle(&self, revision: u64) {
        self.state.send_if_modified(|state| {
            if *state == SyncState::Syncing && self.latest.load(Ordering::SeqCst) == revision {
                *state = SyncState::Synced;
                true
            } else {
                false
            }
        });
    }
}

/// Subscription of one store, tied to the `start` that created it.
struct BridgeObserver {
    shared: Arc<Shared>,
    generation: u64,
}

impl SnapshotObserver for BridgeObserver {
    fn snapshot_committed(&self, revision: u64, snapshot: &Arc<BoardsState>) {
        let shared = &self.shared;
        if shared.generation.load(Ordering::SeqCst) != self.generation {
            log::debug!(
                target: "taskboard.bridge",
                "Ignoring revision {} from a store of an earlier start",
                revision
            );
            return;
        }
        shared.mark_unpushed(revision);
        shared.state.send_replace(SyncState::Syncing);
        shared.write_cache(revision, snapshot);
        shared.pending.send_replace(Some((revision, Arc::clone(snapshot))));
    }
}

async fn push_loop<R: RemoteService>(remote: Arc<R>, shared: Arc<Shared>, mut rx: watch::Receiver<Pending>) {
    while rx.changed().await.is_ok() {
        let pending = rx.borrow_and_update().clone();
        let Some((revision, snapshot)) = pending else {
            continue;
        };
        match remote.save_boards(snapshot).await {
            Ok(()) => {
                log::debug!(target: "taskboard.bridge", "Pushed revision {}", revision);
                shared.mark_pushed(revision);
                shared.emit(SyncEvent::PushSucceeded { revision });
            }
            Err(e) => {
                log::warn!(
                    target: "taskboard.bridge",
                    "Push of revision {} failed, will retry on next change: {}",
                    revision,
                    e
                );
                shared.emit(SyncEvent::PushFailed { revision, error: e });
            }
        }
        shared.settle(revision);
    }
}

pub struct PersistenceBridge<R: RemoteService> {
    remote: Arc<R>,
    shared: Arc<Shared>,
    seed: SeedBoard,
    worker: Option<JoinHandle<()>>,
}

impl<R: RemoteService> PersistenceBridge<R> {
    pub fn new(remote: R, cache: Arc<dyn LocalCache>) -> Self {
        let (state, _) = watch::channel(SyncState::Uninitialized);
        let (pending, _) = watch::channel(None);
        let (events, _) = broadcast::channel(64);
        Self {
            remote: Arc::new(remote),
            shared: Arc::new(Shared {
                cache,
                state,
                pending,
                events,
                latest: AtomicU64::new(0),
                marker: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
            seed: SeedBoard::default(),
            worker: None,
        }
    }

    /// Names for the board seeded when neither remote nor cache has data.
    pub fn with_seed(mut self, seed: SeedBoard) -> Self {
        self.seed = seed;
        self
    }

    pub fn state(&self) -> SyncState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Load the initial state and return the store it seeds. The returned
    /// store reports every commit back to this bridge.
    ///
    /// Calling `start` again reloads and hands out a new store. Stores from
    /// earlier calls are detached: their commits are neither cached nor
    /// pushed.
    pub async fn start(&mut self) -> BoardStore {
        if let Some(worker) = self.worker.take() {
            log::warn!(target: "taskboard.bridge", "Bridge restarted, detaching previous store");
            worker.abort();
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_replace(SyncState::Loading);

        let unpushed = self.shared.unpushed_state();
        let resume_push = unpushed.is_some();
        let (mut initial, source, fetch_error) = if let Some(cached) = unpushed {
            log::info!(
                target: "taskboard.bridge",
                "Cache holds changes the remote never accepted, keeping them over the remote copy"
            );
            (cached, LoadSource::Cache, None)
        } else {
            self.fetch_or_fallback().await
        };

        let repairs = initial.normalize();
        if source != LoadSource::Cache || repairs > 0 {
            self.shared.write_cache(0, &initial);
        }

        log::info!(
            target: "taskboard.bridge",
            "Loaded {} board(s) from {:?}",
            initial.boards.len(),
            source
        );

        let mut store = BoardStore::new(initial);
        store.subscribe(Arc::new(BridgeObserver {
            shared: Arc::clone(&self.shared),
            generation,
        }));

        let rx = self.shared.pending.subscribe();
        self.worker = Some(tokio::spawn(push_loop(
            Arc::clone(&self.remote),
            Arc::clone(&self.shared),
            rx,
        )));

        self.shared.latest.store(store.revision(), Ordering::SeqCst);
        if resume_push {
            self.shared.state.send_replace(SyncState::Syncing);
        } else {
            self.shared.state.send_replace(SyncState::Synced);
        }
        self.shared.emit(SyncEvent::Loaded { source, fetch_error });
        if resume_push {
            self.shared.pending.send_replace(Some((store.revision(), store.snapshot())));
        }
        store
    }

    async fn fetch_or_fallback(&self) -> (BoardsState, LoadSource, Option<SyncError>) {
        match self.remote.fetch_boards().await {
            Ok(state) => (state, LoadSource::Remote, None),
            Err(e) => {
                log::warn!(target: "taskboard.bridge", "Remote fetch failed, using local data: {}", e);
                match self.shared.cache.load() {
                    Ok(Some(cached)) => (cached, LoadSource::Cache, Some(e)),
                    Ok(None) => (self.seed.build(), LoadSource::Seed, Some(e)),
                    Err(cache_err) => {
                        log::warn!(target: "taskboard.bridge", "Ignoring unreadable cache: {}", cache_err);
                        (self.seed.build(), LoadSource::Seed, Some(e))
                    }
                }
            }
        }
    }

    /// Wait until every committed snapshot has been pushed (or its push
    /// has failed).
    pub async fn flush(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx
            .wait_for(|s| matches!(s, SyncState::Synced | SyncState::Uninitialized))
            .await;
    }

    /// Flush and stop the push worker.
    pub async fn shutdown(mut self) {
        self.flush().await;
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        log::debug!(target: "taskboard.bridge", "Bridge stopped");
    }
}

impl<R: RemoteService> Drop for PersistenceBridge<R> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
