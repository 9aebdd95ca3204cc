//! Price state container: process-wide, bounded and persisted.
//!
//! [`PriceStoreState`] is the plain data: per-key bounded history, per-key
//! current observation, and a global newest-first feed. [`PriceStore`] wraps it
//! with a single ingestion entry point, synchronous subscriber fan-out, and a
//! persisted partial snapshot.
//!
//! Capacities are enforced inside [`PriceStoreState::apply`], under the write
//! lock, so no reader ever sees a list over its cap.

use super::PriceObservation;
use crate::shared::{CircleId, CommodityId};
use crate::storage::SnapshotStorage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, Weak};

/// Max observations kept per (commodity, circle).
pub const HISTORY_CAPACITY: usize = 100;
/// Max observations in the global recent feed.
pub const RECENT_CAPACITY: usize = 50;
/// Recent-feed entries that survive a reload.
pub const PERSISTED_RECENT: usize = 10;
/// History entries returned when the caller gives no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
/// Storage key of the persisted snapshot.
pub const STORAGE_KEY: &str = "price-storage";

type CircleMap<T> = BTreeMap<CircleId, T>;

// ─── PriceStoreState ─────────────────────────────────────────────────────────

/// All price observations seen this session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceStoreState {
    history: BTreeMap<CommodityId, CircleMap<VecDeque<PriceObservation>>>,
    current: BTreeMap<CommodityId, CircleMap<PriceObservation>>,
    recent: VecDeque<PriceObservation>,
}

impl PriceStoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one observation: append to history, overwrite current, prepend to recent.
    pub fn apply(&mut self, observation: PriceObservation) {
        let (commodity_id, circle_id) = observation.key();

        let history = self
            .history
            .entry(commodity_id)
            .or_default()
            .entry(circle_id)
            .or_default();
        history.push_back(observation.clone());
        while history.len() > HISTORY_CAPACITY {
            history.pop_front();
        }

        self.current
            .entry(commodity_id)
            .or_default()
            .insert(circle_id, observation.clone());

        self.recent.push_front(observation);
        self.recent.truncate(RECENT_CAPACITY);
    }

    /// Latest observation for a key.
    ///
    /// Without a circle, returns the entry of the lowest circle id that has data
    /// for this commodity. That choice is deterministic but carries no business
    /// meaning; pass a circle when it matters.
    pub fn current_price(
        &self,
        commodity_id: CommodityId,
        circle_id: Option<CircleId>,
    ) -> Option<&PriceObservation> {
        let circles = self.current.get(&commodity_id)?;
        match circle_id {
            Some(circle_id) => circles.get(&circle_id),
            None => circles.values().next(),
        }
    }

    /// Up to `limit` observations for a key, newest timestamp first.
    ///
    /// Re-sorted on every read since arrival order and timestamp order can
    /// diverge. Equal timestamps keep the later-inserted entry first.
    pub fn price_history(
        &self,
        commodity_id: CommodityId,
        circle_id: CircleId,
        limit: usize,
    ) -> Vec<PriceObservation> {
        let Some(list) = self.history(commodity_id, circle_id) else {
            return Vec::new();
        };

        let mut entries: Vec<PriceObservation> = list.iter().rev().cloned().collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        entries
    }

    /// Raw insertion-ordered history for a key (oldest first).
    pub fn history(
        &self,
        commodity_id: CommodityId,
        circle_id: CircleId,
    ) -> Option<&VecDeque<PriceObservation>> {
        self.history.get(&commodity_id)?.get(&circle_id)
    }

    pub fn current(&self) -> &BTreeMap<CommodityId, CircleMap<PriceObservation>> {
        &self.current
    }

    /// Current observations for every circle of one commodity, by circle id.
    pub fn current_for(&self, commodity_id: CommodityId) -> Vec<&PriceObservation> {
        self.current
            .get(&commodity_id)
            .map(|circles| circles.values().collect())
            .unwrap_or_default()
    }

    /// Global feed, newest insertion first.
    pub fn recent(&self) -> &VecDeque<PriceObservation> {
        &self.recent
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.current.clear();
        self.recent.clear();
    }

    fn to_persisted(&self) -> PersistedSnapshotRef<'_> {
        PersistedSnapshotRef {
            current_prices: &self.current,
            recent_updates: self.recent.iter().take(PERSISTED_RECENT).collect(),
        }
    }

    fn from_persisted(snapshot: PersistedSnapshot) -> Self {
        let mut recent: VecDeque<PriceObservation> = snapshot.recent_updates.into();
        recent.truncate(RECENT_CAPACITY);
        Self {
            history: BTreeMap::new(),
            current: snapshot.current_prices,
            recent,
        }
    }
}

// ─── Persisted snapshot ──────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSnapshotRef<'a> {
    current_prices: &'a BTreeMap<CommodityId, CircleMap<PriceObservation>>,
    recent_updates: Vec<&'a PriceObservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSnapshot {
    #[serde(default)]
    current_prices: BTreeMap<CommodityId, CircleMap<PriceObservation>>,
    #[serde(default)]
    recent_updates: Vec<PriceObservation>,
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

type Callback = Box<dyn Fn(&PriceStoreState) + Send + Sync>;

struct Subscriber {
    id: u64,
    active: AtomicBool,
    callback: Callback,
}

/// Handle returned by [`PriceStore::subscribe`].
///
/// Dropping it unsubscribes. Call [`Subscription::detach`] to keep the
/// callback registered for the life of the store.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<StoreInner>,
    subscriber: Arc<Subscriber>,
    detached: bool,
}

impl Subscription {
    /// Stop delivery. No callback invocation starts after this returns.
    pub fn unsubscribe(mut self) {
        self.cancel();
        self.detached = true;
    }

    /// Keep the callback registered and forget the handle.
    pub fn detach(mut self) {
        self.detached = true;
    }

    pub fn is_active(&self) -> bool {
        self.subscriber.active.load(Ordering::SeqCst)
    }

    fn cancel(&mut self) {
        self.subscriber.active.store(false, Ordering::SeqCst);
        if let Some(inner) = self.store.upgrade() {
            let id = self.subscriber.id;
            inner.lock_subscribers().retain(|s| s.id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.subscriber.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// ─── PriceStore ──────────────────────────────────────────────────────────────

struct StoreInner {
    state: RwLock<PriceStoreState>,
    /// Serializes mutation + notification so one update's fan-out completes
    /// before the next update is applied.
    ingest: Mutex<()>,
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    next_subscriber_id: AtomicU64,
    storage: Option<Arc<dyn SnapshotStorage>>,
}

impl StoreInner {
    fn read_state(&self) -> RwLockReadGuard<'_, PriceStoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Subscriber>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &PriceStoreState) {
        let Some(storage) = &self.storage else {
            return;
        };
        let result = serde_json::to_string(&state.to_persisted())
            .map_err(crate::error::StorageError::from)
            .and_then(|json| storage.save(STORAGE_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist price snapshot: {}", e);
        }
    }
}

/// Shared handle to a price store. Clones refer to the same store.
///
/// The only writer is [`PriceStore::add_price_update`]; everything else is a
/// read. Subscribers are called synchronously, in registration order, after
/// each update, and must not call `add_price_update` themselves.
#[derive(Clone)]
pub struct PriceStore {
    inner: Arc<StoreInner>,
}

static GLOBAL_STORE: OnceLock<PriceStore> = OnceLock::new();

impl PriceStore {
    /// Fresh in-memory store without persistence.
    pub fn new() -> Self {
        Self::from_parts(PriceStoreState::new(), None)
    }

    /// Store that rehydrates from, and persists to, `storage`.
    ///
    /// An absent or unreadable snapshot starts the store empty.
    ///
    /// `save` runs synchronously inside every [`add_price_update`](Self::add_price_update),
    /// so `storage` and subscriber callbacks must not block for long.
    pub fn with_storage(storage: Arc<dyn SnapshotStorage>) -> Self {
        let state = match storage.load(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedSnapshot>(&raw) {
                Ok(snapshot) => {
                    let state = PriceStoreState::from_persisted(snapshot);
                    tracing::info!(
                        "Restored price snapshot: {} commodities, {} recent updates",
                        state.current.len(),
                        state.recent.len()
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable price snapshot: {}", e);
                    PriceStoreState::new()
                }
            },
            Ok(None) => PriceStoreState::new(),
            Err(e) => {
                tracing::warn!("Failed to load price snapshot: {}", e);
                PriceStoreState::new()
            }
        };
        Self::from_parts(state, Some(storage))
    }

    fn from_parts(state: PriceStoreState, storage: Option<Arc<dyn SnapshotStorage>>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                ingest: Mutex::new(()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(0),
                storage,
            }),
        }
    }

    /// The process-wide store, created empty and in-memory on first use
    /// unless [`PriceStore::install_global`] ran first.
    pub fn global() -> &'static PriceStore {
        GLOBAL_STORE.get_or_init(PriceStore::new)
    }

    /// Make `store` the process-wide instance. Fails (returning it) if the
    /// global store already exists.
    pub fn install_global(store: PriceStore) -> Result<&'static PriceStore, PriceStore> {
        GLOBAL_STORE.set(store)?;
        Ok(Self::global())
    }

    /// Ingest one observation and notify subscribers.
    pub fn add_price_update(&self, observation: PriceObservation) {
        let _ingest = self
            .inner
            .ingest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            state.apply(observation);
        }

        let state = self.inner.read_state();
        self.inner.persist(&state);

        let subscribers: Vec<Arc<Subscriber>> = self.inner.lock_subscribers().clone();
        for subscriber in subscribers {
            if subscriber.active.load(Ordering::SeqCst) {
                (subscriber.callback)(&state);
            }
        }
    }

    /// Register a callback run after every update with the full updated state.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PriceStoreState) + Send + Sync + 'static,
    {
        let subscriber = Arc::new(Subscriber {
            id: self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst),
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.inner.lock_subscribers().push(Arc::clone(&subscriber));

        Subscription {
            store: Arc::downgrade(&self.inner),
            subscriber,
            detached: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock_subscribers().len()
    }

    /// See [`PriceStoreState::current_price`].
    pub fn get_current_price(
        &self,
        commodity_id: CommodityId,
        circle_id: Option<CircleId>,
    ) -> Option<PriceObservation> {
        self.inner
            .read_state()
            .current_price(commodity_id, circle_id)
            .cloned()
    }

    /// Newest-first history; `None` means [`DEFAULT_HISTORY_LIMIT`].
    pub fn get_price_history(
        &self,
        commodity_id: CommodityId,
        circle_id: CircleId,
        limit: Option<usize>,
    ) -> Vec<PriceObservation> {
        self.inner.read_state().price_history(
            commodity_id,
            circle_id,
            limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        )
    }

    /// First `limit` entries of the global feed, newest first.
    pub fn recent_updates(&self, limit: usize) -> Vec<PriceObservation> {
        self.inner
            .read_state()
            .recent()
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Current observation per circle for one commodity.
    pub fn current_prices_for(&self, commodity_id: CommodityId) -> Vec<PriceObservation> {
        self.inner
            .read_state()
            .current_for(commodity_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn history_len(&self, commodity_id: CommodityId, circle_id: CircleId) -> usize {
        self.inner
            .read_state()
            .history(commodity_id, circle_id)
            .map_or(0, VecDeque::len)
    }

    /// Run `f` against the state under the read lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&PriceStoreState) -> R) -> R {
        f(&self.inner.read_state())
    }

    /// Cloned copy of the whole state.
    pub fn snapshot(&self) -> PriceStoreState {
        self.inner.read_state().clone()
    }

    /// Drop all observations and the persisted snapshot. Subscribers stay registered.
    pub fn reset(&self) {
        let _ingest = self
            .inner
            .ingest
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        if let Some(storage) = &self.inner.storage {
            if let Err(e) = storage.remove(STORAGE_KEY) {
                tracing::warn!("Failed to remove price snapshot: {}", e);
            }
        }
    }
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PriceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read_state();
        f.debug_struct("PriceStore")
            .field("commodities", &state.current.len())
            .field("recent", &state.recent.len())
            .field("subscribers", &self.subscriber_count())
            .field("persistent", &self.inner.storage.is_some())
            .finish()
    }
}
