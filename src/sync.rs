//! Keeps one published slot per tracked dataset fresh.
//!
//! Cached copies are published as soon as a session is activated. Network
//! refreshes run whenever connectivity is (or becomes) reachable, and on
//! explicit request. A failed fetch never replaces what is already published.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::connectivity::ConnectivityMonitor;
use crate::domain::{Dataset, DatasetName};
use crate::error::DashError;
use crate::sheets::RemoteSource;
use crate::store::DatasetCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    CacheLoaded { name: DatasetName, rows: usize },
    CacheMiss { name: DatasetName },
    CacheReadFailed { name: DatasetName, message: String },
    Fetched { name: DatasetName, rows: usize },
    FetchFailed { name: DatasetName, message: String },
    CacheWriteFailed { name: DatasetName, message: String },
    Reconnected,
    NoConnectivity,
    Ready,
}

/// Observability hook for sync activity. Errors from background refreshes
/// end up here (and in the log) instead of being returned to anyone.
pub trait SyncSink: Send + Sync {
    fn event(&self, event: SyncEvent);
}

pub struct NoopSink;

impl SyncSink for NoopSink {
    fn event(&self, _event: SyncEvent) {}
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub name: DatasetName,
    /// Row count of the published dataset on success.
    pub result: Result<usize, DashError>,
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub outcomes: Vec<RefreshOutcome>,
}

impl RefreshReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RefreshOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub name: String,
    pub loaded: bool,
    pub rows: Option<usize>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

struct Slot {
    current: watch::Sender<Option<Arc<Dataset>>>,
    settled: AtomicBool,
    refreshed_at: Mutex<Option<DateTime<Utc>>>,
}

impl Slot {
    fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            settled: AtomicBool::new(false),
            refreshed_at: Mutex::new(None),
        }
    }
}

struct Shared<C, R, M> {
    cache: C,
    remote: R,
    monitor: M,
    slots: BTreeMap<DatasetName, Slot>,
    refreshing: watch::Sender<bool>,
    in_flight: AtomicUsize,
    ready: watch::Sender<bool>,
    sink: Arc<dyn SyncSink>,
}

/// Shared handle; clones refer to the same slots.
pub struct SyncManager<C, R, M> {
    shared: Arc<Shared<C, R, M>>,
}

impl<C, R, M> Clone for SyncManager<C, R, M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Connectivity subscription bound to a dashboard session. Ending or dropping
/// it stops future refresh triggers; refreshes already started still finish.
pub struct Session {
    listener: JoinHandle<()>,
}

impl Session {
    pub fn end(self) {}

    pub fn is_active(&self) -> bool {
        !self.listener.is_finished()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl<C, R, M> SyncManager<C, R, M>
where
    C: DatasetCache,
    R: RemoteSource,
    M: ConnectivityMonitor,
{
    pub fn new(
        cache: C,
        remote: R,
        monitor: M,
        names: impl IntoIterator<Item = DatasetName>,
    ) -> Self {
        Self::new_with_sink(cache, remote, monitor, names, Arc::new(NoopSink))
    }

    pub fn new_with_sink(
        cache: C,
        remote: R,
        monitor: M,
        names: impl IntoIterator<Item = DatasetName>,
        sink: Arc<dyn SyncSink>,
    ) -> Self {
        let slots = names
            .into_iter()
            .map(|name| (name, Slot::new()))
            .collect::<BTreeMap<_, _>>();
        let (refreshing, _) = watch::channel(false);
        let (ready, _) = watch::channel(slots.is_empty());
        Self {
            shared: Arc::new(Shared {
                cache,
                remote,
                monitor,
                slots,
                refreshing,
                in_flight: AtomicUsize::new(0),
                ready,
                sink,
            }),
        }
    }

    /// Publishes cached copies, starts a background refresh when reachable
    /// and listens for reconnects. Must be called inside a tokio runtime.
    pub fn activate(&self) -> Session {
        let shared = &self.shared;
        for (name, slot) in &shared.slots {
            shared.load_cached(name, slot);
        }

        let mut transitions = shared.monitor.subscribe();
        transitions.borrow_and_update();
        let reachable = shared.monitor.current().is_reachable();
        if reachable {
            Shared::spawn_round(shared, self.tracked());
        } else {
            tracing::info!("offline at activation; serving cached datasets");
            // Nothing will be fetched for cache misses, so they count as settled.
            for slot in shared.slots.values() {
                shared.settle(slot);
            }
        }

        let listener_shared = Arc::clone(shared);
        let listener = tokio::spawn(async move {
            while transitions.changed().await.is_ok() {
                let state = *transitions.borrow_and_update();
                if !state.is_reachable() {
                    tracing::info!("connectivity lost");
                    continue;
                }
                tracing::info!("connectivity regained; refreshing all datasets");
                listener_shared.sink.event(SyncEvent::Reconnected);
                let names = listener_shared.slots.keys().cloned().collect();
                Shared::spawn_round(&listener_shared, names);
            }
        });

        Session { listener }
    }

    /// User-initiated refresh of `names`, fetched concurrently. The refreshing
    /// flag stays up until every requested fetch has settled.
    pub async fn refresh(&self, names: &[DatasetName]) -> Result<RefreshReport, DashError> {
        let mut requested: Vec<DatasetName> = Vec::with_capacity(names.len());
        for name in names {
            if !self.shared.slots.contains_key(name) {
                return Err(DashError::UnknownDataset(name.to_string()));
            }
            if !requested.contains(name) {
                requested.push(name.clone());
            }
        }

        if !self.shared.monitor.current().is_reachable() {
            tracing::warn!("refresh requested while offline");
            self.shared.sink.event(SyncEvent::NoConnectivity);
            return Err(DashError::NoConnectivity);
        }

        let _guard = RefreshGuard::begin(&self.shared);
        let outcomes = self.shared.fetch_all(&requested).await;
        Ok(RefreshReport { outcomes })
    }

    pub async fn refresh_all(&self) -> Result<RefreshReport, DashError> {
        let names = self.tracked();
        self.refresh(&names).await
    }

    pub fn tracked(&self) -> Vec<DatasetName> {
        self.shared.slots.keys().cloned().collect()
    }

    pub fn current(&self, name: &DatasetName) -> Option<Arc<Dataset>> {
        self.shared
            .slots
            .get(name)
            .and_then(|slot| slot.current.borrow().clone())
    }

    pub fn watch(&self, name: &DatasetName) -> Option<watch::Receiver<Option<Arc<Dataset>>>> {
        self.shared
            .slots
            .get(name)
            .map(|slot| slot.current.subscribe())
    }

    pub fn last_refreshed(&self, name: &DatasetName) -> Option<DateTime<Utc>> {
        let slot = self.shared.slots.get(name)?;
        slot.refreshed_at.lock().ok().and_then(|at| *at)
    }

    pub fn refreshing(&self) -> watch::Receiver<bool> {
        self.shared.refreshing.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        *self.shared.refreshing.borrow()
    }

    pub fn ready(&self) -> watch::Receiver<bool> {
        self.shared.ready.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        *self.shared.ready.borrow()
    }

    pub async fn wait_ready(&self) {
        let mut ready = self.ready();
        let _ = ready.wait_for(|ready| *ready).await;
    }

    pub fn status(&self) -> Vec<DatasetStatus> {
        self.shared
            .slots
            .keys()
            .map(|name| {
                let rows = self.current(name).map(|dataset| dataset.len());
                DatasetStatus {
                    name: name.to_string(),
                    loaded: rows.is_some(),
                    rows,
                    last_refreshed: self.last_refreshed(name),
                }
            })
            .collect()
    }
}

impl<C, R, M> Shared<C, R, M>
where
    C: DatasetCache,
    R: RemoteSource,
    M: ConnectivityMonitor,
{
    fn load_cached(&self, name: &DatasetName, slot: &Slot) {
        match self.cache.get(name) {
            Ok(Some(dataset)) => {
                let rows = dataset.len();
                tracing::debug!(dataset = %name, rows, "loaded from cache");
                slot.current.send_replace(Some(Arc::new(dataset)));
                self.sink.event(SyncEvent::CacheLoaded {
                    name: name.clone(),
                    rows,
                });
                self.settle(slot);
            }
            Ok(None) => {
                tracing::debug!(dataset = %name, "not cached");
                self.sink.event(SyncEvent::CacheMiss { name: name.clone() });
            }
            Err(err) => {
                tracing::warn!(dataset = %name, error = %err, "cache read failed");
                self.sink.event(SyncEvent::CacheReadFailed {
                    name: name.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn spawn_round(shared: &Arc<Self>, names: Vec<DatasetName>) {
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let outcomes = shared.fetch_all(&names).await;
            let failed = outcomes
                .iter()
                .filter(|outcome| outcome.result.is_err())
                .count();
            tracing::debug!(total = outcomes.len(), failed, "background refresh finished");
        });
    }

    async fn fetch_all(&self, names: &[DatasetName]) -> Vec<RefreshOutcome> {
        let mut fetches = Vec::with_capacity(names.len());
        for name in names {
            fetches.push(self.fetch_outcome(name));
        }
        join_all(fetches).await
    }

    async fn fetch_outcome(&self, name: &DatasetName) -> RefreshOutcome {
        RefreshOutcome {
            name: name.clone(),
            result: self.fetch_one(name).await,
        }
    }

    async fn fetch_one(&self, name: &DatasetName) -> Result<usize, DashError> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| DashError::UnknownDataset(name.to_string()))?;

        let result = self.remote.fetch(name).await;
        let outcome = match result {
            Ok(dataset) => {
                let rows = dataset.len();
                let dataset = Arc::new(dataset);
                slot.current.send_replace(Some(Arc::clone(&dataset)));
                if let Ok(mut at) = slot.refreshed_at.lock() {
                    *at = Some(Utc::now());
                }
                tracing::info!(dataset = %name, rows, "refreshed from network");
                self.sink.event(SyncEvent::Fetched {
                    name: name.clone(),
                    rows,
                });
                if let Err(err) = self.cache.put(name, &dataset) {
                    tracing::warn!(dataset = %name, error = %err, "cache write failed");
                    self.sink.event(SyncEvent::CacheWriteFailed {
                        name: name.clone(),
                        message: err.to_string(),
                    });
                }
                Ok(rows)
            }
            Err(err) => {
                tracing::warn!(dataset = %name, error = %err, "fetch failed; keeping previous data");
                self.sink.event(SyncEvent::FetchFailed {
                    name: name.clone(),
                    message: err.to_string(),
                });
                Err(err)
            }
        };
        self.settle(slot);
        outcome
    }

    fn settle(&self, slot: &Slot) {
        if slot.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        let all_settled = self
            .slots
            .values()
            .all(|slot| slot.settled.load(Ordering::SeqCst));
        if !all_settled {
            return;
        }
        let changed = self.ready.send_if_modified(|ready| {
            if *ready {
                return false;
            }
            *ready = true;
            true
        });
        if changed {
            tracing::info!(datasets = self.slots.len(), "all datasets ready");
            self.sink.event(SyncEvent::Ready);
        }
    }

    // Reads the count under the channel lock.
    fn update_refreshing(&self) {
        self.refreshing.send_if_modified(|current| {
            let active = self.in_flight.load(Ordering::SeqCst) > 0;
            if *current == active {
                return false;
            }
            *current = active;
            true
        });
    }
}

struct RefreshGuard<'a, C, R, M>
where
    C: DatasetCache,
    R: RemoteSource,
    M: ConnectivityMonitor,
{
    shared: &'a Shared<C, R, M>,
}

impl<'a, C, R, M> RefreshGuard<'a, C, R, M>
where
    C: DatasetCache,
    R: RemoteSource,
    M: ConnectivityMonitor,
{
    fn begin(shared: &'a Shared<C, R, M>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        shared.update_refreshing();
        Self { shared }
    }
}

impl<C, R, M> Drop for RefreshGuard<'_, C, R, M>
where
    C: DatasetCache,
    R: RemoteSource,
    M: ConnectivityMonitor,
{
    fn drop(&mut self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.shared.update_refreshing();
    }
}
