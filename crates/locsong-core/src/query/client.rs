use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use super::state::{QueryError, QueryState, QueryStatus};
use super::{ErasedFetch, FetchError, Payload, Query, QueryKey};

type Inflight = Shared<BoxFuture<'static, Result<(), QueryError>>>;

/// Retention policy for the cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// How long an unobserved entry is kept.
    pub gc_time: Duration,
    /// Period of the background collector started by [`QueryClient::init`].
    pub gc_interval: Duration,
    /// Upper bound on entries; the oldest unobserved ones go first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gc_time: Duration::from_secs(600),
            gc_interval: Duration::from_secs(60),
            max_entries: 256,
        }
    }
}

struct Entry {
    generation: u64,
    data: Option<Payload>,
    error: Option<QueryError>,
    updated_at: Option<Instant>,
    stale_time: Duration,
    invalidated: bool,
    inflight: Option<(Inflight, AbortHandle)>,
    fetch: Option<ErasedFetch>,
    observers: usize,
    last_used: Instant,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new(generation: u64, now: Instant) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            generation,
            data: None,
            error: None,
            updated_at: None,
            stale_time: Duration::ZERO,
            invalidated: false,
            inflight: None,
            fetch: None,
            observers: 0,
            last_used: now,
            version,
        }
    }

    fn status(&self, stale_time: Duration, now: Instant) -> QueryStatus {
        if self.error.is_some() {
            return QueryStatus::Error;
        }
        match (&self.data, self.updated_at) {
            (Some(_), Some(updated_at)) => {
                if self.invalidated || now.saturating_duration_since(updated_at) >= stale_time {
                    QueryStatus::Stale
                } else {
                    QueryStatus::Fresh
                }
            }
            _ => QueryStatus::Pending,
        }
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    next_generation: u64,
    disposed: bool,
}

impl CacheState {
    fn entry(&mut self, key: &QueryKey, now: Instant) -> &mut Entry {
        let next_generation = &mut self.next_generation;
        self.entries.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(key = %key, "cache entry created");
            let generation = *next_generation;
            *next_generation += 1;
            Entry::new(generation, now)
        })
    }
}

struct ClientInner {
    config: CacheConfig,
    state: Mutex<CacheState>,
    fetch_count: AtomicU64,
    gc_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClientInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a finished fetch on its entry and wake observers.
    fn complete(
        &self,
        key: &QueryKey,
        generation: u64,
        result: Result<Payload, FetchError>,
        started: Instant,
    ) -> Result<(), QueryError> {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut state = self.lock();
        let Some(entry) = state
            .entries
            .get_mut(key)
            .filter(|e| e.generation == generation)
        else {
            tracing::debug!(key = %key, "fetch finished for a removed entry");
            return Err(QueryError::Aborted {
                key: key.to_string(),
            });
        };

        entry.inflight = None;
        let outcome = match result {
            Ok(payload) => {
                tracing::debug!(key = %key, elapsed_ms, "fetch succeeded");
                entry.data = Some(payload);
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.invalidated = false;
                Ok(())
            }
            Err(source) => {
                tracing::warn!(key = %key, elapsed_ms, error = %source, "fetch failed");
                let error = QueryError::Fetch {
                    key: key.to_string(),
                    source,
                };
                entry.error = Some(error.clone());
                Err(error)
            }
        };
        entry.notify();
        outcome
    }
}

/// Shared, cloneable query cache.
///
/// All bookkeeping sits behind one mutex that is never held across an
/// `.await`. Fetches run as spawned tasks, so a result is cached even when
/// every caller waiting on it has gone away.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    next_generation: 0,
                    disposed: false,
                }),
                fetch_count: AtomicU64::new(0),
                gc_task: Mutex::new(None),
            }),
        }
    }

    /// Create a client and start its periodic garbage collector.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(config: CacheConfig) -> Self {
        let client = Self::new(config);
        let weak = Arc::downgrade(&client.inner);
        let period = config.gc_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let removed = QueryClient { inner }.collect_garbage();
                if removed > 0 {
                    tracing::debug!(removed, "cache garbage collected");
                }
            }
        });
        *client.inner.gc_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        client
    }

    /// Stop the collector, abort in-flight fetches and drop every entry.
    /// Later calls report [`QueryError::Disposed`].
    pub fn dispose(&self) {
        if let Some(task) = self
            .inner
            .gc_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }

        let mut state = self.inner.lock();
        state.disposed = true;
        for (_, entry) in state.entries.drain() {
            if let Some((_, abort)) = &entry.inflight {
                abort.abort();
            }
        }
        tracing::debug!("query client disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Cached state only; never fetches.
    pub fn peek<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        let state = self.inner.lock();
        if state.disposed {
            return QueryState::failed(QueryError::Disposed);
        }
        Self::snapshot(state.entries.get(&query.key), query, Instant::now())
    }

    fn snapshot<T: Send + Sync + 'static>(
        entry: Option<&Entry>,
        query: &Query<T>,
        now: Instant,
    ) -> QueryState<T> {
        let Some(entry) = entry else {
            return if query.enabled {
                QueryState {
                    status: QueryStatus::Pending,
                    ..QueryState::disabled()
                }
            } else {
                QueryState::disabled()
            };
        };

        let data = entry.data.clone().and_then(|payload| {
            match payload.downcast::<T>() {
                Ok(data) => Some(data),
                Err(_) => {
                    tracing::warn!(key = %query.key, "cached payload has a different type");
                    None
                }
            }
        });

        let status = if !query.enabled && data.is_none() {
            QueryStatus::Disabled
        } else {
            entry.status(query.stale_time, now)
        };

        QueryState {
            status,
            data,
            error: entry.error.clone(),
            is_fetching: entry.inflight.is_some(),
            updated_at: entry.updated_at,
        }
    }

    // ── Fetching ─────────────────────────────────────────────────

    /// Serve fresh data, serve stale data while refetching in the
    /// background, or wait for the single in-flight fetch.
    pub async fn fetch<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        if !query.enabled {
            return self.peek(query);
        }
        match self.ensure(query, false) {
            Ok(Some(inflight)) => {
                let _ = inflight.await;
                self.peek(query)
            }
            Ok(None) => self.peek(query),
            Err(e) => QueryState::failed(e),
        }
    }

    /// Populate the cache without subscribing. Shares dedup and freshness
    /// with [`fetch`](Self::fetch).
    pub async fn prefetch<T: Send + Sync + 'static>(&self, query: &Query<T>) {
        if !query.enabled {
            return;
        }
        if let Ok(Some(inflight)) = self.ensure(query, false) {
            let _ = inflight.await;
        }
    }

    /// Force a refresh regardless of freshness. Joins a running fetch.
    pub async fn refetch<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryState<T> {
        if !query.enabled {
            return self.peek(query);
        }
        match self.ensure(query, true) {
            Ok(Some(inflight)) => {
                let _ = inflight.await;
                self.peek(query)
            }
            Ok(None) => self.peek(query),
            Err(e) => QueryState::failed(e),
        }
    }

    /// Subscribe to a query and kick off fetch-or-serve without waiting.
    pub fn observe<T: Send + Sync + 'static>(&self, query: &Query<T>) -> QueryObserver<T> {
        let receiver = {
            let now = Instant::now();
            let mut state = self.inner.lock();
            if state.disposed {
                None
            } else {
                let entry = state.entry(&query.key, now);
                entry.observers += 1;
                entry.last_used = now;
                Some(entry.version.subscribe())
            }
        };

        if query.enabled && receiver.is_some() {
            // The inflight handle is intentionally not awaited.
            let _ = self.ensure(query, false);
        }

        QueryObserver {
            client: self.clone(),
            query: query.clone(),
            receiver,
        }
    }

    /// Decide whether `query` needs network and start (or join) the fetch.
    ///
    /// Returns the in-flight future only when the caller has nothing to
    /// serve and should wait for it.
    fn ensure<T: Send + Sync + 'static>(
        &self,
        query: &Query<T>,
        force: bool,
    ) -> Result<Option<Inflight>, QueryError> {
        let now = Instant::now();
        let mut state = self.inner.lock();
        if state.disposed {
            return Err(QueryError::Disposed);
        }

        let entry = state.entry(&query.key, now);
        entry.last_used = now;
        entry.stale_time = query.stale_time;
        entry.fetch = Some(query.fetch.clone());

        let has_data = entry.data.is_some();
        let status = entry.status(query.stale_time, now);

        if status == QueryStatus::Fresh && !force {
            tracing::debug!(key = %query.key, "cache hit");
            return Ok(None);
        }

        let inflight = self.start_fetch(entry, &query.key, query.fetch.clone());
        if has_data && !force {
            tracing::debug!(key = %query.key, ?status, "serving cached data, revalidating");
            Ok(None)
        } else {
            Ok(Some(inflight))
        }
    }

    /// Start a fetch for `entry` unless one is already running.
    /// Caller holds the state lock.
    fn start_fetch(&self, entry: &mut Entry, key: &QueryKey, fetch: ErasedFetch) -> Inflight {
        if let Some((inflight, _)) = &entry.inflight {
            tracing::debug!(key = %key, "joining in-flight fetch");
            return inflight.clone();
        }

        self.inner.fetch_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "fetch started");

        let weak: Weak<ClientInner> = Arc::downgrade(&self.inner);
        let generation = entry.generation;
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let result = fetch().await;
            match weak.upgrade() {
                Some(inner) => inner.complete(&task_key, generation, result, started),
                None => Err(QueryError::Disposed),
            }
        });

        let abort = task.abort_handle();
        let join_key = key.to_string();
        let inflight = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(_) => Err(QueryError::Aborted { key: join_key }),
            }
        }
        .boxed()
        .shared();

        entry.inflight = Some((inflight.clone(), abort));
        entry.notify();
        inflight
    }

    // ── Invalidation & housekeeping ──────────────────────────────

    /// Mark every entry under `prefix` stale and refetch the observed ones.
    /// Returns the number of entries marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut state = self.inner.lock();
        if state.disposed {
            return 0;
        }
        let mut marked = 0;
        let keys: Vec<QueryKey> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in keys {
            let Some(entry) = state.entries.get_mut(&key) else {
                continue;
            };
            entry.invalidated = true;
            marked += 1;
            if entry.observers > 0 {
                if let Some(fetch) = entry.fetch.clone() {
                    let _ = self.start_fetch(entry, &key, fetch);
                }
            } else {
                entry.notify();
            }
        }
        tracing::debug!(prefix = %prefix, marked, "invalidated");
        marked
    }

    /// Refetch every observed entry that has gone stale. Meant for moments
    /// like a window regaining focus.
    pub fn refetch_stale(&self) -> usize {
        let now = Instant::now();
        let mut state = self.inner.lock();
        if state.disposed {
            return 0;
        }
        let mut started = 0;
        let keys: Vec<QueryKey> = state.entries.keys().cloned().collect();
        for key in keys {
            let Some(entry) = state.entries.get_mut(&key) else {
                continue;
            };
            if entry.observers == 0 || entry.data.is_none() {
                continue;
            }
            if entry.status(entry.stale_time, now) != QueryStatus::Stale {
                continue;
            }
            if let Some(fetch) = entry.fetch.clone() {
                let _ = self.start_fetch(entry, &key, fetch);
                started += 1;
            }
        }
        started
    }

    /// Drop entries nobody has observed for `gc_time`, then trim the
    /// oldest unobserved entries down to `max_entries`.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.config.gc_time;
        let max_entries = self.inner.config.max_entries;
        let mut state = self.inner.lock();

        let before = state.entries.len();
        state.entries.retain(|_, entry| {
            entry.observers > 0
                || entry.inflight.is_some()
                || now.saturating_duration_since(entry.last_used) < gc_time
        });

        if state.entries.len() > max_entries {
            let mut idle: Vec<(Instant, QueryKey)> = state
                .entries
                .iter()
                .filter(|(_, e)| e.observers == 0 && e.inflight.is_none())
                .map(|(k, e)| (e.last_used, k.clone()))
                .collect();
            idle.sort();
            let excess = state.entries.len() - max_entries;
            for (_, key) in idle.into_iter().take(excess) {
                state.entries.remove(&key);
            }
        }

        before - state.entries.len()
    }

    /// Drop one entry. Observers of it see the channel close.
    pub fn remove(&self, key: &QueryKey) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total fetches started since creation. Joins don't count.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetch_count.load(Ordering::Relaxed)
    }

    fn release(&self, key: &QueryKey) {
        let mut state = self.inner.lock();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }
}

/// A live subscription to one query. Dropping it unsubscribes.
pub struct QueryObserver<T> {
    client: QueryClient,
    query: Query<T>,
    receiver: Option<watch::Receiver<u64>>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub fn state(&self) -> QueryState<T> {
        self.client.peek(&self.query)
    }

    pub fn query(&self) -> &Query<T> {
        &self.query
    }

    /// Wait for the next change to this entry.
    pub async fn changed(&mut self) -> Result<(), QueryError> {
        match &mut self.receiver {
            Some(receiver) => receiver.changed().await.map_err(|_| QueryError::Aborted {
                key: self.query.key.to_string(),
            }),
            None => Err(QueryError::Disposed),
        }
    }

    /// Wait until the query has nothing more in flight, then return its
    /// state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            if let Some(receiver) = &mut self.receiver {
                receiver.borrow_and_update();
            }
            let state = self.state();
            if state.is_settled() {
                return state;
            }
            if self.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Manual retry.
    pub async fn refetch(&self) -> QueryState<T> {
        self.client.refetch(&self.query).await
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        if self.receiver.is_some() {
            self.client.release(&self.query.key);
        }
    }
}
