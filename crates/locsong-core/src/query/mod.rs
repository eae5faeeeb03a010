//! Keyed query cache with per-resource staleness, in-flight dedup and
//! observer fan-out.

mod client;
mod key;
mod state;

use std::any::Any;
use std::error::Error as StdError;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

pub use client::{CacheConfig, QueryClient, QueryObserver};
pub use key::{KeyPart, ParamValue, QueryKey};
pub use state::{QueryError, QueryState, QueryStatus};

pub(crate) type Payload = Arc<dyn Any + Send + Sync>;
pub(crate) type FetchError = Arc<dyn StdError + Send + Sync>;
pub(crate) type ErasedFetch =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, FetchError>> + Send + Sync>;

/// Describes one cacheable request: its key, how long a result stays
/// fresh, whether it may run at all, and how to fetch it.
pub struct Query<T> {
    key: QueryKey,
    stale_time: Duration,
    enabled: bool,
    fetch: ErasedFetch,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            stale_time: self.stale_time,
            enabled: self.enabled,
            fetch: self.fetch.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("stale_time", &self.stale_time)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    /// A query that is enabled and immediately stale.
    pub fn new<F, Fut, E>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let fetch: ErasedFetch = Arc::new(move || {
            let fut = fetch();
            async move {
                fut.await
                    .map(|value| Arc::new(value) as Payload)
                    .map_err(|e| Arc::new(e) as FetchError)
            }
            .boxed()
        });

        Self {
            key,
            stale_time: Duration::ZERO,
            enabled: true,
            fetch,
            _marker: PhantomData,
        }
    }
}

impl<T> Query<T> {
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Guard the query. A disabled query never touches the network.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// How long a result stays fresh.
    pub fn freshness(&self) -> Duration {
        self.stale_time
    }
}
