use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;

/// Derived lifecycle of a cached query, computed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// The query is guarded off and has never produced data.
    Disabled,
    /// No data and no error yet.
    Pending,
    Fresh,
    /// Older than its stale time, or invalidated. Still served.
    Stale,
    /// The latest fetch failed. Earlier data, if any, is kept.
    Error,
}

/// Errors surfaced through [`QueryState::error`].
///
/// `Clone` so a single failure can be handed to every observer of a key.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("fetch failed for {key}: {source}")]
    Fetch {
        key: String,
        source: Arc<dyn StdError + Send + Sync>,
    },

    #[error("fetch for {key} was aborted")]
    Aborted { key: String },

    #[error("query client disposed")]
    Disposed,
}

impl QueryError {
    /// Downcast the underlying fetch error.
    pub fn source_as<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Fetch { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Snapshot of one query as seen by a caller.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<QueryError>,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

impl<T> QueryState<T> {
    pub(crate) fn disabled() -> Self {
        Self {
            status: QueryStatus::Disabled,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
        }
    }

    pub(crate) fn failed(error: QueryError) -> Self {
        Self {
            status: QueryStatus::Error,
            data: None,
            error: Some(error),
            is_fetching: false,
            updated_at: None,
        }
    }

    /// No data to show and a fetch is expected or running.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && (self.status == QueryStatus::Pending || self.is_fetching)
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Settled means there is nothing more to wait for.
    pub fn is_settled(&self) -> bool {
        match self.status {
            QueryStatus::Disabled => true,
            QueryStatus::Pending => false,
            QueryStatus::Error | QueryStatus::Fresh | QueryStatus::Stale => !self.is_fetching,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }
}
