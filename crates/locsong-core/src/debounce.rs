use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Trailing-edge debouncer.
///
/// `push` records the raw value at once; the debounced value only moves
/// after `delay` passes with no newer push. Each push aborts the previous
/// timer, and dropping the debouncer aborts any pending one.
pub struct Debouncer<T> {
    delay: Duration,
    raw: T,
    settled: Arc<watch::Sender<T>>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Debouncer<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        let (settled, _) = watch::channel(initial.clone());
        Self {
            delay,
            raw: initial,
            settled: Arc::new(settled),
            pending: None,
        }
    }

    /// Record a new raw value and restart the quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, value: T) {
        self.cancel();
        self.raw = value.clone();

        let settled = self.settled.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::publish(&settled, value);
        }));
    }

    /// Publish the raw value now, skipping the quiet period.
    pub fn flush(&mut self) {
        self.cancel();
        Self::publish(&self.settled, self.raw.clone());
    }

    fn publish(settled: &watch::Sender<T>, value: T) {
        settled.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// Latest raw input.
    pub fn raw(&self) -> &T {
        &self.raw
    }

    /// Latest debounced value.
    pub fn current(&self) -> T {
        self.settled.borrow().clone()
    }

    /// Whether a pushed value is still waiting out its quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Receiver that wakes whenever the debounced value changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.subscribe()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
