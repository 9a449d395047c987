//! Live queries
//!
//! A live query holds the latest full result of a read and is pushed a fresh
//! result by the store worker after every write to a table the read depends
//! on. Intermediate results may be skipped; the final state is never missed.

use tokio::sync::watch;

/// Subscription to the result of a read
#[derive(Debug, Clone)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<Vec<T>>,
}

impl<T: Clone> LiveQuery<T> {
    pub(crate) fn new(rx: watch::Receiver<Vec<T>>) -> Self {
        Self { rx }
    }

    /// The most recent result
    pub fn current(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Whether a result newer than the last one seen is waiting
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next result
    ///
    /// Returns `None` once the store has been closed.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
