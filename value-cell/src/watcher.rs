//! Watchers for a ValueCell
//!
//! `CellWatcher` is the async observer; `SyncWatcher` wraps it for code
//! that can't use async/await, such as CLI applications or tests.

use std::time::Duration;

use tokio::sync::watch;

use crate::cell::Versioned;

/// Async observer of a [`ValueCell`](crate::ValueCell)
///
/// # Example
///
/// ```rust,ignore
/// let mut watcher = cell.watch();
///
/// while let Some(value) = watcher.changed().await {
///     println!("now {:?} (v{})", value, watcher.version());
/// }
/// ```
pub struct CellWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    rx: watch::Receiver<Versioned<T>>,
}

impl<T> CellWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(rx: watch::Receiver<Versioned<T>>) -> Self {
        Self { rx }
    }

    /// Get the current value without waiting
    pub fn get(&self) -> T {
        self.rx.borrow().value.clone()
    }

    /// Version of the current value
    pub fn version(&self) -> u64 {
        self.rx.borrow().version
    }

    /// Wait for the next write, then return the value it produced
    ///
    /// Returns `None` once every writer has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().value.clone())
    }

    /// Check whether a write landed since the last `changed()`
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

impl<T> Clone for CellWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for CellWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellWatcher")
            .field("version", &self.version())
            .finish()
    }
}

/// A synchronous wrapper around a [`CellWatcher`]
///
/// # Example
///
/// ```rust,ignore
/// let mut watcher = SyncWatcher::new(cell.watch(), runtime.handle().clone());
///
/// // Current value (instant)
/// println!("Current: {:?}", watcher.get());
///
/// // Block until the value changes
/// while let Some(value) = watcher.wait() {
///     println!("Changed to: {:?}", value);
/// }
/// ```
pub struct SyncWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: CellWatcher<T>,
    rt: tokio::runtime::Handle,
}

impl<T> SyncWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new SyncWatcher
    ///
    /// # Arguments
    ///
    /// * `inner` - The async watcher to wrap
    /// * `rt` - A handle to a Tokio runtime for blocking operations
    pub fn new(inner: CellWatcher<T>, rt: tokio::runtime::Handle) -> Self {
        Self { inner, rt }
    }

    /// Get the current value without blocking
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Block until the value changes, then return the new value
    ///
    /// Returns `None` if the cell is closed.
    pub fn wait(&mut self) -> Option<T> {
        self.rt.block_on(self.inner.changed())
    }

    /// Block until the value changes or timeout expires
    ///
    /// Returns `None` if the cell is closed or the timeout expires.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<T> {
        let inner = &mut self.inner;
        self.rt
            .block_on(async move { tokio::time::timeout(timeout, inner.changed()).await })
            .ok()
            .flatten()
    }

    /// Check if the value has been written since last check
    pub fn has_changed(&self) -> bool {
        self.inner.has_changed()
    }
}

impl<T> Clone for SyncWatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            rt: self.rt.clone(),
        }
    }
}
