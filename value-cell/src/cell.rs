//! The cell itself and its write handle
//!
//! - `ValueCell<T>`: shared, observable storage for one value
//! - `Setter<T>`: a cloneable handle that can only write
//! - `WriteGate`: decides, at write time, whether a setter may still write

use std::sync::Arc;

use tokio::sync::watch;

use crate::watcher::CellWatcher;

/// A value paired with the number of writes that produced it
///
/// The initial value has version 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

// ============================================================================
// ValueCell<T> - shared observable value
// ============================================================================

/// Shared storage for a single value with change notification
///
/// Clones share the same underlying value, like `Arc`. The cell stays open
/// for watchers until the last `ValueCell` and `Setter` are dropped.
///
/// # Example
///
/// ```rust
/// use value_cell::ValueCell;
///
/// let cell = ValueCell::new("initial".to_string());
///
/// // Every write notifies, even a repeated value
/// cell.set("initial".to_string());
/// assert_eq!(cell.version(), 1);
/// ```
pub struct ValueCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    tx: Arc<watch::Sender<Versioned<T>>>,
}

impl<T> ValueCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding `initial` at version 0
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Versioned {
            version: 0,
            value: initial,
        });

        Self { tx: Arc::new(tx) }
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().value.clone()
    }

    /// Get the current value together with its version
    pub fn snapshot(&self) -> Versioned<T> {
        self.tx.borrow().clone()
    }

    /// Number of writes accepted so far
    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Write a new value and notify every watcher
    ///
    /// No equality check is made: each call counts as a change.
    pub fn set(&self, value: T) {
        self.tx.send_modify(|slot| {
            slot.version += 1;
            slot.value = value;
        });
    }

    /// Create a write-only handle to this cell
    pub fn setter(&self) -> Setter<T> {
        Setter {
            cell: self.clone(),
            gate: None,
        }
    }

    /// Get a write handle whose writes must pass `gate`
    pub fn gated_setter(&self, gate: Arc<dyn WriteGate>) -> Setter<T> {
        Setter {
            cell: self.clone(),
            gate: Some(gate),
        }
    }

    /// Create an async watcher positioned at the current value
    pub fn watch(&self) -> CellWatcher<T> {
        CellWatcher::new(self.tx.subscribe())
    }

    /// Number of live watchers
    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> Clone for ValueCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> std::fmt::Debug for ValueCell<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.tx.borrow();
        f.debug_struct("ValueCell")
            .field("version", &current.version)
            .field("value", &current.value)
            .finish()
    }
}

// ============================================================================
// WriteGate - conditional writes
// ============================================================================

/// Admission check for writes made through a gated [`Setter`]
///
/// `admit` must run `write` at most once, and only while the gate is open.
/// Implementations that hold a lock while calling `write` make the check and
/// the write atomic.
pub trait WriteGate: Send + Sync {
    /// Run `write` if the gate is open; returns whether it ran
    fn admit(&self, write: &mut dyn FnMut()) -> bool;
}

// ============================================================================
// Setter<T> - write handle
// ============================================================================

/// Write handle for a [`ValueCell`]
///
/// Handed to code that may replace the value but has no business reading
/// or watching it.
pub struct Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: ValueCell<T>,
    gate: Option<Arc<dyn WriteGate>>,
}

impl<T> Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Write a new value and notify every watcher
    ///
    /// A gated setter silently drops the write once its gate has closed.
    pub fn set(&self, value: T) {
        self.try_set(value);
    }

    /// Like [`set`](Self::set), but reports whether the write happened
    pub fn try_set(&self, value: T) -> bool {
        let Some(gate) = &self.gate else {
            self.cell.set(value);
            return true;
        };

        let mut value = Some(value);
        gate.admit(&mut || {
            if let Some(value) = value.take() {
                self.cell.set(value);
            }
        })
    }

    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }
}

impl<T> Clone for Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter")
            .field("version", &self.cell.version())
            .field("gated", &self.is_gated())
            .finish()
    }
}
