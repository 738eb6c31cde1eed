//! Observable Value Cell
//!
//! A single shared value with change notification. The cell is written by
//! one owner (or a [`Setter`] it hands out) and read by any number of
//! watchers, either asynchronously or through a blocking wrapper.
//!
//! # Features
//!
//! - **Always-defined reads**: the cell starts with an initial value, so
//!   `get()` never blocks and never returns `None`
//! - **Versioned writes**: every accepted write bumps a version counter and
//!   notifies watchers, even when the new value equals the old one
//! - **Async watchers**: await the next write with [`CellWatcher::changed`]
//! - **Blocking watchers**: [`SyncWatcher`] for code without async/await
//!
//! # Quick Start
//!
//! ```rust
//! use value_cell::ValueCell;
//!
//! let cell = ValueCell::new(0u32);
//! let watcher = cell.watch();
//!
//! cell.set(42);
//!
//! assert_eq!(watcher.get(), 42);
//! assert_eq!(cell.version(), 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ValueCell<T>
//!     │
//!     └── Arc<watch::Sender<Versioned<T>>>
//!             │
//!             ├── Setter<T>        (write handle)
//!             └── CellWatcher<T>   (watch::Receiver)
//!                     │
//!                     └── SyncWatcher<T>
//! ```
//!
//! Watchers observe the latest value, not every intermediate one: if two
//! writes land before a watcher wakes up, it sees only the second. Compare
//! [`CellWatcher::version`] values to detect skipped writes.

pub mod cell;
pub mod watcher;

pub use cell::{Setter, ValueCell, Versioned, WriteGate};
pub use watcher::{CellWatcher, SyncWatcher};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cell::{Setter, ValueCell};
    pub use crate::watcher::{CellWatcher, SyncWatcher};
}
