//! # api-polling
//!
//! A self-rescheduling polling loop that repeatedly calls an async fetch
//! operation, publishes the latest accepted result to observers, and never
//! lets a superseded attempt overwrite newer state.
//!
//! ## Overview
//!
//! A [`PollingEngine`] is a small state machine (`Inactive -> Active ->
//! Inactive`) driven by the component that embeds it:
//!
//! - **activate** when the consumer becomes visible: the first fetch is
//!   issued immediately, then one fetch per `delay` after each settlement
//! - **reconcile** on every update: a changed trigger restarts the engine
//! - **deactivate** when the consumer goes away: the pending timer is
//!   cancelled and in-flight results are discarded
//!
//! Every issued fetch carries an [`AttemptToken`]. Only a settlement whose
//! token is still current may write the value, so the last *issued*
//! attempt wins, never merely the last to settle.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_polling::prelude::*;
//! use std::time::Duration;
//!
//! let engine = PollingEngine::new(
//!     PollingOptions::new(|| async { client.status().await }, Status::Unknown)
//!         .with_delay(Duration::from_secs(5))
//!         .on_error(|_e, set| set.set(Status::Unreachable))
//!         .with_trigger(device_id.clone()),
//! );
//!
//! let _mounted = engine.mount()?;
//!
//! let mut watcher = engine.watch();
//! while let Some(status) = watcher.changed().await {
//!     println!("{:?}", status);
//! }
//! ```
//!
//! ## Failures
//!
//! Fetch errors never stop the loop. Without a handler the value silently
//! resets to the initial state on each failure; with one, the handler
//! decides the value through the [`Setter`] it receives.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod logging;
pub mod options;
pub mod policy;
pub mod stats;
pub mod token;

// Re-export main types for convenience
pub use config::PollingConfig;
pub use engine::PollingEngine;
pub use error::{PollingError, Result};
pub use fetcher::Fetcher;
pub use guard::MountGuard;
pub use options::PollingOptions;
pub use policy::{FailureHandler, FailurePolicy};
pub use stats::{EngineState, EngineStats};
pub use token::{AttemptToken, Epoch};

// Re-export the observer types from the cell crate
pub use value_cell::{CellWatcher, Setter, SyncWatcher};

/// Prelude module for convenient imports
///
/// ```rust
/// use api_polling::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CellWatcher, FailurePolicy, Fetcher, MountGuard, PollingConfig, PollingEngine,
        PollingError, PollingOptions, Setter, SyncWatcher,
    };
}
