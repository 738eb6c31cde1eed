//! The polling engine
//!
//! One engine owns one value cell, one current attempt token and at most one
//! pending timer. Its fetch cycle is:
//!
//! 1. Mint a token and record it as current
//! 2. Spawn the fetch
//! 3. On settle, write the cell only if the token is still current
//! 4. If still current, arm a timer for `delay`; when it fires, go to 1
//!
//! Deactivation and restarts invalidate the current token synchronously.
//! Fetches already in flight are left to settle and are then discarded,
//! so the last issued attempt wins, not the last to settle.

use std::fmt::Debug;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use value_cell::{CellWatcher, SyncWatcher, ValueCell, WriteGate};

use crate::error::{PollingError, Result};
use crate::guard::MountGuard;
use crate::options::PollingOptions;
use crate::policy::FailurePolicy;
use crate::stats::{EngineState, EngineStats};
use crate::token::{AttemptToken, TokenClock};

/// Self-rescheduling poller publishing the latest accepted result
///
/// `T` is the polled value, `E` the fetch error and `K` the restart trigger.
///
/// # Example
///
/// ```rust,ignore
/// let engine = PollingEngine::new(
///     PollingOptions::new(|| async { api.status().await }, Status::Unknown)
///         .with_delay(Duration::from_secs(5)),
/// );
///
/// let _mounted = engine.mount()?;
/// let mut watcher = engine.watch();
/// while let Some(status) = watcher.changed().await {
///     render(&status);
/// }
/// ```
pub struct PollingEngine<T, E, K = ()>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    core: Arc<EngineCore<T, E, K>>,
}

/// State shared between the engine handle and its spawned tasks
struct EngineCore<T, E, K>
where
    T: Clone + Send + Sync + 'static,
{
    cell: ValueCell<T>,

    /// Runtime supplied at construction; falls back to the caller's runtime
    runtime: Option<Handle>,

    inner: Mutex<EngineInner<T, E, K>>,
}

struct EngineInner<T, E, K>
where
    T: Clone + Send + Sync + 'static,
{
    state: EngineState,

    /// Options of the active epoch, or of the next one while inactive
    options: PollingOptions<T, E, K>,

    clock: TokenClock,

    /// The only token allowed to write the cell; `None` while inactive
    current: Option<AttemptToken>,

    /// Pending re-fetch; `None` while a fetch is in flight or while inactive
    timer: Option<AbortHandle>,

    /// Runtime driving the active epoch
    epoch_runtime: Option<Handle>,

    settlements_accepted: u64,
    stale_discarded: u64,
}

impl<T, E, K> PollingEngine<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    /// Create an inactive engine that will run on the caller's Tokio runtime
    pub fn new(options: PollingOptions<T, E, K>) -> Self {
        Self::build(options, None)
    }

    /// Create an inactive engine bound to a specific runtime
    ///
    /// Lets synchronous code activate the engine from outside the runtime.
    pub fn with_runtime(options: PollingOptions<T, E, K>, runtime: Handle) -> Self {
        Self::build(options, Some(runtime))
    }

    fn build(options: PollingOptions<T, E, K>, runtime: Option<Handle>) -> Self {
        let cell = ValueCell::new(options.initial_state.clone());

        Self {
            core: Arc::new(EngineCore {
                cell,
                runtime,
                inner: Mutex::new(EngineInner {
                    state: EngineState::Inactive,
                    options,
                    clock: TokenClock::new(),
                    current: None,
                    timer: None,
                    epoch_runtime: None,
                    settlements_accepted: 0,
                    stale_discarded: 0,
                }),
            }),
        }
    }

    /// Start polling: issue the first fetch immediately and keep the loop
    /// running until [`deactivate`](Self::deactivate)
    ///
    /// Does nothing if the engine is already active.
    ///
    /// The first attempt is issued (its token minted and made current)
    /// before this returns, but the fetcher itself is invoked from a spawned
    /// task, so it runs once the runtime first polls that task rather than
    /// inside this call.
    pub fn activate(&self) -> Result<()> {
        let mut inner = self.core.inner.lock();
        if inner.state.is_active() {
            debug!("Polling already active, ignoring activate");
            return Ok(());
        }

        let runtime = self.core.resolve_runtime()?;
        self.core.start(&mut inner, runtime);
        Ok(())
    }

    /// Stop polling
    ///
    /// Cancels the pending timer and invalidates the current token, so a
    /// fetch still in flight can no longer write the value. Idempotent.
    pub fn deactivate(&self) {
        let mut inner = self.core.inner.lock();
        self.core.stop(&mut inner);
    }

    /// Deactivate and immediately activate again under the stored options
    pub fn restart(&self) -> Result<()> {
        let runtime = self.core.resolve_runtime()?;

        let mut inner = self.core.inner.lock();
        self.core.stop(&mut inner);
        self.core.start(&mut inner, runtime);
        Ok(())
    }

    /// Apply the latest options from the embedding component
    ///
    /// While active, a changed trigger restarts the engine under the new
    /// options and an unchanged trigger leaves the running epoch untouched.
    /// While inactive, the options are stored for the next activation.
    /// Returns whether a restart happened.
    pub fn reconcile(&self, options: PollingOptions<T, E, K>) -> Result<bool> {
        let mut inner = self.core.inner.lock();

        if !inner.state.is_active() {
            inner.options = options;
            return Ok(false);
        }

        if inner.options.update_trigger == options.update_trigger {
            return Ok(false);
        }

        let runtime = self.core.resolve_runtime()?;
        info!(
            "Update trigger changed from {:?} to {:?}, restarting polling",
            inner.options.update_trigger, options.update_trigger
        );

        inner.options = options;
        self.core.stop(&mut inner);
        self.core.start(&mut inner, runtime);
        Ok(true)
    }

    /// Activate and return a guard that deactivates on drop
    ///
    /// The guard runs on every exit path, including unwinding.
    pub fn mount(&self) -> Result<MountGuard<'_, T, E, K>> {
        self.activate()?;
        Ok(MountGuard::new(self))
    }

    /// Current value; starts at the initial state and never blocks
    pub fn read(&self) -> T {
        self.core.cell.get()
    }

    /// Number of writes the value cell has accepted
    pub fn version(&self) -> u64 {
        self.core.cell.version()
    }

    /// Async observer notified on every accepted write
    pub fn watch(&self) -> CellWatcher<T> {
        self.core.cell.watch()
    }

    /// Blocking observer for synchronous consumers
    pub fn sync_watch(&self, rt: Handle) -> SyncWatcher<T> {
        SyncWatcher::new(self.core.cell.watch(), rt)
    }

    pub fn is_active(&self) -> bool {
        self.core.inner.lock().state.is_active()
    }

    pub fn state(&self) -> EngineState {
        self.core.inner.lock().state
    }

    pub fn current_token(&self) -> Option<AttemptToken> {
        self.core.inner.lock().current
    }

    /// Whether a re-fetch is scheduled and has not fired yet
    pub fn has_pending_timer(&self) -> bool {
        self.core
            .inner
            .lock()
            .timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    pub fn stats(&self) -> EngineStats {
        let inner = self.core.inner.lock();

        EngineStats {
            state: inner.state,
            current_token: inner.current,
            delay: inner.options.config.delay,
            epochs: inner.clock.epochs(),
            attempts_issued: inner.clock.minted(),
            settlements_accepted: inner.settlements_accepted,
            stale_discarded: inner.stale_discarded,
            value_version: self.core.cell.version(),
        }
    }
}

impl<T, E, K> Drop for PollingEngine<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl<T, E, K> std::fmt::Debug for PollingEngine<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.core.inner.lock();
        f.debug_struct("PollingEngine")
            .field("state", &inner.state)
            .field("current_token", &inner.current)
            .field("update_trigger", &inner.options.update_trigger)
            .field("value_version", &self.core.cell.version())
            .finish()
    }
}

impl<T, E, K> EngineCore<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn resolve_runtime(&self) -> Result<Handle> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| PollingError::NoRuntime),
        }
    }

    /// Open a new epoch and issue its first fetch
    fn start(self: &Arc<Self>, inner: &mut EngineInner<T, E, K>, runtime: Handle) {
        let epoch = inner.clock.next_epoch();
        inner.state = EngineState::Active {
            epoch,
            since: Instant::now(),
        };
        inner.epoch_runtime = Some(runtime);

        info!(
            "Polling activated ({}, delay: {:?})",
            epoch, inner.options.config.delay
        );

        self.issue(inner);
    }

    fn stop(&self, inner: &mut EngineInner<T, E, K>) {
        let EngineState::Active { epoch, .. } = inner.state else {
            return;
        };

        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.current = None;
        inner.epoch_runtime = None;
        inner.state = EngineState::Inactive;

        info!("Polling deactivated ({})", epoch);
    }

    fn issue(self: &Arc<Self>, inner: &mut EngineInner<T, E, K>) {
        let Some(runtime) = inner.epoch_runtime.clone() else {
            return;
        };

        let token = inner.clock.mint();
        inner.current = Some(token);

        let fetcher = Arc::clone(&inner.options.fetcher);
        let core = Arc::clone(self);

        debug!("Issuing fetch {}", token);
        runtime.spawn(async move {
            let outcome = fetcher.fetch().await;
            core.settle(token, outcome);
        });
    }

    fn settle(self: &Arc<Self>, token: AttemptToken, outcome: std::result::Result<T, E>) {
        let mut inner = self.inner.lock();

        if inner.current != Some(token) {
            inner.stale_discarded += 1;
            debug!("Discarding stale settlement of {}", token);
            return;
        }
        inner.settlements_accepted += 1;

        let failure = match outcome {
            Ok(value) => {
                debug!("{} resolved", token);
                self.cell.set(value);
                None
            }
            Err(error) => match &inner.options.on_error {
                FailurePolicy::ResetToInitial => {
                    debug!("{} failed, resetting to initial state", token);
                    self.cell.set(inner.options.initial_state.clone());
                    None
                }
                FailurePolicy::Handler(handler) => Some((Arc::clone(handler), error)),
            },
        };

        let Some((handler, error)) = failure else {
            self.schedule_next(&mut inner, token);
            return;
        };

        // The handler may call back into the engine
        drop(inner);
        debug!("{} failed, invoking failure handler", token);
        let gate = Arc::new(AttemptGate {
            core: Arc::downgrade(self),
            token,
        });
        handler(error, self.cell.gated_setter(gate));

        let mut inner = self.inner.lock();
        self.schedule_next(&mut inner, token);
    }

    fn schedule_next(self: &Arc<Self>, inner: &mut EngineInner<T, E, K>, token: AttemptToken) {
        if inner.current != Some(token) {
            return;
        }
        let Some(runtime) = inner.epoch_runtime.clone() else {
            return;
        };

        let delay = inner.options.config.delay;
        let core = Arc::clone(self);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            core.fire(token);
        });

        if let Some(previous) = inner.timer.replace(timer.abort_handle()) {
            previous.abort();
        }
    }

    fn fire(self: &Arc<Self>, token: AttemptToken) {
        let mut inner = self.inner.lock();
        if inner.current != Some(token) {
            return;
        }

        inner.timer = None;
        self.issue(&mut inner);
    }
}

/// Admits handler writes only while its attempt is still current
///
/// The check and the write happen under the engine lock, so a restart or
/// deactivation racing with a slow handler always wins.
struct AttemptGate<T, E, K>
where
    T: Clone + Send + Sync + 'static,
{
    core: Weak<EngineCore<T, E, K>>,
    token: AttemptToken,
}

impl<T, E, K> WriteGate for AttemptGate<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn admit(&self, write: &mut dyn FnMut()) -> bool {
        let Some(core) = self.core.upgrade() else {
            return false;
        };

        let mut inner = core.inner.lock();
        if inner.current != Some(self.token) {
            inner.stale_discarded += 1;
            debug!("Dropping failure handler write from stale {}", self.token);
            return false;
        }

        write();
        true
    }
}
