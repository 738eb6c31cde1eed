//! Construction options for a polling engine
//!
//! Mirrors the props a consumer hands the engine on every reconciliation:
//! the fetch operation, the initial state, the cadence, the failure policy
//! and an optional restart trigger.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use value_cell::Setter;

use crate::config::PollingConfig;
use crate::fetcher::Fetcher;
use crate::policy::FailurePolicy;

/// Options for one activation epoch of a [`PollingEngine`](crate::PollingEngine)
///
/// `K` is the trigger type. It defaults to `()` for engines that never
/// restart on their own; [`with_trigger`](Self::with_trigger) switches it.
///
/// # Example
///
/// ```rust,ignore
/// let options = PollingOptions::new(|| async { client.status().await }, Status::Unknown)
///     .with_delay(Duration::from_secs(5))
///     .on_error(|_e, set| set.set(Status::Unreachable))
///     .with_trigger(device_id.clone());
/// ```
pub struct PollingOptions<T, E, K = ()>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fetcher: Arc<dyn Fetcher<T, E>>,
    pub(crate) initial_state: T,
    pub(crate) config: PollingConfig,
    pub(crate) on_error: FailurePolicy<T, E>,
    pub(crate) update_trigger: Option<K>,
}

impl<T, E> PollingOptions<T, E, ()>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Options polling an async closure
    pub fn new<F, Fut>(fetch: F, initial_state: T) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_fetcher(Arc::new(fetch), initial_state)
    }

    /// Options polling any [`Fetcher`] implementation
    pub fn from_fetcher<F>(fetcher: Arc<F>, initial_state: T) -> Self
    where
        F: Fetcher<T, E> + 'static,
    {
        Self {
            fetcher,
            initial_state,
            config: PollingConfig::default(),
            on_error: FailurePolicy::default(),
            update_trigger: None,
        }
    }
}

impl<T, E, K> PollingOptions<T, E, K>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn with_config(mut self, config: PollingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Install a failure handler in place of the reset-to-initial default
    pub fn on_error<H>(mut self, handler: H) -> Self
    where
        H: Fn(E, Setter<T>) + Send + Sync + 'static,
    {
        self.on_error = FailurePolicy::handler(handler);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy<T, E>) -> Self {
        self.on_error = policy;
        self
    }

    /// Set the restart trigger, changing the trigger type if needed
    pub fn with_trigger<K2>(self, trigger: K2) -> PollingOptions<T, E, K2> {
        PollingOptions {
            fetcher: self.fetcher,
            initial_state: self.initial_state,
            config: self.config,
            on_error: self.on_error,
            update_trigger: Some(trigger),
        }
    }

    /// Clear the restart trigger, keeping its type
    pub fn without_trigger(mut self) -> Self {
        self.update_trigger = None;
        self
    }

    pub fn initial_state(&self) -> &T {
        &self.initial_state
    }

    pub fn delay(&self) -> Duration {
        self.config.delay
    }

    pub fn update_trigger(&self) -> Option<&K> {
        self.update_trigger.as_ref()
    }
}

impl<T, E, K> Clone for PollingOptions<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            initial_state: self.initial_state.clone(),
            config: self.config,
            on_error: self.on_error.clone(),
            update_trigger: self.update_trigger.clone(),
        }
    }
}

impl<T, E, K> std::fmt::Debug for PollingOptions<T, E, K>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingOptions")
            .field("initial_state", &self.initial_state)
            .field("delay", &self.config.delay)
            .field("on_error", &self.on_error)
            .field("update_trigger", &self.update_trigger)
            .finish()
    }
}
