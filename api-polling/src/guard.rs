//! RAII binding of an engine to a consumer's visible lifetime

use std::fmt::Debug;

use crate::engine::PollingEngine;

/// Keeps an engine active while the guard is alive
///
/// Created by [`PollingEngine::mount`]. Dropping the guard deactivates the
/// engine, whether the scope exits normally, early, or by unwinding.
///
/// # Example
///
/// ```rust,ignore
/// fn show_panel(engine: &PollingEngine<Status, ApiError>) -> Result<()> {
///     let mounted = engine.mount()?;
///     render(&mounted.read())?; // deactivated even if this fails
///     Ok(())
/// }
/// ```
#[must_use = "dropping the guard deactivates the engine immediately"]
pub struct MountGuard<'a, T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    engine: &'a PollingEngine<T, E, K>,
}

impl<'a, T, E, K> MountGuard<'a, T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    pub(crate) fn new(engine: &'a PollingEngine<T, E, K>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &'a PollingEngine<T, E, K> {
        self.engine
    }

    pub fn read(&self) -> T {
        self.engine.read()
    }
}

impl<T, E, K> Drop for MountGuard<'_, T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    K: PartialEq + Debug + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.engine.deactivate();
    }
}
