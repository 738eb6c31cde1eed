//! What happens to the value cell when a current attempt fails

use std::sync::Arc;

use value_cell::Setter;

/// Caller-supplied failure handler
///
/// Receives the error and a setter for the value cell. Whatever it writes
/// (or does not write) becomes the engine's state.
pub type FailureHandler<T, E> = Arc<dyn Fn(E, Setter<T>) + Send + Sync>;

/// Failure policy applied when the current attempt rejects
///
/// Stale failures never reach the policy.
pub enum FailurePolicy<T, E>
where
    T: Clone + Send + Sync + 'static,
{
    /// Silently reset the cell to the initial state
    ResetToInitial,

    /// Hand the error to the caller, who decides the resulting value
    Handler(FailureHandler<T, E>),
}

impl<T, E> FailurePolicy<T, E>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a closure as a failure handler
    pub fn handler<H>(handler: H) -> Self
    where
        H: Fn(E, Setter<T>) + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(handler))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

impl<T, E> Default for FailurePolicy<T, E>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::ResetToInitial
    }
}

impl<T, E> Clone for FailurePolicy<T, E>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        match self {
            Self::ResetToInitial => Self::ResetToInitial,
            Self::Handler(handler) => Self::Handler(Arc::clone(handler)),
        }
    }
}

impl<T, E> std::fmt::Debug for FailurePolicy<T, E>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResetToInitial => f.write_str("ResetToInitial"),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}
