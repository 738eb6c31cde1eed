//! The fetch operation seam
//!
//! The engine never knows what it is polling. It calls [`Fetcher::fetch`],
//! which must eventually resolve to a value or an error. Plain async
//! closures implement the trait through a blanket impl.

use std::future::Future;

use async_trait::async_trait;

/// A zero-argument asynchronous operation producing one value or one error
///
/// The engine imposes no timeout: an attempt that never settles stalls its
/// epoch's cadence until the engine is restarted or deactivated.
///
/// # Example
///
/// ```rust,ignore
/// struct StatusEndpoint { client: Client }
///
/// #[async_trait]
/// impl Fetcher<Status, ClientError> for StatusEndpoint {
///     async fn fetch(&self) -> Result<Status, ClientError> {
///         self.client.get_status().await
///     }
/// }
/// ```
#[async_trait]
pub trait Fetcher<T, E>: Send + Sync {
    async fn fetch(&self) -> Result<T, E>;
}

#[async_trait]
impl<T, E, F, Fut> Fetcher<T, E> for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn fetch(&self) -> Result<T, E> {
        (self)().await
    }
}
