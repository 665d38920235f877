use crate::models::route::RouteChangeEvent;

/// Receives route-change notifications on behalf of the host application.
///
/// Called from the block loop thread, not the thread that issued `start`.
/// Implementations should marshal to the host's event thread if needed.
pub trait RouteChangeSink: Send + Sync {
    fn notify(&self, event: &RouteChangeEvent);
}
