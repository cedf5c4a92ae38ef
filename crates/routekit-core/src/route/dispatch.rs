//! Deferred dispatch for asynchronous routes.

use tracing::error;

/// Run `task` after the current call stack unwinds.
///
/// Uses the ambient tokio runtime when there is one, a short-lived thread otherwise.
pub(crate) fn defer<F>(task: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(task);
        }
        Err(_) => {
            let spawned = std::thread::Builder::new()
                .name("routekit-dispatch".to_string())
                .spawn(task);
            if let Err(e) = spawned {
                error!(error = %e, "Failed to spawn route dispatch thread");
            }
        }
    }
}
