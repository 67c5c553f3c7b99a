//! Ambient invocation state boundary contract.

use tundra_domain::InvokeState;
use tundra_shared::Result;

/// Looks up the session and user the calling thread currently runs under.
pub trait InvokeStateProvider: Send + Sync {
    /// Current state for the calling thread.
    ///
    /// Fails when no state is bound; callers on the monitoring path treat
    /// that as a skipped registration, never as a call failure.
    fn current(&self) -> Result<InvokeState>;
}

impl<T: InvokeStateProvider + ?Sized> InvokeStateProvider for std::sync::Arc<T> {
    fn current(&self) -> Result<InvokeState> {
        (**self).current()
    }
}
