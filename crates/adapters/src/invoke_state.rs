//! Invoke state providers.

use std::cell::RefCell;
use tundra_domain::InvokeState;
use tundra_ports::InvokeStateProvider;
use tundra_shared::{ErrorCode, ErrorEnvelope, Result};

thread_local! {
    static BOUND: RefCell<Option<InvokeState>> = const { RefCell::new(None) };
}

/// Reads the invoke state bound to the calling thread.
///
/// Hosts bind a state around each request with [`ThreadLocalInvokeState::scope`];
/// nested scopes shadow the outer binding and restore it on exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLocalInvokeState;

impl ThreadLocalInvokeState {
    /// Run `body` with `state` bound to the calling thread.
    ///
    /// The previous binding is restored afterwards, including when `body`
    /// panics.
    pub fn scope<R>(state: InvokeState, body: impl FnOnce() -> R) -> R {
        let previous = BOUND.with(|bound| bound.replace(Some(state)));
        let _restore = Restore(previous);
        body()
    }

    /// State bound to the calling thread, if any.
    #[must_use]
    pub fn bound() -> Option<InvokeState> {
        BOUND
            .try_with(|bound| bound.borrow().clone())
            .ok()
            .flatten()
    }
}

impl InvokeStateProvider for ThreadLocalInvokeState {
    fn current(&self) -> Result<InvokeState> {
        Self::bound().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("invoke_state", "unbound"),
                "no invoke state is bound to the current thread",
            )
        })
    }
}

struct Restore(Option<InvokeState>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = BOUND.try_with(|bound| bound.replace(previous));
    }
}

/// Provider that reports the same state on every thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInvokeState {
    state: InvokeState,
}

impl FixedInvokeState {
    /// Always report `state`.
    #[must_use]
    pub const fn new(state: InvokeState) -> Self {
        Self { state }
    }
}

impl InvokeStateProvider for FixedInvokeState {
    fn current(&self) -> Result<InvokeState> {
        Ok(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_thread_has_no_state() {
        let error = ThreadLocalInvokeState.current().err();
        assert_eq!(
            error.map(|error| error.code.code().to_owned()),
            Some("unbound".to_owned())
        );
    }

    #[test]
    fn scopes_nest_and_restore() -> Result<()> {
        let outer = InvokeState::parse("s-outer", "alice")?;
        let inner = InvokeState::parse("s-inner", "bob")?;

        ThreadLocalInvokeState::scope(outer.clone(), || -> Result<()> {
            assert_eq!(ThreadLocalInvokeState.current()?, outer);
            ThreadLocalInvokeState::scope(inner.clone(), || {
                assert_eq!(ThreadLocalInvokeState::bound(), Some(inner.clone()));
            });
            assert_eq!(ThreadLocalInvokeState.current()?, outer);
            Ok(())
        })?;

        assert_eq!(ThreadLocalInvokeState::bound(), None);
        Ok(())
    }

    #[test]
    fn scope_restores_after_panic() -> Result<()> {
        let state = InvokeState::parse("s-1", "alice")?;
        let outcome = std::panic::catch_unwind(|| {
            ThreadLocalInvokeState::scope(state, || -> u8 {
                std::panic::resume_unwind(Box::new("boom"))
            })
        });

        assert!(outcome.is_err());
        assert_eq!(ThreadLocalInvokeState::bound(), None);
        Ok(())
    }

    #[test]
    fn fixed_state_is_constant() -> Result<()> {
        let state = InvokeState::parse("s-1", "alice")?;
        let provider = FixedInvokeState::new(state.clone());
        assert_eq!(provider.current()?, state);
        Ok(())
    }
}
