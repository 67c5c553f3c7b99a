//! Stable identities for the threads that run services.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_NUMBER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: ThreadIdentity = ThreadIdentity::capture();
}

/// Process-unique number and display name of a thread.
///
/// Numbers are assigned on first use and never reused, so a pooled thread
/// keeps its number for its whole life.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadIdentity {
    number: u64,
    name: Arc<str>,
}

impl ThreadIdentity {
    /// Identity of the calling thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT
            .try_with(Clone::clone)
            .unwrap_or_else(|_| Self::capture())
    }

    fn capture() -> Self {
        let number = NEXT_THREAD_NUMBER.fetch_add(1, Ordering::Relaxed);
        let name = std::thread::current()
            .name()
            .map_or_else(|| format!("thread-{number}"), str::to_owned);
        Self {
            number,
            name: name.into(),
        }
    }

    /// Process-unique thread number.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Thread name, or `thread-<number>` for unnamed threads.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.name, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable_within_a_thread() {
        assert_eq!(ThreadIdentity::current(), ThreadIdentity::current());
    }

    #[test]
    fn identities_differ_across_threads() -> Result<(), Box<dyn std::error::Error>> {
        let here = ThreadIdentity::current();
        let there = std::thread::Builder::new()
            .name("identity-probe".to_string())
            .spawn(ThreadIdentity::current)?
            .join()
            .map_err(|_| "probe thread panicked")?;

        assert_ne!(here.number(), there.number());
        assert_eq!(there.name(), "identity-probe");
        Ok(())
    }
}
