//! # tundra-monitor
//!
//! Live usage monitoring for service invocations.
//!
//! A [`UsageMonitor`] is installed as a processor in a [`ProcessorChain`].
//! While started, it records every call on a per-thread stack of [`Frame`]s and
//! can produce a [`UsageReport`] of everything currently in flight, oldest
//! outermost call first.
//!
//! ```text
//! ProcessorChain ──► UsageMonitor::process ──► Next::proceed ──► service
//!                        │ push Frame                │
//!                        └──────── pop Frame ◄───────┘ (drop guard)
//! ```

pub mod chain;
pub mod frame;
pub mod invocation;
pub mod monitor;
pub mod report;
pub mod thread;

pub use chain::ProcessorChain;
pub use frame::Frame;
pub use invocation::Invocation;
pub use monitor::UsageMonitor;
pub use report::{FrameReport, InvocationReport, UsageReport};
pub use thread::ThreadIdentity;

/// Returns the monitor crate version.
#[must_use]
pub const fn monitor_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_version_is_set() {
        assert!(!monitor_crate_version().is_empty());
    }
}
