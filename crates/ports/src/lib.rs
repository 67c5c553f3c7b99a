//! # tundra-ports
//!
//! Port traits for the tundra hexagonal architecture.
//!
//! This crate defines the seams between the usage monitor and the host it
//! runs in: the invocation chain, ambient session/user lookup, pipeline
//! rendering, and read-only snapshots. It depends only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod invoke;
pub mod render;
pub mod snapshot;
pub mod state;

pub use invoke::*;
pub use render::*;
pub use snapshot::*;
pub use state::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `tundra-domain`.
pub use tundra_domain::{InvokeState, Pipeline, ServiceDescriptor, ServiceName};
