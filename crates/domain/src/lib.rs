//! # tundra-domain
//!
//! Value objects describing service invocations: who is being called
//! ([`ServiceName`], [`PackageName`]), with what input ([`Pipeline`]), on
//! whose behalf ([`InvokeState`]), plus the time formatting used by reports.
//!
//! This crate depends on `shared` only.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod time;

pub use pipeline::Pipeline;
pub use primitives::{
    PackageName, PrimitiveError, SERVICE_NAME_SEPARATOR, ServiceDescriptor, ServiceName,
    SessionId, UserName,
};
pub use state::InvokeState;
pub use time::{elapsed_between, format_timestamp, format_xml_duration};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
