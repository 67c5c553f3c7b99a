//! # tundra-adapters
//!
//! Adapter implementations for ports: HTML pipeline rendering and invoke
//! state lookup. This crate depends on `ports`, `domain`, and `shared`.

pub mod html;
pub mod invoke_state;

pub use html::{HtmlPipelineRenderer, HtmlRenderOptions, RenderError};
pub use invoke_state::{FixedInvokeState, ThreadLocalInvokeState};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
