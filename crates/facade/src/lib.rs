//! # tundra-facade
//!
//! Entry points for hosts and the CLI: the process-wide usage monitor,
//! tracing setup, and a synthetic workload for seeing a report in action.
//! This crate wires `config`, `adapters`, and `monitor` together.

/// Synthetic nested workload.
pub mod demo;
/// The process-wide monitor and config-driven builders.
pub mod global;
/// Tracing subscriber setup.
pub mod logging;

pub use demo::{DemoOptions, DemoOutcome, demo_services, run_demo};
pub use global::{build_usage_monitor, init_usage_monitor, render_options, usage_monitor};
pub use logging::{filter_directives, init_tracing};

pub use tundra_adapters::{FixedInvokeState, HtmlPipelineRenderer, ThreadLocalInvokeState};
pub use tundra_config::{
    LogFormat, MonitorConfig, MonitorEnv, ValidatedMonitorConfig, load_monitor_config_std_env,
    to_pretty_json, to_pretty_toml,
};
pub use tundra_monitor::{
    FrameReport, InvocationReport, ProcessorChain, UsageMonitor, UsageReport,
};
pub use tundra_shared::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, Result};

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
