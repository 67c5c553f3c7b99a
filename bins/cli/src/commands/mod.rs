//! CLI command handlers.

pub mod config;
pub mod demo;
pub mod info;

pub use config::{run_config_show, run_config_validate};
pub use demo::{DemoArgs, run_demo_command};
pub use info::run_info;
