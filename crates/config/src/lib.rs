//! # tundra-config
//!
//! Configuration schema, validation, and loading for the usage monitor.
//! This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{
    ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_MONITOR_AUTO_START, ENV_RENDER_MAX_ARRAY_ITEMS,
    ENV_RENDER_MAX_DEPTH, ENV_RENDER_MAX_VALUE_CHARS, EnvParseError, MonitorEnv,
    apply_env_overrides,
};
pub use load::{
    ConfigFormat, detect_config_format, load_monitor_config_from_path,
    load_monitor_config_from_sources, load_monitor_config_std_env, to_pretty_json,
    to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, LOG_LEVELS, LogFormat, LoggingConfig,
    MonitorConfig, MonitorSection, RenderConfig, ValidatedMonitorConfig,
    parse_monitor_config_json, parse_monitor_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
