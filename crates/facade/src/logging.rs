//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tundra_config::{LogFormat, LoggingConfig};
use tundra_shared::{ErrorCode, ErrorEnvelope, Result};

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG`, when set and non-empty, replaces the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(&logging.level, rust_log.as_deref());
    let filter = EnvFilter::try_new(directives).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("logging", "invalid_filter"),
            format!("invalid log filter: {error}"),
        )
        .with_metadata("directives", directives.to_owned())
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);
    let installed = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };

    installed.map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("logging", "already_initialized"),
            format!("failed to install tracing subscriber: {error}"),
        )
    })
}

/// Filter directives in effect for `level` given the raw `RUST_LOG` value.
pub fn filter_directives<'a>(level: &'a str, rust_log: Option<&'a str>) -> &'a str {
    match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives,
        _ => level,
    }
}
