//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::env::{MonitorEnv, apply_env_overrides};
use crate::schema::{LogFormat, MonitorConfig, ValidatedMonitorConfig};
use serde::Deserialize;
use std::path::Path;
use tundra_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON (`.json` or no extension).
    Json,
    /// TOML (`.toml`).
    Toml,
}

/// Load the monitor config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`MonitorEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`MonitorConfig::default()`)
pub fn load_monitor_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &MonitorEnv,
) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    let config = match config_json {
        None => MonitorConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };
    finish(config, overrides_json, env)
}

/// Load the monitor config from an optional file path.
pub fn load_monitor_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &MonitorEnv,
) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    let config = match config_path {
        None => MonitorConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let config_text = read_config_file(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };
    finish(config, overrides_json, env)
}

/// Load the monitor config from std env and an optional file path.
pub fn load_monitor_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    let env = MonitorEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_monitor_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &MonitorConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("core", "internal"),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &MonitorConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

/// Pick the config format from a file extension.
pub fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_owned())),
    }
}

fn finish(
    mut config: MonitorConfig,
    overrides_json: Option<&str>,
    env: &MonitorEnv,
) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        overrides.apply(&mut config);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<MonitorConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<MonitorConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct MonitorConfigOverrides {
    version: Option<u32>,
    monitor: MonitorOverrides,
    render: RenderOverrides,
    logging: LoggingOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct MonitorOverrides {
    auto_start: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RenderOverrides {
    max_value_chars: Option<u32>,
    max_array_items: Option<u32>,
    max_depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LoggingOverrides {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl MonitorConfigOverrides {
    fn apply(self, config: &mut MonitorConfig) {
        if let Some(version) = self.version {
            config.version = version;
        }
        if let Some(auto_start) = self.monitor.auto_start {
            config.monitor.auto_start = auto_start;
        }
        if let Some(value) = self.render.max_value_chars {
            config.render.max_value_chars = value;
        }
        if let Some(value) = self.render.max_array_items {
            config.render.max_array_items = value;
        }
        if let Some(value) = self.render.max_depth {
            config.render.max_depth = value;
        }
        if let Some(level) = self.logging.level {
            config.logging.level = level;
        }
        if let Some(format) = self.logging.format {
            config.logging.format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn defaults_when_no_sources() -> Result<(), Box<dyn Error>> {
        let config = load_monitor_config_from_sources(None, None, &MonitorEnv::default())?;
        assert_eq!(config.as_ref(), &MonitorConfig::default());
        Ok(())
    }

    #[test]
    fn precedence_env_over_overrides_over_file() -> Result<(), Box<dyn Error>> {
        let file = r#"{"render":{"maxDepth":3,"maxArrayItems":7,"maxValueChars":40}}"#;
        let overrides = r#"{"render":{"maxDepth":4,"maxArrayItems":8}}"#;
        let env = MonitorEnv {
            max_depth: Some(6),
            ..MonitorEnv::default()
        };

        let config = load_monitor_config_from_sources(Some(file), Some(overrides), &env)?;
        assert_eq!(config.render.max_depth, 6);
        assert_eq!(config.render.max_array_items, 8);
        assert_eq!(config.render.max_value_chars, 40);
        Ok(())
    }

    #[test]
    fn overrides_reject_unknown_fields() {
        let error = load_monitor_config_from_sources(
            None,
            Some(r#"{"render":{"depth":1}}"#),
            &MonitorEnv::default(),
        )
        .err();
        assert_eq!(
            error
                .as_ref()
                .and_then(|error| error.metadata.get("source"))
                .map(String::as_str),
            Some("overrides")
        );
    }

    #[test]
    fn detects_formats_by_extension() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_config_format(Path::new("tundra"))?, ConfigFormat::Json);
        assert_eq!(detect_config_format(Path::new("a.JSON"))?, ConfigFormat::Json);
        assert_eq!(detect_config_format(Path::new("a.toml"))?, ConfigFormat::Toml);

        let error = detect_config_format(Path::new("a.yaml")).err();
        assert_eq!(
            error.as_ref().map(|error| error.code.code()),
            Some("unsupported_format")
        );
        Ok(())
    }

    #[test]
    fn pretty_outputs_end_with_newline() -> Result<(), Box<dyn Error>> {
        let config = MonitorConfig::default();
        let json = to_pretty_json(&config)?;
        let toml_text = to_pretty_toml(&config)?;
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\"autoStart\": false"));
        assert!(toml_text.ends_with('\n'));
        assert!(toml_text.contains("maxValueChars = 255"));
        Ok(())
    }
}
