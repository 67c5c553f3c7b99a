//! Monitor configuration schema and validation.
//!
//! The raw [`MonitorConfig`] mirrors the on-disk shape. Validation checks the
//! schema version and numeric bounds, normalizes the log level, and wraps the
//! result in [`ValidatedMonitorConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tundra_shared::{ErrorCode, ErrorEnvelope};

/// Current config schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const DEFAULT_MAX_VALUE_CHARS: u32 = 255;
const DEFAULT_MAX_ARRAY_ITEMS: u32 = 10;
const DEFAULT_MAX_DEPTH: u32 = 5;

const MAX_VALUE_CHARS_RANGE: (u32, u32) = (1, 65_536);
const MAX_ARRAY_ITEMS_RANGE: (u32, u32) = (1, 10_000);
const MAX_DEPTH_RANGE: (u32, u32) = (1, 64);

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MonitorConfig {
    /// Schema version.
    pub version: u32,
    /// Monitor lifecycle settings.
    pub monitor: MonitorSection,
    /// Pipeline rendering limits.
    pub render: RenderConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            monitor: MonitorSection::default(),
            render: RenderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Monitor lifecycle settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MonitorSection {
    /// Start the process-wide monitor as soon as it is initialized.
    pub auto_start: bool,
}

/// Limits for rendering pipelines into report HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RenderConfig {
    /// Characters shown per scalar value.
    pub max_value_chars: u32,
    /// Items shown per list.
    pub max_array_items: u32,
    /// Nested document depth.
    pub max_depth: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_value_chars: DEFAULT_MAX_VALUE_CHARS,
            max_array_items: DEFAULT_MAX_ARRAY_ITEMS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        validate_limit_u32("render", "maxValueChars", self.max_value_chars, MAX_VALUE_CHARS_RANGE)?;
        validate_limit_u32("render", "maxArrayItems", self.max_array_items, MAX_ARRAY_ITEMS_RANGE)?;
        validate_limit_u32("render", "maxDepth", self.max_depth, MAX_DEPTH_RANGE)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse a format name, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Default level filter.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        let level = self.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigSchemaError::InvalidLogLevel {
                value: self.level.clone(),
            });
        }
        self.level = level;
        Ok(())
    }
}

impl MonitorConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedMonitorConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.render.validate()?;
        self.logging.normalize_and_validate()?;
        Ok(ValidatedMonitorConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Config that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedMonitorConfig {
    raw: MonitorConfig,
}

impl ValidatedMonitorConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &MonitorConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> MonitorConfig {
        self.raw
    }
}

impl AsRef<MonitorConfig> for ValidatedMonitorConfig {
    fn as_ref(&self) -> &MonitorConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedMonitorConfig {
    type Target = MonitorConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Schema validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `render`).
        section: &'static str,
        /// Field name in the config file (e.g. `maxDepth`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// `logging.level` is not a known level.
    InvalidLogLevel {
        /// Value provided.
        value: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidLogLevel { .. } => ErrorCode::new("config", "invalid_log_level"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version {found} (supported: {supported})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be between {min} and {max} (got {value})"
            ),
            Self::InvalidLogLevel { value } => write!(
                formatter,
                "logging.level must be one of {} (got {value:?})",
                LOG_LEVELS.join("|")
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::InvalidLogLevel { value } => {
                envelope.with_metadata("value", value)
            },
        }
    }
}

fn validate_limit_u32(
    section: &'static str,
    field: &'static str,
    value: u32,
    (min, max): (u32, u32),
) -> Result<(), ConfigSchemaError> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value: u64::from(value),
        min: u64::from(min),
        max: u64::from(max),
    })
}

/// Parse a monitor config from a JSON string, applying validation and normalization.
pub fn parse_monitor_config_json(input: &str) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    let config: MonitorConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a monitor config from a TOML string, applying validation and normalization.
pub fn parse_monitor_config_toml(input: &str) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    let config: MonitorConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() -> Result<(), ConfigSchemaError> {
        let config = MonitorConfig::default().validate_and_normalize()?;
        assert!(!config.monitor.auto_start);
        assert_eq!(config.render.max_value_chars, 255);
        assert_eq!(config.render.max_array_items, 10);
        assert_eq!(config.render.max_depth, 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        Ok(())
    }

    #[test]
    fn rejects_unknown_version() {
        let config = MonitorConfig {
            version: 2,
            ..MonitorConfig::default()
        };
        assert_eq!(
            config.validate_and_normalize().err(),
            Some(ConfigSchemaError::UnsupportedVersion {
                found: 2,
                supported: CURRENT_CONFIG_VERSION,
            })
        );
    }

    #[test]
    fn rejects_zero_depth() {
        let mut config = MonitorConfig::default();
        config.render.max_depth = 0;
        let error = config.validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::LimitOutOfRange {
                field: "maxDepth",
                value: 0,
                ..
            })
        ));
    }

    #[test]
    fn normalizes_log_level_case() -> Result<(), ConfigSchemaError> {
        let mut config = MonitorConfig::default();
        config.logging.level = " WARN ".to_owned();
        let validated = config.validate_and_normalize()?;
        assert_eq!(validated.logging.level, "warn");
        Ok(())
    }

    #[test]
    fn unknown_log_level_maps_to_envelope() {
        let mut config = MonitorConfig::default();
        config.logging.level = "loud".to_owned();
        let envelope = config
            .validate_and_normalize()
            .err()
            .map(ErrorEnvelope::from);
        assert_eq!(
            envelope.as_ref().map(|error| error.code.code()),
            Some("invalid_log_level")
        );
    }

    #[test]
    fn json_keys_are_camel_case() -> Result<(), Box<dyn std::error::Error>> {
        let config = parse_monitor_config_json(
            r#"{"version":1,"monitor":{"autoStart":true},"render":{"maxArrayItems":3}}"#,
        )?;
        assert!(config.monitor.auto_start);
        assert_eq!(config.render.max_array_items, 3);
        assert_eq!(config.render.max_depth, 5);
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_monitor_config_json(r#"{"monitor":{"autostart":true}}"#).err();
        assert_eq!(
            error.as_ref().map(|error| error.code.code()),
            Some("invalid_json")
        );
    }
}
