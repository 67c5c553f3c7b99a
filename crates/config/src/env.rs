//! Environment variable overrides.
//!
//! Parsing is strict: a variable that is present but empty or malformed is an
//! error rather than silently ignored.

use crate::schema::{LOG_LEVELS, LogFormat, MonitorConfig, ValidatedMonitorConfig};
use std::collections::BTreeMap;
use std::fmt;
use tundra_shared::{ErrorCode, ErrorEnvelope};

/// `monitor.autoStart`
pub const ENV_MONITOR_AUTO_START: &str = "TUNDRA_MONITOR_AUTO_START";
/// `render.maxValueChars`
pub const ENV_RENDER_MAX_VALUE_CHARS: &str = "TUNDRA_RENDER_MAX_VALUE_CHARS";
/// `render.maxArrayItems`
pub const ENV_RENDER_MAX_ARRAY_ITEMS: &str = "TUNDRA_RENDER_MAX_ARRAY_ITEMS";
/// `render.maxDepth`
pub const ENV_RENDER_MAX_DEPTH: &str = "TUNDRA_RENDER_MAX_DEPTH";
/// `logging.level`
pub const ENV_LOG_LEVEL: &str = "TUNDRA_LOG_LEVEL";
/// `logging.format`
pub const ENV_LOG_FORMAT: &str = "TUNDRA_LOG_FORMAT";

const KNOWN_VARS: [&str; 6] = [
    ENV_MONITOR_AUTO_START,
    ENV_RENDER_MAX_VALUE_CHARS,
    ENV_RENDER_MAX_ARRAY_ITEMS,
    ENV_RENDER_MAX_DEPTH,
    ENV_LOG_LEVEL,
    ENV_LOG_FORMAT,
];

/// Parsed environment overrides. `None` means the variable was not set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorEnv {
    /// Override for `monitor.autoStart`.
    pub auto_start: Option<bool>,
    /// Override for `render.maxValueChars`.
    pub max_value_chars: Option<u32>,
    /// Override for `render.maxArrayItems`.
    pub max_array_items: Option<u32>,
    /// Override for `render.maxDepth`.
    pub max_depth: Option<u32>,
    /// Override for `logging.level`.
    pub log_level: Option<String>,
    /// Override for `logging.format`.
    pub log_format: Option<LogFormat>,
}

impl MonitorEnv {
    /// Parse overrides from a map of variable names to values.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            auto_start: parse_optional_bool(map, ENV_MONITOR_AUTO_START)?,
            max_value_chars: parse_optional_u32(map, ENV_RENDER_MAX_VALUE_CHARS)?,
            max_array_items: parse_optional_u32(map, ENV_RENDER_MAX_ARRAY_ITEMS)?,
            max_depth: parse_optional_u32(map, ENV_RENDER_MAX_DEPTH)?,
            log_level: parse_optional_log_level(map, ENV_LOG_LEVEL)?,
            log_format: parse_optional_log_format(map, ENV_LOG_FORMAT)?,
        })
    }

    /// Parse overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in KNOWN_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_owned(), value);
            }
        }
        Self::from_map(&map)
    }

    /// True when no variable was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Apply env overrides to `base` and validate the result.
pub fn apply_env_overrides(
    mut base: MonitorConfig,
    env: &MonitorEnv,
) -> Result<ValidatedMonitorConfig, ErrorEnvelope> {
    if let Some(auto_start) = env.auto_start {
        base.monitor.auto_start = auto_start;
    }
    if let Some(value) = env.max_value_chars {
        base.render.max_value_chars = value;
    }
    if let Some(value) = env.max_array_items {
        base.render.max_array_items = value;
    }
    if let Some(value) = env.max_depth {
        base.render.max_depth = value;
    }
    if let Some(level) = &env.log_level {
        base.logging.level.clone_from(level);
    }
    if let Some(format) = env.log_format {
        base.logging.format = format;
    }

    base.validate_and_normalize().map_err(ErrorEnvelope::from)
}

/// Env parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// The variable is set but empty.
    EmptyValue {
        /// Variable name.
        var: &'static str,
    },
    /// The variable is not a boolean.
    InvalidBool {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// The variable is not an unsigned integer.
    InvalidInt {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// The variable is not one of the accepted names.
    InvalidEnum {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", value),
        }
    }
}

fn non_empty<'a>(
    map: &'a BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<(&'a str, &'a String)>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some((trimmed, raw)))
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some((trimmed, raw)) = non_empty(map, var)? else {
        return Ok(None);
    };

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some((trimmed, raw)) = non_empty(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_log_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    let Some((trimmed, raw)) = non_empty(map, var)? else {
        return Ok(None);
    };

    let level = trimmed.to_ascii_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) {
        Ok(Some(level))
    } else {
        Err(EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
    }
}

fn parse_optional_log_format(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogFormat>, EnvParseError> {
    let Some((trimmed, raw)) = non_empty(map, var)? else {
        return Ok(None);
    };

    LogFormat::parse(trimmed)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
}
