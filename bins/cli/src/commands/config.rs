//! Config command handlers.

use crate::error::{CliError, ExitCode};
use crate::format::{ConfigFileFormat, OutputMode};
use crate::{CliOutput, format_error_output, log_info};
use std::path::Path;
use tundra_facade::{load_monitor_config_std_env, to_pretty_json, to_pretty_toml};

/// Show the effective config after applying the file, overrides, and env.
pub fn run_config_show(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
    file_format: ConfigFileFormat,
) -> Result<CliOutput, CliError> {
    let config = match load_monitor_config_std_env(path, overrides_json) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": serde_json::to_value(config.as_ref())?,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let rendered = match file_format {
            ConfigFileFormat::Json => to_pretty_json(&config),
            ConfigFileFormat::Toml => to_pretty_toml(&config),
        };
        match rendered {
            Ok(text) => format!("status: ok\nconfig:\n{text}"),
            Err(error) => return Ok(format_error_output(mode, &error)),
        }
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Validate config loading and overrides without printing the result.
pub fn run_config_validate(
    mode: OutputMode,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    if let Err(error) = load_monitor_config_std_env(path, overrides_json) {
        return Ok(format_error_output(mode, &error));
    }

    let mut stderr = String::new();
    log_info(&mut stderr, "config validate completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}
