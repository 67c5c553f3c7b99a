//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use tundra_facade::facade_crate_version;

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let name = env!("CARGO_BIN_NAME");
    let version = env!("CARGO_PKG_VERSION");
    let facade_version = facade_crate_version();

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "build": {
                "name": name,
                "version": version,
                "facadeVersion": facade_version,
            }
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format!("status: ok\nname: {name}\nversion: {version}\nfacade: {facade_version}\n")
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}
