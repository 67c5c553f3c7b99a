//! Demo command handler.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, log_info};
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tundra_domain::{format_timestamp, format_xml_duration};
use tundra_facade::{
    DemoOptions, DemoOutcome, ErrorEnvelope, InvocationReport, UsageReport, init_tracing,
    init_usage_monitor, load_monitor_config_std_env, run_demo,
};

/// Flags for the demo command.
#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Optional config file path (JSON/TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Worker threads.
    #[arg(long, default_value_t = 2)]
    pub threads: usize,
    /// Nested services per worker.
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
    /// Milliseconds to keep every worker in flight before taking the report.
    #[arg(long, default_value_t = 50)]
    pub hold_ms: u64,
    /// Make the innermost service fail.
    #[arg(long)]
    pub fail: bool,
}

impl DemoArgs {
    const fn options(&self) -> DemoOptions {
        DemoOptions {
            threads: self.threads,
            depth: self.depth,
            hold: Duration::from_millis(self.hold_ms),
            fail: self.fail,
        }
    }
}

/// Run nested synthetic services and print the report captured mid-flight.
pub fn run_demo_command(mode: OutputMode, args: &DemoArgs) -> Result<CliOutput, CliError> {
    let outcome = match run_with_config(mode, args) {
        Ok(outcome) => outcome,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "demo completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "summary": {
                "succeeded": outcome.succeeded,
                "failed": outcome.failed,
                "invocationsStarted": outcome.total_invocations,
                "invocationsErrored": outcome.total_errors,
            },
            "report": outcome.report,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format_outcome_text(&outcome)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn run_with_config(mode: OutputMode, args: &DemoArgs) -> Result<DemoOutcome, ErrorEnvelope> {
    let config = load_monitor_config_std_env(args.config.as_deref(), None)?;
    if !mode.no_progress {
        init_tracing(&config.logging)?;
    }
    let monitor = init_usage_monitor(&config)?;
    run_demo(&monitor, &args.options())
}

/// Render an outcome as indented text.
pub fn format_outcome_text(outcome: &DemoOutcome) -> String {
    let mut out = String::from("status: ok\n");
    write_report_text(&mut out, &outcome.report);
    let _ = writeln!(
        out,
        "summary: succeeded={} failed={} invocations.started={} invocations.errored={}",
        outcome.succeeded, outcome.failed, outcome.total_invocations, outcome.total_errors
    );
    out
}

/// Append a usage report as indented text.
pub fn write_report_text(out: &mut String, report: &UsageReport) {
    let _ = writeln!(out, "monitoring.started: {}", report.started);
    if let Some(started_at) = report.started_at {
        let _ = writeln!(out, "monitoring.start: {}", format_timestamp(started_at));
    }
    if let Some(uptime) = report.uptime {
        let _ = writeln!(out, "monitoring.duration: {}", format_xml_duration(uptime));
    }
    let _ = writeln!(
        out,
        "monitoring.datetime: {}",
        format_timestamp(report.generated_at)
    );
    let _ = writeln!(
        out,
        "invocations: started={} errored={} current={}",
        report.total_invocations, report.total_errors, report.current_length
    );
    for invocation in &report.current {
        write_invocation_text(out, invocation);
    }
}

fn write_invocation_text(out: &mut String, invocation: &InvocationReport) {
    let _ = writeln!(
        out,
        "- thread {} (#{}) since {} for {}",
        invocation.thread_name,
        invocation.thread_id,
        format_timestamp(invocation.started_at),
        format_xml_duration(invocation.elapsed)
    );
    for (index, frame) in invocation.callstack.iter().enumerate() {
        let _ = writeln!(
            out,
            "    [{index}] {} ({}) session={} user={} pipeline.length={} duration={}",
            frame.service,
            frame.package,
            frame.session,
            frame.user,
            frame.pipeline_length,
            format_xml_duration(frame.elapsed)
        );
    }
}
