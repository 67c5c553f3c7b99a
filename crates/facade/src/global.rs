//! The process-wide usage monitor.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;
use tundra_adapters::{HtmlPipelineRenderer, HtmlRenderOptions, ThreadLocalInvokeState};
use tundra_config::{RenderConfig, ValidatedMonitorConfig};
use tundra_monitor::UsageMonitor;
use tundra_shared::{ErrorCode, ErrorEnvelope, Result};

static MONITOR: OnceCell<Arc<UsageMonitor>> = OnceCell::new();

/// The process-wide monitor, built on first use with default settings.
///
/// The monitor starts out stopped; call [`UsageMonitor::start`] or initialize
/// it with [`init_usage_monitor`] and `monitor.autoStart`.
pub fn usage_monitor() -> Arc<UsageMonitor> {
    Arc::clone(MONITOR.get_or_init(|| {
        Arc::new(monitor_with_renderer(HtmlPipelineRenderer::default()))
    }))
}

/// Install the process-wide monitor from `config`.
///
/// Only the first initialization wins. Calling this after another
/// initialization, or after [`usage_monitor`] has already built the default
/// monitor, fails with `config:already_initialized`.
pub fn init_usage_monitor(config: &ValidatedMonitorConfig) -> Result<Arc<UsageMonitor>> {
    let monitor = Arc::new(build_usage_monitor(config)?);
    MONITOR.set(Arc::clone(&monitor)).map_err(|_| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "already_initialized"),
            "the usage monitor is already initialized",
        )
    })?;

    if config.monitor.auto_start {
        monitor.start();
    }
    info!(
        auto_start = config.monitor.auto_start,
        "usage monitor initialized"
    );
    Ok(monitor)
}

/// Build a standalone monitor from `config`. It is not started.
pub fn build_usage_monitor(config: &ValidatedMonitorConfig) -> Result<UsageMonitor> {
    let renderer = HtmlPipelineRenderer::new(render_options(&config.render)?)?;
    Ok(monitor_with_renderer(renderer))
}

/// Convert configured render limits into renderer options.
pub fn render_options(render: &RenderConfig) -> Result<HtmlRenderOptions> {
    Ok(HtmlRenderOptions {
        max_value_chars: to_usize("maxValueChars", render.max_value_chars)?,
        max_array_items: to_usize("maxArrayItems", render.max_array_items)?,
        max_depth: to_usize("maxDepth", render.max_depth)?,
    })
}

fn monitor_with_renderer(renderer: HtmlPipelineRenderer) -> UsageMonitor {
    UsageMonitor::new(Arc::new(ThreadLocalInvokeState), Arc::new(renderer))
}

fn to_usize(field: &'static str, value: u32) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ErrorEnvelope::invariant(
            ErrorCode::new("config", "invalid_limit"),
            format!("render.{field} does not fit in usize"),
        )
        .with_metadata("field", field)
    })
}
