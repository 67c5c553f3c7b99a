//! Point-in-time capture of one in-flight service call.

use crate::report::FrameReport;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use tundra_domain::{InvokeState, Pipeline, ServiceDescriptor, elapsed_between};
use tundra_ports::{PipelineRenderer, SnapshotCodable};

/// One service call as it looked when it started.
///
/// The pipeline is copied at construction, so later in-place mutation by the
/// running service never shows up in reports. The HTML view is rendered on
/// first read and cached; concurrent first readers may both render, and
/// whichever result lands first is kept.
pub struct Frame {
    service: ServiceDescriptor,
    pipeline: Pipeline,
    pipeline_length: usize,
    started_at: DateTime<Utc>,
    state: InvokeState,
    renderer: Arc<dyn PipelineRenderer>,
    html: OnceCell<Option<String>>,
}

impl Frame {
    /// Capture a call starting now.
    #[must_use]
    pub fn capture(
        service: &ServiceDescriptor,
        pipeline: &Pipeline,
        state: InvokeState,
        renderer: Arc<dyn PipelineRenderer>,
    ) -> Self {
        Self::capture_at(service, pipeline, state, renderer, Utc::now())
    }

    /// Capture a call that started at `started_at`.
    #[must_use]
    pub fn capture_at(
        service: &ServiceDescriptor,
        pipeline: &Pipeline,
        state: InvokeState,
        renderer: Arc<dyn PipelineRenderer>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let pipeline = pipeline.clone();
        Self {
            service: service.clone(),
            pipeline_length: pipeline.len(),
            pipeline,
            started_at,
            state,
            renderer,
            html: OnceCell::new(),
        }
    }

    /// Service being executed.
    #[must_use]
    pub const fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Input as captured at call start.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Top-level entry count of the captured input.
    #[must_use]
    pub const fn pipeline_length(&self) -> usize {
        self.pipeline_length
    }

    /// When the call started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Session and user the call runs under.
    #[must_use]
    pub const fn state(&self) -> &InvokeState {
        &self.state
    }

    /// HTML view of the captured input; `None` when rendering failed.
    pub fn html(&self) -> Option<&str> {
        if self.html.get().is_none() {
            let rendered = match self.renderer.render_html(&self.pipeline) {
                Ok(html) => Some(html),
                Err(error) => {
                    debug!(service = %self.service.name, %error, "pipeline rendering failed");
                    None
                },
            };
            // A concurrent reader may have stored first; both results are equal.
            let _ = self.html.set(rendered);
        }
        self.html.get().and_then(Option::as_deref)
    }

    /// Report this frame relative to `now`.
    pub fn report_at(&self, now: DateTime<Utc>) -> FrameReport {
        FrameReport {
            service: self.service.name.clone(),
            package: self.service.package.clone(),
            pipeline: self.pipeline.clone(),
            pipeline_length: self.pipeline_length,
            pipeline_html: self.html().map(str::to_owned),
            started_at: self.started_at,
            elapsed: elapsed_between(self.started_at, now),
            session: self.state.session.clone(),
            user: self.state.user.clone(),
        }
    }
}

impl SnapshotCodable for Frame {
    type Snapshot = FrameReport;
    const KIND: &'static str = "frame";

    fn snapshot(&self) -> FrameReport {
        self.report_at(Utc::now())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Frame")
            .field("service", &self.service.name)
            .field("pipeline_length", &self.pipeline_length)
            .field("started_at", &self.started_at)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
