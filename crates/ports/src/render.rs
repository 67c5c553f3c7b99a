//! Display rendering of captured pipelines.

use tundra_domain::Pipeline;
use tundra_shared::Result;

/// Renders a pipeline into an HTML fragment for operator dashboards.
///
/// Rendering must be a pure function of its input: monitors cache the first
/// result and may compute it more than once under contention.
pub trait PipelineRenderer: Send + Sync {
    /// Render `pipeline` as HTML.
    fn render_html(&self, pipeline: &Pipeline) -> Result<String>;
}

impl<T: PipelineRenderer + ?Sized> PipelineRenderer for std::sync::Arc<T> {
    fn render_html(&self, pipeline: &Pipeline) -> Result<String> {
        (**self).render_html(pipeline)
    }
}
