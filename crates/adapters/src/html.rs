//! Bounded HTML rendering of pipelines.
//!
//! Documents render as two-column tables (nested documents as nested tables),
//! lists as ordered lists. Long strings, long lists, and deep nesting are cut
//! off and marked with an ellipsis so a single huge input cannot blow up a
//! report.

use serde_json::{Map, Value};
use std::fmt::Write as _;
use thiserror::Error;
use tundra_domain::Pipeline;
use tundra_ports::PipelineRenderer;
use tundra_shared::{ErrorCode, ErrorEnvelope, Result};

const ELLIPSIS: &str = "\u{2026}";

/// Limits applied while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlRenderOptions {
    /// Maximum characters shown per scalar value.
    pub max_value_chars: usize,
    /// Maximum items shown per list.
    pub max_array_items: usize,
    /// Maximum document nesting depth; the pipeline itself is depth 1.
    pub max_depth: usize,
}

impl Default for HtmlRenderOptions {
    fn default() -> Self {
        Self {
            max_value_chars: 255,
            max_array_items: 10,
            max_depth: 5,
        }
    }
}

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A limit was zero.
    #[error("render limit `{name}` must be at least 1")]
    InvalidLimit {
        /// Name of the offending limit.
        name: &'static str,
    },
    /// Writing to the output buffer failed.
    #[error("failed to write html: {0}")]
    Format(#[from] std::fmt::Error),
}

impl From<RenderError> for ErrorEnvelope {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::InvalidLimit { name } => Self::expected(
                ErrorCode::new("render", "invalid_limit"),
                format!("render limit `{name}` must be at least 1"),
            )
            .with_metadata("limit", name),
            RenderError::Format(error) => Self::invariant(
                ErrorCode::new("render", "format"),
                format!("failed to write html: {error}"),
            ),
        }
    }
}

/// [`PipelineRenderer`] producing bounded, escaped HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtmlPipelineRenderer {
    options: HtmlRenderOptions,
}

impl HtmlPipelineRenderer {
    /// Build a renderer, rejecting zero limits.
    pub fn new(options: HtmlRenderOptions) -> std::result::Result<Self, RenderError> {
        if options.max_value_chars == 0 {
            return Err(RenderError::InvalidLimit {
                name: "max_value_chars",
            });
        }
        if options.max_array_items == 0 {
            return Err(RenderError::InvalidLimit {
                name: "max_array_items",
            });
        }
        if options.max_depth == 0 {
            return Err(RenderError::InvalidLimit { name: "max_depth" });
        }
        Ok(Self { options })
    }

    /// Limits in effect.
    #[must_use]
    pub const fn options(&self) -> HtmlRenderOptions {
        self.options
    }

    /// Render a pipeline to HTML.
    pub fn render(&self, pipeline: &Pipeline) -> std::result::Result<String, RenderError> {
        let mut out = String::new();
        self.write_document(&mut out, pipeline.as_map(), 1)?;
        Ok(out)
    }

    fn write_document(
        &self,
        out: &mut String,
        document: &Map<String, Value>,
        depth: usize,
    ) -> std::result::Result<(), RenderError> {
        if document.is_empty() {
            out.push_str("<table></table>");
            return Ok(());
        }
        out.push_str("<table><tbody>");
        for (key, value) in document {
            out.push_str("<tr><th>");
            push_escaped(out, key);
            out.push_str("</th><td>");
            self.write_value(out, value, depth)?;
            out.push_str("</td></tr>");
        }
        out.push_str("</tbody></table>");
        Ok(())
    }

    fn write_value(
        &self,
        out: &mut String,
        value: &Value,
        depth: usize,
    ) -> std::result::Result<(), RenderError> {
        match value {
            Value::Null => out.push_str("<i>null</i>"),
            Value::Bool(flag) => write!(out, "{flag}")?,
            Value::Number(number) => write!(out, "{number}")?,
            Value::String(text) => self.write_text(out, text),
            Value::Object(document) if depth >= self.options.max_depth => {
                write!(out, "<i>{ELLIPSIS} {} keys</i>", document.len())?;
            },
            Value::Object(document) => self.write_document(out, document, depth + 1)?,
            Value::Array(items) => self.write_list(out, items, depth)?,
        }
        Ok(())
    }

    fn write_list(
        &self,
        out: &mut String,
        items: &[Value],
        depth: usize,
    ) -> std::result::Result<(), RenderError> {
        if items.is_empty() {
            out.push_str("<ol></ol>");
            return Ok(());
        }
        out.push_str("<ol>");
        for item in items.iter().take(self.options.max_array_items) {
            out.push_str("<li>");
            self.write_value(out, item, depth)?;
            out.push_str("</li>");
        }
        let omitted = items.len().saturating_sub(self.options.max_array_items);
        if omitted > 0 {
            write!(out, "<li><i>{ELLIPSIS} {omitted} more</i></li>")?;
        }
        out.push_str("</ol>");
        Ok(())
    }

    fn write_text(&self, out: &mut String, text: &str) {
        match text.char_indices().nth(self.options.max_value_chars) {
            Some((cut, _)) => {
                push_escaped(out, text.get(..cut).unwrap_or_default());
                out.push_str(ELLIPSIS);
            },
            None => push_escaped(out, text),
        }
    }
}

impl PipelineRenderer for HtmlPipelineRenderer {
    fn render_html(&self, pipeline: &Pipeline) -> Result<String> {
        Ok(self.render(pipeline)?)
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer(
        max_value_chars: usize,
        max_array_items: usize,
        max_depth: usize,
    ) -> std::result::Result<HtmlPipelineRenderer, RenderError> {
        HtmlPipelineRenderer::new(HtmlRenderOptions {
            max_value_chars,
            max_array_items,
            max_depth,
        })
    }

    #[test]
    fn renders_flat_document_as_table() -> std::result::Result<(), RenderError> {
        let html = HtmlPipelineRenderer::default().render(&Pipeline::new().with("x", 1))?;
        assert_eq!(html, "<table><tbody><tr><th>x</th><td>1</td></tr></tbody></table>");
        Ok(())
    }

    #[test]
    fn escapes_keys_and_values() -> std::result::Result<(), RenderError> {
        let pipeline = Pipeline::new().with("<k>", "a & \"b\"");
        let html = HtmlPipelineRenderer::default().render(&pipeline)?;
        assert!(html.contains("<th>&lt;k&gt;</th>"));
        assert!(html.contains("<td>a &amp; &quot;b&quot;</td>"));
        Ok(())
    }

    #[test]
    fn truncates_long_values_on_char_boundaries() -> std::result::Result<(), RenderError> {
        let html = renderer(3, 10, 5)?.render(&Pipeline::new().with("s", "héllo"))?;
        assert!(html.contains("<td>hél\u{2026}</td>"));
        Ok(())
    }

    #[test]
    fn limits_list_items() -> std::result::Result<(), RenderError> {
        let html = renderer(255, 2, 5)?.render(&Pipeline::new().with("l", json!([1, 2, 3, 4])))?;
        assert!(html.contains("<ol><li>1</li><li>2</li><li><i>\u{2026} 2 more</i></li></ol>"));
        Ok(())
    }

    #[test]
    fn collapses_documents_beyond_max_depth() -> std::result::Result<(), RenderError> {
        let pipeline = Pipeline::new().with("a", json!({"b": {"c": 1}}));
        let html = renderer(255, 10, 2)?.render(&pipeline)?;
        assert!(html.contains("<th>b</th><td><i>\u{2026} 1 keys</i></td>"));
        assert!(!html.contains("<th>c</th>"));
        Ok(())
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(matches!(
            renderer(255, 0, 5),
            Err(RenderError::InvalidLimit {
                name: "max_array_items"
            })
        ));
        let envelope: ErrorEnvelope = RenderError::InvalidLimit { name: "max_depth" }.into();
        assert_eq!(envelope.code.code(), "invalid_limit");
    }
}
