//! Rendering pipeline: symbol formatting, page assembly and HTML post-processing.
//!
//! Rendering is split into three stages that share one error type. The
//! [`Formatter`] turns symbols into markup through a [`TemplateRenderer`] and a
//! [`DocstringFormatter`]; [`post_process`] then walks the assembled page to
//! number headings, assign ids and repair empty local links.

mod docstring;
mod formatter;
mod post_process;
mod templates;

use thiserror::Error;

use crate::application::{
    diagnostics::{DiagnosticCode, DiagnosticError},
    store::StoreError,
};

pub use docstring::{DocstringError, DocstringFormatter, LinkScope, MarkdownDocstrings, ResolvedLink};
pub use formatter::{Formatter, FormatterConfig, RenderContext, RenderedPage, SYMBOL_ORDER};
pub use post_process::{
    PostProcessOptions, PostProcessed, ProcessedImage, post_process, validate_images,
};
pub use templates::{AskamaTemplates, TemplateRenderer};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{name}` is not available")]
    MissingTemplate { name: String },
    #[error("template `{name}` failed to render: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: askama::Error,
    },
    #[error("document processing failed: {message}")]
    Document { message: String },
    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RenderError {
    pub fn code(&self) -> Option<DiagnosticCode> {
        match self {
            RenderError::MissingTemplate { .. } => Some(DiagnosticCode::MISSING_TEMPLATE),
            RenderError::Diagnostic(err) => Some(err.code),
            RenderError::Store(err) => err.code(),
            RenderError::Template { .. } | RenderError::Document { .. } => None,
        }
    }
}

/// Escape text for inclusion in element content or a quoted attribute.
pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }
}
