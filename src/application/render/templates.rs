use tracing::trace;

use crate::{application::render::RenderError, presentation::views::View};

/// Turns a view into markup. The formatter only talks to this seam, so a
/// theme can supply its own implementation for some or all templates.
pub trait TemplateRenderer {
    fn render(&self, view: &View) -> Result<String, RenderError>;
}

/// Built-in templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskamaTemplates;

impl TemplateRenderer for AskamaTemplates {
    fn render(&self, view: &View) -> Result<String, RenderError> {
        let name = view.name();
        trace!(template = name, "rendering template");
        view.render()
            .map_err(|source| RenderError::Template { name, source })
    }
}
