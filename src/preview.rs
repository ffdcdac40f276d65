//! Boundary to the external diagram renderer.
//!
//! Rendering itself happens elsewhere; this module only describes what is
//! asked of the renderer and what the display shows afterwards.

use crate::config::ThemeOptions;

/// A renderer rejection, carried as the human-readable message it gave.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns diagram text into SVG markup.
pub trait Renderer {
    fn render(&self, text: &str, theme: &ThemeOptions) -> Result<String, RenderError>;

    /// Syntax check without drawing. Renderers that cannot separate the two
    /// accept everything here and report problems from `render`.
    fn validate(&self, _text: &str) -> Result<(), RenderError> {
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, text: &str, theme: &ThemeOptions) -> Result<String, RenderError> {
        (**self).render(text, theme)
    }

    fn validate(&self, text: &str) -> Result<(), RenderError> {
        (**self).validate(text)
    }
}

/// One render to perform, tagged with the generation it was requested at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub generation: u64,
    pub text: String,
    pub theme: ThemeOptions,
}

impl RenderRequest {
    /// Validate, then render. The caller hands the result back together
    /// with `self.generation`.
    pub fn run<R: Renderer + ?Sized>(&self, renderer: &R) -> Result<String, RenderError> {
        renderer.validate(&self.text)?;
        renderer.render(&self.text, &self.theme)
    }
}

/// What the preview pane shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Preview {
    /// Nothing rendered yet.
    #[default]
    Loading,
    /// The text is blank.
    Empty,
    Svg(String),
    /// Inline placeholder carrying the renderer's message.
    Error(String),
}
