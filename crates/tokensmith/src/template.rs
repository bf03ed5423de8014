//! Handlebars rendering shared by template mappers and HTTP data sources
//!
//! Templates render in strict mode with HTML escaping disabled: a reference
//! to a missing variable is an error rather than an empty string.

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use serde::Serialize;

/// Template compilation or rendering failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("template '{name}': {message}")]
pub struct TemplateError {
    /// Template name
    pub name: String,
    /// Failure description
    pub message: String,
}

/// A set of named, precompiled templates
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Engine with the `json` helper registered
    #[must_use]
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("json", Box::new(json_helper));
        Self { handlebars }
    }

    /// Compile and register a template
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the source does not parse.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.handlebars
            .register_template_string(name, source)
            .map_err(|e| TemplateError {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Render a registered template against `data`
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when rendering fails, including references
    /// to missing variables.
    pub fn render(&self, name: &str, data: &impl Serialize) -> Result<String, TemplateError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| TemplateError {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Whether a template with this name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }
}

/// `{{json value}}` writes the JSON encoding of any value
fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h.param(0).ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other(
            "json requires one parameter".to_string(),
        ))
    })?;

    let encoded = serde_json::to_string(param.value())
        .map_err(|e| RenderError::from(RenderErrorReason::Other(e.to_string())))?;
    out.write(&encoded)?;
    Ok(())
}
