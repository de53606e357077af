// HTML rendering: embedded minijinja templates and the markdown converter

pub mod markdown;

use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::Serialize;
use thiserror::Error;

pub use markdown::markdown_to_html;

pub const INDEX: &str = "index.html";
pub const PAGE: &str = "page.html";
pub const LOGIN: &str = "login.html";
pub const ERROR: &str = "error.html";

// Needs no application state, so error responses can be rendered from anywhere
static ERROR_PAGES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    if let Err(e) = env.add_template(ERROR, include_str!("../../templates/error.html")) {
        tracing::error!("Error page template failed to compile: {}", e);
    }
    env
});

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template {template} failed: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Renders a named template against a serializable context
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError>;
}

/// Template environment with every page template compiled in
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn embedded() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        for (name, source) in [
            ("base.html", include_str!("../../templates/base.html")),
            (INDEX, include_str!("../../templates/index.html")),
            (PAGE, include_str!("../../templates/page.html")),
            (LOGIN, include_str!("../../templates/login.html")),
        ] {
            env.add_template(name, source).map_err(|source| RenderError::Template {
                template: name.to_string(),
                source,
            })?;
        }
        Ok(Self { env })
    }

    /// Convenience wrapper for typed contexts
    pub fn render_with<C: Serialize>(&self, template: &str, context: C) -> Result<String, RenderError> {
        let template_ref = self
            .env
            .get_template(template)
            .map_err(|_| RenderError::UnknownTemplate(template.to_string()))?;
        template_ref.render(context).map_err(|source| RenderError::Template {
            template: template.to_string(),
            source,
        })
    }
}

/// Standalone HTML error page; `message` is escaped
pub fn error_page(code: u16, message: &str) -> Result<String, RenderError> {
    let template = ERROR_PAGES
        .get_template(ERROR)
        .map_err(|_| RenderError::UnknownTemplate(ERROR.to_string()))?;
    template
        .render(context! { code, message })
        .map_err(|source| RenderError::Template {
            template: ERROR.to_string(),
            source,
        })
}

impl TemplateEngine for Templates {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, RenderError> {
        self.render_with(template, context)
    }
}
