//! Handlebars rendering of the HTML document templates.
//!
//! Template text comes from a [`TemplateSource`], so the renderer itself
//! never touches the file system. The three document templates are compiled
//! in; the binary layers a templates directory on top of them.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;
use thiserror::Error;

use crate::document::{DocumentType, PatientData};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Template não encontrado: {0}")]
    NotFound(String),
    #[error("invalid template name `{0}`")]
    InvalidName(String),
    #[error("failed to read template {name}: {reason}")]
    Read { name: String, reason: String },
    #[error("failed to render template {name}: {reason}")]
    Render { name: String, reason: String },
}

/// Lookup of template text by name. `Ok(None)` means "not here".
pub trait TemplateSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError>;
}

/// The templates shipped inside the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn text(document: DocumentType) -> &'static str {
        match document {
            DocumentType::Certificate => include_str!("../templates/certificate.html"),
            DocumentType::Prescription => include_str!("../templates/prescription.html"),
            DocumentType::Anamnesis => include_str!("../templates/anamnesis.html"),
        }
    }
}

impl TemplateSource for BuiltinTemplates {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        Ok(DocumentType::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .map(|d| BuiltinTemplates::text(d).to_string()))
    }
}

/// Sources consulted in order; the first hit wins.
pub struct LayeredTemplates {
    sources: Vec<Box<dyn TemplateSource>>,
}

impl LayeredTemplates {
    pub fn new(sources: Vec<Box<dyn TemplateSource>>) -> Self {
        LayeredTemplates { sources }
    }
}

impl TemplateSource for LayeredTemplates {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        for source in &self.sources {
            if let Some(text) = source.load(name)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

/// Template names are plain identifiers: `[A-Za-z0-9_-]+`.
pub fn validate_template_name(name: &str) -> Result<&str, TemplateError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(name)
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}

/// Escape `text` for HTML and turn newlines into `<br>`.
pub fn multiline_html(text: &str) -> String {
    html_escape::encode_text(&text.replace('\r', "")).replace('\n', "<br>")
}

fn multiline_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let text = h
        .param(0)
        .and_then(|p| p.value().as_str())
        .unwrap_or_default();
    out.write(&multiline_html(text))?;
    Ok(())
}

pub struct TemplateRenderer {
    registry: Handlebars<'static>,
    source: Box<dyn TemplateSource>,
}

impl TemplateRenderer {
    pub fn new(source: Box<dyn TemplateSource>) -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("observationsFormatted", Box::new(multiline_helper));
        registry.register_helper("reasonFormatted", Box::new(multiline_helper));
        TemplateRenderer { registry, source }
    }

    pub fn builtin() -> Self {
        TemplateRenderer::new(Box::new(BuiltinTemplates))
    }

    /// Render the named template with `data`.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let name = validate_template_name(name)?;
        let text = self
            .source
            .load(name)?
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        self.registry
            .render_template(&text, data)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// The record handed to a template: the patient data plus `currentDate`
/// (when missing) and `logoDataUrl` (when a logo resolved).
pub fn template_data(data: &PatientData, today: &str, logo_data_url: Option<&str>) -> Value {
    let mut data = data.clone();
    let has_date = data
        .get("currentDate")
        .and_then(Value::as_str)
        .is_some_and(|d| !d.trim().is_empty());
    if !has_date {
        data.insert("currentDate".to_string(), Value::String(today.to_string()));
    }
    if let Some(url) = logo_data_url {
        data.insert("logoDataUrl".to_string(), Value::String(url.to_string()));
    }
    Value::Object(data)
}
