//! The `/generate-pdf` request model.
//!
//! [`GenerateBody`] mirrors the JSON body as sent by the dashboard.
//! [`DocumentRequest::from_body`] validates it into an immutable request so
//! that every client error surfaces before any file is read or any browser
//! is launched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{LayoutError, PartialLayoutTable};
use crate::page::{PageOptions, PageOptionsInput};

/// Free-form patient/clinic record sent along with a template name.
pub type PatientData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("Envie `html` ou `template` + `data` no body.")]
    MissingSource,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("`data` must be a JSON object")]
    DataNotObject,
    #[error("invalid page options: {0}")]
    PageOptions(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Certificate,
    Prescription,
    Anamnesis,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::Certificate,
        DocumentType::Prescription,
        DocumentType::Anamnesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Certificate => "certificate",
            DocumentType::Prescription => "prescription",
            DocumentType::Anamnesis => "anamnesis",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RequestError::UnknownTemplate(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Headless-browser render of an HTML template, optionally merged over a
    /// background PDF.
    #[default]
    OverlayHtml,
    /// Text drawn straight onto a copy of the background PDF.
    BackgroundText,
}

/// Whether the overlay-html path composites a background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundPolicy {
    /// Merge when a background file exists.
    #[default]
    Auto,
    #[serde(rename = "none")]
    Skip,
    /// Merge, and fail the request when no background exists.
    Force,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSpec {
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// The raw JSON body of `POST /generate-pdf`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub template: Option<String>,
    pub data: Option<serde_json::Value>,
    pub html: Option<String>,
    pub options: Option<PageOptionsInput>,
    pub layout_mode: Option<RenderMode>,
    pub background_mode: Option<RenderMode>,
    pub coords: Option<serde_json::Value>,
    pub logo: Option<LogoSpec>,
    pub debug_grid: Option<bool>,
    pub filename: Option<String>,
    pub background: Option<BackgroundPolicy>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    Template {
        document_type: DocumentType,
        patient_data: PatientData,
    },
    Html(String),
}

impl DocumentSource {
    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            DocumentSource::Template { document_type, .. } => Some(*document_type),
            DocumentSource::Html(_) => None,
        }
    }
}

/// A validated generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    pub source: DocumentSource,
    pub render_mode: RenderMode,
    pub page: PageOptions,
    pub coordinate_overrides: PartialLayoutTable,
    pub logo: Option<LogoSpec>,
    pub debug_grid: bool,
    pub filename: String,
    pub background: BackgroundPolicy,
}

impl DocumentRequest {
    /// Parse and validate a JSON body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, RequestError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(RequestError::MissingSource);
        }
        let body: GenerateBody =
            serde_json::from_slice(bytes).map_err(|e| RequestError::InvalidBody(e.to_string()))?;
        Self::from_body(body)
    }

    pub fn from_body(body: GenerateBody) -> Result<Self, RequestError> {
        let template = body.template.filter(|t| !t.trim().is_empty());
        let html = body.html.filter(|h| !h.trim().is_empty());

        let source = match (template, body.data) {
            (Some(name), Some(data)) => {
                let document_type: DocumentType = name.parse()?;
                let patient_data = match data {
                    serde_json::Value::Object(map) => map,
                    _ => return Err(RequestError::DataNotObject),
                };
                DocumentSource::Template {
                    document_type,
                    patient_data,
                }
            }
            _ => match html {
                Some(html) => DocumentSource::Html(html),
                None => return Err(RequestError::MissingSource),
            },
        };

        let page = PageOptions::from_input(body.options.as_ref()).map_err(RequestError::PageOptions)?;

        let coordinate_overrides = match body.coords {
            Some(serde_json::Value::Null) | None => PartialLayoutTable::default(),
            Some(value) => PartialLayoutTable::from_request(&value)?,
        };

        let render_mode = body
            .layout_mode
            .or(body.background_mode)
            .unwrap_or_default();

        let filename = resolve_filename(body.filename.as_deref(), source.document_type());

        Ok(DocumentRequest {
            source,
            render_mode,
            page,
            coordinate_overrides,
            logo: body.logo,
            debug_grid: body.debug_grid.unwrap_or(false),
            filename,
            background: body.background.unwrap_or_default(),
        })
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        self.source.document_type()
    }
}

/// Reduce a caller-supplied filename to a safe basename ending in `.pdf`.
pub fn resolve_filename(requested: Option<&str>, document: Option<DocumentType>) -> String {
    let cleaned = requested
        .map(|name| {
            let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
            base.chars()
                .filter(|c| !c.is_control() && !matches!(c, '"' | ';'))
                .collect::<String>()
                .trim()
                .trim_start_matches('.')
                .to_string()
        })
        .filter(|name| !name.is_empty());

    let name = cleaned.unwrap_or_else(|| match document {
        Some(doc) => doc.as_str().to_string(),
        None => "document".to_string(),
    });

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PartialPosition;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<DocumentRequest, RequestError> {
        DocumentRequest::from_json(value.to_string().as_bytes())
    }

    #[test]
    fn test_empty_object_is_missing_source() {
        let err = parse(json!({})).unwrap_err();
        assert_eq!(err, RequestError::MissingSource);
        assert!(err.to_string().contains("`html`"));
        assert!(err.to_string().contains("`template` + `data`"));
    }

    #[test]
    fn test_empty_body_is_missing_source() {
        assert_eq!(
            DocumentRequest::from_json(b"  ").unwrap_err(),
            RequestError::MissingSource
        );
    }

    #[test]
    fn test_template_without_data_is_missing_source() {
        let err = parse(json!({ "template": "certificate" })).unwrap_err();
        assert_eq!(err, RequestError::MissingSource);
    }

    #[test]
    fn test_template_without_data_uses_html() {
        let req = parse(json!({ "template": "certificate", "html": "<p>x</p>" })).unwrap();
        assert_eq!(req.source, DocumentSource::Html("<p>x</p>".to_string()));
    }

    #[test]
    fn test_template_request_defaults() {
        let req = parse(json!({
            "template": "prescription",
            "data": { "patientName": "J" }
        }))
        .unwrap();
        assert_eq!(req.document_type(), Some(DocumentType::Prescription));
        assert_eq!(req.render_mode, RenderMode::OverlayHtml);
        assert_eq!(req.background, BackgroundPolicy::Auto);
        assert_eq!(req.filename, "prescription.pdf");
        assert!(!req.debug_grid);
        assert!(req.coordinate_overrides.is_empty());
    }

    #[test]
    fn test_unknown_template() {
        let err = parse(json!({ "template": "invoice", "data": {} })).unwrap_err();
        assert_eq!(err, RequestError::UnknownTemplate("invoice".to_string()));
    }

    #[test]
    fn test_data_must_be_object() {
        let err = parse(json!({ "template": "certificate", "data": [1, 2] })).unwrap_err();
        assert_eq!(err, RequestError::DataNotObject);
    }

    #[test]
    fn test_layout_mode_aliases() {
        let req = parse(json!({
            "template": "certificate",
            "data": {},
            "backgroundMode": "background-text"
        }))
        .unwrap();
        assert_eq!(req.render_mode, RenderMode::BackgroundText);

        let req = parse(json!({
            "template": "certificate",
            "data": {},
            "layoutMode": "overlay-html",
            "backgroundMode": "background-text"
        }))
        .unwrap();
        assert_eq!(req.render_mode, RenderMode::OverlayHtml);
    }

    #[test]
    fn test_invalid_layout_mode_is_client_error() {
        let err = parse(json!({ "html": "<p/>", "layoutMode": "sideways" })).unwrap_err();
        assert!(matches!(err, RequestError::InvalidBody(_)));
    }

    #[test]
    fn test_background_policy_none() {
        let req = parse(json!({ "html": "<p/>", "background": "none" })).unwrap();
        assert_eq!(req.background, BackgroundPolicy::Skip);
    }

    #[test]
    fn test_coords_are_parsed() {
        let req = parse(json!({
            "template": "certificate",
            "data": {},
            "coords": { "certificate": { "doctorName": { "x": 0.28, "y": 0.80 } } }
        }))
        .unwrap();
        assert_eq!(
            req.coordinate_overrides
                .get(DocumentType::Certificate, "doctorName"),
            Some(&PartialPosition::at(0.28, 0.80))
        );
    }

    #[test]
    fn test_malformed_coords_are_rejected() {
        let err = parse(json!({
            "template": "certificate",
            "data": {},
            "coords": { "certificate": { "doctorName": { "x": "left" } } }
        }))
        .unwrap_err();
        assert!(matches!(err, RequestError::Layout(_)));
    }

    #[test]
    fn test_resolve_filename() {
        assert_eq!(resolve_filename(None, None), "document.pdf");
        assert_eq!(
            resolve_filename(None, Some(DocumentType::Anamnesis)),
            "anamnesis.pdf"
        );
        assert_eq!(resolve_filename(Some("atestado"), None), "atestado.pdf");
        assert_eq!(resolve_filename(Some("Receita.PDF"), None), "Receita.PDF");
        assert_eq!(
            resolve_filename(Some("../../etc/passwd"), None),
            "passwd.pdf"
        );
        assert_eq!(resolve_filename(Some("a\"b;c.pdf"), None), "abc.pdf");
        assert_eq!(resolve_filename(Some("   "), None), "document.pdf");
    }
}
