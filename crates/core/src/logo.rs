//! Logo source selection.
//!
//! A logo comes from, in order: an inline `data:` URL, a named file in the
//! assets directory, the default logo file. Every failure along the way is
//! skippable; a document without a logo is still a valid document.

use base64::Engine;
use thiserror::Error;

use crate::document::LogoSpec;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LogoError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(String),
    #[error("rejected asset name `{0}`")]
    RejectedName(String),
}

/// One candidate source, tried in order.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoSource {
    Inline(String),
    Asset(String),
    Default,
}

/// Candidate sources for a request, highest priority first.
pub fn logo_candidates(spec: Option<&LogoSpec>) -> Vec<LogoSource> {
    let mut sources = Vec::new();
    if let Some(spec) = spec {
        if let Some(url) = spec.data_url.as_deref().filter(|u| !u.trim().is_empty()) {
            sources.push(LogoSource::Inline(url.to_string()));
        }
        if let Some(path) = spec.path.as_deref().filter(|p| !p.trim().is_empty()) {
            sources.push(LogoSource::Asset(path.to_string()));
        }
    }
    sources.push(LogoSource::Default);
    sources
}

/// Decode `data:<mime>;base64,<payload>`.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, LogoError> {
    let rest = url.trim().strip_prefix("data:").ok_or(LogoError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(LogoError::NotDataUrl)?;
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(LogoError::NotBase64);
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| LogoError::Decode(e.to_string()))
}

/// Accept a bare file name only. Anything with a path separator, a parent
/// reference or a leading dot is rejected.
pub fn sanitize_asset_name(name: &str) -> Result<&str, LogoError> {
    let trimmed = name.trim();
    let rejected = trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\', '\0', ':'])
        || trimmed.contains("..");
    if rejected {
        Err(LogoError::RejectedName(name.to_string()))
    } else {
        Ok(trimmed)
    }
}

/// Encode image bytes as a data URL for the HTML templates.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
