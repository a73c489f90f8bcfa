use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dentdoc_core::document::{DocumentType, LogoSpec};
use dentdoc_core::logo::{decode_data_url, logo_candidates, sanitize_asset_name, LogoSource};
use dentdoc_core::template::{
    BuiltinTemplates, LayeredTemplates, TemplateError, TemplateSource,
};
use dentdoc_pdf::images::{detect_image_format, ImageFormat};

use crate::config::Settings;

const LETTERHEAD: &str = "letterhead.pdf";
const DEFAULT_LOGO: &str = "logo.png";

/// A logo image that passed the magic-byte check.
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// File lookups for backgrounds, logos and templates.
#[derive(Debug, Clone)]
pub struct AssetStore {
    assets_dir: PathBuf,
    layouts_dir: PathBuf,
    templates_dir: Option<PathBuf>,
}

impl AssetStore {
    pub fn new(settings: &Settings) -> Self {
        AssetStore {
            assets_dir: settings.assets_dir.clone(),
            layouts_dir: settings.layouts_dir.clone(),
            templates_dir: settings.templates_dir.clone(),
        }
    }

    /// `<layouts>/<type>.pdf`, then `<layouts>/letterhead.pdf`. Raw HTML
    /// requests only look for the letterhead.
    pub async fn background(&self, document: Option<DocumentType>) -> Option<Vec<u8>> {
        let mut candidates = Vec::new();
        if let Some(document) = document {
            candidates.push(self.layouts_dir.join(format!("{}.pdf", document.as_str())));
        }
        candidates.push(self.layouts_dir.join(LETTERHEAD));

        for path in candidates {
            if let Some(bytes) = read_optional(&path).await {
                log::debug!("Using background {}", path.display());
                return Some(bytes);
            }
        }
        None
    }

    /// The first candidate that yields a PNG or JPEG. Every failure is
    /// skipped.
    pub async fn logo(&self, spec: Option<&LogoSpec>) -> Option<Logo> {
        for candidate in logo_candidates(spec) {
            let bytes = match &candidate {
                LogoSource::Inline(url) => match decode_data_url(url) {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        log::warn!("Skipping inline logo: {}", e);
                        None
                    }
                },
                LogoSource::Asset(name) => match sanitize_asset_name(name) {
                    Ok(name) => read_optional(&self.assets_dir.join(name)).await,
                    Err(e) => {
                        log::warn!("Skipping logo asset: {}", e);
                        None
                    }
                },
                LogoSource::Default => read_optional(&self.assets_dir.join(DEFAULT_LOGO)).await,
            };

            let Some(bytes) = bytes else { continue };
            match detect_image_format(&bytes) {
                format @ (ImageFormat::Png | ImageFormat::Jpeg) => {
                    return Some(Logo { bytes, format });
                }
                other => log::warn!("Skipping logo: unsupported format {}", other),
            }
        }
        None
    }

    /// The templates directory, when configured, in front of the built-in
    /// templates.
    pub fn templates(&self) -> Box<dyn TemplateSource> {
        let mut sources: Vec<Box<dyn TemplateSource>> = Vec::new();
        if let Some(dir) = &self.templates_dir {
            sources.push(Box::new(DirectoryTemplates::new(dir)));
        }
        sources.push(Box::new(BuiltinTemplates));
        Box::new(LayeredTemplates::new(sources))
    }
}

/// `Some(bytes)` when the file exists and can be read.
async fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// `<dir>/<name>.html`.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    dir: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(dir: &Path) -> Self {
        DirectoryTemplates {
            dir: dir.to_path_buf(),
        }
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let path = self.dir.join(format!("{name}.html"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TemplateError::Read {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
