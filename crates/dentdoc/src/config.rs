use std::path::{Path, PathBuf};
use std::time::Duration;

use dentdoc_core::layout::{merge_layout, parse_layout_file, LayoutTable};
use dentdoc_pdf::FitMode;

use crate::serve::cli::ServeOptions;

/// Process-wide configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub assets_dir: PathBuf,
    pub layouts_dir: PathBuf,
    pub templates_dir: Option<PathBuf>,
    /// Built-in positions with the layout file applied.
    pub layout: LayoutTable,
    pub chrome_path: Option<PathBuf>,
    pub render_timeout: Duration,
    pub production: bool,
    pub merge_fit: FitMode,
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_options(options: &ServeOptions) -> Self {
        Settings {
            assets_dir: options.assets_dir.clone(),
            layouts_dir: options.layouts_dir.clone(),
            templates_dir: options.templates_dir.clone(),
            layout: load_layout(options.layout_file.as_deref()),
            chrome_path: options.chrome_path.clone(),
            render_timeout: Duration::from_secs(options.render_timeout.max(1)),
            production: options.production,
            merge_fit: options.merge_fit,
            allowed_origins: options
                .allowed_origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Settings rooted at `dir`, for tests.
    #[cfg(test)]
    pub fn for_dir(dir: &Path) -> Self {
        Settings {
            assets_dir: dir.to_path_buf(),
            layouts_dir: dir.join("layouts"),
            templates_dir: None,
            layout: LayoutTable::builtin(),
            chrome_path: None,
            render_timeout: Duration::from_secs(5),
            production: false,
            merge_fit: FitMode::Contain,
            allowed_origins: Vec::new(),
        }
    }
}

/// The built-in table, with the layout file applied when it can be read.
/// A missing or malformed file is logged and ignored.
pub fn load_layout(path: Option<&Path>) -> LayoutTable {
    let defaults = LayoutTable::builtin();
    let Some(path) = path else {
        return defaults;
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Ignoring layout file {}: {}", path.display(), e);
            return defaults;
        }
    };

    match parse_layout_file(&text) {
        Ok(overrides) => {
            for warning in &overrides.warnings {
                log::warn!("{}: {}", path.display(), warning);
            }
            log::info!("Loaded layout overrides from {}", path.display());
            merge_layout(&defaults, &overrides.table)
        }
        Err(e) => {
            log::warn!("Ignoring layout file {}: {}", path.display(), e);
            defaults
        }
    }
}
