//! Compositing rendered pages over a letterhead.
//!
//! The first page of the background is imported once and drawn under every
//! page of the content document. Failures never lose the document: the
//! caller gets the content back unmerged, together with the reason.

use std::str::FromStr;

use thiserror::Error;

use crate::compose::{ImportedPage, OutputDocument, PageResources};
use crate::content::{Canvas, Placement};
use crate::source::SourceDocument;
use crate::PdfError;

/// How a content page is fitted onto a background page of another size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitMode {
    /// Keep the aspect ratio and center.
    #[default]
    Contain,
    /// Scale each axis independently to cover the page.
    Stretch,
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "stretch" => Ok(FitMode::Stretch),
            other => Err(format!("unknown fit mode `{other}`, expected contain or stretch")),
        }
    }
}

/// The merge did not happen. `content` holds the unmerged input.
#[derive(Debug, Error)]
#[error("background merge skipped: {source}")]
pub struct MergeWarning {
    pub content: Vec<u8>,
    #[source]
    pub source: PdfError,
}

/// Where a content page of `content` size lands on a page of `page` size.
pub fn fit(content: (f32, f32), page: (f32, f32), mode: FitMode) -> Placement {
    let (cw, ch) = content;
    let (pw, ph) = page;
    if cw <= 0.0 || ch <= 0.0 {
        return Placement::new(0.0, 0.0, pw, ph);
    }
    match mode {
        FitMode::Stretch => Placement::new(0.0, 0.0, pw, ph),
        FitMode::Contain => {
            let scale = (pw / cw).min(ph / ch);
            let (w, h) = (cw * scale, ch * scale);
            Placement::new((pw - w) / 2.0, (ph - h) / 2.0, w, h)
        }
    }
}

/// Draw every page of `content` over the first page of `background`.
///
/// Without a background the content comes back untouched. A background
/// without pages yields pages sized to the content and nothing underneath.
pub fn merge(
    content: &[u8],
    background: Option<&[u8]>,
    mode: FitMode,
) -> Result<Vec<u8>, MergeWarning> {
    let Some(background) = background else {
        return Ok(content.to_vec());
    };

    compose(content, background, mode).map_err(|source| MergeWarning {
        content: content.to_vec(),
        source,
    })
}

fn compose(content: &[u8], background: &[u8], mode: FitMode) -> Result<Vec<u8>, PdfError> {
    let content = SourceDocument::load_bytes(content)?;
    let background = SourceDocument::load_bytes(background)?;

    let mut out = OutputDocument::new();
    let background: Option<ImportedPage> = out.import(background, true)?.into_iter().next();
    let pages = out.import(content, false)?;
    if pages.is_empty() {
        return Err(PdfError::NoPages);
    }

    for page in pages {
        let size = background.map(|bg| bg.size()).unwrap_or(page.size());
        let mut resources = PageResources::new();
        let mut canvas = Canvas::new();

        if let Some(bg) = background {
            resources.xobject("Bg", bg.form);
            canvas.draw_form("Bg", bg.size(), Placement::new(0.0, 0.0, size.0, size.1));
        }
        resources.xobject("Pg", page.form);
        canvas.draw_form("Pg", page.size(), fit(page.size(), size, mode));

        out.add_page(size, resources, canvas)?;
    }

    out.finish()
}
