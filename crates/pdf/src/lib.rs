//! PDF composition for dentdoc.
//!
//! Everything here works on byte slices: the caller reads backgrounds and
//! logos, and writes the result. Two engines sit on top of a small
//! lopdf-based toolkit:
//!
//! - [`overlay::overlay`] writes document fields onto a background page.
//! - [`merge::merge`] draws browser-rendered pages over a background page.
//!
//! [`raster::paginate_image`] serves the offline exporter.

use thiserror::Error;

pub mod compose;
pub mod content;
pub mod fonts;
pub mod grid;
pub mod images;
pub mod merge;
pub mod overlay;
pub mod raster;
pub mod source;

#[cfg(test)]
mod testing;

pub use merge::{merge, FitMode, MergeWarning};
pub use overlay::{overlay, OverlayOptions};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Document has no pages")]
    NoPages,
    #[error("Image error: {0}")]
    Image(String),
    #[error("PDF write error: {0}")]
    Write(String),
}
