use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dentdoc_core::page::PageOptions;
use dentdoc_pdf::compose::{OutputDocument, PageResources};
use dentdoc_pdf::content::Canvas;
use dentdoc_pdf::source::SourceDocument;

use crate::browser::HtmlPrinter;
use crate::error::ApiError;

pub const A4: (f32, f32) = (595.0, 842.0);

pub fn blank_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut out = OutputDocument::new();
    for size in sizes {
        out.add_page(*size, PageResources::new(), Canvas::new())
            .unwrap();
    }
    out.finish().unwrap()
}

pub fn page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let doc = SourceDocument::load_bytes(bytes).unwrap();
    doc.pages()
        .values()
        .map(|id| doc.page_dimensions(*id).unwrap())
        .collect()
}

/// Writes a blank PDF into `<dir>/layouts/<name>`.
pub fn write_background(dir: &Path, name: &str, sizes: &[(f32, f32)]) {
    let layouts = dir.join("layouts");
    std::fs::create_dir_all(&layouts).unwrap();
    std::fs::write(layouts.join(name), blank_pdf(sizes)).unwrap();
}

enum Behavior {
    Pages(Vec<u8>),
    Fail,
    Slow(Duration),
}

/// Records what it was asked to print and answers with blank A4 pages.
#[derive(Clone)]
pub struct StubPrinter {
    behavior: Arc<Behavior>,
    printed: Arc<Mutex<Vec<String>>>,
}

impl StubPrinter {
    fn with(behavior: Behavior) -> Self {
        StubPrinter {
            behavior: Arc::new(behavior),
            printed: Arc::default(),
        }
    }

    pub fn pages(count: usize) -> Self {
        Self::with(Behavior::Pages(blank_pdf(&vec![A4; count])))
    }

    pub fn failing() -> Self {
        Self::with(Behavior::Fail)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with(Behavior::Slow(delay))
    }

    /// The bytes handed back on success.
    pub fn output(&self) -> Vec<u8> {
        match self.behavior.as_ref() {
            Behavior::Pages(bytes) => bytes.clone(),
            _ => Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.printed.lock().unwrap().len()
    }

    pub fn last_html(&self) -> Option<String> {
        self.printed.lock().unwrap().last().cloned()
    }
}

impl HtmlPrinter for StubPrinter {
    fn print_pdf(&self, html: &str, _page: &PageOptions) -> Result<Vec<u8>, ApiError> {
        self.printed.lock().unwrap().push(html.to_string());
        match self.behavior.as_ref() {
            Behavior::Pages(bytes) => Ok(bytes.clone()),
            Behavior::Fail => Err(ApiError::BrowserNotFound),
            Behavior::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(blank_pdf(&[A4]))
            }
        }
    }
}
