//! Text drawn straight onto a copy of a background page.
//!
//! The first page of the background becomes the canvas; every field of the
//! document type is written at its layout position, measured as fractions
//! of that page. Nothing goes through a browser.

use dentdoc_core::document::{DocumentType, PatientData};
use dentdoc_core::fields::{document_fields, FieldContent};
use dentdoc_core::layout::{LayoutPosition, LayoutResolver, PageFrame};
use dentdoc_core::wrap::wrap_text;

use crate::compose::{OutputDocument, PageResources};
use crate::content::{Canvas, Placement};
use crate::fonts::StandardFont;
use crate::grid::draw_debug_grid;
use crate::images::embed_image;
use crate::PdfError;

/// Logo width, as a fraction of the page, when the layout gives none.
const DEFAULT_LOGO_WIDTH: f32 = 0.15;

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayOptions<'a> {
    /// PNG or JPEG bytes.
    pub logo: Option<&'a [u8]>,
    pub debug_grid: bool,
}

/// Write the fields of `document` over the first page of `background`.
pub fn overlay(
    background: &[u8],
    document: DocumentType,
    data: &PatientData,
    layout: &dyn LayoutResolver,
    options: OverlayOptions<'_>,
) -> Result<Vec<u8>, PdfError> {
    let mut out = OutputDocument::new();
    let page = out
        .import_bytes(background, true)?
        .into_iter()
        .next()
        .ok_or(PdfError::NoPages)?;
    let frame = PageFrame::new(page.width, page.height);

    let mut resources = PageResources::new();
    let mut canvas = Canvas::new();
    resources.xobject("Bg", page.form);
    canvas.draw_form(
        "Bg",
        page.size(),
        Placement::new(0.0, 0.0, page.width, page.height),
    );

    for font in [StandardFont::Helvetica, StandardFont::HelveticaBold] {
        let id = out.add_font(font);
        resources.font(font.resource_name(), id);
    }

    for field in document_fields(document, data) {
        let Some(position) = layout.position(document, field.name).resolve() else {
            log::debug!("{} field `{}` has no position, skipping", document, field.name);
            continue;
        };
        draw_field(&mut canvas, frame, &position, &field.content);
    }

    if let Some(logo) = options.logo {
        draw_logo(&mut out, &mut canvas, &mut resources, frame, layout, document, logo);
    }

    if options.debug_grid {
        draw_debug_grid(&mut canvas, frame);
    }

    out.add_page(page.size(), resources, canvas)?;
    out.finish()
}

fn draw_field(
    canvas: &mut Canvas,
    frame: PageFrame,
    position: &LayoutPosition,
    content: &FieldContent,
) {
    let font = StandardFont::for_weight(position.bold);
    let x = frame.px(position.x);
    let mut y = frame.py(position.y);
    let line_step = frame.py(position.line_gap);
    let max_width = position
        .width
        .map(|w| frame.px(w))
        .unwrap_or(frame.width - x);

    match content {
        FieldContent::Line(text) => {
            canvas.text(font, position.size, position.color, x, y, text);
        }
        FieldContent::Paragraphs(paragraphs) => {
            for (i, paragraph) in paragraphs.iter().enumerate() {
                if i > 0 {
                    y -= line_step;
                }
                for line in wrap_text(paragraph, max_width, position.size, &font) {
                    canvas.text(font, position.size, position.color, x, y, &line);
                    y -= line_step;
                }
            }
        }
        FieldContent::Blocks(blocks) => {
            let block_step = frame.py(position.block_gap);
            for block in blocks {
                for line in wrap_text(block, max_width, position.size, &font) {
                    canvas.text(font, position.size, position.color, x, y, &line);
                    y -= line_step;
                }
                y -= block_step;
            }
        }
    }
}

/// A logo that cannot be decoded is left out; the document is still valid.
fn draw_logo(
    out: &mut OutputDocument,
    canvas: &mut Canvas,
    resources: &mut PageResources,
    frame: PageFrame,
    layout: &dyn LayoutResolver,
    document: DocumentType,
    logo: &[u8],
) {
    let position = layout.position(document, "logo");
    let (Some(x), Some(y)) = (position.x, position.y) else {
        log::debug!("{} has no logo position, skipping logo", document);
        return;
    };

    let image = match embed_image(out, logo) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("Skipping logo: {}", e);
            return;
        }
    };

    let width = frame.px(position.width.unwrap_or(DEFAULT_LOGO_WIDTH));
    let height = position
        .height
        .map(|h| frame.py(h))
        .unwrap_or(width * image.aspect());

    resources.xobject("Logo", image.id);
    canvas.draw_image("Logo", Placement::new(frame.px(x), frame.py(y), width, height));
}
