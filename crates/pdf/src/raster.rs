//! Paginating one tall captured image into a PDF.
//!
//! Used by the offline exporter: the page is captured as a single bitmap,
//! scaled to the printable width, and cut into page-height bands.

use crate::compose::{OutputDocument, PageResources};
use crate::content::{Canvas, Placement};
use crate::images::embed_decoded;
use crate::PdfError;

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

/// A horizontal slice of the source image and where it goes on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// First pixel row.
    pub top: u32,
    /// Pixel rows in the slice.
    pub rows: u32,
    pub placement: Placement,
}

/// Cut an image of `image_size` pixels into bands for pages of `page` points
/// with a uniform `margin`. Bands are drawn from the top margin down.
pub fn plan_bands(image_size: (u32, u32), page: (f32, f32), margin: f32) -> Vec<Band> {
    let (image_width, image_height) = image_size;
    let printable_width = page.0 - 2.0 * margin;
    let printable_height = page.1 - 2.0 * margin;
    if image_width == 0 || image_height == 0 || printable_width <= 0.0 || printable_height <= 0.0 {
        return Vec::new();
    }

    let points_per_pixel = printable_width / image_width as f32;
    let rows_per_page = ((printable_height / points_per_pixel).floor() as u32).max(1);

    let mut bands = Vec::new();
    let mut top = 0;
    while top < image_height {
        let rows = rows_per_page.min(image_height - top);
        let height = rows as f32 * points_per_pixel;
        bands.push(Band {
            top,
            rows,
            placement: Placement::new(margin, page.1 - margin - height, printable_width, height),
        });
        top += rows;
    }
    bands
}

/// Build a PDF from a captured PNG or JPEG, one page per band.
pub fn paginate_image(image: &[u8], page: (f32, f32), margin: f32) -> Result<Vec<u8>, PdfError> {
    let decoded = image::load_from_memory(image).map_err(|e| PdfError::Image(e.to_string()))?;
    let bands = plan_bands((decoded.width(), decoded.height()), page, margin);
    log::debug!(
        "Paginating {}x{} capture into {} page(s)",
        decoded.width(),
        decoded.height(),
        bands.len()
    );

    let mut out = OutputDocument::new();
    for band in bands {
        let slice = decoded.crop_imm(0, band.top, decoded.width(), band.rows);
        let embedded = embed_decoded(&mut out, &slice);

        let mut resources = PageResources::new();
        resources.xobject("Im", embedded.id);
        let mut canvas = Canvas::new();
        canvas.draw_image("Im", band.placement);
        out.add_page(page, resources, canvas)?;
    }

    out.finish()
}
