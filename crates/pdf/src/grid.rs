//! Calibration grid drawn over a page on request.

use dentdoc_core::layout::{PageFrame, Rgb};

use crate::content::Canvas;
use crate::fonts::StandardFont;

const GRID_COLOR: Rgb = Rgb::new(0.85, 0.2, 0.2);
const LABEL_SIZE: f32 = 6.0;

/// Guide lines every 10% of the page in both directions, each labelled
/// with its percentage. Labels use the regular face, which the caller must
/// have registered.
pub fn draw_debug_grid(canvas: &mut Canvas, frame: PageFrame) {
    for step in 1..10 {
        let fraction = step as f32 / 10.0;
        let label = format!("{}%", step * 10);

        let x = frame.px(fraction);
        canvas.line((x, 0.0), (x, frame.height), GRID_COLOR, 0.3);
        canvas.text(
            StandardFont::Helvetica,
            LABEL_SIZE,
            GRID_COLOR,
            x + 1.0,
            frame.height - LABEL_SIZE - 2.0,
            &label,
        );

        let y = frame.py(fraction);
        canvas.line((0.0, y), (frame.width, y), GRID_COLOR, 0.3);
        canvas.text(StandardFont::Helvetica, LABEL_SIZE, GRID_COLOR, 2.0, y + 1.0, &label);
    }
}
