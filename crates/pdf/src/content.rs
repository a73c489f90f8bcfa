//! Content stream assembly.

use dentdoc_core::layout::Rgb;
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use crate::fonts::{encode_win_ansi, StandardFont};
use crate::PdfError;

/// Where a form or image lands on the page: its lower-left corner and its
/// drawn size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Placement {
            x,
            y,
            width,
            height,
        }
    }
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

/// A page content stream under construction.
#[derive(Debug, Default)]
pub struct Canvas {
    operations: Vec<Operation>,
}

impl Canvas {
    pub fn new() -> Self {
        Canvas::default()
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    /// Draw a Form XObject whose natural size is `natural` (width, height)
    /// scaled into `placement`.
    pub fn draw_form(&mut self, resource: &str, natural: (f32, f32), placement: Placement) {
        let sx = if natural.0 > 0.0 { placement.width / natural.0 } else { 1.0 };
        let sy = if natural.1 > 0.0 { placement.height / natural.1 } else { 1.0 };
        self.push("q", vec![]);
        self.push(
            "cm",
            vec![real(sx), real(0.0), real(0.0), real(sy), real(placement.x), real(placement.y)],
        );
        self.push("Do", vec![name(resource)]);
        self.push("Q", vec![]);
    }

    /// Draw an image XObject. Images occupy the unit square, so the matrix
    /// carries the drawn size directly.
    pub fn draw_image(&mut self, resource: &str, placement: Placement) {
        self.push("q", vec![]);
        self.push(
            "cm",
            vec![
                real(placement.width),
                real(0.0),
                real(0.0),
                real(placement.height),
                real(placement.x),
                real(placement.y),
            ],
        );
        self.push("Do", vec![name(resource)]);
        self.push("Q", vec![]);
    }

    /// One line of text with its baseline starting at `(x, y)`.
    pub fn text(&mut self, font: StandardFont, size: f32, color: Rgb, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.push("BT", vec![]);
        self.push("Tf", vec![name(font.resource_name()), real(size)]);
        self.push("rg", vec![real(color.r), real(color.g), real(color.b)]);
        self.push("Td", vec![real(x), real(y)]);
        self.push(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    /// A straight stroked segment.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        self.push("q", vec![]);
        self.push("RG", vec![real(color.r), real(color.g), real(color.b)]);
        self.push("w", vec![real(width)]);
        self.push("m", vec![real(from.0), real(from.1)]);
        self.push("l", vec![real(to.0), real(to.1)]);
        self.push("S", vec![]);
        self.push("Q", vec![]);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn encode(self) -> Result<Vec<u8>, PdfError> {
        Content {
            operations: self.operations,
        }
        .encode()
        .map_err(|e| PdfError::Write(format!("content stream encode error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(canvas: &Canvas) -> Vec<&str> {
        canvas
            .operations()
            .iter()
            .map(|op| op.operator.as_str())
            .collect()
    }

    #[test]
    fn text_emits_a_text_object() {
        let mut canvas = Canvas::new();
        canvas.text(StandardFont::Helvetica, 11.0, Rgb::BLACK, 10.0, 20.0, "Olá");
        assert_eq!(operators(&canvas), vec!["BT", "Tf", "rg", "Td", "Tj", "ET"]);
        let tj = &canvas.operations()[4];
        match &tj.operands[0] {
            Object::String(bytes, _) => assert_eq!(bytes, &vec![b'O', b'l', 0xE1]),
            other => panic!("expected string operand, got {:?}", other),
        }
    }

    #[test]
    fn empty_text_is_skipped() {
        let mut canvas = Canvas::new();
        canvas.text(StandardFont::Helvetica, 11.0, Rgb::BLACK, 0.0, 0.0, "");
        assert!(canvas.operations().is_empty());
    }

    #[test]
    fn form_scale_follows_placement() {
        let mut canvas = Canvas::new();
        canvas.draw_form("Pg1", (595.0, 842.0), Placement::new(0.0, 0.0, 297.5, 421.0));
        let cm = &canvas.operations()[1];
        assert_eq!(cm.operator, "cm");
        assert_eq!(cm.operands[0].as_float().unwrap(), 0.5);
        assert_eq!(cm.operands[3].as_float().unwrap(), 0.5);
    }

    #[test]
    fn encodes_to_bytes() {
        let mut canvas = Canvas::new();
        canvas.line((0.0, 0.0), (10.0, 10.0), Rgb::BLACK, 0.5);
        let bytes = canvas.encode().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(" m"));
        assert!(text.contains("S"));
    }
}
