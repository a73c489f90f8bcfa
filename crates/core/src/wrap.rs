//! Greedy, width-bounded line wrapping.

/// Rendered-width query for a run of text at a font size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, size: f32) -> f32;
}

/// Split `text` into lines no wider than `max_width`.
///
/// Words accumulate while the measured width fits; the next word that would
/// overflow starts a new line. A word wider than `max_width` gets a line of
/// its own. Explicit newlines always break, and blank lines are kept.
pub fn wrap_text<M: TextMeasure + ?Sized>(
    text: &str,
    max_width: f32,
    size: f32,
    measure: &M,
) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.replace('\r', "").split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure.text_width(&candidate, size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}

/// A measure where every character has the same advance, in thousandths of
/// the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance(pub f32);

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * self.0 * size / 1000.0
    }
}
