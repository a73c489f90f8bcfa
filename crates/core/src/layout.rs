//! Fraction-of-page layout positions for the text-overlay strategy.
//!
//! Every drawable field of a document type has a [`PartialPosition`]. The
//! built-in table is layered with the optional layout file at startup and
//! with per-request `coords` overrides at draw time. Merging is attribute
//! by attribute: an override that only carries `x` and `y` keeps the
//! default `size`, `color` and `bold`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DocumentType;

/// Font size used when a position carries none.
pub const DEFAULT_FONT_SIZE: f32 = 11.0;

/// Vertical advance between wrapped lines, as a fraction of page height.
pub const DEFAULT_LINE_GAP: f32 = 0.025;

/// Extra vertical space between list blocks, as a fraction of page height.
pub const DEFAULT_BLOCK_GAP: f32 = 0.01;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("malformed coordinates for {document}.{field}: {reason}")]
    Malformed {
        document: DocumentType,
        field: String,
        reason: String,
    },
    #[error("malformed coordinates: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// An RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorRepr", into = "[f32; 3]")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Rgb { r, g, b }
    }

    fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    fn is_valid(&self) -> bool {
        self.components().iter().all(|c| is_fraction(*c))
    }

    fn clamped(self) -> Self {
        Rgb::new(clamp_fraction(self.r), clamp_fraction(self.g), clamp_fraction(self.b))
    }
}

/// Accepted JSON spellings of a color.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Array([f32; 3]),
    Short { r: f32, g: f32, b: f32 },
    Long { red: f32, green: f32, blue: f32 },
}

impl From<ColorRepr> for Rgb {
    fn from(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Array([r, g, b]) => Rgb::new(r, g, b),
            ColorRepr::Short { r, g, b } => Rgb::new(r, g, b),
            ColorRepr::Long { red, green, blue } => Rgb::new(red, green, blue),
        }
    }
}

impl From<Rgb> for [f32; 3] {
    fn from(color: Rgb) -> Self {
        color.components()
    }
}

const DARK_BLUE: Rgb = Rgb::new(0.0, 0.24, 0.48);
const GRAY_25: Rgb = Rgb::new(0.25, 0.25, 0.25);
const GRAY_35: Rgb = Rgb::new(0.35, 0.35, 0.35);
const GRAY_45: Rgb = Rgb::new(0.45, 0.45, 0.45);

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A position where any attribute may be absent.
///
/// This is both the shape of a table entry and of an override. A missing
/// `(document, field)` pair resolves to [`PartialPosition::default`], an
/// all-absent position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_gap: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_gap: Option<f32>,
}

impl PartialPosition {
    pub fn at(x: f32, y: f32) -> Self {
        PartialPosition {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn line_gap(mut self, gap: f32) -> Self {
        self.line_gap = Some(gap);
        self
    }

    pub fn block_gap(mut self, gap: f32) -> Self {
        self.block_gap = Some(gap);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == PartialPosition::default()
    }

    /// Layer `over` on top of `self`. Attributes present in `over` win.
    pub fn merged(&self, over: &PartialPosition) -> PartialPosition {
        PartialPosition {
            x: over.x.or(self.x),
            y: over.y.or(self.y),
            size: over.size.or(self.size),
            color: over.color.or(self.color),
            bold: over.bold.or(self.bold),
            width: over.width.or(self.width),
            height: over.height.or(self.height),
            line_gap: over.line_gap.or(self.line_gap),
            block_gap: over.block_gap.or(self.block_gap),
        }
    }

    fn fractions(&self) -> [(&'static str, Option<f32>); 6] {
        [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("lineGap", self.line_gap),
            ("blockGap", self.block_gap),
        ]
    }

    /// Check the `[0, 1]` invariant on every fraction, a positive finite
    /// size and color components in range.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.fractions() {
            if let Some(v) = value {
                if !is_fraction(v) {
                    return Err(format!("`{name}` must be within [0, 1], got {v}"));
                }
            }
        }
        if let Some(size) = self.size {
            if !size.is_finite() || size <= 0.0 {
                return Err(format!("`size` must be a positive number, got {size}"));
            }
        }
        if let Some(color) = self.color {
            if !color.is_valid() {
                return Err("`color` components must be within [0, 1]".to_string());
            }
        }
        Ok(())
    }

    /// Force every fraction into `[0, 1]`. Returns the clamped position and
    /// whether anything changed.
    pub fn clamped(&self) -> (PartialPosition, bool) {
        let clamp = |v: Option<f32>| v.map(clamp_fraction);
        let size = self
            .size
            .filter(|s| s.is_finite() && *s > 0.0)
            .or(self.size.map(|_| DEFAULT_FONT_SIZE));
        let clamped = PartialPosition {
            x: clamp(self.x),
            y: clamp(self.y),
            size,
            color: self.color.map(Rgb::clamped),
            bold: self.bold,
            width: clamp(self.width),
            height: clamp(self.height),
            line_gap: clamp(self.line_gap),
            block_gap: clamp(self.block_gap),
        };
        let changed = clamped != *self;
        (clamped, changed)
    }

    /// Fill in the fallbacks for a drawable text field. `None` when the
    /// position has no anchor point.
    pub fn resolve(&self) -> Option<LayoutPosition> {
        Some(LayoutPosition {
            x: self.x?,
            y: self.y?,
            size: self.size.unwrap_or(DEFAULT_FONT_SIZE),
            color: self.color.unwrap_or(Rgb::BLACK),
            bold: self.bold.unwrap_or(false),
            width: self.width,
            height: self.height,
            line_gap: self.line_gap.unwrap_or(DEFAULT_LINE_GAP),
            block_gap: self.block_gap.unwrap_or(DEFAULT_BLOCK_GAP),
        })
    }
}

/// A fully resolved position, ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPosition {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Rgb,
    pub bold: bool,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub line_gap: f32,
    pub block_gap: f32,
}

/// Page dimensions in points, converting fractions into user space.
///
/// `y` fractions are measured from the bottom edge, the PDF convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub width: f32,
    pub height: f32,
}

impl PageFrame {
    pub fn new(width: f32, height: f32) -> Self {
        PageFrame { width, height }
    }

    pub fn px(&self, fraction: f32) -> f32 {
        fraction * self.width
    }

    pub fn py(&self, fraction: f32) -> f32 {
        fraction * self.height
    }
}

fn is_fraction(v: f32) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn clamp_fraction(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

pub type FieldPositions = BTreeMap<String, PartialPosition>;

/// Sparse overrides keyed by document type, then field name.
///
/// Deserializes from the `coords` request member and from the `positions`
/// member of the layout file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialLayoutTable(pub BTreeMap<DocumentType, FieldPositions>);

impl PartialLayoutTable {
    pub fn get(&self, document: DocumentType, field: &str) -> Option<&PartialPosition> {
        self.0.get(&document).and_then(|fields| fields.get(field))
    }

    pub fn insert(&mut self, document: DocumentType, field: &str, position: PartialPosition) {
        self.0
            .entry(document)
            .or_default()
            .insert(field.to_string(), position);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|fields| fields.is_empty())
    }

    /// Parse request overrides. Any out-of-range value is rejected.
    pub fn from_request(value: &serde_json::Value) -> Result<Self, LayoutError> {
        let table: PartialLayoutTable = serde_json::from_value(value.clone())
            .map_err(|e| LayoutError::Parse(e.to_string()))?;
        for (document, fields) in &table.0 {
            for (field, position) in fields {
                position.validate().map_err(|reason| LayoutError::Malformed {
                    document: *document,
                    field: field.clone(),
                    reason,
                })?;
            }
        }
        Ok(table)
    }
}

/// The effective layout of every document type.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable {
    positions: BTreeMap<DocumentType, FieldPositions>,
}

impl LayoutTable {
    /// The positions shipped with the service.
    pub fn builtin() -> Self {
        let mut positions = BTreeMap::new();

        positions.insert(
            DocumentType::Certificate,
            fields([
                ("city", PartialPosition::at(0.78, 0.90).size(12.0).color(GRAY_25)),
                ("date", PartialPosition::at(0.78, 0.875).size(11.0).color(GRAY_35)),
                (
                    "doctorName",
                    PartialPosition::at(0.30, 0.78).size(14.0).color(DARK_BLUE).bold(),
                ),
                ("doctorTitle", PartialPosition::at(0.34, 0.765).size(10.0).color(GRAY_35)),
                ("doctorCro", PartialPosition::at(0.36, 0.745).size(10.0).color(GRAY_35)),
                (
                    "body",
                    PartialPosition::at(0.14, 0.62).width(0.72).size(11.0).line_gap(0.025),
                ),
                ("footer", PartialPosition::at(0.22, 0.12).size(10.0).color(GRAY_45)),
                ("logo", PartialPosition::at(0.08, 0.86).width(0.18)),
            ]),
        );

        positions.insert(
            DocumentType::Prescription,
            fields([
                (
                    "title",
                    PartialPosition::at(0.45, 0.88).size(16.0).color(DARK_BLUE).bold(),
                ),
                ("patientName", PartialPosition::at(0.12, 0.84).size(11.0)),
                (
                    "list",
                    PartialPosition::at(0.12, 0.80)
                        .width(0.76)
                        .size(11.0)
                        .line_gap(0.028)
                        .block_gap(0.01),
                ),
                (
                    "doctorName",
                    PartialPosition::at(0.30, 0.20).size(12.0).color(DARK_BLUE).bold(),
                ),
                ("doctorCro", PartialPosition::at(0.34, 0.185).size(10.0).color(GRAY_35)),
                ("logo", PartialPosition::at(0.08, 0.86).width(0.16)),
            ]),
        );

        positions.insert(
            DocumentType::Anamnesis,
            fields([
                (
                    "title",
                    PartialPosition::at(0.44, 0.90).size(16.0).color(DARK_BLUE).bold(),
                ),
                ("patientName", PartialPosition::at(0.12, 0.84).size(11.0)),
                ("patientAge", PartialPosition::at(0.12, 0.815).size(11.0)),
                ("patientPhone", PartialPosition::at(0.12, 0.79).size(11.0)),
                (
                    "questions",
                    PartialPosition::at(0.12, 0.75)
                        .width(0.76)
                        .size(10.0)
                        .line_gap(0.024)
                        .block_gap(0.008),
                ),
                ("logo", PartialPosition::at(0.08, 0.88).width(0.14)),
            ]),
        );

        LayoutTable { positions }
    }

    /// The stored position, or an all-absent one.
    pub fn position(&self, document: DocumentType, field: &str) -> PartialPosition {
        self.positions
            .get(&document)
            .and_then(|fields| fields.get(field))
            .copied()
            .unwrap_or_default()
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        LayoutTable::builtin()
    }
}

fn fields<const N: usize>(entries: [(&str, PartialPosition); N]) -> FieldPositions {
    entries
        .into_iter()
        .map(|(name, position)| (name.to_string(), position))
        .collect()
}

/// Layer `overrides` onto `defaults`, attribute by attribute.
///
/// Fields that exist only in the overrides are added as they are.
pub fn merge_layout(defaults: &LayoutTable, overrides: &PartialLayoutTable) -> LayoutTable {
    let mut merged = defaults.clone();
    for (document, fields) in &overrides.0 {
        let target = merged.positions.entry(*document).or_default();
        for (field, over) in fields {
            let base = target.get(field).copied().unwrap_or_default();
            target.insert(field.clone(), base.merged(over));
        }
    }
    merged
}

/// Resolve one position: request override, then the table (which already
/// holds the layout file on top of the built-in defaults).
pub fn get_position(
    table: &LayoutTable,
    document: DocumentType,
    field: &str,
    overrides: Option<&PartialLayoutTable>,
) -> PartialPosition {
    let base = table.position(document, field);
    match overrides.and_then(|o| o.get(document, field)) {
        Some(over) => base.merged(over),
        None => base,
    }
}

/// Position lookup used by the drawing engines.
pub trait LayoutResolver {
    fn position(&self, document: DocumentType, field: &str) -> PartialPosition;
}

impl LayoutResolver for LayoutTable {
    fn position(&self, document: DocumentType, field: &str) -> PartialPosition {
        LayoutTable::position(self, document, field)
    }
}

/// A table plus the overrides of a single request.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedLayout<'a> {
    pub table: &'a LayoutTable,
    pub overrides: Option<&'a PartialLayoutTable>,
}

impl<'a> ResolvedLayout<'a> {
    pub fn new(table: &'a LayoutTable, overrides: Option<&'a PartialLayoutTable>) -> Self {
        ResolvedLayout { table, overrides }
    }
}

impl LayoutResolver for ResolvedLayout<'_> {
    fn position(&self, document: DocumentType, field: &str) -> PartialPosition {
        get_position(self.table, document, field, self.overrides)
    }
}

// ---------------------------------------------------------------------------
// Layout file
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LayoutFile {
    #[serde(default)]
    positions: PartialLayoutTable,
}

/// The parsed layout file plus one message per clamped entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutFileOverrides {
    pub table: PartialLayoutTable,
    pub warnings: Vec<String>,
}

/// Parse the JSON layout file. Out-of-range values are clamped rather than
/// rejected, and reported in `warnings`.
pub fn parse_layout_file(text: &str) -> Result<LayoutFileOverrides, LayoutError> {
    let file: LayoutFile =
        serde_json::from_str(text).map_err(|e| LayoutError::Parse(e.to_string()))?;

    let mut warnings = Vec::new();
    let mut table = PartialLayoutTable::default();
    for (document, fields) in file.positions.0 {
        for (field, position) in fields {
            let (clamped, changed) = position.clamped();
            if changed {
                warnings.push(format!(
                    "{document}.{field}: values outside [0, 1] were clamped"
                ));
            }
            table.insert(document, &field, clamped);
        }
    }

    Ok(LayoutFileOverrides { table, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_certificate_doctor_name() {
        let table = LayoutTable::builtin();
        let pos = table.position(DocumentType::Certificate, "doctorName");
        assert_eq!(pos.x, Some(0.30));
        assert_eq!(pos.y, Some(0.78));
        assert_eq!(pos.size, Some(14.0));
        assert_eq!(pos.bold, Some(true));
    }

    #[test]
    fn test_missing_field_is_empty() {
        let table = LayoutTable::builtin();
        let pos = table.position(DocumentType::Anamnesis, "doesNotExist");
        assert!(pos.is_empty());
        assert!(pos.resolve().is_none());
    }

    #[test]
    fn test_override_wins_and_keeps_other_attributes() {
        let table = LayoutTable::builtin();
        let mut overrides = PartialLayoutTable::default();
        overrides.insert(
            DocumentType::Certificate,
            "doctorName",
            PartialPosition::at(0.28, 0.80),
        );

        let pos = get_position(&table, DocumentType::Certificate, "doctorName", Some(&overrides));
        assert_eq!(pos.x, Some(0.28));
        assert_eq!(pos.y, Some(0.80));
        assert_eq!(pos.size, Some(14.0));
        assert_eq!(pos.color, Some(DARK_BLUE));
        assert_eq!(pos.bold, Some(true));
    }

    #[test]
    fn test_absent_override_falls_back_to_defaults() {
        let table = LayoutTable::builtin();
        let mut overrides = PartialLayoutTable::default();
        overrides.insert(DocumentType::Certificate, "city", PartialPosition::at(0.5, 0.5));

        let pos = get_position(&table, DocumentType::Certificate, "footer", Some(&overrides));
        assert_eq!(pos, table.position(DocumentType::Certificate, "footer"));
        let pos = get_position(&table, DocumentType::Prescription, "city", Some(&overrides));
        assert!(pos.is_empty());
    }

    #[test]
    fn test_merge_layout_adds_new_fields() {
        let mut overrides = PartialLayoutTable::default();
        overrides.insert(
            DocumentType::Prescription,
            "clinicStamp",
            PartialPosition::at(0.7, 0.1).size(8.0),
        );
        let merged = merge_layout(&LayoutTable::builtin(), &overrides);
        let pos = merged.position(DocumentType::Prescription, "clinicStamp");
        assert_eq!(pos.size, Some(8.0));
        assert_eq!(
            merged.position(DocumentType::Prescription, "title"),
            LayoutTable::builtin().position(DocumentType::Prescription, "title")
        );
    }

    #[test]
    fn test_request_overrides_accept_color_spellings() {
        let value = serde_json::json!({
            "certificate": {
                "city": { "x": 0.5, "color": [1.0, 0.0, 0.0] },
                "date": { "y": 0.5, "color": { "r": 0.0, "g": 1.0, "b": 0.0 } },
                "footer": { "color": { "red": 0.0, "green": 0.0, "blue": 1.0 } }
            }
        });
        let table = PartialLayoutTable::from_request(&value).unwrap();
        let doc = DocumentType::Certificate;
        assert_eq!(table.get(doc, "city").unwrap().color, Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(table.get(doc, "date").unwrap().color, Some(Rgb::new(0.0, 1.0, 0.0)));
        assert_eq!(table.get(doc, "footer").unwrap().color, Some(Rgb::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_request_overrides_reject_out_of_range() {
        let value = serde_json::json!({ "certificate": { "city": { "x": 1.5 } } });
        let err = PartialLayoutTable::from_request(&value).unwrap_err();
        assert!(matches!(err, LayoutError::Malformed { ref field, .. } if field == "city"));
    }

    #[test]
    fn test_request_overrides_reject_unknown_template() {
        let value = serde_json::json!({ "invoice": { "total": { "x": 0.5 } } });
        assert!(matches!(
            PartialLayoutTable::from_request(&value),
            Err(LayoutError::Parse(_))
        ));
    }

    #[test]
    fn test_request_overrides_reject_unknown_attribute() {
        let value = serde_json::json!({ "certificate": { "city": { "colour": [0, 0, 0] } } });
        assert!(PartialLayoutTable::from_request(&value).is_err());
    }

    #[test]
    fn test_layout_file_clamps_and_warns() {
        let text = r#"{
            "positions": {
                "anamnesis": {
                    "title": { "x": -0.2, "y": 1.4 },
                    "patientName": { "x": 0.2, "y": 0.5 }
                }
            }
        }"#;
        let parsed = parse_layout_file(text).unwrap();
        let title = parsed.table.get(DocumentType::Anamnesis, "title").unwrap();
        assert_eq!(title.x, Some(0.0));
        assert_eq!(title.y, Some(1.0));
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("anamnesis.title"));
    }

    #[test]
    fn test_layout_file_invalid_json() {
        assert!(parse_layout_file("{ not json").is_err());
    }

    #[test]
    fn test_resolve_applies_fallbacks() {
        let pos = PartialPosition::at(0.1, 0.2).resolve().unwrap();
        assert_eq!(pos.size, DEFAULT_FONT_SIZE);
        assert_eq!(pos.color, Rgb::BLACK);
        assert!(!pos.bold);
        assert_eq!(pos.line_gap, DEFAULT_LINE_GAP);
        assert_eq!(pos.block_gap, DEFAULT_BLOCK_GAP);
    }

    #[test]
    fn test_page_frame_converts_fractions() {
        let frame = PageFrame::new(595.0, 842.0);
        for (fx, fy) in [(0.0, 0.0), (0.5, 0.25), (1.0, 1.0), (0.78, 0.9)] {
            assert!((frame.px(fx) - fx * 595.0).abs() < f32::EPSILON * 1000.0);
            assert!((frame.py(fy) - fy * 842.0).abs() < f32::EPSILON * 1000.0);
        }
    }
}
