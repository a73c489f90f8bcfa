//! Paper formats and print options for the headless-browser render.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Paper size in inches, portrait orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaperSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl PaperSize {
    pub const A4: PaperSize = PaperSize::new(8.27, 11.7);
    pub const LETTER: PaperSize = PaperSize::new(8.5, 11.0);

    pub const fn new(width_in: f64, height_in: f64) -> Self {
        PaperSize {
            width_in,
            height_in,
        }
    }

    /// Look up a named format, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let size = match name.trim().to_ascii_lowercase().as_str() {
            "letter" => PaperSize::LETTER,
            "legal" => PaperSize::new(8.5, 14.0),
            "tabloid" => PaperSize::new(11.0, 17.0),
            "ledger" => PaperSize::new(17.0, 11.0),
            "a0" => PaperSize::new(33.1, 46.8),
            "a1" => PaperSize::new(23.4, 33.1),
            "a2" => PaperSize::new(16.54, 23.4),
            "a3" => PaperSize::new(11.7, 16.54),
            "a4" => PaperSize::A4,
            "a5" => PaperSize::new(5.83, 8.27),
            "a6" => PaperSize::new(4.13, 5.83),
            _ => return None,
        };
        Some(size)
    }

    pub fn oriented(self, landscape: bool) -> Self {
        if landscape {
            PaperSize::new(self.height_in, self.width_in)
        } else {
            self
        }
    }

    /// `(width, height)` in PDF points.
    pub fn points(&self) -> (f32, f32) {
        ((self.width_in * 72.0) as f32, (self.height_in * 72.0) as f32)
    }
}

/// A CSS length as sent by the client: a bare number (pixels) or a string
/// with a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LengthInput {
    Pixels(f64),
    Text(String),
}

impl LengthInput {
    fn to_inches(&self) -> Result<f64, String> {
        match self {
            LengthInput::Pixels(px) => Ok(px / 96.0),
            LengthInput::Text(text) => css_length_to_inches(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginInput {
    pub top: Option<LengthInput>,
    pub bottom: Option<LengthInput>,
    pub left: Option<LengthInput>,
    pub right: Option<LengthInput>,
}

/// The `options` member of the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOptionsInput {
    pub format: Option<String>,
    pub landscape: Option<bool>,
    pub width: Option<LengthInput>,
    pub height: Option<LengthInput>,
    pub margin: Option<MarginInput>,
    pub print_background: Option<bool>,
    pub scale: Option<f64>,
    #[serde(alias = "preferCSSPageSize")]
    pub prefer_css_page_size: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub fn uniform(inches: f64) -> Self {
        Margins {
            top: inches,
            bottom: inches,
            left: inches,
            right: inches,
        }
    }
}

/// Resolved print options, lengths in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageOptions {
    pub paper: PaperSize,
    pub landscape: bool,
    pub margins: Margins,
    pub print_background: bool,
    pub scale: f64,
    pub prefer_css_page_size: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            paper: PaperSize::A4,
            landscape: false,
            margins: Margins::uniform(0.5 / 2.54),
            print_background: true,
            scale: 1.0,
            prefer_css_page_size: false,
        }
    }
}

impl PageOptions {
    /// Apply the client's options over the defaults (A4, backgrounds on,
    /// 0.5cm margins).
    pub fn from_input(input: Option<&PageOptionsInput>) -> Result<Self, String> {
        let mut options = PageOptions::default();
        let Some(input) = input else {
            return Ok(options);
        };

        if let Some(format) = &input.format {
            options.paper =
                PaperSize::from_name(format).ok_or_else(|| format!("unknown format `{format}`"))?;
        }
        if input.width.is_some() || input.height.is_some() {
            let width = match &input.width {
                Some(w) => w.to_inches()?,
                None => options.paper.width_in,
            };
            let height = match &input.height {
                Some(h) => h.to_inches()?,
                None => options.paper.height_in,
            };
            options.paper = PaperSize::new(width, height);
        }
        if let Some(margin) = &input.margin {
            let pick = |side: &Option<LengthInput>, current: f64| -> Result<f64, String> {
                side.as_ref().map_or(Ok(current), LengthInput::to_inches)
            };
            options.margins = Margins {
                top: pick(&margin.top, options.margins.top)?,
                bottom: pick(&margin.bottom, options.margins.bottom)?,
                left: pick(&margin.left, options.margins.left)?,
                right: pick(&margin.right, options.margins.right)?,
            };
        }
        if let Some(scale) = input.scale {
            if !(0.1..=2.0).contains(&scale) {
                return Err(format!("`scale` must be within [0.1, 2], got {scale}"));
            }
            options.scale = scale;
        }
        options.landscape = input.landscape.unwrap_or(options.landscape);
        options.print_background = input.print_background.unwrap_or(options.print_background);
        options.prefer_css_page_size = input
            .prefer_css_page_size
            .unwrap_or(options.prefer_css_page_size);

        if options.paper.width_in <= 0.0 || options.paper.height_in <= 0.0 {
            return Err("page dimensions must be positive".to_string());
        }
        Ok(options)
    }
}

fn length_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)\s*(px|in|cm|mm|pt|pc)?\s*$").unwrap()
    })
}

/// Convert a CSS absolute length (`"0.5cm"`, `"10mm"`, `"1in"`, `"12"`) to
/// inches. A bare number is read as pixels.
pub fn css_length_to_inches(text: &str) -> Result<f64, String> {
    let lowered = text.to_ascii_lowercase();
    let caps = length_regex()
        .captures(&lowered)
        .ok_or_else(|| format!("invalid length `{text}`"))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| format!("invalid length `{text}`"))?;
    let inches = match caps.get(2).map(|m| m.as_str()).unwrap_or("px") {
        "in" => value,
        "cm" => value / 2.54,
        "mm" => value / 25.4,
        "pt" => value / 72.0,
        "pc" => value / 6.0,
        _ => value / 96.0,
    };
    Ok(inches)
}
