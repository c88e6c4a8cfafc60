//! # Glyph Data
//!
//! The normalized glyph list produced by collection (or loaded from JSON)
//! and consumed by the font model. Once assembled it is never mutated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Glyph bounding box in pixels. Origin is the baseline-left point, `y`
/// grows upward and marks the bottom edge of the bitmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glyph {
    /// Destination codepoint.
    pub code: u32,
    pub advance_width: f64,
    pub bbox: BBox,
    /// Kerning against other destination codepoints, pixels. Zero pairs are absent.
    #[serde(default)]
    pub kerning: BTreeMap<u32, f64>,
    /// Row-major 8-bit opacity samples, `bbox.height` rows of `bbox.width`.
    #[serde(default)]
    pub pixels: Vec<Vec<u8>>,
}

impl Glyph {
    pub fn has_kerning(&self) -> bool {
        !self.kerning.is_empty()
    }
}

/// Everything the compiler needs about one font: global metrics and glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontData {
    pub ascent: i32,
    pub descent: i32,
    pub typo_ascent: i32,
    pub typo_descent: i32,
    pub typo_line_gap: i32,
    pub size: u16,
    pub glyphs: Vec<Glyph>,
    pub underline_position: i32,
    pub underline_thickness: i32,
}

/// Reduce an 8-bit sample to `bpp` bits by keeping its top bits.
pub fn reduce_depth(sample: u8, bpp: u8) -> u8 {
    sample >> (8 - bpp)
}

/// Spread a `bpp`-bit value back over 0..=255 (e.g. 0, 85, 170, 255 for 2 bpp).
pub fn expand_depth(value: u8, bpp: u8) -> u8 {
    if bpp >= 8 {
        return value;
    }
    let scale = (1u32 << bpp) - 1;
    ((value as u32 * 0xFFFF / scale) >> 8) as u8
}
