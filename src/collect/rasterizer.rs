//! # Glyph Rasterizer
//!
//! A scoped handle over every source face of one build. Outlines are
//! rendered by fontdue, font-wide metrics (OS/2 typographic values, `post`
//! underline) come from ttf-parser at load time. All faces are owned by the
//! handle and released together when it drops.
//!
//! Subpixel modes render at three times the size and keep three samples per
//! pixel along the subpixel axis, averaging the other axis down:
//!
//! ```text
//! horizontal: width × 3 samples, height rows
//! vertical:   width samples,     height × 3 rows
//! ```

use fontdue::{Font, FontSettings, Metrics};
use log::debug;

use crate::error::FontError;
use crate::glyph::BBox;
use crate::options::SubpixelMode;

/// Index of a face inside its [`Rasterizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(usize);

/// Font-wide values in font units, read once from the face tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    pub units_per_em: u16,
    pub typo_ascent: i16,
    pub typo_descent: i16,
    pub typo_line_gap: i16,
    pub underline_position: i16,
    pub underline_thickness: i16,
}

impl FaceMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let underline = face.underline_metrics();
        Self {
            units_per_em: face.units_per_em(),
            typo_ascent: face.typographic_ascender().unwrap_or_else(|| face.ascender()),
            typo_descent: face
                .typographic_descender()
                .unwrap_or_else(|| face.descender()),
            typo_line_gap: face
                .typographic_line_gap()
                .unwrap_or_else(|| face.line_gap()),
            underline_position: underline.map_or(0, |m| m.position),
            underline_thickness: underline.map_or(0, |m| m.thickness),
        }
    }

    /// Scale a font-unit value to pixels at `size` and round it.
    pub fn scale(&self, value: i16, size: u16) -> i32 {
        if self.units_per_em == 0 {
            return 0;
        }
        (value as f64 * size as f64 / self.units_per_em as f64).round() as i32
    }
}

struct LoadedFace {
    path: String,
    font: Font,
    metrics: FaceMetrics,
}

/// A rendered glyph: 8-bit coverage rows, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGlyph {
    pub bbox: BBox,
    pub advance_width: f64,
    pub pixels: Vec<Vec<u8>>,
}

pub struct Rasterizer {
    faces: Vec<LoadedFace>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self { faces: Vec::new() }
    }

    /// Parse a font file. The same path loaded twice yields the same face.
    pub fn load(&mut self, path: &str, data: &[u8]) -> Result<FaceId, FontError> {
        if let Some(idx) = self.faces.iter().position(|f| f.path == path) {
            return Ok(FaceId(idx));
        }

        let load_err = |message: String| FontError::FontLoad {
            path: path.to_string(),
            message,
        };
        let face = ttf_parser::Face::parse(data, 0).map_err(|e| load_err(e.to_string()))?;
        let metrics = FaceMetrics::from_face(&face);
        let font =
            Font::from_bytes(data, FontSettings::default()).map_err(|e| load_err(e.to_string()))?;

        debug!(
            "loaded \"{}\": {} glyphs, {} units/em",
            path,
            font.glyph_count(),
            metrics.units_per_em
        );
        self.faces.push(LoadedFace {
            path: path.to_string(),
            font,
            metrics,
        });
        Ok(FaceId(self.faces.len() - 1))
    }

    pub fn path(&self, face: FaceId) -> &str {
        &self.faces[face.0].path
    }

    pub fn metrics(&self, face: FaceId) -> FaceMetrics {
        self.faces[face.0].metrics
    }

    pub fn glyph_exists(&self, face: FaceId, code: u32) -> bool {
        char::from_u32(code)
            .map(|ch| self.faces[face.0].font.lookup_glyph_index(ch) != 0)
            .unwrap_or(false)
    }

    /// Render `code` at `size` pixels.
    pub fn render(
        &self,
        face: FaceId,
        code: u32,
        size: u16,
        subpixels: SubpixelMode,
    ) -> Option<RenderedGlyph> {
        let ch = char::from_u32(code)?;
        let font = &self.faces[face.0].font;

        match subpixels {
            SubpixelMode::None => {
                let (metrics, bitmap) = font.rasterize(ch, size as f32);
                Some(from_coverage(&metrics, &bitmap))
            }
            mode => {
                let (metrics, bitmap) = font.rasterize(ch, size as f32 * 3.0);
                Some(downsample(&metrics, &bitmap, mode))
            }
        }
    }

    /// Horizontal kerning between two codepoints of one face, pixels.
    pub fn kerning(&self, face: FaceId, left: u32, right: u32, size: u16) -> f64 {
        match (char::from_u32(left), char::from_u32(right)) {
            (Some(l), Some(r)) => self.faces[face.0]
                .font
                .horizontal_kern(l, r, size as f32)
                .map_or(0.0, f64::from),
            _ => 0.0,
        }
    }
}

impl Drop for Rasterizer {
    fn drop(&mut self) {
        if !self.faces.is_empty() {
            debug!("released {} font face(s)", self.faces.len());
        }
    }
}

fn from_coverage(metrics: &Metrics, bitmap: &[u8]) -> RenderedGlyph {
    let pixels = if metrics.width == 0 {
        Vec::new()
    } else {
        bitmap.chunks(metrics.width).map(<[u8]>::to_vec).collect()
    };
    RenderedGlyph {
        bbox: BBox {
            x: metrics.xmin,
            y: metrics.ymin,
            width: metrics.width as u32,
            height: metrics.height as u32,
        },
        advance_width: metrics.advance_width as f64,
        pixels,
    }
}

/// Collapse a 3× coverage bitmap to subpixel samples on the 1× grid.
fn downsample(metrics: &Metrics, bitmap: &[u8], mode: SubpixelMode) -> RenderedGlyph {
    let advance_width = metrics.advance_width as f64 / 3.0;
    let (w3, h3) = (metrics.width as i32, metrics.height as i32);
    if w3 == 0 || h3 == 0 {
        return RenderedGlyph {
            bbox: BBox::default(),
            advance_width,
            pixels: Vec::new(),
        };
    }

    // Coverage at absolute 3× coordinates, y up; zero outside the bitmap.
    let sample = |x3: i32, y3: i32| -> u32 {
        let col = x3 - metrics.xmin;
        let row = metrics.ymin + h3 - 1 - y3;
        if col < 0 || col >= w3 || row < 0 || row >= h3 {
            0
        } else {
            bitmap[(row * w3 + col) as usize] as u32
        }
    };

    let left = metrics.xmin.div_euclid(3);
    let right = (metrics.xmin + w3 + 2).div_euclid(3);
    let bottom = metrics.ymin.div_euclid(3);
    let top = (metrics.ymin + h3 + 2).div_euclid(3);
    let (width, height) = (right - left, top - bottom);

    let pixels: Vec<Vec<u8>> = match mode {
        SubpixelMode::Vertical => (0..height * 3)
            .map(|r| {
                let y3 = 3 * top - 1 - r;
                (0..width)
                    .map(|c| {
                        let sum: u32 = (0..3).map(|k| sample(3 * (left + c) + k, y3)).sum();
                        ((sum + 1) / 3) as u8
                    })
                    .collect()
            })
            .collect(),
        _ => (0..height)
            .map(|r| {
                let y3 = 3 * (top - 1 - r);
                (0..width * 3)
                    .map(|s| {
                        let sum: u32 = (0..3).map(|k| sample(3 * left + s, y3 + k)).sum();
                        ((sum + 1) / 3) as u8
                    })
                    .collect()
            })
            .collect(),
    };

    let (bbox_width, bbox_height) = match mode {
        SubpixelMode::Vertical => (width, height * 3),
        _ => (width * 3, height),
    };

    RenderedGlyph {
        bbox: BBox {
            x: left,
            y: bottom,
            width: bbox_width as u32,
            height: bbox_height as u32,
        },
        advance_width,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(xmin: i32, ymin: i32, width: usize, height: usize, advance: f32) -> Metrics {
        Metrics {
            xmin,
            ymin,
            width,
            height,
            advance_width: advance,
            ..Default::default()
        }
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut r = Rasterizer::new();
        let err = r.load("broken.ttf", b"not a font").err().unwrap();
        match err {
            FontError::FontLoad { path, .. } => assert_eq!(path, "broken.ttf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_coverage_rows_top_down() {
        let g = from_coverage(&metrics(1, -2, 2, 3, 5.5), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(
            g.bbox,
            BBox {
                x: 1,
                y: -2,
                width: 2,
                height: 3
            }
        );
        assert_eq!(g.pixels, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(g.advance_width, 5.5);
    }

    #[test]
    fn test_horizontal_subpixels_keep_columns() {
        // 3×3 block at the 3× origin, fully covered
        let g = downsample(&metrics(0, 0, 3, 3, 9.0), &[255; 9], SubpixelMode::Horizontal);
        assert_eq!(
            g.bbox,
            BBox {
                x: 0,
                y: 0,
                width: 3,
                height: 1
            }
        );
        assert_eq!(g.pixels, vec![vec![255, 255, 255]]);
        assert_eq!(g.advance_width, 3.0);
    }

    #[test]
    fn test_horizontal_subpixels_snap_origin() {
        // one 3× column at x = 4, rows y = 0..3: falls into the second
        // subpixel of pixel 1
        let g = downsample(&metrics(4, 0, 1, 3, 6.0), &[255; 3], SubpixelMode::Horizontal);
        assert_eq!(g.bbox.x, 1);
        assert_eq!(g.bbox.width, 3);
        assert_eq!(g.pixels, vec![vec![0, 255, 0]]);
    }

    #[test]
    fn test_vertical_subpixels_average_columns() {
        // 3 columns, 3 rows; only the top row covered, one column of three
        let bitmap = [255, 0, 0, 0, 0, 0, 0, 0, 0];
        let g = downsample(&metrics(0, -3, 3, 3, 6.0), &bitmap, SubpixelMode::Vertical);
        assert_eq!(
            g.bbox,
            BBox {
                x: 0,
                y: -1,
                width: 1,
                height: 3
            }
        );
        assert_eq!(g.pixels, vec![vec![85], vec![0], vec![0]]);
    }

    #[test]
    fn test_empty_subpixel_glyph() {
        let g = downsample(&metrics(0, 0, 0, 0, 12.0), &[], SubpixelMode::Horizontal);
        assert_eq!(g.bbox, BBox::default());
        assert!(g.pixels.is_empty());
        assert_eq!(g.advance_width, 4.0);
    }

    #[test]
    fn test_metric_scaling_rounds() {
        let m = FaceMetrics {
            units_per_em: 1000,
            typo_ascent: 800,
            typo_descent: -200,
            typo_line_gap: 90,
            underline_position: -75,
            underline_thickness: 50,
        };
        assert_eq!(m.scale(m.typo_ascent, 16), 13);
        assert_eq!(m.scale(m.typo_descent, 16), -3);
        assert_eq!(m.scale(m.underline_position, 16), -1);
        assert_eq!(m.scale(m.underline_thickness, 10), 1);
    }
}
