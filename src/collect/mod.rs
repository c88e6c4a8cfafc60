//! # Glyph Collection
//!
//! Turns source fonts plus their range declarations into a [`FontData`]:
//! merge all ranges, check each one hits at least one glyph, render the
//! merged set in destination-code order, look up same-font kerning and
//! derive the font-wide metrics.

pub mod ranger;
pub mod rasterizer;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::FontError;
use crate::glyph::{FontData, Glyph};
use crate::options::BuildOptions;

pub use ranger::{parse_codepoint, parse_range, CodeRange, Ranger};
pub use rasterizer::{FaceId, Rasterizer, RenderedGlyph};

/// One range declaration attached to a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeItem {
    Range(Vec<CodeRange>),
    Symbols(String),
}

/// A source font file and the codepoints requested from it.
#[derive(Debug, Clone)]
pub struct FontSource {
    pub path: String,
    pub data: Vec<u8>,
    pub ranges: Vec<RangeItem>,
}

impl FontSource {
    /// Read the font file from disk.
    pub fn load(path: &str, ranges: Vec<RangeItem>) -> Result<Self, FontError> {
        let data = fs::read(path).map_err(|source| FontError::Io {
            path: Path::new(path).to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_string(),
            data,
            ranges,
        })
    }
}

fn check_hit(
    raster: &Rasterizer,
    face: FaceId,
    codes: &[u32],
    what: impl FnOnce() -> String,
) -> Result<(), FontError> {
    if codes.iter().any(|&c| raster.glyph_exists(face, c)) {
        Ok(())
    } else {
        Err(FontError::EmptyRange {
            path: raster.path(face).to_string(),
            what: what(),
        })
    }
}

/// Rasterize every requested glyph of every source font.
pub fn collect(sources: &[FontSource], opts: &BuildOptions) -> Result<FontData, FontError> {
    if sources.is_empty() {
        return Err(FontError::InvalidArgument(
            "at least one source font is required".to_string(),
        ));
    }

    let mut raster = Rasterizer::new();
    let mut ranger = Ranger::new();
    let mut faces = Vec::with_capacity(sources.len());

    for source in sources {
        let face = raster.load(&source.path, &source.data)?;
        faces.push(face);

        for item in &source.ranges {
            match item {
                RangeItem::Range(ranges) => {
                    for range in ranges {
                        let codes = ranger.add_range(face, *range);
                        check_hit(&raster, face, &codes, || {
                            format!("range {}", range.describe())
                        })?;
                    }
                }
                RangeItem::Symbols(symbols) => {
                    let codes = ranger.add_symbols(face, symbols);
                    check_hit(&raster, face, &codes, || format!("\"{}\"", symbols))?;
                }
            }
        }
    }

    let mapping = ranger.get();
    let mut glyphs = Vec::with_capacity(mapping.len());
    let mut origins = BTreeMap::new();

    for (&dst, src) in mapping {
        if dst == 0 || !raster.glyph_exists(src.font, src.code) {
            continue;
        }
        let Some(rendered) = raster.render(src.font, src.code, opts.size, opts.subpixels) else {
            continue;
        };
        origins.insert(dst, *src);
        glyphs.push(Glyph {
            code: dst,
            advance_width: rendered.advance_width,
            bbox: rendered.bbox,
            kerning: BTreeMap::new(),
            pixels: rendered.pixels,
        });
    }
    info!("Collected {} glyphs from {} font(s)", glyphs.len(), sources.len());

    if !opts.no_kerning {
        let mut pairs = 0usize;
        for glyph in &mut glyphs {
            let left = origins[&glyph.code];
            for (&dst2, right) in &origins {
                if right.font != left.font {
                    continue;
                }
                let value = raster.kerning(left.font, left.code, right.code, opts.size);
                if value != 0.0 {
                    glyph.kerning.insert(dst2, value);
                    pairs += 1;
                }
            }
        }
        debug!("kerning pairs found: {}", pairs);
    }

    let metrics = raster.metrics(faces[0]);
    let size = opts.size;

    Ok(FontData {
        ascent: glyphs
            .iter()
            .map(|g| g.bbox.y + g.bbox.height as i32)
            .max()
            .unwrap_or(0),
        descent: glyphs.iter().map(|g| g.bbox.y).min().unwrap_or(0),
        typo_ascent: metrics.scale(metrics.typo_ascent, size),
        typo_descent: metrics.scale(metrics.typo_descent, size),
        typo_line_gap: metrics.scale(metrics.typo_line_gap, size),
        size,
        glyphs,
        underline_position: metrics.scale(metrics.underline_position, size),
        underline_thickness: metrics.scale(metrics.underline_thickness, size),
    })
}
