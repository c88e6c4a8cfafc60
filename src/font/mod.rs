//! # Font Model
//!
//! Derives every global format decision from the final glyph list and the
//! build options, then compiles the tables that depend on those decisions.
//!
//! Construction is a fixed bootstrap sequence:
//!
//! ```text
//! glyph list (sorted by code)
//!       ↓
//!   glyph IDs, min/max Y, glyph ID format
//!       ↓
//!   kerning scale, advance width format
//!       ↓
//!   xy/wh/advance bit widths, monospace flag, compression
//!       ↓
//!   [glyf]  compiled glyph blobs  →  index-to-loc format
//!       ↓
//!   [cmap]  subtable plan  ·  [kern]  pairs vs classes
//! ```
//!
//! After construction the model is read-only. Table views returned by
//! [`FontModel::head`], [`FontModel::cmap`] and friends borrow it and only
//! render what was decided here.

pub mod bits;
pub mod cmap_plan;
pub mod compress;
pub mod tables;

use std::collections::BTreeMap;

use log::debug;

use crate::error::FontError;
use crate::glyph::{FontData, Glyph};
use crate::options::{BuildOptions, SubpixelMode};
use bits::{signed_bits, unsigned_bits};
use tables::cmap::CmapSubtable;
use tables::kern::KernSelection;
use tables::{CmapTable, GlyfTable, HeadTable, KernTable, LocaTable};

/// Largest codepoint a glyph may carry.
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Largest kerning magnitude representable as FP4.4 before scaling kicks in.
const KERNING_FP_LIMIT: f64 = 7.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphIdFormat {
    OneByte,
    TwoBytes,
}

impl GlyphIdFormat {
    pub fn code(self) -> u8 {
        match self {
            GlyphIdFormat::OneByte => 0,
            GlyphIdFormat::TwoBytes => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexToLocFormat {
    /// 16-bit offsets.
    Short,
    /// 32-bit offsets.
    Long,
}

impl IndexToLocFormat {
    pub fn code(self) -> u8 {
        match self {
            IndexToLocFormat::Short => 0,
            IndexToLocFormat::Long => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceWidthFormat {
    /// Rounded whole pixels.
    Integer,
    /// Pixels × 16, keeps the sub-pixel precision kerning needs.
    FixedPoint,
}

impl AdvanceWidthFormat {
    pub fn code(self) -> u8 {
        match self {
            AdvanceWidthFormat::Integer => 0,
            AdvanceWidthFormat::FixedPoint => 1,
        }
    }

    /// Stored integer form of a real advance width. Values that do not fit
    /// an `i32` are reported rather than saturated.
    pub fn to_int(self, value: f64) -> Result<i32, FontError> {
        let rounded = match self {
            AdvanceWidthFormat::Integer => value.round(),
            AdvanceWidthFormat::FixedPoint => (value * 16.0).round(),
        };
        if !(i32::MIN as f64..=i32::MAX as f64).contains(&rounded) {
            return Err(FontError::overflow("advance width", rounded as i64, i32::MAX as i64));
        }
        Ok(rounded as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Raw,
    /// RLE over XOR-filtered rows.
    RlePrefiltered,
    Rle,
}

impl Compression {
    pub fn code(self) -> u8 {
        match self {
            Compression::Raw => 0,
            Compression::RlePrefiltered => 1,
            Compression::Rle => 2,
        }
    }
}

/// A validated glyph set plus every format decision derived from it.
///
/// The decisions are read-only outside the crate: the compiled glyph blobs,
/// cmap and kerning are built from them once, in [`FontModel::new`].
pub struct FontModel {
    pub(crate) src: FontData,
    pub(crate) opts: BuildOptions,
    glyph_ids: BTreeMap<u32, u16>,
    /// One past the highest glyph ID (ID 0 is reserved).
    pub(crate) last_id: u16,
    pub(crate) min_y: i32,
    pub(crate) max_y: i32,
    pub(crate) glyph_id_format: GlyphIdFormat,
    pub(crate) kerning_scale: f64,
    pub(crate) advance_width_format: AdvanceWidthFormat,
    pub(crate) xy_bits: u8,
    pub(crate) wh_bits: u8,
    pub(crate) advance_width_bits: u8,
    pub(crate) monospaced: bool,
    pub(crate) compression: Compression,
    pub(crate) index_to_loc_format: IndexToLocFormat,
    pub(crate) subpixels: SubpixelMode,
    /// Stored advance of each glyph, in glyph order.
    advances: Vec<i32>,
    has_kerning: bool,
    glyf_data: Vec<Vec<u8>>,
    cmap_subtables: Vec<CmapSubtable>,
    kern: Option<KernSelection>,
}

impl FontModel {
    pub fn new(mut src: FontData, opts: BuildOptions) -> Result<Self, FontError> {
        validate_glyphs(&mut src)?;
        let glyphs = &src.glyphs;

        // Zero is reserved for "missing glyph"
        let glyph_ids: BTreeMap<u32, u16> = glyphs
            .iter()
            .enumerate()
            .map(|(i, g)| (g.code, (i + 1) as u16))
            .collect();
        let last_id = (glyphs.len() + 1) as u16;
        debug!("last_id: {}", last_id);

        let min_y = glyphs.iter().map(|g| g.bbox.y).min().unwrap_or(0);
        debug!("minY: {}", min_y);
        let max_y = glyphs
            .iter()
            .map(|g| g.bbox.y + g.bbox.height as i32)
            .max()
            .unwrap_or(0);
        debug!("maxY: {}", max_y);

        let glyph_id_format = if last_id - 1 > 255 {
            GlyphIdFormat::TwoBytes
        } else {
            GlyphIdFormat::OneByte
        };
        debug!("glyphIdFormat: {}", glyph_id_format.code());

        let has_kerning = !opts.no_kerning && glyphs.iter().any(Glyph::has_kerning);

        let kerning_scale = if has_kerning {
            let kerning_max = glyphs
                .iter()
                .flat_map(|g| g.kerning.values())
                .map(|v| v.abs())
                .fold(0.0, f64::max);
            kerning_scale_for(kerning_max)
        } else {
            1.0
        };
        let scale_fp = (kerning_scale * 16.0).round();
        if scale_fp > u16::MAX as f64 {
            return Err(FontError::overflow(
                "kerning scale (FP12.4)",
                scale_fp as i64,
                u16::MAX as i64,
            ));
        }
        debug!("kerningScale: {}", kerning_scale);

        let advance_width_format = if has_kerning {
            AdvanceWidthFormat::FixedPoint
        } else {
            AdvanceWidthFormat::Integer
        };
        debug!("advanceWidthFormat: {}", advance_width_format.code());

        let xy_bits = glyphs
            .iter()
            .map(|g| signed_bits(g.bbox.x).max(signed_bits(g.bbox.y)))
            .max()
            .unwrap_or(0);
        debug!("xy_bits: {}", xy_bits);

        let wh_bits = glyphs
            .iter()
            .map(|g| unsigned_bits(g.bbox.width).max(unsigned_bits(g.bbox.height)))
            .max()
            .unwrap_or(0);
        debug!("wh_bits: {}", wh_bits);

        let advances = glyphs
            .iter()
            .map(|g| advance_width_format.to_int(g.advance_width))
            .collect::<Result<Vec<i32>, FontError>>()?;
        let advance_width_bits = advances.iter().map(|&a| signed_bits(a)).max().unwrap_or(0);
        debug!("advanceWidthBits: {}", advance_width_bits);

        let first_advance = glyphs[0].advance_width;
        let monospaced = glyphs.iter().all(|g| g.advance_width == first_advance);
        debug!("monospaced: {}", monospaced);

        let compression = if opts.no_compress || opts.bpp.bits() == 1 {
            Compression::Raw
        } else if opts.no_prefilter {
            Compression::Rle
        } else {
            Compression::RlePrefiltered
        };

        let subpixels = opts.subpixels;

        let mut model = FontModel {
            src,
            opts,
            glyph_ids,
            last_id,
            min_y,
            max_y,
            glyph_id_format,
            kerning_scale,
            advance_width_format,
            xy_bits,
            wh_bits,
            advance_width_bits,
            monospaced,
            compression,
            index_to_loc_format: IndexToLocFormat::Short,
            subpixels,
            advances,
            has_kerning,
            glyf_data: Vec::new(),
            cmap_subtables: Vec::new(),
            kern: None,
        };

        // Offsets can only be sized once every glyph blob is known
        model.glyf_data = tables::glyf::compile_glyphs(&model);
        model.index_to_loc_format = if model.glyf().size() > 65535 {
            IndexToLocFormat::Long
        } else {
            IndexToLocFormat::Short
        };
        debug!("indexToLocFormat: {}", model.index_to_loc_format.code());
        debug!("subpixels_mode: {}", model.subpixels.code());

        model.head().validate()?;
        model.cmap_subtables = tables::cmap::build_subtables(&model)?;

        if model.has_kerning {
            model.kern = Some(tables::kern::select(&model)?);
        }

        Ok(model)
    }

    /// True iff kerning is enabled and at least one glyph carries kerning.
    pub fn has_kerning(&self) -> bool {
        self.has_kerning
    }

    pub fn glyph_id(&self, code: u32) -> Option<u16> {
        self.glyph_ids.get(&code).copied()
    }

    /// Glyphs sorted by code. The glyph at index `i` has ID `i + 1`.
    pub fn glyphs(&self) -> &[Glyph] {
        &self.src.glyphs
    }

    pub fn glyph_by_code(&self, code: u32) -> Option<&Glyph> {
        self.src
            .glyphs
            .binary_search_by_key(&code, |g| g.code)
            .ok()
            .map(|i| &self.src.glyphs[i])
    }

    pub fn bpp(&self) -> u8 {
        self.opts.bpp.bits()
    }

    /// Stored integer form of an advance width, per `advance_width_format`.
    pub fn advance_to_int(&self, value: f64) -> Result<i32, FontError> {
        self.advance_width_format.to_int(value)
    }

    /// Stored advance of the glyph at `index` (glyph ID `index + 1`).
    pub fn stored_advance(&self, index: usize) -> i32 {
        self.advances[index]
    }

    pub fn source(&self) -> &FontData {
        &self.src
    }

    pub fn options(&self) -> &BuildOptions {
        &self.opts
    }

    /// One past the highest glyph ID.
    pub fn last_id(&self) -> u16 {
        self.last_id
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn glyph_id_format(&self) -> GlyphIdFormat {
        self.glyph_id_format
    }

    pub fn kerning_scale(&self) -> f64 {
        self.kerning_scale
    }

    pub fn advance_width_format(&self) -> AdvanceWidthFormat {
        self.advance_width_format
    }

    pub fn xy_bits(&self) -> u8 {
        self.xy_bits
    }

    pub fn wh_bits(&self) -> u8 {
        self.wh_bits
    }

    pub fn advance_width_bits(&self) -> u8 {
        self.advance_width_bits
    }

    pub fn monospaced(&self) -> bool {
        self.monospaced
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn index_to_loc_format(&self) -> IndexToLocFormat {
        self.index_to_loc_format
    }

    pub fn subpixels(&self) -> SubpixelMode {
        self.subpixels
    }

    /// Convert a kerning value to FP4.4, after dividing by `kerning_scale`.
    pub fn kerning_to_fixed(&self, value: f64) -> Result<i8, FontError> {
        let fixed = (value / self.kerning_scale * 16.0).round();
        if fixed < i8::MIN as f64 || fixed > i8::MAX as f64 {
            return Err(FontError::overflow(
                "kerning value (FP4.4)",
                fixed as i64,
                i8::MAX as i64,
            ));
        }
        Ok(fixed as i8)
    }

    /// `kerning_scale` as stored in the head table (FP12.4).
    pub fn kerning_scale_fixed(&self) -> u16 {
        (self.kerning_scale * 16.0).round() as u16
    }

    /// Compiled glyph blobs indexed by glyph ID; entry 0 is empty.
    pub fn glyf_data(&self) -> &[Vec<u8>] {
        &self.glyf_data
    }

    pub fn cmap_subtables(&self) -> &[CmapSubtable] {
        &self.cmap_subtables
    }

    pub fn kern_selection(&self) -> Option<&KernSelection> {
        self.kern.as_ref()
    }

    pub fn head(&self) -> HeadTable<'_> {
        HeadTable::new(self)
    }

    pub fn cmap(&self) -> CmapTable<'_> {
        CmapTable::new(self)
    }

    pub fn loca(&self) -> LocaTable<'_> {
        LocaTable::new(self)
    }

    pub fn glyf(&self) -> GlyfTable<'_> {
        GlyfTable::new(self)
    }

    /// The kerning table, absent when the font has no kerning.
    pub fn kern(&self) -> Option<KernTable<'_>> {
        self.kern.as_ref().map(|selection| KernTable::new(self, selection))
    }
}

/// Smallest FP12.4 scale that brings `kerning_max` into FP4.4 range.
pub fn kerning_scale_for(kerning_max: f64) -> f64 {
    if kerning_max >= KERNING_FP_LIMIT {
        (kerning_max / KERNING_FP_LIMIT * 16.0).ceil() / 16.0
    } else {
        1.0
    }
}

/// Sort glyphs by code and check the invariants the model relies on.
fn validate_glyphs(src: &mut FontData) -> Result<(), FontError> {
    if src.glyphs.is_empty() {
        return Err(FontError::InvalidGlyph("glyph list is empty".to_string()));
    }
    let max_glyphs = u16::MAX as usize - 1;
    if src.glyphs.len() > max_glyphs {
        return Err(FontError::overflow(
            "glyph count",
            src.glyphs.len() as i64,
            max_glyphs as i64,
        ));
    }

    src.glyphs.sort_by_key(|g| g.code);

    for pair in src.glyphs.windows(2) {
        if pair[0].code == pair[1].code {
            return Err(FontError::InvalidGlyph(format!(
                "duplicate glyph code U+{:04X}",
                pair[0].code
            )));
        }
    }

    for glyph in &src.glyphs {
        if glyph.code == 0 {
            return Err(FontError::InvalidGlyph(
                "code 0 is reserved and cannot hold a glyph".to_string(),
            ));
        }
        if glyph.code > MAX_CODEPOINT {
            return Err(FontError::InvalidGlyph(format!(
                "code 0x{:X} is out of unicode range",
                glyph.code
            )));
        }
        if !glyph.advance_width.is_finite() {
            return Err(FontError::InvalidGlyph(format!(
                "U+{:04X} has a non-finite advance width",
                glyph.code
            )));
        }

        let bbox = glyph.bbox;
        let limit = i32::MAX as u32;
        if bbox.width > limit || bbox.height > limit {
            return Err(FontError::InvalidGlyph(format!(
                "U+{:04X} bounding box {}x{} is too large",
                glyph.code, bbox.width, bbox.height
            )));
        }
        // Right and top edges must be representable too
        if bbox.x.checked_add(bbox.width as i32).is_none()
            || bbox.y.checked_add(bbox.height as i32).is_none()
        {
            return Err(FontError::InvalidGlyph(format!(
                "U+{:04X} bounding box at ({}, {}) extends past the coordinate range",
                glyph.code, bbox.x, bbox.y
            )));
        }

        let samples: usize = glyph.pixels.iter().map(Vec::len).sum();
        let area = (bbox.width as usize)
            .checked_mul(bbox.height as usize)
            .ok_or_else(|| {
                FontError::InvalidGlyph(format!(
                    "U+{:04X} bounding box {}x{} is too large",
                    glyph.code, bbox.width, bbox.height
                ))
            })?;
        let rows_match = area == 0
            || (glyph.pixels.len() == bbox.height as usize
                && glyph.pixels.iter().all(|row| row.len() == bbox.width as usize));
        if samples != area || !rows_match {
            return Err(FontError::InvalidGlyph(format!(
                "U+{:04X} pixel grid does not match its {}x{} bounding box",
                glyph.code, bbox.width, bbox.height
            )));
        }
    }

    for glyph in &src.glyphs {
        for (&partner, &value) in &glyph.kerning {
            if src.glyphs.binary_search_by_key(&partner, |g| g.code).is_err() {
                return Err(FontError::InvalidGlyph(format!(
                    "U+{:04X} kerns against U+{:04X}, which is not in the glyph set",
                    glyph.code, partner
                )));
            }
            if !value.is_finite() {
                return Err(FontError::InvalidGlyph(format!(
                    "U+{:04X} has a non-finite kerning value",
                    glyph.code
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use crate::glyph::{BBox, FontData, Glyph};

    /// A `width`×`height` glyph filled with one sample value.
    pub fn glyph(code: u32, advance: f64, width: u32, height: u32, fill: u8) -> Glyph {
        Glyph {
            code,
            advance_width: advance,
            bbox: BBox {
                x: 0,
                y: 0,
                width,
                height,
            },
            kerning: BTreeMap::new(),
            pixels: vec![vec![fill; width as usize]; height as usize],
        }
    }

    pub fn font(glyphs: Vec<Glyph>) -> FontData {
        FontData {
            ascent: 8,
            descent: -2,
            typo_ascent: 8,
            typo_descent: -2,
            typo_line_gap: 1,
            size: 10,
            glyphs,
            underline_position: -1,
            underline_thickness: 1,
        }
    }
}
