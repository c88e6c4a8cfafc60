//! # Debug Dump
//!
//! A directory for eyeballing what the binary font really stores: one
//! grayscale PNG per non-empty glyph, decoded back from its compiled blob,
//! plus `font_info.json` with metrics, model decisions and glyph records.
//! With `fullInfo` the JSON keeps the 8-bit pixel rows, which makes it a
//! valid input for [`compile_json`](crate::compile_json).

use std::collections::BTreeMap;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use serde::Serialize;

use crate::error::FontError;
use crate::font::FontModel;
use crate::glyph::{expand_depth, BBox};
use crate::options::SubpixelMode;

pub const INFO_FILE: &str = "font_info.json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    last_id: u16,
    bpp: u8,
    glyph_id_format: u8,
    kerning_scale: f64,
    advance_width_format: u8,
    xy_bits: u8,
    wh_bits: u8,
    advance_width_bits: u8,
    monospaced: bool,
    compression: u8,
    index_to_loc_format: u8,
    subpixels: SubpixelMode,
    cmap_subtables: usize,
    kern_format: Option<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GlyphInfo<'a> {
    code: u32,
    id: u16,
    advance_width: f64,
    bbox: BBox,
    kerning: &'a BTreeMap<u32, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixels: Option<&'a Vec<Vec<u8>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FontInfo<'a> {
    size: u16,
    ascent: i32,
    descent: i32,
    typo_ascent: i32,
    typo_descent: i32,
    typo_line_gap: i32,
    underline_position: i32,
    underline_thickness: i32,
    model: ModelInfo,
    glyphs: Vec<GlyphInfo<'a>>,
}

fn font_info(font: &FontModel) -> FontInfo<'_> {
    let src = &font.src;
    let full = font.opts.full_info;

    FontInfo {
        size: src.size,
        ascent: src.ascent,
        descent: src.descent,
        typo_ascent: src.typo_ascent,
        typo_descent: src.typo_descent,
        typo_line_gap: src.typo_line_gap,
        underline_position: src.underline_position,
        underline_thickness: src.underline_thickness,
        model: ModelInfo {
            last_id: font.last_id,
            bpp: font.bpp(),
            glyph_id_format: font.glyph_id_format.code(),
            kerning_scale: font.kerning_scale,
            advance_width_format: font.advance_width_format.code(),
            xy_bits: font.xy_bits,
            wh_bits: font.wh_bits,
            advance_width_bits: font.advance_width_bits,
            monospaced: font.monospaced,
            compression: font.compression.code(),
            index_to_loc_format: font.index_to_loc_format.code(),
            subpixels: font.subpixels,
            cmap_subtables: font.cmap_subtables().len(),
            kern_format: font.kern_selection().map(|k| k.format.code()),
        },
        glyphs: font
            .glyphs()
            .iter()
            .enumerate()
            .map(|(i, g)| GlyphInfo {
                code: g.code,
                id: (i + 1) as u16,
                advance_width: g.advance_width,
                bbox: g.bbox,
                kerning: &g.kerning,
                pixels: full.then_some(&g.pixels),
            })
            .collect(),
    }
}

/// PNG file name for a glyph.
pub fn png_name(code: u32) -> String {
    format!("{:04x}.png", code)
}

/// Encode an 8-bit grayscale image.
fn encode_png(samples: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FontError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder.write_image(samples, width, height, ColorType::L8)?;
    Ok(buf)
}

/// Render the dump as `(file name, content)` pairs.
pub fn write(font: &FontModel) -> Result<Vec<(String, Vec<u8>)>, FontError> {
    let mut files = Vec::new();
    let glyf = font.glyf();
    let bpp = font.bpp();

    for (i, glyph) in font.glyphs().iter().enumerate() {
        if glyph.bbox.width == 0 || glyph.bbox.height == 0 {
            continue;
        }
        let decoded = glyf.decode_glyph((i + 1) as u16).ok_or_else(|| {
            FontError::InvalidGlyph(format!("cannot decode U+{:04X} back", glyph.code))
        })?;
        let samples: Vec<u8> = decoded
            .pixels
            .iter()
            .flatten()
            .map(|&p| expand_depth(p, bpp))
            .collect();
        let png = encode_png(&samples, decoded.bbox.width, decoded.bbox.height)?;
        files.push((png_name(glyph.code), png));
    }

    let info = serde_json::to_vec_pretty(&font_info(font)).map_err(FontError::Serialize)?;
    files.push((INFO_FILE.to_string(), info));

    Ok(files)
}
