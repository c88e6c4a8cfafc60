//! # Glyph Table
//!
//! One variable-length bit-packed blob per glyph ID:
//!
//! ```text
//! [advance: advance_width_bits, signed]   omitted when monospaced
//! [x, y: xy_bits each, signed]
//! [w, h: wh_bits each]
//! [pixels: raw bpp-bit samples, or RLE]   see `font::compress`
//! ```
//!
//! Blobs are padded to a whole byte and concatenated in ID order after the
//! 8-byte table header. ID 0 is an empty placeholder. The C output stores
//! only the pixel part; metrics go to the `glyph_dsc` array instead.

use std::iter;

use log::debug;

use super::{long_dump, table_finish, table_start, TableWriter};
use crate::font::bits::{align4, BitReader, BitWriter};
use crate::font::compress::{compress, decompress, prefilter, unfilter};
use crate::font::{Compression, FontModel};
use crate::glyph::{reduce_depth, BBox, Glyph};

pub const GLYF_HEADER_LENGTH: usize = 8;

/// Limits of the small LVGL glyph descriptor.
const LV_SMALL_BOX_MAX: u32 = 255;
const LV_SMALL_OFS_MAX: i32 = 127;
const LV_SMALL_ADV_MAX: i32 = 4096;
const LV_SMALL_BITMAP_MAX: usize = 1024 * 1024;

/// A glyph read back from its compiled blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGlyph {
    /// Stored advance (integer or ×16), `None` for monospaced fonts.
    pub advance: Option<i32>,
    pub bbox: BBox,
    /// `bpp`-bit samples, `bbox.height` rows of `bbox.width`.
    pub pixels: Vec<Vec<u8>>,
}

fn bpp_rows(glyph: &Glyph, bpp: u8) -> Vec<Vec<u8>> {
    glyph
        .pixels
        .iter()
        .map(|row| row.iter().map(|&p| reduce_depth(p, bpp)).collect())
        .collect()
}

/// Append a glyph's pixel payload, raw or compressed per the model.
pub(crate) fn store_pixels(out: &mut BitWriter, font: &FontModel, glyph: &Glyph) {
    let bpp = font.bpp();
    let rows = bpp_rows(glyph, bpp);

    match font.compression {
        Compression::Raw => {
            for p in rows.iter().flatten() {
                out.write_bits(*p as u32, bpp);
            }
        }
        Compression::Rle => {
            let flat: Vec<u8> = rows.into_iter().flatten().collect();
            compress(out, &flat, bpp);
        }
        Compression::RlePrefiltered => {
            let flat: Vec<u8> = prefilter(&rows).into_iter().flatten().collect();
            compress(out, &flat, bpp);
        }
    }
}

fn compile_glyph(font: &FontModel, index: usize, glyph: &Glyph) -> Vec<u8> {
    let mut bw = BitWriter::new();

    if !font.monospaced {
        bw.write_signed(font.stored_advance(index), font.advance_width_bits);
    }

    bw.write_signed(glyph.bbox.x, font.xy_bits);
    bw.write_signed(glyph.bbox.y, font.xy_bits);
    bw.write_bits(glyph.bbox.width, font.wh_bits);
    bw.write_bits(glyph.bbox.height, font.wh_bits);

    store_pixels(&mut bw, font, glyph);

    bw.into_bytes()
}

/// Compile every glyph blob, indexed by glyph ID (entry 0 empty).
pub fn compile_glyphs(font: &FontModel) -> Vec<Vec<u8>> {
    let blobs: Vec<Vec<u8>> = iter::once(Vec::new())
        .chain(
            font.glyphs()
                .iter()
                .enumerate()
                .map(|(i, g)| compile_glyph(font, i, g)),
        )
        .collect();
    debug!(
        "compiled {} glyph blobs, {} bytes",
        blobs.len() - 1,
        blobs.iter().map(Vec::len).sum::<usize>()
    );
    blobs
}

/// Pixel payload alone, as stored in the C `glyph_bitmap` array.
fn lv_bitmap(font: &FontModel, glyph: &Glyph) -> Vec<u8> {
    let mut bw = BitWriter::new();
    store_pixels(&mut bw, font, glyph);
    bw.into_bytes()
}

fn code_comment(code: u32) -> String {
    let quoted = match char::from_u32(code) {
        Some(c) => serde_json::to_string(&c.to_string()).unwrap_or_default(),
        None => format!("\"\\u{:04x}\"", code),
    };
    format!("/* U+{:04X} {} */", code, quoted)
}

pub struct GlyfTable<'a> {
    font: &'a FontModel,
}

impl<'a> GlyfTable<'a> {
    pub fn new(font: &'a FontModel) -> Self {
        Self { font }
    }

    /// Final table size in bytes, header and padding included.
    pub fn size(&self) -> usize {
        let data: usize = self.font.glyf_data().iter().map(Vec::len).sum();
        align4(GLYF_HEADER_LENGTH + data)
    }

    /// Byte offset of a glyph blob from the start of the table.
    pub fn offset(&self, id: u16) -> usize {
        let data = self.font.glyf_data();
        let end = (id as usize).min(data.len());
        GLYF_HEADER_LENGTH + data[..end].iter().map(Vec::len).sum::<usize>()
    }

    /// Read a compiled glyph back. `None` for ID 0, unknown IDs, or a
    /// truncated blob.
    pub fn decode_glyph(&self, id: u16) -> Option<DecodedGlyph> {
        let f = self.font;
        if id == 0 {
            return None;
        }
        let blob = f.glyf_data().get(id as usize)?;
        let mut br = BitReader::new(blob);
        let bpp = f.bpp();

        let advance = if f.monospaced {
            None
        } else {
            Some(br.read_signed(f.advance_width_bits)?)
        };
        let x = br.read_signed(f.xy_bits)?;
        let y = br.read_signed(f.xy_bits)?;
        let width = br.read_bits(f.wh_bits)?;
        let height = br.read_bits(f.wh_bits)?;
        let count = width as usize * height as usize;

        let flat = match f.compression {
            Compression::Raw => (0..count)
                .map(|_| br.read_bits(bpp).map(|v| v as u8))
                .collect::<Option<Vec<u8>>>()?,
            Compression::Rle | Compression::RlePrefiltered => decompress(&mut br, count, bpp)?,
        };

        let mut pixels: Vec<Vec<u8>> = if width == 0 {
            vec![Vec::new(); height as usize]
        } else {
            flat.chunks(width as usize).map(<[u8]>::to_vec).collect()
        };
        if f.compression == Compression::RlePrefiltered {
            pixels = unfilter(&pixels);
        }

        Some(DecodedGlyph {
            advance,
            bbox: BBox {
                x,
                y,
                width,
                height,
            },
            pixels,
        })
    }

    /// Pixel-only payloads for the C output, in glyph ID order (ID 1 first).
    pub fn lv_bitmaps(&self) -> Vec<Vec<u8>> {
        self.font
            .glyphs()
            .iter()
            .map(|g| lv_bitmap(self.font, g))
            .collect()
    }

    /// True when some glyph or the bitmap total exceeds the small LVGL
    /// descriptor, so the C output must require `LV_FONT_FMT_TXT_LARGE`.
    pub fn needs_large_format(&self) -> bool {
        let glyph_too_large = self.font.glyphs().iter().any(|g| {
            g.bbox.width > LV_SMALL_BOX_MAX
                || g.bbox.height > LV_SMALL_BOX_MAX
                || g.bbox.x.unsigned_abs() > LV_SMALL_OFS_MAX.unsigned_abs()
                || g.bbox.y.unsigned_abs() > LV_SMALL_OFS_MAX.unsigned_abs()
                || (g.advance_width * 16.0).round() > LV_SMALL_ADV_MAX as f64
        });
        let total: usize = self.lv_bitmaps().iter().map(Vec::len).sum();
        glyph_too_large || total > LV_SMALL_BITMAP_MAX
    }

    fn bitmaps_text(&self, bitmaps: &[Vec<u8>]) -> String {
        let glyphs = self.font.glyphs();
        let mut out = String::new();

        for (i, (glyph, bin)) in glyphs.iter().zip(bitmaps).enumerate() {
            out.push_str(&format!(
                "    {}\n{}",
                code_comment(glyph.code),
                long_dump(bin, true)
            ));
            if i + 1 < glyphs.len() {
                // no comma after an empty bitmap
                out.push_str(if bin.is_empty() { "\n" } else { ",\n\n" });
            }
        }
        out
    }

    fn glyph_dsc_text(&self, bitmaps: &[Vec<u8>]) -> String {
        let mut lines = vec![
            "    {.bitmap_index = 0, .adv_w = 0, .box_w = 0, .box_h = 0, .ofs_x = 0, .ofs_y = 0} /* id = 0 reserved */"
                .to_string(),
        ];
        let mut offset = 0usize;

        for (glyph, bin) in self.font.glyphs().iter().zip(bitmaps) {
            let b = glyph.bbox;
            lines.push(format!(
                "    {{.bitmap_index = {}, .adv_w = {}, .box_w = {}, .box_h = {}, .ofs_x = {}, .ofs_y = {}}}",
                offset,
                (glyph.advance_width * 16.0).round() as i64,
                b.width,
                b.height,
                b.x,
                b.y
            ));
            offset += bin.len();
        }
        lines.join(",\n")
    }
}

impl TableWriter for GlyfTable<'_> {
    fn emit_binary(&self) -> Vec<u8> {
        let mut buf = table_start(b"glyf", GLYF_HEADER_LENGTH);
        for blob in self.font.glyf_data() {
            buf.extend_from_slice(blob);
        }
        let buf = table_finish(buf);
        debug!("glyf table size = {}", buf.len());
        buf
    }

    fn emit_source_text(&self, _font_name: &str) -> String {
        let bitmaps = self.lv_bitmaps();
        format!(
            "/*-----------------
 *    BITMAPS
 *----------------*/

/*Store the image of the glyphs*/
static LV_ATTRIBUTE_LARGE_CONST const uint8_t glyph_bitmap[] = {{
{}
}};


/*---------------------
 *  GLYPH DESCRIPTION
 *--------------------*/

static const lv_font_fmt_txt_glyph_dsc_t glyph_dsc[] = {{
{}
}};",
            self.bitmaps_text(&bitmaps),
            self.glyph_dsc_text(&bitmaps)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::bits::read_u32_at;
    use crate::font::test_support::{font, glyph};
    use crate::glyph::expand_depth;
    use crate::options::{Bpp, BuildOptions};

    fn opts(bpp: Bpp) -> BuildOptions {
        BuildOptions {
            bpp,
            ..Default::default()
        }
    }

    fn shaded(code: u32, advance: f64) -> Glyph {
        let mut g = glyph(code, advance, 4, 3, 0);
        g.bbox.x = -1;
        g.bbox.y = -2;
        g.pixels = vec![
            vec![0, 128, 255, 255],
            vec![0, 128, 255, 255],
            vec![17, 17, 17, 200],
        ];
        g
    }

    #[test]
    fn test_blob_bit_layout_raw() {
        let mut g = glyph(65, 6.0, 2, 1, 0);
        g.pixels = vec![vec![255, 0]];
        let m = FontModel::new(font(vec![g]), opts(Bpp::One)).unwrap();
        // x:1 y:1 w:2 h:2 then two 1-bit pixels, no advance (monospaced)
        assert_eq!(m.glyf_data()[1], vec![0b0010_0110]);
    }

    #[test]
    fn test_monospaced_blobs_omit_advance() {
        let mono = FontModel::new(
            font(vec![shaded(65, 6.0), shaded(66, 6.0)]),
            opts(Bpp::Four),
        )
        .unwrap();
        let prop = FontModel::new(
            font(vec![shaded(65, 6.0), shaded(66, 7.0)]),
            opts(Bpp::Four),
        )
        .unwrap();
        assert!(mono.monospaced);
        assert!(!prop.monospaced);

        let advance_bits = prop.advance_width_bits as usize;
        let mono_bits = 2 * mono.xy_bits as usize + 2 * mono.wh_bits as usize;
        assert_eq!(mono.glyf().decode_glyph(1).unwrap().advance, None);
        assert_eq!(prop.glyf().decode_glyph(2).unwrap().advance, Some(7));
        assert!(prop.glyf_data()[1].len() * 8 >= mono_bits + advance_bits);
    }

    #[test]
    fn test_decode_every_compression() {
        let variants = [
            opts(Bpp::Four),
            opts(Bpp::One),
            opts(Bpp::Eight),
            BuildOptions {
                no_prefilter: true,
                bpp: Bpp::Two,
                ..Default::default()
            },
            BuildOptions {
                no_compress: true,
                bpp: Bpp::Three,
                ..Default::default()
            },
        ];
        for o in variants {
            let bpp = o.bpp.bits();
            let m = FontModel::new(font(vec![shaded(65, 6.0), shaded(66, 9.5)]), o).unwrap();
            let decoded = m.glyf().decode_glyph(2).unwrap();
            assert_eq!(decoded.bbox, m.glyphs()[1].bbox);
            assert_eq!(decoded.advance, Some(10));

            let expected: Vec<Vec<u8>> = m.glyphs()[1]
                .pixels
                .iter()
                .map(|r| r.iter().map(|&p| reduce_depth(p, bpp)).collect())
                .collect();
            assert_eq!(decoded.pixels, expected, "bpp {}", bpp);
        }
    }

    #[test]
    fn test_decode_full_opacity_expands_back() {
        let m = FontModel::new(font(vec![glyph(65, 6.0, 2, 2, 255)]), opts(Bpp::Two)).unwrap();
        let decoded = m.glyf().decode_glyph(1).unwrap();
        assert!(decoded
            .pixels
            .iter()
            .flatten()
            .all(|&p| expand_depth(p, 2) == 255));
        assert_eq!(m.glyf().decode_glyph(0), None);
        assert_eq!(m.glyf().decode_glyph(9), None);
    }

    #[test]
    fn test_offsets_and_binary() {
        let m = FontModel::new(
            font(vec![shaded(65, 6.0), shaded(66, 7.0), glyph(67, 3.0, 0, 0, 0)]),
            opts(Bpp::Four),
        )
        .unwrap();
        let t = m.glyf();
        let data = m.glyf_data();
        assert_eq!(data.len(), 4);
        assert!(data[0].is_empty());
        assert_eq!(t.offset(0), 8);
        assert_eq!(t.offset(1), 8);
        assert_eq!(t.offset(2), 8 + data[1].len());
        assert_eq!(t.offset(3), 8 + data[1].len() + data[2].len());

        let bin = t.emit_binary();
        assert_eq!(bin.len(), t.size());
        assert_eq!(bin.len() % 4, 0);
        assert_eq!(read_u32_at(&bin, 0) as usize, bin.len());
        assert_eq!(&bin[4..8], b"glyf");
        assert_eq!(&bin[t.offset(2)..t.offset(3)], data[2].as_slice());

        let empty = t.decode_glyph(3).unwrap();
        assert_eq!(empty.bbox.width, 0);
        assert!(empty.pixels.is_empty());
    }

    #[test]
    fn test_source_text() {
        let m = FontModel::new(
            font(vec![glyph(0x41, 6.0, 1, 1, 255), glyph(0x22, 6.5, 0, 0, 0)]),
            opts(Bpp::One),
        )
        .unwrap();
        let text = m.glyf().emit_source_text("f");
        assert!(text.contains("/* U+0022 \"\\\"\" */"));
        assert!(text.contains("    /* U+0041 \"A\" */\n    0x80"));
        assert!(text.contains("{.bitmap_index = 0, .adv_w = 104, .box_w = 0, .box_h = 0, .ofs_x = 0, .ofs_y = 0}"));
        assert!(text.contains("{.bitmap_index = 0, .adv_w = 96, .box_w = 1, .box_h = 1, .ofs_x = 0, .ofs_y = 0}"));
        assert!(!m.glyf().needs_large_format());
    }

    #[test]
    fn test_large_format_guard() {
        let m = FontModel::new(font(vec![glyph(65, 300.0, 1, 1, 255)]), opts(Bpp::One)).unwrap();
        assert!(m.glyf().needs_large_format());
    }
}
