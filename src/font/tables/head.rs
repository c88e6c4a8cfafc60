//! The `head` table: font-wide metrics and every format decision a decoder
//! needs before it can read the other tables.


use log::debug;

use super::{table_finish, table_start, TableWriter};
use crate::error::FontError;
use crate::font::tables::kern::KernFormat;
use crate::font::FontModel;
use crate::options::SubpixelMode;

pub const HEAD_LENGTH: usize = 48;
const VERSION: u32 = 1;

pub struct HeadTable<'a> {
    font: &'a FontModel,
}

fn check_u16(field: &'static str, value: i32) -> Result<(), FontError> {
    if u16::try_from(value).is_err() {
        return Err(FontError::overflow(field, value as i64, u16::MAX as i64));
    }
    Ok(())
}

fn check_i16(field: &'static str, value: i32) -> Result<(), FontError> {
    if i16::try_from(value).is_err() {
        return Err(FontError::overflow(field, value as i64, i16::MAX as i64));
    }
    Ok(())
}

impl<'a> HeadTable<'a> {
    pub fn new(font: &'a FontModel) -> Self {
        Self { font }
    }

    /// Number of tables following `head` in the binary font.
    pub fn table_count(&self) -> u16 {
        if self.font.has_kerning() {
            4
        } else {
            3
        }
    }

    fn default_advance(&self) -> i32 {
        let f = self.font;
        if f.monospaced {
            f.stored_advance(0)
        } else {
            0
        }
    }

    /// Range-check every metric against its field. The model runs this on
    /// construction, so encoding never truncates.
    pub fn validate(&self) -> Result<(), FontError> {
        let f = self.font;
        let src = &f.src;
        check_u16("ascent", src.ascent)?;
        check_i16("descent", src.descent)?;
        check_u16("typographic ascent", src.typo_ascent)?;
        check_i16("typographic descent", src.typo_descent)?;
        check_u16("typographic line gap", src.typo_line_gap)?;
        check_i16("min y", f.min_y)?;
        check_i16("max y", f.max_y)?;
        check_u16("default advance width", self.default_advance())?;
        check_i16("underline position", src.underline_position)?;
        check_u16("underline thickness", src.underline_thickness)?;
        Ok(())
    }

    /// `(kern_dsc, kern_scale, kern_classes)` for the C font descriptor.
    fn kern_ref(&self) -> (&'static str, String, u8) {
        let f = self.font;
        match f.kern_selection() {
            None => ("NULL", "0".to_string(), 0),
            Some(sel) => {
                let scale = f.kerning_scale_fixed().to_string();
                match sel.format {
                    KernFormat::Pairs => ("&kern_pairs", scale, 0),
                    KernFormat::Classes => ("&kern_classes", scale, 1),
                }
            }
        }
    }
}

impl TableWriter for HeadTable<'_> {
    fn emit_binary(&self) -> Vec<u8> {
        let f = self.font;
        let src = &f.src;
        let mut buf = table_start(b"head", 8);

        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&self.table_count().to_le_bytes());
        buf.extend_from_slice(&src.size.to_le_bytes());
        buf.extend_from_slice(&(src.ascent as u16).to_le_bytes());
        buf.extend_from_slice(&(src.descent as i16).to_le_bytes());
        buf.extend_from_slice(&(src.typo_ascent as u16).to_le_bytes());
        buf.extend_from_slice(&(src.typo_descent as i16).to_le_bytes());
        buf.extend_from_slice(&(src.typo_line_gap as u16).to_le_bytes());
        buf.extend_from_slice(&(f.min_y as i16).to_le_bytes());
        buf.extend_from_slice(&(f.max_y as i16).to_le_bytes());
        buf.extend_from_slice(&(self.default_advance() as u16).to_le_bytes());
        buf.extend_from_slice(&f.kerning_scale_fixed().to_le_bytes());

        buf.push(f.index_to_loc_format.code());
        buf.push(f.glyph_id_format.code());
        buf.push(f.advance_width_format.code());
        buf.push(f.bpp());
        buf.push(f.xy_bits);
        buf.push(f.wh_bits);
        buf.push(if f.monospaced { 0 } else { f.advance_width_bits });
        buf.push(f.compression.code());
        buf.push(f.subpixels.code());
        // reserved
        buf.push(0);

        buf.extend_from_slice(&(src.underline_position as i16).to_le_bytes());
        buf.extend_from_slice(&(src.underline_thickness as u16).to_le_bytes());

        let buf = table_finish(buf);
        debug_assert_eq!(buf.len(), HEAD_LENGTH);
        debug!("head table size = {}", buf.len());
        buf
    }

    fn emit_source_text(&self, font_name: &str) -> String {
        let f = self.font;
        let (kern_dsc, kern_scale, kern_classes) = self.kern_ref();
        let subpx = match f.subpixels {
            SubpixelMode::None => "LV_FONT_SUBPX_NONE",
            SubpixelMode::Horizontal => "LV_FONT_SUBPX_HOR",
            SubpixelMode::Vertical => "LV_FONT_SUBPX_VER",
        };

        format!(
            "/*--------------------
 *  ALL CUSTOM DATA
 *--------------------*/

#if LV_VERSION_CHECK(8, 0, 0)
/*Store all the custom data of the font*/
static  lv_font_fmt_txt_glyph_cache_t cache;
static const lv_font_fmt_txt_dsc_t font_dsc = {{
#else
static lv_font_fmt_txt_dsc_t font_dsc = {{
#endif
    .glyph_bitmap = glyph_bitmap,
    .glyph_dsc = glyph_dsc,
    .cmaps = cmaps,
    .kern_dsc = {kern_dsc},
    .kern_scale = {kern_scale},
    .cmap_num = {cmap_num},
    .bpp = {bpp},
    .kern_classes = {kern_classes},
    .bitmap_format = {bitmap_format},
#if LV_VERSION_CHECK(8, 0, 0)
    .cache = &cache
#endif
}};


/*-----------------
 *  PUBLIC FONT
 *----------------*/

/*Initialize a public general font descriptor*/
#if LV_VERSION_CHECK(8, 0, 0)
const lv_font_t {name} = {{
#else
lv_font_t {name} = {{
#endif
    .get_glyph_dsc = lv_font_get_glyph_dsc_fmt_txt,    /*Function pointer to get glyph's data*/
    .get_glyph_bitmap = lv_font_get_bitmap_fmt_txt,    /*Function pointer to get glyph's bitmap*/
    .line_height = {line_height},          /*The maximum line height required by the font*/
    .base_line = {base_line},             /*Baseline measured from the bottom of the line*/
#if !(LVGL_VERSION_MAJOR == 6 && LVGL_VERSION_MINOR == 0)
    .subpx = {subpx},
#endif
#if LV_VERSION_CHECK(7, 4, 0) || LVGL_VERSION_MAJOR >= 8
    .underline_position = {underline_position},
    .underline_thickness = {underline_thickness},
#endif
    .dsc = &font_dsc           /*The custom font data. Will be accessed by `get_glyph_bitmap/dsc` */
}};",
            kern_dsc = kern_dsc,
            kern_scale = kern_scale,
            cmap_num = f.cmap_subtables().len(),
            bpp = f.bpp(),
            kern_classes = kern_classes,
            bitmap_format = f.compression.code(),
            name = font_name,
            line_height = f.src.ascent - f.src.descent,
            base_line = -f.src.descent,
            subpx = subpx,
            underline_position = f.src.underline_position,
            underline_thickness = f.src.underline_thickness,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::bits::{read_u16_at, read_u32_at};
    use crate::font::test_support::{font, glyph};
    use crate::options::{Bpp, BuildOptions};

    fn model(opts: BuildOptions) -> FontModel {
        let mut a = glyph(65, 6.0, 5, 7, 255);
        a.bbox.y = -2;
        let b = glyph(66, 7.0, 5, 7, 255);
        FontModel::new(font(vec![a, b]), opts).unwrap()
    }

    #[test]
    fn test_head_layout() {
        let m = model(BuildOptions {
            bpp: Bpp::Two,
            ..Default::default()
        });
        let bin = m.head().emit_binary();

        assert_eq!(bin.len(), HEAD_LENGTH);
        assert_eq!(read_u32_at(&bin, 0), 48);
        assert_eq!(&bin[4..8], b"head");
        assert_eq!(read_u32_at(&bin, 8), 1);
        assert_eq!(read_u16_at(&bin, 12), 3);
        assert_eq!(read_u16_at(&bin, 14), 10);
        assert_eq!(read_u16_at(&bin, 16), 8);
        assert_eq!(read_u16_at(&bin, 18) as i16, -2);
        assert_eq!(read_u16_at(&bin, 24), 1);
        // minY / maxY
        assert_eq!(read_u16_at(&bin, 26) as i16, -2);
        assert_eq!(read_u16_at(&bin, 28) as i16, 7);
        // not monospaced
        assert_eq!(read_u16_at(&bin, 30), 0);
        assert_eq!(read_u16_at(&bin, 32), 16);
        assert_eq!(bin[37], 2);
        assert_eq!(bin[40], m.advance_width_bits);
        assert_eq!(bin[41], 1);
        assert_eq!(bin[42], 0);
        assert_eq!(read_u16_at(&bin, 44) as i16, -1);
        assert_eq!(read_u16_at(&bin, 46), 1);
    }

    #[test]
    fn test_monospaced_head_stores_default_advance() {
        let data = font(vec![glyph(65, 6.0, 1, 1, 255), glyph(66, 6.0, 1, 1, 255)]);
        let m = FontModel::new(data, BuildOptions::default()).unwrap();
        let bin = m.head().emit_binary();
        assert_eq!(read_u16_at(&bin, 30), 6);
        assert_eq!(bin[40], 0);
    }

    #[test]
    fn test_source_text_descriptor() {
        let m = model(BuildOptions::default());
        let text = m.head().emit_source_text("my_font");
        assert!(text.contains("const lv_font_t my_font = {"));
        assert!(text.contains(".kern_dsc = NULL,"));
        assert!(text.contains(".cmap_num = 1,"));
        assert!(text.contains(".line_height = 10,"));
        assert!(text.contains(".base_line = 2,"));
        assert!(text.contains(".subpx = LV_FONT_SUBPX_NONE,"));
        assert!(text.contains(".bitmap_format = 1,"));
    }
}
