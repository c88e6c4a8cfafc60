//! # LVGL C Source
//!
//! Renders the model as an `lv_font_fmt_txt` font: one C file with the
//! bitmap, glyph descriptor, cmap and kerning arrays followed by the font
//! descriptors. Field values are the same ones the binary tables carry; the
//! loca table is left out since C arrays are indexed directly.

use std::path::Path;

use crate::font::tables::TableWriter;
use crate::font::FontModel;

/// Font symbol name, taken from the output file stem.
pub fn font_name(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font".to_string())
}

fn large_format_guard(font: &FontModel, guard_name: &str) -> String {
    if !font.glyf().needs_large_format() {
        return String::new();
    }
    format!(
        "#if (LV_FONT_FMT_TXT_LARGE == 0)
#  error \"Too large font or glyphs in {}. Enable LV_FONT_FMT_TXT_LARGE in lv_conf.h\"
#endif
",
        guard_name
    )
}

pub fn write(font: &FontModel, font_name: &str, command_line: &str) -> String {
    let guard_name = font_name.to_uppercase();
    let include = font.opts.lv_include.as_deref().unwrap_or("lvgl/lvgl.h");
    let kern = font
        .kern()
        .map(|k| k.emit_source_text(font_name))
        .unwrap_or_default();

    format!(
        "/*******************************************************************************
 * Size: {size} px
 * Bpp: {bpp}
 * Opts: {opts}
 ******************************************************************************/

#ifdef LV_LVGL_H_INCLUDE_SIMPLE
#include \"lvgl.h\"
#else
#include \"{include}\"
#endif

#ifndef {guard}
#define {guard} 1
#endif

#if {guard}

{glyf}

{cmap}

{kern}

{head}

{large}

#endif /*#if {guard}*/

",
        size = font.src.size,
        bpp = font.bpp(),
        opts = command_line,
        include = include,
        guard = guard_name,
        glyf = font.glyf().emit_source_text(font_name),
        cmap = font.cmap().emit_source_text(font_name),
        kern = kern,
        head = font.head().emit_source_text(font_name),
        large = large_format_guard(font, &guard_name),
    )
}
