//! # Character Map Table
//!
//! Codepoint → glyph ID mapping, stored as the subtables chosen by
//! [`plan_subtables`](crate::font::cmap_plan::plan_subtables).
//!
//! ```text
//! | size | "cmap" | count: u32 |
//! | subheader 0 (16 bytes) | ... | subheader n-1 |
//! | payload 0 (4-aligned)  | ... | payload n-1   |
//! ```


use log::debug;

use super::{long_dump, table_finish, table_start, TableWriter};
use crate::error::FontError;
use crate::font::bits::pad4;
use crate::font::cmap_plan::{plan_subtables, SubtableFormat, SUBTABLE_HEADER_SIZE};
use crate::font::FontModel;

pub const CMAP_HEADER_LENGTH: usize = 12;

/// One compiled subtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapSubtable {
    pub format: SubtableFormat,
    pub range_start: u32,
    pub range_length: u16,
    pub glyph_id_start: u16,
    /// Codepoint deltas from `range_start` (sparse formats only).
    pub unicode_list: Vec<u16>,
    /// Glyph ID deltas from `glyph_id_start`: one per codepoint of the range
    /// for format0 (0 = missing), one per element for full sparse.
    pub glyph_id_ofs_list: Vec<u16>,
}

impl CmapSubtable {
    /// Entry count stored in the binary subheader.
    pub fn entries(&self) -> u16 {
        match self.format {
            SubtableFormat::Format0 | SubtableFormat::Format0Tiny => self.range_length,
            SubtableFormat::Sparse | SubtableFormat::SparseTiny => self.unicode_list.len() as u16,
        }
    }

    /// Binary payload following all subheaders, padded to 4 bytes.
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self.format {
            SubtableFormat::Format0 => {
                buf.extend(self.glyph_id_ofs_list.iter().map(|&d| d as u8));
            }
            SubtableFormat::Format0Tiny => {}
            SubtableFormat::SparseTiny => {
                for code in &self.unicode_list {
                    buf.extend_from_slice(&code.to_le_bytes());
                }
            }
            SubtableFormat::Sparse => {
                for code in &self.unicode_list {
                    buf.extend_from_slice(&code.to_le_bytes());
                }
                for id in &self.glyph_id_ofs_list {
                    buf.extend_from_slice(&id.to_le_bytes());
                }
            }
        }
        pad4(&mut buf);
        buf
    }

    /// Resolve a codepoint the way the embedded driver does. `None` when the
    /// codepoint is outside this subtable or has no glyph.
    pub fn lookup(&self, code: u32) -> Option<u16> {
        let rcp = code.checked_sub(self.range_start)?;
        if rcp >= self.range_length as u32 {
            return None;
        }

        match self.format {
            SubtableFormat::Format0Tiny => Some(self.glyph_id_start + rcp as u16),
            SubtableFormat::Format0 => {
                let ofs = *self.glyph_id_ofs_list.get(rcp as usize)?;
                // Only the first codepoint can map to offset 0
                if ofs == 0 && rcp != 0 {
                    None
                } else {
                    Some(self.glyph_id_start + ofs)
                }
            }
            SubtableFormat::SparseTiny => {
                let idx = self.unicode_list.binary_search(&(rcp as u16)).ok()?;
                Some(self.glyph_id_start + idx as u16)
            }
            SubtableFormat::Sparse => {
                let idx = self.unicode_list.binary_search(&(rcp as u16)).ok()?;
                Some(self.glyph_id_start + self.glyph_id_ofs_list[idx])
            }
        }
    }

    fn lv_type(&self) -> &'static str {
        match self.format {
            SubtableFormat::Format0 => "LV_FONT_FMT_TXT_CMAP_FORMAT0_FULL",
            SubtableFormat::Format0Tiny => "LV_FONT_FMT_TXT_CMAP_FORMAT0_TINY",
            SubtableFormat::Sparse => "LV_FONT_FMT_TXT_CMAP_SPARSE_FULL",
            SubtableFormat::SparseTiny => "LV_FONT_FMT_TXT_CMAP_SPARSE_TINY",
        }
    }
}

/// Plan and compile the subtables for the model's glyph set.
pub fn build_subtables(font: &FontModel) -> Result<Vec<CmapSubtable>, FontError> {
    let codes: Vec<u32> = font.glyphs().iter().map(|g| g.code).collect();
    let plan = plan_subtables(&codes);

    let count_format0 = plan
        .segments
        .iter()
        .filter(|s| s.format == SubtableFormat::Format0)
        .count();
    debug!(
        "{} subtable(s): {} \"format 0\", {} other",
        plan.segments.len(),
        count_format0,
        plan.segments.len() - count_format0
    );

    let glyph_id = |code: u32| font.glyph_id(code).unwrap_or(0);

    plan.segments
        .iter()
        .map(|seg| {
            let seg_codes = &codes[seg.start..=seg.end];
            let min_code = seg_codes[0];
            let max_code = seg_codes[seg_codes.len() - 1];
            let start_id = glyph_id(min_code);

            let range = (max_code - min_code + 1) as i64;
            let range_length = u16::try_from(range)
                .map_err(|_| FontError::overflow("cmap range length", range, u16::MAX as i64))?;

            let mut sub = CmapSubtable {
                format: seg.format,
                range_start: min_code,
                range_length,
                glyph_id_start: start_id,
                unicode_list: Vec::new(),
                glyph_id_ofs_list: Vec::new(),
            };

            match seg.format {
                SubtableFormat::Format0Tiny => {}
                SubtableFormat::Format0 => {
                    for code in min_code..=max_code {
                        let delta = match font.glyph_id(code) {
                            Some(id) => id - start_id,
                            None => 0,
                        };
                        if delta > u8::MAX as u16 {
                            return Err(FontError::overflow(
                                "cmap format0 glyph id delta",
                                delta as i64,
                                u8::MAX as i64,
                            ));
                        }
                        sub.glyph_id_ofs_list.push(delta);
                    }
                }
                SubtableFormat::SparseTiny | SubtableFormat::Sparse => {
                    for &code in seg_codes {
                        let code_delta = (code - min_code) as i64;
                        let code_delta = u16::try_from(code_delta).map_err(|_| {
                            FontError::overflow("cmap codepoint delta", code_delta, u16::MAX as i64)
                        })?;
                        sub.unicode_list.push(code_delta);
                        if seg.format == SubtableFormat::Sparse {
                            sub.glyph_id_ofs_list.push(glyph_id(code) - start_id);
                        }
                    }
                }
            }
            Ok(sub)
        })
        .collect()
}

pub struct CmapTable<'a> {
    font: &'a FontModel,
}

impl<'a> CmapTable<'a> {
    pub fn new(font: &'a FontModel) -> Self {
        Self { font }
    }

    /// Resolve a codepoint through all subtables.
    pub fn lookup(&self, code: u32) -> Option<u16> {
        self.font
            .cmap_subtables()
            .iter()
            .find_map(|sub| sub.lookup(code))
    }
}

impl TableWriter for CmapTable<'_> {
    fn emit_binary(&self) -> Vec<u8> {
        let subtables = self.font.cmap_subtables();
        let payloads: Vec<Vec<u8>> = subtables.iter().map(CmapSubtable::payload).collect();

        let mut buf = table_start(b"cmap", 8);
        buf.extend_from_slice(&(subtables.len() as u32).to_le_bytes());

        let mut offset = CMAP_HEADER_LENGTH + subtables.len() * SUBTABLE_HEADER_SIZE;
        for (sub, payload) in subtables.iter().zip(&payloads) {
            buf.extend_from_slice(&(offset as u32).to_le_bytes());
            buf.extend_from_slice(&sub.range_start.to_le_bytes());
            buf.extend_from_slice(&sub.range_length.to_le_bytes());
            buf.extend_from_slice(&sub.glyph_id_start.to_le_bytes());
            buf.extend_from_slice(&sub.entries().to_le_bytes());
            buf.push(sub.format.code());
            buf.push(0);
            offset += payload.len();
        }
        for payload in &payloads {
            buf.extend_from_slice(payload);
        }

        let buf = table_finish(buf);
        debug!("cmap table size = {}", buf.len());
        buf
    }

    fn emit_source_text(&self, _font_name: &str) -> String {
        let mut defs: Vec<String> = Vec::new();
        let mut heads: Vec<String> = Vec::new();

        for (idx, sub) in self.font.cmap_subtables().iter().enumerate() {
            let mut u_list = "NULL".to_string();
            let mut id_list = "NULL".to_string();
            let mut list_length = 0usize;

            match sub.format {
                SubtableFormat::Format0Tiny => {}
                SubtableFormat::Format0 => {
                    id_list = format!("glyph_id_ofs_list_{}", idx);
                    list_length = sub.glyph_id_ofs_list.len();
                    defs.push(format!(
                        "static const uint8_t glyph_id_ofs_list_{}[] = {{\n{}\n}};",
                        idx,
                        long_dump(&sub.glyph_id_ofs_list, false)
                    ));
                }
                SubtableFormat::SparseTiny => {
                    u_list = format!("unicode_list_{}", idx);
                    list_length = sub.unicode_list.len();
                    defs.push(format!(
                        "static const uint16_t unicode_list_{}[] = {{\n{}\n}};",
                        idx,
                        long_dump(&sub.unicode_list, true)
                    ));
                }
                SubtableFormat::Sparse => {
                    u_list = format!("unicode_list_{}", idx);
                    id_list = format!("glyph_id_ofs_list_{}", idx);
                    list_length = sub.unicode_list.len();
                    defs.push(format!(
                        "static const uint16_t unicode_list_{idx}[] = {{\n{}\n}};\nstatic const uint16_t glyph_id_ofs_list_{idx}[] = {{\n{}\n}};",
                        long_dump(&sub.unicode_list, true),
                        long_dump(&sub.glyph_id_ofs_list, false),
                        idx = idx
                    ));
                }
            }

            heads.push(format!(
                "    {{
        .range_start = {}, .range_length = {}, .glyph_id_start = {},
        .unicode_list = {}, .glyph_id_ofs_list = {}, .list_length = {}, .type = {}
    }}",
                sub.range_start,
                sub.range_length,
                sub.glyph_id_start,
                u_list,
                id_list,
                list_length,
                sub.lv_type()
            ));
        }

        format!(
            "/*---------------------
 *  CHARACTER MAPPING
 *--------------------*/

{}

/*Collect the unicode lists and glyph_id offsets*/
static const lv_font_fmt_txt_cmap_t cmaps[] =
{{
{}
}};",
            defs.join("\n\n"),
            heads.join(",\n")
        )
    }
}
