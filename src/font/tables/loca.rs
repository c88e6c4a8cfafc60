//! The `loca` table: glyf offset per glyph ID, 16 or 32 bits wide.
//! Only the binary font carries it; C arrays index bitmaps directly.

use log::debug;

use super::{table_finish, table_start, TableWriter};
use crate::font::{FontModel, IndexToLocFormat};

pub struct LocaTable<'a> {
    font: &'a FontModel,
}

impl<'a> LocaTable<'a> {
    pub fn new(font: &'a FontModel) -> Self {
        Self { font }
    }

    /// Offsets of glyph IDs `0..last_id` from the start of the glyf table.
    pub fn offsets(&self) -> Vec<usize> {
        let glyf = self.font.glyf();
        (0..self.font.last_id).map(|id| glyf.offset(id)).collect()
    }
}

impl TableWriter for LocaTable<'_> {
    fn emit_binary(&self) -> Vec<u8> {
        let offsets = self.offsets();
        let mut buf = table_start(b"loca", 8);
        buf.extend_from_slice(&(offsets.len() as u32).to_le_bytes());

        for offset in offsets {
            match self.font.index_to_loc_format {
                IndexToLocFormat::Short => buf.extend_from_slice(&(offset as u16).to_le_bytes()),
                IndexToLocFormat::Long => buf.extend_from_slice(&(offset as u32).to_le_bytes()),
            }
        }

        let buf = table_finish(buf);
        debug!("loca table size = {}", buf.len());
        buf
    }

    fn emit_source_text(&self, _font_name: &str) -> String {
        String::new()
    }
}
