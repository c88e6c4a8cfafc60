//! # Font Tables
//!
//! Every table is a thin view over a [`FontModel`]: sizes, formats and
//! compiled payloads are decided once by the model, the views only render
//! them. Each view renders twice, as a self-contained binary blob
//! (length-prefixed, labeled, 4-byte aligned) and as C source for the LVGL
//! text font driver, through the same [`TableWriter`] capability.
//!
//! ```text
//! | size: u32 | label: [u8; 4] | payload ... | zero padding to 4 |
//! ```

pub mod cmap;
pub mod glyf;
pub mod head;
pub mod kern;
pub mod loca;

pub use cmap::CmapTable;
pub use glyf::GlyfTable;
pub use head::HeadTable;
pub use kern::KernTable;
pub use loca::LocaTable;

use super::bits::{pad4, write_u32_at};

/// Both renderings of one table.
pub trait TableWriter {
    /// Binary form, ready to be concatenated into the font file.
    fn emit_binary(&self) -> Vec<u8>;

    /// C source defining the table's arrays for the LVGL driver.
    fn emit_source_text(&self, font_name: &str) -> String;
}

/// Start a table: `header_len` zero bytes with the label in place.
pub(crate) fn table_start(label: &[u8; 4], header_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; header_len];
    buf[4..8].copy_from_slice(label);
    buf
}

/// Pad the table to 4 bytes and write its final length into the header.
pub(crate) fn table_finish(mut buf: Vec<u8>) -> Vec<u8> {
    pad4(&mut buf);
    let len = buf.len() as u32;
    write_u32_at(&mut buf, 0, len);
    buf
}

/// Lay out an array initializer, 8 values per line, 4-space indent.
pub(crate) fn long_dump<T>(values: &[T], hex: bool) -> String
where
    T: Copy + Into<i64>,
{
    values
        .chunks(8)
        .map(|line| {
            let items: Vec<String> = line
                .iter()
                .map(|&v| {
                    let v: i64 = v.into();
                    if hex {
                        format!("0x{:x}", v)
                    } else {
                        v.to_string()
                    }
                })
                .collect();
            format!("    {}", items.join(", "))
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::bits::read_u32_at;

    #[test]
    fn test_table_frame() {
        let mut buf = table_start(b"test", 8);
        buf.extend_from_slice(&[1, 2, 3]);
        let buf = table_finish(buf);
        assert_eq!(buf.len(), 12);
        assert_eq!(read_u32_at(&buf, 0), 12);
        assert_eq!(&buf[4..8], b"test");
        assert_eq!(&buf[8..], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_long_dump_wraps_at_eight() {
        let values: Vec<u8> = (0..10).collect();
        assert_eq!(
            long_dump(&values, false),
            "    0, 1, 2, 3, 4, 5, 6, 7,\n    8, 9"
        );
        assert_eq!(long_dump(&[255u8, 16], true), "    0xff, 0x10");
        assert_eq!(long_dump(&[-3i8], false), "    -3");
        assert_eq!(long_dump::<u8>(&[], false), "");
    }
}
