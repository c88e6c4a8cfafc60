//! The monolithic binary font: tables concatenated in fixed order.
//!
//! ```text
//! head | cmap | loca | glyf | [kern]
//! ```

use log::debug;

use crate::font::tables::TableWriter;
use crate::font::FontModel;

pub fn write(font: &FontModel) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&font.head().emit_binary());
    out.extend_from_slice(&font.cmap().emit_binary());
    out.extend_from_slice(&font.loca().emit_binary());
    out.extend_from_slice(&font.glyf().emit_binary());
    if let Some(kern) = font.kern() {
        out.extend_from_slice(&kern.emit_binary());
    }
    debug!("font size: {}", out.len());
    out
}
