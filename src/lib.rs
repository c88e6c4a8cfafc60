//! # fontconv
//!
//! A bitmap font compiler for embedded GUI renderers.
//!
//! Source fonts are rasterized once on the host. What reaches the device is a
//! compact, self-describing binary: a character map that resolves a codepoint
//! to a glyph id in a few comparisons, per-glyph bitmaps packed at 1 to 8 bits
//! per pixel (optionally run-length compressed), and kerning stored either as
//! sorted pairs or as a class matrix, whichever is smaller.
//!
//! ## Architecture
//!
//! ```text
//! Source fonts + ranges
//!       ↓
//!   [collect]  : Merge ranges, rasterize, kerning, metrics
//!       ↓
//!   [glyph]    : Normalized glyph list (also loadable from JSON)
//!       ↓
//!   [font]     : Font model, global format decisions, tables
//!       ↓
//!   [writer]   : Binary font, LVGL C source, PNG/JSON dump
//! ```

pub mod collect;
pub mod error;
pub mod font;
pub mod glyph;
pub mod options;
pub mod writer;

#[cfg(feature = "wasm")]
pub mod wasm;

use std::path::PathBuf;

use log::info;

use collect::FontSource;
use error::FontError;
use font::FontModel;
use glyph::FontData;
use options::{BuildOptions, OutputFormat};
use writer::OutputFiles;

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub fonts: Vec<FontSource>,
    /// Output file (`bin`, `lvgl`) or directory (`dump`).
    pub output: PathBuf,
    pub format: OutputFormat,
    pub options: BuildOptions,
    /// Shown in the banner of generated C sources.
    pub command_line: String,
}

/// Collect glyphs from the source fonts and render the requested output.
///
/// Returns the output files in memory; call [`writer::write_files`] to put
/// them on disk.
pub fn convert(args: &ConvertArgs) -> Result<OutputFiles, FontError> {
    args.options.validate(args.format)?;
    let data = collect::collect(&args.fonts, &args.options)?;
    let font = FontModel::new(data, args.options.clone())?;
    info!(
        "Building {} output with {} glyphs",
        args.format,
        font.glyphs().len()
    );
    writer::render(&font, args.format, &args.output, &args.command_line)
}

/// Compile an already rasterized glyph list to the binary font format.
pub fn compile(data: FontData, options: &BuildOptions) -> Result<Vec<u8>, FontError> {
    options.validate(OutputFormat::Bin)?;
    let font = FontModel::new(data, options.clone())?;
    Ok(writer::binary::write(&font))
}

/// Compile a glyph list given as JSON (the `font_info.json` shape with pixels).
pub fn compile_json(json: &str, options: &BuildOptions) -> Result<Vec<u8>, FontError> {
    let data: FontData = serde_json::from_str(json)?;
    compile(data, options)
}
