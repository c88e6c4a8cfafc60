//! # Build Options
//!
//! The configuration surface consumed by the compiler. Options can be built
//! directly, deserialized from JSON (camelCase keys, every field optional), or
//! filled in by the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FontError;

/// Bits per stored pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Bpp {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Eight = 8,
}

impl Bpp {
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Bpp {
    type Error = FontError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Bpp::One),
            2 => Ok(Bpp::Two),
            3 => Ok(Bpp::Three),
            4 => Ok(Bpp::Four),
            8 => Ok(Bpp::Eight),
            other => Err(FontError::InvalidArgument(format!(
                "bpp must be one of 1, 2, 3, 4, 8 (got {})",
                other
            ))),
        }
    }
}

impl From<Bpp> for u8 {
    fn from(bpp: Bpp) -> u8 {
        bpp.bits()
    }
}

/// Subpixel layout the glyphs are rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubpixelMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl SubpixelMode {
    /// Value stored in the head table.
    pub fn code(self) -> u8 {
        match self {
            SubpixelMode::None => 0,
            SubpixelMode::Horizontal => 1,
            SubpixelMode::Vertical => 2,
        }
    }
}

/// Which representation `convert` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Monolithic little-endian binary font.
    Bin,
    /// LVGL C source with the same field values as array initializers.
    Lvgl,
    /// Directory of per-glyph PNGs plus `font_info.json`.
    Dump,
}

impl FromStr for OutputFormat {
    type Err = FontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bin" => Ok(OutputFormat::Bin),
            "lvgl" => Ok(OutputFormat::Lvgl),
            "dump" => Ok(OutputFormat::Dump),
            other => Err(FontError::InvalidArgument(format!(
                "unknown output format \"{}\" (expected bin, lvgl or dump)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Bin => "bin",
            OutputFormat::Lvgl => "lvgl",
            OutputFormat::Dump => "dump",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Output font size, pixels.
    pub size: u16,
    pub bpp: Bpp,
    /// Store bitmaps raw instead of RLE-compressed.
    pub no_compress: bool,
    /// Skip the row XOR filter applied before compression.
    pub no_prefilter: bool,
    /// Drop kerning information entirely.
    pub no_kerning: bool,
    /// Prefer class-based kerning even when it is larger than pairs.
    pub fast_kerning: bool,
    pub subpixels: SubpixelMode,
    /// Keep pixel data in the dump's `font_info.json`.
    pub full_info: bool,
    /// Alternate include path for `lvgl.h` in C output.
    pub lv_include: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            size: 16,
            bpp: Bpp::Four,
            no_compress: false,
            no_prefilter: false,
            no_kerning: false,
            fast_kerning: false,
            subpixels: SubpixelMode::None,
            full_info: false,
            lv_include: None,
        }
    }
}

impl BuildOptions {
    /// Reject option combinations before any table is built.
    pub fn validate(&self, format: OutputFormat) -> Result<(), FontError> {
        if self.size == 0 {
            return Err(FontError::ConfigConflict(
                "font size must be a positive number of pixels".to_string(),
            ));
        }
        if format == OutputFormat::Lvgl && self.bpp == Bpp::Three && self.no_compress {
            return Err(FontError::ConfigConflict(
                "LVGL supports \"--bpp 3\" with compression only".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_partial_json() {
        let opts: BuildOptions =
            serde_json::from_str(r#"{ "size": 20, "bpp": 2, "noKerning": true }"#).unwrap();
        assert_eq!(opts.size, 20);
        assert_eq!(opts.bpp, Bpp::Two);
        assert!(opts.no_kerning);
        assert!(!opts.no_compress);
        assert_eq!(opts.subpixels, SubpixelMode::None);
    }

    #[test]
    fn test_bpp_rejects_unsupported_depth() {
        assert!(Bpp::try_from(5).is_err());
        assert!(serde_json::from_str::<BuildOptions>(r#"{ "bpp": 6 }"#).is_err());
    }

    #[test]
    fn test_subpixel_codes() {
        assert_eq!(SubpixelMode::None.code(), 0);
        assert_eq!(SubpixelMode::Horizontal.code(), 1);
        assert_eq!(SubpixelMode::Vertical.code(), 2);
    }

    #[test]
    fn test_validate_bpp3_uncompressed_lvgl() {
        let opts = BuildOptions {
            bpp: Bpp::Three,
            no_compress: true,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(OutputFormat::Lvgl),
            Err(FontError::ConfigConflict(_))
        ));
        assert!(opts.validate(OutputFormat::Bin).is_ok());
    }

    #[test]
    fn test_validate_zero_size() {
        let opts = BuildOptions {
            size: 0,
            ..Default::default()
        };
        assert!(opts.validate(OutputFormat::Bin).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("lvgl".parse::<OutputFormat>().unwrap(), OutputFormat::Lvgl);
        assert!("ttf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Dump.to_string(), "dump");
    }
}
