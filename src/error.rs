//! Structured error types for the font compiler.
//!
//! Variants follow the real failure sources: unreadable or empty inputs,
//! values that do not fit their storage fields, and conflicting options.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by all public fontconv API functions.
#[derive(Debug, Error)]
pub enum FontError {
    /// JSON glyph data failed to parse.
    #[error("Failed to parse font data: {source}{}", hint_suffix(.hint))]
    ParseError {
        source: serde_json::Error,
        hint: String,
    },
    /// A file could not be read or written.
    #[error("Cannot access file \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A source font could not be parsed.
    #[error("Cannot load font \"{path}\": {message}")]
    FontLoad { path: String, message: String },
    /// A requested range or symbol list matched no glyph in its font.
    #[error("Font \"{path}\" doesn't have any characters included in {what}")]
    EmptyRange { path: String, what: String },
    /// The glyph list violates a model invariant.
    #[error("Invalid glyph data: {0}")]
    InvalidGlyph(String),
    /// A derived value does not fit the field it must be stored in.
    #[error("{field} out of range: {value} (max {max})")]
    EncodingOverflow {
        field: &'static str,
        value: i64,
        max: i64,
    },
    /// Build options that cannot be combined.
    #[error("Incompatible options: {0}")]
    ConfigConflict(String),
    /// A malformed command-line value (range, codepoint, format name).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Output JSON could not be produced.
    #[error("Failed to serialize font info: {0}")]
    Serialize(serde_json::Error),
    /// PNG encoding failed while producing the debug dump.
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl FontError {
    pub(crate) fn overflow(field: &'static str, value: i64, max: i64) -> Self {
        FontError::EncodingOverflow { field, value, max }
    }
}

impl From<serde_json::Error> for FontError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the font data schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FontError::ParseError { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_hint() {
        let err: FontError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse font data"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn test_serialize_error_has_no_parse_hint() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let msg = FontError::Serialize(source).to_string();
        assert!(msg.starts_with("Failed to serialize font info"));
        assert!(!msg.contains("Hint"));
    }

    #[test]
    fn test_overflow_message() {
        let err = FontError::overflow("cmap format0 glyph id delta", 300, 255);
        assert_eq!(
            err.to_string(),
            "cmap format0 glyph id delta out of range: 300 (max 255)"
        );
    }
}
