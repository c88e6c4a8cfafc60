//! Range parsing and merging.
//!
//! Every `--font` brings its own list of codepoint ranges and symbol strings.
//! The [`Ranger`] folds them into one destination-code map; a later
//! declaration for the same destination code replaces an earlier one.

use std::collections::BTreeMap;

use crate::error::FontError;
use crate::font::MAX_CODEPOINT;

/// One `start[-end][=>mapped]` item. Source codes `start..=end` land at
/// destination codes `mapped_start..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub start: u32,
    pub end: u32,
    pub mapped_start: u32,
}

impl CodeRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            mapped_start: start,
        }
    }

    /// `0xstart-0xend`, as used in error messages.
    pub fn describe(&self) -> String {
        format!("0x{:x}-0x{:x}", self.start, self.end)
    }
}

/// Parse a decimal or `0x` hex codepoint.
pub fn parse_codepoint(s: &str) -> Result<u32, FontError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    let value = parsed
        .map_err(|_| FontError::InvalidArgument(format!("{} is not a number", s)))?;
    if value > MAX_CODEPOINT {
        return Err(FontError::InvalidArgument(format!(
            "{} is out of unicode range",
            s
        )));
    }
    Ok(value)
}

/// Parse a comma-separated range list, e.g. `0x20-0x7F,0x1F600=>0xE000`.
pub fn parse_range(s: &str) -> Result<Vec<CodeRange>, FontError> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_range_item)
        .collect::<Result<Vec<_>, _>>()
        .and_then(|ranges| {
            if ranges.is_empty() {
                Err(FontError::InvalidArgument(format!(
                    "empty range \"{}\"",
                    s
                )))
            } else {
                Ok(ranges)
            }
        })
}

fn parse_range_item(item: &str) -> Result<CodeRange, FontError> {
    let (span, mapped) = match item.split_once("=>") {
        Some((span, mapped)) => (span, Some(parse_codepoint(mapped)?)),
        None => (item, None),
    };

    let (start, end) = match span.split_once('-') {
        Some((a, b)) => (parse_codepoint(a)?, parse_codepoint(b)?),
        None => {
            let code = parse_codepoint(span)?;
            (code, code)
        }
    };

    if start > end {
        return Err(FontError::InvalidArgument(format!(
            "Invalid range: {}",
            item
        )));
    }

    let mapped_start = mapped.unwrap_or(start);
    if mapped_start as u64 + (end - start) as u64 > MAX_CODEPOINT as u64 {
        return Err(FontError::InvalidArgument(format!(
            "{} maps past the unicode range",
            item
        )));
    }

    Ok(CodeRange {
        start,
        end,
        mapped_start,
    })
}

/// Where a destination codepoint comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source<F> {
    pub font: F,
    pub code: u32,
}

/// Destination code → source font and source code.
#[derive(Debug, Clone, Default)]
pub struct Ranger<F> {
    map: BTreeMap<u32, Source<F>>,
}

impl<F: Copy> Ranger<F> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Register a range, returning the source codes it covers.
    pub fn add_range(&mut self, font: F, range: CodeRange) -> Vec<u32> {
        let mut codes = Vec::with_capacity((range.end - range.start + 1) as usize);
        for code in range.start..=range.end {
            let dst = range.mapped_start + (code - range.start);
            self.map.insert(dst, Source { font, code });
            codes.push(code);
        }
        codes
    }

    /// Register every character of `symbols` at its own codepoint.
    pub fn add_symbols(&mut self, font: F, symbols: &str) -> Vec<u32> {
        let mut codes = Vec::new();
        for ch in symbols.chars() {
            let code = ch as u32;
            self.map.insert(code, Source { font, code });
            codes.push(code);
        }
        codes
    }

    /// The merged map, ordered by destination code.
    pub fn get(&self) -> &BTreeMap<u32, Source<F>> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codepoint_forms() {
        assert_eq!(parse_codepoint("65").unwrap(), 65);
        assert_eq!(parse_codepoint("0x41").unwrap(), 0x41);
        assert_eq!(parse_codepoint("0X10FFFF").unwrap(), 0x10FFFF);
        assert!(parse_codepoint("0x110000").is_err());
        assert!(parse_codepoint("abc").is_err());
    }

    #[test]
    fn test_parse_range_list() {
        let ranges = parse_range("0x20-0x7f, 0xB0,0x1F600-0x1F601=>0xE000").unwrap();
        assert_eq!(
            ranges,
            vec![
                CodeRange::new(0x20, 0x7F),
                CodeRange::new(0xB0, 0xB0),
                CodeRange {
                    start: 0x1F600,
                    end: 0x1F601,
                    mapped_start: 0xE000
                },
            ]
        );
    }

    #[test]
    fn test_parse_range_rejects_reversed() {
        let err = parse_range("0x50-0x40").unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
    }

    #[test]
    fn test_parse_range_rejects_empty_and_overflow() {
        assert!(parse_range(" , ").is_err());
        assert!(parse_range("0x20-0x30=>0x10FFFA").is_err());
    }

    #[test]
    fn test_range_remaps_destination() {
        let mut ranger = Ranger::new();
        let codes = ranger.add_range(
            0usize,
            CodeRange {
                start: 0x41,
                end: 0x43,
                mapped_start: 0x100,
            },
        );
        assert_eq!(codes, vec![0x41, 0x42, 0x43]);
        let dst: Vec<u32> = ranger.get().keys().copied().collect();
        assert_eq!(dst, vec![0x100, 0x101, 0x102]);
        assert_eq!(ranger.get()[&0x102], Source { font: 0, code: 0x43 });
    }

    #[test]
    fn test_later_declaration_wins() {
        let mut ranger = Ranger::new();
        ranger.add_range(0usize, CodeRange::new(0x41, 0x42));
        ranger.add_symbols(1usize, "B€");

        let map = ranger.get();
        assert_eq!(map[&0x41].font, 0);
        assert_eq!(map[&0x42].font, 1);
        assert_eq!(map[&0x20AC], Source { font: 1, code: 0x20AC });
    }

    #[test]
    fn test_describe_uses_lower_hex() {
        assert_eq!(CodeRange::new(0x2A, 0xFF).describe(), "0x2a-0xff");
    }
}
