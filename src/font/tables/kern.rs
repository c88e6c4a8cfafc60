//! # Kerning Table
//!
//! Two encodings are always built and the smaller one is kept:
//!
//! - **Pairs** (format 0): `(left id, right id, value)` sorted by left then
//!   right ID. Lookup is a binary search.
//! - **Classes** (format 3): glyphs with identical kerning maps share a left
//!   class, glyphs kerned identically by every left glyph share a right
//!   class. Two ID → class arrays plus a class × class matrix give O(1)
//!   lookup. Class 0 means "no kerning", so at most 254 real classes per side.
//!
//! With `fast_kerning` the class form is used even when larger, as long as
//! it is legal. Values are FP4.4 after division by the font kerning scale.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use super::{long_dump, table_finish, table_start, TableWriter};
use crate::error::FontError;
use crate::font::bits::pad4;
use crate::font::{FontModel, GlyphIdFormat};

pub const KERN_HEADER_LENGTH: usize = 12;

/// Class count limit per side; index 0 is reserved.
const MAX_CLASSES: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernFormat {
    Pairs,
    Classes,
}

impl KernFormat {
    pub fn code(self) -> u8 {
        match self {
            KernFormat::Pairs => 0,
            KernFormat::Classes => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernPair {
    pub left: u16,
    pub right: u16,
    /// FP4.4, scaled.
    pub value: i8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernClasses {
    pub left_count: u8,
    pub right_count: u8,
    /// Glyph ID → left class (0 = none), `last_id` entries.
    pub left_mapping: Vec<u8>,
    /// Glyph ID → right class (0 = none), `last_id` entries.
    pub right_mapping: Vec<u8>,
    /// `left_count × right_count` FP4.4 values, row per left class.
    pub values: Vec<i8>,
}

impl KernClasses {
    /// Kerning between two glyph IDs, as the driver resolves it.
    pub fn lookup(&self, left: u16, right: u16) -> i8 {
        let lc = self.left_mapping.get(left as usize).copied().unwrap_or(0);
        let rc = self.right_mapping.get(right as usize).copied().unwrap_or(0);
        if lc == 0 || rc == 0 {
            return 0;
        }
        let idx = (lc as usize - 1) * self.right_count as usize + (rc as usize - 1);
        self.values[idx]
    }
}

/// The chosen kerning encoding plus both candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernSelection {
    pub format: KernFormat,
    /// Classes were taken over smaller pairs because fast kerning was requested.
    pub forced: bool,
    pub pairs: Vec<KernPair>,
    /// `None` when the class form exceeds its limits.
    pub classes: Option<KernClasses>,
    pub pairs_size: usize,
    pub classes_size: Option<usize>,
}

fn collect_pairs(font: &FontModel) -> Result<Vec<KernPair>, FontError> {
    let mut pairs = Vec::new();
    // Glyphs and their partner maps are both in ascending code, hence ID, order
    for glyph in font.glyphs() {
        let Some(left) = font.glyph_id(glyph.code) else {
            continue;
        };
        for (&code, &value) in &glyph.kerning {
            let Some(right) = font.glyph_id(code) else {
                continue;
            };
            pairs.push(KernPair {
                left,
                right,
                value: font.kerning_to_fixed(value)?,
            });
        }
    }
    Ok(pairs)
}

/// Group codes by identical kerning maps, in order of first appearance.
/// Maps are compared as partner-ID-sorted lists so grouping never depends
/// on map iteration order.
fn build_classes<'k, I>(font: &FontModel, kernings: I) -> Vec<Vec<u32>>
where
    I: IntoIterator<Item = (u32, &'k BTreeMap<u32, f64>)>,
{
    let mut index: BTreeMap<Vec<(u16, u64)>, usize> = BTreeMap::new();
    let mut classes: Vec<Vec<u32>> = Vec::new();

    for (code, map) in kernings {
        let mut key: Vec<(u16, u64)> = map
            .iter()
            .map(|(&partner, &value)| (font.glyph_id(partner).unwrap_or(0), value.to_bits()))
            .collect();
        key.sort_unstable();

        match index.get(&key) {
            Some(&i) => classes[i].push(code),
            None => {
                index.insert(key, classes.len());
                classes.push(vec![code]);
            }
        }
    }
    classes
}

fn class_mapping(font: &FontModel, classes: &[Vec<u32>]) -> Vec<u8> {
    let mut mapping = vec![0u8; font.last_id as usize];
    for (idx, members) in classes.iter().enumerate() {
        for &code in members {
            if let Some(id) = font.glyph_id(code) {
                mapping[id as usize] = (idx + 1) as u8;
            }
        }
    }
    mapping
}

fn collect_classes(font: &FontModel) -> Result<Option<KernClasses>, FontError> {
    let left_kernings: BTreeMap<u32, &BTreeMap<u32, f64>> = font
        .glyphs()
        .iter()
        .filter(|g| g.has_kerning())
        .map(|g| (g.code, &g.kerning))
        .collect();

    let mut right_kernings: BTreeMap<u32, BTreeMap<u32, f64>> = BTreeMap::new();
    for (&left, map) in &left_kernings {
        for (&right, &value) in map.iter() {
            right_kernings.entry(right).or_default().insert(left, value);
        }
    }

    let left_classes = build_classes(font, left_kernings.iter().map(|(&c, &m)| (c, m)));
    debug!("unique left classes: {}", left_classes.len());
    let right_classes = build_classes(font, right_kernings.iter().map(|(&c, m)| (c, m)));
    debug!("unique right classes: {}", right_classes.len());

    if left_classes.len() > MAX_CLASSES || right_classes.len() > MAX_CLASSES {
        debug!("too many classes for format3 subtable");
        return Ok(None);
    }

    let mut values = Vec::with_capacity(left_classes.len() * right_classes.len());
    for lc in &left_classes {
        for rc in &right_classes {
            let value = left_kernings
                .get(&lc[0])
                .and_then(|m| m.get(&rc[0]))
                .copied()
                .unwrap_or(0.0);
            values.push(font.kerning_to_fixed(value)?);
        }
    }

    Ok(Some(KernClasses {
        left_count: left_classes.len() as u8,
        right_count: right_classes.len() as u8,
        left_mapping: class_mapping(font, &left_classes),
        right_mapping: class_mapping(font, &right_classes),
        values,
    }))
}

fn encode_pairs(font: &FontModel, pairs: &[KernPair]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
    for pair in pairs {
        match font.glyph_id_format {
            GlyphIdFormat::OneByte => {
                buf.push(pair.left as u8);
                buf.push(pair.right as u8);
            }
            GlyphIdFormat::TwoBytes => {
                buf.extend_from_slice(&pair.left.to_le_bytes());
                buf.extend_from_slice(&pair.right.to_le_bytes());
            }
        }
    }
    buf.extend(pairs.iter().map(|p| p.value as u8));
    pad4(&mut buf);
    buf
}

fn encode_classes(font: &FontModel, classes: &KernClasses) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&font.last_id.to_le_bytes());
    buf.push(classes.left_count);
    buf.push(classes.right_count);
    buf.extend_from_slice(&classes.left_mapping);
    buf.extend_from_slice(&classes.right_mapping);
    buf.extend(classes.values.iter().map(|&v| v as u8));
    pad4(&mut buf);
    buf
}

/// Build both encodings and pick one.
pub fn select(font: &FontModel) -> Result<KernSelection, FontError> {
    let glyphs = font.glyphs();
    let pairs = collect_pairs(font)?;
    let kerned_glyphs = glyphs.iter().filter(|g| g.has_kerning()).count();
    let longest_list = glyphs.iter().map(|g| g.kerning.len()).max().unwrap_or(0);
    debug!(
        "{} kerned glyphs of {}, {} max list, {} total pairs",
        kerned_glyphs,
        glyphs.len(),
        longest_list,
        pairs.len()
    );

    let classes = collect_classes(font)?;
    let pairs_size = encode_pairs(font, &pairs).len();
    let classes_size = classes.as_ref().map(|c| encode_classes(font, c).len());
    debug!("kern format0 size = {}, format3 size = {:?}", pairs_size, classes_size);

    let (format, forced) = match classes_size {
        Some(size) if size <= pairs_size => (KernFormat::Classes, false),
        Some(size) if font.opts.fast_kerning => {
            info!(
                "Forced faster kerning format (via classes). Size increase is {} bytes.",
                size - pairs_size
            );
            (KernFormat::Classes, true)
        }
        _ => {
            if font.opts.fast_kerning {
                warn!(
                    "Forced faster kerning format (via classes), but data exceeds it's limits. Continue use pairs."
                );
            }
            (KernFormat::Pairs, false)
        }
    };

    Ok(KernSelection {
        format,
        forced,
        pairs,
        classes,
        pairs_size,
        classes_size,
    })
}

pub struct KernTable<'a> {
    font: &'a FontModel,
    selection: &'a KernSelection,
}

impl<'a> KernTable<'a> {
    pub fn new(font: &'a FontModel, selection: &'a KernSelection) -> Self {
        Self { font, selection }
    }

    pub fn format(&self) -> KernFormat {
        self.selection.format
    }

    fn pairs_text(&self) -> String {
        let f = self.font;
        let pairs = &self.selection.pairs;
        let id_type = match f.glyph_id_format {
            GlyphIdFormat::OneByte => "uint8_t",
            GlyphIdFormat::TwoBytes => "uint16_t",
        };
        let ids: Vec<String> = pairs
            .iter()
            .map(|p| format!("    {}, {}", p.left, p.right))
            .collect();
        let values: Vec<i8> = pairs.iter().map(|p| p.value).collect();

        format!(
            "/*-----------------
 *    KERNING
 *----------------*/


/*Pair left and right glyphs for kerning*/
static const {id_type} kern_pair_glyph_ids[] =
{{
{ids}
}};

/* Kerning between the respective left and right glyphs
 * 4.4 format which needs to scaled with `kern_scale`*/
static const int8_t kern_pair_values[] =
{{
{values}
}};

/*Collect the kern pair's data in one place*/
static const lv_font_fmt_txt_kern_pair_t kern_pairs =
{{
    .glyph_ids = kern_pair_glyph_ids,
    .values = kern_pair_values,
    .pair_cnt = {count},
    .glyph_ids_size = {id_size}
}};",
            id_type = id_type,
            ids = ids.join(",\n"),
            values = long_dump(&values, false),
            count = pairs.len(),
            id_size = f.glyph_id_format.code()
        )
    }

    fn classes_text(&self, classes: &KernClasses) -> String {
        format!(
            "/*-----------------
 *    KERNING
 *----------------*/


/*Map glyph_ids to kern left classes*/
static const uint8_t kern_left_class_mapping[] =
{{
{left}
}};

/*Map glyph_ids to kern right classes*/
static const uint8_t kern_right_class_mapping[] =
{{
{right}
}};

/*Kern values between classes*/
static const int8_t kern_class_values[] =
{{
{values}
}};


/*Collect the kern class' data in one place*/
static const lv_font_fmt_txt_kern_classes_t kern_classes =
{{
    .class_pair_values   = kern_class_values,
    .left_class_mapping  = kern_left_class_mapping,
    .right_class_mapping = kern_right_class_mapping,
    .left_class_cnt      = {left_count},
    .right_class_cnt     = {right_count},
}};",
            left = long_dump(&classes.left_mapping, false),
            right = long_dump(&classes.right_mapping, false),
            values = long_dump(&classes.values, false),
            left_count = classes.left_count,
            right_count = classes.right_count
        )
    }
}

impl TableWriter for KernTable<'_> {
    fn emit_binary(&self) -> Vec<u8> {
        let mut buf = table_start(b"kern", KERN_HEADER_LENGTH);
        buf[8] = self.selection.format.code();

        match (self.selection.format, &self.selection.classes) {
            (KernFormat::Classes, Some(classes)) => {
                buf.extend_from_slice(&encode_classes(self.font, classes))
            }
            _ => buf.extend_from_slice(&encode_pairs(self.font, &self.selection.pairs)),
        }

        let buf = table_finish(buf);
        debug!("kern table size = {}", buf.len());
        buf
    }

    fn emit_source_text(&self, _font_name: &str) -> String {
        match (self.selection.format, &self.selection.classes) {
            (KernFormat::Classes, Some(classes)) => self.classes_text(classes),
            _ => self.pairs_text(),
        }
    }
}
