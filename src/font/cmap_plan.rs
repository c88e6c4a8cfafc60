//! # Cmap Subtable Planner
//!
//! Splits the sorted destination codepoints into contiguous segments and
//! picks the cheapest subtable format for each, minimizing the total size
//! of the cmap table.
//!
//! Glyph IDs are assigned in codepoint order without gaps, so a segment's IDs
//! are always consecutive and never need to be considered here: if the
//! codepoints of a segment fit a format, its glyph ID deltas fit too. For the
//! same reason the full sparse format (explicit ID list) is never chosen,
//! the tiny sparse variant always beats it.
//!
//! The search is the classic weighted-interval dynamic program: `cost[i]` is
//! the smallest encoding of `codepoints[0..=i]`, built from every
//! `cost[j - 1] + size(segment j..=i)`. Quadratic in the number of
//! codepoints, which stays small for real glyph sets.

use super::bits::align4;

/// Fixed size of a subtable header inside the cmap table.
pub const SUBTABLE_HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtableFormat {
    /// Dense byte array of glyph ID deltas, one per codepoint in range.
    Format0,
    /// Codepoints and IDs both contiguous, no payload.
    Format0Tiny,
    /// 16-bit codepoint delta list plus 16-bit ID delta list.
    Sparse,
    /// 16-bit codepoint delta list, IDs implied by position.
    SparseTiny,
}

impl SubtableFormat {
    /// Format code stored in the subtable header.
    pub fn code(self) -> u8 {
        match self {
            SubtableFormat::Format0 => 0,
            SubtableFormat::Sparse => 1,
            SubtableFormat::Format0Tiny => 2,
            SubtableFormat::SparseTiny => 3,
        }
    }

    /// Whether a segment spanning `span` codepoints (last - first) with
    /// `count` elements can be stored in this format.
    pub fn fits(self, span: u32, count: usize) -> bool {
        match self {
            SubtableFormat::Format0 => span < 256,
            SubtableFormat::Format0Tiny => span < 256 && span as usize + 1 == count,
            SubtableFormat::Sparse | SubtableFormat::SparseTiny => span < 65536,
        }
    }

    /// Encoded size of a segment in bytes, header included.
    pub fn size(self, span: u32, count: usize) -> usize {
        match self {
            SubtableFormat::Format0 => align4(SUBTABLE_HEADER_SIZE + span as usize + 1),
            SubtableFormat::Format0Tiny => SUBTABLE_HEADER_SIZE,
            SubtableFormat::Sparse => align4(SUBTABLE_HEADER_SIZE + count * 4),
            SubtableFormat::SparseTiny => align4(SUBTABLE_HEADER_SIZE + count * 2),
        }
    }
}

/// Candidate formats in evaluation order. Earlier wins on equal cost.
const CANDIDATES: [SubtableFormat; 3] = [
    SubtableFormat::Format0,
    SubtableFormat::Format0Tiny,
    SubtableFormat::SparseTiny,
];

/// A planned segment: `codepoints[start..=end]` stored as `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub format: SubtableFormat,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    /// Number of codepoints in the segment (never zero).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmapPlan {
    pub segments: Vec<Segment>,
    /// Total estimated size of all subtables (headers and payloads).
    pub size: usize,
}

#[derive(Clone, Copy)]
struct Step {
    cost: usize,
    start: usize,
    format: SubtableFormat,
}

/// Find the cheapest segmentation of sorted, unique codepoints.
pub fn plan_subtables(codepoints: &[u32]) -> CmapPlan {
    debug_assert!(codepoints.windows(2).all(|w| w[0] < w[1]));

    let mut best: Vec<Step> = Vec::with_capacity(codepoints.len());

    for i in 0..codepoints.len() {
        let mut min = Step {
            cost: usize::MAX,
            start: i,
            format: SubtableFormat::SparseTiny,
        };

        for j in 0..=i {
            let prev_cost = if j == 0 { 0 } else { best[j - 1].cost };
            let span = codepoints[i] - codepoints[j];
            let count = i - j + 1;

            for format in CANDIDATES {
                if !format.fits(span, count) {
                    continue;
                }
                let cost = prev_cost + format.size(span, count);
                if cost < min.cost {
                    min = Step {
                        cost,
                        start: j,
                        format,
                    };
                }
            }
        }

        best.push(min);
    }

    let mut segments = Vec::new();
    let mut end = codepoints.len();
    while end > 0 {
        let step = best[end - 1];
        segments.push(Segment {
            format: step.format,
            start: step.start,
            end: end - 1,
        });
        end = step.start;
    }
    segments.reverse();

    CmapPlan {
        segments,
        size: best.last().map_or(0, |s| s.cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats(plan: &CmapPlan) -> Vec<SubtableFormat> {
        plan.segments.iter().map(|s| s.format).collect()
    }

    #[test]
    fn test_empty_input() {
        let plan = plan_subtables(&[]);
        assert!(plan.segments.is_empty());
        assert_eq!(plan.size, 0);
    }

    #[test]
    fn test_contiguous_range_is_single_tiny() {
        let codes: Vec<u32> = (0x20..0x7F).collect();
        let plan = plan_subtables(&codes);
        assert_eq!(formats(&plan), vec![SubtableFormat::Format0Tiny]);
        assert_eq!(plan.segments[0].start, 0);
        assert_eq!(plan.segments[0].end, codes.len() - 1);
        assert_eq!(plan.size, 16);
    }

    #[test]
    fn test_single_codepoint_uses_format0_tiny() {
        // format0: align4(16 + 1) = 20, sparse_tiny: align4(16 + 2) = 20,
        // format0_tiny: 16 wins outright
        let plan = plan_subtables(&[0x41]);
        assert_eq!(formats(&plan), vec![SubtableFormat::Format0Tiny]);
    }

    #[test]
    fn test_gappy_small_range_uses_sparse_tiny() {
        // 8 codes spread over 40 codepoints: format0 = 16 + 40 = 56,
        // sparse_tiny = 16 + 16 = 32, splitting into tiny runs costs 8 * 16
        let codes = [10, 15, 20, 25, 30, 35, 40, 49];
        let plan = plan_subtables(&codes);
        assert_eq!(formats(&plan), vec![SubtableFormat::SparseTiny]);
        assert_eq!(plan.size, 32);
    }

    #[test]
    fn test_range_with_regular_holes_uses_format0() {
        // 24 codes over 31 codepoints: format0 = align4(16 + 31) = 48,
        // sparse_tiny = 16 + 48 = 64, eight tiny runs = 128
        let codes: Vec<u32> = (0x20..0x40).filter(|c| c % 4 != 0).collect();
        let plan = plan_subtables(&codes);
        assert_eq!(formats(&plan), vec![SubtableFormat::Format0]);
        assert_eq!(plan.size, 48);
    }

    #[test]
    fn test_dense_blocks_split_into_tiny_segments() {
        let mut codes: Vec<u32> = (0x30..0x3A).collect();
        codes.extend(0x4E00..0x4E40);
        let plan = plan_subtables(&codes);
        assert_eq!(
            formats(&plan),
            vec![SubtableFormat::Format0Tiny, SubtableFormat::Format0Tiny]
        );
        assert_eq!(plan.segments[1].start, 10);
        assert_eq!(plan.size, 32);
    }

    #[test]
    fn test_far_apart_codes_never_share_format0() {
        let codes = [0x41, 0x42, 0x1F600];
        let plan = plan_subtables(&codes);
        for seg in &plan.segments {
            let span = codes[seg.end] - codes[seg.start];
            assert!(seg.format.fits(span, seg.len()));
        }
        assert_eq!(plan.segments.last().unwrap().end, 2);
    }

    #[test]
    fn test_plan_never_worse_than_single_sparse_tiny() {
        let sets: Vec<Vec<u32>> = vec![
            vec![1, 2, 3, 100, 101, 300, 301, 302, 303, 1000],
            (0..200).map(|i| i * 3).collect(),
            (0..50).chain(60..62).chain(500..520).collect(),
            vec![0x20, 0x41, 0x42, 0x43, 0x410, 0x411, 0x2022, 0xF000],
        ];
        for codes in sets {
            let plan = plan_subtables(&codes);
            let span = codes[codes.len() - 1] - codes[0];
            let upper = SubtableFormat::SparseTiny.size(span, codes.len());
            assert!(plan.size <= upper, "{:?}", codes);

            // segments cover every index exactly once, in order
            let mut next = 0;
            for seg in &plan.segments {
                assert_eq!(seg.start, next);
                next = seg.end + 1;
            }
            assert_eq!(next, codes.len());

            let total: usize = plan
                .segments
                .iter()
                .map(|s| s.format.size(codes[s.end] - codes[s.start], s.len()))
                .sum();
            assert_eq!(total, plan.size);
        }
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(SubtableFormat::Format0.code(), 0);
        assert_eq!(SubtableFormat::Sparse.code(), 1);
        assert_eq!(SubtableFormat::Format0Tiny.code(), 2);
        assert_eq!(SubtableFormat::SparseTiny.code(), 3);
    }
}
