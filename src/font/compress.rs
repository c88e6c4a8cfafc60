//! # Bitmap Compression
//!
//! A modified I3BN run-length scheme tuned for anti-aliased glyphs:
//!
//! 1. Every run starts with its value written as a plain `bpp`-bit literal.
//! 2. A second identical literal switches the decoder into repeat mode, after
//!    which each `1` bit repeats the value once more and a `0` bit ends the run.
//! 3. Eleven `1` bits in a row are followed by a 6-bit counter instead, for
//!    long runs.
//!
//! Runs longer than [`MAX_RUN`] pixels are split. Before compression the rows
//! can be XOR-filtered against the previous row, which turns vertical strokes
//! into long zero runs and works the same at every bit depth.

use super::bits::{BitReader, BitWriter};

/// Literals written before repeat mode can start.
const RLE_SKIP_COUNT: usize = 1;
/// Repeats encoded as single `1` bits before switching to the counter.
const RLE_BIT_COLLAPSED_COUNT: usize = 10;
const RLE_COUNTER_BITS: u8 = 6;
const RLE_COUNTER_MAX: usize = (1 << RLE_COUNTER_BITS) - 1;
const RLE_MAX_REPEATS: usize = RLE_COUNTER_MAX + RLE_BIT_COLLAPSED_COUNT + 1;

/// Longest run a single encoded group can describe.
pub const MAX_RUN: usize = RLE_MAX_REPEATS + RLE_SKIP_COUNT;

/// XOR every row with the row above it. The first row is kept as is.
pub fn prefilter(rows: &[Vec<u8>]) -> Vec<Vec<u8>> {
    rows.iter()
        .enumerate()
        .map(|(y, row)| {
            if y == 0 {
                return row.clone();
            }
            row.iter().zip(&rows[y - 1]).map(|(p, above)| p ^ above).collect()
        })
        .collect()
}

/// Undo [`prefilter`].
pub fn unfilter(rows: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(rows.len());
    for row in rows {
        let restored = match out.last() {
            Some(above) => row.iter().zip(above).map(|(p, a)| p ^ a).collect(),
            None => row.clone(),
        };
        out.push(restored);
    }
    out
}

/// Append the compressed form of a flat pixel sequence to `out`.
pub fn compress(out: &mut BitWriter, pixels: &[u8], bpp: u8) {
    let mut offset = 0;

    while offset < pixels.len() {
        let p = pixels[offset];
        let run = pixels[offset..]
            .iter()
            .take_while(|&&v| v == p)
            .count()
            .min(MAX_RUN);
        offset += run;

        out.write_bits(p as u32, bpp);
        if run <= RLE_SKIP_COUNT {
            continue;
        }

        let repeats = run - RLE_SKIP_COUNT;
        // Repeated literal, the decoder's cue to enter repeat mode
        out.write_bits(p as u32, bpp);

        if repeats <= RLE_BIT_COLLAPSED_COUNT {
            for i in 0..repeats {
                out.write_bits((i + 1 < repeats) as u32, 1);
            }
            continue;
        }

        for _ in 0..=RLE_BIT_COLLAPSED_COUNT {
            out.write_bits(1, 1);
        }
        out.write_bits(
            (repeats - RLE_BIT_COLLAPSED_COUNT - 1) as u32,
            RLE_COUNTER_BITS,
        );
    }
}

enum RleState {
    Single,
    Repeat,
    Counter,
}

/// Decode `count` pixels, pixel by pixel, the way the embedded renderer does.
/// Returns `None` if the stream ends early.
pub fn decompress(input: &mut BitReader<'_>, count: usize, bpp: u8) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(count);
    let mut state = RleState::Single;
    let mut prev: Option<u8> = None;
    let mut counter = 0usize;

    while out.len() < count {
        let value = match state {
            RleState::Single => {
                let v = input.read_bits(bpp)? as u8;
                if prev == Some(v) {
                    state = RleState::Repeat;
                    counter = 0;
                }
                v
            }
            RleState::Repeat => {
                let bit = input.read_bits(1)?;
                counter += 1;
                let prev_value = prev?;
                if bit == 0 {
                    state = RleState::Single;
                    input.read_bits(bpp)? as u8
                } else if counter == RLE_BIT_COLLAPSED_COUNT + 1 {
                    counter = input.read_bits(RLE_COUNTER_BITS)? as usize;
                    if counter == 0 {
                        state = RleState::Single;
                        input.read_bits(bpp)? as u8
                    } else {
                        state = RleState::Counter;
                        prev_value
                    }
                } else {
                    prev_value
                }
            }
            RleState::Counter => {
                counter -= 1;
                if counter == 0 {
                    state = RleState::Single;
                    input.read_bits(bpp)? as u8
                } else {
                    prev?
                }
            }
        };
        prev = Some(value);
        out.push(value);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(pixels: &[u8], bpp: u8) -> Vec<u8> {
        let mut bw = BitWriter::new();
        compress(&mut bw, pixels, bpp);
        let bytes = bw.into_bytes();
        let mut br = BitReader::new(&bytes);
        decompress(&mut br, pixels.len(), bpp).expect("stream ended early")
    }

    #[test]
    fn test_max_run_is_75() {
        assert_eq!(MAX_RUN, 75);
    }

    #[test]
    fn test_single_literals() {
        let mut bw = BitWriter::new();
        compress(&mut bw, &[1, 2, 3], 2);
        assert_eq!(bw.bit_len(), 6);
        assert_eq!(bw.into_bytes(), vec![0b0110_1100]);
    }

    #[test]
    fn test_short_run_bit_layout() {
        // run of 4: literal, literal, then "1 1 0"
        let mut bw = BitWriter::new();
        compress(&mut bw, &[3, 3, 3, 3], 2);
        assert_eq!(bw.bit_len(), 2 + 2 + 3);
        assert_eq!(bw.into_bytes(), vec![0b1111_1100]);
    }

    #[test]
    fn test_counted_run_bit_layout() {
        // run of 20: two literals, eleven 1s, counter = 20 - 12 = 8
        let mut bw = BitWriter::new();
        compress(&mut bw, &[1u8; 20], 1);
        assert_eq!(bw.bit_len(), 1 + 1 + 11 + 6);
        let bytes = bw.into_bytes();
        let mut br = BitReader::new(&bytes);
        assert_eq!(br.read_bits(2), Some(0b11));
        assert_eq!(br.read_bits(11), Some(0x7FF));
        assert_eq!(br.read_bits(6), Some(8));
    }

    #[test]
    fn test_roundtrip_mixed() {
        let pixels = [0, 0, 0, 5, 7, 7, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 15, 15];
        assert_eq!(roundtrip(&pixels, 4), pixels);
    }

    #[test]
    fn test_roundtrip_every_run_length() {
        for len in 1..=160usize {
            let mut pixels = vec![2u8; len];
            pixels.push(1);
            pixels.extend(std::iter::repeat(3u8).take(len));
            assert_eq!(roundtrip(&pixels, 2), pixels, "run length {}", len);
        }
    }

    #[test]
    fn test_roundtrip_clamp_boundaries() {
        for len in [11usize, 12, 13, 74, 75, 76, 77, 150, 151] {
            let pixels = vec![9u8; len];
            assert_eq!(roundtrip(&pixels, 4), pixels, "run length {}", len);
        }
    }

    #[test]
    fn test_roundtrip_8bpp() {
        let pixels: Vec<u8> = (0..=255u8).chain([255; 30]).chain(0..10).collect();
        assert_eq!(roundtrip(&pixels, 8), pixels);
    }

    #[test]
    fn test_truncated_stream() {
        let mut br = BitReader::new(&[]);
        assert_eq!(decompress(&mut br, 1, 4), None);
    }

    #[test]
    fn test_prefilter_roundtrip() {
        let rows = vec![vec![0, 3, 3, 0], vec![0, 3, 3, 0], vec![1, 2, 3, 0]];
        let filtered = prefilter(&rows);
        assert_eq!(filtered[0], rows[0]);
        assert_eq!(filtered[1], vec![0, 0, 0, 0]);
        assert_eq!(filtered[2], vec![1, 1, 0, 0]);
        assert_eq!(unfilter(&filtered), rows);
    }
}
