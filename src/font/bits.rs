//! Bit-level streams and small byte helpers shared by the table builders.
//!
//! Bits are packed MSB-first, which is the order the embedded decoder reads
//! them in. Multi-byte table fields are little-endian.

/// Append-only MSB-first bit stream.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the low `bits` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32);
        for i in (0..bits).rev() {
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
    }

    /// Write a two's complement value truncated to `bits` bits.
    pub fn write_signed(&mut self, value: i32, bits: u8) {
        self.write_bits(value as u32, bits);
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Whole bytes used, the last one zero-padded.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// MSB-first reader over a byte slice, the mirror of [`BitWriter`].
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read `bits` bits as an unsigned value. `None` past the end of data.
    pub fn read_bits(&mut self, bits: u8) -> Option<u32> {
        debug_assert!(bits <= 32);
        if self.pos + bits as usize > self.data.len() * 8 {
            return None;
        }
        let mut value: u32 = 0;
        for _ in 0..bits {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.pos += 1;
        }
        Some(value)
    }

    /// Read `bits` bits and sign-extend them.
    pub fn read_signed(&mut self, bits: u8) -> Option<i32> {
        let raw = self.read_bits(bits)?;
        if bits == 0 || bits >= 32 {
            return Some(raw as i32);
        }
        if raw & (1 << (bits - 1)) != 0 {
            Some((raw | !((1u32 << bits) - 1)) as i32)
        } else {
            Some(raw as i32)
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Minimal number of bits holding an unsigned value.
pub fn unsigned_bits(value: u32) -> u8 {
    (32 - value.leading_zeros()) as u8
}

/// Minimal number of bits holding a signed value in two's complement.
pub fn signed_bits(value: i32) -> u8 {
    if value >= 0 {
        unsigned_bits(value as u32) + 1
    } else {
        unsigned_bits((-(value + 1)) as u32) + 1
    }
}

pub fn align4(size: usize) -> usize {
    (size + 3) & !3
}

/// Zero-pad a buffer to a multiple of 4 bytes.
pub fn pad4(data: &mut Vec<u8>) {
    data.resize(align4(data.len()), 0);
}

pub fn write_u32_at(data: &mut [u8], offset: usize, val: u32) {
    data[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
}

#[cfg(test)]
pub fn read_u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[cfg(test)]
pub fn read_u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_msb_first() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b101, 3);
        bw.write_bits(0b11111, 5);
        bw.write_bits(1, 1);
        assert_eq!(bw.bit_len(), 9);
        assert_eq!(bw.byte_len(), 2);
        assert_eq!(bw.into_bytes(), vec![0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn test_signed_roundtrip_through_reader() {
        let mut bw = BitWriter::new();
        bw.write_signed(-3, 4);
        bw.write_signed(5, 4);
        bw.write_signed(-1, 1);
        let bytes = bw.into_bytes();
        assert_eq!(bytes[0], 0b1101_0101);

        let mut br = BitReader::new(&bytes);
        assert_eq!(br.read_signed(4), Some(-3));
        assert_eq!(br.read_signed(4), Some(5));
        assert_eq!(br.read_signed(1), Some(-1));
        assert_eq!(br.position(), 9);
    }

    #[test]
    fn test_reader_stops_at_end() {
        let data = [0xFFu8];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(6), Some(0b111111));
        assert_eq!(br.read_bits(3), None);
        assert_eq!(br.read_bits(2), Some(0b11));
    }

    #[test]
    fn test_zero_width_fields() {
        let mut bw = BitWriter::new();
        bw.write_bits(0, 0);
        assert_eq!(bw.byte_len(), 0);
        let mut br = BitReader::new(&[]);
        assert_eq!(br.read_bits(0), Some(0));
    }

    #[test]
    fn test_unsigned_bits() {
        assert_eq!(unsigned_bits(0), 0);
        assert_eq!(unsigned_bits(1), 1);
        assert_eq!(unsigned_bits(7), 3);
        assert_eq!(unsigned_bits(8), 4);
        assert_eq!(unsigned_bits(255), 8);
    }

    #[test]
    fn test_signed_bits() {
        assert_eq!(signed_bits(0), 1);
        assert_eq!(signed_bits(-1), 1);
        assert_eq!(signed_bits(1), 2);
        assert_eq!(signed_bits(-2), 2);
        assert_eq!(signed_bits(3), 3);
        assert_eq!(signed_bits(-4), 3);
        assert_eq!(signed_bits(-5), 4);
        assert_eq!(signed_bits(127), 8);
        assert_eq!(signed_bits(-128), 8);
        assert_eq!(signed_bits(i32::MIN), 32);
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(17), 20);
        let mut v = vec![1, 2, 3, 4, 5];
        pad4(&mut v);
        assert_eq!(v, vec![1, 2, 3, 4, 5, 0, 0, 0]);
    }
}
