//! Bit-addressable view over a byte buffer.
//!
//! Provides single-bit and signed fixed-width (6-bit, 12-bit) access at an
//! arbitrary bit offset. Fields are packed MSB-first: bit index 0 is the MSB
//! (0x80) of byte 0, bit index 7 is the LSB (0x01) of byte 0, bit index 8 is
//! the MSB of byte 1, and so on.
//!
//! Signed fields are stored biased rather than in two's complement: a 12-bit
//! value `v` in `[-2048, 2047]` is written as the unsigned `v + 2048`, and a
//! 6-bit value in `[-32, 31]` as `v + 32`.

/// Width of a wide (absolute anchor) field.
pub const INT12_BITS: usize = 12;
/// Width of a narrow (delta) field.
pub const INT6_BITS: usize = 6;

const INT12_BIAS: i32 = 1 << (INT12_BITS - 1);
const INT6_BIAS: i32 = 1 << (INT6_BITS - 1);

/// Number of bytes needed to hold `bits` bits.
pub fn byte_len(bits: usize) -> usize {
    (bits + 7) >> 3
}

/// Reads `width` bits (at most 25) starting at `bit_index` as an unsigned value.
///
/// The field is assembled from every byte it touches: the partial low bits
/// of the first byte, any full middle byte, and the partial high bits of the
/// last byte, then shifted right to drop the bits that follow it.
pub fn get_bits(bytes: &[u8], bit_index: usize, width: usize) -> u32 {
    let start = bit_index >> 3;
    let shift = bit_index & 7;
    let span = (shift + width + 7) >> 3;

    let mut acc: u32 = 0;
    for byte in &bytes[start..start + span] {
        acc = (acc << 8) | *byte as u32;
    }

    let trailing = span * 8 - shift - width;
    (acc >> trailing) & ((1u32 << width) - 1)
}

/// Writes the low `width` bits of `value` starting at `bit_index`.
///
/// Bits outside the field, in the first and last bytes it touches, are left
/// unchanged.
pub fn set_bits(bytes: &mut [u8], bit_index: usize, width: usize, value: u32) {
    let start = bit_index >> 3;
    let shift = bit_index & 7;
    let span = (shift + width + 7) >> 3;
    let trailing = span * 8 - shift - width;

    let mut acc: u32 = 0;
    for byte in &bytes[start..start + span] {
        acc = (acc << 8) | *byte as u32;
    }

    let mask = ((1u32 << width) - 1) << trailing;
    acc = (acc & !mask) | ((value << trailing) & mask);

    for (i, byte) in bytes[start..start + span].iter_mut().enumerate() {
        *byte = (acc >> ((span - 1 - i) * 8)) as u8;
    }
}

/// A dense bit stream over an owned byte buffer.
///
/// No bounds checking is done beyond slice indexing: callers size the buffer
/// up front with [`byte_len`] and never address past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitView {
    bytes: Vec<u8>,
}

impl BitView {
    /// Creates a zeroed view large enough to hold `bits` bits.
    pub fn with_bit_len(bits: usize) -> Self {
        Self {
            bytes: vec![0; byte_len(bits)],
        }
    }

    /// Wraps an existing byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the bit at `bit_index` (0 or 1).
    pub fn get_bit(&self, bit_index: usize) -> u8 {
        (self.bytes[bit_index >> 3] >> (7 - (bit_index & 7))) & 1
    }

    /// Sets the bit at `bit_index` to the low bit of `bit`.
    pub fn set_bit(&mut self, bit_index: usize, bit: u8) {
        let mask = 1u8 << (7 - (bit_index & 7));
        let byte = &mut self.bytes[bit_index >> 3];
        if bit & 1 == 1 {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Reads a biased 12-bit field, returning a value in `[-2048, 2047]`.
    pub fn get_int12(&self, bit_index: usize) -> i32 {
        get_bits(&self.bytes, bit_index, INT12_BITS) as i32 - INT12_BIAS
    }

    /// Writes `value` (clamped to `[-2048, 2047]`) as a biased 12-bit field.
    pub fn set_int12(&mut self, bit_index: usize, value: i32) {
        let biased = (value.clamp(-INT12_BIAS, INT12_BIAS - 1) + INT12_BIAS) as u32;
        set_bits(&mut self.bytes, bit_index, INT12_BITS, biased);
    }

    /// Reads a biased 6-bit field, returning a value in `[-32, 31]`.
    pub fn get_int6(&self, bit_index: usize) -> i32 {
        get_bits(&self.bytes, bit_index, INT6_BITS) as i32 - INT6_BIAS
    }

    /// Writes `value` (clamped to `[-32, 31]`) as a biased 6-bit field.
    pub fn set_int6(&mut self, bit_index: usize, value: i32) {
        let biased = (value.clamp(-INT6_BIAS, INT6_BIAS - 1) + INT6_BIAS) as u32;
        set_bits(&mut self.bytes, bit_index, INT6_BITS, biased);
    }

    /// Returns the backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bits_msb_first() {
        let view = BitView::from_bytes(vec![0b10101010]);

        for i in 0..8 {
            assert_eq!(view.get_bit(i), if i % 2 == 0 { 1 } else { 0 });
        }
    }

    #[test]
    fn test_set_bit() {
        let mut view = BitView::with_bit_len(16);
        view.set_bit(0, 1);
        view.set_bit(9, 1);
        view.set_bit(15, 1);
        assert_eq!(view.as_bytes(), &[0b1000_0000, 0b0100_0001]);

        view.set_bit(9, 0);
        assert_eq!(view.as_bytes(), &[0b1000_0000, 0b0000_0001]);
    }

    #[test]
    fn test_int12_wire_is_biased() {
        let mut view = BitView::with_bit_len(12);
        view.set_int12(0, 0);
        // 2048 = 0b1000_0000_0000
        assert_eq!(view.as_bytes(), &[0b1000_0000, 0b0000_0000]);

        view.set_int12(0, -2048);
        assert_eq!(view.as_bytes(), &[0, 0]);

        view.set_int12(0, 2047);
        assert_eq!(view.as_bytes(), &[0xFF, 0xF0]);
    }

    #[test]
    fn test_int6_wire_is_biased() {
        let mut view = BitView::with_bit_len(6);
        view.set_int6(0, -32);
        assert_eq!(view.as_bytes(), &[0]);

        view.set_int6(0, 31);
        assert_eq!(view.as_bytes(), &[0b1111_1100]);
    }

    #[test]
    fn test_int12_round_trip_every_offset() {
        for offset in 0..24 {
            for value in -2048..=2047 {
                let mut view = BitView::with_bit_len(offset + INT12_BITS);
                view.set_int12(offset, value);
                assert_eq!(view.get_int12(offset), value, "offset {}", offset);
            }
        }
    }

    #[test]
    fn test_int6_round_trip_every_offset() {
        for offset in 0..24 {
            for value in -32..=31 {
                let mut view = BitView::with_bit_len(offset + INT6_BITS);
                view.set_int6(offset, value);
                assert_eq!(view.get_int6(offset), value, "offset {}", offset);
            }
        }
    }

    #[test]
    fn test_fields_preserve_neighbouring_bits() {
        for offset in 1..16 {
            let mut view = BitView::from_bytes(vec![0xFF; 4]);
            view.set_int12(offset, -2048);

            for i in 0..32 {
                let expected = if (offset..offset + INT12_BITS).contains(&i) { 0 } else { 1 };
                assert_eq!(view.get_bit(i), expected, "offset {} bit {}", offset, i);
            }
        }
    }

    #[test]
    fn test_packed_sequence_straddling_bytes() {
        // 12 + 6 + 6 + 12 + 6 = 42 bits, no alignment padding between fields.
        let mut view = BitView::with_bit_len(42);
        view.set_int12(0, 1000);
        view.set_int6(12, -5);
        view.set_int6(18, 31);
        view.set_int12(24, -1999);
        view.set_int6(36, -32);

        assert_eq!(view.as_bytes().len(), 6);
        assert_eq!(view.get_int12(0), 1000);
        assert_eq!(view.get_int6(12), -5);
        assert_eq!(view.get_int6(18), 31);
        assert_eq!(view.get_int12(24), -1999);
        assert_eq!(view.get_int6(36), -32);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut view = BitView::with_bit_len(18);
        view.set_int12(0, 5000);
        view.set_int6(12, -100);
        assert_eq!(view.get_int12(0), 2047);
        assert_eq!(view.get_int6(12), -32);
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(byte_len(0), 0);
        assert_eq!(byte_len(1), 1);
        assert_eq!(byte_len(8), 1);
        assert_eq!(byte_len(9), 2);
        assert_eq!(byte_len(42), 6);
    }
}
