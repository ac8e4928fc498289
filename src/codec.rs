//! Constants and field model shared by the compressor and decompressor.
//!
//! Coordinates go through two quantization stages. Stage 1 maps degrees to
//! a 16-bit signed range with `round(v / 180 * 32767)`. Stage 2 divides by
//! 16 (truncating toward zero), leaving values in `[-2047, 2047]` so they
//! fit a 12-bit field with `-2048` free to act as the part terminator.
//!
//! The point stream is then a sequence of [`Field`]s:
//!
//! ```text
//! part  := span* Wide(-2048)
//! span  := Wide(x) Wide(y) (Narrow(dx) Narrow(dy))* Narrow(-32)
//! ```

/// Compact format version for models without Z or M values.
pub const VERSION_PLAIN: u8 = 1;
/// Compact format version for models carrying Z or M values.
pub const VERSION_ZM: u8 = 2;

/// Size of the fixed compact header in bytes.
pub const COMPACT_HEADER_LEN: usize = 14;

/// Stage-1 scale: degrees / 180 * SCALE.
pub const QUANT_SCALE: f64 = 32767.0;
pub const DEGREE_SPAN: f64 = 180.0;
/// Stage-2 divisor.
pub const STAGE2_DIVISOR: i32 = 16;

/// Largest coordinate magnitude after stage 2.
pub const MAX_COORD: i32 = 2047;

/// Part terminator in the stage-1 stream.
pub const PART_END_RAW: i32 = -32768;
/// Part terminator after stage 2, written as a 12-bit field.
pub const PART_END: i32 = PART_END_RAW / STAGE2_DIVISOR;
/// Span terminator, written as a 6-bit field.
pub const SPAN_END: i32 = -32;
/// Largest delta magnitude a 6-bit field carries.
pub const MAX_DELTA: i32 = 31;

/// One packed field of the point stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// 12-bit absolute coordinate or part terminator.
    Wide(i32),
    /// 6-bit delta or span terminator.
    Narrow(i32),
}

impl Field {
    /// Width of the field in bits.
    pub fn width(self) -> usize {
        match self {
            Field::Wide(_) => crate::bitview::INT12_BITS,
            Field::Narrow(_) => crate::bitview::INT6_BITS,
        }
    }
}

/// Stage-1 quantization of a coordinate in degrees.
pub fn quantize(degrees: f64) -> i32 {
    (degrees / DEGREE_SPAN * QUANT_SCALE)
        .round()
        .clamp(-QUANT_SCALE, QUANT_SCALE) as i32
}

/// Maps a stage-1 value back to degrees.
pub fn dequantize(value: i32) -> f64 {
    value as f64 / QUANT_SCALE * DEGREE_SPAN
}

/// True if both deltas fit a 6-bit field without colliding with [`SPAN_END`].
pub fn fits_delta(dx: i32, dy: i32) -> bool {
    dx.abs() <= MAX_DELTA && dy.abs() <= MAX_DELTA
}
