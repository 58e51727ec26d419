//! Adaptive integer encoding.
//!
//! ```text
//! byte 0:    [C][S][m5 m4 m3 m2 m1 m0]      C = continuation, S = sign
//! byte 1..4: [C][m6+7k ... m0+7k]           up to four continuation bytes
//! ```
//!
//! Magnitude bits are little-endian across bytes (shifts 0, 6, 13, 20, 27),
//! giving 34 magnitude bits, enough for any `u32` and for `|i32::MIN|`.
//! Magnitudes are computed in a 64-bit intermediate so negating `i32::MIN`
//! never overflows. A set sign bit with a zero magnitude decodes to 0.

use crate::error::{CodecError, CodecResult};

/// Longest encoding the format allows.
pub const MAX_ENCODED_LEN: usize = 5;

const CONTINUATION: u8 = 0x80;
const SIGN: u8 = 0x40;
const FIRST_MASK: u8 = 0x3F;
const NEXT_MASK: u8 = 0x7F;
const FIRST_BITS: u32 = 6;
const NEXT_BITS: u32 = 7;

fn magnitude_len(magnitude: u64) -> usize {
    if magnitude < 1 << 6 {
        1
    } else if magnitude < 1 << 13 {
        2
    } else if magnitude < 1 << 20 {
        3
    } else if magnitude < 1 << 27 {
        4
    } else {
        5
    }
}

fn push_magnitude(out: &mut Vec<u8>, magnitude: u64, negative: bool, width: usize) {
    debug_assert!(width >= magnitude_len(magnitude) && width <= MAX_ENCODED_LEN);

    let mut first = (magnitude as u8) & FIRST_MASK;
    if negative {
        first |= SIGN;
    }
    if width > 1 {
        first |= CONTINUATION;
    }
    out.push(first);

    let mut rest = magnitude >> FIRST_BITS;
    for i in 1..width {
        let mut byte = (rest as u8) & NEXT_MASK;
        rest >>= NEXT_BITS;
        if i + 1 < width {
            byte |= CONTINUATION;
        }
        out.push(byte);
    }
}

/// Number of bytes [`encode_i32`] emits for `value`.
pub fn encoded_len_i32(value: i32) -> usize {
    magnitude_len(i64::from(value).unsigned_abs())
}

/// Number of bytes [`encode_u32`] emits for `value`.
pub fn encoded_len_u32(value: u32) -> usize {
    magnitude_len(u64::from(value))
}

/// Append the encoding of `value`. Returns the number of bytes written.
pub fn encode_i32(value: i32, out: &mut Vec<u8>) -> usize {
    let magnitude = i64::from(value).unsigned_abs();
    let width = magnitude_len(magnitude);
    push_magnitude(out, magnitude, value < 0, width);
    width
}

/// Append the encoding of `value`. Returns the number of bytes written.
pub fn encode_u32(value: u32, out: &mut Vec<u8>) -> usize {
    let magnitude = u64::from(value);
    let width = magnitude_len(magnitude);
    push_magnitude(out, magnitude, false, width);
    width
}

/// Append `value` encoded at exactly `width` bytes.
///
/// Surplus bytes carry zero magnitude bits behind continuation flags, so the
/// padded form decodes to the same value as the natural one.
pub fn encode_u32_padded(value: u32, width: usize, out: &mut Vec<u8>) -> CodecResult<()> {
    let magnitude = u64::from(value);
    if width < magnitude_len(magnitude) || width > MAX_ENCODED_LEN {
        return Err(CodecError::InvalidWidth {
            value: magnitude,
            width,
        });
    }
    push_magnitude(out, magnitude, false, width);
    Ok(())
}

/// Decode sign, magnitude and consumed length.
fn decode_raw(bytes: &[u8]) -> CodecResult<(bool, u64, usize)> {
    let first = *bytes.first().ok_or(CodecError::Truncated)?;
    let negative = first & SIGN != 0;
    let mut magnitude = u64::from(first & FIRST_MASK);
    let mut more = first & CONTINUATION != 0;
    let mut consumed = 1;
    let mut shift = FIRST_BITS;

    while more {
        if consumed == MAX_ENCODED_LEN {
            return Err(CodecError::Overflow);
        }
        let byte = *bytes.get(consumed).ok_or(CodecError::Truncated)?;
        magnitude |= u64::from(byte & NEXT_MASK) << shift;
        shift += NEXT_BITS;
        consumed += 1;
        more = byte & CONTINUATION != 0;
    }

    Ok((negative, magnitude, consumed))
}

/// Decode a signed value. Returns `(value, bytes_consumed)`.
pub fn decode_i32(bytes: &[u8]) -> CodecResult<(i32, usize)> {
    let (negative, magnitude, consumed) = decode_raw(bytes)?;
    let wide = if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    let value = i32::try_from(wide).map_err(|_| CodecError::Overflow)?;
    Ok((value, consumed))
}

/// Decode an unsigned value. Returns `(value, bytes_consumed)`.
pub fn decode_u32(bytes: &[u8]) -> CodecResult<(u32, usize)> {
    let (negative, magnitude, consumed) = decode_raw(bytes)?;
    if negative && magnitude != 0 {
        return Err(CodecError::Negative);
    }
    let value = u32::try_from(magnitude).map_err(|_| CodecError::Overflow)?;
    Ok((value, consumed))
}
