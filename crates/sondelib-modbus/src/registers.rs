//! Typed access to register payload bytes.
//!
//! Modbus orders registers big-endian, but many sensor firmwares store
//! multi-byte values little-endian at the byte level inside the register
//! block. Every accessor therefore takes an explicit [`Endian`].
//!
//! Offsets are byte offsets into whatever slice the caller passes, usually
//! a whole validated reply frame. An offset that runs past the end of the
//! slice is a caller bug (the reply length is checked against the layout
//! before decoding) and panics.

use bytes::{Buf, BufMut};

/// Byte order of a multi-byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Most significant byte first (Modbus standard).
    Big,
    /// Least significant byte first.
    Little,
}

/// Decode a `u16` at `offset`.
pub fn u16_from(bytes: &[u8], offset: usize, endian: Endian) -> u16 {
    let mut src = &bytes[offset..offset + 2];
    match endian {
        Endian::Big => src.get_u16(),
        Endian::Little => src.get_u16_le(),
    }
}

/// Encode `value` as a `u16` at `offset`.
pub fn u16_into(buf: &mut [u8], offset: usize, value: u16, endian: Endian) {
    let mut dst = &mut buf[offset..offset + 2];
    match endian {
        Endian::Big => dst.put_u16(value),
        Endian::Little => dst.put_u16_le(value),
    }
}

/// Decode a `u32` at `offset`.
pub fn u32_from(bytes: &[u8], offset: usize, endian: Endian) -> u32 {
    let mut src = &bytes[offset..offset + 4];
    match endian {
        Endian::Big => src.get_u32(),
        Endian::Little => src.get_u32_le(),
    }
}

/// Encode `value` as a `u32` at `offset`.
pub fn u32_into(buf: &mut [u8], offset: usize, value: u32, endian: Endian) {
    let mut dst = &mut buf[offset..offset + 4];
    match endian {
        Endian::Big => dst.put_u32(value),
        Endian::Little => dst.put_u32_le(value),
    }
}

/// Decode an IEEE-754 single-precision float at `offset`.
///
/// # Example
///
/// ```
/// use sondelib_modbus::registers::{f32_from, Endian};
///
/// // 25.0 stored little-endian after a 3-byte reply header
/// let frame = [0x01, 0x03, 0x04, 0x00, 0x00, 0xC8, 0x41];
/// assert_eq!(f32_from(&frame, 3, Endian::Little), 25.0);
/// ```
pub fn f32_from(bytes: &[u8], offset: usize, endian: Endian) -> f32 {
    let mut src = &bytes[offset..offset + 4];
    match endian {
        Endian::Big => src.get_f32(),
        Endian::Little => src.get_f32_le(),
    }
}

/// Encode `value` as an IEEE-754 single-precision float at `offset`.
pub fn f32_into(buf: &mut [u8], offset: usize, value: f32, endian: Endian) {
    let mut dst = &mut buf[offset..offset + 4];
    match endian {
        Endian::Big => dst.put_f32(value),
        Endian::Little => dst.put_f32_le(value),
    }
}

/// Encode a run of floats back to back, as written to calibration blocks.
pub fn f32s_to_bytes(values: &[f32], endian: Endian) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * 4];
    for (i, &value) in values.iter().enumerate() {
        f32_into(&mut buf, i * 4, value, endian);
    }
    buf
}

/// Decode `count` consecutive floats starting at `offset`.
pub fn f32s_from(bytes: &[u8], offset: usize, count: usize, endian: Endian) -> Vec<f32> {
    (0..count)
        .map(|i| f32_from(bytes, offset + i * 4, endian))
        .collect()
}

/// Copy `len` bytes at `offset` as text.
///
/// Serial-number replies sometimes carry a stray `)` before the first
/// character; a single leading `)` is dropped. Trailing NUL padding is
/// removed and non-ASCII bytes are replaced.
pub fn ascii_from(bytes: &[u8], offset: usize, len: usize) -> String {
    let field = &bytes[offset..offset + len];
    let field = field.strip_prefix(b")").unwrap_or(field);
    String::from_utf8_lossy(field)
        .trim_end_matches('\0')
        .to_string()
}
