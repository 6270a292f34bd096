//! CRC-16/Modbus.
//!
//! Seed `0xFFFF`, reflected polynomial `0xA001`. On the wire the checksum
//! follows the frame body low byte first.

use bytes::{BufMut, BytesMut};

/// Compute the Modbus RTU CRC-16 of `bytes`.
///
/// # Example
///
/// ```
/// use sondelib_modbus::crc::crc16;
///
/// assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]), 0xCDC5);
/// ```
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the CRC of everything already in `buf`, low byte first.
pub fn append_crc(buf: &mut BytesMut) {
    let crc = crc16(buf);
    buf.put_u16_le(crc);
}

/// The CRC carried in the last two bytes of `frame`.
///
/// Returns `None` for frames shorter than two bytes.
pub fn trailing_crc(frame: &[u8]) -> Option<u16> {
    match frame {
        [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// Returns `true` if the last two bytes of `frame` are the CRC of the rest.
pub fn check_crc(frame: &[u8]) -> bool {
    match trailing_crc(frame) {
        Some(received) => crc16(&frame[..frame.len() - 2]) == received,
        None => false,
    }
}
