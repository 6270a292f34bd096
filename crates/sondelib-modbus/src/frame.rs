//! Modbus RTU frame encoder/validator.
//!
//! # Request format
//!
//! ```text
//! read:  <slave> 0x03 <addr hi> <addr lo> <count hi> <count lo> <crc lo> <crc hi>
//! write: <slave> 0x10 <addr hi> <addr lo> <count hi> <count lo> <bytes> <data...>
//!        <crc lo> <crc hi>
//! ```
//!
//! # Reply format
//!
//! ```text
//! read:      <slave> 0x03 <bytes> <data...> <crc lo> <crc hi>
//! write:     <slave> 0x10 <addr hi> <addr lo> <count hi> <count lo> <crc lo> <crc hi>
//! exception: <slave> <function | 0x80> <code> <crc lo> <crc hi>
//! ```
//!
//! Addresses and counts are big-endian as Modbus requires. Register
//! contents are opaque here; see [`registers`](crate::registers).

use bytes::{BufMut, BytesMut};
use sondelib_core::FrameError;

use crate::crc::{append_crc, crc16, trailing_crc};

/// Read holding registers.
pub const READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write multiple registers.
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set in the function byte of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Smallest legal reply: slave, function, one byte, two CRC bytes.
pub const MIN_FRAME_LEN: usize = 5;

/// Length of a write-multiple-registers acknowledgement.
pub const WRITE_ACK_LEN: usize = 8;

/// Bytes of overhead around the data of a read reply
/// (slave, function, byte count, CRC).
pub const READ_REPLY_OVERHEAD: usize = 5;

/// What a request asks the slave to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody<'a> {
    /// Read `count` holding registers.
    Read { count: u16 },
    /// Write `data` (whole registers, so an even number of bytes).
    Write { data: &'a [u8] },
}

impl RequestBody<'_> {
    /// The function code this body is sent with.
    pub fn function_code(&self) -> u8 {
        match self {
            RequestBody::Read { .. } => READ_HOLDING_REGISTERS,
            RequestBody::Write { .. } => WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Length of the reply a conforming slave sends back.
    pub fn reply_len(&self) -> usize {
        match self {
            RequestBody::Read { count } => READ_REPLY_OVERHEAD + 2 * *count as usize,
            RequestBody::Write { .. } => WRITE_ACK_LEN,
        }
    }
}

/// Which slave ids a reply may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveMatch {
    /// Only the addressed slave.
    Exact(u8),
    /// Any slave (broadcast-style queries).
    Any,
}

/// Build a complete request frame, CRC included.
///
/// # Example
///
/// ```
/// use sondelib_modbus::frame::{build_request, RequestBody};
///
/// let frame = build_request(0x01, 0x3000, RequestBody::Write { data: &[0x05, 0x00] });
/// assert_eq!(&frame[..9], &[0x01, 0x10, 0x30, 0x00, 0x00, 0x01, 0x02, 0x05, 0x00]);
/// ```
pub fn build_request(slave_id: u8, start_addr: u16, body: RequestBody<'_>) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(9 + body_len(&body));
    buf.put_u8(slave_id);
    buf.put_u8(body.function_code());
    buf.put_u16(start_addr);
    match body {
        RequestBody::Read { count } => buf.put_u16(count),
        RequestBody::Write { data } => {
            debug_assert!(data.len() % 2 == 0, "write payload must be whole registers");
            buf.put_u16((data.len() / 2) as u16);
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }
    }
    append_crc(&mut buf);
    buf.to_vec()
}

fn body_len(body: &RequestBody<'_>) -> usize {
    match body {
        RequestBody::Read { .. } => 0,
        RequestBody::Write { data } => data.len(),
    }
}

/// A reply that passed length, CRC and slave-id validation.
///
/// Borrowed from the transaction buffer; decode what you need before the
/// next transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    raw: &'a [u8],
}

impl<'a> ResponseFrame<'a> {
    /// The slave id the reply came from.
    pub fn slave_id(&self) -> u8 {
        self.raw[0]
    }

    /// The function byte, including the exception flag if set.
    pub fn function(&self) -> u8 {
        self.raw[1]
    }

    /// Bytes between the function byte and the CRC.
    pub fn payload(&self) -> &'a [u8] {
        &self.raw[2..self.raw.len() - 2]
    }

    /// The whole frame, slave id through CRC.
    ///
    /// Vendor layouts are documented as offsets into this slice.
    pub fn bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Always `false`: a validated frame holds at least [`MIN_FRAME_LEN`] bytes.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns `true` if the device answered with an exception.
    pub fn is_exception(&self) -> bool {
        self.function() & EXCEPTION_FLAG != 0
    }

    /// Check the reply answers `function` and has one of the `lengths`
    /// expected for it.
    pub fn expect(&self, function: u8, lengths: &[usize]) -> Result<(), FrameError> {
        if self.function() == function | EXCEPTION_FLAG {
            return Err(FrameError::Exception {
                function,
                code: self.raw[2],
            });
        }
        if self.function() != function {
            return Err(FrameError::FunctionMismatch {
                expected: function,
                actual: self.function(),
            });
        }
        if !lengths.contains(&self.raw.len()) {
            return Err(FrameError::LengthMismatch {
                expected: lengths.to_vec(),
                actual: self.raw.len(),
            });
        }
        Ok(())
    }
}

/// Validate an inbound frame's length, CRC and slave id.
///
/// # Example
///
/// ```
/// use sondelib_modbus::frame::{validate_response, SlaveMatch};
///
/// let reply = [0x01, 0x03, 0x02, 0x01, 0x00, 0xB9, 0xD4];
/// let frame = validate_response(&reply, SlaveMatch::Exact(0x01)).unwrap();
/// assert_eq!(frame.payload(), &[0x02, 0x01, 0x00]);
/// ```
pub fn validate_response(frame: &[u8], slave: SlaveMatch) -> Result<ResponseFrame<'_>, FrameError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::ShortFrame { len: frame.len() });
    }

    let body = &frame[..frame.len() - 2];
    let computed = crc16(body);
    let received = trailing_crc(frame).unwrap_or_default();
    if computed != received {
        return Err(FrameError::CrcMismatch { received, computed });
    }

    if let SlaveMatch::Exact(expected) = slave {
        if frame[0] != expected {
            return Err(FrameError::SlaveIdMismatch {
                expected,
                actual: frame[0],
            });
        }
    }

    Ok(ResponseFrame { raw: frame })
}
