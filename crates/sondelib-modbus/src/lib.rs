//! Modbus RTU master engine for sondelib.
//!
//! This crate implements the subset of Modbus RTU that environmental
//! sensors speak: read holding registers (0x03) and write multiple
//! registers (0x10). It provides:
//!
//! - **CRC engine** ([`crc`]) -- CRC-16/Modbus, transmitted low byte first.
//! - **Frame codec** ([`frame`]) -- build requests and validate replies
//!   (length, slave id, function code, CRC).
//! - **Register codec** ([`registers`]) -- byte-order-aware `u16`, `u32`,
//!   `f32` and ASCII field access at byte offsets.
//! - **Line transceiver** ([`line`]) -- half-duplex RS-485 direction
//!   switching, bounded wait for the first reply byte, trailing-byte drain.
//! - **ModbusMaster** ([`master`]) -- the single transaction chokepoint
//!   combining all of the above.
//!
//! # Example
//!
//! ```
//! use sondelib_modbus::frame::{build_request, RequestBody};
//!
//! // Read 10 holding registers from address 0 of slave 1
//! let frame = build_request(0x01, 0x0000, RequestBody::Read { count: 10 });
//! assert_eq!(frame, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]);
//! ```

pub mod crc;
pub mod frame;
pub mod line;
pub mod master;
pub mod registers;

pub use frame::{RequestBody, ResponseFrame, SlaveMatch};
pub use line::{LineConfig, LineTransceiver};
pub use master::ModbusMaster;
pub use registers::Endian;
