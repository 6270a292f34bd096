//! Transport implementations for sondelib.
//!
//! This crate provides the concrete [`Transport`](sondelib_core::Transport)
//! and [`EnableLine`](sondelib_core::EnableLine) implementations used with
//! RS-485 sensor buses:
//!
//! - [`SerialTransport`]: USB-to-RS-485 adapters and native UARTs, opened
//!   through the blocking `serialport` backend
//! - [`RtsEnableLine`]: drives the transceiver's driver-enable input from
//!   the serial port's RTS output
//!
//! # Example
//!
//! ```no_run
//! use sondelib_core::transport::{EnableLine, Transport};
//! use sondelib_transport::SerialTransport;
//!
//! # fn example() -> sondelib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600)?;
//! let mut enable = transport.rts_enable_line()?;
//!
//! // Read two registers at 0x0700 from slave 1
//! enable.assert()?;
//! transport.write(&[0x01, 0x03, 0x07, 0x00, 0x00, 0x02, 0xC5, 0x7F])?;
//! transport.flush()?;
//! enable.deassert()?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    available_ports, DataBits, FlowControl, Parity, RtsEnableLine, SerialConfig, SerialTransport,
    StopBits,
};
