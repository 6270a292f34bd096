//! Transport and enable-line traits for sensor communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a sensor
//! bus. The Modbus line transceiver in `sondelib-modbus` operates on a
//! `Transport` rather than directly on a serial port, enabling both real
//! hardware control and deterministic unit testing with `MockTransport`
//! from the `sondelib-test-harness` crate.
//!
//! All calls are blocking. Exactly one transaction is ever in flight on a
//! given transport, so no async machinery is involved.

use crate::error::Result;

/// Blocking byte-level transport to a sensor bus.
///
/// The transport is handed over already opened and configured; the protocol
/// layer never changes baud rate or framing parameters.
pub trait Transport: Send {
    /// Queue raw bytes for transmission.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Block until every queued byte has physically left the port.
    fn flush(&mut self) -> Result<()>;

    /// Number of received bytes that can be read without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` already-received bytes.
    ///
    /// Returns the number of bytes copied, which may be zero.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent calls should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Digital output controlling the direction of a half-duplex RS-485
/// transceiver.
///
/// Asserted means "driver" (we transmit), deasserted means "receiver" (the
/// sensor may reply). Settle timing around the switch belongs to the line
/// transceiver, not to implementations of this trait.
pub trait EnableLine: Send {
    /// Switch the transceiver to driver mode.
    fn assert(&mut self) -> Result<()>;

    /// Switch the transceiver back to receiver mode.
    fn deassert(&mut self) -> Result<()>;
}
