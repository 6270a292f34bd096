//! ModbusMaster -- the transaction chokepoint.
//!
//! Every sensor operation passes through [`ModbusMaster::request`]: build
//! the frame, run it through the line transceiver, validate the reply. The
//! reply is returned as a [`ResponseFrame`] borrowing the master's receive
//! buffer, so it must be decoded before the next transaction starts.

use tracing::debug;

use sondelib_core::error::{Error, Result};

use crate::frame::{build_request, validate_response, RequestBody, ResponseFrame, SlaveMatch};
use crate::line::LineTransceiver;

/// Receive buffer capacity.
///
/// The largest reply in the sensor family is a 16-register read
/// (1 + 1 + 1 + 32 + 2 = 37 bytes).
pub const RESPONSE_CAPACITY: usize = 40;

/// Modbus RTU master owning one line and its receive buffer.
pub struct ModbusMaster {
    line: LineTransceiver,
    buffer: [u8; RESPONSE_CAPACITY],
}

impl ModbusMaster {
    /// Create a master on top of a line transceiver.
    pub fn new(line: LineTransceiver) -> Self {
        ModbusMaster {
            line,
            buffer: [0u8; RESPONSE_CAPACITY],
        }
    }

    /// Access the line transceiver (timing, connection state).
    pub fn line(&self) -> &LineTransceiver {
        &self.line
    }

    /// Send a complete frame and return the raw reply bytes.
    ///
    /// Fails with [`Error::Timeout`] when nothing comes back.
    pub fn send_command(&mut self, frame: &[u8]) -> Result<&[u8]> {
        let n = self.line.transact(frame, &mut self.buffer)?;
        Ok(&self.buffer[..n])
    }

    /// Run one request and validate the reply.
    ///
    /// `lengths` lists every reply length accepted for this request; pass
    /// `&[body.reply_len()]` when the firmware follows the standard.
    pub fn request(
        &mut self,
        slave_id: u8,
        accept: SlaveMatch,
        start_addr: u16,
        body: RequestBody<'_>,
        lengths: &[usize],
    ) -> Result<ResponseFrame<'_>> {
        let function = body.function_code();
        let frame = build_request(slave_id, start_addr, body);
        let raw = self.send_command(&frame)?;
        let reply = validate_response(raw, accept)?;
        reply.expect(function, lengths)?;
        debug!(
            slave = reply.slave_id(),
            function,
            address = start_addr,
            bytes = reply.len(),
            "transaction complete"
        );
        Ok(reply)
    }

    /// Read `count` holding registers from `slave_id`.
    pub fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        count: u16,
    ) -> Result<ResponseFrame<'_>> {
        let body = RequestBody::Read { count };
        let expected = [body.reply_len()];
        self.request(slave_id, SlaveMatch::Exact(slave_id), start_addr, body, &expected)
    }

    /// Read holding registers accepting a reply from any slave id.
    pub fn query_holding_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        count: u16,
    ) -> Result<ResponseFrame<'_>> {
        let body = RequestBody::Read { count };
        let expected = [body.reply_len()];
        self.request(slave_id, SlaveMatch::Any, start_addr, body, &expected)
    }

    /// Write `data` starting at `start_addr`; `ack_lengths` lists the
    /// acknowledgement lengths this firmware is known to send.
    pub fn write_multiple_registers(
        &mut self,
        slave_id: u8,
        start_addr: u16,
        data: &[u8],
        ack_lengths: &[usize],
    ) -> Result<()> {
        if data.len() % 2 != 0 || data.len() > 246 {
            return Err(Error::InvalidParameter(format!(
                "write payload of {} bytes is not a whole number of registers",
                data.len()
            )));
        }
        self.request(
            slave_id,
            SlaveMatch::Exact(slave_id),
            start_addr,
            RequestBody::Write { data },
            ack_lengths,
        )?;
        Ok(())
    }

    /// Close the underlying transport.
    pub fn close(&mut self) -> Result<()> {
        self.line.close()
    }
}
