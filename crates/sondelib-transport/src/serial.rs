//! Serial port transport for sensor buses.
//!
//! [`SerialTransport`] implements the blocking [`Transport`] trait on top of
//! the `serialport` crate. Reads never block longer than the configured
//! read timeout; the line discipline above polls
//! [`bytes_available`](Transport::bytes_available) and only reads what has
//! arrived.
//!
//! Most adapters switch RS-485 direction by themselves. Bare transceivers
//! wired to RTS can be driven with [`RtsEnableLine`], which owns a clone of
//! the port handle.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, error, info, trace, warn};

use sondelib_core::error::{Error, Result};
use sondelib_core::transport::{EnableLine, Transport};

/// Serial port configuration.
///
/// Defaults match the factory setting of the sensors: 9600 baud, 8 data
/// bits, 1 stop bit, no parity, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g., 9600, 19200, 38400)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (None on RS-485)
    pub flow_control: FlowControl,
    /// Upper bound on a single blocking read
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_millis(10),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .map_err(|e| Error::Transport(format!("cannot enumerate serial ports: {e}")))
}

/// Map an I/O failure on an open port to the transport error taxonomy.
fn io_error(port: &str, op: &str, e: io::Error) -> Error {
    error!(port = %port, error = %e, "serial {} failed", op);
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

fn port_error(port: &str, op: &str, e: serialport::Error) -> Error {
    error!(port = %port, error = %e, "serial {} failed", op);
    Error::Transport(format!("{op} on {port}: {e}"))
}

/// Serial port transport.
pub struct SerialTransport {
    /// The underlying port; `None` once closed
    port: Option<Box<dyn SerialPort>>,
    /// Port name for logging/debugging
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port at `baud_rate`, 8N1, no flow control.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use sondelib_transport::SerialTransport;
    /// # fn example() -> sondelib_core::Result<()> {
    /// let transport = SerialTransport::open("/dev/ttyUSB0", 9600)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, &config)
    }

    /// Open a serial port with full configuration control.
    pub fn open_with_config(port: &str, config: &SerialConfig) -> Result<Self> {
        debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "opening serial port"
        );

        let mut serial = serialport::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| {
                error!(port = %port, error = %e, "failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        // RTS idles low so an RTS-wired transceiver starts out receiving.
        if let Err(e) = serial.write_request_to_send(false) {
            warn!(port = %port, error = %e, "failed to de-assert RTS");
        }

        info!(port = %port, baud_rate = config.baud_rate, "serial port opened");

        Ok(Self {
            port: Some(serial),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// A driver-enable line on this port's RTS output.
    pub fn rts_enable_line(&self) -> Result<RtsEnableLine> {
        let port = self.port.as_ref().ok_or(Error::NotConnected)?;
        let clone = port
            .try_clone()
            .map_err(|e| port_error(&self.port_name, "clone", e))?;
        Ok(RtsEnableLine {
            port: clone,
            port_name: self.port_name.clone(),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(Error::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!(port = %self.port_name, bytes = data.len(), data = ?data, "sending data");
        let name = self.port_name.clone();
        self.port_mut()?
            .write_all(data)
            .map_err(|e| io_error(&name, "write", e))
    }

    fn flush(&mut self) -> Result<()> {
        let name = self.port_name.clone();
        self.port_mut()?
            .flush()
            .map_err(|e| io_error(&name, "flush", e))
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let name = self.port_name.clone();
        let n = self
            .port_mut()?
            .bytes_to_read()
            .map_err(|e| port_error(&name, "bytes_to_read", e))?;
        Ok(n as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let name = self.port_name.clone();
        match self.port_mut()?.read(buf) {
            Ok(n) => {
                trace!(port = %name, bytes = n, data = ?&buf[..n], "received data");
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(io_error(&name, "read", e)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            debug!(port = %self.port_name, "closing serial port");
            if let Err(e) = port.flush() {
                warn!(port = %self.port_name, error = %e, "failed to flush before closing");
            }
            if let Err(e) = port.clear(ClearBuffer::All) {
                warn!(port = %self.port_name, error = %e, "failed to clear buffers before closing");
            }
            info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}

/// RS-485 driver-enable on the RTS output of a serial port.
///
/// Asserting the line raises RTS, switching the transceiver to transmit.
pub struct RtsEnableLine {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl EnableLine for RtsEnableLine {
    fn assert(&mut self) -> Result<()> {
        trace!(port = %self.port_name, "RTS high");
        self.port
            .write_request_to_send(true)
            .map_err(|e| port_error(&self.port_name, "set RTS", e))
    }

    fn deassert(&mut self) -> Result<()> {
        trace!(port = %self.port_name, "RTS low");
        self.port
            .write_request_to_send(false)
            .map_err(|e| port_error(&self.port_name, "clear RTS", e))
    }
}
