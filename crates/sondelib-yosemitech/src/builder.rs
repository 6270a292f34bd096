//! SensorBuilder -- fluent builder for constructing [`Sensor`] sessions.
//!
//! Separates configuration (slave id, serial parameters, line timing,
//! direction control) from construction, so the serial port is only
//! opened once everything has been validated.
//!
//! # Example
//!
//! ```no_run
//! use sondelib_yosemitech::builder::SensorBuilder;
//! use sondelib_yosemitech::models::SensorModel;
//! use std::time::Duration;
//!
//! # fn example() -> sondelib_core::Result<()> {
//! let mut sensor = SensorBuilder::new(SensorModel::Y504)
//!     .serial_port("/dev/ttyUSB0")
//!     .slave_id(0x01)
//!     .rts_enable(true)
//!     .response_timeout(Duration::from_millis(800))
//!     .build()?;
//! let reading = sensor.get_values(3)?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::{debug, warn};

use sondelib_core::error::{Error, Result};
use sondelib_core::transport::{EnableLine, Transport};
use sondelib_modbus::{LineConfig, LineTransceiver, ModbusMaster};
use sondelib_transport::{SerialConfig, SerialTransport};

use crate::models::{SensorModel, DEFAULT_BAUD_RATE, DEFAULT_SLAVE_ID};
use crate::sensor::{Sensor, MAX_SLAVE_ID};

/// Fluent builder for [`Sensor`].
///
/// Pass [`SensorModel::Unknown`] to have the model read from the serial
/// number when the session is built.
pub struct SensorBuilder {
    model: SensorModel,
    slave_id: u8,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    enable_line: Option<Box<dyn EnableLine>>,
    rts_enable: bool,
    line: LineConfig,
    write_ack_lengths: Option<Vec<usize>>,
    auto_resolve: bool,
}

impl SensorBuilder {
    /// Create a new builder for the given model.
    pub fn new(model: SensorModel) -> Self {
        SensorBuilder {
            model,
            slave_id: DEFAULT_SLAVE_ID,
            serial_port: None,
            baud_rate: None,
            enable_line: None,
            rts_enable: false,
            line: LineConfig::default(),
            write_ack_lengths: None,
            auto_resolve: true,
        }
    }

    /// Set the Modbus slave id (default `0x01`).
    pub fn slave_id(mut self, id: u8) -> Self {
        self.slave_id = id;
        self
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default 9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Drive the RS-485 transceiver direction from an external output.
    pub fn enable_line(mut self, line: Box<dyn EnableLine>) -> Self {
        self.enable_line = Some(line);
        self
    }

    /// Drive the RS-485 transceiver direction from the serial port's RTS
    /// line. Only used by [`build`](Self::build).
    pub fn rts_enable(mut self, enabled: bool) -> Self {
        self.rts_enable = enabled;
        self
    }

    /// Maximum wait for the first reply byte (default 500 ms).
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.line.response_timeout = timeout;
        self
    }

    /// Hold time after each direction switch (default 8 ms).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.line.settle_delay = delay;
        self
    }

    /// Sleep between transport polls while waiting (default 1 ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.line.poll_interval = interval;
        self
    }

    /// Silence that ends a reply (default 10 ms).
    pub fn frame_gap(mut self, gap: Duration) -> Self {
        self.line.frame_gap = gap;
        self
    }

    /// Replace the whole line timing configuration.
    pub fn line_config(mut self, config: LineConfig) -> Self {
        self.line = config;
        self
    }

    /// Accept these write acknowledgement lengths instead of the model's.
    pub fn write_ack_lengths(mut self, lengths: &[usize]) -> Self {
        self.write_ack_lengths = Some(lengths.to_vec());
        self
    }

    /// Resolve an `Unknown` model while building (default `true`).
    pub fn auto_resolve(mut self, enabled: bool) -> Self {
        self.auto_resolve = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.slave_id == 0 || self.slave_id > MAX_SLAVE_ID {
            return Err(Error::InvalidParameter(format!(
                "slave id {} outside 1..={MAX_SLAVE_ID}",
                self.slave_id
            )));
        }
        if self.rts_enable && self.enable_line.is_some() {
            return Err(Error::InvalidParameter(
                "rts_enable and enable_line are mutually exclusive".into(),
            ));
        }
        if matches!(&self.write_ack_lengths, Some(lengths) if lengths.is_empty()) {
            return Err(Error::InvalidParameter(
                "write_ack_lengths must not be empty".into(),
            ));
        }
        if self.line.response_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "response_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Build a [`Sensor`] on a caller-provided transport.
    ///
    /// Used for testing with a `MockTransport` and for adapters this crate
    /// does not open itself.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Sensor> {
        self.validate()?;
        Ok(self.assemble(transport))
    }

    fn assemble(self, transport: Box<dyn Transport>) -> Sensor {
        let line = LineTransceiver::new(transport, self.enable_line, self.line);
        let mut sensor = Sensor::new(
            ModbusMaster::new(line),
            self.model,
            self.slave_id,
            self.write_ack_lengths,
        );

        if self.auto_resolve && self.model.is_unknown() {
            match sensor.resolve_model() {
                Ok(model) => debug!(%model, "model resolved on connect"),
                Err(e) => {
                    warn!(error = %e, "could not resolve sensor model, continuing as Unknown")
                }
            }
        }
        sensor
    }

    /// Open the configured serial port and build a [`Sensor`].
    ///
    /// The port is opened 8N1 without flow control.
    pub fn build(mut self) -> Result<Sensor> {
        self.validate()?;
        let port = self
            .serial_port
            .clone()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let config = SerialConfig {
            baud_rate: self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            ..SerialConfig::default()
        };

        let transport = SerialTransport::open_with_config(&port, &config)?;
        if self.rts_enable {
            self.enable_line = Some(Box::new(transport.rts_enable_line()?));
        }
        Ok(self.assemble(Box::new(transport)))
    }
}
