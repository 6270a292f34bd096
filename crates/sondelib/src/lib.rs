//! # sondelib -- Modbus RTU control of environmental sensors
//!
//! `sondelib` talks to Yosemitech water-quality sensors (dissolved oxygen,
//! conductivity, turbidity, chlorophyll, pH and the multiparameter sonde)
//! over an RS-485 Modbus RTU bus. It is blocking and synchronous: every
//! call is a short, bounded sequence of request/reply transactions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sondelib::yosemitech::{SensorBuilder, SensorModel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut sensor = SensorBuilder::new(SensorModel::Y504)
//!         .serial_port("/dev/ttyUSB0")
//!         .rts_enable(true)
//!         .build()?;
//!
//!     let reading = sensor.get_values(3)?;
//!     println!("{:?}", reading.values);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                             |
//! |-------------------------|-----------------------------------------------------|
//! | `sondelib-core`         | Errors, [`Transport`] and [`EnableLine`] traits, types |
//! | `sondelib-modbus`       | CRC, frame and register codecs, line discipline, master |
//! | `sondelib-transport`    | Serial port transport, RTS driver-enable            |
//! | `sondelib-yosemitech`   | Register maps, measurement decoding, calibration    |
//! | **`sondelib`**          | This facade crate -- re-exports everything          |
//!
//! ## Feature Flags
//!
//! | Feature      | Enables                               | Default |
//! |--------------|---------------------------------------|---------|
//! | `yosemitech` | [`yosemitech`] module (sensor driver) | yes     |
//!
//! ## Error Handling
//!
//! Every operation returns [`Result`]. Failures are local to the call:
//! a timeout or a corrupted reply leaves the session usable and the next
//! call may succeed. Nothing is retried internally. Callers that prefer a
//! value over an error can use `Sensor::get_values_or_sentinel`, which
//! returns [`SENTINEL_VALUE`] readings with [`SENTINEL_ERROR`] status.

pub use sondelib_core::*;

/// Modbus RTU engine: CRC, frame codec, register codec, line transceiver
/// and the [`ModbusMaster`](modbus::ModbusMaster).
pub mod modbus {
    pub use sondelib_modbus::*;
}

/// Serial port transport.
pub mod transport {
    pub use sondelib_transport::*;
}

/// Yosemitech sensor backend.
///
/// Provides [`Sensor`](yosemitech::Sensor) and
/// [`SensorBuilder`](yosemitech::SensorBuilder).
#[cfg(feature = "yosemitech")]
pub mod yosemitech {
    pub use sondelib_yosemitech::*;
}

/// Every sensor model supported by the enabled backends.
///
/// # Example
///
/// ```
/// let sensors = sondelib::supported_sensors();
/// assert!(sensors.iter().any(|s| s.model_name == "Y4000"));
/// ```
pub fn supported_sensors() -> Vec<SensorDefinition> {
    #[allow(unused_mut)]
    let mut sensors = Vec::new();

    #[cfg(feature = "yosemitech")]
    {
        sensors.extend(
            yosemitech::models::all_register_maps()
                .iter()
                .map(SensorDefinition::from),
        );
    }

    sensors
}
