//! Yosemitech sensor backend for sondelib.
//!
//! This crate drives the Yosemitech family of water-quality sensors over
//! Modbus RTU. It provides:
//!
//! - **Model definitions** ([`models`]) -- one static register map per
//!   sensor (DO, conductivity, turbidity, chlorophyll, pH, multiparameter
//!   sonde) and model resolution from the serial number.
//! - **Commands** ([`commands`]) -- register addresses, payload encoders and
//!   reply parsers for the vendor's little-endian register payloads.
//! - **Oxygen solubility** ([`oxygen`]) -- Weiss (1970) fresh-water solubility
//!   used to derive DO concentration from percent saturation.
//! - **Sensor** ([`sensor`]) -- a session with one sensor: measurements,
//!   calibration, wiper control and identity.
//! - **SensorBuilder** ([`builder`]) -- fluent builder for `Sensor` sessions.
//!
//! # Example
//!
//! ```
//! use sondelib_yosemitech::models::{model_from_serial, register_map, SensorModel};
//!
//! let model = model_from_serial("0101190312A0B1");
//! assert_eq!(model, SensorModel::Y504);
//!
//! let map = register_map(model).unwrap();
//! assert_eq!(map.parameter, "Dissolved Oxygen");
//! assert_eq!(map.layout.arities(), &[1, 2, 3]);
//! ```

pub mod builder;
pub mod commands;
pub mod models;
pub mod oxygen;
pub mod sensor;
pub mod types;

pub use builder::SensorBuilder;
pub use models::{RegisterMap, SensorModel, ValueLayout};
pub use sensor::Sensor;
pub use types::{Calibration, FirmwareVersion, Measurement, PhCalibrationStatus};
