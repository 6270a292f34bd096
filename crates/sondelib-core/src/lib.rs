//! sondelib-core: Core traits, types, and error definitions for sondelib.
//!
//! This crate defines the sensor-agnostic abstractions shared by every
//! sondelib crate. The Modbus engine, the serial transport and the sensor
//! drivers all depend on these types, so applications can program against
//! them without pulling in a specific backend.
//!
//! # Key types
//!
//! - [`Transport`] -- blocking byte-level communication channel
//! - [`EnableLine`] -- RS-485 driver-enable output
//! - [`SensorDefinition`] / [`SensorInfo`] -- static model descriptions
//! - [`Error`] / [`FrameError`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

pub use error::{Error, FrameError, Result};
pub use transport::{EnableLine, Transport};
pub use types::*;
