//! Core types used throughout sondelib.

use std::fmt;

/// Placeholder written into measurement slots when a read fails.
///
/// Chosen to be physically implausible for every supported parameter.
pub const SENTINEL_VALUE: f32 = -9999.0;

/// Placeholder error code reported alongside [`SENTINEL_VALUE`].
pub const SENTINEL_ERROR: u8 = 0xFF;

/// Static description of a supported sensor model.
///
/// Returned by the facade's `supported_sensors()` so applications can list
/// the models they can talk to without opening a port.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDefinition {
    /// Sensor family or vendor line (e.g. "Yosemitech").
    pub family: &'static str,
    /// Human-readable model name (e.g. "Y504").
    pub model_name: &'static str,
    /// Name of the primary measured parameter.
    pub parameter: &'static str,
    /// Unit of the primary measured parameter.
    pub unit: &'static str,
    /// Default serial baud rate.
    pub default_baud_rate: u32,
}

impl fmt::Display for SensorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {})",
            self.family, self.model_name, self.parameter, self.unit
        )
    }
}

/// Information about the sensor a session is talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInfo {
    /// Human-readable model name, or "Unknown" before resolution.
    pub model_name: String,
    /// Name of the primary measured parameter.
    pub parameter: String,
    /// Unit of the primary measured parameter.
    pub unit: String,
    /// Modbus slave id the session addresses.
    pub slave_id: u8,
}
