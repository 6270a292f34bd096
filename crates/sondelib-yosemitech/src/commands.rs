//! Register addresses, payload encoders and reply parsers.
//!
//! Everything here is pure: encoders produce register payloads for
//! [`write_multiple_registers`](sondelib_modbus::ModbusMaster::write_multiple_registers)
//! and parsers take the bytes of a reply that has already been validated
//! (length, slave id, CRC). Offsets index the whole reply frame, so the
//! first data byte of a read reply is at offset 3.
//!
//! Vendor payloads are little-endian inside each register pair even though
//! Modbus itself is big-endian; parsers take the byte order from the
//! model's [`RegisterMap`](crate::models::RegisterMap).

use sondelib_core::{Error, Result};
use sondelib_modbus::registers::{self, Endian};

use crate::models::{CalibrationBlock, ValueLayout};
use crate::oxygen::concentration_mg_per_l;
use crate::types::{Calibration, FirmwareVersion};

// ---------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------

/// Hardware/software version, 2 registers.
pub const VERSION: u16 = 0x0700;

/// Sonde status flags, 1 register.
pub const SONDE_ERROR: u16 = 0x0800;

/// Serial number, 7 registers of ASCII.
pub const SERIAL_NUMBER: u16 = 0x0900;

/// pH calibration status, 1 register.
pub const PH_CALIBRATION_STATUS: u16 = 0x0E00;

/// Wiper interval on the sonde, 1 register (minutes).
pub const SONDE_BRUSH_INTERVAL: u16 = 0x0E00;

/// K/B calibration, 4 registers.
pub const CALIBRATION: u16 = 0x1100;

/// pH raw electrode potential, 2 registers.
pub const PH_POTENTIAL: u16 = 0x1200;

/// Serial number on the sonde.
pub const SONDE_SERIAL_NUMBER: u16 = 0x1400;

/// Start measuring on the sonde.
pub const SONDE_START_MEASUREMENT: u16 = 0x1C00;

/// Stop measuring on the sonde.
pub const SONDE_STOP_MEASUREMENT: u16 = 0x1E00;

/// Pending pH calibration standard, 2 registers.
pub const PH_CALIBRATION_POINT: u16 = 0x2300;

/// pH temperature, 2 registers.
pub const PH_TEMPERATURE: u16 = 0x2400;

/// Start measuring.
pub const START_MEASUREMENT: u16 = 0x2500;

/// Measurement block.
pub const MEASUREMENT: u16 = 0x2600;

/// DO optical cap coefficients, 16 registers.
pub const CAP_COEFFICIENTS: u16 = 0x2700;

/// pH value, 2 registers.
pub const PH_VALUE: u16 = 0x2800;

/// pH calibration coefficients, 12 registers.
pub const PH_CALIBRATION: u16 = 0x2900;

/// Stop measuring.
pub const STOP_MEASUREMENT: u16 = 0x2E00;

/// Trigger one wiper sweep.
pub const ACTIVATE_BRUSH: u16 = 0x2F00;

/// Modbus slave id, 1 register.
pub const SLAVE_ID: u16 = 0x3000;

/// Wiper interval, 1 register (minutes).
pub const BRUSH_INTERVAL: u16 = 0x3200;

/// Slave id used for the "who is there" query.
pub const BROADCAST_ID: u8 = 0xFF;

/// Registers holding the serial number.
pub const SERIAL_NUMBER_REGS: u16 = 7;

/// Registers holding one float.
pub const FLOAT_REGS: u16 = 2;

/// Floats in the DO cap coefficient block.
pub const CAP_COEFFICIENT_COUNT: usize = 8;

/// First data byte of a read reply.
const DATA: usize = 3;

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

/// Slice a measurement block reply according to `layout`.
///
/// Returns every value the block itself carries, in output order, and the
/// status byte if the block has one. `PhLike` yields only the pH value and
/// `Sonde8` no status byte; both need further reads.
pub fn parse_measurement(
    layout: &ValueLayout,
    frame: &[u8],
    endian: Endian,
) -> (Vec<f32>, Option<u8>) {
    match *layout {
        ValueLayout::Simple { temp, parm } => (
            vec![
                registers::f32_from(frame, parm, endian),
                registers::f32_from(frame, temp, endian),
            ],
            None,
        ),
        ValueLayout::WithError { temp, parm, error } => (
            vec![
                registers::f32_from(frame, parm, endian),
                registers::f32_from(frame, temp, endian),
            ],
            Some(frame[error]),
        ),
        ValueLayout::PhLike { parm, .. } => (vec![registers::f32_from(frame, parm, endian)], None),
        ValueLayout::DoLike {
            temp,
            saturation,
            error,
        } => {
            let percent = registers::f32_from(frame, saturation, endian) * 100.0;
            let temperature = registers::f32_from(frame, temp, endian);
            (
                vec![percent, temperature, concentration_mg_per_l(percent, temperature)],
                Some(frame[error]),
            )
        }
        ValueLayout::Sonde8 { first, .. } => (registers::f32s_from(frame, first, 8, endian), None),
    }
}

/// A single float at the start of the data.
pub fn parse_float(frame: &[u8], endian: Endian) -> f32 {
    registers::f32_from(frame, DATA, endian)
}

/// A single 16-bit register at the start of the data.
pub fn parse_u16(frame: &[u8], endian: Endian) -> u16 {
    registers::u16_from(frame, DATA, endian)
}

/// `count` floats at the start of the data.
pub fn parse_floats(frame: &[u8], count: usize, endian: Endian) -> Vec<f32> {
    registers::f32s_from(frame, DATA, count, endian)
}

/// The 14-character serial number.
pub fn parse_serial_number(frame: &[u8]) -> String {
    registers::ascii_from(frame, DATA, usize::from(SERIAL_NUMBER_REGS) * 2)
}

/// Hardware and software revision.
pub fn parse_version(frame: &[u8]) -> FirmwareVersion {
    let revision = |offset: usize| f32::from(frame[offset]) + f32::from(frame[offset + 1]) / 100.0;
    FirmwareVersion {
        hardware: revision(DATA),
        software: revision(DATA + 2),
    }
}

/// The slave id byte of a slave-id register read.
pub fn parse_slave_id(frame: &[u8]) -> u8 {
    frame[DATA]
}

/// Calibration coefficients for `block`.
pub fn parse_calibration(
    block: &CalibrationBlock,
    frame: &[u8],
    endian: Endian,
) -> Result<Calibration> {
    let values = parse_floats(frame, usize::from(block.coefficients), endian);
    calibration_from_values(&values)
}

fn calibration_from_values(values: &[f32]) -> Result<Calibration> {
    match *values {
        [k, b] => Ok(Calibration::Linear { k, b }),
        [c0, c1, c2, c3, c4, c5] => Ok(Calibration::Ph([c0, c1, c2, c3, c4, c5])),
        _ => Err(Error::Unsupported(format!(
            "calibration block of {} coefficients",
            values.len()
        ))),
    }
}

// ---------------------------------------------------------------
// Payload encoders
// ---------------------------------------------------------------

/// Payload for a single 16-bit register.
pub fn encode_u16(value: u16, endian: Endian) -> Vec<u8> {
    let mut buf = vec![0u8; 2];
    registers::u16_into(&mut buf, 0, value, endian);
    buf
}

/// Payload for the slave-id register: the id in the first byte.
pub fn encode_slave_id(id: u8) -> Vec<u8> {
    vec![id, 0x00]
}

/// Payload for a calibration write to `block`.
///
/// Fails if `calibration` does not have the block's shape.
pub fn encode_calibration(
    block: &CalibrationBlock,
    calibration: &Calibration,
    endian: Endian,
) -> Result<Vec<u8>> {
    if calibration.len() != usize::from(block.coefficients) {
        return Err(Error::Unsupported(format!(
            "this sensor takes {} calibration coefficients, got {}",
            block.coefficients,
            calibration.len()
        )));
    }
    Ok(registers::f32s_to_bytes(&calibration.coefficients(), endian))
}
