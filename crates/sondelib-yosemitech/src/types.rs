//! Values exchanged with a sensor session.

use std::fmt;

use sondelib_core::{SENTINEL_ERROR, SENTINEL_VALUE};

/// One measurement read.
///
/// `values` follows the order of the model's
/// [`value_names`](crate::models::RegisterMap::value_names), truncated to
/// the requested count. `error_code` is the sensor's status byte for
/// layouts that carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub values: Vec<f32>,
    pub error_code: Option<u8>,
}

impl Measurement {
    /// Placeholder for a failed read: `count` sentinel values and the
    /// sentinel status byte.
    pub fn sentinel(count: usize) -> Self {
        Measurement {
            values: vec![SENTINEL_VALUE; count],
            error_code: Some(SENTINEL_ERROR),
        }
    }

    /// Returns `true` if this is a [`sentinel`](Self::sentinel) placeholder.
    pub fn is_sentinel(&self) -> bool {
        self.error_code == Some(SENTINEL_ERROR) && self.values.iter().all(|v| *v == SENTINEL_VALUE)
    }

    /// The primary parameter.
    pub fn parameter(&self) -> Option<f32> {
        self.values.first().copied()
    }

    /// The value at `index`.
    pub fn value(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }
}

/// Calibration coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibration {
    /// `value = k * raw + b`.
    Linear { k: f32, b: f32 },
    /// pH slope/offset set.
    Ph([f32; 6]),
}

impl Calibration {
    /// Coefficients in register order.
    pub fn coefficients(&self) -> Vec<f32> {
        match self {
            Calibration::Linear { k, b } => vec![*k, *b],
            Calibration::Ph(coefficients) => coefficients.to_vec(),
        }
    }

    /// Number of coefficients.
    pub fn len(&self) -> usize {
        match self {
            Calibration::Linear { .. } => 2,
            Calibration::Ph(_) => 6,
        }
    }

    /// Always `false`; every calibration has coefficients.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Outcome of the last pH calibration point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhCalibrationStatus {
    Success,
    /// The standards do not match the expected buffers.
    NonMatchingStandards,
    /// Fewer than three points were taken.
    TooFewPoints,
    /// The fitted coefficients fall outside the accepted range.
    CoefficientsOutOfRange,
    /// The status could not be read.
    CommunicationFailure,
    /// The device answered with a code outside the documented set.
    Unrecognized(u16),
}

impl PhCalibrationStatus {
    /// Decode the status register. Unknown codes are kept as
    /// [`Unrecognized`](Self::Unrecognized).
    pub fn from_code(code: u16) -> Self {
        match code {
            0x00 => PhCalibrationStatus::Success,
            0x01 => PhCalibrationStatus::NonMatchingStandards,
            0x02 => PhCalibrationStatus::TooFewPoints,
            0x03 => PhCalibrationStatus::CoefficientsOutOfRange,
            other => PhCalibrationStatus::Unrecognized(other),
        }
    }
}

impl fmt::Display for PhCalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PhCalibrationStatus::Unrecognized(code) => {
                return write!(f, "unrecognized status 0x{code:04X}");
            }
            PhCalibrationStatus::Success => "success",
            PhCalibrationStatus::NonMatchingStandards => "non-matching calibration standards",
            PhCalibrationStatus::TooFewPoints => "less than three points",
            PhCalibrationStatus::CoefficientsOutOfRange => "coefficients out of range",
            PhCalibrationStatus::CommunicationFailure => "communication failure",
        };
        f.write_str(text)
    }
}

/// Hardware and software revision, each `major + minor / 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmwareVersion {
    pub hardware: f32,
    pub software: f32,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hw {:.2}, sw {:.2}", self.hardware, self.software)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_shape() {
        let m = Measurement::sentinel(3);
        assert_eq!(m.values, vec![-9999.0; 3]);
        assert_eq!(m.error_code, Some(0xFF));
        assert!(m.is_sentinel());
        assert_eq!(m.parameter(), Some(-9999.0));
    }

    #[test]
    fn real_reading_is_not_sentinel() {
        let m = Measurement {
            values: vec![7.0, 21.5],
            error_code: None,
        };
        assert!(!m.is_sentinel());
        assert_eq!(m.value(1), Some(21.5));
        assert_eq!(m.value(2), None);
    }

    #[test]
    fn status_codes() {
        assert_eq!(PhCalibrationStatus::from_code(0), PhCalibrationStatus::Success);
        assert_eq!(
            PhCalibrationStatus::from_code(1),
            PhCalibrationStatus::NonMatchingStandards
        );
        assert_eq!(PhCalibrationStatus::from_code(2), PhCalibrationStatus::TooFewPoints);
        assert_eq!(
            PhCalibrationStatus::from_code(3),
            PhCalibrationStatus::CoefficientsOutOfRange
        );
        assert_eq!(
            PhCalibrationStatus::from_code(0x0200),
            PhCalibrationStatus::Unrecognized(0x0200)
        );
    }

    #[test]
    fn calibration_coefficient_order() {
        let linear = Calibration::Linear { k: 1.5, b: -0.25 };
        assert_eq!(linear.coefficients(), vec![1.5, -0.25]);
        assert_eq!(linear.len(), 2);
        let ph = Calibration::Ph([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(ph.len(), 6);
        assert_eq!(ph.coefficients()[5], 6.0);
    }

    #[test]
    fn version_display() {
        let v = FirmwareVersion {
            hardware: 1.2,
            software: 3.05,
        };
        assert_eq!(v.to_string(), "hw 1.20, sw 3.05");
    }
}
