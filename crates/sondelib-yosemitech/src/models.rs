//! Sensor model definitions.
//!
//! Every supported sensor is one [`RegisterMap`] row in a static registry.
//! A row says where the sensor keeps its measurement block, how to slice
//! it ([`ValueLayout`]), and where its calibration, wiper and identity
//! registers live. Adding a model means adding a row; nothing else in the
//! driver branches on the model.
//!
//! | Model  | Code | Parameter                 | Layout      | Wiper |
//! |--------|------|---------------------------|-------------|-------|
//! | Y504   | `01` | Dissolved oxygen          | `DoLike`    | no    |
//! | Y520   | `09` | Conductivity              | `Simple`    | no    |
//! | Y510   | `10` | Turbidity                 | `WithError` | no    |
//! | Y511   | `29` | Turbidity (self-cleaning) | `WithError` | yes   |
//! | Y514   | `48` | Chlorophyll               | `WithError` | yes   |
//! | Y532   | `43` | pH                        | `PhLike`    | no    |
//! | Y4000  | `38` | Multiparameter sonde      | `Sonde8`    | yes   |

use std::fmt;

use sondelib_core::SensorDefinition;
use sondelib_modbus::frame::WRITE_ACK_LEN;
use sondelib_modbus::Endian;

use crate::commands::{
    ACTIVATE_BRUSH, BRUSH_INTERVAL, CALIBRATION, CAP_COEFFICIENTS, MEASUREMENT, PH_CALIBRATION,
    PH_POTENTIAL, PH_TEMPERATURE, PH_VALUE, SERIAL_NUMBER, SONDE_BRUSH_INTERVAL, SONDE_ERROR,
    SONDE_SERIAL_NUMBER, SONDE_START_MEASUREMENT, SONDE_STOP_MEASUREMENT, START_MEASUREMENT,
    STOP_MEASUREMENT,
};

/// Factory-default serial speed of the whole family.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Factory-default Modbus slave id.
pub const DEFAULT_SLAVE_ID: u8 = 0x01;

/// Byte range of the serial number holding the two-digit model code.
const MODEL_CODE_RANGE: std::ops::Range<usize> = 2..4;

/// Physical sensor family.
///
/// `Unknown` is only a placeholder for sessions whose model has not been
/// resolved from the serial number yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorModel {
    /// Optical dissolved oxygen.
    Y504,
    /// Turbidity.
    Y510,
    /// Turbidity with self-cleaning wiper.
    Y511,
    /// Chlorophyll with wiper.
    Y514,
    /// Conductivity.
    Y520,
    /// pH.
    Y532,
    /// Multiparameter sonde.
    Y4000,
    /// Not resolved yet.
    Unknown,
}

impl SensorModel {
    /// Every concrete model, in registry order.
    pub const ALL: [SensorModel; 7] = [
        SensorModel::Y504,
        SensorModel::Y520,
        SensorModel::Y510,
        SensorModel::Y511,
        SensorModel::Y514,
        SensorModel::Y532,
        SensorModel::Y4000,
    ];

    /// Returns `true` for the unresolved placeholder.
    pub fn is_unknown(&self) -> bool {
        *self == SensorModel::Unknown
    }

    /// The registry row for this model, `None` for `Unknown`.
    pub fn register_map(&self) -> Option<&'static RegisterMap> {
        register_map(*self)
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.register_map() {
            Some(map) => write!(f, "{}", map.display_name),
            None => write!(f, "Unknown"),
        }
    }
}

/// How the values of a measurement read are laid out.
///
/// Offsets are byte offsets into the whole reply frame (slave id at 0,
/// function at 1, byte count at 2, data from 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueLayout {
    /// Temperature and parameter floats.
    Simple { temp: usize, parm: usize },
    /// As `Simple`, plus a status byte.
    WithError {
        temp: usize,
        parm: usize,
        error: usize,
    },
    /// Parameter from the measurement block; temperature and electrode
    /// potential from two separate single-float reads.
    PhLike {
        parm: usize,
        temperature_addr: u16,
        potential_addr: u16,
    },
    /// Saturation fraction (reported ×100 as percent), temperature, status
    /// byte; concentration in mg/L is derived.
    DoLike {
        temp: usize,
        saturation: usize,
        error: usize,
    },
    /// Eight consecutive floats; the status register lives elsewhere.
    Sonde8 {
        first: usize,
        error_addr: u16,
        error_offset: usize,
    },
}

impl ValueLayout {
    /// Value counts a caller may ask for.
    pub fn arities(&self) -> &'static [usize] {
        match self {
            ValueLayout::Simple { .. } | ValueLayout::WithError { .. } => &[1, 2],
            ValueLayout::PhLike { .. } | ValueLayout::DoLike { .. } => &[1, 2, 3],
            ValueLayout::Sonde8 { .. } => &[8],
        }
    }

    /// Returns `true` if `count` values can be read with this layout.
    pub fn supports(&self, count: usize) -> bool {
        self.arities().contains(&count)
    }
}

/// A block of calibration floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationBlock {
    /// First register of the block.
    pub start: u16,
    /// Number of `f32` coefficients (two registers each).
    pub coefficients: u16,
}

impl CalibrationBlock {
    /// Registers spanned by the block.
    pub fn register_count(&self) -> u16 {
        self.coefficients * 2
    }
}

/// Per-model register layout and metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterMap {
    /// The model this row describes.
    pub model: SensorModel,
    /// Human-readable model name.
    pub display_name: &'static str,
    /// Primary measured parameter.
    pub parameter: &'static str,
    /// Unit of the primary parameter.
    pub unit: &'static str,
    /// Two-digit code embedded in the serial number.
    pub model_code: &'static str,
    /// Names of the values [`Sensor::get_values`](crate::Sensor::get_values)
    /// returns, in order.
    pub value_names: &'static [&'static str],
    /// First register of the measurement block.
    pub measurement_start: u16,
    /// Registers in the measurement block.
    pub measurement_reg_count: u16,
    /// How to slice the measurement reply.
    pub layout: ValueLayout,
    /// Byte order of floats and integers inside register payloads.
    pub byte_order: Endian,
    /// Calibration coefficient block.
    pub calibration: CalibrationBlock,
    /// Optical cap coefficient block (DO sensors).
    pub cap_coefficients: Option<u16>,
    /// Wiper interval register.
    pub brush_interval: Option<u16>,
    /// Wiper trigger register.
    pub brush_activate: Option<u16>,
    /// First register of the 14-character serial number.
    pub serial_number: u16,
    /// Start-measurement trigger register.
    pub start_measurement: u16,
    /// Stop-measurement trigger register.
    pub stop_measurement: u16,
    /// Accepted lengths of a write acknowledgement.
    pub write_ack_lengths: &'static [usize],
}

impl From<&RegisterMap> for SensorDefinition {
    fn from(map: &RegisterMap) -> Self {
        SensorDefinition {
            family: "Yosemitech",
            model_name: map.display_name,
            parameter: map.parameter,
            unit: map.unit,
            default_baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

const STANDARD_ACK: &[usize] = &[WRITE_ACK_LEN];

const LINEAR_CALIBRATION: CalibrationBlock = CalibrationBlock {
    start: CALIBRATION,
    coefficients: 2,
};

/// Y504 optical dissolved oxygen.
///
/// Reports saturation as a fraction; the driver scales it to percent and
/// derives mg/L. Carries an 8-float optical cap coefficient block.
const Y504: RegisterMap = RegisterMap {
    model: SensorModel::Y504,
    display_name: "Y504",
    parameter: "Dissolved Oxygen",
    unit: "%",
    model_code: "01",
    value_names: &["DO saturation", "Temperature", "DO concentration"],
    measurement_start: MEASUREMENT,
    measurement_reg_count: 5,
    layout: ValueLayout::DoLike {
        temp: 3,
        saturation: 7,
        error: 11,
    },
    byte_order: Endian::Little,
    calibration: LINEAR_CALIBRATION,
    cap_coefficients: Some(CAP_COEFFICIENTS),
    brush_interval: None,
    brush_activate: None,
    serial_number: SERIAL_NUMBER,
    start_measurement: START_MEASUREMENT,
    stop_measurement: STOP_MEASUREMENT,
    write_ack_lengths: STANDARD_ACK,
};

/// Y520 four-electrode conductivity.
const Y520: RegisterMap = RegisterMap {
    model: SensorModel::Y520,
    display_name: "Y520",
    parameter: "Conductivity",
    unit: "mS/cm",
    model_code: "09",
    value_names: &["Conductivity", "Temperature"],
    measurement_start: MEASUREMENT,
    measurement_reg_count: 4,
    layout: ValueLayout::Simple { temp: 3, parm: 7 },
    byte_order: Endian::Little,
    calibration: LINEAR_CALIBRATION,
    cap_coefficients: None,
    brush_interval: None,
    brush_activate: None,
    serial_number: SERIAL_NUMBER,
    start_measurement: START_MEASUREMENT,
    stop_measurement: STOP_MEASUREMENT,
    write_ack_lengths: STANDARD_ACK,
};

/// Y510 optical turbidity.
const Y510: RegisterMap = RegisterMap {
    model: SensorModel::Y510,
    display_name: "Y510",
    parameter: "Turbidity",
    unit: "NTU",
    model_code: "10",
    value_names: &["Turbidity", "Temperature"],
    measurement_start: MEASUREMENT,
    measurement_reg_count: 5,
    layout: ValueLayout::WithError {
        temp: 3,
        parm: 7,
        error: 11,
    },
    byte_order: Endian::Little,
    calibration: LINEAR_CALIBRATION,
    cap_coefficients: None,
    brush_interval: None,
    brush_activate: None,
    serial_number: SERIAL_NUMBER,
    start_measurement: START_MEASUREMENT,
    stop_measurement: STOP_MEASUREMENT,
    write_ack_lengths: STANDARD_ACK,
};

/// Y511 turbidity with self-cleaning wiper.
const Y511: RegisterMap = RegisterMap {
    model: SensorModel::Y511,
    display_name: "Y511",
    parameter: "Turbidity",
    unit: "NTU",
    model_code: "29",
    value_names: &["Turbidity", "Temperature"],
    brush_interval: Some(BRUSH_INTERVAL),
    brush_activate: Some(ACTIVATE_BRUSH),
    ..Y510
};

/// Y514 chlorophyll fluorescence with wiper.
const Y514: RegisterMap = RegisterMap {
    model: SensorModel::Y514,
    display_name: "Y514",
    parameter: "Chlorophyll",
    unit: "µg/L",
    model_code: "48",
    value_names: &["Chlorophyll", "Temperature"],
    brush_interval: Some(BRUSH_INTERVAL),
    brush_activate: Some(ACTIVATE_BRUSH),
    ..Y510
};

/// Y532 pH.
///
/// The measurement block holds only pH; temperature and the raw electrode
/// potential are separate registers, and calibration is a 6-float block.
const Y532: RegisterMap = RegisterMap {
    model: SensorModel::Y532,
    display_name: "Y532",
    parameter: "pH",
    unit: "pH",
    model_code: "43",
    value_names: &["pH", "Temperature", "Electrode potential"],
    measurement_start: PH_VALUE,
    measurement_reg_count: 2,
    layout: ValueLayout::PhLike {
        parm: 3,
        temperature_addr: PH_TEMPERATURE,
        potential_addr: PH_POTENTIAL,
    },
    byte_order: Endian::Little,
    calibration: CalibrationBlock {
        start: PH_CALIBRATION,
        coefficients: 6,
    },
    cap_coefficients: None,
    brush_interval: None,
    brush_activate: None,
    serial_number: SERIAL_NUMBER,
    start_measurement: START_MEASUREMENT,
    stop_measurement: STOP_MEASUREMENT,
    write_ack_lengths: STANDARD_ACK,
};

/// Y4000 multiparameter sonde.
///
/// One 16-register read returns all eight parameters; the status flags
/// live in their own register. Identity and wiper registers sit at
/// different addresses than on the single-parameter probes.
const Y4000: RegisterMap = RegisterMap {
    model: SensorModel::Y4000,
    display_name: "Y4000",
    parameter: "Multiparameter",
    unit: "various",
    model_code: "38",
    value_names: &[
        "DO",
        "Turbidity",
        "Conductivity",
        "pH",
        "Temperature",
        "ORP",
        "Chlorophyll",
        "Blue-green algae",
    ],
    measurement_start: MEASUREMENT,
    measurement_reg_count: 16,
    layout: ValueLayout::Sonde8 {
        first: 3,
        error_addr: SONDE_ERROR,
        error_offset: 3,
    },
    byte_order: Endian::Little,
    calibration: LINEAR_CALIBRATION,
    cap_coefficients: None,
    brush_interval: Some(SONDE_BRUSH_INTERVAL),
    brush_activate: Some(ACTIVATE_BRUSH),
    serial_number: SONDE_SERIAL_NUMBER,
    start_measurement: SONDE_START_MEASUREMENT,
    stop_measurement: SONDE_STOP_MEASUREMENT,
    write_ack_lengths: STANDARD_ACK,
};

static REGISTRY: [RegisterMap; 7] = [Y504, Y520, Y510, Y511, Y514, Y532, Y4000];

/// Look up the registry row for `model`.
pub fn register_map(model: SensorModel) -> Option<&'static RegisterMap> {
    REGISTRY.iter().find(|map| map.model == model)
}

/// All registry rows.
pub fn all_register_maps() -> &'static [RegisterMap] {
    &REGISTRY
}

/// Map a two-digit serial-number model code to a model.
///
/// Unrecognized codes give [`SensorModel::Unknown`].
pub fn model_from_code(code: &str) -> SensorModel {
    REGISTRY
        .iter()
        .find(|map| map.model_code == code)
        .map(|map| map.model)
        .unwrap_or(SensorModel::Unknown)
}

/// Extract the two-digit model code from a serial number.
pub fn model_code_from_serial(serial: &str) -> Option<&str> {
    serial.get(MODEL_CODE_RANGE)
}

/// Infer the model from a serial number.
///
/// # Example
///
/// ```
/// use sondelib_yosemitech::models::{model_from_serial, SensorModel};
///
/// assert_eq!(model_from_serial("0110171507001A"), SensorModel::Y510);
/// assert_eq!(model_from_serial("??"), SensorModel::Unknown);
/// ```
pub fn model_from_serial(serial: &str) -> SensorModel {
    model_code_from_serial(serial)
        .map(model_from_code)
        .unwrap_or(SensorModel::Unknown)
}
