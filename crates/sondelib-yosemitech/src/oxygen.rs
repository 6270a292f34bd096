//! Dissolved-oxygen solubility.
//!
//! Oxygen concentration in mg/L is derived from the reported percent
//! saturation and the equilibrium solubility at the measured temperature,
//! using the Weiss (1970) fit for fresh water (salinity 0) at 760 mmHg.

/// Offset from Celsius to Kelvin.
const KELVIN_OFFSET: f64 = 273.15;

/// ml/L of O2 to mg/L.
const ML_TO_MG: f64 = 1.42905;

const A1: f64 = -173.4292;
const A2: f64 = 249.6339;
const A3: f64 = 143.3483;
const A4: f64 = -21.8492;
const B1: f64 = -0.033096;
const B2: f64 = 0.014259;
const B3: f64 = -0.0017;

/// Equilibrium O2 solubility in mg/L at `temperature_c` and `salinity`
/// (PSU).
pub fn solubility_mg_per_l(temperature_c: f64, salinity: f64) -> f64 {
    let t = (temperature_c + KELVIN_OFFSET) / 100.0;
    let ln_c = A1
        + A2 / t
        + A3 * t.ln()
        + A4 * t
        + salinity * (B1 + B2 * t + B3 * t * t);
    ln_c.exp() * ML_TO_MG
}

/// Dissolved oxygen in mg/L from percent saturation and temperature.
///
/// # Example
///
/// ```
/// use sondelib_yosemitech::oxygen::concentration_mg_per_l;
///
/// let mg = concentration_mg_per_l(98.0, 25.0);
/// assert!((mg - 8.08).abs() < 0.05);
/// ```
pub fn concentration_mg_per_l(saturation_percent: f32, temperature_c: f32) -> f32 {
    let solubility = solubility_mg_per_l(f64::from(temperature_c), 0.0);
    (f64::from(saturation_percent) / 100.0 * solubility) as f32
}
