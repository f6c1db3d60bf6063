//! Numeric helpers shared by matching and calibration.

/// Rounds `value` to `decimals` fractional digits, half away from zero.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
