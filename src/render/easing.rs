//! Frame-rate independent exponential smoothing.

/// Fraction of the remaining distance covered over `dt` seconds.
pub fn damp_factor(time_constant: f32, dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    if !time_constant.is_finite() || time_constant <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt / time_constant).exp()
}

pub fn damp(current: f32, target: f32, time_constant: f32, dt: f32) -> f32 {
    current + (target - current) * damp_factor(time_constant, dt)
}
