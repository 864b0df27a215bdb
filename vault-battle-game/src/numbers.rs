//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

/// Round to one decimal place, returning 0.0 for non-finite values.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

/// Convert a millisecond count into fractional seconds.
#[must_use]
pub fn ms_to_secs(ms: u32) -> f32 {
    cast::<u32, f32>(ms).unwrap_or(0.0) / 1_000.0
}

/// Convert a millisecond count into `f32` for timer accumulation.
#[must_use]
pub fn ms_to_f32(ms: u32) -> f32 {
    cast::<u32, f32>(ms).unwrap_or(0.0)
}
