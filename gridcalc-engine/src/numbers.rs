//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Share of `part` in `whole` as a percentage, 0.0 when `whole` is zero.
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    u64_to_f64(part) / u64_to_f64(whole) * 100.0
}

/// Round a non-negative f64 to the nearest usize, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<usize, f64>(usize::MAX).unwrap_or(f64::MAX);
    cast::<f64, usize>(value.min(max).round()).unwrap_or(0)
}

/// Integer division rounding up; a zero divisor yields `u32::MAX`.
#[must_use]
pub const fn ceil_div_u32(numerator: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        return u32::MAX;
    }
    numerator.div_ceil(divisor)
}

/// Clamp a usize into u32, saturating at `u32::MAX`.
#[must_use]
pub fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
