//! Small helpers shared by the cycle components.

use crate::error::{CycleError, CycleResult};
use tm_core::numeric::ensure_finite;

/// Ensure a value is finite, returning `CycleError::NonPhysical` if not.
pub fn check_finite(value: f64, what: &'static str) -> CycleResult<f64> {
    ensure_finite(value, what).map_err(|_| CycleError::non_physical(format!("{what} = {value}")))
}

/// Outlet pressure after a fractional drop `dp`.
pub fn pressure_after_drop(p_in: f64, dp: f64) -> f64 {
    p_in * (1.0 - dp)
}

/// Inlet pressure that ends at `p_out` after a fractional drop `dp`.
pub fn pressure_before_drop(p_out: f64, dp: f64) -> f64 {
    p_out / (1.0 - dp)
}

/// Record an error when `value` lies outside `[lo, hi)`.
pub(crate) fn check_fraction(errors: &mut Vec<String>, what: &str, value: f64, lo: f64, hi: f64) {
    if !(value.is_finite() && value >= lo && value < hi) {
        errors.push(format!("{what} must lie in [{lo}, {hi}), got {value}"));
    }
}

/// Record an error when `value` is not strictly positive.
pub(crate) fn check_positive(errors: &mut Vec<String>, what: &str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(format!("{what} must be positive, got {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_drops_invert() {
        let p = pressure_after_drop(2.0e5, 0.02);
        assert!((p - 1.96e5).abs() < 1e-9);
        assert!((pressure_before_drop(p, 0.02) - 2.0e5).abs() < 1e-9);
    }

    #[test]
    fn fraction_bounds() {
        let mut errors = Vec::new();
        check_fraction(&mut errors, "dp", 0.0, 0.0, 1.0);
        check_fraction(&mut errors, "dp", 1.0, 0.0, 1.0);
        check_fraction(&mut errors, "dp", f64::NAN, 0.0, 1.0);
        check_positive(&mut errors, "p", -1.0);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::INFINITY, "test").is_err());
        assert!(check_finite(f64::NAN, "test").is_err());
    }
}
