use crate::TmError;

/// Scalar type of every meanline quantity.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TmError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TmError::NonFinite { what, value: v })
    }
}

// Degree trigonometry. Blade and flow angles are carried in degrees.

#[inline]
pub fn sind(deg: Real) -> Real {
    deg.to_radians().sin()
}

#[inline]
pub fn cosd(deg: Real) -> Real {
    deg.to_radians().cos()
}

#[inline]
pub fn tand(deg: Real) -> Real {
    deg.to_radians().tan()
}

#[inline]
pub fn asind(x: Real) -> Real {
    x.asin().to_degrees()
}

#[inline]
pub fn acosd(x: Real) -> Real {
    x.acos().to_degrees()
}

#[inline]
pub fn atand(x: Real) -> Real {
    x.atan().to_degrees()
}

/// Smooth approximation used in place of `max`/`min` to keep residuals differentiable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothMethod {
    /// Boltzmann-weighted average
    Boltzmann,
    /// Log-sum-exp
    LogSumExp,
}

fn smooth_extreme(values: &[Real], method: SmoothMethod, alpha: Real) -> Real {
    if values.is_empty() {
        return Real::NAN;
    }
    // Shift by the true extreme so the exponentials cannot overflow
    let shift = if alpha >= 0.0 {
        values.iter().copied().fold(Real::NEG_INFINITY, Real::max)
    } else {
        values.iter().copied().fold(Real::INFINITY, Real::min)
    };
    match method {
        SmoothMethod::LogSumExp => {
            let sum: Real = values.iter().map(|x| (alpha * (x - shift)).exp()).sum();
            sum.ln() / alpha + shift
        }
        SmoothMethod::Boltzmann => {
            let mut weighted = 0.0;
            let mut weights = 0.0;
            for x in values {
                let w = (alpha * (x - shift)).exp();
                weighted += x * w;
                weights += w;
            }
            weighted / (weights + Real::EPSILON)
        }
    }
}

/// Smooth maximum of `values`; larger `alpha` tracks the true maximum more closely.
pub fn smooth_max(values: &[Real], method: SmoothMethod, alpha: Real) -> Real {
    smooth_extreme(values, method, alpha.abs())
}

/// Smooth minimum of `values`; larger `alpha` tracks the true minimum more closely.
pub fn smooth_min(values: &[Real], method: SmoothMethod, alpha: Real) -> Real {
    smooth_extreme(values, method, -alpha.abs())
}

/// Piecewise-linear interpolation with constant extrapolation beyond the table ends.
///
/// `xp` must be increasing and the same length as `fp`.
pub fn interp1(x: Real, xp: &[Real], fp: &[Real]) -> Real {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if n == 0 {
        return Real::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    for i in 1..n {
        if x <= xp[i] {
            let t = (x - xp[i - 1]) / (xp[i] - xp[i - 1]);
            return fp[i - 1] + t * (fp[i] - fp[i - 1]);
        }
    }
    fp[n - 1]
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            (0..n).map(|i| start + step * i as Real).collect()
        }
    }
}
