//! Bracketed scalar root finding.

use crate::error::SolverError;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct ScalarConfig {
    pub max_iterations: usize,
    /// Absolute tolerance on x
    pub x_tol: f64,
    /// Relative tolerance on x
    pub rel_tol: f64,
    /// Absolute tolerance on |f(x)|
    pub f_tol: f64,
}

impl Default for ScalarConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            x_tol: 1e-12,
            rel_tol: 1e-10,
            f_tol: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootResult {
    pub x: f64,
    pub fx: f64,
    pub iterations: usize,
}

/// Brent's method on a bracket [a, b] with f(a)·f(b) ≤ 0.
///
/// Combines inverse quadratic interpolation, secant steps and bisection.
pub fn brent_root<F, E>(
    what: &str,
    mut f: F,
    a: f64,
    b: f64,
    config: &ScalarConfig,
) -> Result<RootResult, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<SolverError>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a)?;
    let mut fb = f(b)?;
    if fa == 0.0 {
        return Ok(RootResult {
            x: a,
            fx: fa,
            iterations: 0,
        });
    }
    if fb == 0.0 {
        return Ok(RootResult {
            x: b,
            fx: fb,
            iterations: 0,
        });
    }
    if !(fa.is_finite() && fb.is_finite()) || fa.signum() == fb.signum() {
        return Err(SolverError::Bracket {
            what: what.to_string(),
            a,
            b,
            fa,
            fb,
        }
        .into());
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iter in 1..=config.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * (config.x_tol + config.rel_tol * b.abs());
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 || fb.abs() <= config.f_tol {
            debug!(what, iterations = iter, x = b, fx = fb, "brent converged");
            return Ok(RootResult {
                x: b,
                fx: fb,
                iterations: iter,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                p = 2.0 * m * s;
                q = 1.0 - s;
            } else {
                let qa = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * m * qa * (qa - r) - (b - a) * (r - 1.0));
                q = (qa - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        } else {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = f(b)?;
        if !fb.is_finite() {
            return Err(SolverError::Numeric {
                what: format!("{what}: non-finite function value at x = {b}"),
            }
            .into());
        }
    }

    Err(SolverError::non_convergence(what, &[fb], config.max_iterations).into())
}
