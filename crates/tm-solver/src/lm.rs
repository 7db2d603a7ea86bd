//! Levenberg–Marquardt iteration for square or over-determined systems.

use crate::error::SolverError;
use crate::newton::{NewtonResult, is_admissible};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LmConfig {
    pub max_iterations: usize,
    pub abs_tol: f64,
    /// Initial damping
    pub lambda0: f64,
    /// Damping above which the iteration gives up
    pub lambda_max: f64,
    /// Unknowns that must stay strictly positive
    pub positive: Vec<usize>,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            abs_tol: 1e-6,
            lambda0: 1e-3,
            lambda_max: 1e10,
            positive: Vec::new(),
        }
    }
}

/// Minimise ‖r(x)‖² with Marquardt scaling of the normal equations.
///
/// Step: (JᵀJ + λ·diag(JᵀJ) + λ·I) dx = −Jᵀr. The damping shrinks by 10 after an
/// accepted step and grows by 10 after a rejected one.
pub fn levenberg_marquardt<F, J, E>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &LmConfig,
) -> Result<NewtonResult, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
    J: Fn(&DVector<f64>, &DVector<f64>) -> Result<DMatrix<f64>, E>,
    E: From<SolverError>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    let mut lambda = config.lambda0;
    let mut jac = jacobian_fn(&x, &r)?;

    for iter in 0..config.max_iterations {
        debug!(iteration = iter, residual_norm = r_norm, lambda, "levenberg-marquardt");
        if r_norm < config.abs_tol {
            return Ok(NewtonResult {
                x,
                residual: r,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        let jtj = jac.transpose() * &jac;
        let jtr = jac.transpose() * &r;
        let mut step = None;
        while lambda <= config.lambda_max {
            let mut a = jtj.clone();
            for i in 0..a.nrows() {
                a[(i, i)] += lambda * (jtj[(i, i)] + 1.0);
            }
            if let Some(dx) = a.cholesky().map(|c| c.solve(&(-&jtr))) {
                let x_new = &x + &dx;
                if is_admissible(&x_new, &config.positive)
                    && let Ok(r_new) = residual_fn(&x_new)
                {
                    let n = r_new.norm();
                    if n.is_finite() && n < r_norm {
                        step = Some((x_new, r_new, n));
                        lambda = (lambda / 10.0).max(1e-12);
                        break;
                    }
                }
            }
            lambda *= 10.0;
        }

        let Some((x_new, r_new, n)) = step else {
            return Err(SolverError::non_convergence(
                format!("Levenberg-Marquardt damping exceeded {:e}", config.lambda_max),
                r.as_slice(),
                iter,
            )
            .into());
        };
        x = x_new;
        r = r_new;
        r_norm = n;
        jac = jacobian_fn(&x, &r)?;
    }

    Err(SolverError::non_convergence("Levenberg-Marquardt", r.as_slice(), config.max_iterations).into())
}
