//! Newton solver with backtracking line search and positivity constraints.

use crate::error::SolverError;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Newton solver configuration.
#[derive(Debug, Clone)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm (against the initial norm)
    pub rel_tol: f64,
    /// Unknowns that must stay strictly positive during the line search
    pub positive: Vec<usize>,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            positive: Vec::new(),
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Residual at the solution
    pub residual: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

pub(crate) fn is_admissible(x: &DVector<f64>, positive: &[usize]) -> bool {
    x.iter().all(|v| v.is_finite()) && positive.iter().all(|&i| x[i] > 0.0)
}

/// Newton solver with line search and positivity constraints.
///
/// A residual evaluation that fails during the line search is treated as a
/// rejected step; only a failure at `x0` propagates.
pub fn newton_solve<F, J, E>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> Result<NewtonResult, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
    J: Fn(&DVector<f64>, &DVector<f64>) -> Result<DMatrix<f64>, E>,
    E: From<SolverError>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        debug!(iteration = iter, residual_norm = r_norm, "newton");
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual: r,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        let jac = jacobian_fn(&x, &r)?;

        // Solve J * dx = -r
        let dx = jac.lu().solve(&(-&r)).ok_or_else(|| SolverError::Numeric {
            what: "Jacobian solve failed".to_string(),
        })?;

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let x_new = &x + alpha * &dx;
            if is_admissible(&x_new, &config.positive)
                && let Ok(r_new) = residual_fn(&x_new)
            {
                let r_new_norm = r_new.norm();
                if r_new_norm.is_finite() && r_new_norm < r_norm {
                    accepted = Some((x_new, r_new, r_new_norm));
                    break;
                }
            }
            alpha *= config.line_search_beta;
        }

        match accepted {
            Some((x_new, r_new, r_new_norm)) => {
                x = x_new;
                r = r_new;
                r_norm = r_new_norm;
            }
            None => {
                return Err(SolverError::non_convergence(
                    format!("Newton line search stagnated at iteration {iter}"),
                    r.as_slice(),
                    iter,
                )
                .into());
            }
        }

        if alpha < 1e-10 {
            return Err(SolverError::non_convergence(
                format!("Newton step collapsed at iteration {iter}"),
                r.as_slice(),
                iter,
            )
            .into());
        }
    }

    if r_norm < config.abs_tol {
        return Ok(NewtonResult {
            x,
            residual: r,
            residual_norm: r_norm,
            iterations: config.max_iterations,
            converged: true,
        });
    }
    Err(SolverError::non_convergence("Newton", r.as_slice(), config.max_iterations).into())
}
