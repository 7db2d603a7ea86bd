//! Bound-constrained nonlinear optimizer.
//!
//! Minimises f(x) on the unit box [0, 1]ⁿ subject to equality constraints c(x) = 0
//! and inequality constraints g(x) ≤ 0 with an augmented Lagrangian:
//!
//! ```text
//! L(x) = f + Σ λᵢcᵢ + ρ/2 Σ cᵢ² + 1/(2ρ) Σ (max(0, μⱼ + ρgⱼ)² − μⱼ²)
//! ```
//!
//! Each subproblem is solved by projected gradient descent with Barzilai–Borwein
//! step lengths and Armijo backtracking. Gradients are forward differences.

use crate::error::SolverError;
use tracing::{debug, info};

/// One evaluation of the underlying model.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub objective: f64,
    /// Equality constraint values, c(x) = 0 when satisfied
    pub eq: Vec<f64>,
    /// Inequality constraint values, g(x) ≤ 0 when satisfied
    pub ineq: Vec<f64>,
}

impl Evaluation {
    /// Largest constraint violation.
    pub fn max_violation(&self) -> f64 {
        let eq = self.eq.iter().fold(0.0f64, |m, c| m.max(c.abs()));
        self.ineq.iter().fold(eq, |m, g| m.max(g.max(0.0)))
    }
}

#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
    /// Projected-gradient stationarity tolerance
    pub tol: f64,
    /// Constraint violation accepted at termination
    pub constraint_tol: f64,
    /// Forward-difference step on the normalised variables
    pub fd_step: f64,
    pub penalty0: f64,
    pub penalty_growth: f64,
    pub penalty_max: f64,
    pub armijo_c: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 30,
            max_inner_iterations: 200,
            tol: 1e-6,
            constraint_tol: 1e-4,
            fd_step: 1e-6,
            penalty0: 10.0,
            penalty_growth: 10.0,
            penalty_max: 1e8,
            armijo_c: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizeResult {
    pub x: Vec<f64>,
    pub evaluation: Evaluation,
    pub converged: bool,
    pub outer_iterations: usize,
    pub evaluations: usize,
}

struct Lagrangian<'c> {
    lambda: Vec<f64>,
    mu: Vec<f64>,
    rho: f64,
    config: &'c OptimizeConfig,
}

impl Lagrangian<'_> {
    fn value(&self, e: &Evaluation) -> f64 {
        let mut l = e.objective;
        for (c, lam) in e.eq.iter().zip(&self.lambda) {
            l += lam * c + 0.5 * self.rho * c * c;
        }
        for (g, mu) in e.ineq.iter().zip(&self.mu) {
            let t = (mu + self.rho * g).max(0.0);
            l += (t * t - mu * mu) / (2.0 * self.rho);
        }
        l
    }
}

fn project(x: &mut [f64]) {
    for v in x.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

/// Model wrapper that counts evaluations.
struct Counted<F> {
    f: F,
    calls: usize,
}

impl<F> Counted<F> {
    fn eval<E>(&mut self, x: &[f64]) -> Result<Evaluation, E>
    where
        F: FnMut(&[f64]) -> Result<Evaluation, E>,
    {
        self.calls += 1;
        (self.f)(x)
    }
}

/// Minimise on [0, 1]ⁿ. `x0` is projected onto the box first.
///
/// The result is the last accepted point; `converged` is false when the outer
/// budget runs out or the final point violates a constraint by more than
/// `constraint_tol`.
pub fn minimize_augmented_lagrangian<F, E>(
    x0: &[f64],
    f: F,
    config: &OptimizeConfig,
) -> Result<OptimizeResult, E>
where
    F: FnMut(&[f64]) -> Result<Evaluation, E>,
    E: From<SolverError>,
{
    if x0.is_empty() {
        return Err(SolverError::ProblemSetup {
            what: "optimizer needs at least one variable".to_string(),
        }
        .into());
    }
    let mut model = Counted { f, calls: 0 };
    let mut x = x0.to_vec();
    project(&mut x);
    let mut eval = model.eval(&x)?;
    let mut lag = Lagrangian {
        lambda: vec![0.0; eval.eq.len()],
        mu: vec![0.0; eval.ineq.len()],
        rho: config.penalty0,
        config,
    };
    let mut prev_violation = eval.max_violation();

    for outer in 0..config.max_outer_iterations {
        let x_before = x.clone();
        let inner_converged = solve_subproblem(&mut model, &lag, &mut x, &mut eval)?;

        let violation = eval.max_violation();
        debug!(
            outer,
            objective = eval.objective,
            violation,
            penalty = lag.rho,
            "augmented lagrangian"
        );

        let step: f64 = x
            .iter()
            .zip(&x_before)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        if violation <= config.constraint_tol && (inner_converged || step < config.tol) {
            info!(
                outer_iterations = outer + 1,
                evaluations = model.calls,
                objective = eval.objective,
                "optimizer converged"
            );
            return Ok(OptimizeResult {
                x,
                evaluation: eval,
                converged: true,
                outer_iterations: outer + 1,
                evaluations: model.calls,
            });
        }

        for (lam, c) in lag.lambda.iter_mut().zip(&eval.eq) {
            *lam += lag.rho * c;
        }
        for (mu, g) in lag.mu.iter_mut().zip(&eval.ineq) {
            *mu = (*mu + lag.rho * g).max(0.0);
        }
        if violation > 0.25 * prev_violation && violation > config.constraint_tol {
            lag.rho = (lag.rho * config.penalty_growth).min(config.penalty_max);
        }
        prev_violation = violation;
    }

    Ok(OptimizeResult {
        x,
        evaluation: eval,
        converged: false,
        outer_iterations: config.max_outer_iterations,
        evaluations: model.calls,
    })
}

/// Projected gradient with Barzilai–Borwein steps. Returns true on stationarity.
fn solve_subproblem<F, E>(
    model: &mut Counted<F>,
    lag: &Lagrangian<'_>,
    x: &mut Vec<f64>,
    eval: &mut Evaluation,
) -> Result<bool, E>
where
    F: FnMut(&[f64]) -> Result<Evaluation, E>,
{
    let config = lag.config;
    let n = x.len();
    let mut l = lag.value(eval);
    let mut grad = gradient(model, lag, x, l)?;
    let mut alpha = 1.0 / grad.iter().fold(1e-12f64, |m, g| m.max(g.abs()));

    for _ in 0..config.max_inner_iterations {
        // Projected-gradient stationarity measure
        let pg = x
            .iter()
            .zip(&grad)
            .map(|(xi, gi)| ((xi - gi).clamp(0.0, 1.0) - xi).abs())
            .fold(0.0, f64::max);
        if pg < config.tol {
            return Ok(true);
        }

        let mut accepted = None;
        let mut a = alpha;
        for _ in 0..40 {
            let mut trial: Vec<f64> = x.iter().zip(&grad).map(|(xi, gi)| xi - a * gi).collect();
            project(&mut trial);
            let decrease: f64 = grad
                .iter()
                .zip(trial.iter().zip(x.iter()))
                .map(|(g, (t, xi))| g * (t - xi))
                .sum();
            if let Ok(e) = model.eval(&trial) {
                let lt = lag.value(&e);
                if lt.is_finite() && lt <= l + config.armijo_c * decrease {
                    accepted = Some((trial, e, lt));
                    break;
                }
            }
            a *= 0.5;
        }
        let Some((x_new, e_new, l_new)) = accepted else {
            // No descent along the projected direction
            return Ok(false);
        };

        let g_new = gradient(model, lag, &x_new, l_new)?;
        let mut ss = 0.0;
        let mut sy = 0.0;
        for i in 0..n {
            let s = x_new[i] - x[i];
            let y = g_new[i] - grad[i];
            ss += s * s;
            sy += s * y;
        }
        alpha = if sy > 0.0 {
            (ss / sy).clamp(1e-10, 1e10)
        } else {
            (2.0 * a).min(1e10)
        };

        *x = x_new;
        *eval = e_new;
        l = l_new;
        grad = g_new;
        if ss.sqrt() < 1e-14 {
            return Ok(true);
        }
    }
    Ok(false)
}

fn gradient<F, E>(
    model: &mut Counted<F>,
    lag: &Lagrangian<'_>,
    x: &[f64],
    l: f64,
) -> Result<Vec<f64>, E>
where
    F: FnMut(&[f64]) -> Result<Evaluation, E>,
{
    let h = lag.config.fd_step;
    let mut grad = vec![0.0; x.len()];
    let mut xp = x.to_vec();
    for i in 0..x.len() {
        // Step inward at the upper bound
        let step = if x[i] + h > 1.0 { -h } else { h };
        xp[i] = x[i] + step;
        let e = model.eval(&xp)?;
        grad[i] = (lag.value(&e) - l) / step;
        xp[i] = x[i];
    }
    Ok(grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverResult;

    fn quadratic(x: &[f64]) -> f64 {
        (x[0] - 0.3).powi(2) + 2.0 * (x[1] - 0.6).powi(2)
    }

    #[test]
    fn unconstrained_quadratic() {
        let res: SolverResult<OptimizeResult> = minimize_augmented_lagrangian(
            &[0.9, 0.1],
            |x| {
                Ok(Evaluation {
                    objective: quadratic(x),
                    eq: vec![],
                    ineq: vec![],
                })
            },
            &OptimizeConfig::default(),
        );
        let res = res.unwrap();
        assert!(res.converged);
        assert!((res.x[0] - 0.3).abs() < 1e-3);
        assert!((res.x[1] - 0.6).abs() < 1e-3);
    }

    #[test]
    fn bound_active_minimum() {
        // Unconstrained minimum at 1.5 lies outside the box
        let res: SolverResult<OptimizeResult> = minimize_augmented_lagrangian(
            &[0.2],
            |x| {
                Ok(Evaluation {
                    objective: (x[0] - 1.5).powi(2),
                    eq: vec![],
                    ineq: vec![],
                })
            },
            &OptimizeConfig::default(),
        );
        assert!((res.unwrap().x[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn active_inequality_constraint() {
        // x0 + x1 ≥ 1.2  →  g = 1.2 − x0 − x1 ≤ 0
        let res: SolverResult<OptimizeResult> = minimize_augmented_lagrangian(
            &[0.5, 0.5],
            |x| {
                Ok(Evaluation {
                    objective: quadratic(x),
                    eq: vec![],
                    ineq: vec![1.2 - x[0] - x[1]],
                })
            },
            &OptimizeConfig::default(),
        );
        let res = res.unwrap();
        assert!(res.converged);
        // KKT: 2(x0-0.3) = 4(x1-0.6), x0 + x1 = 1.2  →  x0 = 0.5, x1 = 0.7
        assert!((res.x[0] - 0.5).abs() < 5e-3, "x0 = {}", res.x[0]);
        assert!((res.x[1] - 0.7).abs() < 5e-3, "x1 = {}", res.x[1]);
    }

    #[test]
    fn equality_constraint() {
        let res: SolverResult<OptimizeResult> = minimize_augmented_lagrangian(
            &[0.1, 0.1],
            |x| {
                Ok(Evaluation {
                    objective: quadratic(x),
                    eq: vec![x[0] - x[1]],
                    ineq: vec![],
                })
            },
            &OptimizeConfig::default(),
        );
        let res = res.unwrap();
        // min (x-0.3)² + 2(x-0.6)²  →  x = 0.5
        assert!((res.x[0] - 0.5).abs() < 5e-3);
        assert!(res.evaluation.max_violation() < 1e-3);
    }
}
