//! Error types for solver operations.

use thiserror::Error;
use tm_core::error::TmError;

/// Errors that can occur inside the numerical solvers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    /// Iteration budget exhausted or line search stagnated.
    ///
    /// `residual` is the last iterate of a single solve. Callers that retry
    /// several strategies report the smallest-norm residual among them.
    #[error("{what} did not converge after {iterations} iterations (residual norm {})", norm(.residual))]
    NonConvergence {
        what: String,
        residual: Vec<f64>,
        iterations: usize,
    },

    /// A bracketed method was given an interval without a sign change.
    #[error("No sign change for {what} on [{a}, {b}] (f(a)={fa}, f(b)={fb})")]
    Bracket {
        what: String,
        a: f64,
        b: f64,
        fa: f64,
        fb: f64,
    },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    pub fn non_convergence(what: impl Into<String>, residual: &[f64], iterations: usize) -> Self {
        SolverError::NonConvergence {
            what: what.into(),
            residual: residual.to_vec(),
            iterations,
        }
    }
}

impl From<SolverError> for TmError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what } => TmError::InvalidArg { what },
            e @ (SolverError::NonConvergence { .. } | SolverError::Bracket { .. }) => {
                TmError::NonConvergence {
                    what: e.to_string(),
                }
            }
            SolverError::Numeric { what } => TmError::Invariant { what },
        }
    }
}
