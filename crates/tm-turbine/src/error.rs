//! Error types for the cascade models and the series solver.

use thiserror::Error;
use tm_core::TmError;
use tm_fluids::FluidError;
use tm_solver::SolverError;

pub type TurbineResult<T> = Result<T, TurbineError>;

/// Failure of the critical (maximum mass flux) search for one row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChokingError {
    #[error(
        "critical point search for row {row} did not converge after {iterations} iterations (|dm/dp| = {residual:e})"
    )]
    NonConvergence {
        row: usize,
        iterations: usize,
        residual: f64,
    },
}

#[derive(Error, Debug)]
pub enum TurbineError {
    #[error("Unknown {kind} '{name}' (expected one of: {expected})")]
    UnknownModel {
        kind: &'static str,
        name: String,
        expected: &'static str,
    },

    #[error("Invalid geometry: {}", .errors.join("; "))]
    Geometry { errors: Vec<String> },

    #[error("Invalid operation point: {}", .errors.join("; "))]
    InvalidOperationPoint { errors: Vec<String> },

    #[error("Invalid model options: {}", .errors.join("; "))]
    InvalidOptions { errors: Vec<String> },

    /// A plane evaluation produced a state outside the physical domain.
    #[error("Non-physical flow state: {what}")]
    NonPhysical { what: String },

    #[error(transparent)]
    Choking(#[from] ChokingError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Fluid(#[from] FluidError),
}

impl TurbineError {
    pub(crate) fn non_physical(what: impl Into<String>) -> Self {
        TurbineError::NonPhysical { what: what.into() }
    }

    /// True for errors raised by the fluid property backend.
    pub fn is_property_failure(&self) -> bool {
        matches!(self, TurbineError::Fluid(_))
    }

    /// True for iteration-budget failures of either the series or the critical solver.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            TurbineError::Choking(_)
                | TurbineError::Solver(SolverError::NonConvergence { .. } | SolverError::Bracket { .. })
        )
    }
}

impl From<TurbineError> for TmError {
    fn from(err: TurbineError) -> Self {
        match err {
            TurbineError::Solver(e) => e.into(),
            TurbineError::Fluid(e) => e.into(),
            e @ TurbineError::Choking(_) => TmError::NonConvergence { what: e.to_string() },
            e @ TurbineError::NonPhysical { .. } => TmError::Invariant { what: e.to_string() },
            e => TmError::InvalidArg { what: e.to_string() },
        }
    }
}
