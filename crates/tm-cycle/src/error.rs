//! Error types for cycle components and the network solve.

use thiserror::Error;
use tm_core::error::TmError;
use tm_fluids::FluidError;
use tm_solver::SolverError;

/// Errors that can occur while building or solving a cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("Invalid cycle parameters: {}", .errors.join("; "))]
    InvalidParameters { errors: Vec<String> },

    #[error("Unknown cycle parameter '{name}'")]
    UnknownParameter { name: String },

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Fluid(#[from] FluidError),
}

pub type CycleResult<T> = Result<T, CycleError>;

impl CycleError {
    pub(crate) fn non_physical(what: impl Into<String>) -> Self {
        CycleError::NonPhysical { what: what.into() }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        CycleError::InvalidParameters {
            errors: vec![what.into()],
        }
    }

    /// True for errors raised by the fluid property backend.
    pub fn is_property_failure(&self) -> bool {
        matches!(self, CycleError::Fluid(_))
    }
}

impl From<CycleError> for TmError {
    fn from(e: CycleError) -> Self {
        match e {
            CycleError::Solver(e) => e.into(),
            CycleError::Fluid(e) => e.into(),
            e @ CycleError::NonPhysical { .. } => TmError::Invariant { what: e.to_string() },
            e @ (CycleError::InvalidParameters { .. } | CycleError::UnknownParameter { .. }) => {
                TmError::InvalidArg { what: e.to_string() }
            }
        }
    }
}
