//! Error types for the drivers and the resolved configuration.

use tm_core::error::TmError;
use tm_cycle::CycleError;
use tm_fluids::FluidError;
use tm_solver::SolverError;
use tm_turbine::TurbineError;

/// Application error type wrapping the errors of every backend crate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A resolved document failed validation; every problem found is listed.
    #[error("Configuration validation failed: {}", .errors.join("; "))]
    ConfigValidation { errors: Vec<String> },

    #[error("Unknown design variable '{name}'")]
    UnknownVariable { name: String },

    #[error("Output '{name}' is not produced by the design problem")]
    UnknownOutput { name: String },

    #[error(transparent)]
    Turbine(#[from] TurbineError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Fluid(#[from] FluidError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tm-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub(crate) fn config(error: impl Into<String>) -> Self {
        AppError::ConfigValidation {
            errors: vec![error.into()],
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::config(err.to_string())
    }
}

impl From<AppError> for TmError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Turbine(e) => e.into(),
            AppError::Cycle(e) => e.into(),
            AppError::Solver(e) => e.into(),
            AppError::Fluid(e) => e.into(),
            e => TmError::InvalidArg { what: e.to_string() },
        }
    }
}
