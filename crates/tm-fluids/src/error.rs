//! Fluid property errors.

use tm_core::TmError;
use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Property-evaluation failures. Lookup and inverse-solve failures depend on
/// the state visited, so they map to non-convergence at the core boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    #[error("{what} is not physical")]
    NonPhysical { what: &'static str },

    #[error("{what} lies outside the valid range")]
    OutOfRange { what: &'static str },

    #[error("Invalid fluid input: {what}")]
    InvalidArg { what: &'static str },

    /// The selected backend cannot evaluate this input pair or property.
    #[error("{what} is not available from this backend")]
    NotSupported { what: &'static str },

    #[error("No fluid named '{name}'")]
    UnknownFluid { name: String },

    #[error("Property backend failed: {message}")]
    Backend { message: String },

    /// Inverse solve (temperature from an enthalpy pair, say) did not close.
    #[error("Inverse property solve for {what} did not converge")]
    ConvergenceFailed { what: &'static str },

    #[error("Property lookup failed for {fluid} ({input}): {reason}")]
    PropertyLookup {
        fluid: String,
        input: String,
        reason: String,
    },
}

impl From<FluidError> for TmError {
    fn from(err: FluidError) -> Self {
        let what = err.to_string();
        match err {
            FluidError::PropertyLookup { .. } | FluidError::ConvergenceFailed { .. } => {
                TmError::NonConvergence { what }
            }
            FluidError::OutOfRange { .. }
            | FluidError::InvalidArg { .. }
            | FluidError::UnknownFluid { .. } => TmError::InvalidArg { what },
            FluidError::NonPhysical { .. }
            | FluidError::NotSupported { .. }
            | FluidError::Backend { .. } => TmError::Invariant { what },
        }
    }
}
