//! Numerical solvers shared by the cascade, cycle and design drivers.
//!
//! - Newton iteration with backtracking line search (`newton`)
//! - Levenberg–Marquardt fallback for stubborn systems (`lm`)
//! - Finite-difference Jacobians (`jacobian`)
//! - Bracketed scalar root finding (`scalar`)
//! - Bound-constrained augmented Lagrangian optimizer (`optimize`)
//!
//! Every solver is generic over the caller's error type `E: From<SolverError>`,
//! so residual closures can propagate their own domain errors unchanged.

pub mod error;
pub mod jacobian;
pub mod lm;
pub mod newton;
pub mod optimize;
pub mod scalar;

pub use error::{SolverError, SolverResult};
pub use jacobian::{finite_difference_jacobian, forward_difference_from};
pub use lm::{LmConfig, levenberg_marquardt};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
pub use optimize::{Evaluation, OptimizeConfig, OptimizeResult, minimize_augmented_lagrangian};
pub use scalar::{RootResult, ScalarConfig, brent_root};
