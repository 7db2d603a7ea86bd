//! tm-core: stable foundation for the turbomachinery workspace.
//!
//! Contains:
//! - units (uom SI aliases and constructors for the property boundary)
//! - numeric (Real, finiteness check, degree trigonometry, smooth min/max, interpolation)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TmError, TmResult};
pub use numeric::*;
pub use units::*;
