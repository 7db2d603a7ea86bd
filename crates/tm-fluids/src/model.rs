//! Fluid property model trait and validation helpers.

use crate::error::{FluidError, FluidResult};
use crate::state::{FluidState, StateInput};
use tm_core::units::{Pressure, Temperature};

/// A (pressure, temperature) pair that characterises a fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    /// Pressure [Pa]
    pub p: f64,
    /// Temperature [K]
    pub t: f64,
}

/// Fixed points used to resolve design-variable bounds that reference the fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceStates {
    pub critical: ReferencePoint,
    pub triple: ReferencePoint,
}

/// Trait for fluid property models.
///
/// Implementations must be thread-safe (Send + Sync) so that sweeps can share one
/// model across rayon workers. Every lookup returns a complete [`FluidState`].
pub trait FluidModel: Send + Sync {
    /// Get the model name (for debugging/logging).
    fn name(&self) -> &str;

    /// Resolve a full thermodynamic state from an input pair.
    fn state(&self, input: StateInput) -> FluidResult<FluidState>;

    /// Critical and triple points of the fluid.
    fn reference_states(&self) -> FluidResult<ReferenceStates>;

    /// Molar mass [kg/kmol].
    fn molar_mass(&self) -> f64;
}

/// Input and property checks shared by the backends.
pub(crate) mod validation {
    use super::*;

    pub fn positive(v: f64, what: &'static str) -> FluidResult<()> {
        if v.is_finite() && v > 0.0 {
            Ok(())
        } else {
            Err(FluidError::NonPhysical { what })
        }
    }

    pub fn finite(v: f64, what: &'static str) -> FluidResult<()> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(FluidError::NonPhysical { what })
        }
    }

    pub fn validate_pressure(p: Pressure) -> FluidResult<()> {
        positive(p.value, "pressure must be positive and finite")
    }

    pub fn validate_temperature(t: Temperature) -> FluidResult<()> {
        positive(t.value, "temperature must be positive and finite")
    }

    /// Heat capacity (cp or cv) of a backend state.
    pub fn validate_cp(cp: f64) -> FluidResult<()> {
        positive(cp, "heat capacity must be positive and finite")
    }

    /// Heat capacity ratio; exactly 1 is accepted for incompressible limits.
    pub fn validate_gamma(gamma: f64) -> FluidResult<()> {
        if gamma.is_finite() && gamma >= 1.0 {
            Ok(())
        } else {
            Err(FluidError::NonPhysical {
                what: "gamma must be >= 1 and finite",
            })
        }
    }

    /// Reject any input pair a backend could not resolve.
    pub fn validate_input(input: &StateInput) -> FluidResult<()> {
        const H: &str = "enthalpy must be finite";
        const S: &str = "entropy must be finite";
        match *input {
            StateInput::PT { p, t } => validate_pressure(p).and_then(|_| validate_temperature(t)),
            StateInput::PH { p, h } => validate_pressure(p).and_then(|_| finite(h, H)),
            StateInput::PS { p, s } => validate_pressure(p).and_then(|_| finite(s, S)),
            StateInput::HS { h, s } => finite(h, H).and_then(|_| finite(s, S)),
            StateInput::RhoH { rho_kg_m3, h } => {
                positive(rho_kg_m3, "density must be positive and finite").and_then(|_| finite(h, H))
            }
        }
    }
}
