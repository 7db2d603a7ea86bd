//! Thermodynamic state definitions.

use crate::error::FluidResult;
use crate::model::validation;
use tm_core::units::{Density, DynVisc, Pressure, Temperature, Velocity};

/// Specific enthalpy [J/kg]. The cascade equations carry h and s as raw SI.
pub type SpecEnthalpy = f64;

/// Specific entropy [J/(kg·K)].
pub type SpecEntropy = f64;

/// Specific heat capacity [J/(kg·K)].
pub type SpecHeatCapacity = f64;

/// Input pair for a state lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateInput {
    /// Pressure and temperature.
    PT { p: Pressure, t: Temperature },
    /// Pressure and specific enthalpy.
    PH { p: Pressure, h: SpecEnthalpy },
    /// Specific enthalpy and specific entropy.
    HS { h: SpecEnthalpy, s: SpecEntropy },
    /// Pressure and specific entropy.
    PS { p: Pressure, s: SpecEntropy },
    /// Density and specific enthalpy.
    RhoH { rho_kg_m3: f64, h: SpecEnthalpy },
}

impl StateInput {
    /// Short tag for logging and cache keys.
    pub fn kind(&self) -> &'static str {
        match self {
            StateInput::PT { .. } => "PT",
            StateInput::PH { .. } => "PH",
            StateInput::HS { .. } => "HS",
            StateInput::PS { .. } => "PS",
            StateInput::RhoH { .. } => "RhoH",
        }
    }

    /// Raw SI values of the pair, in declaration order.
    pub fn values(&self) -> (f64, f64) {
        match *self {
            StateInput::PT { p, t } => (p.value, t.value),
            StateInput::PH { p, h } => (p.value, h),
            StateInput::HS { h, s } => (h, s),
            StateInput::PS { p, s } => (p.value, s),
            StateInput::RhoH { rho_kg_m3, h } => (rho_kg_m3, h),
        }
    }
}

impl std::fmt::Display for StateInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (a, b) = self.values();
        write!(f, "{}({a:.6e}, {b:.6e})", self.kind())
    }
}

/// Complete thermodynamic state returned by a property lookup.
///
/// Every lookup produces the full set so that planes in the cascade model can be
/// filled from a single backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidState {
    /// Pressure [Pa]
    pub p: Pressure,
    /// Temperature [K]
    pub t: Temperature,
    /// Density [kg/m³]
    pub rho: Density,
    /// Specific enthalpy [J/kg]
    pub h: SpecEnthalpy,
    /// Specific entropy [J/(kg·K)]
    pub s: SpecEntropy,
    /// Specific heat capacity at constant pressure [J/(kg·K)]
    pub cp: SpecHeatCapacity,
    /// Specific heat capacity at constant volume [J/(kg·K)]
    pub cv: SpecHeatCapacity,
    /// Heat capacity ratio γ = cp/cv
    pub gamma: f64,
    /// Speed of sound [m/s]
    pub a: Velocity,
    /// Dynamic viscosity [Pa·s]
    pub mu: DynVisc,
    /// Compressibility factor Z = p/(ρRT)
    pub z: f64,
    /// True when the state came from a fail-soft surrogate rather than the backend
    pub fallback: bool,
}

impl FluidState {
    /// Check that the primary properties are physical.
    pub fn validate(&self) -> FluidResult<()> {
        validation::validate_pressure(self.p)?;
        validation::validate_temperature(self.t)?;
        validation::positive(self.rho.value, "density must be positive and finite")?;
        validation::finite(self.h, "enthalpy must be finite")?;
        validation::finite(self.s, "entropy must be finite")
    }
}
