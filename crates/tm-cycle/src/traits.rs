//! Core trait for cycle components with one inlet and one outlet.

use crate::error::CycleResult;
use tm_fluids::{FluidContext, FluidState};

/// A component that carries one stream from an inlet junction to an outlet junction.
///
/// Components are deterministic functions of the inlet state, the imposed
/// outlet pressure and their parameters, so the network can evaluate them in
/// topological order without iterating.
pub trait TwoPortComponent {
    /// Component name for reporting and identification.
    fn name(&self) -> &str;

    /// Outlet state reached from `inlet` when the outlet sits at `p_out`.
    fn outlet_state(&self, ctx: &FluidContext<'_>, inlet: &FluidState, p_out: f64) -> CycleResult<FluidState>;

    /// Specific shaft work added to the fluid [J/kg].
    ///
    /// Positive for compressors and pumps, negative for turbines. Adiabatic
    /// components without a shaft report the enthalpy change, which is zero
    /// for throttles.
    fn specific_work(&self, inlet: &FluidState, outlet: &FluidState) -> f64 {
        outlet.h - inlet.h
    }
}
