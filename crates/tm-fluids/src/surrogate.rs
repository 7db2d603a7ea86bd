//! Frozen-property surrogate for fail-soft property lookups.
//!
//! When the backend rejects an input pair and the exception policy allows it, a
//! lookup is answered by ideal-gas relations with cp frozen at the last valid state.
//! The surrogate is only meaningful in a neighbourhood of that anchor; lookups far
//! from it are still answered but logged as out of range by the caller.

use crate::error::FluidResult;
use crate::perfect_gas::FrozenCp;
use crate::state::{FluidState, StateInput};

/// A frozen-thermodynamic-property surrogate model anchored at a valid state.
///
/// The model uses:
/// - **Frozen specific heat capacity** (cp) from the anchor
/// - **Effective gas constant** R = p/(ρT), so the anchor density is reproduced
/// - **Frozen viscosity** from the anchor
#[derive(Debug, Clone)]
pub struct FrozenPropertySurrogate {
    relations: FrozenCp,
    mu_frozen: f64,
}

impl FrozenPropertySurrogate {
    /// Build a surrogate from a known-valid state.
    pub fn from_state(anchor: &FluidState) -> Self {
        let p = anchor.p.value;
        let t = anchor.t.value;
        let r_eff = p / (anchor.rho.value * t);
        // Keep cv positive even for strongly non-ideal anchors
        let cp = anchor.cp.max(1.05 * r_eff);
        Self {
            relations: FrozenCp {
                t_ref: t,
                p_ref: p,
                h_ref: anchor.h,
                s_ref: anchor.s,
                cp,
                r: r_eff,
            },
            mu_frozen: anchor.mu.value,
        }
    }

    /// Reference pressure [Pa].
    pub fn ref_pressure(&self) -> f64 {
        self.relations.p_ref
    }

    /// Reference temperature [K].
    pub fn ref_temperature(&self) -> f64 {
        self.relations.t_ref
    }

    /// Frozen specific heat [J/(kg·K)].
    pub fn cp_frozen(&self) -> f64 {
        self.relations.cp
    }

    /// Estimate enthalpy at a new temperature, assuming constant cp.
    pub fn estimate_enthalpy_at_t(&self, t_k: f64) -> f64 {
        self.relations.h(t_k)
    }

    /// Answer a lookup with the frozen relations. The state is flagged `fallback`.
    pub fn state(&self, input: StateInput) -> FluidResult<FluidState> {
        let (p, t) = self.relations.solve_pt(input)?;
        let mut st = self.relations.state_at(p, t, self.mu_frozen);
        st.fallback = true;
        Ok(st)
    }

    /// Check if a state is close enough to the anchor for the surrogate to be trusted.
    ///
    /// Pressure and temperature ratios to the anchor must lie in [0.5, 2.0].
    pub fn is_in_valid_range(&self, p_pa: f64, t_k: f64) -> bool {
        if p_pa <= 0.0 || t_k <= 0.0 {
            return false;
        }

        let pressure_ratio = p_pa / self.relations.p_ref;
        let temperature_ratio = t_k / self.relations.t_ref;

        (0.5..=2.0).contains(&pressure_ratio) && (0.5..=2.0).contains(&temperature_ratio)
    }
}
