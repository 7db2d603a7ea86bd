//! CoolProp-based fluid property model (feature `coolprop`).

use crate::error::{FluidError, FluidResult};
use crate::model::{FluidModel, ReferencePoint, ReferenceStates, validation};
use crate::species::Species;
use crate::state::{FluidState, StateInput};
use rfluids::prelude::*;
use tm_core::units::constants::R_UNIVERSAL;
use tm_core::units::{DynVisc, k, kgpm3, mps, pa};
use uom::si::dynamic_viscosity::pascal_second;

// Temperature search bounds [K]
const T_MIN: f64 = 100.0;
const T_MAX: f64 = 2000.0;
// Pressure search bounds [Pa] for HS inversion
const P_MIN: f64 = 1.0e2;
const P_MAX: f64 = 1.0e8;
const MAX_ITER: usize = 100;

fn backend_err(what: &str, e: impl std::fmt::Display) -> FluidError {
    FluidError::Backend {
        message: format!("rfluids error getting {what}: {e}"),
    }
}

/// CoolProp backend for one pure fluid.
///
/// Thread-safe: rfluids `Fluid` instances are created per lookup.
pub struct CoolPropModel {
    species: Species,
}

impl CoolPropModel {
    pub fn new(species: Species) -> Self {
        Self { species }
    }

    /// Create a Fluid instance at given P,T state.
    fn fluid_at_pt(&self, p_pa: f64, t_k: f64) -> FluidResult<Fluid> {
        Fluid::from(self.species.rfluids_pure())
            .in_state(FluidInput::pressure(p_pa), FluidInput::temperature(t_k))
            .map_err(|e| FluidError::Backend {
                message: format!("rfluids error at P={p_pa} Pa, T={t_k} K: {e}"),
            })
    }

    fn h_at(&self, p_pa: f64, t_k: f64) -> FluidResult<f64> {
        self.fluid_at_pt(p_pa, t_k)?
            .enthalpy()
            .map_err(|e| backend_err("enthalpy", e))
    }

    fn s_at(&self, p_pa: f64, t_k: f64) -> FluidResult<f64> {
        self.fluid_at_pt(p_pa, t_k)?
            .entropy()
            .map_err(|e| backend_err("entropy", e))
    }

    /// Bisection on T for a property that increases with temperature at fixed p.
    fn bisect_t(
        &self,
        target: f64,
        what: &'static str,
        f: impl Fn(f64) -> FluidResult<f64>,
    ) -> FluidResult<f64> {
        let mut t_low = T_MIN;
        let mut t_high = T_MAX;
        let f_low = f(t_low)?;
        let f_high = f(t_high)?;
        if target < f_low || target > f_high {
            return Err(FluidError::OutOfRange { what });
        }
        let tol = 1.0e-9_f64.max(target.abs() * 1e-9);
        for _ in 0..MAX_ITER {
            let t_mid = 0.5 * (t_low + t_high);
            let f_mid = f(t_mid)?;
            if (f_mid - target).abs() < tol {
                return Ok(t_mid);
            }
            if f_mid < target {
                t_low = t_mid;
            } else {
                t_high = t_mid;
            }
        }
        Ok(0.5 * (t_low + t_high))
    }

    fn solve_t_from_ph(&self, p_pa: f64, h: f64) -> FluidResult<f64> {
        self.bisect_t(h, "enthalpy outside valid range for given pressure", |t| {
            self.h_at(p_pa, t)
        })
    }

    fn solve_t_from_ps(&self, p_pa: f64, s: f64) -> FluidResult<f64> {
        self.bisect_t(s, "entropy outside valid range for given pressure", |t| {
            self.s_at(p_pa, t)
        })
    }

    /// Nested bisection: at fixed s, h grows with p.
    fn solve_pt_from_hs(&self, h: f64, s: f64) -> FluidResult<(f64, f64)> {
        let mut lp_low = P_MIN.ln();
        let mut lp_high = P_MAX.ln();
        let mut best = None;
        for _ in 0..MAX_ITER {
            let p_mid = (0.5 * (lp_low + lp_high)).exp();
            let t_mid = self.solve_t_from_ps(p_mid, s)?;
            let h_mid = self.h_at(p_mid, t_mid)?;
            best = Some((p_mid, t_mid));
            if (h_mid - h).abs() < 1.0e-6_f64.max(h.abs() * 1e-10) {
                break;
            }
            if h_mid < h {
                lp_low = p_mid.ln();
            } else {
                lp_high = p_mid.ln();
            }
        }
        best.ok_or(FluidError::ConvergenceFailed {
            what: "pressure from enthalpy and entropy",
        })
    }

    fn solve_t_from_rho_h(&self, rho: f64, h: f64) -> FluidResult<(f64, f64)> {
        let at = |t: f64| -> FluidResult<Fluid> {
            Fluid::from(self.species.rfluids_pure())
                .in_state(FluidInput::density(rho), FluidInput::temperature(t))
                .map_err(|e| FluidError::Backend {
                    message: format!("rfluids error at rho={rho} kg/m³, T={t} K: {e}"),
                })
        };
        let t = self.bisect_t(h, "enthalpy outside valid range for given density", |t| {
            at(t)?.enthalpy().map_err(|e| backend_err("enthalpy", e))
        })?;
        let p = at(t)?.pressure().map_err(|e| backend_err("pressure", e))?;
        Ok((p, t))
    }

    /// Evaluate every property from one backend state.
    fn full_state(&self, p_pa: f64, t_k: f64) -> FluidResult<FluidState> {
        let mut fluid = self.fluid_at_pt(p_pa, t_k)?;
        let rho = fluid.density().map_err(|e| backend_err("density", e))?;
        let h = fluid.enthalpy().map_err(|e| backend_err("enthalpy", e))?;
        let s = fluid.entropy().map_err(|e| backend_err("entropy", e))?;
        let cp = fluid
            .specific_heat()
            .map_err(|e| backend_err("specific heat", e))?;
        let a = fluid
            .sound_speed()
            .map_err(|e| backend_err("sound speed", e))?;
        let mu = fluid
            .dynamic_viscosity()
            .map_err(|e| backend_err("viscosity", e))?;

        let r_specific = p_pa / (rho * t_k);
        let cv = cp - r_specific;
        validation::validate_cp(cv)?;
        let gamma = cp / cv;
        validation::validate_gamma(gamma)?;

        Ok(FluidState {
            p: pa(p_pa),
            t: k(t_k),
            rho: kgpm3(rho),
            h,
            s,
            cp,
            cv,
            gamma,
            a: mps(a),
            mu: DynVisc::new::<pascal_second>(mu),
            z: r_specific / (R_UNIVERSAL / self.species.molar_mass()),
            fallback: false,
        })
    }
}

impl FluidModel for CoolPropModel {
    fn name(&self) -> &str {
        self.species.coolprop_name()
    }

    fn state(&self, input: StateInput) -> FluidResult<FluidState> {
        validation::validate_input(&input)?;
        let (p, t) = match input {
            StateInput::PT { p, t } => (p.value, t.value),
            StateInput::PH { p, h } => (p.value, self.solve_t_from_ph(p.value, h)?),
            StateInput::PS { p, s } => (p.value, self.solve_t_from_ps(p.value, s)?),
            StateInput::HS { h, s } => self.solve_pt_from_hs(h, s)?,
            StateInput::RhoH { rho_kg_m3, h } => self.solve_t_from_rho_h(rho_kg_m3, h)?,
        };
        self.full_state(p, t)
    }

    fn reference_states(&self) -> FluidResult<ReferenceStates> {
        let (pc, tc) = self.species.critical_point();
        let (pt, tt) = self.species.triple_point();
        Ok(ReferenceStates {
            critical: ReferencePoint { p: pc, t: tc },
            triple: ReferencePoint { p: pt, t: tt },
        })
    }

    fn molar_mass(&self) -> f64 {
        self.species.molar_mass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name() {
        let model = CoolPropModel::new(Species::N2);
        assert_eq!(model.name(), "Nitrogen");
    }

    #[test]
    fn reference_states_from_species() {
        let model = CoolPropModel::new(Species::CO2);
        let refs = model.reference_states().unwrap();
        assert!((refs.critical.t - 304.13).abs() < 1e-9);
    }
}
