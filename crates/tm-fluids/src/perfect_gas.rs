//! Calorically perfect gas backend.
//!
//! Enthalpy and entropy are measured from T_ref = 298.15 K, p_ref = 101325 Pa:
//!
//! ```text
//! h = cp (T - T_ref)
//! s = cp ln(T / T_ref) - R ln(p / p_ref)
//! ```

use crate::error::{FluidError, FluidResult};
use crate::model::{FluidModel, ReferencePoint, ReferenceStates, validation};
use crate::species::Species;
use crate::state::{FluidState, StateInput};
use tm_core::units::constants::{P_ATM, R_UNIVERSAL};
use tm_core::units::{DynVisc, k, kgpm3, mps, pa};
use uom::si::dynamic_viscosity::pascal_second;

/// Reference temperature for h = 0, s = 0 [K].
pub const T_REF: f64 = 298.15;

/// Reference pressure for s = 0 [Pa].
pub const P_REF: f64 = P_ATM;

/// Ideal-gas relations with a constant cp, anchored at an arbitrary state.
///
/// Shared by [`PerfectGas`] (anchored at the reference state) and the fail-soft
/// surrogate (anchored at the last valid real-fluid state).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrozenCp {
    pub t_ref: f64,
    pub p_ref: f64,
    pub h_ref: f64,
    pub s_ref: f64,
    pub cp: f64,
    pub r: f64,
}

impl FrozenCp {
    pub fn h(&self, t: f64) -> f64 {
        self.h_ref + self.cp * (t - self.t_ref)
    }

    pub fn s(&self, p: f64, t: f64) -> f64 {
        self.s_ref + self.cp * (t / self.t_ref).ln() - self.r * (p / self.p_ref).ln()
    }

    fn t_from_h(&self, h: f64) -> f64 {
        self.t_ref + (h - self.h_ref) / self.cp
    }

    /// Resolve any input pair to (p, T).
    pub fn solve_pt(&self, input: StateInput) -> FluidResult<(f64, f64)> {
        let (p, t) = match input {
            StateInput::PT { p, t } => (p.value, t.value),
            StateInput::PH { p, h } => (p.value, self.t_from_h(h)),
            StateInput::HS { h, s } => {
                let t = self.t_from_h(h);
                if t <= 0.0 {
                    return Err(FluidError::OutOfRange {
                        what: "enthalpy below absolute zero",
                    });
                }
                let p = self.p_ref
                    * ((self.cp * (t / self.t_ref).ln() - (s - self.s_ref)) / self.r).exp();
                (p, t)
            }
            StateInput::PS { p, s } => {
                let p = p.value;
                let t = self.t_ref
                    * ((s - self.s_ref + self.r * (p / self.p_ref).ln()) / self.cp).exp();
                (p, t)
            }
            StateInput::RhoH { rho_kg_m3, h } => {
                let t = self.t_from_h(h);
                (rho_kg_m3 * self.r * t, t)
            }
        };
        if !(t.is_finite() && t > 0.0) {
            return Err(FluidError::OutOfRange {
                what: "temperature outside perfect-gas domain",
            });
        }
        if !(p.is_finite() && p > 0.0) {
            return Err(FluidError::OutOfRange {
                what: "pressure outside perfect-gas domain",
            });
        }
        Ok((p, t))
    }

    /// Assemble a complete state at (p, T) with the given viscosity.
    pub fn state_at(&self, p: f64, t: f64, mu: f64) -> FluidState {
        let cv = self.cp - self.r;
        let gamma = self.cp / cv;
        FluidState {
            p: pa(p),
            t: k(t),
            rho: kgpm3(p / (self.r * t)),
            h: self.h(t),
            s: self.s(p, t),
            cp: self.cp,
            cv,
            gamma,
            a: mps((gamma * self.r * t).sqrt()),
            mu: DynVisc::new::<pascal_second>(mu),
            z: 1.0,
            fallback: false,
        }
    }
}

/// Viscosity law of a perfect gas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viscosity {
    /// Temperature-independent viscosity [Pa·s].
    Constant(f64),
    /// Sutherland's law μ = μ_ref (T/T_ref)^1.5 (T_ref + S)/(T + S).
    Sutherland { mu_ref: f64, t_ref: f64, s: f64 },
}

impl Viscosity {
    pub fn at(&self, t: f64) -> f64 {
        match *self {
            Viscosity::Constant(mu) => mu,
            Viscosity::Sutherland { mu_ref, t_ref, s } => {
                mu_ref * (t / t_ref).powf(1.5) * (t_ref + s) / (t + s)
            }
        }
    }
}

/// Calorically perfect gas.
#[derive(Debug, Clone)]
pub struct PerfectGas {
    name: String,
    molar_mass: f64,
    relations: FrozenCp,
    viscosity: Viscosity,
    reference: Option<ReferenceStates>,
}

impl PerfectGas {
    /// Preset for one of the built-in gases.
    pub fn preset(species: Species) -> FluidResult<Self> {
        let gas = species.gas_constants().ok_or(FluidError::NotSupported {
            what: "no perfect-gas preset for this fluid",
        })?;
        let (pc, tc) = species.critical_point();
        let (pt, tt) = species.triple_point();
        let mut model = Self::custom(
            species.coolprop_name(),
            R_UNIVERSAL / gas.molar_mass,
            gas.cp,
            Viscosity::Sutherland {
                mu_ref: gas.mu_ref,
                t_ref: gas.t_mu_ref,
                s: gas.sutherland,
            },
        )?;
        model.molar_mass = gas.molar_mass;
        model.reference = Some(ReferenceStates {
            critical: ReferencePoint { p: pc, t: tc },
            triple: ReferencePoint { p: pt, t: tt },
        });
        Ok(model)
    }

    /// Gas with a user-supplied specific gas constant [J/(kg·K)] and cp [J/(kg·K)].
    pub fn custom(
        name: impl Into<String>,
        r_specific: f64,
        cp: f64,
        viscosity: Viscosity,
    ) -> FluidResult<Self> {
        validation::validate_cp(cp)?;
        if !(r_specific.is_finite() && r_specific > 0.0 && r_specific < cp) {
            return Err(FluidError::InvalidArg {
                what: "gas constant must be positive and below cp",
            });
        }
        Ok(Self {
            name: name.into(),
            molar_mass: R_UNIVERSAL / r_specific,
            relations: FrozenCp {
                t_ref: T_REF,
                p_ref: P_REF,
                h_ref: 0.0,
                s_ref: 0.0,
                cp,
                r: r_specific,
            },
            viscosity,
            reference: None,
        })
    }

    /// Specific gas constant [J/(kg·K)].
    pub fn r_specific(&self) -> f64 {
        self.relations.r
    }

    /// Heat capacity ratio γ.
    pub fn gamma(&self) -> f64 {
        self.relations.cp / (self.relations.cp - self.relations.r)
    }
}

impl FluidModel for PerfectGas {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self, input: StateInput) -> FluidResult<FluidState> {
        validation::validate_input(&input)?;
        let (p, t) = self.relations.solve_pt(input)?;
        Ok(self.relations.state_at(p, t, self.viscosity.at(t)))
    }

    fn reference_states(&self) -> FluidResult<ReferenceStates> {
        self.reference.ok_or(FluidError::NotSupported {
            what: "custom perfect gas has no critical or triple point",
        })
    }

    fn molar_mass(&self) -> f64 {
        self.molar_mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn air() -> PerfectGas {
        PerfectGas::preset(Species::Air).unwrap()
    }

    #[test]
    fn reference_state_is_zero() {
        let st = air()
            .state(StateInput::PT {
                p: pa(P_REF),
                t: k(T_REF),
            })
            .unwrap();
        assert!(st.h.abs() < 1e-9);
        assert!(st.s.abs() < 1e-9);
        assert!((st.rho.value - 1.184).abs() < 5e-3);
    }

    #[test]
    fn speed_of_sound_air() {
        let st = air()
            .state(StateInput::PT {
                p: pa(1.0e5),
                t: k(300.0),
            })
            .unwrap();
        assert!((st.a.value - 347.2).abs() < 1.0);
        assert!((st.gamma - 1.4).abs() < 5e-3);
    }

    #[test]
    fn sutherland_viscosity_at_reference() {
        let v = Viscosity::Sutherland {
            mu_ref: 1.716e-5,
            t_ref: 273.15,
            s: 110.4,
        };
        assert!((v.at(273.15) - 1.716e-5).abs() < 1e-12);
        assert!(v.at(400.0) > v.at(300.0));
    }

    #[test]
    fn water_has_no_preset() {
        assert!(PerfectGas::preset(Species::H2O).is_err());
    }

    #[test]
    fn custom_gas_has_no_reference_states() {
        let gas = PerfectGas::custom("mix", 300.0, 1100.0, Viscosity::Constant(2e-5)).unwrap();
        assert!(gas.reference_states().is_err());
        assert!(PerfectGas::custom("bad", 1200.0, 1100.0, Viscosity::Constant(2e-5)).is_err());
    }

    proptest! {
        #[test]
        fn input_pairs_agree(p in 1.0e4f64..1.0e7, t in 200.0f64..1500.0) {
            let gas = air();
            let base = gas.state(StateInput::PT { p: pa(p), t: k(t) }).unwrap();
            let hs = gas.state(StateInput::HS { h: base.h, s: base.s }).unwrap();
            let ps = gas.state(StateInput::PS { p: pa(p), s: base.s }).unwrap();
            let rh = gas.state(StateInput::RhoH { rho_kg_m3: base.rho.value, h: base.h }).unwrap();
            prop_assert!((hs.p.value - p).abs() / p < 1e-9);
            prop_assert!((ps.t.value - t).abs() / t < 1e-9);
            prop_assert!((rh.p.value - p).abs() / p < 1e-9);
        }
    }
}
