//! Compressors, pumps and turbines with a fixed efficiency.

use crate::common::check_finite;
use crate::error::{CycleError, CycleResult};
use crate::traits::TwoPortComponent;
use serde::{Deserialize, Serialize};
use std::fmt;
use tm_fluids::{FluidContext, FluidState};

/// Pressure steps used to integrate a polytropic efficiency.
pub const POLYTROPIC_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyType {
    #[default]
    Isentropic,
    /// Small-stage efficiency, applied over `POLYTROPIC_STEPS` equal pressure ratios
    Polytropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    Compressor,
    Pump,
    Turbine,
}

impl MachineKind {
    fn expands(self) -> bool {
        matches!(self, MachineKind::Turbine)
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MachineKind::Compressor => "compressor",
            MachineKind::Pump => "pump",
            MachineKind::Turbine => "turbine",
        })
    }
}

/// Efficiency of one machine as it appears in a cycle description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineSpec {
    pub efficiency: f64,
    #[serde(default)]
    pub efficiency_type: EfficiencyType,
}

impl MachineSpec {
    pub fn isentropic(efficiency: f64) -> Self {
        Self {
            efficiency,
            efficiency_type: EfficiencyType::Isentropic,
        }
    }

    pub fn polytropic(efficiency: f64) -> Self {
        Self {
            efficiency,
            efficiency_type: EfficiencyType::Polytropic,
        }
    }

    pub(crate) fn validate(&self, what: &str, errors: &mut Vec<String>) {
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            errors.push(format!("{what} efficiency must be in (0, 1], got {}", self.efficiency));
        }
    }
}

/// Adiabatic machine that raises or lowers the pressure of one stream.
///
/// ## Model
///
/// With an isentropic efficiency η the outlet enthalpy follows from the
/// isentropic outlet `h_s = h(p_out, s_in)`:
///
/// ```text
/// compression: h_out = h_in + (h_s - h_in) / η
/// expansion:   h_out = h_in - η (h_in - h_s)
/// ```
///
/// A polytropic efficiency applies the same relation to each of
/// `POLYTROPIC_STEPS` steps of equal pressure ratio.
#[derive(Debug, Clone)]
pub struct Turbomachine {
    pub name: String,
    pub kind: MachineKind,
    pub spec: MachineSpec,
}

impl Turbomachine {
    pub fn new(name: impl Into<String>, kind: MachineKind, spec: MachineSpec) -> CycleResult<Self> {
        let name = name.into();
        let mut errors = Vec::new();
        spec.validate(&name, &mut errors);
        if !errors.is_empty() {
            return Err(CycleError::InvalidParameters { errors });
        }
        Ok(Self { name, kind, spec })
    }

    fn step(&self, ctx: &FluidContext<'_>, h: f64, s: f64, p_next: f64) -> CycleResult<f64> {
        let h_s = ctx.ps(p_next, s)?.h;
        let eta = self.spec.efficiency;
        Ok(if self.kind.expands() {
            h - eta * (h - h_s)
        } else {
            h + (h_s - h) / eta
        })
    }

    /// Isentropic efficiency between two states, whatever efficiency type was imposed.
    pub fn isentropic_efficiency(
        &self,
        ctx: &FluidContext<'_>,
        inlet: &FluidState,
        outlet: &FluidState,
    ) -> CycleResult<f64> {
        let h_s = ctx.ps(outlet.p.value, inlet.s)?.h;
        let dh = outlet.h - inlet.h;
        if dh.abs() <= f64::EPSILON * inlet.h.abs().max(1.0) {
            return Ok(self.spec.efficiency);
        }
        Ok(if self.kind.expands() {
            (inlet.h - outlet.h) / (inlet.h - h_s)
        } else {
            (h_s - inlet.h) / dh
        })
    }
}

impl TwoPortComponent for Turbomachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn outlet_state(&self, ctx: &FluidContext<'_>, inlet: &FluidState, p_out: f64) -> CycleResult<FluidState> {
        let p_in = check_finite(inlet.p.value, "machine inlet pressure")?;
        check_finite(p_out, "machine outlet pressure")?;
        if p_out <= 0.0 || (self.kind.expands() && p_out > p_in) || (!self.kind.expands() && p_out < p_in) {
            return Err(CycleError::non_physical(format!(
                "{} '{}' cannot go from {p_in} Pa to {p_out} Pa",
                self.kind, self.name
            )));
        }

        let h_out = match self.spec.efficiency_type {
            EfficiencyType::Isentropic => self.step(ctx, inlet.h, inlet.s, p_out)?,
            EfficiencyType::Polytropic => {
                let ratio = (p_out / p_in).powf(1.0 / POLYTROPIC_STEPS as f64);
                let (mut p, mut h, mut s) = (p_in, inlet.h, inlet.s);
                for k in 1..=POLYTROPIC_STEPS {
                    p = if k == POLYTROPIC_STEPS { p_out } else { p * ratio };
                    h = self.step(ctx, h, s, p)?;
                    s = ctx.ph(p, h)?.s;
                }
                h
            }
        };
        Ok(ctx.ph(p_out, check_finite(h_out, "machine outlet enthalpy")?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tm_fluids::Fluid;

    fn air() -> Fluid {
        Fluid::perfect_gas("air").unwrap()
    }

    #[test]
    fn isentropic_compressor_and_turbine() {
        let fluid = air();
        let ctx = fluid.context();
        let inlet = ctx.pt(1.0e5, 300.0).unwrap();
        let c = Turbomachine::new("c", MachineKind::Compressor, MachineSpec::isentropic(0.8)).unwrap();
        let out = c.outlet_state(&ctx, &inlet, 3.0e5).unwrap();
        let h_s = ctx.ps(3.0e5, inlet.s).unwrap().h;
        assert!(((out.h - inlet.h) - (h_s - inlet.h) / 0.8).abs() < 1e-6);
        assert!((c.isentropic_efficiency(&ctx, &inlet, &out).unwrap() - 0.8).abs() < 1e-12);
        assert!(c.specific_work(&inlet, &out) > 0.0);

        let hot = ctx.pt(3.0e5, 1000.0).unwrap();
        let t = Turbomachine::new("t", MachineKind::Turbine, MachineSpec::isentropic(0.9)).unwrap();
        let out = t.outlet_state(&ctx, &hot, 1.0e5).unwrap();
        assert!(t.specific_work(&hot, &out) < 0.0);
        assert!((t.isentropic_efficiency(&ctx, &hot, &out).unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn polytropic_compression_matches_perfect_gas_closed_form() {
        let fluid = air();
        let ctx = fluid.context();
        let inlet = ctx.pt(1.0e5, 300.0).unwrap();
        let gamma = inlet.gamma;
        let c = Turbomachine::new("c", MachineKind::Compressor, MachineSpec::polytropic(0.85)).unwrap();
        let out = c.outlet_state(&ctx, &inlet, 3.0e5).unwrap();
        let expected = 300.0 * 3.0_f64.powf((gamma - 1.0) / (gamma * 0.85));
        assert!((out.t.value - expected).abs() < 1e-3 * expected);
        // Compression: isentropic efficiency falls below the polytropic one
        assert!(c.isentropic_efficiency(&ctx, &inlet, &out).unwrap() < 0.85);
    }

    #[test]
    fn polytropic_expansion_beats_its_small_stage_efficiency() {
        let fluid = air();
        let ctx = fluid.context();
        let inlet = ctx.pt(4.0e5, 1100.0).unwrap();
        let t = Turbomachine::new("t", MachineKind::Turbine, MachineSpec::polytropic(0.88)).unwrap();
        let out = t.outlet_state(&ctx, &inlet, 1.0e5).unwrap();
        assert!(t.isentropic_efficiency(&ctx, &inlet, &out).unwrap() > 0.88);
    }

    #[test]
    fn wrong_direction_is_rejected() {
        let fluid = air();
        let ctx = fluid.context();
        let inlet = ctx.pt(1.0e5, 300.0).unwrap();
        let t = Turbomachine::new("t", MachineKind::Turbine, MachineSpec::isentropic(0.9)).unwrap();
        assert!(matches!(
            t.outlet_state(&ctx, &inlet, 2.0e5),
            Err(CycleError::NonPhysical { .. })
        ));
        assert!(Turbomachine::new("p", MachineKind::Pump, MachineSpec::isentropic(1.2)).is_err());
    }

    proptest! {
        #[test]
        fn compression_never_beats_the_isentropic_outlet(
            eta in 0.5f64..1.0,
            pr in 1.1f64..8.0,
            t_in in 250.0f64..600.0,
        ) {
            let fluid = air();
            let ctx = fluid.context();
            let inlet = ctx.pt(1.0e5, t_in).unwrap();
            let c = Turbomachine::new("c", MachineKind::Compressor, MachineSpec::isentropic(eta)).unwrap();
            let out = c.outlet_state(&ctx, &inlet, pr * 1.0e5).unwrap();
            prop_assert!(out.s >= inlet.s - 1e-9);
            prop_assert!((c.isentropic_efficiency(&ctx, &inlet, &out).unwrap() - eta).abs() < 1e-9);
        }
    }
}
