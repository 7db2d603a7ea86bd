//! Recuperators, heaters and coolers with counter-current pinch evaluation.

use crate::common::{check_finite, check_fraction, check_positive, pressure_after_drop};
use crate::error::{CycleError, CycleResult};
use crate::traits::TwoPortComponent;
use crate::turbomachine::{MachineKind, MachineSpec, Turbomachine};
use serde::{Deserialize, Serialize};
use tm_fluids::{FluidConfig, FluidContext, FluidState};
use tracing::warn;

fn default_num_elements() -> usize {
    20
}

fn default_pump() -> MachineSpec {
    MachineSpec::isentropic(0.7)
}

/// One side of a heat exchanger: the stream's property context and end states.
#[derive(Clone, Copy)]
pub struct Stream<'a, 'f> {
    pub ctx: &'a FluidContext<'f>,
    pub inlet: &'a FluidState,
    pub outlet: &'a FluidState,
}

impl Stream<'_, '_> {
    /// Temperatures at `num_elements + 1` nodes from inlet to outlet.
    ///
    /// Enthalpy and pressure vary linearly along the side, so every segment
    /// carries the same share of the duty.
    pub fn temperature_profile(&self, num_elements: usize) -> CycleResult<Vec<f64>> {
        let n = num_elements.max(1);
        let (p0, p1) = (self.inlet.p.value, self.outlet.p.value);
        let (h0, h1) = (self.inlet.h, self.outlet.h);
        (0..=n)
            .map(|i| {
                let f = i as f64 / n as f64;
                let state = self.ctx.ph(p0 + f * (p1 - p0), h0 + f * (h1 - h0))?;
                Ok(state.t.value)
            })
            .collect()
    }
}

/// Smallest hot-to-cold temperature difference along a counter-current exchanger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pinch {
    /// Minimum of `T_hot - T_cold` over the nodes [K]
    pub delta_t: f64,
    /// Node index counted from the hot inlet
    pub node: usize,
    pub t_hot: f64,
    pub t_cold: f64,
}

/// Pinch of a counter-current exchanger discretized into `num_elements` segments.
///
/// Node `i` pairs the hot stream `i` segments from its inlet with the cold
/// stream `i` segments from its outlet.
pub fn pinch(hot: &Stream<'_, '_>, cold: &Stream<'_, '_>, num_elements: usize) -> CycleResult<Pinch> {
    let t_hot = hot.temperature_profile(num_elements)?;
    let t_cold = cold.temperature_profile(num_elements)?;
    let mut best = Pinch {
        delta_t: f64::INFINITY,
        node: 0,
        t_hot: f64::NAN,
        t_cold: f64::NAN,
    };
    for (node, (th, tc)) in t_hot.iter().zip(t_cold.iter().rev()).enumerate() {
        let dt = th - tc;
        if dt < best.delta_t {
            best = Pinch {
                delta_t: dt,
                node,
                t_hot: *th,
                t_cold: *tc,
            };
        }
    }
    check_finite(best.delta_t, "pinch temperature difference")?;
    Ok(best)
}

/// Recuperator described by its effectiveness and side pressure drops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangerSpec {
    pub effectiveness: f64,
    #[serde(default)]
    pub dp_hot: f64,
    #[serde(default)]
    pub dp_cold: f64,
    #[serde(default = "default_num_elements")]
    pub num_elements: usize,
}

impl ExchangerSpec {
    pub fn new(effectiveness: f64, dp_hot: f64, dp_cold: f64) -> Self {
        Self {
            effectiveness,
            dp_hot,
            dp_cold,
            num_elements: default_num_elements(),
        }
    }

    pub(crate) fn validate(&self, what: &str, errors: &mut Vec<String>) {
        if !(self.effectiveness >= 0.0 && self.effectiveness <= 1.0) {
            errors.push(format!(
                "{what} effectiveness must be in [0, 1], got {}",
                self.effectiveness
            ));
        }
        check_fraction(errors, &format!("{what} dp_hot"), self.dp_hot, 0.0, 1.0);
        check_fraction(errors, &format!("{what} dp_cold"), self.dp_cold, 0.0, 1.0);
        if self.num_elements == 0 {
            errors.push(format!("{what} num_elements must be at least 1"));
        }
    }
}

/// Outlet states and duty of one recuperator pass.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub hot_out: FluidState,
    pub cold_out: FluidState,
    /// Heat moved from the hot to the cold side per unit reference flow [J/kg]
    pub duty: f64,
}

/// Two-stream recuperator on the working fluid.
#[derive(Debug, Clone)]
pub struct Recuperator {
    pub name: String,
    pub spec: ExchangerSpec,
}

impl Recuperator {
    pub fn new(name: impl Into<String>, spec: ExchangerSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// Transfer `ε · Q_max` between the sides.
    ///
    /// `Q_max` is the smaller of the two end-point limits: the hot side cooled
    /// to the cold inlet temperature, or the cold side heated to the hot inlet
    /// temperature. Flows `m_hot` and `m_cold` are fractions of the reference
    /// flow. A cold inlet hotter than the hot inlet gives a negative duty.
    pub fn transfer(
        &self,
        ctx: &FluidContext<'_>,
        hot_in: &FluidState,
        m_hot: f64,
        cold_in: &FluidState,
        m_cold: f64,
    ) -> CycleResult<Transfer> {
        if !(m_hot > 0.0 && m_cold > 0.0) {
            return Err(CycleError::non_physical(format!(
                "{} flows must be positive (hot {m_hot}, cold {m_cold})",
                self.name
            )));
        }
        let p_hot_out = pressure_after_drop(hot_in.p.value, self.spec.dp_hot);
        let p_cold_out = pressure_after_drop(cold_in.p.value, self.spec.dp_cold);

        let q_hot = m_hot * (hot_in.h - ctx.pt(p_hot_out, cold_in.t.value)?.h);
        let q_cold = m_cold * (ctx.pt(p_cold_out, hot_in.t.value)?.h - cold_in.h);
        let q_max = if q_hot.abs() < q_cold.abs() { q_hot } else { q_cold };
        let duty = self.spec.effectiveness * q_max;

        Ok(Transfer {
            hot_out: ctx.ph(p_hot_out, hot_in.h - duty / m_hot)?,
            cold_out: ctx.ph(p_cold_out, cold_in.h + duty / m_cold)?,
            duty,
        })
    }
}

/// External heating or cooling stream exchanging heat with the working fluid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalFluid {
    pub fluid: FluidConfig,
    pub t_in: f64,
    pub t_out: f64,
    /// Inlet pressure [Pa]
    pub p: f64,
    /// Fractional pressure drop across the exchanger, restored by the loop pump
    #[serde(default)]
    pub dp: f64,
    #[serde(default = "default_pump")]
    pub pump: MachineSpec,
}

/// Heater or cooler on the working fluid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThermalSpec {
    /// Working-side fractional pressure drop
    #[serde(default)]
    pub dp: f64,
    #[serde(default = "default_num_elements")]
    pub num_elements: usize,
    #[serde(default)]
    pub external: Option<ExternalFluid>,
}

impl ThermalSpec {
    pub fn new(dp: f64) -> Self {
        Self {
            dp,
            num_elements: default_num_elements(),
            external: None,
        }
    }

    pub fn with_external(mut self, external: ExternalFluid) -> Self {
        self.external = Some(external);
        self
    }

    /// `heating` selects the sign convention of the external stream.
    pub(crate) fn validate(&self, what: &str, heating: bool, errors: &mut Vec<String>) {
        check_fraction(errors, &format!("{what} dp"), self.dp, 0.0, 1.0);
        if self.num_elements == 0 {
            errors.push(format!("{what} num_elements must be at least 1"));
        }
        let Some(ext) = &self.external else {
            return;
        };
        check_positive(errors, &format!("{what} external t_in"), ext.t_in);
        check_positive(errors, &format!("{what} external t_out"), ext.t_out);
        check_positive(errors, &format!("{what} external p"), ext.p);
        check_fraction(errors, &format!("{what} external dp"), ext.dp, 0.0, 1.0);
        ext.pump.validate(&format!("{what} pump"), errors);
        if heating && ext.t_out >= ext.t_in {
            errors.push(format!("{what} heating fluid must cool down (t_out < t_in)"));
        }
        if !heating && ext.t_out <= ext.t_in {
            errors.push(format!("{what} cooling fluid must warm up (t_out > t_in)"));
        }
    }
}

/// External stream sized to carry a given working-fluid duty.
#[derive(Debug, Clone)]
pub struct ExternalLoop {
    pub inlet: FluidState,
    pub outlet: FluidState,
    pub pump_outlet: FluidState,
    /// External flow per unit reference flow
    pub mass_flow: f64,
    /// Pump work per unit reference flow [J/kg]
    pub pump_work: f64,
    pub pinch: Pinch,
}

impl ExternalLoop {
    /// Size the external stream of `spec` for the working-fluid pass `working`.
    ///
    /// `duty` is the heat exchanged per unit reference flow, always positive.
    /// `heating` is true when the external stream is the hot side.
    pub fn size(
        name: &str,
        ext_ctx: &FluidContext<'_>,
        spec: &ExternalFluid,
        working: &Stream<'_, '_>,
        duty: f64,
        heating: bool,
        num_elements: usize,
    ) -> CycleResult<Self> {
        let inlet = ext_ctx.pt(spec.p, spec.t_in)?;
        let outlet = ext_ctx.pt(pressure_after_drop(spec.p, spec.dp), spec.t_out)?;
        let dh = (inlet.h - outlet.h).abs();
        if dh <= f64::EPSILON * inlet.h.abs().max(1.0) {
            return Err(CycleError::non_physical(format!(
                "{name} external stream has no enthalpy change"
            )));
        }
        let mass_flow = duty / dh;

        let pump = Turbomachine::new(format!("{name}_pump"), MachineKind::Pump, spec.pump)?;
        let pump_outlet = pump.outlet_state(ext_ctx, &outlet, spec.p)?;
        let pump_work = mass_flow * pump.specific_work(&outlet, &pump_outlet);

        let external = Stream {
            ctx: ext_ctx,
            inlet: &inlet,
            outlet: &outlet,
        };
        let pinch = if heating {
            pinch(&external, working, num_elements)?
        } else {
            pinch(working, &external, num_elements)?
        };
        if pinch.delta_t < 0.0 {
            warn!(exchanger = name, pinch = pinch.delta_t, "temperature cross in heat exchanger");
        }

        Ok(Self {
            inlet,
            outlet,
            pump_outlet,
            mass_flow,
            pump_work,
            pinch,
        })
    }
}
