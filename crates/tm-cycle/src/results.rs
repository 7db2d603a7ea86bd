//! Tables reported by a cycle solve.

use crate::heat_exchanger::Pinch;
use crate::parameters::CycleTopology;
use crate::turbomachine::MachineKind;
use serde::Serialize;
use std::collections::BTreeMap;
use tm_fluids::FluidState;

/// Thermodynamic state at one junction of the flowsheet.
#[derive(Debug, Clone, Serialize)]
pub struct JunctionState {
    pub name: String,
    pub p: f64,
    pub t: f64,
    pub h: f64,
    pub s: f64,
    pub d: f64,
    pub mass_flow: f64,
}

impl JunctionState {
    pub(crate) fn new(name: &str, state: &FluidState, mass_flow: f64) -> Self {
        Self {
            name: name.to_string(),
            p: state.p.value,
            t: state.t.value,
            h: state.h,
            s: state.s,
            d: state.rho.value,
            mass_flow,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineReport {
    pub name: String,
    pub kind: MachineKind,
    pub mass_flow: f64,
    /// Shaft power added to the fluid [W], negative for turbines
    pub power: f64,
    pub pressure_ratio: f64,
    pub isentropic_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExchangerReport {
    pub name: String,
    /// Heat moved from the hot to the cold side [W]
    pub duty: f64,
    pub pinch: Pinch,
    pub t_hot_in: f64,
    pub t_hot_out: f64,
    pub t_cold_in: f64,
    pub t_cold_out: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExternalLoopReport {
    /// Heater or cooler served by the loop
    pub name: String,
    pub fluid: String,
    pub mass_flow: f64,
    pub pump_power: f64,
    pub t_in: f64,
    pub t_out: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleResults {
    pub topology: CycleTopology,
    /// Turbine mass flow that delivers the requested net power [kg/s]
    pub mass_flow: f64,
    pub net_power: f64,
    /// Net work per unit turbine flow [J/kg]
    pub specific_work: f64,
    pub turbine_power: f64,
    pub compressor_power: f64,
    /// Pump power of the external loops [W]
    pub pump_power: f64,
    pub heat_input: f64,
    pub heat_rejected: f64,
    pub cycle_efficiency: f64,
    /// Compressor and pump power over turbine power
    pub back_work_ratio: f64,
    /// `heat_input - heat_rejected - net_power - pump_power`, zero up to round-off
    pub energy_balance: f64,
    pub junctions: Vec<JunctionState>,
    pub machines: Vec<MachineReport>,
    pub exchangers: Vec<ExchangerReport>,
    pub external_loops: Vec<ExternalLoopReport>,
}

impl CycleResults {
    /// Scalar outputs by name, including `pinch_<exchanger>` for every exchanger.
    pub fn outputs(&self) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = [
            ("mass_flow", self.mass_flow),
            ("net_power", self.net_power),
            ("specific_work", self.specific_work),
            ("turbine_power", self.turbine_power),
            ("compressor_power", self.compressor_power),
            ("pump_power", self.pump_power),
            ("heat_input", self.heat_input),
            ("heat_rejected", self.heat_rejected),
            ("cycle_efficiency", self.cycle_efficiency),
            ("back_work_ratio", self.back_work_ratio),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        for hx in &self.exchangers {
            out.insert(format!("pinch_{}", hx.name), hx.pinch.delta_t);
        }
        out
    }

    pub fn output(&self, key: &str) -> Option<f64> {
        self.outputs().get(key).copied()
    }

    pub fn junction(&self, name: &str) -> Option<&JunctionState> {
        self.junctions.iter().find(|j| j.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
