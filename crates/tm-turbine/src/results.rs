//! Performance tables derived from a converged set of planes.

use crate::error::{TurbineError, TurbineResult};
use crate::geometry::{CascadeType, Geometry};
use crate::loss::LossBreakdown;
use crate::operation::OperationPoint;
use crate::options::SolverMethod;
use crate::plane::{PlaneLocation, PlaneState};
use crate::series::{ReferenceValues, SeriesState};
use serde::Serialize;
use tm_fluids::FluidContext;

#[derive(Debug, Clone, Serialize)]
pub struct OverallPerformance {
    pub pressure_ratio_tt: f64,
    pub pressure_ratio_ts: f64,
    pub mass_flow_rate: f64,
    pub efficiency_tt: f64,
    pub efficiency_ts: f64,
    /// Exit kinetic energy over the isentropic drop
    pub efficiency_ts_drop_kinetic: f64,
    /// Share of the isentropic drop lost to the row losses
    pub efficiency_ts_drop_losses: f64,
    pub power: f64,
    pub torque: f64,
    pub angular_speed: f64,
    /// Absolute flow angle at the last exit [deg]
    pub exit_flow_angle: f64,
    pub exit_velocity: f64,
    pub spouting_velocity: f64,
    pub last_blade_velocity: f64,
    pub blade_jet_ratio: f64,
    pub h0_in: f64,
    pub h0_out: f64,
    pub h_out_s: f64,
}

/// Total-to-static efficiency lost to each loss mechanism of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EfficiencyDrop {
    pub profile: f64,
    pub incidence: f64,
    pub secondary: f64,
    pub trailing: f64,
    pub clearance: f64,
    pub total: f64,
}

impl EfficiencyDrop {
    /// Split `drop` between the mechanisms in proportion to their loss coefficients.
    fn split(loss: &LossBreakdown, drop: f64) -> Self {
        if loss.total <= 0.0 {
            return Self {
                profile: drop,
                total: drop,
                ..Self::default()
            };
        }
        let share = |y: f64| y / loss.total * drop;
        Self {
            profile: share(loss.profile),
            incidence: share(loss.incidence),
            secondary: share(loss.secondary),
            trailing: share(loss.trailing),
            clearance: share(loss.clearance),
            total: drop,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CascadePerformance {
    pub row: usize,
    pub cascade_type: CascadeType,
    /// Exit plane loss breakdown
    pub loss: LossBreakdown,
    /// Static enthalpy rise over an isentropic row expansion to the same pressure
    pub dh_s: f64,
    pub ma_crit: f64,
    pub mass_flow_crit: f64,
    pub d_crit: f64,
    pub w_crit: f64,
    pub p_crit: f64,
    pub beta_crit: f64,
    pub pressure_ratio_crit: f64,
    pub choked: bool,
    /// Inlet relative flow angle minus the leading-edge metal angle [deg]
    pub incidence: f64,
    pub efficiency_drop: EfficiencyDrop,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StagePerformance {
    pub stage: usize,
    pub reaction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolverReport {
    pub converged: bool,
    /// Iterations summed over every attempt
    pub iterations: usize,
    pub attempts: usize,
    pub residual_norm: f64,
    pub method: SolverMethod,
    /// Method and initial guess of the successful attempt
    pub strategy: String,
    pub residual: Vec<f64>,
    pub property_fallbacks: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurbineResults {
    pub overall: OverallPerformance,
    pub cascade: Vec<CascadePerformance>,
    pub plane: Vec<PlaneState>,
    pub stage: Vec<StagePerformance>,
    pub solver: SolverReport,
}

impl TurbineResults {
    pub(crate) fn assemble(
        ctx: &FluidContext<'_>,
        geometry: &Geometry,
        op: &OperationPoint,
        refs: &ReferenceValues,
        state: &SeriesState,
        solver: SolverReport,
    ) -> TurbineResult<Self> {
        let planes = &state.planes;
        let Some(last) = planes.last() else {
            return Err(TurbineError::non_physical("series produced no planes"));
        };

        let dh_is = refs.h0_in - refs.h_out_s;
        let dh0 = refs.h0_in - last.h0;
        let ke_out = 0.5 * last.velocity.v * last.velocity.v;
        let efficiency_ts = dh0 / dh_is;
        let efficiency_ts_drop_kinetic = ke_out / dh_is;
        let power = last.mass_flow * dh0;
        let last_blade_velocity = planes
            .iter()
            .rev()
            .find(|p| p.location == PlaneLocation::Exit && p.velocity.u != 0.0)
            .map_or(0.0, |p| p.velocity.u);

        let overall = OverallPerformance {
            pressure_ratio_tt: refs.p0_in / last.p0,
            pressure_ratio_ts: refs.p0_in / last.p,
            mass_flow_rate: last.mass_flow,
            efficiency_tt: dh0 / (dh_is - ke_out),
            efficiency_ts,
            efficiency_ts_drop_kinetic,
            efficiency_ts_drop_losses: 1.0 - efficiency_ts - efficiency_ts_drop_kinetic,
            power,
            torque: if op.omega != 0.0 { power / op.omega } else { 0.0 },
            angular_speed: op.omega,
            exit_flow_angle: last.velocity.alpha,
            exit_velocity: last.velocity.v,
            spouting_velocity: refs.v0,
            last_blade_velocity,
            blade_jet_ratio: last_blade_velocity / refs.v0,
            h0_in: refs.h0_in,
            h0_out: last.h0,
            h_out_s: refs.h_out_s,
        };

        let mut dh_s = Vec::with_capacity(geometry.number_of_rows());
        for chunk in planes.chunks(3) {
            let (inlet, exit) = (&chunk[0], &chunk[2]);
            dh_s.push(exit.h - ctx.ps(exit.p, inlet.s)?.h);
        }
        // Reheat correction: row drops are rescaled so they add up to the overall loss
        let sum_dh_s: f64 = dh_s.iter().sum();
        let correction = if sum_dh_s.abs() > f64::EPSILON * refs.h0_in.abs().max(1.0) {
            (last.h - refs.h_out_s) / sum_dh_s
        } else {
            0.0
        };

        let cascade = geometry
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let inlet = &planes[3 * i];
                let exit = &planes[3 * i + 2];
                let crit = &state.critical[i];
                let loss = exit.loss.unwrap_or_default();
                CascadePerformance {
                    row: i,
                    cascade_type: row.cascade_type,
                    loss,
                    dh_s: dh_s[i],
                    ma_crit: crit.ma_rel,
                    mass_flow_crit: crit.mass_flow,
                    d_crit: crit.d,
                    w_crit: crit.w,
                    p_crit: crit.p,
                    beta_crit: crit.beta,
                    pressure_ratio_crit: crit.pressure_ratio,
                    choked: state.choked[i],
                    incidence: inlet.velocity.beta - row.metal_angle_le,
                    efficiency_drop: EfficiencyDrop::split(&loss, correction * dh_s[i] / dh_is),
                }
            })
            .collect();

        let stage = (0..geometry.number_of_stages())
            .map(|i| {
                let h = |k: usize| planes[6 * i + k].h;
                StagePerformance {
                    stage: i,
                    reaction: (h(2) - h(5)) / (h(0) - h(5)),
                }
            })
            .collect();

        Ok(Self {
            overall,
            cascade,
            plane: planes.clone(),
            stage,
            solver,
        })
    }

    /// Sum of every row efficiency drop.
    pub fn total_loss_drop(&self) -> f64 {
        self.cascade.iter().map(|c| c.efficiency_drop.total).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
