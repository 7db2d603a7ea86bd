//! Initial guesses for the series unknowns.
//!
//! A guess is built from four global parameters: degree of reaction, the
//! total-to-total and total-to-static efficiencies, and a critical Mach number
//! that caps the relative exit velocity. The overall enthalpy drop is split
//! between rows by the reaction, and each row is marched once from inlet to
//! exit through the interspace model.

use crate::error::TurbineResult;
use crate::geometry::Geometry;
use crate::operation::OperationPoint;
use crate::options::ModelOptions;
use crate::plane::{InletCondition, PlaneLocation, evaluate_blade_plane, evaluate_inlet, interspace};
use crate::series::ReferenceValues;
use serde::{Deserialize, Serialize};
use tm_core::numeric::{cosd, linspace};
use tm_fluids::FluidContext;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuessParameters {
    /// Degree of reaction, the share of a stage drop taken by the rotor
    pub reaction: f64,
    pub efficiency_tt: f64,
    pub efficiency_ts: f64,
    /// Cap on the guessed relative exit Mach number of every row
    pub ma_crit: f64,
}

impl Default for GuessParameters {
    fn default() -> Self {
        Self {
            reaction: 0.5,
            efficiency_tt: 0.9,
            efficiency_ts: 0.8,
            ma_crit: 0.95,
        }
    }
}

/// `n` guesses sweeping reaction and both efficiencies together.
pub fn guess_grid(n: usize) -> Vec<GuessParameters> {
    let reaction = linspace(0.0, 0.95, n);
    let efficiency_ts = linspace(0.6, 0.9, n);
    let efficiency_tt = linspace(0.7, 1.0, n);
    reaction
        .into_iter()
        .zip(efficiency_ts)
        .zip(efficiency_tt)
        .map(|((reaction, efficiency_ts), efficiency_tt)| GuessParameters {
            reaction,
            efficiency_tt,
            efficiency_ts,
            ma_crit: 0.9,
        })
        .collect()
}

/// Cumulative share of the static enthalpy drop reached at each row exit.
pub(crate) fn enthalpy_fractions(rows: usize, reaction: f64) -> Vec<f64> {
    let weights: Vec<f64> = (0..rows)
        .map(|i| if i % 2 == 0 { 1.0 - reaction } else { reaction })
        .map(|w| w.max(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return (1..=rows).map(|i| i as f64 / rows as f64).collect();
    }
    let mut acc = 0.0;
    weights
        .iter()
        .map(|w| {
            acc += w / total;
            acc
        })
        .collect()
}

const OUTER_ITERATIONS: usize = 10;
const CONTINUITY_ITERATIONS: usize = 20;

pub(crate) struct Guess<'a, 'f> {
    pub ctx: &'a FluidContext<'f>,
    pub geometry: &'a Geometry,
    pub options: &'a ModelOptions,
    pub operation: &'a OperationPoint,
    pub refs: &'a ReferenceValues,
}

impl Guess<'_, '_> {
    /// Physical unknown vector `[v_in, (w_throat, s_throat, w_out, s_out, beta_out) per row]`.
    pub fn build(&self, params: &GuessParameters) -> TurbineResult<Vec<f64>> {
        let refs = self.refs;
        let dh_is = refs.h0_in - refs.h_out_s;
        let dh0 = params.efficiency_ts * dh_is;
        let ke_out = (dh_is - dh0 / params.efficiency_tt).max(0.0);
        let h_final = refs.h0_in - dh0 - ke_out;
        let s_final = self.ctx.ph(self.operation.p_out, h_final)?.s;

        let mut v_in = 0.2 * refs.v0;
        let mut rows = Vec::new();
        for _ in 0..OUTER_ITERATIONS {
            let (unknowns, mass_flow) = self.march(params, v_in, h_final, s_final)?;
            rows = unknowns;
            let v_new = self.continuity_velocity(mass_flow, v_in)?;
            let settled = (v_new - v_in).abs() < 1e-10 * refs.v0;
            v_in = v_new;
            if settled {
                break;
            }
        }

        debug!(?params, v_in, "initial guess");
        let mut x = Vec::with_capacity(1 + rows.len());
        x.push(v_in);
        x.extend(rows);
        Ok(x)
    }

    /// March every row once and return the row unknowns and the first row exit mass flow.
    fn march(
        &self,
        params: &GuessParameters,
        v_in: f64,
        h_final: f64,
        s_final: f64,
    ) -> TurbineResult<(Vec<f64>, f64)> {
        let refs = self.refs;
        let omega = self.operation.omega;
        let rows = self.geometry.rows();
        let fractions = enthalpy_fractions(rows.len(), params.reaction);

        let mut inlet = InletCondition {
            h0: refs.h0_in,
            s: refs.s_in,
            alpha: self.operation.alpha_in,
            v: v_in,
        };
        let mut unknowns = Vec::with_capacity(5 * rows.len());
        let mut first_mass_flow = 0.0;
        for (i, row) in rows.iter().enumerate() {
            let inlet_plane = evaluate_inlet(self.ctx, row, omega, &inlet)?;
            let h = refs.h0_in - fractions[i] * (refs.h0_in - h_final);
            let s = refs.s_in + fractions[i] * (s_final - refs.s_in);
            let u_out = row.angular_speed(omega) * row.radius_mean_out;
            let a = self.ctx.hs(h, s)?.a.value;
            let w = (2.0 * (inlet_plane.rothalpy + 0.5 * u_out * u_out - h))
                .max(0.0)
                .sqrt()
                .max(0.05 * refs.v0)
                .min(params.ma_crit * a);
            let beta = row.metal_angle_te;
            let exit = evaluate_blade_plane(
                self.ctx,
                row,
                omega,
                PlaneLocation::Exit,
                &inlet_plane,
                w,
                s,
                beta,
                self.options,
            )?;
            if i == 0 {
                first_mass_flow = exit.mass_flow;
            }
            unknowns.extend([w, s, w, s, beta]);
            if let Some(next) = rows.get(i + 1) {
                inlet = interspace(self.ctx, &exit, row, next)?;
            }
        }
        Ok((unknowns, first_mass_flow))
    }

    /// Inlet velocity that carries `mass_flow` through the first row inlet.
    fn continuity_velocity(&self, mass_flow: f64, v_start: f64) -> TurbineResult<f64> {
        let refs = self.refs;
        let row = self.geometry.row(0);
        let v_max = 0.9 * refs.a0_in;
        let flow_area = cosd(self.operation.alpha_in) * row.area_in;
        let mut v = v_start.min(v_max);
        for _ in 0..CONTINUITY_ITERATIONS {
            let d = self.ctx.hs(refs.h0_in - 0.5 * v * v, refs.s_in)?.rho.value;
            let next = (mass_flow / (d * flow_area)).min(v_max);
            let settled = (next - v).abs() < 1e-12 * refs.v0;
            v = next;
            if settled {
                break;
            }
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_reach_one() {
        let f = enthalpy_fractions(4, 0.5);
        assert_eq!(f.len(), 4);
        assert!((f[0] - 0.25).abs() < 1e-12);
        assert!((f[3] - 1.0).abs() < 1e-12);

        // Zero reaction leaves the rotor drop empty
        let f = enthalpy_fractions(2, 0.0);
        assert!((f[0] - 1.0).abs() < 1e-12);
        assert!((f[1] - 1.0).abs() < 1e-12);

        assert_eq!(enthalpy_fractions(1, 0.95), vec![1.0]);
    }

    #[test]
    fn grid_spans_parameter_ranges() {
        let grid = guess_grid(11);
        assert_eq!(grid.len(), 11);
        assert_eq!(grid[0].reaction, 0.0);
        assert!((grid[10].reaction - 0.95).abs() < 1e-12);
        assert!((grid[10].efficiency_tt - 1.0).abs() < 1e-12);
        assert!(grid.iter().all(|g| g.ma_crit == 0.9));
    }

    #[test]
    fn default_is_the_heuristic_guess() {
        let g = GuessParameters::default();
        assert_eq!((g.reaction, g.efficiency_tt, g.efficiency_ts, g.ma_crit), (0.5, 0.9, 0.8, 0.95));
    }
}
