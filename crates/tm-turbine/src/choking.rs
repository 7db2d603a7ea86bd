//! Critical (maximum mass flux) throat state of a row.
//!
//! With the throat relative stagnation enthalpy and the loss coefficient held
//! fixed, the throat mass flow is a function of static pressure alone:
//!
//! ```text
//! p0_rel = (p0_rel_in + Y·p) / (1 + Y)
//! s      = s(h0_rel, p0_rel)
//! w      = √(2 (h0_rel − h(p, s)))
//! ṁ(p)   = ρ w cos θ_te A_throat (1 − b)
//! ```
//!
//! The critical state is the stationary point dṁ/dp = 0, found with a
//! bracketed Brent search on a central-difference derivative.

use crate::error::{ChokingError, TurbineError, TurbineResult};
use crate::geometry::RowGeometry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tm_core::numeric::cosd;
use tm_fluids::FluidContext;
use tm_solver::{ScalarConfig, SolverError, brent_root};
use tracing::debug;

/// Boundary-layer blockage of the throat and exit sections.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockageModel {
    /// Turbulent flat-plate displacement thickness on both blade surfaces
    FlatPlateTurbulent,
    /// Fixed blockage fraction in [0, 1]
    Constant(f64),
    #[default]
    None,
}

/// Upper limit of the blocked fraction; the effective area stays positive.
pub const MAX_BLOCKAGE: f64 = 0.99;

impl BlockageModel {
    /// Blocked fraction of the flow area, clamped to `[0, MAX_BLOCKAGE]`.
    ///
    /// The flat-plate correlation diverges as `Re -> 0`, which the critical
    /// search visits near stagnation.
    pub fn factor(&self, re: f64, chord: f64, opening: f64) -> f64 {
        let b = match *self {
            BlockageModel::FlatPlateTurbulent => {
                if !(re > 0.0 && re.is_finite()) {
                    return MAX_BLOCKAGE;
                }
                let displacement = 0.048 / re.powf(0.2) * 0.9 * chord;
                2.0 * displacement / opening
            }
            BlockageModel::Constant(b) => b,
            BlockageModel::None => 0.0,
        };
        if b.is_nan() { MAX_BLOCKAGE } else { b.clamp(0.0, MAX_BLOCKAGE) }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            BlockageModel::Constant(b) if !(0.0..=1.0).contains(&b) => {
                Err(format!("blockage fraction {b} must lie in [0, 1]"))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for BlockageModel {
    type Err = TurbineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "flat_plate_turbulent" => Ok(BlockageModel::FlatPlateTurbulent),
            "none" => Ok(BlockageModel::None),
            _ => match name.parse::<f64>() {
                Ok(b) if (0.0..=1.0).contains(&b) => Ok(BlockageModel::Constant(b)),
                _ => Err(TurbineError::UnknownModel {
                    kind: "blockage model",
                    name: s.to_string(),
                    expected: "flat_plate_turbulent, none, or a fraction in [0, 1]",
                }),
            },
        }
    }
}

/// Throat state at maximum mass flux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CriticalState {
    pub mass_flow: f64,
    pub ma_rel: f64,
    pub d: f64,
    pub w: f64,
    pub p: f64,
    /// Flow angle at the throat [deg]
    pub beta: f64,
    pub blockage: f64,
    /// p_crit / p0_rel_in
    pub pressure_ratio: f64,
    pub iterations: usize,
}

/// Fixed quantities of the critical search for one row.
#[derive(Debug, Clone, Copy)]
pub struct CriticalInput<'a> {
    pub row: &'a RowGeometry,
    /// Relative stagnation enthalpy at the throat radius
    pub h0_rel: f64,
    /// Relative stagnation pressure at the row inlet
    pub p0_rel_in: f64,
    /// Throat loss coefficient, frozen during the search
    pub loss: f64,
    pub blockage: BlockageModel,
}

/// Throat flow at a trial static pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroatPoint {
    pub mass_flow: f64,
    pub w: f64,
    pub d: f64,
    pub a: f64,
    pub blockage: f64,
}

const LOWER_PRESSURE_RATIO: f64 = 0.02;
const UPPER_PRESSURE_RATIO: f64 = 0.999;
const DERIVATIVE_STEP: f64 = 1e-5;

/// Throat mass flow at static pressure `p`.
pub fn throat_mass_flow(ctx: &FluidContext<'_>, input: &CriticalInput<'_>, p: f64) -> TurbineResult<ThroatPoint> {
    let row = input.row;
    let p0_rel = (input.p0_rel_in + input.loss * p) / (1.0 + input.loss);
    let s = ctx.ph(p0_rel, input.h0_rel)?.s;
    let st = ctx.ps(p, s)?;
    let w = (2.0 * (input.h0_rel - st.h)).max(0.0).sqrt();
    let d = st.rho.value;
    let re = d * w * row.chord / st.mu.value;
    let blockage = input.blockage.factor(re, row.chord, row.opening);
    Ok(ThroatPoint {
        mass_flow: d * w * cosd(row.metal_angle_te) * row.area_throat * (1.0 - blockage),
        w,
        d,
        a: st.a.value,
        blockage,
    })
}

fn mass_flow_slope(ctx: &FluidContext<'_>, input: &CriticalInput<'_>, p: f64) -> TurbineResult<f64> {
    let dp = DERIVATIVE_STEP * p;
    let hi = throat_mass_flow(ctx, input, p + dp)?.mass_flow;
    let lo = throat_mass_flow(ctx, input, p - dp)?.mass_flow;
    Ok((hi - lo) / (2.0 * dp))
}

/// Locate the critical throat state of one row.
///
/// Fails with [`ChokingError::NonConvergence`] when the slope has no sign change
/// on the search interval or Brent's method exhausts its budget.
pub fn critical_state(ctx: &FluidContext<'_>, input: &CriticalInput<'_>) -> TurbineResult<CriticalState> {
    let row_index = input.row.index;
    let p_lo = LOWER_PRESSURE_RATIO * input.p0_rel_in;
    let p_hi = UPPER_PRESSURE_RATIO * input.p0_rel_in;
    let config = ScalarConfig {
        max_iterations: 100,
        x_tol: 1e-10 * input.p0_rel_in,
        rel_tol: 1e-12,
        f_tol: 0.0,
    };

    let root = brent_root::<_, TurbineError>(
        "critical mass flux",
        |p| mass_flow_slope(ctx, input, p),
        p_lo,
        p_hi,
        &config,
    )
    .map_err(|e| match e {
        TurbineError::Solver(SolverError::NonConvergence { residual, iterations, .. }) => ChokingError::NonConvergence {
            row: row_index,
            iterations,
            residual: residual.first().copied().unwrap_or(f64::NAN).abs(),
        }
        .into(),
        TurbineError::Solver(SolverError::Bracket { fa, fb, .. }) => ChokingError::NonConvergence {
            row: row_index,
            iterations: 0,
            residual: fa.abs().min(fb.abs()),
        }
        .into(),
        other => other,
    })?;

    let throat = throat_mass_flow(ctx, input, root.x)?;
    debug!(
        row = row_index,
        p_crit = root.x,
        mass_flow = throat.mass_flow,
        iterations = root.iterations,
        "critical state"
    );
    Ok(CriticalState {
        mass_flow: throat.mass_flow,
        ma_rel: throat.w / throat.a,
        d: throat.d,
        w: throat.w,
        p: root.x,
        beta: input.row.metal_angle_te,
        blockage: throat.blockage,
        pressure_ratio: root.x / input.p0_rel_in,
        iterations: root.iterations,
    })
}
