//! Kacker-Okapuu loss correlations with the Benner et al. penetration-depth correction.
//!
//! The profile, trailing-edge and incidence terms are scaled by (1 − Z_TE), where
//! Z_TE is the spanwise penetration depth of the passage vortex separation line.
//! The secondary and clearance terms are left unscaled.

use super::{LossBreakdown, LossInput, LossTuning};
use crate::geometry::{CascadeType, RowGeometry};
use tm_core::numeric::{SmoothMethod, atand, cosd, interp1, smooth_min, tand};

/// Loss breakdown for one plane. `flow` must already carry floored Mach and Reynolds numbers.
pub fn losses(
    row: &RowGeometry,
    flow: &LossInput,
    displacement_ratio: f64,
    tuning: &LossTuning,
) -> LossBreakdown {
    let delta_height = displacement_ratio * (flow.re_in / 3e5).powf(-1.0 / 7.0);

    let profile = profile_loss(row, flow);
    let trailing = trailing_edge_loss(row, flow);
    let secondary = secondary_loss(row, flow, delta_height);
    let clearance = clearance_loss(row, flow);
    let incidence = incidence_loss(row, flow);
    let z_te = penetration_depth(row, flow, delta_height);

    LossBreakdown::from_terms(
        profile * (1.0 - z_te),
        incidence * (1.0 - z_te),
        secondary,
        trailing * (1.0 - z_te),
        clearance,
        tuning,
    )
}

fn reynolds_correction(re: f64) -> f64 {
    if re < 2e5 {
        (re / 2e5).powf(-0.4)
    } else if re <= 1e6 {
        1.0
    } else {
        (re / 1e6).powf(-0.2)
    }
}

/// Hub-to-mean Mach number ratio for the shock loss term.
fn hub_to_mean_mach_ratio(r_ht: f64, cascade_type: CascadeType) -> f64 {
    const R_HT: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
    const STATOR: [f64; 6] = [1.4, 1.18, 1.05, 1.0, 1.0, 1.0];
    const ROTOR: [f64; 6] = [2.15, 1.7, 1.35, 1.12, 1.0, 1.0];
    let table = match cascade_type {
        CascadeType::Stator => &STATOR,
        CascadeType::Rotor => &ROTOR,
    };
    interp1(r_ht.max(0.5), &R_HT, table)
}

/// Compressibility factor Kp.
pub(crate) fn compressibility_factor(ma_in: f64, ma_out: f64) -> f64 {
    let k1 = if ma_out < 0.2 {
        1.0
    } else if ma_out < 1.0 {
        1.0 - 1.25 * (ma_out - 0.2)
    } else {
        0.0
    };
    let k2 = (ma_in / ma_out).powi(2);
    (1.0 - k2 * (1.0 - k1)).max(0.1)
}

/// Ainley-Mathieson profile loss for nozzle (reaction) blades with zero inlet angle.
pub(crate) fn nozzle_blades(pitch_chord: f64, angle_out: f64) -> f64 {
    let phi = 90.0 - angle_out;
    let r_min = if phi < 30.0 { 0.46 + phi / 77.0 } else { 0.614 + phi / 130.0 };
    let x = pitch_chord - r_min;
    let a = if phi < 27.0 {
        0.025 + (27.0 - phi) / 530.0
    } else {
        0.025 + (27.0 - phi) / 3085.0
    };
    let b = 0.1583 - phi / 1640.0;
    let c = 0.08 * ((phi / 30.0).powi(2) - 1.0);
    let n = 1.0 + phi / 30.0;
    if phi < 30.0 {
        a + b * x * x + c * x.powi(3)
    } else {
        a + b * x.abs().powf(n)
    }
}

/// Ainley-Mathieson profile loss for impulse blades.
pub(crate) fn impulse_blades(pitch_chord: f64, angle_out: f64) -> f64 {
    let phi = 90.0 - angle_out;
    let r_min = 0.224 + 1.575 * (phi / 90.0) - (phi / 90.0).powi(2);
    let x = pitch_chord - r_min;
    let a = 0.242 - phi / 151.0 + (phi / 127.0).powi(2);
    let b = if phi < 30.0 {
        0.3 + (30.0 - phi) / 50.0
    } else {
        0.3 + (30.0 - phi) / 275.0
    };
    let c = 0.88 - phi / 42.4 + (phi / 72.8).powi(2);
    a + b * x * x - c * x.powi(3)
}

fn profile_loss(row: &RowGeometry, flow: &LossInput) -> f64 {
    let f_re = reynolds_correction(flow.re_out);
    let f_ma = if flow.ma_rel_out > 1.0 {
        1.0 + 60.0 * (flow.ma_rel_out - 1.0).powi(2)
    } else {
        1.0
    };

    let r_ht = row.hub_tip_ratio_in;
    let f_hub = hub_to_mean_mach_ratio(r_ht, row.cascade_type);
    let a = (f_hub * flow.ma_rel_in - 0.4).max(0.0);
    let y_shock = (0.75 * a.powf(1.75) * r_ht * (flow.p0_rel_in - flow.p_in)
        / (flow.p0_rel_out - flow.p_out))
        .max(0.0);

    let kp = compressibility_factor(flow.ma_rel_in, flow.ma_rel_out);

    let angle_out = flow.beta_out.abs().max(40.0);
    let yp_reaction = nozzle_blades(row.pitch_to_chord, angle_out);
    let yp_impulse = impulse_blades(row.pitch_to_chord, angle_out);

    let ratio = row.metal_angle_le / flow.beta_out;
    let mut yp = yp_reaction - ratio.abs() * ratio * (yp_impulse - yp_reaction);
    yp = yp.max(0.8 * yp_reaction);
    let exponent = (-ratio).max(0.0);
    yp *= (row.thickness_max_to_chord / 0.2).powf(exponent);
    yp = 0.914 * (2.0 / 3.0 * yp * kp + y_shock);
    f_re * f_ma * yp
}

fn trailing_edge_loss(row: &RowGeometry, flow: &LossInput) -> f64 {
    const R_TO: [f64; 3] = [0.0, 0.2, 0.4];
    const REACTION: [f64; 3] = [0.0, 0.045, 0.15];
    const IMPULSE: [f64; 3] = [0.0, 0.025, 0.075];

    let r_to = row.thickness_te_to_opening.min(0.4);
    let d_reaction = interp1(r_to, &R_TO, &REACTION);
    let d_impulse = interp1(r_to, &R_TO, &IMPULSE);
    let ratio = row.metal_angle_le / flow.beta_out;
    let d_phi2 = (d_reaction - ratio.abs() * ratio * (d_impulse - d_reaction)).max(d_impulse / 2.0);
    1.0 / (1.0 - d_phi2) - 1.0
}

fn secondary_loss(row: &RowGeometry, flow: &LossInput, delta_height: f64) -> f64 {
    let aspect = row.height / row.chord;
    let convergence = cosd(flow.beta_in) / cosd(flow.beta_out);
    let stagger = row.stagger_angle;
    let turning = (cosd(flow.beta_out) / cosd(stagger)).powf(0.55);
    if aspect <= 2.0 {
        let denom = cosd(stagger).sqrt() * convergence * aspect.powf(0.55) * turning;
        (0.038 + 0.41 * (1.2 * delta_height).tanh()) / denom
    } else {
        let denom = cosd(stagger).sqrt() * convergence * aspect * turning;
        (0.052 + 0.56 * (1.2 * delta_height).tanh()) / denom
    }
}

fn clearance_loss(row: &RowGeometry, flow: &LossInput) -> f64 {
    let b = match row.cascade_type {
        CascadeType::Stator => 0.0,
        CascadeType::Rotor => 0.37,
    };
    let (ti, to) = (tand(flow.beta_in), tand(flow.beta_out));
    let angle_m = atand(0.5 * (ti + to));
    let z = 4.0 * (ti - to).powi(2) * cosd(flow.beta_out).powi(2) / cosd(angle_m);
    b * z * row.chord / row.height * (row.tip_clearance / row.height).powf(0.78)
}

/// Incidence parameter χ of Benner et al.
pub(crate) fn incidence_parameter(row: &RowGeometry, beta_in: f64) -> f64 {
    let beta_design = row.metal_angle_le;
    (row.diameter_le / row.pitch).powf(-0.05)
        * row.wedge_angle_le.powf(-0.2)
        * (cosd(row.metal_angle_le) / cosd(row.metal_angle_te)).powf(-1.4)
        * (beta_in.abs() - beta_design.abs())
}

/// Profile kinetic-energy loss increment as a function of χ, limited smoothly at 0.5.
pub(crate) fn incidence_increment(chi: f64) -> f64 {
    const POSITIVE: [f64; 8] = [
        -6.149e-5, 1.327e-3, -2.506e-4, -1.542e-4, 9.017e-5, 1.106e-5, -5.318e-6, 3.711e-7,
    ];
    const NEGATIVE: [f64; 2] = [-8.72e-4, 1.358e-4];
    const CHI_EXTRAPOLATION: f64 = 5.0;

    let poly = |c: &[f64], x: f64| -> f64 {
        c.iter().enumerate().map(|(i, a)| a * x.powi(i as i32 + 1)).sum()
    };
    let increment = if chi > CHI_EXTRAPOLATION {
        let slope: f64 = POSITIVE
            .iter()
            .enumerate()
            .map(|(i, a)| (i as f64 + 1.0) * a * CHI_EXTRAPOLATION.powi(i as i32))
            .sum();
        poly(&POSITIVE, CHI_EXTRAPOLATION) + slope * (chi - CHI_EXTRAPOLATION)
    } else if chi >= 0.0 {
        poly(&POSITIVE, chi)
    } else {
        poly(&NEGATIVE, chi)
    };
    smooth_min(&[increment, 0.5], SmoothMethod::LogSumExp, 25.0)
}

/// Convert a kinetic-energy loss coefficient to a stagnation pressure loss coefficient.
pub(crate) fn kinetic_to_pressure_loss(d_phi: f64, gamma: f64, ma: f64) -> f64 {
    let e = -gamma / (gamma - 1.0);
    let k = 0.5 * (gamma - 1.0) * ma * ma;
    let denom = 1.0 - (1.0 + k).powf(e);
    let numer = (1.0 - k * (1.0 / (1.0 - d_phi) - 1.0)).powf(e) - 1.0;
    numer / denom
}

fn incidence_loss(row: &RowGeometry, flow: &LossInput) -> f64 {
    let chi = incidence_parameter(row, flow.beta_in);
    kinetic_to_pressure_loss(incidence_increment(chi), flow.gamma_out, flow.ma_rel_out)
}

fn penetration_depth(row: &RowGeometry, flow: &LossInput, delta_height: f64) -> f64 {
    let convergence = cosd(flow.beta_in) / cosd(flow.beta_out);
    let solidity = row.axial_chord / row.pitch;
    let aspect = row.height / row.chord;
    let (ti, to) = (tand(flow.beta_in), tand(flow.beta_out));
    let angle_m = atand(0.5 * (ti + to));
    let f_t = 2.0 / solidity * cosd(angle_m).powi(2) * (ti.abs() + to.abs());
    let z_te = 0.10 * f_t.powf(0.79) / convergence.sqrt() / aspect.powf(0.55) + 32.7 * delta_height * delta_height;
    z_te.min(0.99)
}
