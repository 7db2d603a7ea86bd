//! Flow state at the inlet, throat and exit planes of a row, and the
//! interspace that carries a row exit to the next row inlet.

use crate::error::TurbineResult;
use crate::geometry::RowGeometry;
use crate::kinematics::VelocityTriangle;
use crate::loss::{LossBreakdown, LossCoefficient, LossInput};
use crate::options::ModelOptions;
use serde::Serialize;
use std::fmt;
use tm_core::numeric::atand;
use tm_fluids::{FluidContext, FluidState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneLocation {
    Inlet,
    Throat,
    Exit,
}

impl fmt::Display for PlaneLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaneLocation::Inlet => f.write_str("inlet"),
            PlaneLocation::Throat => f.write_str("throat"),
            PlaneLocation::Exit => f.write_str("exit"),
        }
    }
}

/// Complete flow state at one plane. SI units, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaneState {
    pub row: usize,
    pub location: PlaneLocation,
    pub radius: f64,
    pub area: f64,
    #[serde(flatten)]
    pub velocity: VelocityTriangle,

    pub p: f64,
    pub t: f64,
    pub h: f64,
    pub s: f64,
    pub d: f64,
    pub a: f64,
    pub mu: f64,
    pub cp: f64,
    pub gamma: f64,
    pub z: f64,

    pub h0: f64,
    pub p0: f64,
    pub h0_rel: f64,
    pub p0_rel: f64,

    pub ma: f64,
    pub ma_rel: f64,
    /// Reynolds number on the relative velocity and the chord
    pub re: f64,
    pub mass_flow: f64,
    pub rothalpy: f64,
    pub blockage: f64,

    /// Model loss breakdown (throat and exit planes)
    pub loss: Option<LossBreakdown>,
    /// Model loss minus the loss recovered from the plane state
    pub loss_error: f64,
    /// True when any property of this plane came from the fail-soft surrogate
    pub fallback: bool,
}

/// Absolute stagnation enthalpy, entropy and velocity entering a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InletCondition {
    pub h0: f64,
    pub s: f64,
    /// Absolute flow angle [deg]
    pub alpha: f64,
    pub v: f64,
}

struct PlaneFrame<'r> {
    row: &'r RowGeometry,
    location: PlaneLocation,
    radius: f64,
    area: f64,
}

fn build(
    ctx: &FluidContext<'_>,
    frame: PlaneFrame<'_>,
    velocity: VelocityTriangle,
    st: &FluidState,
) -> TurbineResult<PlaneState> {
    let h = st.h;
    let s = st.s;
    let h0 = h + 0.5 * velocity.v * velocity.v;
    let h0_rel = h + 0.5 * velocity.w * velocity.w;
    let stagnation = ctx.hs(h0, s)?;
    let relative = ctx.hs(h0_rel, s)?;
    let d = st.rho.value;
    let a = st.a.value;
    let mu = st.mu.value;
    Ok(PlaneState {
        row: frame.row.index,
        location: frame.location,
        radius: frame.radius,
        area: frame.area,
        velocity,
        p: st.p.value,
        t: st.t.value,
        h,
        s,
        d,
        a,
        mu,
        cp: st.cp,
        gamma: st.gamma,
        z: st.z,
        h0,
        p0: stagnation.p.value,
        h0_rel,
        p0_rel: relative.p.value,
        ma: velocity.v / a,
        ma_rel: velocity.w / a,
        re: d * velocity.w * frame.row.chord / mu,
        mass_flow: d * velocity.v_m * frame.area,
        rothalpy: h0_rel - 0.5 * velocity.u * velocity.u,
        blockage: 0.0,
        loss: None,
        loss_error: 0.0,
        fallback: st.fallback || stagnation.fallback || relative.fallback,
    })
}

/// Inlet plane of `row` from the absolute inlet condition.
pub fn evaluate_inlet(
    ctx: &FluidContext<'_>,
    row: &RowGeometry,
    omega: f64,
    inlet: &InletCondition,
) -> TurbineResult<PlaneState> {
    let u = row.angular_speed(omega) * row.radius_mean_in;
    let velocity = VelocityTriangle::from_absolute(u, inlet.v, inlet.alpha);
    let st = ctx.hs(inlet.h0 - 0.5 * inlet.v * inlet.v, inlet.s)?;
    let frame = PlaneFrame {
        row,
        location: PlaneLocation::Inlet,
        radius: row.radius_mean_in,
        area: row.area_in,
    };
    build(ctx, frame, velocity, &st)
}

/// Throat or exit plane of `row` from the relative velocity, entropy and flow angle.
///
/// Rothalpy is carried from the inlet plane. Mass flow includes the blockage
/// of the configured model and the loss is evaluated against the inlet plane.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_blade_plane(
    ctx: &FluidContext<'_>,
    row: &RowGeometry,
    omega: f64,
    location: PlaneLocation,
    inlet: &PlaneState,
    w: f64,
    s: f64,
    beta: f64,
    options: &ModelOptions,
) -> TurbineResult<PlaneState> {
    let (radius, area) = match location {
        PlaneLocation::Throat => (row.radius_mean_throat, row.area_throat),
        _ => (row.radius_mean_out, row.area_out),
    };
    let u = row.angular_speed(omega) * radius;
    let velocity = VelocityTriangle::from_relative(u, w, beta);
    let h = inlet.rothalpy + 0.5 * u * u - 0.5 * w * w;
    let st = ctx.hs(h, s)?;
    let frame = PlaneFrame {
        row,
        location,
        radius,
        area,
    };
    let mut plane = build(ctx, frame, velocity, &st)?;

    plane.blockage = options.blockage_model.factor(plane.re, row.chord, row.opening);
    plane.mass_flow *= 1.0 - plane.blockage;

    let flow = LossInput {
        p0_rel_in: inlet.p0_rel,
        p0_rel_out: plane.p0_rel,
        p_in: inlet.p,
        p_out: plane.p,
        beta_in: inlet.velocity.beta,
        beta_out: plane.velocity.beta,
        ma_rel_in: inlet.ma_rel,
        ma_rel_out: plane.ma_rel,
        re_in: inlet.re,
        re_out: plane.re,
        gamma_out: plane.gamma,
    };
    let loss = options.loss_model.evaluate(row, &flow);
    let recovered = match options.loss_model.loss_coefficient {
        LossCoefficient::StagnationPressure => {
            (inlet.p0_rel - plane.p0_rel) / (plane.p0_rel - plane.p)
        }
        LossCoefficient::EnthalpyLoss => {
            let h_s = ctx.ps(plane.p, inlet.s)?.h;
            (plane.h - h_s) / (0.5 * w * w)
        }
    };
    plane.loss_error = loss.total - recovered;
    plane.loss = Some(loss);
    Ok(plane)
}

/// Carry a row exit to the inlet of the next row.
///
/// Stagnation enthalpy is conserved, tangential velocity follows the radius
/// change (free vortex), meridional velocity follows the area change, and the
/// density is held at its exit value.
pub fn interspace(
    ctx: &FluidContext<'_>,
    exit: &PlaneState,
    row: &RowGeometry,
    next: &RowGeometry,
) -> TurbineResult<InletCondition> {
    let v_t = exit.velocity.v_t * row.radius_mean_out / next.radius_mean_in;
    let v_m = exit.velocity.v_m * row.area_out / next.area_in;
    let v = v_m.hypot(v_t);
    let h = exit.h0 - 0.5 * v * v;
    let s = ctx.rho_h(exit.d, h)?.s;
    Ok(InletCondition {
        h0: exit.h0,
        s,
        alpha: atand(v_t / v_m),
        v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, GeometryInput, tests::stator_input};
    use crate::loss::LossModelConfig;
    use tm_fluids::Fluid;

    fn stage_input() -> GeometryInput {
        let mut input = stator_input();
        let double = |v: &Vec<f64>| vec![v[0], v[0]];
        input.cascade_type = vec![crate::geometry::CascadeType::Stator, crate::geometry::CascadeType::Rotor];
        input.radius_hub = vec![0.084; 4];
        input.radius_tip = vec![0.097, 0.097, 0.097, 0.099];
        input.pitch = double(&input.pitch);
        input.chord = double(&input.chord);
        input.stagger_angle = double(&input.stagger_angle);
        input.opening = double(&input.opening);
        input.diameter_le = double(&input.diameter_le);
        input.wedge_angle_le = double(&input.wedge_angle_le);
        input.metal_angle_le = vec![0.0, 30.0];
        input.metal_angle_te = vec![input.metal_angle_te[0], -input.metal_angle_te[0]];
        input.thickness_te = double(&input.thickness_te);
        input.tip_clearance = vec![0.0, 3e-4];
        input.thickness_max = double(&input.thickness_max);
        input
    }

    #[test]
    fn inlet_plane_is_consistent() {
        let fluid = Fluid::perfect_gas("air").unwrap();
        let ctx = fluid.context();
        let g = Geometry::from_input(&stator_input()).unwrap();
        let s_in = ctx.pt(1.082e5, 310.0).unwrap().s;
        let h0_in = ctx.pt(1.082e5, 310.0).unwrap().h;
        let inlet = InletCondition {
            h0: h0_in,
            s: s_in,
            alpha: 0.0,
            v: 50.0,
        };
        let plane = evaluate_inlet(&ctx, g.row(0), 2036.0, &inlet).unwrap();
        assert!((plane.h0 - h0_in).abs() < 1e-6);
        assert!((plane.p0 - 1.082e5).abs() < 1e-3);
        // Stators do not rotate
        assert_eq!(plane.velocity.u, 0.0);
        assert!((plane.rothalpy - h0_in).abs() < 1e-6);
        assert!((plane.mass_flow - plane.d * 50.0 * g.row(0).area_in).abs() < 1e-12);
        assert!(plane.loss.is_none());
    }

    #[test]
    fn rotor_plane_conserves_rothalpy() {
        let fluid = Fluid::perfect_gas("air").unwrap();
        let ctx = fluid.context();
        let g = Geometry::from_input(&stage_input()).unwrap();
        let reference = ctx.pt(1.082e5, 310.0).unwrap();
        let inlet = InletCondition {
            h0: reference.h,
            s: reference.s,
            alpha: 40.0,
            v: 120.0,
        };
        let options = ModelOptions::new(LossModelConfig::custom(0.1));
        let rotor = g.row(1);
        let plane_in = evaluate_inlet(&ctx, rotor, 2036.0, &inlet).unwrap();
        let exit = evaluate_blade_plane(
            &ctx,
            rotor,
            2036.0,
            PlaneLocation::Exit,
            &plane_in,
            150.0,
            reference.s + 5.0,
            -60.0,
            &options,
        )
        .unwrap();
        assert!(exit.velocity.u > plane_in.velocity.u);
        assert!((exit.rothalpy - plane_in.rothalpy).abs() < 1e-6);
        assert_eq!(exit.loss.map(|l| l.total), Some(0.1));
    }

    #[test]
    fn interspace_conserves_mass_and_stagnation_enthalpy() {
        let fluid = Fluid::perfect_gas("air").unwrap();
        let ctx = fluid.context();
        let g = Geometry::from_input(&stage_input()).unwrap();
        let reference = ctx.pt(1.082e5, 310.0).unwrap();
        let inlet = InletCondition {
            h0: reference.h,
            s: reference.s,
            alpha: 0.0,
            v: 40.0,
        };
        let options = ModelOptions::new(LossModelConfig::custom(0.0));
        let stator = g.row(0);
        let plane_in = evaluate_inlet(&ctx, stator, 0.0, &inlet).unwrap();
        let exit = evaluate_blade_plane(
            &ctx,
            stator,
            0.0,
            PlaneLocation::Exit,
            &plane_in,
            140.0,
            reference.s,
            65.0,
            &options,
        )
        .unwrap();
        let next = interspace(&ctx, &exit, stator, g.row(1)).unwrap();
        assert_eq!(next.h0, exit.h0);
        let rotor_in = evaluate_inlet(&ctx, g.row(1), 0.0, &next).unwrap();
        assert!((rotor_in.d - exit.d).abs() < 1e-9 * exit.d);
        let m_exit = exit.d * exit.velocity.v_m * stator.area_out;
        assert!((rotor_in.mass_flow - m_exit).abs() < 1e-9 * m_exit);
    }
}
