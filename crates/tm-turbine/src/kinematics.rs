//! Velocity triangles. Angles in degrees, measured from the meridional direction.

use serde::Serialize;
use tm_core::numeric::{atand, cosd, sind};

/// Absolute and relative velocity components at one plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VelocityTriangle {
    /// Blade speed
    pub u: f64,
    pub v: f64,
    pub v_m: f64,
    pub v_t: f64,
    /// Absolute flow angle [deg]
    pub alpha: f64,
    pub w: f64,
    pub w_m: f64,
    pub w_t: f64,
    /// Relative flow angle [deg]
    pub beta: f64,
}

impl VelocityTriangle {
    /// Triangle from the absolute velocity, used at row inlets.
    pub fn from_absolute(u: f64, v: f64, alpha: f64) -> Self {
        let v_t = v * sind(alpha);
        let v_m = v * cosd(alpha);
        let w_t = v_t - u;
        let w_m = v_m;
        Self {
            u,
            v,
            v_m,
            v_t,
            alpha,
            w: w_m.hypot(w_t),
            w_m,
            w_t,
            beta: atand(w_t / w_m),
        }
    }

    /// Triangle from the relative velocity, used at throats and exits.
    pub fn from_relative(u: f64, w: f64, beta: f64) -> Self {
        let w_t = w * sind(beta);
        let w_m = w * cosd(beta);
        let v_t = w_t + u;
        let v_m = w_m;
        Self {
            u,
            v: v_m.hypot(v_t),
            v_m,
            v_t,
            alpha: atand(v_t / v_m),
            w,
            w_m,
            w_t,
            beta,
        }
    }
}
