//! Boundary conditions of one turbine solve.

use crate::error::{TurbineError, TurbineResult};
use serde::{Deserialize, Serialize};

/// Inlet stagnation state, exit static pressure and shaft speed.
///
/// Angles in degrees, pressures in Pa, temperatures in K, speeds in rad/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationPoint {
    pub fluid_name: String,
    pub p0_in: f64,
    #[serde(rename = "T0_in")]
    pub t0_in: f64,
    pub p_out: f64,
    pub alpha_in: f64,
    pub omega: f64,
}

impl OperationPoint {
    /// Total-to-static pressure ratio imposed on the series.
    pub fn pressure_ratio(&self) -> f64 {
        self.p0_in / self.p_out
    }

    /// Collect every violated bound rather than stopping at the first.
    pub fn validate(&self) -> TurbineResult<()> {
        let mut errors = Vec::new();
        if self.fluid_name.trim().is_empty() {
            errors.push("fluid_name must not be empty".to_string());
        }
        for (name, v) in [
            ("p0_in", self.p0_in),
            ("T0_in", self.t0_in),
            ("p_out", self.p_out),
        ] {
            if !(v.is_finite() && v > 0.0) {
                errors.push(format!("{name} = {v} must be positive and finite"));
            }
        }
        if self.p_out.is_finite() && self.p0_in.is_finite() && self.p_out >= self.p0_in {
            errors.push(format!(
                "p_out = {} must be lower than p0_in = {}",
                self.p_out, self.p0_in
            ));
        }
        if !(self.alpha_in.is_finite() && self.alpha_in.abs() < 90.0) {
            errors.push(format!("alpha_in = {} must lie in (-90, 90) deg", self.alpha_in));
        }
        if !self.omega.is_finite() {
            errors.push(format!("omega = {} must be finite", self.omega));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TurbineError::InvalidOperationPoint { errors })
        }
    }

    /// Distance between two points for warm-start selection.
    ///
    /// 2-norm of the relative deviation of every numeric field; `alpha_in` is
    /// scaled by 90 deg instead. Points with different fluids are infinitely far apart.
    pub fn distance_to(&self, other: &OperationPoint) -> f64 {
        if !self.fluid_name.eq_ignore_ascii_case(&other.fluid_name) {
            return f64::INFINITY;
        }
        let rel = |a: f64, b: f64| (a - b).abs() / a.abs().max(b.abs()).max(1e-8);
        [
            rel(self.p0_in, other.p0_in),
            rel(self.t0_in, other.t0_in),
            rel(self.p_out, other.p_out),
            (self.alpha_in - other.alpha_in).abs() / 90.0,
            rel(self.omega, other.omega),
        ]
        .iter()
        .map(|d| d * d)
        .sum::<f64>()
        .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> OperationPoint {
        OperationPoint {
            fluid_name: "air".into(),
            p0_in: 10.82e4,
            t0_in: 310.0,
            p_out: 10.82e4 / 1.2,
            alpha_in: 0.0,
            omega: 2036.0,
        }
    }

    #[test]
    fn field_names_are_exact() {
        let json = r#"{"fluid_name": "air", "p0_in": 1e5, "T0_in": 300, "p_out": 8e4, "alpha_in": 0, "omega": 0}"#;
        let op: OperationPoint = serde_json::from_str(json).unwrap();
        assert_eq!(op.t0_in, 300.0);
        op.validate().unwrap();

        let extra = r#"{"fluid_name": "air", "p0_in": 1e5, "T0_in": 300, "p_out": 8e4, "alpha_in": 0, "omega": 0, "mass_flow": 1}"#;
        assert!(serde_json::from_str::<OperationPoint>(extra).is_err());
        let missing = r#"{"fluid_name": "air", "p0_in": 1e5, "T0_in": 300, "p_out": 8e4, "alpha_in": 0}"#;
        assert!(serde_json::from_str::<OperationPoint>(missing).is_err());
    }

    #[test]
    fn validation_collects_errors() {
        let op = OperationPoint {
            p0_in: -1.0,
            t0_in: f64::NAN,
            alpha_in: 95.0,
            ..scenario()
        };
        match op.validate() {
            Err(TurbineError::InvalidOperationPoint { errors }) => assert_eq!(errors.len(), 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reversed_pressure_ratio_is_rejected() {
        let op = OperationPoint {
            p_out: 2e5,
            ..scenario()
        };
        assert!(op.validate().is_err());
    }

    #[test]
    fn distance_is_zero_to_self() {
        let a = scenario();
        assert_eq!(a.distance_to(&a), 0.0);
        let b = OperationPoint {
            p_out: a.p_out * 0.9,
            ..a.clone()
        };
        assert!((a.distance_to(&b) - 0.1).abs() < 1e-12);
        let c = OperationPoint {
            fluid_name: "co2".into(),
            ..a.clone()
        };
        assert!(a.distance_to(&c).is_infinite());
    }
}
