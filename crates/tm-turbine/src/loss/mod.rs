//! Loss model selection, tuning and the loss coefficient definitions.

pub mod benner;

use crate::error::{TurbineError, TurbineResult};
use crate::geometry::RowGeometry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Available loss correlations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossModel {
    /// Kacker-Okapuu profile losses with the Benner penetration-depth correction
    Benner,
    /// Constant profile loss given by `custom_value`
    Custom,
}

impl FromStr for LossModel {
    type Err = TurbineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benner" => Ok(LossModel::Benner),
            "custom" => Ok(LossModel::Custom),
            _ => Err(TurbineError::UnknownModel {
                kind: "loss model",
                name: s.to_string(),
                expected: "benner, custom",
            }),
        }
    }
}

/// How the loss coefficient closure is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCoefficient {
    /// Y = (p0_rel_in − p0_rel_out) / (p0_rel_out − p_out)
    #[default]
    StagnationPressure,
    /// ζ = (h − h_s) / (½w²)
    EnthalpyLoss,
}

impl FromStr for LossCoefficient {
    type Err = TurbineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stagnation_pressure" => Ok(LossCoefficient::StagnationPressure),
            "enthalpy_loss" => Ok(LossCoefficient::EnthalpyLoss),
            _ => Err(TurbineError::UnknownModel {
                kind: "loss coefficient",
                name: s.to_string(),
                expected: "stagnation_pressure, enthalpy_loss",
            }),
        }
    }
}

/// Multipliers applied to the individual loss terms before the total is formed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LossTuning {
    pub profile: f64,
    pub incidence: f64,
    pub secondary: f64,
    pub trailing: f64,
    pub clearance: f64,
}

impl Default for LossTuning {
    fn default() -> Self {
        Self {
            profile: 1.0,
            incidence: 1.0,
            secondary: 1.0,
            trailing: 1.0,
            clearance: 1.0,
        }
    }
}

/// Loss coefficient split by mechanism. `total` is the sum of the five terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LossBreakdown {
    pub profile: f64,
    pub incidence: f64,
    pub secondary: f64,
    pub trailing: f64,
    pub clearance: f64,
    pub total: f64,
}

impl LossBreakdown {
    /// Build from raw terms, applying tuning and clipping at zero.
    pub fn from_terms(
        profile: f64,
        incidence: f64,
        secondary: f64,
        trailing: f64,
        clearance: f64,
        tuning: &LossTuning,
    ) -> Self {
        let profile = (profile * tuning.profile).max(0.0);
        let incidence = (incidence * tuning.incidence).max(0.0);
        let secondary = (secondary * tuning.secondary).max(0.0);
        let trailing = (trailing * tuning.trailing).max(0.0);
        let clearance = (clearance * tuning.clearance).max(0.0);
        Self {
            profile,
            incidence,
            secondary,
            trailing,
            clearance,
            total: profile + incidence + secondary + trailing + clearance,
        }
    }

    /// (name, value) pairs of the five mechanisms, in a fixed order.
    pub fn terms(&self) -> [(&'static str, f64); 5] {
        [
            ("profile", self.profile),
            ("incidence", self.incidence),
            ("secondary", self.secondary),
            ("trailing", self.trailing),
            ("clearance", self.clearance),
        ]
    }
}

/// Flow quantities the correlations need, taken from the row inlet and the evaluated plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossInput {
    pub p0_rel_in: f64,
    pub p0_rel_out: f64,
    pub p_in: f64,
    pub p_out: f64,
    /// Inlet relative flow angle [deg]
    pub beta_in: f64,
    /// Exit relative flow angle [deg]
    pub beta_out: f64,
    pub ma_rel_in: f64,
    pub ma_rel_out: f64,
    pub re_in: f64,
    pub re_out: f64,
    pub gamma_out: f64,
}

impl LossInput {
    /// Floor applied to Mach and Reynolds numbers before they reach the correlations.
    pub const FLOOR: f64 = 1e-3;

    pub(crate) fn floored(mut self) -> Self {
        self.ma_rel_in = self.ma_rel_in.max(Self::FLOOR);
        self.ma_rel_out = self.ma_rel_out.max(Self::FLOOR);
        self.re_in = self.re_in.max(Self::FLOOR);
        self.re_out = self.re_out.max(Self::FLOOR);
        self
    }
}

fn default_displacement_ratio() -> f64 {
    0.011
}

/// Loss model configuration for every row of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossModelConfig {
    pub model: LossModel,
    /// Profile (and total) loss for `LossModel::Custom`
    #[serde(default)]
    pub custom_value: f64,
    #[serde(default)]
    pub loss_coefficient: LossCoefficient,
    #[serde(default)]
    pub tuning: LossTuning,
    /// Inlet boundary-layer displacement thickness over blade height at Re = 3e5
    #[serde(default = "default_displacement_ratio")]
    pub inlet_displacement_thickness_height_ratio: f64,
}

impl LossModelConfig {
    pub fn benner() -> Self {
        Self {
            model: LossModel::Benner,
            custom_value: 0.0,
            loss_coefficient: LossCoefficient::default(),
            tuning: LossTuning::default(),
            inlet_displacement_thickness_height_ratio: default_displacement_ratio(),
        }
    }

    pub fn custom(value: f64) -> Self {
        Self {
            model: LossModel::Custom,
            custom_value: value,
            ..Self::benner()
        }
    }

    pub fn validate(&self) -> TurbineResult<()> {
        let mut errors = Vec::new();
        if self.model == LossModel::Custom && !(self.custom_value.is_finite() && self.custom_value >= 0.0) {
            errors.push(format!("custom_value = {} must be finite and non-negative", self.custom_value));
        }
        for (name, v) in [
            ("tuning.profile", self.tuning.profile),
            ("tuning.incidence", self.tuning.incidence),
            ("tuning.secondary", self.tuning.secondary),
            ("tuning.trailing", self.tuning.trailing),
            ("tuning.clearance", self.tuning.clearance),
            (
                "inlet_displacement_thickness_height_ratio",
                self.inlet_displacement_thickness_height_ratio,
            ),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                errors.push(format!("{name} = {v} must be finite and non-negative"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TurbineError::InvalidOptions { errors })
        }
    }

    /// Loss breakdown for one plane of `row`.
    pub fn evaluate(&self, row: &RowGeometry, flow: &LossInput) -> LossBreakdown {
        match self.model {
            LossModel::Custom => LossBreakdown {
                profile: self.custom_value,
                total: self.custom_value,
                ..LossBreakdown::default()
            },
            LossModel::Benner => benner::losses(
                row,
                &flow.floored(),
                self.inlet_displacement_thickness_height_ratio,
                &self.tuning,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, tests::stator_input};
    use proptest::prelude::*;

    fn flow(beta_out: f64) -> LossInput {
        LossInput {
            p0_rel_in: 1.082e5,
            p0_rel_out: 1.07e5,
            p_in: 1.07e5,
            p_out: 0.9e5,
            beta_in: 0.0,
            beta_out,
            ma_rel_in: 0.15,
            ma_rel_out: 0.5,
            re_in: 1e5,
            re_out: 4e5,
            gamma_out: 1.4,
        }
    }

    #[test]
    fn unknown_names_fail() {
        assert!(matches!(
            "kacker_okapuu".parse::<LossModel>(),
            Err(TurbineError::UnknownModel { kind: "loss model", .. })
        ));
        assert_eq!("Benner".parse::<LossModel>().unwrap(), LossModel::Benner);
        assert!("enthalpy".parse::<LossCoefficient>().is_err());
    }

    #[test]
    fn tuning_scales_one_mechanism() {
        let g = Geometry::from_input(&stator_input()).unwrap();
        let config = LossModelConfig::benner();
        let base = config.evaluate(g.row(0), &flow(66.0));
        let doubled = LossModelConfig {
            tuning: LossTuning {
                secondary: 2.0,
                ..LossTuning::default()
            },
            ..config
        }
        .evaluate(g.row(0), &flow(66.0));
        assert!((doubled.secondary - 2.0 * base.secondary).abs() < 1e-12);
        assert!((doubled.profile - base.profile).abs() < 1e-12);
    }

    #[test]
    fn config_defaults_from_json() {
        let c: LossModelConfig = serde_json::from_str(r#"{"model": "benner"}"#).unwrap();
        assert_eq!(c.inlet_displacement_thickness_height_ratio, 0.011);
        assert_eq!(c.loss_coefficient, LossCoefficient::StagnationPressure);
        assert!(serde_json::from_str::<LossModelConfig>(r#"{"model": "benner", "extra": 1}"#).is_err());
    }

    proptest! {
        #[test]
        fn custom_value_is_exact(
            c in 0.0f64..2.0,
            chord in 5e-3f64..0.1,
            pitch_ratio in 0.3f64..1.1,
            beta_out in -80.0f64..80.0,
        ) {
            let mut input = stator_input();
            input.chord = vec![chord];
            input.pitch = vec![chord * pitch_ratio];
            input.opening = vec![0.3 * chord * pitch_ratio];
            let g = Geometry::from_input(&input).unwrap();
            let loss = LossModelConfig::custom(c).evaluate(g.row(0), &flow(beta_out));
            prop_assert_eq!(loss.profile, c);
            prop_assert_eq!(loss.total, c);
            prop_assert_eq!(loss.secondary + loss.incidence + loss.trailing + loss.clearance, 0.0);
        }
    }
}
