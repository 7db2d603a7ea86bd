//! Model and solver options of a cascade series.

use crate::choking::BlockageModel;
use crate::deviation::DeviationModel;
use crate::error::{TurbineError, TurbineResult};
use crate::loss::LossModelConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closure equation that decides where each row chokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChokingCondition {
    /// Exit angle from the deviation model below the critical pressure, from
    /// the critical mass flow at or above it
    #[default]
    Deviation,
    /// Throat Mach number limited by the critical Mach number
    MachCritical,
    /// Throat Mach number limited by one
    MachUnity,
}

impl FromStr for ChokingCondition {
    type Err = TurbineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deviation" => Ok(ChokingCondition::Deviation),
            "mach_critical" => Ok(ChokingCondition::MachCritical),
            "mach_unity" => Ok(ChokingCondition::MachUnity),
            _ => Err(TurbineError::UnknownModel {
                kind: "choking condition",
                name: s.to_string(),
                expected: "deviation, mach_critical, mach_unity",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOptions {
    #[serde(default)]
    pub choking_condition: ChokingCondition,
    #[serde(default)]
    pub deviation_model: DeviationModel,
    #[serde(default)]
    pub blockage_model: BlockageModel,
    pub loss_model: LossModelConfig,
}

impl ModelOptions {
    pub fn new(loss_model: LossModelConfig) -> Self {
        Self {
            choking_condition: ChokingCondition::default(),
            deviation_model: DeviationModel::default(),
            blockage_model: BlockageModel::default(),
            loss_model,
        }
    }

    pub fn validate(&self) -> TurbineResult<()> {
        self.loss_model.validate()?;
        self.blockage_model
            .validate()
            .map_err(|e| TurbineError::InvalidOptions { errors: vec![e] })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    #[default]
    Newton,
    LevenbergMarquardt,
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverMethod::Newton => f.write_str("newton"),
            SolverMethod::LevenbergMarquardt => f.write_str("levenberg_marquardt"),
        }
    }
}

/// Settings of the nonlinear solve of the residual system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    pub method: SolverMethod,
    /// Tolerance on the 2-norm of the normalised residual vector
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Relative step of the finite-difference Jacobian
    pub derivative_rel_step: f64,
    /// Try Levenberg-Marquardt and alternative initial guesses after a failure
    pub fallback: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: SolverMethod::Newton,
            tolerance: 1e-8,
            max_iterations: 100,
            derivative_rel_step: 1e-6,
            fallback: true,
        }
    }
}
