//! Resolved case documents and their validation.
//!
//! Expression evaluation happens before these documents are built; only plain
//! numbers, names and typed fluid-state bounds reach this layer.

use crate::error::{AppError, AppResult};
use crate::optimization::{CycleDesignProblem, OptimizationCase, TurbineDesignProblem};
use crate::performance_map::OperationTemplate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tm_cycle::{CycleError, CycleParameters};
use tm_fluids::{Fluid, FluidConfig};
use tm_turbine::{
    CascadeSeries, Geometry, GeometryInput, ModelOptions, OperationPoint, SolverOptions, TurbineError,
};

/// Everything needed to solve, sweep or optimize one cascade series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurbineCase {
    pub fluid: FluidConfig,
    pub geometry: GeometryInput,
    pub operation_point: OperationPoint,
    pub model_options: ModelOptions,
    #[serde(default)]
    pub solver_options: SolverOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_map: Option<OperationTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationCase>,
}

fn collect(errors: &mut Vec<String>, result: Result<(), TurbineError>) {
    match result {
        Ok(()) => {}
        Err(
            TurbineError::Geometry { errors: e }
            | TurbineError::InvalidOperationPoint { errors: e }
            | TurbineError::InvalidOptions { errors: e },
        ) => errors.extend(e),
        Err(e) => errors.push(e.to_string()),
    }
}

impl TurbineCase {
    /// Check every section and report all problems at once.
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        collect(&mut errors, self.geometry.validate());
        collect(&mut errors, self.operation_point.validate());
        collect(&mut errors, self.model_options.validate());
        if !self.operation_point.fluid_name.eq_ignore_ascii_case(&self.fluid.name) {
            errors.push(format!(
                "operation_point.fluid_name '{}' does not match fluid '{}'",
                self.operation_point.fluid_name, self.fluid.name
            ));
        }
        if self.solver_options.tolerance <= 0.0 || !self.solver_options.tolerance.is_finite() {
            errors.push(format!(
                "solver_options.tolerance = {} must be positive",
                self.solver_options.tolerance
            ));
        }
        if self.solver_options.max_iterations == 0 {
            errors.push("solver_options.max_iterations must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ConfigValidation { errors })
        }
    }

    pub fn fluid(&self) -> AppResult<Fluid> {
        Ok(Fluid::from_config(&self.fluid)?)
    }

    pub fn series<'f>(&self, fluid: &'f Fluid) -> AppResult<CascadeSeries<'f>> {
        let geometry = Geometry::from_input(&self.geometry)?;
        Ok(CascadeSeries::new(
            fluid,
            geometry,
            self.model_options.clone(),
            self.solver_options.clone(),
        )?)
    }

    /// Sweep template, falling back to the single operation point.
    pub fn map_template(&self) -> OperationTemplate {
        self.performance_map
            .clone()
            .unwrap_or_else(|| OperationTemplate::from(&self.operation_point))
    }

    pub fn design_problem<'f>(&self, fluid: &'f Fluid) -> TurbineDesignProblem<'f> {
        TurbineDesignProblem::new(
            fluid,
            self.geometry.clone(),
            self.operation_point.clone(),
            self.model_options.clone(),
            self.solver_options.clone(),
        )
    }
}

/// A cycle with an optional optimization over its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleCase {
    pub cycle: CycleParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationCase>,
}

impl CycleCase {
    pub fn validate(&self) -> AppResult<()> {
        match self.cycle.validate() {
            Ok(()) => Ok(()),
            Err(CycleError::InvalidParameters { errors }) => Err(AppError::ConfigValidation { errors }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn design_problem(&self) -> CycleDesignProblem {
        CycleDesignProblem::new(self.cycle.clone())
    }
}

/// Case documents that can check themselves after parsing.
pub trait Validate {
    fn validate(&self) -> AppResult<()>;
}

impl Validate for TurbineCase {
    fn validate(&self) -> AppResult<()> {
        TurbineCase::validate(self)
    }
}

impl Validate for CycleCase {
    fn validate(&self) -> AppResult<()> {
        CycleCase::validate(self)
    }
}

/// Parse and validate a case document.
pub fn from_json<T: DeserializeOwned + Validate>(text: &str) -> AppResult<T> {
    let case: T = serde_json::from_str(text)?;
    case.validate()?;
    Ok(case)
}

pub fn load_json<T: DeserializeOwned + Validate>(path: &Path) -> AppResult<T> {
    let content = std::fs::read_to_string(path)?;
    from_json(&content)
}

pub fn save_json<T: Serialize + Validate>(path: &Path, case: &T) -> AppResult<()> {
    case.validate()?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE: &str = r#"{
        "cycle": {
            "topology": "recuperated",
            "working_fluid": {"name": "air"},
            "net_power": 1.0e6,
            "p_high": 4.0e5, "t_high": 1100.0,
            "p_low": 1.0e5, "t_low": 300.0,
            "compressor": {"efficiency": 0.85},
            "turbine": {"efficiency": 0.9, "efficiency_type": "polytropic"},
            "recuperator": {"effectiveness": 0.8, "dp_hot": 0.01, "dp_cold": 0.01},
            "heater": {"dp": 0.01},
            "cooler": {"dp": 0.01}
        },
        "optimization": {
            "objective": "cycle_efficiency",
            "direction": "maximize",
            "variables": [
                {"name": "p_high", "lower": 2.0e5, "upper": 8.0e5, "initial": 4.0e5}
            ],
            "constraints": [
                {"output": "pinch_recuperator", "comparison": ">", "value": 10.0}
            ]
        }
    }"#;

    #[test]
    fn cycle_case_parses() {
        let case: CycleCase = from_json(CYCLE).unwrap();
        let opt = case.optimization.unwrap();
        assert_eq!(opt.variables.len(), 1);
        assert_eq!(opt.constraints[0].normalize, 1.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = CYCLE.replace("\"net_power\"", "\"net_powr\"");
        let err = from_json::<CycleCase>(&text).unwrap_err();
        assert!(matches!(err, AppError::ConfigValidation { .. }));
        assert!(err.to_string().contains("net_powr"), "{err}");
    }

    #[test]
    fn cycle_validation_errors_are_collected() {
        let text = CYCLE.replace("\"efficiency\": 0.85", "\"efficiency\": 1.5");
        let text = text.replace("\"effectiveness\": 0.8", "\"effectiveness\": 1.2");
        match from_json::<CycleCase>(&text) {
            Err(AppError::ConfigValidation { errors }) => assert!(errors.len() >= 2, "{errors:?}"),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
