//! Design optimization on top of the turbine and cycle solvers.
//!
//! Variables are normalized to `[0, 1]` between their resolved bounds and
//! handed to the augmented Lagrangian optimizer of `tm-solver`. Every optimizer
//! evaluation runs the underlying solver once.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tm_cycle::{Cycle, CycleParameters};
use tm_fluids::{Fluid, ReferenceStates};
use tm_solver::{Evaluation, OptimizeConfig, minimize_augmented_lagrangian};
use tm_turbine::{CascadeSeries, Geometry, GeometryInput, ModelOptions, OperationPoint, SolverOptions};
use tracing::{debug, info, warn};

/// Named values passed to and returned from a design problem.
pub type Values = BTreeMap<String, f64>;

/// A model the optimizer can drive.
pub trait DesignProblem {
    /// Run the model at `values` and return every scalar output by name.
    fn evaluate(&mut self, values: &Values) -> AppResult<Values>;

    /// Fluid fixed points used to resolve [`Bound::Reference`].
    fn reference_states(&self) -> AppResult<Option<ReferenceStates>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceQuantity {
    CriticalTemperature,
    CriticalPressure,
    TriplePointTemperature,
    TriplePointPressure,
}

/// A variable bound, either literal or a multiple of a fluid fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Value(f64),
    Reference { quantity: ReferenceQuantity, factor: f64 },
}

impl Bound {
    pub fn resolve(&self, states: Option<&ReferenceStates>) -> Result<f64, String> {
        match *self {
            Bound::Value(v) => Ok(v),
            Bound::Reference { quantity, factor } => {
                let states = states.ok_or_else(|| {
                    format!("bound references {quantity:?} but the problem has no reference fluid")
                })?;
                let base = match quantity {
                    ReferenceQuantity::CriticalTemperature => states.critical.t,
                    ReferenceQuantity::CriticalPressure => states.critical.p,
                    ReferenceQuantity::TriplePointTemperature => states.triple.t,
                    ReferenceQuantity::TriplePointPressure => states.triple.p,
                };
                Ok(factor * base)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesignVariable {
    pub name: String,
    pub lower: Bound,
    pub upper: Bound,
    pub initial: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "=")]
    Equal,
}

fn default_normalize() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraint {
    pub output: String,
    pub comparison: Comparison,
    pub value: f64,
    /// Divides the constraint residual so different outputs share one scale
    #[serde(default = "default_normalize")]
    pub normalize: f64,
}

impl Constraint {
    /// Normalized residual: `<= 0` when satisfied for inequalities, `0` for equalities.
    fn residual(&self, output: f64) -> f64 {
        match self.comparison {
            Comparison::Greater => (self.value - output) / self.normalize,
            Comparison::Less | Comparison::Equal => (output - self.value) / self.normalize,
        }
    }

    fn violation(&self, output: f64) -> f64 {
        let r = self.residual(output);
        match self.comparison {
            Comparison::Equal => r.abs(),
            Comparison::Greater | Comparison::Less => r.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    pub max_inner_iterations: usize,
    pub tolerance: f64,
    pub constraint_tolerance: f64,
    /// Finite-difference step on the normalized variables
    pub derivative_step: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        let config = OptimizeConfig::default();
        Self {
            max_iterations: config.max_outer_iterations,
            max_inner_iterations: config.max_inner_iterations,
            tolerance: config.tol,
            constraint_tolerance: config.constraint_tol,
            derivative_step: config.fd_step,
        }
    }
}

impl OptimizerSettings {
    fn config(&self) -> OptimizeConfig {
        OptimizeConfig {
            max_outer_iterations: self.max_iterations,
            max_inner_iterations: self.max_inner_iterations,
            tol: self.tolerance,
            constraint_tol: self.constraint_tolerance,
            fd_step: self.derivative_step,
            ..OptimizeConfig::default()
        }
    }
}

/// Resolved optimization problem statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizationCase {
    /// Output key minimized or maximized
    pub objective: String,
    #[serde(default)]
    pub direction: Direction,
    pub variables: Vec<DesignVariable>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub settings: OptimizerSettings,
}

/// A constraint still violated beyond tolerance when the optimizer stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolationWarning {
    pub output: String,
    pub comparison: Comparison,
    pub target: f64,
    pub value: f64,
    /// Normalized violation
    pub violation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub variables: Values,
    pub outputs: Values,
    pub objective: f64,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    /// Objective value of every evaluation, in order
    pub history: Vec<f64>,
    pub warnings: Vec<ConstraintViolationWarning>,
}

/// Variable with its bounds resolved.
#[derive(Debug, Clone)]
struct ScaledVariable {
    name: String,
    lower: f64,
    upper: f64,
}

impl ScaledVariable {
    fn physical(&self, z: f64) -> f64 {
        self.lower + z * (self.upper - self.lower)
    }

    fn normalized(&self, x: f64) -> f64 {
        (x - self.lower) / (self.upper - self.lower)
    }
}

impl OptimizationCase {
    fn resolve(&self, states: Option<&ReferenceStates>) -> AppResult<Vec<ScaledVariable>> {
        let mut errors = Vec::new();
        let mut scaled = Vec::with_capacity(self.variables.len());
        if self.variables.is_empty() {
            errors.push("at least one design variable is required".to_string());
        }
        for var in &self.variables {
            let bounds = var
                .lower
                .resolve(states)
                .and_then(|lo| var.upper.resolve(states).map(|hi| (lo, hi)));
            match bounds {
                Ok((lower, upper)) if lower < upper => {
                    if !(lower..=upper).contains(&var.initial) {
                        errors.push(format!(
                            "{}: initial value {} outside [{lower}, {upper}]",
                            var.name, var.initial
                        ));
                    }
                    scaled.push(ScaledVariable {
                        name: var.name.clone(),
                        lower,
                        upper,
                    });
                }
                Ok((lower, upper)) => errors.push(format!(
                    "{}: lower bound {lower} must be below upper bound {upper}",
                    var.name
                )),
                Err(e) => errors.push(format!("{}: {e}", var.name)),
            }
        }
        for c in &self.constraints {
            if !(c.normalize.is_finite() && c.normalize != 0.0) {
                errors.push(format!("constraint on {}: normalize must be nonzero", c.output));
            }
        }
        if errors.is_empty() {
            Ok(scaled)
        } else {
            Err(AppError::ConfigValidation { errors })
        }
    }
}

fn output(outputs: &Values, name: &str) -> AppResult<f64> {
    outputs
        .get(name)
        .copied()
        .ok_or_else(|| AppError::UnknownOutput { name: name.to_string() })
}

/// Optimize `problem` as stated by `case`.
///
/// The objective is divided by its magnitude at the initial point. A
/// constraint violated beyond `constraint_tolerance` at the returned point is
/// reported in [`OptimizationResult::warnings`] rather than as an error.
pub fn optimize<P: DesignProblem>(problem: &mut P, case: &OptimizationCase) -> AppResult<OptimizationResult> {
    let states = problem.reference_states()?;
    let vars = case.resolve(states.as_ref())?;
    let z0: Vec<f64> = case
        .variables
        .iter()
        .zip(&vars)
        .map(|(v, s)| s.normalized(v.initial))
        .collect();
    let to_values = |z: &[f64]| -> Values {
        vars.iter()
            .zip(z)
            .map(|(v, zi)| (v.name.clone(), v.physical(*zi)))
            .collect()
    };

    let sign = match case.direction {
        Direction::Minimize => 1.0,
        Direction::Maximize => -1.0,
    };
    let initial = problem.evaluate(&to_values(&z0))?;
    let scale = output(&initial, &case.objective)?.abs().max(1e-12);
    for c in &case.constraints {
        output(&initial, &c.output)?;
    }

    let mut history = Vec::new();
    let config = case.settings.config();
    let result = minimize_augmented_lagrangian::<_, AppError>(
        &z0,
        |z| {
            let outputs = problem.evaluate(&to_values(z))?;
            let objective = output(&outputs, &case.objective)?;
            history.push(objective);
            let mut eq = Vec::new();
            let mut ineq = Vec::new();
            for c in &case.constraints {
                let r = c.residual(output(&outputs, &c.output)?);
                match c.comparison {
                    Comparison::Equal => eq.push(r),
                    Comparison::Greater | Comparison::Less => ineq.push(r),
                }
            }
            debug!(objective, "design evaluation");
            Ok(Evaluation {
                objective: sign * objective / scale,
                eq,
                ineq,
            })
        },
        &config,
    )?;

    let variables = to_values(&result.x);
    let outputs = problem.evaluate(&variables)?;
    let objective = output(&outputs, &case.objective)?;
    let mut warnings = Vec::new();
    for c in &case.constraints {
        let value = output(&outputs, &c.output)?;
        let violation = c.violation(value);
        if violation > case.settings.constraint_tolerance {
            warn!(
                output = %c.output,
                target = c.value,
                value,
                violation,
                "constraint violated at the optimum"
            );
            warnings.push(ConstraintViolationWarning {
                output: c.output.clone(),
                comparison: c.comparison,
                target: c.value,
                value,
                violation,
            });
        }
    }
    info!(
        objective,
        converged = result.converged,
        iterations = result.outer_iterations,
        evaluations = result.evaluations,
        "optimization finished"
    );
    Ok(OptimizationResult {
        variables,
        outputs,
        objective,
        converged: result.converged,
        iterations: result.outer_iterations,
        evaluations: result.evaluations,
        history,
        warnings,
    })
}

/// Numeric fields of a serializable table, keyed by field name.
fn numeric_fields<T: Serialize>(table: &T) -> AppResult<Values> {
    let serde_json::Value::Object(map) = serde_json::to_value(table)? else {
        return Ok(Values::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.as_f64().map(|x| (k, x)))
        .collect())
}

/// Turbine geometry and operation point driven by name.
///
/// Geometry entries are addressed as `<field>_<row>` with 1-based rows, e.g.
/// `chord_1` or `opening_2`. For `radius_hub` and `radius_tip` the index runs
/// over the interleaved inlet/outlet values. Operation-point scalars use their
/// field names (`p0_in`, `T0_in`, `p_out`, `alpha_in`, `omega`). Outputs are
/// the overall performance keys.
pub struct TurbineDesignProblem<'f> {
    fluid: &'f Fluid,
    pub geometry: GeometryInput,
    pub operation: OperationPoint,
    options: ModelOptions,
    solver: SolverOptions,
    warm_start: Option<Vec<f64>>,
}

impl<'f> TurbineDesignProblem<'f> {
    pub fn new(
        fluid: &'f Fluid,
        geometry: GeometryInput,
        operation: OperationPoint,
        options: ModelOptions,
        solver: SolverOptions,
    ) -> Self {
        Self {
            fluid,
            geometry,
            operation,
            options,
            solver,
            warm_start: None,
        }
    }

    fn apply(&self, values: &Values) -> AppResult<(GeometryInput, OperationPoint)> {
        let mut geometry = self.geometry.clone();
        let mut operation = self.operation.clone();
        for (name, &value) in values {
            match name.as_str() {
                "p0_in" => operation.p0_in = value,
                "T0_in" => operation.t0_in = value,
                "p_out" => operation.p_out = value,
                "alpha_in" => operation.alpha_in = value,
                "omega" => operation.omega = value,
                _ => *geometry_entry(&mut geometry, name)? = value,
            }
        }
        Ok((geometry, operation))
    }
}

fn geometry_entry<'g>(geometry: &'g mut GeometryInput, name: &str) -> AppResult<&'g mut f64> {
    let unknown = || AppError::UnknownVariable { name: name.to_string() };
    let (field, index) = name.rsplit_once('_').ok_or_else(unknown)?;
    let index: usize = index.parse().map_err(|_| unknown())?;
    let values = match field {
        "radius_hub" => &mut geometry.radius_hub,
        "radius_tip" => &mut geometry.radius_tip,
        "pitch" => &mut geometry.pitch,
        "chord" => &mut geometry.chord,
        "stagger_angle" => &mut geometry.stagger_angle,
        "opening" => &mut geometry.opening,
        "diameter_le" => &mut geometry.diameter_le,
        "wedge_angle_le" => &mut geometry.wedge_angle_le,
        "metal_angle_le" => &mut geometry.metal_angle_le,
        "metal_angle_te" => &mut geometry.metal_angle_te,
        "thickness_te" => &mut geometry.thickness_te,
        "tip_clearance" => &mut geometry.tip_clearance,
        "thickness_max" => &mut geometry.thickness_max,
        _ => return Err(unknown()),
    };
    index
        .checked_sub(1)
        .and_then(|i| values.get_mut(i))
        .ok_or_else(unknown)
}

impl DesignProblem for TurbineDesignProblem<'_> {
    fn evaluate(&mut self, values: &Values) -> AppResult<Values> {
        let (input, op) = self.apply(values)?;
        let geometry = Geometry::from_input(&input)?;
        let series = CascadeSeries::new(self.fluid, geometry, self.options.clone(), self.solver.clone())?;
        let warm = self
            .warm_start
            .as_deref()
            .filter(|x| x.len() == series.unknown_count());
        let solution = series.solve(&op, warm)?;
        let outputs = numeric_fields(&solution.results.overall)?;
        self.warm_start = Some(solution.x);
        Ok(outputs)
    }

    fn reference_states(&self) -> AppResult<Option<ReferenceStates>> {
        Ok(self.fluid.reference_states().ok())
    }
}

/// Cycle parameters driven by name; outputs are the cycle result keys.
pub struct CycleDesignProblem {
    pub parameters: CycleParameters,
}

impl CycleDesignProblem {
    pub fn new(parameters: CycleParameters) -> Self {
        Self { parameters }
    }
}

impl DesignProblem for CycleDesignProblem {
    fn evaluate(&mut self, values: &Values) -> AppResult<Values> {
        let mut params = self.parameters.clone();
        for (name, &value) in values {
            params.set(name, value)?;
        }
        Ok(Cycle::new(params)?.solve()?.outputs())
    }

    fn reference_states(&self) -> AppResult<Option<ReferenceStates>> {
        let fluid = Fluid::from_config(&self.parameters.working_fluid)?;
        Ok(fluid.reference_states().ok())
    }
}
