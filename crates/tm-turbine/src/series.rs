//! Simultaneous solution of every plane of a cascade series.
//!
//! The unknowns are the inlet velocity and, per row, the throat and exit
//! relative velocities and entropies plus the exit flow angle. Every unknown
//! is scaled to order one with [`ReferenceValues`] before it reaches the solver.
//!
//! Residuals per row are the throat and exit loss errors, the throat and exit
//! mass balances and the choking closure. A single global residual ties the
//! last exit static pressure to the imposed back pressure.

use crate::choking::{CriticalInput, CriticalState, critical_state};
use crate::error::{TurbineError, TurbineResult};
use crate::geometry::Geometry;
use crate::initial_guess::{Guess, GuessParameters, guess_grid};
use crate::operation::OperationPoint;
use crate::options::{ChokingCondition, ModelOptions, SolverMethod, SolverOptions};
use crate::plane::{InletCondition, PlaneLocation, PlaneState, evaluate_blade_plane, evaluate_inlet, interspace};
use crate::results::{SolverReport, TurbineResults};
use nalgebra::DVector;
use serde::Serialize;
use tm_core::numeric::{SmoothMethod, cosd, smooth_min};
use tm_fluids::{Fluid, FluidContext};
use tm_solver::{
    LmConfig, NewtonConfig, NewtonResult, SolverError, forward_difference_from, levenberg_marquardt,
    newton_solve,
};
use tracing::{debug, info, warn};

/// Unknowns per row: w_throat, s_throat, w_out, s_out, beta_out.
const PER_ROW: usize = 5;
/// Number of guesses in the last-resort initial guess grid.
const GRID_POINTS: usize = 11;
/// Sharpness of the smooth minimum in the Mach-limited choking closures.
const MACH_LIMIT_ALPHA: f64 = 100.0;

/// Scales of the unknowns and residuals, fixed by the operation point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceValues {
    pub p0_in: f64,
    pub h0_in: f64,
    pub s_in: f64,
    pub d0_in: f64,
    pub a0_in: f64,
    /// Static enthalpy after an isentropic expansion to the back pressure
    pub h_out_s: f64,
    /// Spouting velocity √(2 (h0_in − h_out_s))
    pub v0: f64,
    pub m_ref: f64,
    pub s_min: f64,
    pub s_range: f64,
    pub angle_min: f64,
    pub angle_range: f64,
}

impl ReferenceValues {
    pub fn new(ctx: &FluidContext<'_>, op: &OperationPoint, geometry: &Geometry) -> TurbineResult<Self> {
        let stagnation = ctx.pt(op.p0_in, op.t0_in)?;
        let h0_in = stagnation.h;
        let s_in = stagnation.s;
        let h_out_s = ctx.ps(op.p_out, s_in)?.h;
        let dh_is = h0_in - h_out_s;
        if !(dh_is > 0.0) {
            return Err(TurbineError::non_physical(format!(
                "isentropic enthalpy drop {dh_is} J/kg is not positive"
            )));
        }
        let v0 = (2.0 * dh_is).sqrt();
        let d0_in = stagnation.rho.value;
        let s_range = ctx.ph(op.p_out, h0_in)?.s - s_in;
        Ok(Self {
            p0_in: op.p0_in,
            h0_in,
            s_in,
            d0_in,
            a0_in: stagnation.a.value,
            h_out_s,
            v0,
            m_ref: geometry.row(0).area_in * v0 * d0_in,
            s_min: s_in,
            s_range,
            angle_min: -90.0,
            angle_range: 180.0,
        })
    }

    /// Scale a physical unknown vector to the solver variables.
    pub fn normalize(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            x.len(),
            x.iter().enumerate().map(|(i, &v)| match slot(i) {
                Slot::Velocity => v / self.v0,
                Slot::Entropy => (v - self.s_min) / self.s_range,
                Slot::Angle => (v - self.angle_min) / self.angle_range,
            }),
        )
    }

    /// Inverse of [`ReferenceValues::normalize`].
    pub fn physical(&self, x: &DVector<f64>) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &v)| match slot(i) {
                Slot::Velocity => v * self.v0,
                Slot::Entropy => self.s_min + v * self.s_range,
                Slot::Angle => self.angle_min + v * self.angle_range,
            })
            .collect()
    }
}

enum Slot {
    Velocity,
    Entropy,
    Angle,
}

fn slot(i: usize) -> Slot {
    if i == 0 {
        return Slot::Velocity;
    }
    match (i - 1) % PER_ROW {
        0 | 2 => Slot::Velocity,
        1 | 3 => Slot::Entropy,
        _ => Slot::Angle,
    }
}

/// Planes, critical states and residuals at one point of the unknown space.
#[derive(Debug, Clone)]
pub(crate) struct SeriesState {
    pub planes: Vec<PlaneState>,
    pub critical: Vec<CriticalState>,
    pub choked: Vec<bool>,
    pub residual: DVector<f64>,
}

/// Converged results and the physical unknowns, reusable as a warm start.
#[derive(Debug, Clone, Serialize)]
pub struct TurbineSolution {
    pub results: TurbineResults,
    pub x: Vec<f64>,
}

enum GuessSource {
    WarmStart(Vec<f64>),
    Parameters(GuessParameters),
}

struct Attempt {
    method: SolverMethod,
    guess: GuessSource,
    label: String,
}

/// Ordered rows with their loss, deviation and choking models.
pub struct CascadeSeries<'f> {
    fluid: &'f Fluid,
    geometry: Geometry,
    options: ModelOptions,
    solver: SolverOptions,
}

impl<'f> CascadeSeries<'f> {
    pub fn new(
        fluid: &'f Fluid,
        geometry: Geometry,
        options: ModelOptions,
        solver: SolverOptions,
    ) -> TurbineResult<Self> {
        if geometry.number_of_rows() == 0 {
            return Err(TurbineError::Geometry {
                errors: vec!["at least one row is required".to_string()],
            });
        }
        options.validate()?;
        if !(solver.tolerance > 0.0 && solver.derivative_rel_step > 0.0 && solver.max_iterations > 0) {
            return Err(TurbineError::InvalidOptions {
                errors: vec![format!(
                    "solver tolerance, derivative step and iteration budget must be positive (got {}, {}, {})",
                    solver.tolerance, solver.derivative_rel_step, solver.max_iterations
                )],
            });
        }
        Ok(Self {
            fluid,
            geometry,
            options,
            solver,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver
    }

    /// Length of the unknown (and residual) vector.
    pub fn unknown_count(&self) -> usize {
        1 + PER_ROW * self.geometry.number_of_rows()
    }

    fn check_operation(&self, op: &OperationPoint) -> TurbineResult<()> {
        op.validate()?;
        if !op.fluid_name.eq_ignore_ascii_case(self.fluid.name()) {
            return Err(TurbineError::InvalidOperationPoint {
                errors: vec![format!(
                    "fluid_name '{}' does not match the configured fluid '{}'",
                    op.fluid_name,
                    self.fluid.name()
                )],
            });
        }
        Ok(())
    }

    /// Physical initial guess built from `params`.
    pub fn initial_guess(&self, op: &OperationPoint, params: &GuessParameters) -> TurbineResult<Vec<f64>> {
        self.check_operation(op)?;
        let ctx = self.fluid.context();
        let refs = ReferenceValues::new(&ctx, op, &self.geometry)?;
        self.guess(&ctx, op, &refs, params)
    }

    fn guess(
        &self,
        ctx: &FluidContext<'_>,
        op: &OperationPoint,
        refs: &ReferenceValues,
        params: &GuessParameters,
    ) -> TurbineResult<Vec<f64>> {
        Guess {
            ctx,
            geometry: &self.geometry,
            options: &self.options,
            operation: op,
            refs,
        }
        .build(params)
    }

    /// Normalised residual vector at the physical unknowns `x`.
    pub fn residual(&self, op: &OperationPoint, x: &[f64]) -> TurbineResult<Vec<f64>> {
        self.check_operation(op)?;
        self.check_length(x)?;
        let ctx = self.fluid.context();
        let refs = ReferenceValues::new(&ctx, op, &self.geometry)?;
        let state = self.evaluate(&ctx, op, &refs, &refs.normalize(x))?;
        Ok(state.residual.iter().copied().collect())
    }

    fn check_length(&self, x: &[f64]) -> TurbineResult<()> {
        if x.len() != self.unknown_count() {
            return Err(TurbineError::InvalidOptions {
                errors: vec![format!(
                    "unknown vector has {} entries, expected {}",
                    x.len(),
                    self.unknown_count()
                )],
            });
        }
        Ok(())
    }

    /// March through every row at the normalised unknowns `x`.
    pub(crate) fn evaluate(
        &self,
        ctx: &FluidContext<'_>,
        op: &OperationPoint,
        refs: &ReferenceValues,
        x: &DVector<f64>,
    ) -> TurbineResult<SeriesState> {
        let phys = refs.physical(x);
        let rows = self.geometry.rows();
        let mut planes = Vec::with_capacity(3 * rows.len());
        let mut critical = Vec::with_capacity(rows.len());
        let mut choked = Vec::with_capacity(rows.len());
        let mut residual = Vec::with_capacity(self.unknown_count());

        let mut inlet = InletCondition {
            h0: refs.h0_in,
            s: refs.s_in,
            alpha: op.alpha_in,
            v: phys[0],
        };
        for (i, row) in rows.iter().enumerate() {
            let k = 1 + PER_ROW * i;
            let (w_throat, s_throat, w_out, s_out, beta_out) =
                (phys[k], phys[k + 1], phys[k + 2], phys[k + 3], phys[k + 4]);

            let inlet_plane = evaluate_inlet(ctx, row, op.omega, &inlet)?;
            let throat = evaluate_blade_plane(
                ctx,
                row,
                op.omega,
                PlaneLocation::Throat,
                &inlet_plane,
                w_throat,
                s_throat,
                row.metal_angle_te,
                &self.options,
            )?;
            let exit = evaluate_blade_plane(
                ctx,
                row,
                op.omega,
                PlaneLocation::Exit,
                &inlet_plane,
                w_out,
                s_out,
                beta_out,
                &self.options,
            )?;

            let crit = critical_state(
                ctx,
                &CriticalInput {
                    row,
                    h0_rel: inlet_plane.rothalpy + 0.5 * throat.velocity.u * throat.velocity.u,
                    p0_rel_in: inlet_plane.p0_rel,
                    loss: throat.loss.map_or(0.0, |l| l.total),
                    blockage: self.options.blockage_model,
                },
            )?;
            let is_choked = exit.p <= crit.p;
            let closure = match self.options.choking_condition {
                ChokingCondition::Deviation => {
                    let cos_model = if is_choked {
                        crit.mass_flow / (exit.d * exit.velocity.w * row.area_out * (1.0 - exit.blockage))
                    } else {
                        cosd(
                            self.options
                                .deviation_model
                                .signed_exit_flow_angle(exit.ma_rel, crit.ma_rel, row),
                        )
                    };
                    cos_model - cosd(beta_out)
                }
                ChokingCondition::MachCritical => {
                    throat.ma_rel
                        - smooth_min(&[crit.ma_rel, exit.ma_rel], SmoothMethod::Boltzmann, MACH_LIMIT_ALPHA)
                }
                ChokingCondition::MachUnity => {
                    throat.ma_rel - smooth_min(&[1.0, exit.ma_rel], SmoothMethod::Boltzmann, MACH_LIMIT_ALPHA)
                }
            };

            residual.extend([
                throat.loss_error,
                exit.loss_error,
                (inlet_plane.mass_flow - throat.mass_flow) / refs.m_ref,
                (inlet_plane.mass_flow - exit.mass_flow) / refs.m_ref,
                closure,
            ]);

            if let Some(next) = rows.get(i + 1) {
                inlet = interspace(ctx, &exit, row, next)?;
            }
            planes.extend([inlet_plane, throat, exit]);
            critical.push(crit);
            choked.push(is_choked);
        }

        let last_p = planes.last().map_or(op.p_out, |p| p.p);
        residual.push((last_p - op.p_out) / refs.p0_in);

        let residual = DVector::from_vec(residual);
        if residual.iter().any(|r| !r.is_finite()) {
            return Err(TurbineError::non_physical("residual vector is not finite"));
        }
        Ok(SeriesState {
            planes,
            critical,
            choked,
            residual,
        })
    }

    fn positive_indices(&self) -> Vec<usize> {
        let mut idx = vec![0];
        for i in 0..self.geometry.number_of_rows() {
            idx.push(1 + PER_ROW * i);
            idx.push(3 + PER_ROW * i);
        }
        idx
    }

    fn run(
        &self,
        ctx: &FluidContext<'_>,
        op: &OperationPoint,
        refs: &ReferenceValues,
        method: SolverMethod,
        x0: DVector<f64>,
    ) -> TurbineResult<NewtonResult> {
        let eps = self.solver.derivative_rel_step;
        let residual = |x: &DVector<f64>| self.evaluate(ctx, op, refs, x).map(|state| state.residual);
        let jacobian = |x: &DVector<f64>, r: &DVector<f64>| forward_difference_from(x, r, &residual, eps);
        match method {
            SolverMethod::Newton => {
                let config = NewtonConfig {
                    max_iterations: self.solver.max_iterations,
                    abs_tol: self.solver.tolerance,
                    rel_tol: 0.0,
                    positive: self.positive_indices(),
                    ..NewtonConfig::default()
                };
                newton_solve(x0, &residual, jacobian, &config)
            }
            SolverMethod::LevenbergMarquardt => {
                let config = LmConfig {
                    max_iterations: self.solver.max_iterations,
                    abs_tol: self.solver.tolerance,
                    positive: self.positive_indices(),
                    ..LmConfig::default()
                };
                levenberg_marquardt(x0, &residual, jacobian, &config)
            }
        }
    }

    fn attempts(&self, warm_start: Option<&[f64]>) -> Vec<Attempt> {
        let method = self.solver.method;
        let first = |label: &str| match warm_start {
            Some(x) => (GuessSource::WarmStart(x.to_vec()), format!("{label} from warm start")),
            None => (
                GuessSource::Parameters(GuessParameters::default()),
                format!("{label} from heuristic guess"),
            ),
        };

        let (guess, label) = first(&method.to_string());
        let mut attempts = vec![Attempt { method, guess, label }];
        if !self.solver.fallback {
            return attempts;
        }
        if method == SolverMethod::Newton {
            let (guess, label) = first("levenberg_marquardt");
            attempts.push(Attempt {
                method: SolverMethod::LevenbergMarquardt,
                guess,
                label,
            });
        }
        if warm_start.is_some() {
            attempts.push(Attempt {
                method: SolverMethod::LevenbergMarquardt,
                guess: GuessSource::Parameters(GuessParameters::default()),
                label: "levenberg_marquardt from heuristic guess".to_string(),
            });
        }
        for (i, params) in guess_grid(GRID_POINTS).into_iter().enumerate() {
            attempts.push(Attempt {
                method: SolverMethod::LevenbergMarquardt,
                guess: GuessSource::Parameters(params),
                label: format!("levenberg_marquardt from grid guess {i}"),
            });
        }
        attempts
    }

    /// Solve the series at `op`.
    ///
    /// `warm_start` is a physical unknown vector, typically
    /// [`TurbineSolution::x`] of a neighbouring point. When the first attempt
    /// fails and fallback is enabled, Levenberg-Marquardt is tried from the
    /// same start, then from the heuristic guess and finally from a grid of
    /// guesses. Exhaustion returns [`SolverError::NonConvergence`] carrying the
    /// smallest-norm residual over all attempts (not the last one) and the
    /// total iteration count.
    pub fn solve(&self, op: &OperationPoint, warm_start: Option<&[f64]>) -> TurbineResult<TurbineSolution> {
        self.check_operation(op)?;
        if let Some(x) = warm_start {
            self.check_length(x)?;
        }
        let ctx = self.fluid.context();
        let refs = ReferenceValues::new(&ctx, op, &self.geometry)?;

        let attempts = self.attempts(warm_start);
        let attempt_count = attempts.len();
        let mut total_iterations = 0;
        let mut best_residual: Option<Vec<f64>> = None;
        let mut last_error = None;
        for (n, attempt) in attempts.into_iter().enumerate() {
            if n > 0 {
                // Each fallback attempt starts from an empty property cache
                ctx.clear_cache();
            }
            let x0 = match &attempt.guess {
                GuessSource::WarmStart(x) => Ok(x.clone()),
                GuessSource::Parameters(params) => self.guess(&ctx, op, &refs, params),
            }
            .map(|x| refs.normalize(&x));
            let outcome = x0.and_then(|x0| self.run(&ctx, op, &refs, attempt.method, x0));
            match outcome {
                Ok(result) => {
                    total_iterations += result.iterations;
                    let state = self.evaluate(&ctx, op, &refs, &result.x)?;
                    let stats = ctx.stats();
                    ctx.log_stats();
                    let report = SolverReport {
                        converged: result.converged,
                        iterations: total_iterations,
                        attempts: n + 1,
                        residual_norm: result.residual_norm,
                        method: attempt.method,
                        strategy: attempt.label,
                        residual: result.residual.iter().copied().collect(),
                        property_fallbacks: stats.fallbacks,
                    };
                    let results = TurbineResults::assemble(&ctx, &self.geometry, op, &refs, &state, report)?;
                    info!(
                        rows = self.geometry.number_of_rows(),
                        pressure_ratio = op.pressure_ratio(),
                        mass_flow = results.overall.mass_flow_rate,
                        efficiency_ts = results.overall.efficiency_ts,
                        iterations = total_iterations,
                        "turbine solved"
                    );
                    return Ok(TurbineSolution {
                        results,
                        x: refs.physical(&result.x),
                    });
                }
                Err(err) => {
                    warn!(attempt = %attempt.label, %err, "series solve attempt failed");
                    if let TurbineError::Solver(SolverError::NonConvergence {
                        residual, iterations, ..
                    }) = &err
                    {
                        total_iterations += iterations;
                        let norm = |r: &[f64]| r.iter().map(|v| v * v).sum::<f64>().sqrt();
                        if best_residual.as_deref().is_none_or(|best| norm(residual) < norm(best)) {
                            best_residual = Some(residual.clone());
                        }
                    }
                    last_error = Some(err);
                }
            }
        }

        ctx.log_stats();
        match (best_residual, last_error) {
            (Some(residual), _) => {
                debug!(iterations = total_iterations, "every solve strategy exhausted");
                let what = format!("cascade series ({attempt_count} attempts, smallest residual kept)");
                Err(SolverError::non_convergence(what, &residual, total_iterations).into())
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(TurbineError::non_physical("no solve strategy was attempted")),
        }
    }
}
