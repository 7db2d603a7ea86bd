//! End-to-end solves of cascade series with the perfect-gas air backend.

mod common;

use common::{init_tracing, operation_point, stage_geometry, stator_geometry};
use tm_fluids::Fluid;
use tm_solver::SolverError;
use tm_turbine::{
    CascadeSeries, ChokingCondition, Geometry, GeometryInput, LossModelConfig, ModelOptions, PlaneLocation,
    SolverOptions, TurbineError, TurbineResults, TurbineSolution,
};

const CHOKING_CONDITIONS: [ChokingCondition; 3] = [
    ChokingCondition::Deviation,
    ChokingCondition::MachCritical,
    ChokingCondition::MachUnity,
];

fn solve_with(input: &GeometryInput, options: ModelOptions, pressure_ratio: f64) -> TurbineSolution {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    let geometry = Geometry::from_input(input).unwrap();
    let series = CascadeSeries::new(&fluid, geometry, options, SolverOptions::default()).unwrap();
    series.solve(&operation_point(pressure_ratio), None).unwrap()
}

fn assert_mass_conserved(results: &TurbineResults) {
    let m = results.overall.mass_flow_rate;
    assert!(m > 0.0);
    for plane in &results.plane {
        assert!(
            (plane.mass_flow - m).abs() < 1e-6 * m,
            "row {} {}: {} vs {}",
            plane.row,
            plane.location,
            plane.mass_flow,
            m
        );
    }
}

/// Every row passes at most its critical flow, and `choked` matches the exit pressure.
fn assert_within_critical_flow(results: &TurbineResults) {
    let m = results.overall.mass_flow_rate;
    for (row, cascade) in results.cascade.iter().enumerate() {
        assert!(
            m <= cascade.mass_flow_crit * (1.0 + 1e-9),
            "row {row}: m = {m} exceeds m_crit = {}",
            cascade.mass_flow_crit
        );
        let exit = &results.plane[3 * row + 2];
        assert_eq!(cascade.choked, exit.p <= cascade.p_crit, "row {row}");
    }
}

fn assert_efficiency_identity(results: &TurbineResults) {
    let o = &results.overall;
    let total = results.total_loss_drop() + o.efficiency_ts_drop_kinetic + o.efficiency_ts;
    assert!((total - 1.0).abs() < 1e-9, "sum of fractions = {total}");
    assert!((results.total_loss_drop() - o.efficiency_ts_drop_losses).abs() < 1e-9);
}

#[test]
fn single_stator_scenario_converges_unchoked() {
    let solution = solve_with(&stator_geometry(), ModelOptions::new(LossModelConfig::custom(0.1)), 1.2);
    let r = &solution.results;

    assert!(r.solver.converged);
    assert!(r.solver.residual_norm < 1e-8);
    assert_eq!(r.plane.len(), 3);
    assert_eq!(r.cascade.len(), 1);
    assert!(!r.cascade[0].choked);
    assert!(r.cascade[0].p_crit < r.plane[2].p);

    let o = &r.overall;
    assert!(o.mass_flow_rate > 0.0);
    assert!((o.pressure_ratio_ts - 1.2).abs() < 1e-6);
    // A stator alone extracts no work: the isentropic drop ends up as exit kinetic energy or loss
    assert!(o.power.abs() < 1e-6 * o.mass_flow_rate * o.spouting_velocity.powi(2));
    assert!(o.efficiency_ts.abs() < 1e-9);
    assert!(o.efficiency_ts_drop_kinetic > 0.5 && o.efficiency_ts_drop_kinetic < 1.0);
    assert!(o.efficiency_ts_drop_losses > 0.0);
    assert_eq!(r.cascade[0].loss.total, 0.1);
    assert_eq!(r.stage.len(), 0);

    assert_mass_conserved(r);
    assert_efficiency_identity(r);
}

#[test]
fn solution_is_a_root_of_the_residual() {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    let geometry = Geometry::from_input(&stator_geometry()).unwrap();
    let series = CascadeSeries::new(
        &fluid,
        geometry,
        ModelOptions::new(LossModelConfig::custom(0.1)),
        SolverOptions::default(),
    )
    .unwrap();
    let op = operation_point(1.2);
    let solution = series.solve(&op, None).unwrap();
    assert_eq!(solution.x.len(), series.unknown_count());
    let residual = series.residual(&op, &solution.x).unwrap();
    let norm = residual.iter().map(|r| r * r).sum::<f64>().sqrt();
    assert!(norm < 1e-8, "residual norm {norm}");
}

#[test]
fn benner_losses_satisfy_the_efficiency_identity() {
    let solution = solve_with(&stator_geometry(), ModelOptions::new(LossModelConfig::benner()), 1.2);
    let r = &solution.results;
    let loss = r.cascade[0].loss;
    assert!(loss.profile > 0.0 && loss.secondary > 0.0);
    assert_eq!(loss.clearance, 0.0);
    assert_mass_conserved(r);
    assert_efficiency_identity(r);
}

#[test]
fn one_stage_extracts_work() {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    let geometry = Geometry::from_input(&stage_geometry()).unwrap();
    let series = CascadeSeries::new(
        &fluid,
        geometry,
        ModelOptions::new(LossModelConfig::custom(0.1)),
        SolverOptions::default(),
    )
    .unwrap();
    let op = tm_turbine::OperationPoint {
        omega: 1500.0,
        ..operation_point(1.6)
    };
    let r = series.solve(&op, None).unwrap().results;

    assert_eq!(r.plane.len(), 6);
    assert_eq!(r.stage.len(), 1);
    assert!(r.stage[0].reaction.is_finite());
    assert!(r.overall.power > 0.0);
    assert!((r.overall.torque - r.overall.power / 1500.0).abs() < 1e-9 * r.overall.power);
    assert!(r.overall.last_blade_velocity > 0.0);
    assert_mass_conserved(&r);
    assert_efficiency_identity(&r);
}

#[test]
fn warm_start_reuses_a_neighbouring_solution() {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    let geometry = Geometry::from_input(&stator_geometry()).unwrap();
    let series = CascadeSeries::new(
        &fluid,
        geometry,
        ModelOptions::new(LossModelConfig::custom(0.1)),
        SolverOptions::default(),
    )
    .unwrap();
    let base = series.solve(&operation_point(1.2), None).unwrap();
    let next = series.solve(&operation_point(1.25), Some(&base.x)).unwrap();
    assert_eq!(next.results.solver.attempts, 1);
    assert!(next.results.solver.strategy.contains("warm start"));
    assert!(next.results.overall.mass_flow_rate > base.results.overall.mass_flow_rate);

    let bad = series.solve(&operation_point(1.25), Some(&base.x[..3]));
    assert!(matches!(bad, Err(TurbineError::InvalidOptions { .. })));
}

#[test]
fn mismatched_fluid_name_is_rejected() {
    let fluid = Fluid::perfect_gas("air").unwrap();
    let geometry = Geometry::from_input(&stator_geometry()).unwrap();
    let series = CascadeSeries::new(
        &fluid,
        geometry,
        ModelOptions::new(LossModelConfig::custom(0.1)),
        SolverOptions::default(),
    )
    .unwrap();
    let op = tm_turbine::OperationPoint {
        fluid_name: "nitrogen".into(),
        ..operation_point(1.2)
    };
    assert!(matches!(
        series.solve(&op, None),
        Err(TurbineError::InvalidOperationPoint { .. })
    ));
}

#[test]
fn results_serialize_with_plane_fields_flattened() {
    let solution = solve_with(&stator_geometry(), ModelOptions::new(LossModelConfig::custom(0.1)), 1.2);
    let json: serde_json::Value = serde_json::from_str(&solution.results.to_json().unwrap()).unwrap();
    let plane = &json["plane"][2];
    assert_eq!(plane["location"], "exit");
    assert!(plane["beta"].is_number());
    assert!(json["overall"]["efficiency_ts"].is_number());
    assert_eq!(json["solver"]["method"], "newton");
    assert!(solution.results.plane.iter().any(|p| p.location == PlaneLocation::Throat));
}

#[test]
fn mach_limited_closures_agree_when_unchoked() {
    // Below choking both closures reduce to equal throat and exit Mach numbers
    let mut options = ModelOptions::new(LossModelConfig::custom(0.1));
    options.choking_condition = ChokingCondition::MachCritical;
    let critical = solve_with(&stator_geometry(), options.clone(), 1.2).results;
    options.choking_condition = ChokingCondition::MachUnity;
    let unity = solve_with(&stator_geometry(), options, 1.2).results;

    for r in [&critical, &unity] {
        assert!(r.solver.converged);
        let (throat, exit) = (&r.plane[1], &r.plane[2]);
        assert!((throat.ma_rel - exit.ma_rel).abs() < 1e-6);
        assert!((exit.velocity.beta - throat.velocity.beta).abs() < 1e-3);
        assert_mass_conserved(r);
        assert_efficiency_identity(r);
    }
    let dm = critical.overall.mass_flow_rate - unity.overall.mass_flow_rate;
    assert!(dm.abs() < 1e-6 * critical.overall.mass_flow_rate);
}

#[test]
fn throat_inside_a_flared_passage() {
    let mut input = stator_geometry();
    input.radius_hub = vec![0.084, 0.082];
    input.radius_tip = vec![0.097, 0.099];
    input.throat_location_fraction = Some(vec![5.0 / 6.0]);
    let r = solve_with(&input, ModelOptions::new(LossModelConfig::custom(0.1)), 1.2).results;

    let throat = &r.plane[1];
    // Hub and tip flare symmetrically, so the mean radius is unchanged
    assert!((throat.radius - 0.0905).abs() < 1e-12);
    assert!(throat.area < r.plane[2].area);
    assert!(r.solver.converged);
    assert!(!r.cascade[0].choked);
    assert_mass_conserved(&r);
    assert_efficiency_identity(&r);
}

fn choked_options(condition: ChokingCondition) -> ModelOptions {
    let mut options = ModelOptions::new(LossModelConfig::custom(0.1));
    options.choking_condition = condition;
    options
}

#[test]
fn stator_chokes_at_high_pressure_ratio() {
    for condition in CHOKING_CONDITIONS {
        let mut flows = Vec::new();
        for pressure_ratio in [2.5, 3.0] {
            let r = solve_with(&stator_geometry(), choked_options(condition), pressure_ratio).results;
            assert!(r.solver.converged, "{condition:?} at PR {pressure_ratio}");
            assert!(r.cascade[0].choked, "{condition:?} at PR {pressure_ratio}");
            assert!((r.overall.pressure_ratio_ts - pressure_ratio).abs() < 1e-6);
            assert_within_critical_flow(&r);
            assert_mass_conserved(&r);
            assert_efficiency_identity(&r);
            flows.push(r.overall.mass_flow_rate);
        }
        // Past choking the flow no longer responds to the exit pressure
        let change = (flows[1] - flows[0]).abs() / flows[0];
        assert!(change < 1e-2, "{condition:?}: {flows:?}");
    }
}

#[test]
fn stage_stays_within_critical_flow_at_high_pressure_ratio() {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    for condition in CHOKING_CONDITIONS {
        let geometry = Geometry::from_input(&stage_geometry()).unwrap();
        let series =
            CascadeSeries::new(&fluid, geometry, choked_options(condition), SolverOptions::default()).unwrap();
        for pressure_ratio in [2.5, 3.0] {
            let r = series.solve(&operation_point(pressure_ratio), None).unwrap().results;
            assert!(r.solver.converged, "{condition:?} at PR {pressure_ratio}");
            assert_eq!(r.cascade.len(), 2);
            assert!(r.overall.power > 0.0);
            assert_within_critical_flow(&r);
            assert_mass_conserved(&r);
            assert_efficiency_identity(&r);
        }
    }
}

#[test]
fn stage_rotor_chokes_under_the_deviation_closure() {
    let r = solve_with(&stage_geometry(), choked_options(ChokingCondition::Deviation), 3.0).results;
    assert!(r.cascade[1].choked);
    assert_within_critical_flow(&r);
    assert_mass_conserved(&r);
    assert_efficiency_identity(&r);
}

fn one_iteration_series(fluid: &Fluid, fallback: bool) -> CascadeSeries<'_> {
    let geometry = Geometry::from_input(&stator_geometry()).unwrap();
    let solver = SolverOptions {
        max_iterations: 1,
        fallback,
        ..SolverOptions::default()
    };
    CascadeSeries::new(fluid, geometry, ModelOptions::new(LossModelConfig::custom(0.1)), solver).unwrap()
}

#[test]
fn exhausted_strategies_keep_the_smallest_residual() {
    init_tracing();
    let fluid = Fluid::perfect_gas("air").unwrap();
    let norm = |r: &[f64]| r.iter().map(|v| v * v).sum::<f64>().sqrt();
    let op = operation_point(1.2);

    let single = one_iteration_series(&fluid, false);
    let Err(TurbineError::Solver(SolverError::NonConvergence { residual: first, .. })) = single.solve(&op, None)
    else {
        panic!("one Newton step should not converge");
    };
    assert_eq!(first.len(), single.unknown_count());

    // The fallback chain repeats the same first attempt, then tries others
    let chain = one_iteration_series(&fluid, true);
    match chain.solve(&op, None) {
        Err(TurbineError::Solver(SolverError::NonConvergence { what, residual, .. })) => {
            assert!(what.contains("smallest residual kept"), "{what}");
            assert_eq!(residual.len(), chain.unknown_count());
            assert!(norm(&residual) <= norm(&first));
            assert!(norm(&residual) > 1e-8);
        }
        other => panic!("expected non-convergence, got {other:?}"),
    }
}
