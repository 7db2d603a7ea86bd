//! Performance-map sweeps of the single-stator case.

mod common;

use common::{P0_IN, init_tracing, stator_case};
use tm_app::{
    OneOrMany, OperationTemplate, PerformanceMap, PointStatus, TurbineCase, run, run_from, run_parallel,
    run_parallel_from,
};
use tm_turbine::SolverOptions;

fn sweep() -> OperationTemplate {
    let mut template = OperationTemplate::from(&stator_case().operation_point);
    template.p_out = OneOrMany::Many(vec![
        P0_IN / 1.15,
        P0_IN / 1.2,
        P0_IN / 1.25,
        // Exit pressure above inlet total pressure
        P0_IN * 1.1,
        P0_IN / 1.3,
    ]);
    template
}

#[test]
fn sweep_flags_the_infeasible_point() {
    init_tracing();
    let case = stator_case();
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();
    let map = run(&series, &sweep()).unwrap();

    assert_eq!(map.rows.len(), 5);
    assert_eq!(map.converged().count(), 4);
    let bad = &map.rows[3];
    assert_eq!(bad.index, vec![0, 0, 0, 3, 0, 0]);
    assert_eq!(bad.status, PointStatus::Failed);
    assert!(bad.results.is_none());
    assert!(bad.message.as_deref().unwrap().contains("p_out"));

    let last = &map.rows[4];
    assert_eq!(last.index, vec![0, 0, 0, 4, 0, 0]);
    assert_eq!(last.status, PointStatus::Converged);
    assert!(last.overall().unwrap().mass_flow_rate > 0.0);
    let solver = &last.results.as_ref().unwrap().solver;
    assert!(solver.strategy.contains("warm start"), "{}", solver.strategy);

    // Larger pressure ratio, larger flow while unchoked
    let flows: Vec<f64> = map
        .converged()
        .map(|r| r.overall().unwrap().mass_flow_rate)
        .collect();
    assert!(flows[0] < flows[1] && flows[1] < flows[2] && flows[2] < flows[3], "{flows:?}");

    let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 5);
    assert_eq!(json["rows"][3]["status"], "failed");
}

#[test]
fn parallel_sweep_matches_the_sequential_one() {
    init_tracing();
    let case = stator_case();
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();
    let sequential = run(&series, &sweep()).unwrap();
    let parallel = run_parallel(&series, &sweep()).unwrap();

    assert_eq!(parallel.rows.len(), sequential.rows.len());
    for (a, b) in sequential.rows.iter().zip(&parallel.rows) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.status, b.status);
        if let (Some(x), Some(y)) = (a.overall(), b.overall()) {
            let rel = (x.mass_flow_rate - y.mass_flow_rate).abs() / x.mass_flow_rate;
            assert!(rel < 1e-6, "{} vs {}", x.mass_flow_rate, y.mass_flow_rate);
        }
    }
}

#[test]
fn case_without_a_template_maps_its_own_point() {
    init_tracing();
    let case = stator_case();
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();
    let map = run(&series, &case.map_template()).unwrap();
    assert_eq!(map.rows.len(), 1);
    assert_eq!(map.rows[0].status, PointStatus::Converged);
}

/// Single-iteration Newton without fallback: only a point that is already
/// solved can converge.
fn one_iteration_case() -> TurbineCase {
    TurbineCase {
        solver_options: SolverOptions {
            max_iterations: 1,
            fallback: false,
            ..SolverOptions::default()
        },
        ..stator_case()
    }
}

fn design_point_map(case: &TurbineCase) -> PerformanceMap {
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();
    let map = run(&series, &case.map_template()).unwrap();
    assert_eq!(map.converged().count(), 1);
    map
}

fn revisit_sweep() -> OperationTemplate {
    let mut template = OperationTemplate::from(&stator_case().operation_point);
    template.p_out = OneOrMany::Many(vec![P0_IN / 1.2, P0_IN / 1.25, P0_IN / 1.2]);
    template
}

fn assert_middle_point_did_not_converge(map: &PerformanceMap) {
    assert_eq!(map.rows.len(), 3);
    let statuses: Vec<PointStatus> = map.rows.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [PointStatus::Converged, PointStatus::NotConverged, PointStatus::Converged]
    );
    let stuck = &map.rows[1];
    assert_eq!(stuck.index, vec![0, 0, 0, 1, 0, 0]);
    assert!(stuck.results.is_none());
    assert!(stuck.message.as_deref().unwrap().contains("did not converge"));
    for row in [&map.rows[0], &map.rows[2]] {
        let solver = &row.results.as_ref().unwrap().solver;
        assert_eq!(solver.iterations, 0);
        assert!(solver.strategy.contains("warm start"), "{}", solver.strategy);
    }
}

#[test]
fn sweep_continues_past_a_non_converged_point() {
    init_tracing();
    let design = design_point_map(&stator_case());
    let case = one_iteration_case();
    case.validate().unwrap();
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();

    let map = run_from(&series, &revisit_sweep(), &design).unwrap();
    assert_middle_point_did_not_converge(&map);
    let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
    assert_eq!(json["rows"][1]["status"], "not_converged");

    // Without anything to continue from, every point exhausts its budget
    let cold = run(&series, &revisit_sweep()).unwrap();
    assert_eq!(cold.rows.len(), 3);
    assert!(cold.rows.iter().all(|r| r.status == PointStatus::NotConverged));
}

#[test]
fn parallel_sweep_isolates_a_non_converged_point() {
    init_tracing();
    let design = design_point_map(&stator_case());
    let case = one_iteration_case();
    let fluid = case.fluid().unwrap();
    let series = case.series(&fluid).unwrap();

    let map = run_parallel_from(&series, &revisit_sweep(), &design).unwrap();
    assert_middle_point_did_not_converge(&map);
}
