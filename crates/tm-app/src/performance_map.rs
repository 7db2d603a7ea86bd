//! Performance maps: a cascade series solved over a Cartesian sweep of
//! operation points.

use crate::error::{AppError, AppResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tm_turbine::{CascadeSeries, OperationPoint, OverallPerformance, TurbineError, TurbineResults};
use tracing::{info, warn};

/// A template field: one value or a sequence to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn values(&self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(v: T) -> Self {
        OneOrMany::One(v)
    }
}

/// Operation point whose fields may be sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationTemplate {
    pub fluid_name: OneOrMany<String>,
    pub p0_in: OneOrMany<f64>,
    #[serde(rename = "T0_in")]
    pub t0_in: OneOrMany<f64>,
    pub p_out: OneOrMany<f64>,
    pub alpha_in: OneOrMany<f64>,
    pub omega: OneOrMany<f64>,
}

impl From<&OperationPoint> for OperationTemplate {
    fn from(op: &OperationPoint) -> Self {
        Self {
            fluid_name: op.fluid_name.clone().into(),
            p0_in: op.p0_in.into(),
            t0_in: op.t0_in.into(),
            p_out: op.p_out.into(),
            alpha_in: op.alpha_in.into(),
            omega: op.omega.into(),
        }
    }
}

impl OperationTemplate {
    /// Every combination of the template fields with its sweep indices.
    ///
    /// Field order is `fluid_name, p0_in, T0_in, p_out, alpha_in, omega`, and
    /// the last field varies fastest.
    pub fn points(&self) -> AppResult<Vec<(Vec<usize>, OperationPoint)>> {
        let fluids = self.fluid_name.values();
        let axes = [
            self.p0_in.values(),
            self.t0_in.values(),
            self.p_out.values(),
            self.alpha_in.values(),
            self.omega.values(),
        ];
        let names = ["fluid_name", "p0_in", "T0_in", "p_out", "alpha_in", "omega"];
        let lengths: Vec<usize> = std::iter::once(fluids.len())
            .chain(axes.iter().map(Vec::len))
            .collect();
        let empty: Vec<String> = names
            .iter()
            .zip(&lengths)
            .filter(|&(_, &n)| n == 0)
            .map(|(name, _)| format!("{name} has no values to sweep"))
            .collect();
        if !empty.is_empty() {
            return Err(AppError::ConfigValidation { errors: empty });
        }

        let total: usize = lengths.iter().product();
        let mut points = Vec::with_capacity(total);
        for flat in 0..total {
            let mut index = vec![0; lengths.len()];
            let mut rest = flat;
            for (slot, n) in index.iter_mut().zip(&lengths).rev() {
                *slot = rest % n;
                rest /= n;
            }
            let op = OperationPoint {
                fluid_name: fluids[index[0]].clone(),
                p0_in: axes[0][index[1]],
                t0_in: axes[1][index[2]],
                p_out: axes[2][index[3]],
                alpha_in: axes[3][index[4]],
                omega: axes[4][index[5]],
            };
            points.push((index, op));
        }
        Ok(points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    Converged,
    NotConverged,
    PropertyFailure,
    Failed,
}

impl PointStatus {
    fn classify(err: &TurbineError) -> Self {
        if err.is_property_failure() {
            PointStatus::PropertyFailure
        } else if err.is_non_convergence() {
            PointStatus::NotConverged
        } else {
            PointStatus::Failed
        }
    }
}

/// One solved (or failed) point of the map.
#[derive(Debug, Clone, Serialize)]
pub struct MapRow {
    /// Position of the point along each template field
    pub index: Vec<usize>,
    pub operation_point: OperationPoint,
    pub status: PointStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<TurbineResults>,
    /// Physical unknowns of a converged point
    #[serde(skip)]
    pub x: Option<Vec<f64>>,
}

impl MapRow {
    pub fn overall(&self) -> Option<&OverallPerformance> {
        self.results.as_ref().map(|r| &r.overall)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMap {
    pub rows: Vec<MapRow>,
}

impl PerformanceMap {
    pub fn converged(&self) -> impl Iterator<Item = &MapRow> {
        self.rows.iter().filter(|r| r.status == PointStatus::Converged)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn solve_point(
    series: &CascadeSeries<'_>,
    index: Vec<usize>,
    op: OperationPoint,
    warm_start: Option<&[f64]>,
) -> MapRow {
    match series.solve(&op, warm_start) {
        Ok(solution) => {
            info!(?index, mass_flow = solution.results.overall.mass_flow_rate, "map point converged");
            MapRow {
                index,
                operation_point: op,
                status: PointStatus::Converged,
                message: None,
                results: Some(solution.results),
                x: Some(solution.x),
            }
        }
        Err(err) => {
            let status = PointStatus::classify(&err);
            warn!(?index, ?status, error = %err, "map point failed");
            MapRow {
                index,
                operation_point: op,
                status,
                message: Some(err.to_string()),
                results: None,
                x: None,
            }
        }
    }
}

/// Physical unknowns of the converged row closest to `op`.
fn closest<'a>(rows: impl Iterator<Item = &'a MapRow>, op: &OperationPoint) -> Option<Vec<f64>> {
    rows.filter_map(|row| row.x.as_deref().map(|x| (row.operation_point.distance_to(op), x)))
        .filter(|(d, _)| d.is_finite())
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, x)| x.to_vec())
}

/// Solve the sweep in order, warm-starting each point from the closest
/// converged one.
pub fn run(series: &CascadeSeries<'_>, template: &OperationTemplate) -> AppResult<PerformanceMap> {
    run_from(series, template, &PerformanceMap::default())
}

/// Like [`run`], with the converged rows of `previous` also available as
/// warm starts.
pub fn run_from(
    series: &CascadeSeries<'_>,
    template: &OperationTemplate,
    previous: &PerformanceMap,
) -> AppResult<PerformanceMap> {
    let points = template.points()?;
    let mut rows: Vec<MapRow> = Vec::with_capacity(points.len());
    for (index, op) in points {
        let warm = closest(previous.rows.iter().chain(&rows), &op);
        rows.push(solve_point(series, index, op, warm.as_deref()));
    }
    log_summary(&rows);
    Ok(PerformanceMap { rows })
}

/// Solve every point independently on the rayon pool, without continuation.
///
/// Each solve opens its own property cache, so workers share nothing but the
/// immutable series description.
pub fn run_parallel(series: &CascadeSeries<'_>, template: &OperationTemplate) -> AppResult<PerformanceMap> {
    run_parallel_from(series, template, &PerformanceMap::default())
}

/// Parallel sweep warm-started from the closest converged row of `previous`.
pub fn run_parallel_from(
    series: &CascadeSeries<'_>,
    template: &OperationTemplate,
    previous: &PerformanceMap,
) -> AppResult<PerformanceMap> {
    let points = template.points()?;
    let rows: Vec<MapRow> = points
        .into_par_iter()
        .map(|(index, op)| {
            let warm = closest(previous.rows.iter(), &op);
            solve_point(series, index, op, warm.as_deref())
        })
        .collect();
    log_summary(&rows);
    Ok(PerformanceMap { rows })
}

fn log_summary(rows: &[MapRow]) {
    let converged = rows.iter().filter(|r| r.status == PointStatus::Converged).count();
    info!(points = rows.len(), converged, "performance map finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn template() -> OperationTemplate {
        OperationTemplate {
            fluid_name: "air".to_string().into(),
            p0_in: OneOrMany::Many(vec![1.0e5, 2.0e5]),
            t0_in: 300.0.into(),
            p_out: OneOrMany::Many(vec![0.5e5, 0.6e5, 0.7e5]),
            alpha_in: 0.0.into(),
            omega: 0.0.into(),
        }
    }

    #[test]
    fn last_field_varies_fastest() {
        let points = template().points().unwrap();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].0, vec![0, 0, 0, 0, 0, 0]);
        assert_eq!(points[1].0, vec![0, 0, 0, 1, 0, 0]);
        assert_eq!(points[3].0, vec![0, 1, 0, 0, 0, 0]);
        assert_eq!(points[5].1.p0_in, 2.0e5);
        assert_eq!(points[5].1.p_out, 0.7e5);
    }

    #[test]
    fn empty_sequences_are_rejected() {
        let mut t = template();
        t.omega = OneOrMany::Many(vec![]);
        assert!(matches!(t.points(), Err(AppError::ConfigValidation { .. })));
    }

    #[test]
    fn template_parses_scalars_and_sequences() {
        let t: OperationTemplate = serde_json::from_str(
            r#"{"fluid_name": "air", "p0_in": 1e5, "T0_in": [300, 310],
                "p_out": 5e4, "alpha_in": 0, "omega": 0}"#,
        )
        .unwrap();
        assert_eq!(t.points().unwrap().len(), 2);
        let extra = serde_json::from_str::<OperationTemplate>(
            r#"{"fluid_name": "air", "p0_in": 1e5, "T0_in": 300,
                "p_out": 5e4, "alpha_in": 0, "omega": 0, "mass_flow": 1}"#,
        );
        assert!(extra.is_err());
    }

    #[test]
    fn errors_are_classified() {
        let err = TurbineError::InvalidOperationPoint { errors: vec![] };
        assert_eq!(PointStatus::classify(&err), PointStatus::Failed);
        let err = TurbineError::Fluid(tm_fluids::FluidError::UnknownFluid { name: "x".into() });
        assert_eq!(PointStatus::classify(&err), PointStatus::PropertyFailure);
    }

    proptest! {
        #[test]
        fn sweep_size_is_the_product_of_field_lengths(
            n_p0 in 1usize..4,
            n_pout in 1usize..5,
            n_omega in 1usize..4,
        ) {
            let many = |n: usize, base: f64| OneOrMany::Many((0..n).map(|i| base + i as f64).collect());
            let mut t = template();
            t.p0_in = many(n_p0, 2.0e5);
            t.p_out = many(n_pout, 1.0e5);
            t.omega = many(n_omega, 0.0);
            let points = t.points().unwrap();
            prop_assert_eq!(points.len(), n_p0 * n_pout * n_omega);
            // Lexicographic order of the index vectors
            prop_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
            let (index, op) = points.last().unwrap();
            prop_assert_eq!(op.omega, (n_omega - 1) as f64);
            prop_assert_eq!(index[5], n_omega - 1);
        }
    }
}
