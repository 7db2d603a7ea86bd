//! Cascade geometry: validated input arrays and the derived per-row quantities.
//!
//! Rows are numbered in flow order. Row `i` owns the hub/tip radii at indices
//! `2i` (inlet) and `2i + 1` (exit) of the interleaved radius arrays.

use crate::error::{TurbineError, TurbineResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tm_core::numeric::{atand, cosd};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeType {
    Stator,
    Rotor,
}

impl fmt::Display for CascadeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeType::Stator => f.write_str("stator"),
            CascadeType::Rotor => f.write_str("rotor"),
        }
    }
}

/// Geometry as supplied by the configuration, one entry per row unless noted.
///
/// Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryInput {
    pub cascade_type: Vec<CascadeType>,
    /// Inlet and exit hub radius of every row, interleaved (length 2n)
    pub radius_hub: Vec<f64>,
    /// Inlet and exit tip radius of every row, interleaved (length 2n)
    pub radius_tip: Vec<f64>,
    pub pitch: Vec<f64>,
    pub chord: Vec<f64>,
    pub stagger_angle: Vec<f64>,
    pub opening: Vec<f64>,
    pub diameter_le: Vec<f64>,
    pub wedge_angle_le: Vec<f64>,
    pub metal_angle_le: Vec<f64>,
    pub metal_angle_te: Vec<f64>,
    pub thickness_te: Vec<f64>,
    pub tip_clearance: Vec<f64>,
    pub thickness_max: Vec<f64>,
    /// Axial position of the throat between inlet (0) and exit (1); defaults to 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throat_location_fraction: Option<Vec<f64>>,
}

impl GeometryInput {
    pub fn number_of_rows(&self) -> usize {
        self.cascade_type.len()
    }

    fn per_row_fields(&self) -> [(&'static str, &[f64]); 11] {
        [
            ("pitch", &self.pitch),
            ("chord", &self.chord),
            ("stagger_angle", &self.stagger_angle),
            ("opening", &self.opening),
            ("diameter_le", &self.diameter_le),
            ("wedge_angle_le", &self.wedge_angle_le),
            ("metal_angle_le", &self.metal_angle_le),
            ("metal_angle_te", &self.metal_angle_te),
            ("thickness_te", &self.thickness_te),
            ("tip_clearance", &self.tip_clearance),
            ("thickness_max", &self.thickness_max),
        ]
    }

    /// Check array lengths, finiteness and signs. All violations are collected.
    pub fn validate(&self) -> TurbineResult<()> {
        let n = self.number_of_rows();
        let mut errors = Vec::new();
        if n == 0 {
            errors.push("cascade_type must list at least one row".to_string());
        }
        for (i, kind) in self.cascade_type.iter().enumerate() {
            let expected = if i % 2 == 0 { CascadeType::Stator } else { CascadeType::Rotor };
            if *kind != expected {
                errors.push(format!("cascade_type[{i}] = {kind}, rows must alternate starting with a stator"));
            }
        }

        let mut check = |name: &str, values: &[f64], expected: usize, signed: bool| {
            if values.len() != expected {
                errors.push(format!(
                    "{name} has {} entries, expected {expected}",
                    values.len()
                ));
            }
            for (i, v) in values.iter().enumerate() {
                if !v.is_finite() {
                    errors.push(format!("{name}[{i}] is not finite"));
                } else if !signed && *v < 0.0 {
                    errors.push(format!("{name}[{i}] = {v} must be non-negative"));
                }
            }
        };

        check("radius_hub", &self.radius_hub, 2 * n, false);
        check("radius_tip", &self.radius_tip, 2 * n, false);
        for (name, values) in self.per_row_fields() {
            check(name, values, n, name.ends_with("_angle") || name.starts_with("metal_angle"));
        }
        if let Some(f) = &self.throat_location_fraction {
            check("throat_location_fraction", f, n, false);
            for (i, v) in f.iter().enumerate() {
                if *v > 1.0 {
                    errors.push(format!("throat_location_fraction[{i}] = {v} exceeds 1"));
                }
            }
        }

        for (i, (h, t)) in self.radius_hub.iter().zip(&self.radius_tip).enumerate() {
            if t <= h {
                errors.push(format!("radius_tip[{i}] = {t} must exceed radius_hub[{i}] = {h}"));
            }
        }
        for (i, (o, s)) in self.opening.iter().zip(&self.pitch).enumerate() {
            if *o <= 0.0 || o > s {
                errors.push(format!("opening[{i}] = {o} must lie in (0, pitch = {s}]"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TurbineError::Geometry { errors })
        }
    }
}

/// Input and derived geometry of one row. Lengths in m, areas in m², angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowGeometry {
    pub index: usize,
    pub cascade_type: CascadeType,

    pub pitch: f64,
    pub chord: f64,
    pub stagger_angle: f64,
    pub opening: f64,
    pub diameter_le: f64,
    pub wedge_angle_le: f64,
    pub metal_angle_le: f64,
    pub metal_angle_te: f64,
    pub thickness_te: f64,
    pub tip_clearance: f64,
    pub thickness_max: f64,
    pub throat_location_fraction: f64,

    pub radius_hub_in: f64,
    pub radius_hub_out: f64,
    pub radius_hub_throat: f64,
    pub radius_tip_in: f64,
    pub radius_tip_out: f64,
    pub radius_tip_throat: f64,
    pub radius_shroud_in: f64,
    pub radius_shroud_out: f64,
    pub radius_shroud_throat: f64,
    pub radius_mean_in: f64,
    pub radius_mean_out: f64,
    pub radius_mean_throat: f64,

    pub area_in: f64,
    pub area_out: f64,
    pub area_throat: f64,
    pub height_in: f64,
    pub height_out: f64,
    /// Mean of inlet and exit blade heights
    pub height: f64,
    pub axial_chord: f64,
    /// Meridional flaring angle [deg]
    pub flaring_angle: f64,

    pub hub_tip_ratio_in: f64,
    pub hub_tip_ratio_out: f64,
    pub hub_tip_ratio_throat: f64,
    /// height / axial chord
    pub aspect_ratio: f64,
    pub pitch_to_chord: f64,
    pub thickness_max_to_chord: f64,
    pub thickness_te_to_opening: f64,
    pub tip_clearance_to_height: f64,
    pub diameter_le_to_chord: f64,
    pub opening_to_pitch: f64,
}

impl RowGeometry {
    /// Rotors sit at odd positions; validation keeps the two consistent.
    pub fn is_rotating(&self) -> bool {
        self.cascade_type == CascadeType::Rotor
    }

    /// Angular speed seen by this row.
    pub fn angular_speed(&self, omega: f64) -> f64 {
        if self.is_rotating() { omega } else { 0.0 }
    }
}

/// Throat radius between inlet and exit at fraction `f` of the passage.
pub fn throat_radius(r_in: f64, r_out: f64, f: f64) -> f64 {
    (1.0 - f) * r_in + f * r_out
}

fn annulus(r_hub: f64, r_tip: f64) -> f64 {
    PI * (r_tip * r_tip - r_hub * r_hub)
}

/// Full geometry of the cascade series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    rows: Vec<RowGeometry>,
}

impl Geometry {
    /// Validate the input and derive every per-row quantity.
    pub fn from_input(input: &GeometryInput) -> TurbineResult<Self> {
        input.validate()?;
        let n = input.number_of_rows();
        let rows = (0..n)
            .map(|i| {
                let f = input
                    .throat_location_fraction
                    .as_ref()
                    .map_or(1.0, |v| v[i]);
                let (hub_in, hub_out) = (input.radius_hub[2 * i], input.radius_hub[2 * i + 1]);
                let (tip_in, tip_out) = (input.radius_tip[2 * i], input.radius_tip[2 * i + 1]);
                let clearance = input.tip_clearance[i];
                let hub_throat = throat_radius(hub_in, hub_out, f);
                let tip_throat = throat_radius(tip_in, tip_out, f);
                let chord = input.chord[i];
                let axial_chord = chord * cosd(input.stagger_angle[i]);
                let height_in = tip_in - hub_in;
                let height_out = tip_out - hub_out;
                let height = 0.5 * (height_in + height_out);

                RowGeometry {
                    index: i,
                    cascade_type: input.cascade_type[i],
                    pitch: input.pitch[i],
                    chord,
                    stagger_angle: input.stagger_angle[i],
                    opening: input.opening[i],
                    diameter_le: input.diameter_le[i],
                    wedge_angle_le: input.wedge_angle_le[i],
                    metal_angle_le: input.metal_angle_le[i],
                    metal_angle_te: input.metal_angle_te[i],
                    thickness_te: input.thickness_te[i],
                    tip_clearance: clearance,
                    thickness_max: input.thickness_max[i],
                    throat_location_fraction: f,
                    radius_hub_in: hub_in,
                    radius_hub_out: hub_out,
                    radius_hub_throat: hub_throat,
                    radius_tip_in: tip_in,
                    radius_tip_out: tip_out,
                    radius_tip_throat: tip_throat,
                    radius_shroud_in: tip_in + clearance,
                    radius_shroud_out: tip_out + clearance,
                    radius_shroud_throat: tip_throat + clearance,
                    radius_mean_in: 0.5 * (hub_in + tip_in),
                    radius_mean_out: 0.5 * (hub_out + tip_out),
                    radius_mean_throat: 0.5 * (hub_throat + tip_throat),
                    area_in: annulus(hub_in, tip_in),
                    area_out: annulus(hub_out, tip_out),
                    area_throat: annulus(hub_throat, tip_throat),
                    height_in,
                    height_out,
                    height,
                    axial_chord,
                    flaring_angle: atand((height_out - height_in) / (2.0 * axial_chord)),
                    hub_tip_ratio_in: hub_in / tip_in,
                    hub_tip_ratio_out: hub_out / tip_out,
                    hub_tip_ratio_throat: hub_throat / tip_throat,
                    aspect_ratio: height / axial_chord,
                    pitch_to_chord: input.pitch[i] / chord,
                    thickness_max_to_chord: input.thickness_max[i] / chord,
                    thickness_te_to_opening: input.thickness_te[i] / input.opening[i],
                    tip_clearance_to_height: clearance / height,
                    diameter_le_to_chord: input.diameter_le[i] / chord,
                    opening_to_pitch: input.opening[i] / input.pitch[i],
                }
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[RowGeometry] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &RowGeometry {
        &self.rows[i]
    }

    pub fn number_of_rows(&self) -> usize {
        self.rows.len()
    }

    /// Stator-rotor pairs; a trailing unpaired row does not form a stage.
    pub fn number_of_stages(&self) -> usize {
        match self.rows.len() {
            0 | 1 => 0,
            n => n / 2,
        }
    }

    /// Compare every row against the recommended ranges of the loss correlations.
    ///
    /// Entries outside their range are logged and returned; they never fail the call.
    pub fn check_ranges(&self) -> RangeReport {
        let mut report = RangeReport::default();
        for row in &self.rows {
            let rotor = row.cascade_type == CascadeType::Rotor;
            // Rotor blades turn the other way, so their angle limits are mirrored
            let angle = |lo: f64, hi: f64| if rotor { (-hi, -lo) } else { (lo, hi) };
            let min_clearance = if rotor { 2e-4 } else { 0.0 };

            let checks: [(&'static str, f64, (f64, f64)); 16] = [
                ("chord", row.chord, (5e-3, f64::INFINITY)),
                ("height", row.height, (5e-3, f64::INFINITY)),
                ("thickness_max", row.thickness_max, (1e-3, f64::INFINITY)),
                ("thickness_te", row.thickness_te, (5e-4, f64::INFINITY)),
                ("tip_clearance", row.tip_clearance, (min_clearance, f64::INFINITY)),
                ("hub_tip_ratio_in", row.hub_tip_ratio_in, (0.5, 0.95)),
                ("aspect_ratio", row.aspect_ratio, (0.8, 5.0)),
                ("pitch_to_chord", row.pitch_to_chord, (0.3, 1.1)),
                ("stagger_angle", row.stagger_angle, angle(-10.0, 70.0)),
                ("metal_angle_le", row.metal_angle_le, angle(-60.0, 25.0)),
                ("metal_angle_te", row.metal_angle_te, angle(40.0, 80.0)),
                ("wedge_angle_le", row.wedge_angle_le, (10.0, 60.0)),
                ("diameter_le_to_chord", row.diameter_le_to_chord, (0.03, 0.30)),
                ("thickness_max_to_chord", row.thickness_max_to_chord, (0.05, 0.30)),
                ("thickness_te_to_opening", row.thickness_te_to_opening, (0.0, 0.40)),
                ("tip_clearance_to_height", row.tip_clearance_to_height, (0.0, 0.05)),
            ];

            for (quantity, value, (lower, upper)) in checks {
                if value < lower || value > upper {
                    warn!(row = row.index, quantity, value, lower, upper, "geometry outside recommended range");
                    report.violations.push(RangeViolation {
                        row: row.index,
                        quantity,
                        value,
                        lower,
                        upper,
                    });
                }
            }
        }
        report
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeViolation {
    pub row: usize,
    pub quantity: &'static str,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeReport {
    pub violations: Vec<RangeViolation>,
}

impl RangeReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Single stator row with a cylindrical annulus.
    pub(crate) fn stator_input() -> GeometryInput {
        let opening = 0.7505e-2 * (1.0 - 0.064);
        let pitch = 1.8962e-2;
        GeometryInput {
            cascade_type: vec![CascadeType::Stator],
            radius_hub: vec![0.084, 0.084],
            radius_tip: vec![0.097, 0.097],
            pitch: vec![pitch],
            chord: vec![2.2655e-2],
            stagger_angle: vec![43.0],
            opening: vec![opening],
            diameter_le: vec![2.0e-3],
            wedge_angle_le: vec![45.0],
            metal_angle_le: vec![0.0],
            metal_angle_te: vec![tm_core::numeric::acosd(opening / pitch)],
            thickness_te: vec![5.0e-4],
            tip_clearance: vec![0.0],
            thickness_max: vec![4.0e-3],
            throat_location_fraction: None,
        }
    }

    #[test]
    fn derived_quantities() {
        let g = Geometry::from_input(&stator_input()).unwrap();
        let row = g.row(0);
        assert_eq!(g.number_of_stages(), 0);
        assert!((row.radius_mean_out - 0.0905).abs() < 1e-12);
        assert!((row.height - 0.013).abs() < 1e-12);
        let area = PI * (0.097f64.powi(2) - 0.084f64.powi(2));
        assert!((row.area_throat - area).abs() < 1e-12);
        assert!((row.axial_chord - 2.2655e-2 * cosd(43.0)).abs() < 1e-12);
        assert!(row.flaring_angle.abs() < 1e-12);
        assert!(!row.is_rotating());
    }

    #[test]
    fn throat_fraction_moves_throat() {
        let mut input = stator_input();
        input.radius_tip = vec![0.095, 0.101];
        input.throat_location_fraction = Some(vec![5.0 / 6.0]);
        let g = Geometry::from_input(&input).unwrap();
        let row = g.row(0);
        let expected_tip = 0.095 / 6.0 + 5.0 * 0.101 / 6.0;
        assert!((row.radius_tip_throat - expected_tip).abs() < 1e-12);
        assert!(row.area_throat < row.area_out);
        assert!(row.flaring_angle > 0.0);
    }

    #[test]
    fn stage_count() {
        let mut input = stator_input();
        let two = |v: &Vec<f64>| [v.clone(), v.clone()].concat();
        input.cascade_type = vec![CascadeType::Stator, CascadeType::Rotor];
        input.radius_hub = two(&input.radius_hub);
        input.radius_tip = two(&input.radius_tip);
        for field in [
            &mut input.pitch,
            &mut input.chord,
            &mut input.stagger_angle,
            &mut input.opening,
            &mut input.diameter_le,
            &mut input.wedge_angle_le,
            &mut input.metal_angle_le,
            &mut input.metal_angle_te,
            &mut input.thickness_te,
            &mut input.tip_clearance,
            &mut input.thickness_max,
        ] {
            *field = two(field);
        }
        let g = Geometry::from_input(&input).unwrap();
        assert_eq!(g.number_of_stages(), 1);
        assert!(g.row(1).is_rotating());
        assert_eq!(g.row(1).angular_speed(100.0), 100.0);
        assert_eq!(g.row(0).angular_speed(100.0), 0.0);
    }

    #[test]
    fn validation_collects_all_errors() {
        let mut input = stator_input();
        input.chord = vec![-1.0];
        input.radius_hub = vec![0.084];
        let err = Geometry::from_input(&input).unwrap_err();
        match err {
            TurbineError::Geometry { errors } => {
                assert!(errors.iter().any(|e| e.contains("chord[0]")));
                assert!(errors.iter().any(|e| e.contains("radius_hub has 1 entries")));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn negative_angles_are_allowed() {
        let mut input = stator_input();
        input.metal_angle_te = vec![-65.0];
        input.stagger_angle = vec![-40.0];
        assert!(input.validate().is_ok());
    }

    #[test]
    fn unknown_cascade_type_is_rejected() {
        let json = r#"["stator", "impeller"]"#;
        assert!(serde_json::from_str::<Vec<CascadeType>>(json).is_err());
    }

    #[test]
    fn rows_must_alternate_from_a_stator() {
        let mut input = stator_input();
        input.cascade_type = vec![CascadeType::Rotor];
        match input.validate() {
            Err(TurbineError::Geometry { errors }) => {
                assert_eq!(errors.len(), 1, "{errors:?}");
                assert!(errors[0].contains("cascade_type[0] = rotor"));
            }
            other => panic!("expected a geometry error, got {other:?}"),
        }

        let two = |v: &Vec<f64>| [v.clone(), v.clone()].concat();
        let mut input = stator_input();
        input.cascade_type = vec![CascadeType::Stator, CascadeType::Stator];
        input.radius_hub = two(&input.radius_hub);
        input.radius_tip = two(&input.radius_tip);
        for field in [
            &mut input.pitch,
            &mut input.chord,
            &mut input.stagger_angle,
            &mut input.opening,
            &mut input.diameter_le,
            &mut input.wedge_angle_le,
            &mut input.metal_angle_le,
            &mut input.metal_angle_te,
            &mut input.thickness_te,
            &mut input.tip_clearance,
            &mut input.thickness_max,
        ] {
            *field = two(field);
        }
        match input.validate() {
            Err(TurbineError::Geometry { errors }) => {
                assert_eq!(errors.len(), 1, "{errors:?}");
                assert!(errors[0].contains("cascade_type[1] = stator"));
            }
            other => panic!("expected a geometry error, got {other:?}"),
        }
        input.cascade_type[1] = CascadeType::Rotor;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn range_report_flags_low_aspect_ratio() {
        let mut input = stator_input();
        input.radius_tip = vec![0.089, 0.089];
        let g = Geometry::from_input(&input).unwrap();
        let report = g.check_ranges();
        assert!(report.violations.iter().any(|v| v.quantity == "aspect_ratio"));
        assert!(!report.is_clean());
    }
}
