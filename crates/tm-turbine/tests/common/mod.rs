//! Shared cases for the series integration tests.
#![allow(dead_code)]

use tm_core::numeric::acosd;
use tm_turbine::{CascadeType, GeometryInput, OperationPoint};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Single stator with a cylindrical annulus.
pub fn stator_geometry() -> GeometryInput {
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
        metal_angle_te: vec![acosd(opening / pitch)],
        thickness_te: vec![5.0e-4],
        tip_clearance: vec![0.0],
        thickness_max: vec![4.0e-3],
        throat_location_fraction: None,
    }
}

/// Stator followed by a rotor with a slightly flared annulus.
pub fn stage_geometry() -> GeometryInput {
    let stator_opening = 0.7505e-2 * (1.0 - 0.064);
    let stator_pitch = 1.8962e-2;
    let rotor_pitch = 1.35e-2;
    let rotor_opening = 0.4226 * rotor_pitch;
    GeometryInput {
        cascade_type: vec![CascadeType::Stator, CascadeType::Rotor],
        radius_hub: vec![0.084, 0.084, 0.084, 0.084],
        radius_tip: vec![0.097, 0.097, 0.097, 0.098],
        pitch: vec![stator_pitch, rotor_pitch],
        chord: vec![2.2655e-2, 1.8e-2],
        stagger_angle: vec![43.0, -20.0],
        opening: vec![stator_opening, rotor_opening],
        diameter_le: vec![2.0e-3, 1.5e-3],
        wedge_angle_le: vec![45.0, 40.0],
        metal_angle_le: vec![0.0, 27.0],
        metal_angle_te: vec![acosd(stator_opening / stator_pitch), -acosd(rotor_opening / rotor_pitch)],
        thickness_te: vec![5.0e-4, 4.0e-4],
        tip_clearance: vec![0.0, 3.0e-4],
        thickness_max: vec![4.0e-3, 3.0e-3],
        throat_location_fraction: None,
    }
}

pub fn operation_point(pressure_ratio: f64) -> OperationPoint {
    OperationPoint {
        fluid_name: "air".into(),
        p0_in: 10.82e4,
        t0_in: 310.0,
        p_out: 10.82e4 / pressure_ratio,
        alpha_in: 0.0,
        omega: 2036.0,
    }
}
