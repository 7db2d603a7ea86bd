//! Shared cases for the driver integration tests.
#![allow(dead_code)]

use tm_app::TurbineCase;
use tm_core::numeric::acosd;
use tm_cycle::{CycleParameters, CycleTopology, ExchangerSpec, MachineSpec, ThermalSpec};
use tm_fluids::FluidConfig;
use tm_turbine::{CascadeType, GeometryInput, LossModelConfig, ModelOptions, OperationPoint, SolverOptions};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub const P0_IN: f64 = 10.82e4;

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

pub fn operation_point(pressure_ratio: f64) -> OperationPoint {
    OperationPoint {
        fluid_name: "air".into(),
        p0_in: P0_IN,
        t0_in: 310.0,
        p_out: P0_IN / pressure_ratio,
        alpha_in: 0.0,
        omega: 2036.0,
    }
}

pub fn stator_case() -> TurbineCase {
    TurbineCase {
        fluid: FluidConfig::perfect_gas("air"),
        geometry: stator_geometry(),
        operation_point: operation_point(1.2),
        model_options: ModelOptions::new(LossModelConfig::custom(0.1)),
        solver_options: SolverOptions::default(),
        performance_map: None,
        optimization: None,
    }
}

pub fn recuperated_air() -> CycleParameters {
    CycleParameters {
        topology: CycleTopology::Recuperated,
        working_fluid: FluidConfig::perfect_gas("air"),
        net_power: 1.0e6,
        p_high: 4.0e5,
        t_high: 1100.0,
        p_low: 1.0e5,
        t_low: 300.0,
        compressor: MachineSpec::isentropic(0.85),
        turbine: MachineSpec::isentropic(0.9),
        recuperator: ExchangerSpec::new(0.8, 0.01, 0.01),
        heater: ThermalSpec::new(0.01),
        cooler: ThermalSpec::new(0.01),
        recompressor: None,
        low_temperature_recuperator: None,
        split_fraction: None,
    }
}
