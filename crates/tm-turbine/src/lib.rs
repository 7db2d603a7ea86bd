//! tm-turbine: meanline model of an axial turbine cascade series.
//!
//! Provides:
//! - Row geometry with derived radii, areas and blade ratios (`geometry`)
//! - Velocity triangles (`kinematics`)
//! - Loss correlations and their tuning (`loss`)
//! - Subsonic exit angle models (`deviation`)
//! - Critical throat state and blockage (`choking`)
//! - The coupled solve of every plane of the series (`series`) and the
//!   performance tables built from it (`results`)
//!
//! # Example
//!
//! ```no_run
//! use tm_fluids::Fluid;
//! use tm_turbine::{
//!     CascadeSeries, Geometry, GeometryInput, LossModelConfig, ModelOptions, OperationPoint,
//!     SolverOptions,
//! };
//!
//! # fn geometry_input() -> GeometryInput { unimplemented!() }
//! let fluid = Fluid::perfect_gas("air").unwrap();
//! let geometry = Geometry::from_input(&geometry_input()).unwrap();
//! let series = CascadeSeries::new(
//!     &fluid,
//!     geometry,
//!     ModelOptions::new(LossModelConfig::custom(0.1)),
//!     SolverOptions::default(),
//! )
//! .unwrap();
//! let op = OperationPoint {
//!     fluid_name: "air".into(),
//!     p0_in: 1.082e5,
//!     t0_in: 310.0,
//!     p_out: 1.082e5 / 1.2,
//!     alpha_in: 0.0,
//!     omega: 2036.0,
//! };
//! let solution = series.solve(&op, None).unwrap();
//! println!("mass flow: {} kg/s", solution.results.overall.mass_flow_rate);
//! ```

pub mod choking;
pub mod deviation;
pub mod error;
pub mod geometry;
pub mod initial_guess;
pub mod kinematics;
pub mod loss;
pub mod operation;
pub mod options;
pub mod plane;
pub mod results;
pub mod series;

// Re-exports
pub use choking::{BlockageModel, CriticalState};
pub use deviation::DeviationModel;
pub use error::{ChokingError, TurbineError, TurbineResult};
pub use geometry::{CascadeType, Geometry, GeometryInput, RangeReport, RangeViolation, RowGeometry};
pub use initial_guess::{GuessParameters, guess_grid};
pub use kinematics::VelocityTriangle;
pub use loss::{LossBreakdown, LossCoefficient, LossModel, LossModelConfig, LossTuning};
pub use operation::OperationPoint;
pub use options::{ChokingCondition, ModelOptions, SolverMethod, SolverOptions};
pub use plane::{PlaneLocation, PlaneState};
pub use results::{
    CascadePerformance, EfficiencyDrop, OverallPerformance, SolverReport, StagePerformance, TurbineResults,
};
pub use series::{CascadeSeries, ReferenceValues, TurbineSolution};
