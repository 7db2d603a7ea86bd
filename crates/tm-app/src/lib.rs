//! tm-app: drivers built on the turbine and cycle solvers.
//!
//! This crate owns the resolved case documents and the two drivers that run a
//! model many times: the performance map over a sweep of operation points and
//! the design optimizer over named variables.

pub mod config;
pub mod error;
pub mod optimization;
pub mod performance_map;

// Re-export key types for convenience
pub use config::{CycleCase, TurbineCase, Validate, from_json, load_json, save_json};
pub use error::{AppError, AppResult};
pub use optimization::{
    Bound, Comparison, Constraint, ConstraintViolationWarning, CycleDesignProblem, DesignProblem, DesignVariable,
    Direction, OptimizationCase, OptimizationResult, OptimizerSettings, ReferenceQuantity, TurbineDesignProblem,
    Values, optimize,
};
pub use performance_map::{
    MapRow, OneOrMany, OperationTemplate, PerformanceMap, PointStatus, run, run_from, run_parallel, run_parallel_from,
};
