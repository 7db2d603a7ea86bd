//! tm-cycle: closed Brayton cycles solved component by component.
//!
//! Provides:
//! - Compressors, pumps and turbines with isentropic or polytropic efficiency
//! - Recuperators specified by effectiveness, heaters and coolers with optional
//!   external fluid loops, and counter-current pinch evaluation
//! - Recuperated and recompression (split compression) topologies
//!
//! All components implement `TwoPortComponent` or exchange heat between two
//! streams, and the network evaluates them in topological order at a fixed
//! net power.
//!
//! # Example
//!
//! ```no_run
//! use tm_cycle::{
//!     Cycle, CycleParameters, CycleTopology, ExchangerSpec, MachineSpec, ThermalSpec,
//! };
//! use tm_fluids::FluidConfig;
//!
//! let params = CycleParameters {
//!     topology: CycleTopology::Recuperated,
//!     working_fluid: FluidConfig::perfect_gas("air"),
//!     net_power: 1.0e6,
//!     p_high: 4.0e5,
//!     t_high: 1100.0,
//!     p_low: 1.0e5,
//!     t_low: 300.0,
//!     compressor: MachineSpec::isentropic(0.85),
//!     turbine: MachineSpec::isentropic(0.9),
//!     recuperator: ExchangerSpec::new(0.8, 0.01, 0.01),
//!     heater: ThermalSpec::new(0.01),
//!     cooler: ThermalSpec::new(0.01),
//!     recompressor: None,
//!     low_temperature_recuperator: None,
//!     split_fraction: None,
//! };
//! let results = Cycle::new(params).unwrap().solve().unwrap();
//! println!("efficiency: {:.3}", results.cycle_efficiency);
//! ```

pub mod common;
pub mod error;
pub mod heat_exchanger;
pub mod network;
pub mod parameters;
pub mod results;
pub mod traits;
pub mod turbomachine;

// Re-exports
pub use error::{CycleError, CycleResult};
pub use heat_exchanger::{
    ExchangerSpec, ExternalFluid, ExternalLoop, Pinch, Recuperator, Stream, ThermalSpec, Transfer, pinch,
};
pub use network::{Cycle, CycleFluids};
pub use parameters::{CycleParameters, CycleTopology};
pub use results::{CycleResults, ExchangerReport, ExternalLoopReport, JunctionState, MachineReport};
pub use traits::TwoPortComponent;
pub use turbomachine::{EfficiencyType, MachineKind, MachineSpec, Turbomachine};
