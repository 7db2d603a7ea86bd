//! tm-fluids: fluid property calculations for the turbomachinery workspace.
//!
//! Provides:
//! - Species definitions with perfect-gas presets and critical/triple points
//! - Thermodynamic state representation (`FluidState`, `StateInput`)
//! - `FluidModel` trait with a perfect-gas backend and an optional CoolProp backend
//! - `Fluid` (name + backend + exception policy) and per-run `FluidContext`
//!   caches with a fail-soft frozen-property surrogate
//!
//! # Example
//!
//! ```
//! use tm_fluids::{Fluid, StateInput};
//! use tm_core::units::{pa, k};
//!
//! let air = Fluid::perfect_gas("air").unwrap();
//! let ctx = air.context();
//! let state = ctx
//!     .state(StateInput::PT { p: pa(101325.0), t: k(300.0) })
//!     .unwrap();
//! assert!(state.rho.value > 1.1);
//! ```

#[cfg(feature = "coolprop")]
pub mod coolprop;
pub mod error;
pub mod fluid;
pub mod model;
pub mod perfect_gas;
pub mod species;
pub mod state;
pub mod surrogate;

#[cfg(feature = "coolprop")]
pub use coolprop::CoolPropModel;
pub use error::{FluidError, FluidResult};
pub use fluid::{Backend, CacheStats, ExceptionPolicy, Fluid, FluidConfig, FluidContext, MAX_CACHED_STATES};
pub use model::{FluidModel, ReferencePoint, ReferenceStates};
pub use perfect_gas::{PerfectGas, Viscosity};
pub use species::Species;
pub use state::{FluidState, SpecEnthalpy, SpecEntropy, SpecHeatCapacity, StateInput};
pub use surrogate::FrozenPropertySurrogate;
