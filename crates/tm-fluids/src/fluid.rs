//! Configured fluids and per-run property contexts.

use crate::error::{FluidError, FluidResult};
use crate::model::{FluidModel, ReferenceStates};
use crate::perfect_gas::PerfectGas;
use crate::species::Species;
use crate::state::{FluidState, StateInput};
use crate::surrogate::FrozenPropertySurrogate;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tm_core::units::{k, pa};
use tracing::{debug, warn};

/// Property backend selected for a fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    PerfectGas,
    #[serde(rename = "coolprop")]
    CoolProp,
}

/// What to do when a backend lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionPolicy {
    /// Propagate the failure as a `PropertyLookup` error.
    #[default]
    FailHard,
    /// Substitute a frozen-property surrogate anchored at the last valid state.
    FailSoft,
}

fn default_exceptions() -> bool {
    true
}

/// Resolved fluid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluidConfig {
    pub name: String,
    #[serde(default)]
    pub backend: Backend,
    /// `true` raises on failed lookups, `false` enables the fail-soft surrogate.
    #[serde(default = "default_exceptions")]
    pub exceptions: bool,
}

impl FluidConfig {
    pub fn perfect_gas(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: Backend::PerfectGas,
            exceptions: true,
        }
    }
}

/// An immutable, named fluid bound to a property backend.
///
/// Cheap to clone; the backend is shared behind an `Arc`.
#[derive(Clone)]
pub struct Fluid {
    name: String,
    backend: Backend,
    policy: ExceptionPolicy,
    model: Arc<dyn FluidModel>,
}

impl fmt::Debug for Fluid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fluid")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .field("model", &self.model.name())
            .finish()
    }
}

impl Fluid {
    /// Wrap an existing model.
    pub fn new(
        name: impl Into<String>,
        backend: Backend,
        policy: ExceptionPolicy,
        model: Arc<dyn FluidModel>,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            policy,
            model,
        }
    }

    /// Build a fluid from its resolved configuration.
    pub fn from_config(config: &FluidConfig) -> FluidResult<Self> {
        let species: Species = config.name.parse()?;
        let model: Arc<dyn FluidModel> = match config.backend {
            Backend::PerfectGas => Arc::new(PerfectGas::preset(species)?),
            Backend::CoolProp => coolprop_model(species)?,
        };
        let policy = if config.exceptions {
            ExceptionPolicy::FailHard
        } else {
            ExceptionPolicy::FailSoft
        };
        Ok(Self::new(config.name.clone(), config.backend, policy, model))
    }

    /// Perfect-gas fluid with the fail-hard policy.
    pub fn perfect_gas(name: &str) -> FluidResult<Self> {
        Self::from_config(&FluidConfig::perfect_gas(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn policy(&self) -> ExceptionPolicy {
        self.policy
    }

    pub fn with_policy(mut self, policy: ExceptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &dyn FluidModel {
        self.model.as_ref()
    }

    pub fn reference_states(&self) -> FluidResult<ReferenceStates> {
        self.model.reference_states()
    }

    /// Direct backend lookup. Failures are reported as `PropertyLookup`.
    ///
    /// There is no anchor outside a [`FluidContext`], so no surrogate is possible.
    pub fn state(&self, input: StateInput) -> FluidResult<FluidState> {
        self.model
            .state(input)
            .and_then(|st| st.validate().map(|_| st))
            .map_err(|e| self.lookup_error(&input, e))
    }

    /// Open a per-run context with its own cache and fail-soft anchor.
    pub fn context(&self) -> FluidContext<'_> {
        FluidContext::new(self)
    }

    fn lookup_error(&self, input: &StateInput, err: FluidError) -> FluidError {
        match err {
            e @ FluidError::PropertyLookup { .. } => e,
            e => FluidError::PropertyLookup {
                fluid: self.name.clone(),
                input: input.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(feature = "coolprop")]
fn coolprop_model(species: Species) -> FluidResult<Arc<dyn FluidModel>> {
    Ok(Arc::new(crate::coolprop::CoolPropModel::new(species)))
}

#[cfg(not(feature = "coolprop"))]
fn coolprop_model(_species: Species) -> FluidResult<Arc<dyn FluidModel>> {
    Err(FluidError::NotSupported {
        what: "built without the `coolprop` feature",
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: &'static str,
    a: u64,
    b: u64,
}

impl From<&StateInput> for CacheKey {
    fn from(input: &StateInput) -> Self {
        let (a, b) = input.values();
        Self {
            kind: input.kind(),
            a: a.to_bits(),
            b: b.to_bits(),
        }
    }
}

/// Cache statistics for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub fallbacks: u64,
}

/// Entries a context keeps before it starts over with an empty cache.
pub const MAX_CACHED_STATES: usize = 20_000;

/// Per-run property context: an exact-input cache and the fail-soft anchor.
///
/// Owned by a single solve and never shared between threads. The cache is
/// bounded by [`MAX_CACHED_STATES`] and can be dropped between attempts with
/// [`FluidContext::clear_cache`]; the anchor and the counters survive both.
pub struct FluidContext<'a> {
    fluid: &'a Fluid,
    cache: RefCell<HashMap<CacheKey, FluidState>>,
    anchor: RefCell<Option<FrozenPropertySurrogate>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
    fallbacks: Cell<u64>,
}

impl<'a> FluidContext<'a> {
    pub fn new(fluid: &'a Fluid) -> Self {
        Self {
            fluid,
            cache: RefCell::new(HashMap::new()),
            anchor: RefCell::new(None),
            hits: Cell::new(0),
            misses: Cell::new(0),
            fallbacks: Cell::new(0),
        }
    }

    pub fn fluid(&self) -> &'a Fluid {
        self.fluid
    }

    /// Look up a state, honouring the fluid's exception policy.
    pub fn state(&self, input: StateInput) -> FluidResult<FluidState> {
        let key = CacheKey::from(&input);
        if let Some(st) = self.cache.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(st.clone());
        }
        self.misses.set(self.misses.get() + 1);

        let st = match self.fluid.state(input) {
            Ok(st) => {
                *self.anchor.borrow_mut() = Some(FrozenPropertySurrogate::from_state(&st));
                st
            }
            Err(err) => self.fallback(input, err)?,
        };
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= MAX_CACHED_STATES {
            debug!(fluid = %self.fluid.name, entries = cache.len(), "property cache full, clearing");
            cache.clear();
        }
        cache.insert(key, st.clone());
        Ok(st)
    }

    /// Forget every cached state.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of states currently cached.
    pub fn cached_states(&self) -> usize {
        self.cache.borrow().len()
    }

    fn fallback(&self, input: StateInput, err: FluidError) -> FluidResult<FluidState> {
        if self.fluid.policy != ExceptionPolicy::FailSoft {
            return Err(err);
        }
        let anchor = self.anchor.borrow();
        let Some(surrogate) = anchor.as_ref() else {
            return Err(err);
        };
        let st = surrogate.state(input).map_err(|_| err.clone())?;
        self.fallbacks.set(self.fallbacks.get() + 1);
        if surrogate.is_in_valid_range(st.p.value, st.t.value) {
            warn!(fluid = %self.fluid.name, %input, %err, "property lookup failed, using frozen surrogate");
        } else {
            warn!(
                fluid = %self.fluid.name,
                %input,
                anchor_p = surrogate.ref_pressure(),
                anchor_t = surrogate.ref_temperature(),
                "frozen surrogate used far from its anchor"
            );
        }
        Ok(st)
    }

    pub fn pt(&self, p: f64, t: f64) -> FluidResult<FluidState> {
        self.state(StateInput::PT { p: pa(p), t: k(t) })
    }

    pub fn ph(&self, p: f64, h: f64) -> FluidResult<FluidState> {
        self.state(StateInput::PH { p: pa(p), h })
    }

    pub fn hs(&self, h: f64, s: f64) -> FluidResult<FluidState> {
        self.state(StateInput::HS { h, s })
    }

    pub fn ps(&self, p: f64, s: f64) -> FluidResult<FluidState> {
        self.state(StateInput::PS { p: pa(p), s })
    }

    pub fn rho_h(&self, rho: f64, h: f64) -> FluidResult<FluidState> {
        self.state(StateInput::RhoH { rho_kg_m3: rho, h })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            fallbacks: self.fallbacks.get(),
        }
    }

    pub fn log_stats(&self) {
        let s = self.stats();
        debug!(
            fluid = %self.fluid.name,
            hits = s.hits,
            misses = s.misses,
            fallbacks = s.fallbacks,
            "property cache statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that rejects everything above a pressure ceiling.
    struct Ceiling {
        inner: PerfectGas,
        p_max: f64,
    }

    impl FluidModel for Ceiling {
        fn name(&self) -> &str {
            "ceiling"
        }
        fn state(&self, input: StateInput) -> FluidResult<FluidState> {
            let st = self.inner.state(input)?;
            if st.p.value > self.p_max {
                return Err(FluidError::OutOfRange { what: "pressure" });
            }
            Ok(st)
        }
        fn reference_states(&self) -> FluidResult<ReferenceStates> {
            self.inner.reference_states()
        }
        fn molar_mass(&self) -> f64 {
            self.inner.molar_mass()
        }
    }

    fn ceiling_fluid(policy: ExceptionPolicy) -> Fluid {
        let model = Ceiling {
            inner: PerfectGas::preset(Species::Air).unwrap(),
            p_max: 2.0e5,
        };
        Fluid::new("air", Backend::PerfectGas, policy, Arc::new(model))
    }

    #[test]
    fn config_defaults() {
        let cfg: FluidConfig = serde_json::from_str(r#"{"name":"air"}"#).unwrap();
        assert_eq!(cfg.backend, Backend::PerfectGas);
        assert!(cfg.exceptions);
        let err = serde_json::from_str::<FluidConfig>(r#"{"name":"air","colour":"blue"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn unknown_fluid_name() {
        let err = Fluid::perfect_gas("unobtainium").unwrap_err();
        assert!(matches!(err, FluidError::UnknownFluid { .. }));
    }

    #[test]
    fn cache_counts_hits() {
        let fluid = Fluid::perfect_gas("air").unwrap();
        let ctx = fluid.context();
        ctx.pt(1.0e5, 300.0).unwrap();
        ctx.pt(1.0e5, 300.0).unwrap();
        ctx.pt(1.0e5, 301.0).unwrap();
        let stats = ctx.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn cache_stays_bounded() {
        let fluid = Fluid::perfect_gas("air").unwrap();
        let ctx = fluid.context();
        for i in 0..MAX_CACHED_STATES + 10 {
            ctx.pt(1.0e5, 300.0 + i as f64 * 1e-3).unwrap();
        }
        assert_eq!(ctx.cached_states(), 10);
        assert_eq!(ctx.stats().misses, (MAX_CACHED_STATES + 10) as u64);

        ctx.clear_cache();
        assert_eq!(ctx.cached_states(), 0);
        ctx.pt(1.0e5, 300.0).unwrap();
        assert_eq!(ctx.stats().hits, 0);
    }

    #[test]
    fn fail_hard_raises_property_lookup() {
        let fluid = ceiling_fluid(ExceptionPolicy::FailHard);
        let ctx = fluid.context();
        ctx.pt(1.0e5, 300.0).unwrap();
        let err = ctx.pt(3.0e5, 300.0).unwrap_err();
        assert!(matches!(err, FluidError::PropertyLookup { .. }));
    }

    #[test]
    fn fail_soft_substitutes_surrogate() {
        let fluid = ceiling_fluid(ExceptionPolicy::FailSoft);
        let ctx = fluid.context();
        let ok = ctx.pt(1.9e5, 300.0).unwrap();
        assert!(!ok.fallback);
        let st = ctx.pt(2.5e5, 310.0).unwrap();
        assert!(st.fallback);
        assert!((st.t.value - 310.0).abs() < 1e-9);
        assert_eq!(ctx.stats().fallbacks, 1);
    }

    #[test]
    fn fail_soft_without_anchor_still_raises() {
        let fluid = ceiling_fluid(ExceptionPolicy::FailSoft);
        let ctx = fluid.context();
        assert!(ctx.pt(3.0e5, 300.0).is_err());
    }
}
