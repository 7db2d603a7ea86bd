//! Perfect-gas lookups through a per-run context.

use tm_fluids::{Fluid, FluidConfig, FluidModel, Species, StateInput};
use tm_core::units::{k, pa};

#[test]
fn isentropic_expansion_matches_closed_form() {
    let air = Fluid::perfect_gas("air").unwrap();
    let ctx = air.context();
    let inlet = ctx.pt(4.0e5, 600.0).unwrap();
    let out = ctx.ps(1.0e5, inlet.s).unwrap();
    let gamma = inlet.gamma;
    let expected = 600.0 * (0.25f64).powf((gamma - 1.0) / gamma);
    assert!((out.t.value - expected).abs() < 1e-6);
}

#[test]
fn stagnation_state_from_static_and_velocity() {
    let n2 = Fluid::perfect_gas("nitrogen").unwrap();
    let ctx = n2.context();
    let st = ctx.pt(1.0e5, 300.0).unwrap();
    let v = 100.0;
    let st0 = ctx.hs(st.h + 0.5 * v * v, st.s).unwrap();
    assert!(st0.p.value > st.p.value);
    assert!((st0.t.value - (300.0 + 0.5 * v * v / st.cp)).abs() < 1e-6);
}

#[test]
fn reference_states_for_presets() {
    let fluid = Fluid::from_config(&FluidConfig::perfect_gas("CO2")).unwrap();
    let refs = fluid.reference_states().unwrap();
    assert!((refs.critical.p - 7.3773e6).abs() < 1.0);
    assert!((refs.triple.t - 216.592).abs() < 1e-9);
    assert_eq!(fluid.model().molar_mass(), Species::CO2.molar_mass());
}

#[test]
fn direct_lookup_reports_property_lookup() {
    let air = Fluid::perfect_gas("air").unwrap();
    let err = air
        .state(StateInput::PT {
            p: pa(-1.0),
            t: k(300.0),
        })
        .unwrap_err();
    assert!(err.to_string().contains("air"));
}

#[cfg(not(feature = "coolprop"))]
#[test]
fn coolprop_backend_requires_feature() {
    let cfg: FluidConfig =
        serde_json::from_str(r#"{"name":"co2","backend":"coolprop"}"#).unwrap();
    assert!(Fluid::from_config(&cfg).is_err());
}
