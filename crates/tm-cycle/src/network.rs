//! Component-by-component solve of a cycle topology.
//!
//! Every state is first computed per unit turbine flow. The turbine flow that
//! delivers the requested net power then scales the flowsheet to absolute
//! flows, powers and duties.

use crate::error::{CycleError, CycleResult};
use crate::heat_exchanger::{ExternalLoop, Recuperator, Stream, ThermalSpec, Transfer, pinch};
use crate::parameters::{CycleParameters, CycleTopology};
use crate::results::{CycleResults, ExchangerReport, ExternalLoopReport, JunctionState, MachineReport};
use crate::traits::TwoPortComponent;
use crate::turbomachine::{MachineKind, Turbomachine};
use tm_fluids::{Fluid, FluidContext, FluidState};
use tm_solver::{ScalarConfig, brent_root};
use tracing::{debug, info, warn};

/// Working fluid plus the optional external heating and cooling fluids.
#[derive(Clone)]
pub struct CycleFluids {
    pub working: Fluid,
    pub heating: Option<Fluid>,
    pub cooling: Option<Fluid>,
}

impl CycleFluids {
    pub fn from_parameters(params: &CycleParameters) -> CycleResult<Self> {
        let external = |spec: &ThermalSpec| -> CycleResult<Option<Fluid>> {
            spec.external
                .as_ref()
                .map(|ext| Fluid::from_config(&ext.fluid))
                .transpose()
                .map_err(CycleError::from)
        };
        Ok(Self {
            working: Fluid::from_config(&params.working_fluid)?,
            heating: external(&params.heater)?,
            cooling: external(&params.cooler)?,
        })
    }
}

struct MachinePass {
    machine: Turbomachine,
    inlet: FluidState,
    outlet: FluidState,
    flow: f64,
}

struct RecuperatorPass {
    name: &'static str,
    num_elements: usize,
    hot_in: FluidState,
    cold_in: FluidState,
    transfer: Transfer,
}

/// Working-fluid side of the heater or cooler.
struct ThermalPass {
    inlet: FluidState,
    outlet: FluidState,
    flow: f64,
}

/// Per-unit-turbine-flow solution of one topology.
struct Flowsheet {
    junctions: Vec<(&'static str, FluidState, f64)>,
    machines: Vec<MachinePass>,
    recuperators: Vec<RecuperatorPass>,
    heater: ThermalPass,
    cooler: ThermalPass,
}

/// Recycle branch of the recompression cycle for one HTR cold inlet enthalpy.
struct RecycleLoop {
    htr_cold_in: FluidState,
    htr: Transfer,
    ltr: Transfer,
    recompressor_out: FluidState,
    mixed_h: f64,
}

/// A validated cycle ready to be solved.
pub struct Cycle {
    params: CycleParameters,
    fluids: CycleFluids,
}

impl Cycle {
    pub fn new(params: CycleParameters) -> CycleResult<Self> {
        params.validate()?;
        let fluids = CycleFluids::from_parameters(&params)?;
        Ok(Self { params, fluids })
    }

    pub fn parameters(&self) -> &CycleParameters {
        &self.params
    }

    pub fn solve(&self) -> CycleResult<CycleResults> {
        let ctx = self.fluids.working.context();
        let sheet = match self.params.topology {
            CycleTopology::Recuperated => self.recuperated(&ctx)?,
            CycleTopology::SplitCompression => self.split_compression(&ctx)?,
        };
        let results = self.assemble(&ctx, sheet)?;
        ctx.log_stats();
        info!(
            topology = %results.topology,
            efficiency = results.cycle_efficiency,
            mass_flow = results.mass_flow,
            "cycle solved"
        );
        Ok(results)
    }

    fn recuperated(&self, ctx: &FluidContext<'_>) -> CycleResult<Flowsheet> {
        let params = &self.params;
        let p = params.recuperated_pressures();

        let compressor = Turbomachine::new("compressor", MachineKind::Compressor, params.compressor)?;
        let turbine = Turbomachine::new("turbine", MachineKind::Turbine, params.turbine)?;
        let recuperator = Recuperator::new("recuperator", params.recuperator);

        let s1 = ctx.pt(params.p_low, params.t_low)?;
        let s2 = compressor.outlet_state(ctx, &s1, p.compressor_out)?;
        let s4 = ctx.pt(params.p_high, params.t_high)?;
        let s5 = turbine.outlet_state(ctx, &s4, p.turbine_out)?;
        let rec = recuperator.transfer(ctx, &s5, 1.0, &s2, 1.0)?;
        let (s3, s6) = (rec.cold_out.clone(), rec.hot_out.clone());
        debug!(p_heater_in = p.heater_in, p_cooler_in = p.cooler_in, duty = rec.duty, "recuperated flowsheet");

        Ok(Flowsheet {
            junctions: vec![
                ("compressor_inlet", s1.clone(), 1.0),
                ("compressor_outlet", s2.clone(), 1.0),
                ("heater_inlet", s3.clone(), 1.0),
                ("turbine_inlet", s4.clone(), 1.0),
                ("turbine_outlet", s5.clone(), 1.0),
                ("cooler_inlet", s6.clone(), 1.0),
            ],
            machines: vec![
                MachinePass {
                    machine: compressor,
                    inlet: s1.clone(),
                    outlet: s2.clone(),
                    flow: 1.0,
                },
                MachinePass {
                    machine: turbine,
                    inlet: s4.clone(),
                    outlet: s5.clone(),
                    flow: 1.0,
                },
            ],
            recuperators: vec![RecuperatorPass {
                name: "recuperator",
                num_elements: params.recuperator.num_elements,
                hot_in: s5,
                cold_in: s2,
                transfer: rec,
            }],
            heater: ThermalPass {
                inlet: s3,
                outlet: s4,
                flow: 1.0,
            },
            cooler: ThermalPass {
                inlet: s6,
                outlet: s1,
                flow: 1.0,
            },
        })
    }

    fn split_compression(&self, ctx: &FluidContext<'_>) -> CycleResult<Flowsheet> {
        let params = &self.params;
        let (Some(ltr_spec), Some(recompressor_spec), Some(x)) = (
            params.low_temperature_recuperator,
            params.recompressor,
            params.split_fraction,
        ) else {
            return Err(CycleError::invalid(
                "split_compression requires a recompressor, a low_temperature_recuperator and a split_fraction",
            ));
        };
        let p = params.split_pressures(&ltr_spec);

        let compressor = Turbomachine::new("main_compressor", MachineKind::Compressor, params.compressor)?;
        let recompressor = Turbomachine::new("recompressor", MachineKind::Compressor, recompressor_spec)?;
        let turbine = Turbomachine::new("turbine", MachineKind::Turbine, params.turbine)?;
        let htr = Recuperator::new("recuperator", params.recuperator);
        let ltr = Recuperator::new("low_temperature_recuperator", ltr_spec);

        let s1 = ctx.pt(params.p_low, params.t_low)?;
        let s2 = compressor.outlet_state(ctx, &s1, p.main_compressor_out)?;
        let s6 = ctx.pt(params.p_high, params.t_high)?;
        let s7 = turbine.outlet_state(ctx, &s6, p.turbine_out)?;

        let recycle = |h4: f64| -> CycleResult<RecycleLoop> {
            let htr_cold_in = ctx.ph(p.mixer, h4)?;
            let htr_pass = htr.transfer(ctx, &s7, 1.0, &htr_cold_in, 1.0)?;
            let ltr_pass = ltr.transfer(ctx, &htr_pass.hot_out, 1.0, &s2, x)?;
            let recompressor_out = recompressor.outlet_state(ctx, &ltr_pass.hot_out, p.mixer)?;
            let mixed_h = x * ltr_pass.cold_out.h + (1.0 - x) * recompressor_out.h;
            Ok(RecycleLoop {
                htr_cold_in,
                htr: htr_pass,
                ltr: ltr_pass,
                recompressor_out,
                mixed_h,
            })
        };

        // The mixed stream lies between the coldest and hottest temperatures of the cycle
        let lo = ctx.pt(p.mixer, params.t_low)?.h;
        let hi = ctx.pt(p.mixer, params.t_high)?.h;
        let config = ScalarConfig {
            max_iterations: 200,
            ..ScalarConfig::default()
        };
        let root = brent_root::<_, CycleError>(
            "recompression mixing enthalpy",
            |h4| recycle(h4).map(|r| r.mixed_h - h4),
            lo,
            hi,
            &config,
        )?;
        let RecycleLoop {
            htr_cold_in: s4,
            htr: htr_pass,
            ltr: ltr_pass,
            recompressor_out: s10,
            mixed_h,
        } = recycle(root.x)?;
        debug!(
            h4 = root.x,
            mixing_error = mixed_h - root.x,
            iterations = root.iterations,
            "recompression loop closed"
        );

        let s3 = ltr_pass.cold_out.clone();
        let s5 = htr_pass.cold_out.clone();
        let s8 = htr_pass.hot_out.clone();
        let s9 = ltr_pass.hot_out.clone();

        Ok(Flowsheet {
            junctions: vec![
                ("main_compressor_inlet", s1.clone(), x),
                ("main_compressor_outlet", s2.clone(), x),
                ("ltr_cold_outlet", s3, x),
                ("recompressor_outlet", s10.clone(), 1.0 - x),
                ("htr_cold_inlet", s4.clone(), 1.0),
                ("heater_inlet", s5.clone(), 1.0),
                ("turbine_inlet", s6.clone(), 1.0),
                ("turbine_outlet", s7.clone(), 1.0),
                ("ltr_hot_inlet", s8.clone(), 1.0),
                ("ltr_hot_outlet", s9.clone(), 1.0),
            ],
            machines: vec![
                MachinePass {
                    machine: compressor,
                    inlet: s1.clone(),
                    outlet: s2.clone(),
                    flow: x,
                },
                MachinePass {
                    machine: recompressor,
                    inlet: s9.clone(),
                    outlet: s10,
                    flow: 1.0 - x,
                },
                MachinePass {
                    machine: turbine,
                    inlet: s6.clone(),
                    outlet: s7.clone(),
                    flow: 1.0,
                },
            ],
            recuperators: vec![
                RecuperatorPass {
                    name: "recuperator",
                    num_elements: params.recuperator.num_elements,
                    hot_in: s7,
                    cold_in: s4,
                    transfer: htr_pass,
                },
                RecuperatorPass {
                    name: "low_temperature_recuperator",
                    num_elements: ltr_spec.num_elements,
                    hot_in: s8,
                    cold_in: s2,
                    transfer: ltr_pass,
                },
            ],
            heater: ThermalPass {
                inlet: s5,
                outlet: s6,
                flow: 1.0,
            },
            cooler: ThermalPass {
                inlet: s9,
                outlet: s1,
                flow: x,
            },
        })
    }

    /// Size external loops, scale to the requested net power and build the tables.
    fn assemble(&self, ctx: &FluidContext<'_>, sheet: Flowsheet) -> CycleResult<CycleResults> {
        let params = &self.params;

        let q_in = sheet.heater.flow * (sheet.heater.outlet.h - sheet.heater.inlet.h);
        let q_out = sheet.cooler.flow * (sheet.cooler.inlet.h - sheet.cooler.outlet.h);
        if q_in <= 0.0 {
            return Err(CycleError::non_physical(format!(
                "heater inlet is already above the turbine inlet temperature (q_in = {q_in})"
            )));
        }
        if q_out <= 0.0 {
            return Err(CycleError::non_physical(format!(
                "cooler inlet is already below the compressor inlet temperature (q_out = {q_out})"
            )));
        }

        let mut loops = Vec::new();
        for (name, spec, fluid, pass, duty, heating) in [
            ("heater", &params.heater, &self.fluids.heating, &sheet.heater, q_in, true),
            ("cooler", &params.cooler, &self.fluids.cooling, &sheet.cooler, q_out, false),
        ] {
            let (Some(ext), Some(fluid)) = (&spec.external, fluid) else {
                continue;
            };
            let ext_ctx = fluid.context();
            let working = Stream {
                ctx,
                inlet: &pass.inlet,
                outlet: &pass.outlet,
            };
            let sized = ExternalLoop::size(name, &ext_ctx, ext, &working, duty, heating, spec.num_elements)?;
            loops.push((name, fluid.name().to_string(), ext, sized));
        }

        let mut w_turbine = 0.0;
        let mut w_compressor = 0.0;
        for pass in &sheet.machines {
            let w = pass.flow * pass.machine.specific_work(&pass.inlet, &pass.outlet);
            match pass.machine.kind {
                MachineKind::Turbine => w_turbine -= w,
                MachineKind::Compressor | MachineKind::Pump => w_compressor += w,
            }
        }
        let w_pump: f64 = loops.iter().map(|(.., l)| l.pump_work).sum();
        let w_net = w_turbine - w_compressor - w_pump;
        if w_net <= 0.0 {
            return Err(CycleError::non_physical(format!(
                "cycle produces no net work (w_net = {w_net} J/kg)"
            )));
        }
        let m = params.net_power / w_net;

        let junctions = sheet
            .junctions
            .iter()
            .map(|(name, state, flow)| JunctionState::new(name, state, flow * m))
            .collect();

        let machines = sheet
            .machines
            .iter()
            .map(|pass| {
                Ok(MachineReport {
                    name: pass.machine.name.clone(),
                    kind: pass.machine.kind,
                    mass_flow: pass.flow * m,
                    power: pass.flow * m * pass.machine.specific_work(&pass.inlet, &pass.outlet),
                    pressure_ratio: pass.outlet.p.value / pass.inlet.p.value,
                    isentropic_efficiency: pass.machine.isentropic_efficiency(ctx, &pass.inlet, &pass.outlet)?,
                })
            })
            .collect::<CycleResult<Vec<_>>>()?;

        let mut exchangers = Vec::new();
        for rec in &sheet.recuperators {
            let hot = Stream {
                ctx,
                inlet: &rec.hot_in,
                outlet: &rec.transfer.hot_out,
            };
            let cold = Stream {
                ctx,
                inlet: &rec.cold_in,
                outlet: &rec.transfer.cold_out,
            };
            let p = pinch(&hot, &cold, rec.num_elements)?;
            if p.delta_t < 0.0 {
                warn!(exchanger = rec.name, pinch = p.delta_t, "temperature cross in heat exchanger");
            }
            exchangers.push(ExchangerReport {
                name: rec.name.to_string(),
                duty: m * rec.transfer.duty,
                pinch: p,
                t_hot_in: rec.hot_in.t.value,
                t_hot_out: rec.transfer.hot_out.t.value,
                t_cold_in: rec.cold_in.t.value,
                t_cold_out: rec.transfer.cold_out.t.value,
            });
        }
        let mut external_loops = Vec::new();
        for (name, fluid, ext, sized) in &loops {
            let (duty, working) = if *name == "heater" {
                (q_in, &sheet.heater)
            } else {
                (q_out, &sheet.cooler)
            };
            let (t_hot_in, t_hot_out, t_cold_in, t_cold_out) = if *name == "heater" {
                (ext.t_in, ext.t_out, working.inlet.t.value, working.outlet.t.value)
            } else {
                (working.inlet.t.value, working.outlet.t.value, ext.t_in, ext.t_out)
            };
            exchangers.push(ExchangerReport {
                name: name.to_string(),
                duty: m * duty,
                pinch: sized.pinch,
                t_hot_in,
                t_hot_out,
                t_cold_in,
                t_cold_out,
            });
            external_loops.push(ExternalLoopReport {
                name: name.to_string(),
                fluid: fluid.clone(),
                mass_flow: m * sized.mass_flow,
                pump_power: m * sized.pump_work,
                t_in: ext.t_in,
                t_out: ext.t_out,
            });
        }

        let heat_input = m * q_in;
        let heat_rejected = m * q_out;
        let pump_power = m * w_pump;
        let turbine_power = m * w_turbine;
        Ok(CycleResults {
            topology: params.topology,
            mass_flow: m,
            net_power: params.net_power,
            specific_work: w_net,
            turbine_power,
            compressor_power: m * w_compressor,
            pump_power,
            heat_input,
            heat_rejected,
            cycle_efficiency: params.net_power / heat_input,
            back_work_ratio: (w_compressor + w_pump) / w_turbine,
            energy_balance: heat_input - heat_rejected - params.net_power - pump_power,
            junctions,
            machines,
            exchangers,
            external_loops,
        })
    }
}
