//! Resolved description of a closed Brayton cycle.

use crate::common::{check_positive, pressure_before_drop};
use crate::error::{CycleError, CycleResult};
use crate::heat_exchanger::{ExchangerSpec, ThermalSpec};
use crate::turbomachine::MachineSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tm_fluids::FluidConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTopology {
    /// Compressor, recuperator, heater, turbine, recuperator, cooler
    Recuperated,
    /// Recompression cycle with low- and high-temperature recuperators
    SplitCompression,
}

impl fmt::Display for CycleTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleTopology::Recuperated => "recuperated",
            CycleTopology::SplitCompression => "split_compression",
        })
    }
}

impl FromStr for CycleTopology {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "recuperated" => Ok(CycleTopology::Recuperated),
            "split_compression" | "recompression" => Ok(CycleTopology::SplitCompression),
            _ => Err(CycleError::invalid(format!(
                "unknown cycle topology '{s}' (expected recuperated or split_compression)"
            ))),
        }
    }
}

/// Every input of a cycle solve.
///
/// The high pressure is imposed at the turbine inlet and the low pressure at
/// the (main) compressor inlet. All other pressures follow from the fractional
/// drops of the components in between. For `SplitCompression`, `recuperator`
/// is the high-temperature recuperator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleParameters {
    pub topology: CycleTopology,
    pub working_fluid: FluidConfig,
    /// Net shaft power delivered [W]
    pub net_power: f64,
    pub p_high: f64,
    pub t_high: f64,
    pub p_low: f64,
    pub t_low: f64,
    pub compressor: MachineSpec,
    pub turbine: MachineSpec,
    pub recuperator: ExchangerSpec,
    pub heater: ThermalSpec,
    pub cooler: ThermalSpec,
    #[serde(default)]
    pub recompressor: Option<MachineSpec>,
    #[serde(default)]
    pub low_temperature_recuperator: Option<ExchangerSpec>,
    /// Share of the turbine flow sent through the cooler and main compressor
    #[serde(default)]
    pub split_fraction: Option<f64>,
}

/// Fixed pressures of the recuperated cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecuperatedPressures {
    pub compressor_out: f64,
    pub heater_in: f64,
    pub turbine_out: f64,
    pub cooler_in: f64,
}

/// Fixed pressures of the recompression cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitPressures {
    pub main_compressor_out: f64,
    /// LTR cold outlet, recompressor outlet and HTR cold inlet
    pub mixer: f64,
    pub heater_in: f64,
    pub turbine_out: f64,
    pub cooler_in: f64,
}

impl CycleParameters {
    pub fn validate(&self) -> CycleResult<()> {
        let mut errors = Vec::new();
        check_positive(&mut errors, "net_power", self.net_power);
        check_positive(&mut errors, "p_high", self.p_high);
        check_positive(&mut errors, "t_high", self.t_high);
        check_positive(&mut errors, "p_low", self.p_low);
        check_positive(&mut errors, "t_low", self.t_low);
        if self.p_high <= self.p_low {
            errors.push(format!(
                "p_high ({}) must exceed p_low ({})",
                self.p_high, self.p_low
            ));
        }
        if self.t_high <= self.t_low {
            errors.push(format!(
                "t_high ({}) must exceed t_low ({})",
                self.t_high, self.t_low
            ));
        }
        self.compressor.validate("compressor", &mut errors);
        self.turbine.validate("turbine", &mut errors);
        self.recuperator.validate("recuperator", &mut errors);
        self.heater.validate("heater", true, &mut errors);
        self.cooler.validate("cooler", false, &mut errors);

        match self.topology {
            CycleTopology::Recuperated => {
                for (set, what) in [
                    (self.recompressor.is_some(), "recompressor"),
                    (self.low_temperature_recuperator.is_some(), "low_temperature_recuperator"),
                    (self.split_fraction.is_some(), "split_fraction"),
                ] {
                    if set {
                        errors.push(format!("{what} only applies to split_compression"));
                    }
                }
            }
            CycleTopology::SplitCompression => {
                match &self.recompressor {
                    Some(spec) => spec.validate("recompressor", &mut errors),
                    None => errors.push("split_compression requires a recompressor".into()),
                }
                match &self.low_temperature_recuperator {
                    Some(spec) => spec.validate("low_temperature_recuperator", &mut errors),
                    None => errors.push("split_compression requires a low_temperature_recuperator".into()),
                }
                match self.split_fraction {
                    Some(x) if x > 0.0 && x <= 1.0 => {}
                    Some(x) => errors.push(format!("split_fraction must be in (0, 1], got {x}")),
                    None => errors.push("split_compression requires a split_fraction".into()),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CycleError::InvalidParameters { errors })
        }
    }

    pub(crate) fn recuperated_pressures(&self) -> RecuperatedPressures {
        let heater_in = pressure_before_drop(self.p_high, self.heater.dp);
        let cooler_in = pressure_before_drop(self.p_low, self.cooler.dp);
        RecuperatedPressures {
            compressor_out: pressure_before_drop(heater_in, self.recuperator.dp_cold),
            heater_in,
            turbine_out: pressure_before_drop(cooler_in, self.recuperator.dp_hot),
            cooler_in,
        }
    }

    pub(crate) fn split_pressures(&self, ltr: &ExchangerSpec) -> SplitPressures {
        let heater_in = pressure_before_drop(self.p_high, self.heater.dp);
        let mixer = pressure_before_drop(heater_in, self.recuperator.dp_cold);
        let cooler_in = pressure_before_drop(self.p_low, self.cooler.dp);
        let ltr_hot_in = pressure_before_drop(cooler_in, ltr.dp_hot);
        SplitPressures {
            main_compressor_out: pressure_before_drop(mixer, ltr.dp_cold),
            mixer,
            heater_in,
            turbine_out: pressure_before_drop(ltr_hot_in, self.recuperator.dp_hot),
            cooler_in,
        }
    }

    /// Names accepted by [`CycleParameters::set`] and [`CycleParameters::get`].
    pub const PARAMETER_NAMES: &'static [&'static str] = &[
        "net_power",
        "p_high",
        "t_high",
        "p_low",
        "t_low",
        "split_fraction",
        "compressor_efficiency",
        "turbine_efficiency",
        "recompressor_efficiency",
        "recuperator_effectiveness",
        "low_temperature_recuperator_effectiveness",
        "heater_dp",
        "cooler_dp",
    ];

    fn slot(&mut self, name: &str) -> CycleResult<&mut f64> {
        let missing = |what: &str| CycleError::invalid(format!("'{name}' needs a {what} in this cycle"));
        Ok(match name {
            "net_power" => &mut self.net_power,
            "p_high" => &mut self.p_high,
            "t_high" => &mut self.t_high,
            "p_low" => &mut self.p_low,
            "t_low" => &mut self.t_low,
            "split_fraction" => self.split_fraction.as_mut().ok_or_else(|| missing("split_fraction"))?,
            "compressor_efficiency" => &mut self.compressor.efficiency,
            "turbine_efficiency" => &mut self.turbine.efficiency,
            "recompressor_efficiency" => {
                &mut self.recompressor.as_mut().ok_or_else(|| missing("recompressor"))?.efficiency
            }
            "recuperator_effectiveness" => &mut self.recuperator.effectiveness,
            "low_temperature_recuperator_effectiveness" => {
                &mut self
                    .low_temperature_recuperator
                    .as_mut()
                    .ok_or_else(|| missing("low_temperature_recuperator"))?
                    .effectiveness
            }
            "heater_dp" => &mut self.heater.dp,
            "cooler_dp" => &mut self.cooler.dp,
            _ => return Err(CycleError::UnknownParameter { name: name.to_string() }),
        })
    }

    /// Overwrite one scalar parameter by name.
    pub fn set(&mut self, name: &str, value: f64) -> CycleResult<()> {
        *self.slot(name)? = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> CycleResult<f64> {
        let mut scratch = self.clone();
        scratch.slot(name).map(|v| *v)
    }
}
