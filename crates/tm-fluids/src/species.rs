//! Working, heating and cooling fluids known to the property backends.

use crate::error::FluidError;
use std::str::FromStr;

/// Pure fluids relevant to turbine cascades and closed Brayton cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    /// Air (pseudo-pure)
    Air,
    /// Nitrogen (N₂)
    N2,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Argon (Ar)
    Ar,
    /// Helium (He)
    He,
    /// Water (H₂O)
    H2O,
}

impl FromStr for Species {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_uppercase();
        match norm.as_str() {
            "AIR" => Ok(Species::Air),
            "N2" | "NITROGEN" => Ok(Species::N2),
            "CO2" | "CARBONDIOXIDE" => Ok(Species::CO2),
            "AR" | "ARGON" => Ok(Species::Ar),
            "HE" | "HELIUM" => Ok(Species::He),
            "H2O" | "WATER" => Ok(Species::H2O),
            _ => Err(FluidError::UnknownFluid {
                name: s.to_string(),
            }),
        }
    }
}

/// Ideal-gas constants used by the perfect-gas backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasConstants {
    /// Molar mass [kg/kmol]
    pub molar_mass: f64,
    /// Specific heat at constant pressure [J/(kg·K)] near 300 K
    pub cp: f64,
    /// Sutherland reference viscosity [Pa·s]
    pub mu_ref: f64,
    /// Sutherland reference temperature [K]
    pub t_mu_ref: f64,
    /// Sutherland constant [K]
    pub sutherland: f64,
}

impl Species {
    /// CoolProp fluid name for this species.
    pub fn coolprop_name(&self) -> &'static str {
        match self {
            Species::Air => "Air",
            Species::N2 => "Nitrogen",
            Species::CO2 => "CarbonDioxide",
            Species::Ar => "Argon",
            Species::He => "Helium",
            Species::H2O => "Water",
        }
    }

    /// Map to rfluids Pure enum (internal use for CoolProp backend).
    #[cfg(feature = "coolprop")]
    pub(crate) fn rfluids_pure(&self) -> rfluids::substance::Pure {
        use rfluids::substance::Pure;
        match self {
            Species::Air => Pure::Air,
            Species::N2 => Pure::Nitrogen,
            Species::CO2 => Pure::CarbonDioxide,
            Species::Ar => Pure::Argon,
            Species::He => Pure::Helium,
            Species::H2O => Pure::Water,
        }
    }

    /// Molar mass [kg/kmol].
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::Air => 28.965,
            Species::N2 => 28.014,
            Species::CO2 => 44.010,
            Species::Ar => 39.948,
            Species::He => 4.003,
            Species::H2O => 18.015,
        }
    }

    /// Perfect-gas constants, or `None` for fluids that are not gases at ambient.
    pub fn gas_constants(&self) -> Option<GasConstants> {
        let (cp, mu_ref, sutherland) = match self {
            Species::Air => (1004.5, 1.716e-5, 110.4),
            Species::N2 => (1040.0, 1.663e-5, 107.0),
            Species::CO2 => (846.0, 1.370e-5, 222.0),
            Species::Ar => (520.3, 2.125e-5, 144.0),
            Species::He => (5193.0, 1.870e-5, 79.4),
            Species::H2O => return None,
        };
        Some(GasConstants {
            molar_mass: self.molar_mass(),
            cp,
            mu_ref,
            t_mu_ref: 273.15,
            sutherland,
        })
    }

    /// Critical point (pressure [Pa], temperature [K]).
    pub fn critical_point(&self) -> (f64, f64) {
        match self {
            Species::Air => (3.786e6, 132.53),
            Species::N2 => (3.3958e6, 126.19),
            Species::CO2 => (7.3773e6, 304.13),
            Species::Ar => (4.863e6, 150.687),
            Species::He => (2.2746e5, 5.1953),
            Species::H2O => (22.064e6, 647.096),
        }
    }

    /// Triple point (pressure [Pa], temperature [K]).
    pub fn triple_point(&self) -> (f64, f64) {
        match self {
            Species::Air => (5265.0, 59.75),
            Species::N2 => (12_523.0, 63.151),
            Species::CO2 => (517_950.0, 216.592),
            Species::Ar => (68_891.0, 83.806),
            Species::He => (5043.0, 2.1768),
            Species::H2O => (611.655, 273.16),
        }
    }
}
