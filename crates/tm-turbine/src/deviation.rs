//! Subsonic exit flow angle (deviation) models.

use crate::error::TurbineError;
use crate::geometry::RowGeometry;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tm_core::numeric::{acosd, asind, cosd};

/// Mach number below which the low-speed deviation applies unchanged.
const MA_LOW_SPEED: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationModel {
    #[default]
    Aungier,
    AinleyMathieson,
    ZeroDeviation,
    BorgAgromayor,
}

impl FromStr for DeviationModel {
    type Err = TurbineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aungier" => Ok(DeviationModel::Aungier),
            "ainley_mathieson" => Ok(DeviationModel::AinleyMathieson),
            "zero_deviation" => Ok(DeviationModel::ZeroDeviation),
            "borg_agromayor" => Ok(DeviationModel::BorgAgromayor),
            _ => Err(TurbineError::UnknownModel {
                kind: "deviation model",
                name: s.to_string(),
                expected: "aungier, ainley_mathieson, zero_deviation, borg_agromayor",
            }),
        }
    }
}

/// Smooth fade of the low-speed deviation between Ma = 0.5 and `ma_limit`.
fn blend(delta_0: f64, ma: f64, ma_limit: f64) -> f64 {
    if ma < MA_LOW_SPEED {
        delta_0
    } else if ma < ma_limit {
        let x = (2.0 * ma - 1.0) / (2.0 * ma_limit - 1.0);
        delta_0 * (1.0 - 10.0 * x.powi(3) + 15.0 * x.powi(4) - 6.0 * x.powi(5))
    } else {
        0.0
    }
}

/// Ainley-Mathieson low-speed exit angle as a function of the gauging angle.
fn incompressible_angle(gauging: f64) -> f64 {
    35.0 + (80.0 - 35.0) / (79.0 - 40.0) * (gauging - 40.0)
}

impl DeviationModel {
    /// Relative exit flow angle magnitude [deg] for subsonic exit flow.
    ///
    /// `ma_exit` is the exit relative Mach number and `ma_crit` the critical
    /// throat Mach number of the row.
    pub fn exit_flow_angle(self, ma_exit: f64, ma_crit: f64, row: &RowGeometry) -> f64 {
        let gauging = row.metal_angle_te.abs();
        match self {
            DeviationModel::Aungier => {
                let beta_g = 90.0 - gauging;
                let c = cosd(gauging);
                let delta_0 = asind(c * (1.0 + (1.0 - c) * (beta_g / 90.0).powi(2))) - beta_g;
                gauging - blend(delta_0, ma_exit, ma_crit)
            }
            DeviationModel::AinleyMathieson => {
                let delta_0 = gauging - incompressible_angle(gauging);
                gauging - blend(delta_0, ma_exit, 1.0)
            }
            DeviationModel::ZeroDeviation => acosd(row.opening_to_pitch),
            DeviationModel::BorgAgromayor => {
                let beta_inc = incompressible_angle(gauging);
                let x = (ma_exit - MA_LOW_SPEED) / (ma_crit - MA_LOW_SPEED);
                let y = if x > 0.0 { x * x * (2.0 - x) } else { 0.0 };
                beta_inc + (gauging - beta_inc) * y
            }
        }
    }

    /// Exit flow angle carrying the sign of the trailing-edge metal angle.
    pub fn signed_exit_flow_angle(self, ma_exit: f64, ma_crit: f64, row: &RowGeometry) -> f64 {
        let beta = self.exit_flow_angle(ma_exit, ma_crit, row);
        if row.metal_angle_te < 0.0 { -beta } else { beta }
    }
}
