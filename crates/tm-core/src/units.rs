//! SI quantity aliases and constructors used at the fluid-property boundary.
//!
//! The meanline equations work on raw `f64` in SI; quantities only wrap the
//! values a property backend receives or returns.

use uom::si::f64 as si;

pub type Pressure = si::Pressure;
pub type Temperature = si::ThermodynamicTemperature;
pub type Density = si::MassDensity;
pub type DynVisc = si::DynamicViscosity;
pub type Velocity = si::Velocity;
pub type Length = si::Length;
pub type MassRate = si::MassRate;
pub type AngularSpeed = si::AngularVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    Pressure::new::<uom::si::pressure::pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    Temperature::new::<uom::si::thermodynamic_temperature::kelvin>(v)
}

#[inline]
pub fn kgpm3(v: f64) -> Density {
    Density::new::<uom::si::mass_density::kilogram_per_cubic_meter>(v)
}

/// Speed of sound and flow velocities.
#[inline]
pub fn mps(v: f64) -> Velocity {
    Velocity::new::<uom::si::velocity::meter_per_second>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    Length::new::<uom::si::length::meter>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    MassRate::new::<uom::si::mass_rate::kilogram_per_second>(v)
}

/// Shaft speed.
#[inline]
pub fn rad_per_s(v: f64) -> AngularSpeed {
    AngularSpeed::new::<uom::si::angular_velocity::radian_per_second>(v)
}

pub mod constants {
    /// Universal gas constant [J/(kmol·K)]
    pub const R_UNIVERSAL: f64 = 8314.462618;

    /// Reference pressure of the perfect-gas entropy datum [Pa]
    pub const P_ATM: f64 = 101_325.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_si() {
        assert_eq!(pa(10.82e4).value, 10.82e4);
        assert_eq!(k(310.0).value, 310.0);
        assert_eq!(kgpm3(1.2).value, 1.2);
        assert_eq!(mps(340.0).value, 340.0);
        assert_eq!(m(2.2655e-2).value, 2.2655e-2);
        assert_eq!(kgps(0.5).value, 0.5);
        assert_eq!(rad_per_s(2036.0).value, 2036.0);
    }
}
