//! Physical constants and unit conversions.
//!
//! The exact engine works in SI:
//! - Length: metre (electrode geometry is given in millimetres)
//! - Time: second
//! - Energy: electronvolt at the API boundary, joule internally

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Elementary charge in coulombs.
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
/// Electron rest mass in kilograms.
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;
/// Electron charge (signed) in coulombs.
pub const ELECTRON_CHARGE: f64 = -ELEMENTARY_CHARGE;
/// Electron charge-to-mass ratio q/m (C/kg), negative.
pub const ELECTRON_Q_OVER_M: f64 = ELECTRON_CHARGE / ELECTRON_MASS;

/// Coulomb's constant k = 1/(4πε₀) in N⋅m²/C².
pub const COULOMB_CONSTANT: f64 = 8.987_551_792_3e9;

/// Millimetres per metre.
pub const MM_PER_M: f64 = 1.0e3;
/// Metres per millimetre.
pub const M_PER_MM: f64 = 1.0e-3;

/// Convert a length in metres to millimetres.
#[inline]
pub fn m_to_mm(x: f64) -> f64 {
    x * MM_PER_M
}

/// Convert a length in millimetres to metres.
#[inline]
pub fn mm_to_m(x: f64) -> f64 {
    x * M_PER_MM
}

/// Kinetic energy in eV of a particle with speed `speed` (m/s), using `½(m/|q|)v²`.
///
/// Dividing by |q| instead of `e` gives volts directly, which equals eV for a unit charge.
#[inline]
pub fn kinetic_energy_ev(speed: f64, mass: f64, charge: f64) -> f64 {
    0.5 * (mass / charge.abs()) * speed * speed
}

/// Speed (m/s) of a particle whose kinetic energy is `energy_ev`, inverse of [`kinetic_energy_ev`].
#[inline]
pub fn speed_from_energy_ev(energy_ev: f64, mass: f64, charge: f64) -> f64 {
    (2.0 * energy_ev.max(0.0) * charge.abs() / mass).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_ev_electron_speed() {
        let v = speed_from_energy_ev(2.0, ELECTRON_MASS, ELECTRON_CHARGE);
        // ~838 km/s
        assert!((v - 8.387e5).abs() < 1.0e3, "v = {}", v);
        let e = kinetic_energy_ev(v, ELECTRON_MASS, ELECTRON_CHARGE);
        assert!((e - 2.0).abs() < 1e-9);
    }

    #[test]
    fn millimetre_conversion() {
        assert!((m_to_mm(0.012) - 12.0).abs() < 1e-12);
        assert!((mm_to_m(12.0) - 0.012).abs() < 1e-15);
    }
}
