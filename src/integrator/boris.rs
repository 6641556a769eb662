//! Boris push.
//!
//! Both variants share [`boris_rotate`]: half electric kick, rotation about the scaled
//! magnetic vector, half electric kick. The relativistic step works on `u = γv`, samples the
//! field at the half-step midpoint and drifts from there. The plain variant substitutes
//! `γ = 1` and is applied to ordinary velocity.

use ultraviolet::{DVec2, DVec3};

use crate::config;
use crate::field::EmField;
use crate::units::SPEED_OF_LIGHT;
use crate::vector::{flatten, lift};

/// Relativistic particle state carried between steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorisState {
    /// Position (m)
    pub x: DVec3,
    /// Momentum per unit mass, `γv` (m/s)
    pub u: DVec3,
    pub gamma: f64,
    /// Time (s)
    pub t: f64,
}

impl BorisState {
    /// Build a state from an ordinary velocity. Speeds at or above `c` are pulled just below it.
    pub fn from_velocity(x: DVec3, v: DVec3, t: f64) -> Self {
        let c = SPEED_OF_LIGHT;
        let mut v = v;
        let beta_sq = v.mag_sq() / (c * c);
        if beta_sq >= 1.0 {
            v *= (1.0 - 1e-12) / beta_sq.sqrt();
        }
        let gamma = 1.0 / (1.0 - v.mag_sq() / (c * c)).sqrt();
        Self {
            x,
            u: v * gamma,
            gamma,
            t,
        }
    }

    pub fn velocity(&self) -> DVec3 {
        self.u / self.gamma
    }

    pub fn is_finite(&self) -> bool {
        let f = |v: DVec3| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        f(self.x) && f(self.u) && self.gamma.is_finite() && self.t.is_finite()
    }
}

/// Lorentz factor from momentum per unit mass.
#[inline]
pub fn lorentz_gamma(u: DVec3) -> f64 {
    (1.0 + u.mag_sq() / (SPEED_OF_LIGHT * SPEED_OF_LIGHT)).sqrt()
}

/// Rotate `u_minus` about `t` with the Boris two-step formula.
///
/// `u' = u⁻ + u⁻ × t`, `u⁺ = u⁻ + u' × s` with `s = 2t / (1 + |t|²)`.
/// Preserves `|u⁻|` exactly.
#[inline]
pub fn boris_rotate(u_minus: DVec3, t: DVec3) -> DVec3 {
    let t2 = t.mag_sq();
    if t2 == 0.0 {
        return u_minus;
    }
    let s = t * (2.0 / (1.0 + t2));
    let u_prime = u_minus + u_minus.cross(t);
    u_minus + u_prime.cross(s)
}

/// Advance `state` by `dt` and return the midpoint where the field was sampled.
pub fn boris_step<F: EmField + ?Sized>(
    state: &mut BorisState,
    q_over_m: f64,
    dt: f64,
    field: &F,
) -> DVec3 {
    let c = SPEED_OF_LIGHT;
    let x_med = state.x + state.u * (dt / (2.0 * state.gamma));
    let (e, b) = field.sample(x_med, state.t + 0.5 * dt);

    let h = q_over_m * dt * 0.5;
    let u_minus = state.u + e * h;

    let tau = b * h;
    let tau_sq = tau.mag_sq();
    let t_vec = if tau_sq < config::BORIS_TAU_SQ_MIN {
        DVec3::zero()
    } else {
        let gamma_minus_sq = 1.0 + u_minus.mag_sq() / (c * c);
        let sigma = (gamma_minus_sq - tau_sq).max(config::BORIS_SIGMA_FLOOR);
        let u_star = u_minus.dot(tau) / c;
        let gamma_plus =
            ((sigma + (sigma * sigma + 4.0 * (tau_sq + u_star * u_star)).sqrt()) * 0.5).sqrt();
        tau / gamma_plus
    };
    let u_plus = boris_rotate(u_minus, t_vec);

    state.u = u_plus + e * h;
    state.gamma = lorentz_gamma(state.u);
    let v = state.u / state.gamma;
    state.x = x_med + v * (0.5 * dt);
    state.t += dt;
    x_med
}

/// Non-relativistic Boris velocity update from a field sample taken at the current position.
pub fn boris_velocity(v: DVec3, e: DVec3, b: DVec3, q_over_m: f64, dt: f64) -> DVec3 {
    let h = q_over_m * dt * 0.5;
    let v_minus = v + e * h;
    let tau = b * h;
    let t_vec = if tau.mag_sq() < config::BORIS_TAU_SQ_MIN {
        DVec3::zero()
    } else {
        tau
    };
    boris_rotate(v_minus, t_vec) + e * h
}

/// Planar form of [`boris_velocity`] with an out-of-plane magnetic field `bz`.
pub fn boris_velocity_2d(v: DVec2, e: DVec2, bz: f64, q_over_m: f64, dt: f64) -> DVec2 {
    flatten(boris_velocity(
        lift(v),
        lift(e),
        DVec3::new(0.0, 0.0, bz),
        q_over_m,
        dt,
    ))
}
