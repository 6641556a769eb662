//! Secondary electron yield (SEY) models.
//!
//! Three formulas describe the same phenomenon and every one of them stays available:
//! - [`SternglassParams`]: energy- and angle-dependent empirical curve with statistical jitter.
//! - [`YieldModel::Simple`]: power law in the accelerating voltage, `r · ΔV^β`.
//! - [`AdvancedParams`]: escape probability times a randomized kinetic term times static factors.
//!
//! Each dinode picks one through [`YieldModel`]. Yields are real-valued; callers turn
//! them into integer counts and drop the fractional part.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config;

/// Conditions of one dinode strike, everything any yield model may look at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StrikeConditions {
    /// Impact kinetic energy (eV)
    pub energy_ev: f64,
    /// Incidence angle from the surface normal (rad, `[0, π/2]`)
    pub angle: f64,
    /// Voltage difference between the struck dinode and the emitting electrode (V)
    pub delta_v: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SternglassParams {
    pub threshold_ev: f64,
    pub e_max_ev: f64,
    pub delta_max: f64,
    pub shape: f64,
    pub angle_exponent: f64,
    pub jitter: f64,
}

impl Default for SternglassParams {
    fn default() -> Self {
        Self {
            threshold_ev: config::SEY_THRESHOLD_EV,
            e_max_ev: config::SEY_E_MAX_EV,
            delta_max: config::SEY_DELTA_MAX,
            shape: config::SEY_SHAPE,
            angle_exponent: config::SEY_ANGLE_EXPONENT,
            jitter: config::SEY_JITTER,
        }
    }
}

impl SternglassParams {
    /// Noise-free yield: `δmax·s·r·e^(−s·r) / cos(θ)^p` with `r = E/Emax`, zero below threshold.
    pub fn expected(&self, energy_ev: f64, angle: f64) -> f64 {
        if !(energy_ev >= self.threshold_ev) || self.e_max_ev <= 0.0 {
            return 0.0;
        }
        let r = energy_ev / self.e_max_ev;
        let delta = self.delta_max * self.shape * r * (-self.shape * r).exp();
        let theta = angle.abs().min(config::SEY_MAX_ANGLE);
        (delta / theta.cos().powf(self.angle_exponent)).max(0.0)
    }

    /// [`expected`](Self::expected) times a uniform factor in `[1 − jitter, 1 + jitter]`.
    pub fn sample<R: Rng + ?Sized>(&self, energy_ev: f64, angle: f64, rng: &mut R) -> f64 {
        let base = self.expected(energy_ev, angle);
        if base == 0.0 {
            return 0.0;
        }
        // Non-finite or oversized jitter saturates at the full band
        let j = self.jitter.abs().min(1.0);
        let factor = 1.0 + rng.random_range(-j..=j);
        (base * factor).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedParams {
    pub phi_w: f64,
    pub phi_0: f64,
    pub sigma_e: f64,
    pub e_0: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub lambda: f64,
}

impl Default for AdvancedParams {
    fn default() -> Self {
        Self {
            phi_w: config::ADVANCED_PHI_W,
            phi_0: config::ADVANCED_PHI_0,
            sigma_e: config::ADVANCED_SIGMA_E,
            e_0: config::ADVANCED_E_0,
            alpha: config::ADVANCED_ALPHA,
            gamma: config::ADVANCED_GAMMA,
            lambda: config::ADVANCED_LAMBDA,
        }
    }
}

impl AdvancedParams {
    /// `exp(−φw/E0) · (φ0 + σE·u) · α·γ·λ` for a uniform draw `u ∈ [0, 1)`.
    pub fn evaluate(&self, u: f64) -> f64 {
        let escape = if self.e_0 > 0.0 {
            (-self.phi_w / self.e_0).exp()
        } else {
            0.0
        };
        let kinetic = self.phi_0 + self.sigma_e * u;
        (escape * kinetic * self.alpha * self.gamma * self.lambda).max(0.0)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.evaluate(rng.random::<f64>())
    }
}

/// Power-law yield `r · ΔV^β`. Non-positive voltage differences give no secondaries.
pub fn simple_yield(r: f64, beta: f64, delta_v: f64) -> f64 {
    if !(delta_v > 0.0) {
        return 0.0;
    }
    (r * delta_v.powf(beta)).max(0.0)
}

/// Per-dinode choice of yield formula.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum YieldModel {
    Sternglass(SternglassParams),
    Simple { r: f64, beta: f64 },
    Advanced(AdvancedParams),
}

impl Default for YieldModel {
    fn default() -> Self {
        YieldModel::Sternglass(SternglassParams::default())
    }
}

impl YieldModel {
    pub fn simple() -> Self {
        YieldModel::Simple {
            r: config::SIMPLE_YIELD_R,
            beta: config::SIMPLE_YIELD_BETA,
        }
    }

    /// Draw a yield for one strike.
    pub fn sample<R: Rng + ?Sized>(&self, strike: &StrikeConditions, rng: &mut R) -> f64 {
        match self {
            YieldModel::Sternglass(p) => p.sample(strike.energy_ev, strike.angle, rng),
            YieldModel::Simple { r, beta } => simple_yield(*r, *beta, strike.delta_v),
            YieldModel::Advanced(p) => p.sample(rng),
        }
    }

    /// Parameter sanity for values read from a scenario. The message names the first bad field.
    pub fn check(&self) -> std::result::Result<(), &'static str> {
        match self {
            YieldModel::Sternglass(p) => {
                let all = [
                    p.threshold_ev,
                    p.e_max_ev,
                    p.delta_max,
                    p.shape,
                    p.angle_exponent,
                    p.jitter,
                ];
                if !all.iter().all(|v| v.is_finite()) {
                    return Err("sternglass parameters must be finite");
                }
                if p.e_max_ev <= 0.0 {
                    return Err("sternglass e_max_ev must be positive");
                }
                if p.threshold_ev < 0.0 || p.delta_max < 0.0 {
                    return Err("sternglass threshold and delta_max must not be negative");
                }
                if !(0.0..1.0).contains(&p.jitter) {
                    return Err("sternglass jitter must lie in [0, 1)");
                }
            }
            YieldModel::Simple { r, beta } => {
                if !(r.is_finite() && beta.is_finite()) {
                    return Err("simple yield parameters must be finite");
                }
                if *r < 0.0 {
                    return Err("simple yield r must not be negative");
                }
            }
            YieldModel::Advanced(p) => {
                let all = [p.phi_w, p.phi_0, p.sigma_e, p.e_0, p.alpha, p.gamma, p.lambda];
                if !all.iter().all(|v| v.is_finite()) {
                    return Err("advanced yield parameters must be finite");
                }
            }
        }
        Ok(())
    }

    /// Yield with randomness replaced by its mean.
    pub fn expected(&self, strike: &StrikeConditions) -> f64 {
        match self {
            YieldModel::Sternglass(p) => p.expected(strike.energy_ev, strike.angle),
            YieldModel::Simple { r, beta } => simple_yield(*r, *beta, strike.delta_v),
            YieldModel::Advanced(p) => p.evaluate(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn no_yield_below_threshold() {
        let p = SternglassParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        for e in [0.0, 1.0, 5.0, 9.99] {
            for theta in [0.0, 0.5, 1.2] {
                assert_eq!(p.sample(e, theta, &mut rng), 0.0);
            }
        }
    }

    #[test]
    fn positive_yield_above_threshold() {
        let p = SternglassParams::default();
        let mut rng = StdRng::seed_from_u64(2);
        for e in [10.01, 50.0, 300.0, 2000.0, 10_000.0] {
            for theta in [0.0, 0.7, 1.5] {
                assert!(p.sample(e, theta, &mut rng) > 0.0, "E = {}, θ = {}", e, theta);
            }
        }
    }

    #[test]
    fn jitter_stays_in_band() {
        let p = SternglassParams::default();
        let mut rng = StdRng::seed_from_u64(3);
        let base = p.expected(250.0, 0.4);
        let mut lo = f64::INFINITY;
        let mut hi = 0.0f64;
        for _ in 0..2000 {
            let y = p.sample(250.0, 0.4, &mut rng);
            assert!(y >= base * 0.9 - 1e-12 && y <= base * 1.1 + 1e-12);
            lo = lo.min(y);
            hi = hi.max(y);
        }
        // The band is actually explored, not collapsed onto the mean
        assert!(hi - lo > base * 0.1);
    }

    #[test]
    fn curve_peaks_near_e_max_over_shape() {
        let p = SternglassParams::default();
        let peak = p.e_max_ev / p.shape;
        let at_peak = p.expected(peak, 0.0);
        assert!((at_peak - p.delta_max * (-1.0f64).exp()).abs() < 1e-12);
        assert!(p.expected(peak * 0.5, 0.0) < at_peak);
        assert!(p.expected(peak * 2.0, 0.0) < at_peak);
    }

    #[test]
    fn oblique_incidence_increases_yield() {
        let p = SternglassParams::default();
        let normal = p.expected(200.0, 0.0);
        let oblique = p.expected(200.0, 1.0);
        assert!((oblique - normal / 1.0f64.cos().powf(0.7)).abs() < 1e-12);
        assert!(oblique > normal);
        // Grazing incidence is bounded
        assert!(p.expected(200.0, std::f64::consts::FRAC_PI_2).is_finite());
    }

    #[test]
    fn simple_model_is_power_law() {
        assert!((simple_yield(0.1, 0.5, 400.0) - 2.0).abs() < 1e-12);
        assert_eq!(simple_yield(0.1, 0.5, 0.0), 0.0);
        assert_eq!(simple_yield(0.1, 0.5, -100.0), 0.0);
    }

    #[test]
    fn advanced_model_range() {
        let p = AdvancedParams::default();
        let lo = p.evaluate(0.0);
        let hi = p.evaluate(1.0);
        let escape = (-p.phi_w / p.e_0).exp();
        assert!((lo - escape * p.phi_0).abs() < 1e-12);
        assert!((hi - escape * (p.phi_0 + p.sigma_e)).abs() < 1e-12);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            let y = p.sample(&mut rng);
            assert!(y >= lo && y < hi);
        }
    }

    #[test]
    fn model_selector_dispatches() {
        let mut rng = StdRng::seed_from_u64(5);
        let strike = StrikeConditions {
            energy_ev: 100.0,
            angle: 0.0,
            delta_v: 100.0,
        };
        let simple = YieldModel::simple().sample(&strike, &mut rng);
        assert!((simple - 1.0).abs() < 1e-12);
        let sg = YieldModel::default().expected(&strike);
        assert!((sg - SternglassParams::default().expected(100.0, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn check_rejects_unusable_parameters() {
        assert!(YieldModel::default().check().is_ok());
        assert!(YieldModel::simple().check().is_ok());
        assert!(YieldModel::Advanced(AdvancedParams::default()).check().is_ok());

        let sg = |f: fn(&mut SternglassParams)| {
            let mut p = SternglassParams::default();
            f(&mut p);
            YieldModel::Sternglass(p).check()
        };
        assert!(sg(|p| p.jitter = f64::INFINITY).is_err());
        assert!(sg(|p| p.jitter = 1.0).is_err());
        assert!(sg(|p| p.jitter = -0.1).is_err());
        assert!(sg(|p| p.delta_max = f64::NAN).is_err());
        assert!(sg(|p| p.e_max_ev = 0.0).is_err());
        assert!(sg(|p| p.jitter = 0.0).is_ok());

        assert!(YieldModel::Simple { r: f64::NAN, beta: 0.5 }.check().is_err());
        assert!(YieldModel::Simple { r: -0.1, beta: 0.5 }.check().is_err());
        let adv = AdvancedParams {
            sigma_e: f64::INFINITY,
            ..AdvancedParams::default()
        };
        assert!(YieldModel::Advanced(adv).check().is_err());
    }

    #[test]
    fn unbounded_jitter_does_not_panic() {
        let p = SternglassParams {
            jitter: f64::INFINITY,
            ..SternglassParams::default()
        };
        let mut rng = StdRng::seed_from_u64(6);
        let base = p.expected(250.0, 0.0);
        for _ in 0..100 {
            let y = p.sample(250.0, 0.0, &mut rng);
            assert!(y >= 0.0 && y <= 2.0 * base + 1e-12);
        }
        let nan = SternglassParams {
            jitter: f64::NAN,
            ..SternglassParams::default()
        };
        assert!(nan.sample(250.0, 0.0, &mut rng).is_finite());
    }

    #[test]
    fn selector_parses_from_toml() {
        let m: YieldModel = toml::from_str("model = \"simple\"\nr = 0.2\nbeta = 0.7").unwrap();
        assert_eq!(m, YieldModel::Simple { r: 0.2, beta: 0.7 });
        let m: YieldModel = toml::from_str("model = \"sternglass\"\ndelta_max = 3.0").unwrap();
        match m {
            YieldModel::Sternglass(p) => {
                assert_eq!(p.delta_max, 3.0);
                assert_eq!(p.threshold_ev, config::SEY_THRESHOLD_EV);
            }
            other => panic!("unexpected model {:?}", other),
        }
    }
}
