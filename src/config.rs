// Centralized configuration for the exact and interactive engines

use serde::{Deserialize, Serialize};

// ====================
// Geometry
// ====================
/// Half-width of the implicit square electrode shape.
pub const DEFAULT_HALF_WIDTH: f64 = 10.0;

// ====================
// Field Model
// ====================
/// Coulomb constant for the interactive (pixel-scale) field.
pub const PIXEL_COULOMB_K: f64 = 2.0;
/// Squared-distance cutoff below which a component's contribution is skipped (pixel scale).
pub const PIXEL_FIELD_EPSILON: f64 = 1e-4;
/// Squared-distance cutoff for SI-scale fields (m²).
pub const SI_FIELD_EPSILON: f64 = 1e-12;

// ====================
// Secondary Emission (Sternglass curve)
// ====================
/// Impact energy below which no secondaries are emitted (eV).
pub const SEY_THRESHOLD_EV: f64 = 10.0;
/// Energy at which the yield curve peaks (eV).
pub const SEY_E_MAX_EV: f64 = 300.0;
/// Peak yield.
pub const SEY_DELTA_MAX: f64 = 4.0;
/// Shape parameter of the curve.
pub const SEY_SHAPE: f64 = 1.35;
/// Exponent of the `1/cos(θ)` angular enhancement.
pub const SEY_ANGLE_EXPONENT: f64 = 0.7;
/// Half-width of the multiplicative jitter band around 1.0.
pub const SEY_JITTER: f64 = 0.10;
/// Largest incidence angle used in the angular correction, keeps `cos θ` away from zero.
pub const SEY_MAX_ANGLE: f64 = 1.5533430342749532; // 89°

// Simple power-law model defaults: r · ΔV^β
pub const SIMPLE_YIELD_R: f64 = 0.1;
pub const SIMPLE_YIELD_BETA: f64 = 0.5;

// Advanced model defaults
pub const ADVANCED_PHI_W: f64 = 4.5;
pub const ADVANCED_PHI_0: f64 = 1.0;
pub const ADVANCED_SIGMA_E: f64 = 1.5;
pub const ADVANCED_E_0: f64 = 20.0;
pub const ADVANCED_ALPHA: f64 = 1.0;
pub const ADVANCED_GAMMA: f64 = 1.0;
pub const ADVANCED_LAMBDA: f64 = 1.0;

// ====================
// Exact Engine
// ====================
/// Default integration timestep (s).
pub const DEFAULT_DT_S: f64 = 1.0e-12;
/// Integration steps allowed per particle before the chain is abandoned.
pub const MAX_STEPS_PER_PARTICLE: usize = 100_000;
/// Secondaries launched in one cascade. The strike that would launch one more abandons the chain.
pub const MAX_CASCADE_DEPTH: usize = 64;
/// A dinode strike below this energy captures the electron (eV).
pub const SPAWN_THRESHOLD_EV: f64 = 5.0;
/// Kinetic energy given to each emitted secondary (eV).
pub const SECONDARY_ENERGY_EV: f64 = 2.0;
/// Distance the secondary is moved off the surface before its first step (m).
pub const SURFACE_OFFSET_M: f64 = 1.0e-6;
/// Electrode potential equals its bias at this distance from its centre
pub const FIELD_REFERENCE_RADIUS_MM: f64 = 2.0;
/// Clearance around the electrodes before a particle counts as lost
pub const VOLUME_MARGIN_MM: f64 = 5.0;
/// Floor for the Boris radicand `γ⁻² − |τ|²`.
pub const BORIS_SIGMA_FLOOR: f64 = 1e-12;
/// Below this `|τ|²` the magnetic rotation is skipped.
pub const BORIS_TAU_SQ_MIN: f64 = 1e-10;

// ====================
// Interactive Engine
// ====================
pub const MAX_PARTICLES: usize = 1000;
pub const FRAME_DT: f64 = 1.0;
pub const PHOTON_SPEED: f64 = 8.0;
/// Charge-to-mass ratio of an electron in pixel units (negative).
pub const PIXEL_ELECTRON_Q_OVER_M: f64 = -1.0;
/// Launch speed of photoelectrons and secondaries (px/frame).
pub const EMISSION_SPEED: f64 = 1.0;
/// Angular spread of emitted secondaries around the surface normal (rad).
pub const EMISSION_SPREAD: f64 = 0.5235987755982988; // 30°
pub const WORLD_WIDTH: f64 = 800.0;
pub const WORLD_HEIGHT: f64 = 600.0;
pub const TRAIL_LENGTH: usize = 64;
/// Distance a secondary is pushed off the struck surface (px)
pub const SURFACE_PUSH_PX: f64 = 1.0;

// ====================
// Pulse (batch cascades)
// ====================
pub const PHOTOELECTRON_ENERGY_EV: f64 = 0.5;
pub const PHOTOELECTRON_ENERGY_SPREAD_EV: f64 = 0.2;
pub const GAIN_HISTOGRAM_BINS: usize = 32;

/// How a real-valued yield becomes an integer number of secondaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum YieldRounding {
    Floor,
    #[default]
    Round,
}

impl YieldRounding {
    pub fn apply(self, y: f64) -> usize {
        let y = match self {
            YieldRounding::Floor => y.floor(),
            YieldRounding::Round => y.round(),
        };
        if y.is_finite() && y > 0.0 {
            y as usize
        } else {
            0
        }
    }
}

/// Settings for the exact (relativistic, recursive-cascade) engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactConfig {
    /// Integration timestep (s)
    pub dt: f64,
    pub max_steps: usize,
    pub max_depth: usize,
    pub spawn_threshold_ev: f64,
    pub secondary_energy_ev: f64,
    /// Sample secondary directions from a cosine hemisphere instead of the surface normal
    pub random_angle: bool,
    /// Emit per-step `trace!` records
    pub trace: bool,
    /// Keep every n-th trajectory sample (segment endpoints are always kept)
    pub sample_stride: usize,
    pub surface_offset: f64,
    pub reference_radius_mm: f64,
    pub volume_margin_mm: f64,
    /// Uniform magnetic field (T)
    pub magnetic_field: [f64; 3],
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT_S,
            max_steps: MAX_STEPS_PER_PARTICLE,
            max_depth: MAX_CASCADE_DEPTH,
            spawn_threshold_ev: SPAWN_THRESHOLD_EV,
            secondary_energy_ev: SECONDARY_ENERGY_EV,
            random_angle: false,
            trace: false,
            sample_stride: 1,
            surface_offset: SURFACE_OFFSET_M,
            reference_radius_mm: FIELD_REFERENCE_RADIUS_MM,
            volume_margin_mm: VOLUME_MARGIN_MM,
            magnetic_field: [0.0, 0.0, 0.0],
        }
    }
}

impl ExactConfig {
    /// Range checks for values read from a scenario. The message names the first bad setting.
    pub fn check(&self) -> Result<(), &'static str> {
        if !(self.dt > 0.0 && self.dt.is_finite()) || self.max_steps == 0 {
            return Err("exact engine needs a finite positive dt and a step budget");
        }
        let non_negative = [
            self.spawn_threshold_ev,
            self.secondary_energy_ev,
            self.surface_offset,
            self.volume_margin_mm,
        ];
        if !non_negative.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err("exact engine energies and distances must be finite and non-negative");
        }
        if !(self.reference_radius_mm > 0.0 && self.reference_radius_mm.is_finite()) {
            return Err("exact engine reference radius must be finite and positive");
        }
        if !self.magnetic_field.iter().all(|b| b.is_finite()) {
            return Err("exact engine magnetic field must be finite");
        }
        Ok(())
    }
}

/// Settings for the frame-stepped interactive engine (pixel units).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveConfig {
    pub dt: f64,
    pub coulomb_k: f64,
    pub field_epsilon: f64,
    pub field_enabled: bool,
    pub max_particles: usize,
    pub photon_speed: f64,
    pub q_over_m: f64,
    pub emission_speed: f64,
    pub emission_spread: f64,
    /// Uniform out-of-plane magnetic field
    pub bz: f64,
    /// Uniform background electric field added to the electrode field
    pub drift_field: [f64; 2],
    pub world_width: f64,
    pub world_height: f64,
    pub quantum_efficiency: f64,
    pub rounding: YieldRounding,
    pub trail_length: usize,
    pub surface_push: f64,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            dt: FRAME_DT,
            coulomb_k: PIXEL_COULOMB_K,
            field_epsilon: PIXEL_FIELD_EPSILON,
            field_enabled: true,
            max_particles: MAX_PARTICLES,
            photon_speed: PHOTON_SPEED,
            q_over_m: PIXEL_ELECTRON_Q_OVER_M,
            emission_speed: EMISSION_SPEED,
            emission_spread: EMISSION_SPREAD,
            bz: 0.0,
            drift_field: [0.0, 0.0],
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            quantum_efficiency: 1.0,
            rounding: YieldRounding::default(),
            trail_length: TRAIL_LENGTH,
            surface_push: SURFACE_PUSH_PX,
        }
    }
}

impl InteractiveConfig {
    /// Range checks for values read from a scenario. The message names the first bad setting.
    pub fn check(&self) -> Result<(), &'static str> {
        if !(self.dt > 0.0 && self.dt.is_finite()) || self.max_particles == 0 {
            return Err("interactive engine needs a finite positive dt and a particle cap");
        }
        let finite = [
            self.coulomb_k,
            self.field_epsilon,
            self.photon_speed,
            self.q_over_m,
            self.emission_speed,
            self.emission_spread,
            self.bz,
            self.drift_field[0],
            self.drift_field[1],
            self.world_width,
            self.world_height,
            self.surface_push,
        ];
        if !finite.iter().all(|v| v.is_finite()) {
            return Err("interactive engine settings must be finite");
        }
        if self.q_over_m == 0.0 {
            return Err("interactive charge-to-mass ratio must not be zero");
        }
        if !(0.0..=std::f64::consts::PI).contains(&self.emission_spread) {
            return Err("emission spread must lie in [0, π]");
        }
        if self.world_width <= 0.0 || self.world_height <= 0.0 {
            return Err("interactive world must have a positive size");
        }
        if !(0.0..=1.0).contains(&self.quantum_efficiency) {
            return Err("quantum efficiency must lie in [0, 1]");
        }
        Ok(())
    }
}

/// Settings for a pulse of photoelectrons run through the exact engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub photons: usize,
    pub seed: u64,
    pub energy_ev: f64,
    pub energy_spread_ev: f64,
    pub histogram_bins: usize,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            photons: 100,
            seed: 0,
            energy_ev: PHOTOELECTRON_ENERGY_EV,
            energy_spread_ev: PHOTOELECTRON_ENERGY_SPREAD_EV,
            histogram_bins: GAIN_HISTOGRAM_BINS,
        }
    }
}

impl PulseConfig {
    pub fn check(&self) -> Result<(), &'static str> {
        if !(self.energy_ev.is_finite() && self.energy_ev >= 0.0) {
            return Err("photoelectron energy must be finite and non-negative");
        }
        if !(self.energy_spread_ev.is_finite() && self.energy_spread_ev >= 0.0) {
            return Err("photoelectron energy spread must be finite and non-negative");
        }
        if self.histogram_bins == 0 {
            return Err("gain histogram needs at least one bin");
        }
        Ok(())
    }
}
