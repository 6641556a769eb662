//! Electromagnetic field sources.
//!
//! - [`CoulombField`]: electrostatic superposition over the tube's electrodes, each treated as
//!   a point charge of strength `k · V` at its shape's centroid.
//! - [`UniformField`]: constant E and B.
//! - [`FieldCallbacks`]: six scalar callbacks (Ex, Ey, Ez, Bx, By, Bz) supplied by the caller.
//!
//! The exact engine only sees the [`EmField`] trait; closures implement it directly.

use ultraviolet::{DVec2, DVec3};

use crate::component::Component;
use crate::config;
use crate::units;
use crate::vector::{flatten, lift};

/// Field sampling for the exact engine: `(E [V/m], B [T])` at `pos` (m), time `t` (s).
pub trait EmField: Sync {
    fn sample(&self, pos: DVec3, t: f64) -> (DVec3, DVec3);
}

impl<F> EmField for F
where
    F: Fn(DVec3, f64) -> (DVec3, DVec3) + Sync,
{
    fn sample(&self, pos: DVec3, t: f64) -> (DVec3, DVec3) {
        self(pos, t)
    }
}

/// Point-charge superposition over a set of electrodes.
///
/// Source positions and the sample point share one length unit; `k` absorbs the unit choice.
#[derive(Clone, Debug)]
pub struct CoulombField {
    sources: Vec<(DVec2, f64)>,
    pub k: f64,
    /// Squared distance below which a source is skipped
    pub epsilon: f64,
    pub enabled: bool,
    /// Uniform magnetic field reported alongside E when sampled as an [`EmField`]
    pub magnetic: DVec3,
}

impl CoulombField {
    /// Field in the components' own units (the interactive engine's pixels).
    pub fn new(components: &[Component], k: f64, epsilon: f64) -> Self {
        Self {
            sources: components
                .iter()
                .map(|c| (c.charge_position(), c.voltage))
                .collect(),
            k,
            epsilon,
            enabled: true,
            magnetic: DVec3::zero(),
        }
    }

    /// SI field from components laid out in millimetres.
    ///
    /// Each electrode acts as a charge whose potential equals its bias at `reference_radius_m`,
    /// so `k = reference_radius_m` and `E = V·r₀/d²` in V/m.
    pub fn millimetres(components: &[Component], reference_radius_m: f64) -> Self {
        Self {
            sources: components
                .iter()
                .map(|c| (c.charge_position() * units::M_PER_MM, c.voltage))
                .collect(),
            k: reference_radius_m,
            epsilon: config::SI_FIELD_EPSILON,
            enabled: true,
            magnetic: DVec3::zero(),
        }
    }

    pub fn with_magnetic(mut self, b: DVec3) -> Self {
        self.magnetic = b;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Net electrostatic field at `point`: `Σ k·V·d/|d|³` over sources farther than `√ε`.
    pub fn field(&self, point: DVec2) -> DVec2 {
        self.field_excluding(point, None)
    }

    /// [`field`](Self::field) without the contribution of source `skip` (a component index).
    pub fn field_excluding(&self, point: DVec2, skip: Option<usize>) -> DVec2 {
        if !self.enabled {
            return DVec2::zero();
        }
        let mut e = DVec2::zero();
        for (i, &(pos, voltage)) in self.sources.iter().enumerate() {
            if skip == Some(i) {
                continue;
            }
            let d = point - pos;
            let r2 = d.mag_sq();
            if r2 < self.epsilon {
                continue;
            }
            let r = r2.sqrt();
            e += d * (self.k * voltage / (r2 * r));
        }
        e
    }

    /// Potential `Σ k·V/|d|`, skipping the same near-singular sources as [`field`](Self::field).
    pub fn potential(&self, point: DVec2) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        self.sources
            .iter()
            .filter_map(|&(pos, voltage)| {
                let r2 = (point - pos).mag_sq();
                (r2 >= self.epsilon).then(|| self.k * voltage / r2.sqrt())
            })
            .sum()
    }
}

impl EmField for CoulombField {
    fn sample(&self, pos: DVec3, _t: f64) -> (DVec3, DVec3) {
        (lift(self.field(flatten(pos))), self.magnetic)
    }
}

/// Constant electric and magnetic field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UniformField {
    pub e: DVec3,
    pub b: DVec3,
}

impl UniformField {
    pub fn new(e: DVec3, b: DVec3) -> Self {
        Self { e, b }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

impl EmField for UniformField {
    fn sample(&self, _pos: DVec3, _t: f64) -> (DVec3, DVec3) {
        (self.e, self.b)
    }
}

type Component6 = Box<dyn Fn(f64, f64, f64, f64) -> f64 + Send + Sync>;

/// One callback per field component, each `(x, y, z, t) -> value` in SI units.
pub struct FieldCallbacks {
    pub ex: Component6,
    pub ey: Component6,
    pub ez: Component6,
    pub bx: Component6,
    pub by: Component6,
    pub bz: Component6,
}

impl FieldCallbacks {
    /// All six components zero; override the ones you need.
    pub fn zero() -> Self {
        Self {
            ex: Box::new(|_, _, _, _| 0.0),
            ey: Box::new(|_, _, _, _| 0.0),
            ez: Box::new(|_, _, _, _| 0.0),
            bx: Box::new(|_, _, _, _| 0.0),
            by: Box::new(|_, _, _, _| 0.0),
            bz: Box::new(|_, _, _, _| 0.0),
        }
    }
}

impl EmField for FieldCallbacks {
    fn sample(&self, pos: DVec3, t: f64) -> (DVec3, DVec3) {
        let (x, y, z) = (pos.x, pos.y, pos.z);
        (
            DVec3::new((self.ex)(x, y, z, t), (self.ey)(x, y, z, t), (self.ez)(x, y, z, t)),
            DVec3::new((self.bx)(x, y, z, t), (self.by)(x, y, z, t), (self.bz)(x, y, z, t)),
        )
    }
}
