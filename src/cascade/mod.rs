// cascade/mod.rs
// Exact engine: relativistic flight, dinode strikes and the secondary-electron chain

mod collision;
mod emission;

pub use collision::*;
pub use emission::*;

use log::{debug, trace, warn};
use rand::Rng;
use serde::Serialize;
use smallvec::SmallVec;
use ultraviolet::{DVec2, DVec3};

use crate::component::{Component, ComponentKind, Electrode};
use crate::config::ExactConfig;
use crate::field::EmField;
use crate::integrator::{boris_step, BorisState};
use crate::profile_scope;
use crate::sey::StrikeConditions;
use crate::units::{self, ELECTRON_CHARGE, ELECTRON_MASS, ELECTRON_Q_OVER_M};

/// What a particle ran into. `Dynode` carries the index into the dinode list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Impact {
    Anode,
    Grid,
    Dynode(usize),
    LeftVolume,
    StepCap,
    DepthCap,
}

/// How the last particle of the chain ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Termination {
    HitAnode,
    HitGrid,
    #[default]
    LeftVolume,
    /// Dinode strike too weak to emit a secondary
    Captured { dynode: usize },
    StepCap,
    DepthCap,
}

/// Everything one cascade produced, segments concatenated in flight order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CascadeResult {
    /// Trajectory samples (m)
    pub positions: Vec<DVec3>,
    /// Sample times (s)
    pub times: Vec<f64>,
    /// Running gain at each sample
    pub gains: Vec<f64>,
    pub impacts: SmallVec<[Impact; 16]>,
    /// Gain delivered to the anode, zero for lost chains
    pub terminal_gain: f64,
    pub termination: Termination,
    /// Dinode strikes that produced a secondary
    pub generations: usize,
    pub step_capped: bool,
    pub depth_capped: bool,
    pub arrival_time: Option<f64>,
    pub total_steps: usize,
}

impl CascadeResult {
    fn push_sample(&mut self, x: DVec3, t: f64, gain: f64) {
        self.positions.push(x);
        self.times.push(t);
        self.gains.push(gain);
    }

    /// Dinode indices struck, in order.
    pub fn dynode_hits(&self) -> impl Iterator<Item = usize> + '_ {
        self.impacts.iter().filter_map(|i| match i {
            Impact::Dynode(d) => Some(*d),
            _ => None,
        })
    }

    pub fn reached_anode(&self) -> bool {
        self.termination == Termination::HitAnode
    }
}

/// Bounded volume a particle must stay inside.
pub trait Enclosure: Sync {
    fn contains(&self, pos: DVec3) -> bool;
}

impl<F> Enclosure for F
where
    F: Fn(DVec3) -> bool + Sync,
{
    fn contains(&self, pos: DVec3) -> bool {
        self(pos)
    }
}

/// Axis-aligned tube outline in millimetres; z is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, serde::Deserialize)]
pub struct TubeVolume {
    pub min_mm: DVec2,
    pub max_mm: DVec2,
}

impl TubeVolume {
    pub fn new(min_mm: DVec2, max_mm: DVec2) -> Self {
        Self { min_mm, max_mm }
    }

    /// Bounding box of all components, grown by `margin_mm`.
    pub fn around(components: &[Component], margin_mm: f64) -> Self {
        let mut min = DVec2::broadcast(f64::INFINITY);
        let mut max = DVec2::broadcast(f64::NEG_INFINITY);
        for v in components.iter().flat_map(|c| c.outline()) {
            min = min.min_by_component(v);
            max = max.max_by_component(v);
        }
        if !min.x.is_finite() {
            min = DVec2::zero();
            max = DVec2::zero();
        }
        Self {
            min_mm: min - DVec2::broadcast(margin_mm),
            max_mm: max + DVec2::broadcast(margin_mm),
        }
    }
}

impl Enclosure for TubeVolume {
    fn contains(&self, pos: DVec3) -> bool {
        let x = units::m_to_mm(pos.x);
        let y = units::m_to_mm(pos.y);
        x >= self.min_mm.x && x <= self.max_mm.x && y >= self.min_mm.y && y <= self.max_mm.y
    }
}

/// Electrodes sorted by the role they play in a cascade.
pub struct TubeElectrodes<'a> {
    pub anodes: Vec<&'a dyn Electrode>,
    pub dynodes: Vec<&'a dyn Electrode>,
    /// Grid, accelerator and custom shapes
    pub grids: Vec<&'a dyn Electrode>,
}

impl<'a> TubeElectrodes<'a> {
    pub fn from_components(components: &'a [Component]) -> Self {
        let pick = |pred: fn(ComponentKind) -> bool| -> Vec<&'a dyn Electrode> {
            components
                .iter()
                .filter(|c| pred(c.kind))
                .map(|c| c as &dyn Electrode)
                .collect()
        };
        Self {
            anodes: pick(|k| k == ComponentKind::Anode),
            dynodes: pick(|k| k == ComponentKind::Dinode),
            grids: pick(ComponentKind::is_absorber),
        }
    }
}

/// Inputs of one cascade. Everything is borrowed immutably, so geometry and fields are
/// frozen for the duration of the call.
pub struct CascadeRequest<'a> {
    /// Start position (m)
    pub position: DVec3,
    /// Start velocity (m/s)
    pub velocity: DVec3,
    /// Start time (s)
    pub time: f64,
    pub field: &'a dyn EmField,
    pub electrodes: &'a TubeElectrodes<'a>,
    pub volume: &'a dyn Enclosure,
    /// Bias of the electrode the first electron leaves (V)
    pub source_voltage: f64,
    pub config: &'a ExactConfig,
}

enum FlightEnd {
    Anode,
    Grid,
    Dynode { index: usize, from: DVec3 },
    LeftVolume,
    StepCap,
}

/// Run one electron and every secondary it leads to.
///
/// Each dinode strike multiplies the running gain by that strike's yield and, if the
/// impact energy clears the spawn threshold, launches one secondary from the strike point.
/// The chain ends at the anode (gain kept), at an absorber, outside the volume, at the
/// step cap or at the depth ceiling (gain zero).
pub fn simulate_cascade<R: Rng + ?Sized>(req: &CascadeRequest<'_>, rng: &mut R) -> CascadeResult {
    profile_scope!("cascade");
    let cfg = req.config;
    let mut result = CascadeResult::default();
    let mut state = BorisState::from_velocity(req.position, req.velocity, req.time);
    let mut gain = 1.0;
    let mut source_voltage = req.source_voltage;
    result.push_sample(state.x, state.t, gain);

    loop {
        match fly(&mut state, req, gain, &mut result) {
            FlightEnd::Anode => {
                result.impacts.push(Impact::Anode);
                result.termination = Termination::HitAnode;
                result.terminal_gain = gain;
                result.arrival_time = Some(state.t);
                break;
            }
            FlightEnd::Grid => {
                result.impacts.push(Impact::Grid);
                result.termination = Termination::HitGrid;
                if let Some(last) = result.gains.last_mut() {
                    *last = 0.0;
                }
                break;
            }
            FlightEnd::LeftVolume => {
                result.impacts.push(Impact::LeftVolume);
                result.termination = Termination::LeftVolume;
                break;
            }
            FlightEnd::StepCap => {
                debug!("cascade step cap reached after {} generations", result.generations);
                result.impacts.push(Impact::StepCap);
                result.termination = Termination::StepCap;
                result.step_capped = true;
                break;
            }
            FlightEnd::Dynode { index, from } => {
                result.impacts.push(Impact::Dynode(index));
                let dynode = req.electrodes.dynodes[index];
                let event = resolve_collision(dynode, index, from, &state);
                let strike = StrikeConditions {
                    energy_ev: event.energy_ev,
                    angle: event.angle,
                    delta_v: dynode.voltage() - source_voltage,
                };
                let y = dynode.yield_model().sample(&strike, rng);
                gain *= y;
                debug!(
                    "dinode {} struck at {:.1} eV, θ = {:.3} rad, yield {:.3}, gain {:.3}",
                    index, event.energy_ev, event.angle, y, gain
                );

                if event.energy_ev <= cfg.spawn_threshold_ev {
                    debug!("dinode {} captured electron at {:.2} eV", index, event.energy_ev);
                    result.termination = Termination::Captured { dynode: index };
                    if let Some(last) = result.gains.last_mut() {
                        *last = 0.0;
                    }
                    break;
                }
                if result.generations >= cfg.max_depth {
                    debug!("cascade depth ceiling {} reached", cfg.max_depth);
                    result.impacts.push(Impact::DepthCap);
                    result.termination = Termination::DepthCap;
                    result.depth_capped = true;
                    break;
                }
                result.generations += 1;

                let speed = units::speed_from_energy_ev(
                    cfg.secondary_energy_ev,
                    ELECTRON_MASS,
                    ELECTRON_CHARGE,
                );
                let v = secondary_velocity(event.normal, speed, cfg.random_angle, rng);
                let start = event.point + event.normal * cfg.surface_offset;
                state = BorisState::from_velocity(start, v, state.t);
                source_voltage = dynode.voltage();
                result.push_sample(state.x, state.t, gain);
            }
        }
    }
    result
}

/// Integrate until something is hit. Samples every `sample_stride` steps plus the final one.
fn fly(
    state: &mut BorisState,
    req: &CascadeRequest<'_>,
    gain: f64,
    result: &mut CascadeResult,
) -> FlightEnd {
    let cfg = req.config;
    let stride = cfg.sample_stride.max(1);
    for step in 1..=cfg.max_steps {
        let from = state.x;
        let mid = boris_step(state, ELECTRON_Q_OVER_M, cfg.dt, req.field);
        result.total_steps += 1;
        if !state.is_finite() {
            warn!("non-finite particle state at t = {:e}; dropping particle", state.t);
            return FlightEnd::LeftVolume;
        }
        if cfg.trace {
            trace!("t = {:e} x = {:?} γ = {:.9}", state.t, state.x, state.gamma);
        }
        let sampled = step % stride == 0;
        if sampled {
            result.push_sample(state.x, state.t, gain);
        }

        let end = if !req.volume.contains(mid) {
            Some(FlightEnd::LeftVolume)
        } else {
            let x_mm = units::m_to_mm(state.x.x);
            let y_mm = units::m_to_mm(state.x.y);
            let e = req.electrodes;
            if e.anodes.iter().any(|a| a.is_interior(x_mm, y_mm)) {
                Some(FlightEnd::Anode)
            } else if e.grids.iter().any(|g| g.is_interior(x_mm, y_mm)) {
                Some(FlightEnd::Grid)
            } else {
                e.dynodes
                    .iter()
                    .position(|d| d.is_interior(x_mm, y_mm))
                    .map(|index| FlightEnd::Dynode { index, from })
            }
        };
        if let Some(end) = end {
            if !sampled {
                result.push_sample(state.x, state.t, gain);
            }
            return end;
        }
    }
    FlightEnd::StepCap
}
