// interactive/mod.rs
// Frame-stepped engine for live display: non-relativistic, single generation per frame, capped

mod frame;

pub use frame::*;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use ultraviolet::DVec2;

use crate::component::{Component, ComponentSet};
use crate::error::Result;
use crate::config::InteractiveConfig;
use crate::particle::{Particle, ParticleKind};

/// Counts after one completed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frame: usize,
    pub photons: usize,
    pub electrons: usize,
    pub spawned: usize,
    pub anode_hits: usize,
    pub dinode_strikes: usize,
    /// Oldest particles dropped to respect the particle cap
    pub dropped: usize,
}

/// Live state of the interactive engine.
///
/// Stopping only gates [`tick`](Self::tick); particles and counters stay exactly as the last
/// completed frame left them.
pub struct InteractiveSim {
    /// Oldest first
    pub particles: Vec<Particle>,
    /// Particles refer to these by index through `emitter`; remove entries with
    /// [`remove_component`](Self::remove_component) so those indices follow along.
    pub components: ComponentSet,
    pub config: InteractiveConfig,
    pub frame: usize,
    /// Electrons collected so far
    pub anode_current: u64,
    /// Every anode hit with the frame it happened in
    pub anode_log: Vec<(usize, AnodeHit)>,
    running: bool,
    rng: StdRng,
}

impl InteractiveSim {
    pub fn new(components: ComponentSet, config: InteractiveConfig, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            components,
            config,
            frame: 0,
            anode_current: 0,
            anode_log: Vec::new(),
            running: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Photon launched from the fotocathode centre towards the anode. `false` without a fotocathode.
    pub fn emit_photon(&mut self) -> bool {
        let Some(cathode) = self.components.fotocathode() else {
            return false;
        };
        let origin = cathode.position;
        let dir = match self.components.anodes().first() {
            Some(a) if (a.position - origin).mag_sq() > 0.0 => (a.position - origin).normalized(),
            _ => DVec2::unit_x(),
        };
        let photon = Particle::photon(origin, dir * self.config.photon_speed);
        self.add_particles(std::iter::once(photon));
        true
    }

    /// Append particles, then drop the oldest beyond the cap. Returns how many were dropped.
    pub fn add_particles<I: IntoIterator<Item = Particle>>(&mut self, new: I) -> usize {
        self.particles.extend(new);
        self.enforce_cap()
    }

    fn enforce_cap(&mut self) -> usize {
        let cap = self.config.max_particles;
        if self.particles.len() <= cap {
            return 0;
        }
        let excess = self.particles.len() - cap;
        self.particles.drain(..excess);
        debug!("particle cap {} reached, dropped {} oldest", cap, excess);
        excess
    }

    /// Run one frame regardless of the running flag.
    pub fn step(&mut self) -> FrameStats {
        let update = update_particles(
            &mut self.particles,
            self.components.components(),
            &self.config,
            &mut self.rng,
        );
        self.particles.retain(|p| !p.remove);

        let spawned = update.particles_to_add.len();
        let dropped = self.add_particles(update.particles_to_add);
        self.anode_current += update.anode_hits.len() as u64;
        let frame = self.frame;
        self.anode_log
            .extend(update.anode_hits.iter().map(|h| (frame, *h)));
        self.frame += 1;

        let photons = self
            .particles
            .iter()
            .filter(|p| p.kind() == ParticleKind::Photon)
            .count();
        FrameStats {
            frame,
            photons,
            electrons: self.particles.len() - photons,
            spawned,
            anode_hits: update.anode_hits.len(),
            dinode_strikes: update.dinode_strikes,
            dropped,
        }
    }

    /// One frame if running, nothing otherwise.
    pub fn tick(&mut self) -> Option<FrameStats> {
        if self.running {
            Some(self.step())
        } else {
            None
        }
    }

    /// Remove a dinode or custom shape while particles are in flight.
    ///
    /// Electrons emitted by the removed component start feeling the whole field; emitter indices
    /// past it shift down with the component list.
    pub fn remove_component(&mut self, index: usize) -> Result<Component> {
        let removed = self.components.remove(index)?;
        for p in &mut self.particles {
            p.emitter = match p.emitter {
                Some(i) if i == index => None,
                Some(i) if i > index => Some(i - 1),
                other => other,
            };
        }
        Ok(removed)
    }

    /// Drop all particles and counters; components and settings are kept.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.frame = 0;
        self.anode_current = 0;
        self.anode_log.clear();
    }
}
