// particle.rs
// Photons and electrons in flight for the interactive engine

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use ultraviolet::DVec2;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    Photon,
    Electron,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Particle {
    pub id: u64,
    kind: ParticleKind,
    pub pos: DVec2,
    pub vel: DVec2,
    /// Recent positions, oldest first
    pub trajectory: VecDeque<DVec2>,
    pub remove: bool,
    /// Bias of the electrode that emitted this particle (V)
    pub source_voltage: f64,
    /// Dinode strikes in this particle's ancestry
    pub generation: u32,
    /// Index of the component that emitted this electron; its own charge is not felt
    pub emitter: Option<usize>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Particle {
    fn new(kind: ParticleKind, pos: DVec2, vel: DVec2, source_voltage: f64) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            pos,
            vel,
            trajectory: VecDeque::new(),
            remove: false,
            source_voltage,
            generation: 0,
            emitter: None,
        }
    }

    pub fn photon(pos: DVec2, vel: DVec2) -> Self {
        Self::new(ParticleKind::Photon, pos, vel, 0.0)
    }

    pub fn electron(pos: DVec2, vel: DVec2, source_voltage: f64) -> Self {
        Self::new(ParticleKind::Electron, pos, vel, source_voltage)
    }

    pub fn with_emitter(mut self, index: usize) -> Self {
        self.emitter = Some(index);
        self
    }

    /// Fixed at creation.
    pub fn kind(&self) -> ParticleKind {
        self.kind
    }

    pub fn is_electron(&self) -> bool {
        self.kind == ParticleKind::Electron
    }

    /// Append the current position, keeping at most `max_len` points.
    pub fn record(&mut self, max_len: usize) {
        if max_len == 0 {
            return;
        }
        self.trajectory.push_back(self.pos);
        while self.trajectory.len() > max_len {
            self.trajectory.pop_front();
        }
    }
}
