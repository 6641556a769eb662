// interactive/frame.rs
// One frame of the real-time engine: photon flight, photoemission, electron motion and collisions

use rand::Rng;
use serde::Serialize;
use ultraviolet::DVec2;

use crate::cascade::incidence_angle;
use crate::component::{Component, ComponentKind};
use crate::config::InteractiveConfig;
use crate::field::CoulombField;
use crate::geometry::{hit_normal, locate_impact};
use crate::integrator::boris_velocity_2d;
use crate::particle::{Particle, ParticleKind};
use crate::profile_scope;
use crate::sey::StrikeConditions;
use crate::vector::{lift, rotate2};

/// An electron collected by the anode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AnodeHit {
    pub particle: u64,
    pub position: DVec2,
    pub generation: u32,
}

/// What a frame produced besides the in-place particle updates.
#[derive(Clone, Debug, Default)]
pub struct FrameUpdate {
    pub particles_to_add: Vec<Particle>,
    pub anode_hits: Vec<AnodeHit>,
    pub dinode_strikes: usize,
}

enum Fate {
    Keep,
    Remove,
    Collected,
    Struck(usize),
}

/// Advance every live particle by one frame.
///
/// Positions, velocities, trails and `remove` flags are updated in place; nothing is added to or
/// taken from `particles`. New photoelectrons and secondaries come back in
/// [`FrameUpdate::particles_to_add`]. Particles already flagged for removal are skipped.
pub fn update_particles<R: Rng + ?Sized>(
    particles: &mut [Particle],
    components: &[Component],
    cfg: &InteractiveConfig,
    rng: &mut R,
) -> FrameUpdate {
    profile_scope!("frame");
    let mut update = FrameUpdate::default();
    let mut field = CoulombField::new(components, cfg.coulomb_k, cfg.field_epsilon);
    field.enabled = cfg.field_enabled;
    let drift = DVec2::new(cfg.drift_field[0], cfg.drift_field[1]);

    let fotocathode = components
        .iter()
        .position(|c| c.kind == ComponentKind::Fotocathode);
    let axis = emission_axis(components, fotocathode);

    for p in particles.iter_mut() {
        if p.remove {
            continue;
        }
        match p.kind() {
            ParticleKind::Photon => {
                p.pos += p.vel * cfg.dt;
                p.record(cfg.trail_length);
                if !in_world(p.pos, cfg) {
                    p.remove = true;
                    continue;
                }
                let Some(fc) = fotocathode else { continue };
                let cathode = &components[fc];
                if !cathode.contains(p.pos) {
                    continue;
                }
                p.remove = true;
                if rng.random::<f64>() < cfg.quantum_efficiency {
                    let dir = rotate2(axis, jitter(cfg.emission_spread, rng));
                    let e = Particle::electron(p.pos, dir * cfg.emission_speed, cathode.voltage)
                        .with_emitter(fc);
                    update.particles_to_add.push(e);
                }
            }
            ParticleKind::Electron => {
                let e = field.field_excluding(p.pos, p.emitter) + drift;
                p.vel = boris_velocity_2d(p.vel, e, cfg.bz, cfg.q_over_m, cfg.dt);
                let from = p.pos;
                p.pos += p.vel * cfg.dt;
                p.record(cfg.trail_length);

                match electron_fate(p, from, components, cfg, rng) {
                    Fate::Keep => {}
                    Fate::Remove => p.remove = true,
                    Fate::Collected => {
                        p.remove = true;
                        update.anode_hits.push(AnodeHit {
                            particle: p.id,
                            position: p.pos,
                            generation: p.generation,
                        });
                    }
                    Fate::Struck(index) => {
                        p.remove = true;
                        update.dinode_strikes += 1;
                        emit_secondaries(p, from, index, &components[index], cfg, rng, &mut update);
                    }
                }
            }
        }
    }
    update
}

/// Unit direction photoelectrons leave the fotocathode in: towards the anode, +x without one.
fn emission_axis(components: &[Component], fotocathode: Option<usize>) -> DVec2 {
    let anode = components.iter().find(|c| c.kind == ComponentKind::Anode);
    match (fotocathode, anode) {
        (Some(fc), Some(a)) => {
            let d = a.position - components[fc].position;
            if d.mag_sq() > 0.0 {
                d.normalized()
            } else {
                DVec2::unit_x()
            }
        }
        _ => DVec2::unit_x(),
    }
}

fn in_world(p: DVec2, cfg: &InteractiveConfig) -> bool {
    p.x >= 0.0 && p.x <= cfg.world_width && p.y >= 0.0 && p.y <= cfg.world_height
}

fn jitter<R: Rng + ?Sized>(spread: f64, rng: &mut R) -> f64 {
    // A spread wider than a half turn, or a non-finite one, covers the whole circle
    let s = spread.abs().min(std::f64::consts::PI);
    if s == 0.0 {
        0.0
    } else {
        rng.random_range(-s..=s)
    }
}

/// Collision checks in fixed order: world bounds, anode, absorbers, dinodes.
fn electron_fate<R: Rng + ?Sized>(
    p: &Particle,
    from: DVec2,
    components: &[Component],
    cfg: &InteractiveConfig,
    rng: &mut R,
) -> Fate {
    if !in_world(p.pos, cfg) {
        return Fate::Remove;
    }
    if components
        .iter()
        .any(|c| c.kind == ComponentKind::Anode && c.contains(p.pos))
    {
        return Fate::Collected;
    }
    // Absorbers only act on entry, so a transmitted electron isn't re-tested every frame inside
    for c in components.iter().filter(|c| c.kind.is_absorber()) {
        if c.contains(p.pos) && !c.contains(from) && rng.random::<f64>() >= c.transmission {
            return Fate::Remove;
        }
    }
    components
        .iter()
        .position(|c| c.kind == ComponentKind::Dinode && c.contains(p.pos))
        .map_or(Fate::Keep, Fate::Struck)
}

fn emit_secondaries<R: Rng + ?Sized>(
    p: &Particle,
    from: DVec2,
    index: usize,
    dinode: &Component,
    cfg: &InteractiveConfig,
    rng: &mut R,
    update: &mut FrameUpdate,
) {
    let outline = dinode.outline();
    let hit = locate_impact(&outline, from, p.pos);
    let normal = hit_normal(&outline, &hit, p.vel);
    let strike = StrikeConditions {
        energy_ev: 0.5 * p.vel.mag_sq() / cfg.q_over_m.abs(),
        angle: incidence_angle(lift(p.vel), lift(normal)),
        delta_v: dinode.voltage - p.source_voltage,
    };
    let count = cfg.rounding.apply(dinode.yield_model.sample(&strike, rng));
    let start = hit.point + normal * cfg.surface_push;
    for _ in 0..count {
        let dir = rotate2(normal, jitter(cfg.emission_spread, rng));
        let mut s = Particle::electron(start, dir * cfg.emission_speed, dinode.voltage)
            .with_emitter(index);
        s.generation = p.generation + 1;
        update.particles_to_add.push(s);
    }
}
