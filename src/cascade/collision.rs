// cascade/collision.rs
// Turns a "position is inside dinode i" detection into a collision event

use log::warn;
use ultraviolet::{DVec2, DVec3};

use crate::component::Electrode;
use crate::geometry::{hit_normal, locate_impact};
use crate::integrator::BorisState;
use crate::units::{self, ELECTRON_CHARGE, ELECTRON_MASS};
use crate::vector::{angle_between, flatten, fold_to_quarter, lift};

/// One particle/surface intersection. Produced and consumed within a cascade step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionEvent {
    /// Boundary crossing (m)
    pub point: DVec3,
    /// Unit surface normal facing the incoming particle
    pub normal: DVec3,
    /// Impact energy from the pre-collision speed (eV)
    pub energy_ev: f64,
    /// Incidence angle from the normal, `[0, π/2]`
    pub angle: f64,
    pub dynode: usize,
}

/// Incidence angle between the reversed approach direction and the surface normal.
pub fn incidence_angle(velocity: DVec3, normal: DVec3) -> f64 {
    fold_to_quarter(angle_between(-velocity, normal))
}

/// Kinetic energy of an electron moving at `velocity`, `½(m/|q|)v²` in eV.
pub fn impact_energy_ev(velocity: DVec3) -> f64 {
    units::kinetic_energy_ev(velocity.mag(), ELECTRON_MASS, ELECTRON_CHARGE)
}

/// Locate the crossing on the dinode outline between the previous position `from` and the
/// current state, and derive normal, angle and energy from it.
pub fn resolve_collision(
    dynode: &dyn Electrode,
    index: usize,
    from: DVec3,
    state: &BorisState,
) -> CollisionEvent {
    let outline = dynode.vertices_mm();
    let to = state.x;
    let from_mm = flatten(from) * units::MM_PER_M;
    let to_mm = flatten(to) * units::MM_PER_M;
    let hit = locate_impact(&outline, from_mm, to_mm);
    if hit.edge.is_none() {
        warn!(
            "no boundary crossing found on dinode {} ({} vertices); using nominal impact point",
            index,
            outline.len()
        );
    }

    let velocity = state.velocity();
    let mut incoming = flatten(velocity);
    if incoming.mag_sq() == 0.0 {
        incoming = to_mm - from_mm;
    }
    let normal2: DVec2 = hit_normal(&outline, &hit, incoming);
    let normal = lift(normal2);
    let point = DVec3::new(
        hit.point.x * units::M_PER_MM,
        hit.point.y * units::M_PER_MM,
        to.z,
    );
    CollisionEvent {
        point,
        normal,
        energy_ev: impact_energy_ev(velocity),
        angle: incidence_angle(velocity, normal),
        dynode: index,
    }
}
