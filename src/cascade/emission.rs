// cascade/emission.rs
// Launch direction of a secondary electron

use rand::Rng;
use ultraviolet::DVec3;

use crate::vector::{cosine_hemisphere, local_to_world, safe_normalized};

/// Velocity of a secondary leaving a surface with outward `normal`.
///
/// Along the normal by default; with `random_angle` the direction is drawn from a
/// cosine-weighted hemisphere around it.
pub fn secondary_velocity<R: Rng + ?Sized>(
    normal: DVec3,
    speed: f64,
    random_angle: bool,
    rng: &mut R,
) -> DVec3 {
    let n = safe_normalized(normal);
    if !random_angle {
        return n * speed;
    }
    let local = cosine_hemisphere(rng.random::<f64>(), rng.random::<f64>());
    local_to_world(local, n) * speed
}
