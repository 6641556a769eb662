//! Small vector helpers on top of `ultraviolet`'s double-precision types.
//!
//! Engines do their arithmetic directly on `DVec2`/`DVec3`; this module only adds the
//! handful of operations ultraviolet doesn't spell out the way the collision code needs.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use ultraviolet::{DVec2, DVec3};

/// Squared-length threshold below which a vector is treated as zero.
pub const TINY_SQ: f64 = 1e-30;

/// Scalar (z-component) cross product of two planar vectors.
#[inline]
pub fn cross2(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Lift a planar vector into 3D with `z = 0`.
#[inline]
pub fn lift(v: DVec2) -> DVec3 {
    DVec3::new(v.x, v.y, 0.0)
}

/// Drop the z component.
#[inline]
pub fn flatten(v: DVec3) -> DVec2 {
    DVec2::new(v.x, v.y)
}

/// Unit vector along `v`, or zero if `v` is (numerically) zero.
#[inline]
pub fn safe_normalized(v: DVec3) -> DVec3 {
    let m2 = v.mag_sq();
    if m2 < TINY_SQ {
        DVec3::zero()
    } else {
        v / m2.sqrt()
    }
}

/// Unsigned angle between two vectors, `atan2(|a×b|, a·b)`, in `[0, π]`.
///
/// Stable for nearly parallel vectors where `acos` of the normalized dot product is not.
#[inline]
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).mag().atan2(a.dot(b))
}

/// Fold an angle in `[0, π]` into `[0, π/2]`.
#[inline]
pub fn fold_to_quarter(theta: f64) -> f64 {
    let t = theta.abs() % PI;
    if t > FRAC_PI_2 {
        PI - t
    } else {
        t
    }
}

/// Build two unit vectors that complete `normal` into a right-handed orthonormal frame.
pub fn orthonormal_frame(normal: DVec3) -> (DVec3, DVec3) {
    let n = safe_normalized(normal);
    let helper = if n.x.abs() < 0.9 {
        DVec3::unit_x()
    } else {
        DVec3::unit_y()
    };
    let t1 = safe_normalized(helper - n * helper.dot(n));
    let t2 = n.cross(t1);
    (t1, t2)
}

/// Rotate a vector expressed in a local frame (whose z axis is the surface normal)
/// into world coordinates.
pub fn local_to_world(local: DVec3, normal: DVec3) -> DVec3 {
    let n = safe_normalized(normal);
    let (t1, t2) = orthonormal_frame(n);
    t1 * local.x + t2 * local.y + n * local.z
}

/// Cosine-weighted direction on the unit hemisphere around +z from two uniform samples in `[0, 1)`.
pub fn cosine_hemisphere(u1: f64, u2: f64) -> DVec3 {
    let r = u1.sqrt();
    let phi = TAU * u2;
    DVec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt())
}

/// Rotate a planar vector by `angle` radians counter-clockwise.
#[inline]
pub fn rotate2(v: DVec2, angle: f64) -> DVec2 {
    let (s, c) = angle.sin_cos();
    DVec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}
