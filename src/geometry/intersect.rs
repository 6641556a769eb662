// geometry/intersect.rs
// Segment/edge intersection and impact-point location for the exact engine

use ultraviolet::DVec2;

use crate::vector::cross2;

const PARALLEL_EPS: f64 = 1e-12;

/// Where a sampled path segment crossed an electrode boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryHit {
    pub point: DVec2,
    /// Index `i` of the crossed edge `vertices[i] -> vertices[i + 1]`, or `None` when the
    /// nominal fallback point was used.
    pub edge: Option<usize>,
}

/// Parametric intersection of `p1→p2` with `q1→q2`.
///
/// Returns the point when both parameters lie in `[0, 1]`. Parallel or degenerate
/// segments never intersect.
pub fn segment_intersection(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> Option<DVec2> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = cross2(r, s);
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let qp = q1 - p1;
    let t = cross2(qp, s) / denom;
    let u = cross2(qp, r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(p1 + r * t)
    } else {
        None
    }
}

/// Find where the path `from → to` enters the closed outline.
///
/// Edges are tested in vertex order and the first hit wins. If no edge
/// matches (the step skipped over a thin electrode), the first vertex is returned as the
/// nominal impact point. An empty outline falls back to `to`.
pub fn locate_impact(outline: &[DVec2], from: DVec2, to: DVec2) -> BoundaryHit {
    let n = outline.len();
    for i in 0..n {
        let a = outline[i];
        let b = outline[(i + 1) % n];
        if let Some(point) = segment_intersection(from, to, a, b) {
            return BoundaryHit {
                point,
                edge: Some(i),
            };
        }
    }
    BoundaryHit {
        point: outline.first().copied().unwrap_or(to),
        edge: None,
    }
}

/// Unit normal of edge `a→b`, oriented against `incoming`.
///
/// Falls back to `-incoming` when the edge is degenerate, and to `+y` when both are.
pub fn facing_normal(a: DVec2, b: DVec2, incoming: DVec2) -> DVec2 {
    let edge = b - a;
    let len = edge.mag();
    if len < PARALLEL_EPS {
        return reversed_unit(incoming);
    }
    let mut n = DVec2::new(-edge.y, edge.x) / len;
    if n.dot(incoming) > 0.0 {
        n = -n;
    }
    n
}

/// Surface normal at a located hit, oriented against `incoming`.
pub fn hit_normal(outline: &[DVec2], hit: &BoundaryHit, incoming: DVec2) -> DVec2 {
    match hit.edge {
        Some(i) if !outline.is_empty() => {
            let a = outline[i];
            let b = outline[(i + 1) % outline.len()];
            facing_normal(a, b, incoming)
        }
        _ => reversed_unit(incoming),
    }
}

fn reversed_unit(v: DVec2) -> DVec2 {
    let m = v.mag();
    if m < PARALLEL_EPS {
        DVec2::new(0.0, 1.0)
    } else {
        -v / m
    }
}
