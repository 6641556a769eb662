// geometry/mod.rs
// Electrode shapes and the point/segment tests the engines run against them

mod intersect;

pub use intersect::*;

use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

use crate::config;

/// Shape of an electrode in the plane.
///
/// `Rect` is centred on the owning component's position; `Bounds` and `Polygon`
/// carry absolute coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Implicit axis-aligned square around the component centre.
    Rect { half_width: f64 },
    /// Explicit bounding box with origin `(x, y)`; width/height may be negative.
    Bounds { x: f64, y: f64, w: f64, h: f64 },
    /// Closed polygon, vertices in drawing order.
    Polygon { vertices: Vec<DVec2> },
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Rect {
            half_width: config::DEFAULT_HALF_WIDTH,
        }
    }
}

impl Shape {
    /// Point containment. `center` is only used by `Rect`.
    pub fn contains(&self, center: DVec2, p: DVec2) -> bool {
        match self {
            Shape::Rect { half_width } => {
                let w = 2.0 * half_width;
                rect_contains(center.x - half_width, center.y - half_width, w, w, p)
            }
            Shape::Bounds { x, y, w, h } => rect_contains(*x, *y, *w, *h, p),
            Shape::Polygon { vertices } => polygon_contains(vertices, p),
        }
    }

    /// Boundary vertices in order. Rectangles are listed counter-clockwise from the lower-left corner.
    pub fn outline(&self, center: DVec2) -> Vec<DVec2> {
        match self {
            Shape::Rect { half_width } => {
                let h = *half_width;
                vec![
                    center + DVec2::new(-h, -h),
                    center + DVec2::new(h, -h),
                    center + DVec2::new(h, h),
                    center + DVec2::new(-h, h),
                ]
            }
            Shape::Bounds { x, y, w, h } => {
                let (x, y, w, h) = normalize_rect(*x, *y, *w, *h);
                vec![
                    DVec2::new(x, y),
                    DVec2::new(x + w, y),
                    DVec2::new(x + w, y + h),
                    DVec2::new(x, y + h),
                ]
            }
            Shape::Polygon { vertices } => vertices.clone(),
        }
    }

    /// Geometric centre. `Rect` returns its anchor; the others average their own coordinates.
    pub fn centroid(&self, center: DVec2) -> DVec2 {
        match self {
            Shape::Rect { .. } => center,
            Shape::Bounds { x, y, w, h } => DVec2::new(x + w * 0.5, y + h * 0.5),
            Shape::Polygon { vertices } => {
                if vertices.is_empty() {
                    return center;
                }
                let sum = vertices.iter().fold(DVec2::zero(), |acc, v| acc + *v);
                sum / vertices.len() as f64
            }
        }
    }
}

/// Flip negative extents so the box has a positive width and height.
pub fn normalize_rect(x: f64, y: f64, w: f64, h: f64) -> (f64, f64, f64, f64) {
    let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
    let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
    (x, y, w, h)
}

/// Axis-aligned box test, inclusive on all edges.
pub fn rect_contains(x: f64, y: f64, w: f64, h: f64, p: DVec2) -> bool {
    let (x, y, w, h) = normalize_rect(x, y, w, h);
    p.x >= x && p.x <= x + w && p.y >= y && p.y <= y + h
}

/// Even-odd ray casting. Horizontal and zero-length edges never toggle.
pub fn polygon_contains(vertices: &[DVec2], p: DVec2) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests;
