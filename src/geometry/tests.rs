use super::*;
use ultraviolet::DVec2;

fn v(x: f64, y: f64) -> DVec2 {
    DVec2::new(x, y)
}

fn square() -> Vec<DVec2> {
    vec![v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0), v(0.0, 10.0)]
}

fn l_shape() -> Vec<DVec2> {
    vec![
        v(0.0, 0.0),
        v(10.0, 0.0),
        v(10.0, 5.0),
        v(5.0, 5.0),
        v(5.0, 10.0),
        v(0.0, 10.0),
    ]
}

#[test]
fn square_polygon_containment() {
    let sq = square();
    assert!(polygon_contains(&sq, v(5.0, 5.0)));
    assert!(!polygon_contains(&sq, v(-5.0, 5.0)));
    assert!(!polygon_contains(&sq, v(15.0, 5.0)));
}

#[test]
fn l_shape_notch_is_outside() {
    let l = l_shape();
    assert!(!polygon_contains(&l, v(8.0, 8.0)));
    assert!(polygon_contains(&l, v(2.0, 2.0)));
    assert!(polygon_contains(&l, v(8.0, 2.0)));
    assert!(polygon_contains(&l, v(2.0, 8.0)));
}

#[test]
fn degenerate_polygons_do_not_panic() {
    assert!(!polygon_contains(&[], v(0.0, 0.0)));
    assert!(!polygon_contains(&[v(1.0, 1.0), v(2.0, 2.0)], v(1.5, 1.5)));
    // Repeated vertex and a collinear run
    let poly = vec![
        v(0.0, 0.0),
        v(0.0, 0.0),
        v(5.0, 0.0),
        v(10.0, 0.0),
        v(10.0, 10.0),
        v(0.0, 10.0),
    ];
    assert!(polygon_contains(&poly, v(5.0, 5.0)));
    assert!(!polygon_contains(&poly, v(5.0, 15.0)));
}

#[test]
fn bounds_with_negative_extent_are_normalized() {
    let shape = Shape::Bounds {
        x: 10.0,
        y: 10.0,
        w: -10.0,
        h: -10.0,
    };
    assert!(shape.contains(DVec2::zero(), v(5.0, 5.0)));
    assert!(!shape.contains(DVec2::zero(), v(15.0, 5.0)));
    assert_eq!(normalize_rect(10.0, 10.0, -10.0, -4.0), (0.0, 6.0, 10.0, 4.0));
}

#[test]
fn implicit_square_uses_component_center() {
    let shape = Shape::Rect { half_width: 10.0 };
    let c = v(150.0, 200.0);
    assert!(shape.contains(c, v(155.0, 195.0)));
    assert!(!shape.contains(c, v(161.0, 200.0)));
    let outline = shape.outline(c);
    assert_eq!(outline.len(), 4);
    assert_eq!(outline[0], v(140.0, 190.0));
}

#[test]
fn segment_crossing_finds_point() {
    let p = segment_intersection(v(0.0, 5.0), v(10.0, 5.0), v(5.0, 0.0), v(5.0, 10.0));
    assert_eq!(p, Some(v(5.0, 5.0)));
    // Parallel
    assert!(segment_intersection(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), v(1.0, 1.0)).is_none());
    // Would intersect only if extended
    assert!(segment_intersection(v(0.0, 5.0), v(4.0, 5.0), v(5.0, 0.0), v(5.0, 10.0)).is_none());
}

#[test]
fn impact_located_on_entry_edge() {
    let sq = square();
    // Coming from the left into the x=0 edge (edge index 3: (0,10)->(0,0))
    let hit = locate_impact(&sq, v(-2.0, 4.0), v(2.0, 4.0));
    assert_eq!(hit.edge, Some(3));
    assert!((hit.point - v(0.0, 4.0)).mag() < 1e-12);

    let n = hit_normal(&sq, &hit, v(1.0, 0.0));
    assert!((n - v(-1.0, 0.0)).mag() < 1e-12);
}

#[test]
fn missed_edges_fall_back_to_first_vertex() {
    let sq = square();
    // Both samples strictly inside: no boundary crossing is visible
    let hit = locate_impact(&sq, v(3.0, 3.0), v(4.0, 4.0));
    assert_eq!(hit.edge, None);
    assert_eq!(hit.point, v(0.0, 0.0));
    let n = hit_normal(&sq, &hit, v(1.0, 1.0));
    assert!((n.mag() - 1.0).abs() < 1e-12);
    assert!(n.dot(v(1.0, 1.0)) < 0.0);

    let empty = locate_impact(&[], v(0.0, 0.0), v(1.0, 0.0));
    assert_eq!(empty.point, v(1.0, 0.0));
}

#[test]
fn normal_always_opposes_approach() {
    let a = v(0.0, 0.0);
    let b = v(10.0, 0.0);
    let from_above = facing_normal(a, b, v(0.3, -1.0));
    assert!(from_above.y > 0.0);
    let from_below = facing_normal(a, b, v(0.3, 1.0));
    assert!(from_below.y < 0.0);
}
