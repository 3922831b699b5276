#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{Card, CardPayload, ShapePayload, ShapeType};

const EPSILON: f64 = 1e-9;

fn close(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
}

// =============================================================
// Anchors
// =============================================================

#[test]
fn candidates_start_with_midpoints() {
    let c = anchor_candidates(&Rect::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(c[0], Point::new(50.0, 0.0));
    assert_eq!(c[1], Point::new(100.0, 25.0));
    assert_eq!(c[2], Point::new(50.0, 50.0));
    assert_eq!(c[3], Point::new(0.0, 25.0));
    assert_eq!(c[4], Point::new(0.0, 0.0));
    assert_eq!(c[6], Point::new(100.0, 50.0));
}

#[test]
fn edge_point_is_parametric_and_clamped() {
    let r = Rect::new(10.0, 10.0, 100.0, 200.0);
    assert_eq!(edge_point(&r, Side::Right, 0.5), Point::new(110.0, 110.0));
    assert_eq!(edge_point(&r, Side::Top, 0.25), Point::new(35.0, 10.0));
    assert_eq!(edge_point(&r, Side::Left, 2.0), Point::new(10.0, 210.0));
    assert_eq!(edge_point(&r, Side::Bottom, f64::NAN), Point::new(60.0, 210.0));
}

#[test]
fn smart_anchors_side_by_side_use_facing_midpoints() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(300.0, 0.0, 100.0, 100.0);
    let (from, to) = smart_anchors(&a, AnchorPosition::Auto, &b, AnchorPosition::Auto);
    assert_eq!(from, Point::new(100.0, 50.0));
    assert_eq!(to, Point::new(300.0, 50.0));
}

#[test]
fn smart_anchors_stacked_use_bottom_and_top() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(0.0, 300.0, 100.0, 100.0);
    let (from, to) = smart_anchors(&a, AnchorPosition::Auto, &b, AnchorPosition::Auto);
    assert_eq!(from, Point::new(50.0, 100.0));
    assert_eq!(to, Point::new(50.0, 300.0));
}

#[test]
fn smart_anchors_tie_prefers_earlier_candidate() {
    // Diagonal neighbours touch at a corner.
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(100.0, 100.0, 100.0, 100.0);
    let (from, to) = smart_anchors(&a, AnchorPosition::Auto, &b, AnchorPosition::Auto);
    assert_eq!(from, Point::new(100.0, 100.0));
    assert_eq!(to, Point::new(100.0, 100.0));

    // Identical rects: every candidate matches itself at distance zero, so the first wins.
    let (from, to) = smart_anchors(&a, AnchorPosition::Auto, &a, AnchorPosition::Auto);
    assert_eq!(from, Point::new(50.0, 0.0));
    assert_eq!(to, Point::new(50.0, 0.0));
}

#[test]
fn smart_anchors_respects_pinned_end() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    let b = Rect::new(300.0, 0.0, 100.0, 100.0);
    let pinned = AnchorPosition::Edge { side: Side::Top, t: 0.0 };
    let (from, to) = smart_anchors(&a, pinned, &b, AnchorPosition::Auto);
    assert_eq!(from, Point::new(0.0, 0.0));
    assert_eq!(to, Point::new(300.0, 0.0));
}

// =============================================================
// Bezier
// =============================================================

#[test]
fn zero_curvature_is_straight() {
    let b = bezier(Point::new(0.0, 0.0), Point::new(90.0, 0.0), 0.0);
    assert!(close(b.c1, Point::new(30.0, 0.0)));
    assert!(close(b.c2, Point::new(60.0, 0.0)));
    assert!(close(b.point_at(0.5), Point::new(45.0, 0.0)));
}

#[test]
fn curvature_offsets_perpendicular() {
    let b = bezier(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0);
    let offset = 100.0 * CURVE_OFFSET_FACTOR;
    assert!(close(b.c1, Point::new(100.0 / 3.0, offset)));
    assert!(close(b.c2, Point::new(200.0 / 3.0, offset)));
    let mirrored = bezier(Point::new(0.0, 0.0), Point::new(100.0, 0.0), -1.0);
    assert!(close(mirrored.c1, Point::new(100.0 / 3.0, -offset)));
}

#[test]
fn degenerate_chord_has_no_offset() {
    let p = Point::new(5.0, 5.0);
    let b = bezier(p, p, 3.0);
    assert!(close(b.c1, p) && close(b.c2, p));
}

#[test]
fn sample_includes_endpoints() {
    let b = bezier(Point::new(0.0, 0.0), Point::new(10.0, 10.0), 0.5);
    let pts = b.sample(8);
    assert_eq!(pts.len(), 9);
    assert!(close(pts[0], b.p0));
    assert!(close(pts[8], b.p3));
}

#[test]
fn end_tangent_falls_back_to_start() {
    let p = Point::new(1.0, 1.0);
    let b = CubicBezier { p0: Point::new(0.0, 0.0), c1: p, c2: p, p3: p };
    assert_eq!(b.end_tangent_origin(), Point::new(0.0, 0.0));
}

// =============================================================
// Distance
// =============================================================

#[test]
fn distance_to_straight_path() {
    let b = bezier(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 0.0);
    assert!((distance_to_connection(Point::new(50.0, 7.0), &b) - 7.0).abs() < 1e-6);
    assert!((distance_to_connection(Point::new(-3.0, 4.0), &b) - 5.0).abs() < 1e-6);
}

#[test]
fn distance_to_empty_path_is_infinite() {
    assert!(distance_to_path(Point::new(0.0, 0.0), &[]).is_infinite());
}

#[test]
fn connection_path_follows_cards() {
    let mut scene = Scene::new();
    let a = Card::new(Rect::new(0.0, 0.0, 100.0, 100.0), CardPayload::Shape(ShapePayload::new(ShapeType::Rectangle)));
    let b = Card::new(Rect::new(300.0, 0.0, 100.0, 100.0), CardPayload::Shape(ShapePayload::new(ShapeType::Rectangle)));
    let conn = Connection::new(a.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto);
    scene.insert_card(a);
    scene.insert_card(b.clone());
    let path = connection_path(&scene, &conn).unwrap();
    assert_eq!(path.p0, Point::new(100.0, 50.0));
    assert_eq!(path.p3, Point::new(300.0, 50.0));

    scene.remove_card(&b.id);
    assert!(connection_path(&scene, &conn).is_none());
}
