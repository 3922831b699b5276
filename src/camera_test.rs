#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// --- Point ---

#[test]
fn point_distance() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn point_lerp_midpoint() {
    let mid = Point::new(0.0, 10.0).lerp(Point::new(10.0, 20.0), 0.5);
    assert!(point_approx_eq(mid, Point::new(5.0, 15.0)));
}

// --- Rect ---

#[test]
fn rect_from_corners_normalizes() {
    let r = Rect::from_corners(Point::new(10.0, 20.0), Point::new(-10.0, 5.0));
    assert_eq!(r, Rect::new(-10.0, 5.0, 20.0, 15.0));
}

#[test]
fn rect_new_rejects_negative_size() {
    let r = Rect::new(0.0, 0.0, -5.0, -1.0);
    assert_eq!(r.width, 0.0);
    assert_eq!(r.height, 0.0);
}

#[test]
fn rect_intersects_overlap_touch_and_disjoint() {
    let a = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(a.intersects(&Rect::new(50.0, 50.0, 100.0, 100.0)));
    assert!(a.intersects(&Rect::new(100.0, 0.0, 10.0, 10.0)));
    assert!(!a.intersects(&Rect::new(101.0, 0.0, 10.0, 10.0)));
    assert!(a.intersects(&Rect::new(10.0, 10.0, 5.0, 5.0)));
}

#[test]
fn rect_union_all() {
    let rects = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(-5.0, 20.0, 10.0, 10.0)];
    assert_eq!(Rect::union_all(rects), Some(Rect::new(-5.0, 0.0, 15.0, 30.0)));
    assert_eq!(Rect::union_all(Vec::new()), None);
}

#[test]
fn rect_expand_and_translate() {
    let r = Rect::new(10.0, 10.0, 20.0, 20.0).expand(5.0).translate(1.0, -1.0);
    assert_eq!(r, Rect::new(6.0, 4.0, 30.0, 30.0));
}

// --- Camera defaults ---

#[test]
fn camera_default_is_identity() {
    let cam = Camera::default();
    assert_eq!(cam.pan_x, 0.0);
    assert_eq!(cam.pan_y, 0.0);
    assert_eq!(cam.zoom, 1.0);
}

#[test]
fn camera_new_clamps_zoom() {
    assert_eq!(Camera::new(0.0, 0.0, 1000.0).zoom, MAX_ZOOM);
    assert_eq!(Camera::new(0.0, 0.0, 0.0).zoom, MIN_ZOOM);
}

#[test]
fn camera_new_rejects_non_finite() {
    assert_eq!(Camera::new(f64::NAN, 0.0, 2.0), Camera::default());
}

// --- screen_to_world / world_to_screen ---

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let cam = Camera { pan_x: 50.0, pan_y: 30.0, zoom: 2.0 };
    let world = cam.screen_to_world(Point::new(0.0, 0.0));
    assert!(point_approx_eq(world, Point::new(-25.0, -15.0)));
}

#[test]
fn world_to_screen_with_pan_and_zoom() {
    let cam = Camera { pan_x: 20.0, pan_y: 10.0, zoom: 3.0 };
    let screen = cam.world_to_screen(Point::new(5.0, 5.0));
    assert!(point_approx_eq(screen, Point::new(35.0, 25.0)));
}

#[test]
fn round_trip_fractional_zoom() {
    let cam = Camera { pan_x: 13.7, pan_y: -42.3, zoom: 0.75 };
    let world = Point::new(333.3, -999.9);
    assert!(point_approx_eq(cam.screen_to_world(cam.world_to_screen(world)), world));
}

#[test]
fn round_trip_survives_pan_zoom_sequence() {
    let mut cam = Camera::default();
    let probes = [Point::new(0.0, 0.0), Point::new(123.4, -56.7), Point::new(-9999.0, 4242.0)];
    let steps: [(f64, f64, f64, Point); 6] = [
        (10.0, -4.0, 1.7, Point::new(300.0, 200.0)),
        (-250.0, 33.0, 0.2, Point::new(0.0, 0.0)),
        (0.5, 0.5, 40.0, Point::new(-20.0, 900.0)),
        (1e4, -1e4, 1e-6, Point::new(1.0, 1.0)),
        (3.0, 3.0, 1.1, Point::new(640.0, 360.0)),
        (-7.5, 12.25, 0.9, Point::new(12.0, 34.0)),
    ];
    for (dx, dy, factor, pivot) in steps {
        cam.pan(dx, dy);
        cam.zoom_by(factor, pivot);
        for p in probes {
            let back = cam.screen_to_world(cam.world_to_screen(p));
            assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6, "{p:?} -> {back:?}");
        }
        assert!((MIN_ZOOM..=MAX_ZOOM).contains(&cam.zoom));
    }
}

#[test]
fn world_rect_to_screen_scales_size() {
    let cam = Camera { pan_x: 10.0, pan_y: 0.0, zoom: 2.0 };
    let r = cam.world_rect_to_screen(&Rect::new(5.0, 5.0, 10.0, 20.0));
    assert_eq!(r, Rect::new(20.0, 10.0, 20.0, 40.0));
}

#[test]
fn screen_dist_to_world_ignores_pan() {
    let cam = Camera { pan_x: 999.0, pan_y: -999.0, zoom: 4.0 };
    assert!(approx_eq(cam.screen_dist_to_world(8.0), 2.0));
}

// --- pan / zoom ---

#[test]
fn pan_translates_offset() {
    let mut cam = Camera::default();
    cam.pan(15.0, -5.0);
    assert_eq!((cam.pan_x, cam.pan_y), (15.0, -5.0));
}

#[test]
fn pan_ignores_non_finite() {
    let mut cam = Camera::default();
    cam.pan(f64::INFINITY, 1.0);
    assert_eq!(cam, Camera::default());
}

#[test]
fn zoom_to_keeps_pivot_fixed() {
    let mut cam = Camera { pan_x: 40.0, pan_y: -10.0, zoom: 1.3 };
    let pivot = Point::new(250.0, 125.0);
    let before = cam.screen_to_world(pivot);
    cam.zoom_to(3.0, pivot);
    let after = cam.screen_to_world(pivot);
    assert!(point_approx_eq(before, after));
    assert!(approx_eq(cam.zoom, 3.0));
}

#[test]
fn zoom_to_clamps_and_still_keeps_pivot() {
    let mut cam = Camera::default();
    let pivot = Point::new(100.0, 100.0);
    let before = cam.screen_to_world(pivot);
    cam.zoom_to(1e9, pivot);
    assert_eq!(cam.zoom, MAX_ZOOM);
    assert!(point_approx_eq(before, cam.screen_to_world(pivot)));
    cam.zoom_to(-3.0, pivot);
    assert_eq!(cam.zoom, MIN_ZOOM);
}

#[test]
fn repeated_zoom_never_leaves_range() {
    let mut cam = Camera::default();
    for _ in 0..500 {
        cam.zoom_by(1.5, Point::new(3.0, 7.0));
    }
    assert_eq!(cam.zoom, MAX_ZOOM);
    for _ in 0..500 {
        cam.zoom_by(0.5, Point::new(3.0, 7.0));
    }
    assert_eq!(cam.zoom, MIN_ZOOM);
}

#[test]
fn zoom_by_ignores_non_positive_factor() {
    let mut cam = Camera::default();
    cam.zoom_by(0.0, Point::default());
    cam.zoom_by(-2.0, Point::default());
    assert_eq!(cam.zoom, 1.0);
}

// --- fit / visible rect ---

#[test]
fn fit_rect_makes_bounds_visible() {
    let mut cam = Camera::default();
    let bounds = Rect::new(-500.0, 200.0, 1000.0, 400.0);
    cam.fit_rect(&bounds, 800.0, 600.0, 40.0);
    let visible = cam.visible_world_rect(800.0, 600.0);
    assert!(visible.x <= bounds.x + EPSILON);
    assert!(visible.right() >= bounds.right() - EPSILON);
    assert!(visible.y <= bounds.y + EPSILON);
    assert!(visible.bottom() >= bounds.bottom() - EPSILON);
    let center = cam.world_to_screen(bounds.center());
    assert!(point_approx_eq(center, Point::new(400.0, 300.0)));
}

#[test]
fn fit_rect_on_point_uses_unit_zoom() {
    let mut cam = Camera { pan_x: 5.0, pan_y: 5.0, zoom: 3.0 };
    cam.fit_rect(&Rect::new(10.0, 10.0, 0.0, 0.0), 200.0, 100.0, 10.0);
    assert_eq!(cam.zoom, 1.0);
    assert!(point_approx_eq(cam.world_to_screen(Point::new(10.0, 10.0)), Point::new(100.0, 50.0)));
}

#[test]
fn visible_world_rect_accounts_for_zoom() {
    let cam = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 2.0 };
    assert_eq!(cam.visible_world_rect(800.0, 600.0), Rect::new(0.0, 0.0, 400.0, 300.0));
}
