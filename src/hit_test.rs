#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{AnchorPosition, Card, CardPayload, Connection, Group, ShapePayload, ShapeType};

fn add(scene: &mut Scene, x: f64, y: f64, w: f64, h: f64) -> CardId {
    let card = Card::new(Rect::new(x, y, w, h), CardPayload::Shape(ShapePayload::new(ShapeType::Rectangle)));
    let id = card.id;
    scene.insert_card(card);
    id
}

// =============================================================
// ResizeAnchor
// =============================================================

#[test]
fn resize_anchor_all_variants_distinct() {
    for (i, a) in ResizeAnchor::ALL.iter().enumerate() {
        for (j, b) in ResizeAnchor::ALL.iter().enumerate() {
            assert_eq!(i == j, a == b);
        }
    }
}

#[test]
fn handle_positions() {
    let r = Rect::new(0.0, 0.0, 100.0, 50.0);
    assert_eq!(ResizeAnchor::Nw.position(&r), Point::new(0.0, 0.0));
    assert_eq!(ResizeAnchor::E.position(&r), Point::new(100.0, 25.0));
    assert_eq!(ResizeAnchor::S.position(&r), Point::new(50.0, 50.0));
}

#[test]
fn cursors_pair_opposites() {
    assert_eq!(ResizeAnchor::Ne.cursor(), ResizeAnchor::Sw.cursor());
    assert_eq!(ResizeAnchor::N.cursor(), "ns-resize");
}

// =============================================================
// resize_rect
// =============================================================

#[test]
fn se_grows_right_and_down() {
    let r = resize_rect(&Rect::new(10.0, 10.0, 100.0, 100.0), ResizeAnchor::Se, 20.0, 30.0, false);
    assert_eq!(r, Rect::new(10.0, 10.0, 120.0, 130.0));
}

#[test]
fn nw_keeps_bottom_right_fixed() {
    let r = resize_rect(&Rect::new(10.0, 10.0, 100.0, 100.0), ResizeAnchor::Nw, 20.0, 30.0, false);
    assert_eq!(r, Rect::new(30.0, 40.0, 80.0, 70.0));
}

#[test]
fn resize_clamps_to_minimum_and_keeps_opposite_edge() {
    let r = resize_rect(&Rect::new(0.0, 0.0, 100.0, 100.0), ResizeAnchor::W, 500.0, 0.0, false);
    assert_eq!(r.width, MIN_CARD_SIZE);
    assert_eq!(r.right(), 100.0);
}

#[test]
fn keep_aspect_on_corner_uses_dominant_axis() {
    let r = resize_rect(&Rect::new(0.0, 0.0, 200.0, 100.0), ResizeAnchor::Se, 200.0, 10.0, true);
    assert_eq!(r, Rect::new(0.0, 0.0, 400.0, 200.0));
}

#[test]
fn keep_aspect_on_edge_follows_that_axis() {
    let r = resize_rect(&Rect::new(0.0, 0.0, 200.0, 100.0), ResizeAnchor::S, 0.0, 50.0, true);
    assert_eq!(r, Rect::new(0.0, 0.0, 300.0, 150.0));
}

#[test]
fn keep_aspect_respects_minimum_on_both_sides() {
    let r = resize_rect(&Rect::new(0.0, 0.0, 200.0, 100.0), ResizeAnchor::Se, -1000.0, -1000.0, true);
    assert_eq!(r.height, MIN_CARD_SIZE);
    assert_eq!(r.width, MIN_CARD_SIZE * 2.0);
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn empty_scene_hits_nothing() {
    let scene = Scene::new();
    assert_eq!(hit_test(Point::new(0.0, 0.0), &scene, &Camera::default(), None, None), None);
}

#[test]
fn topmost_card_wins() {
    let mut scene = Scene::new();
    let below = add(&mut scene, 0.0, 0.0, 100.0, 100.0);
    let above = add(&mut scene, 50.0, 50.0, 100.0, 100.0);
    scene.set_card_z(&above, 1);
    let cam = Camera::default();
    assert_eq!(hit_test(Point::new(75.0, 75.0), &scene, &cam, None, None), Some(Hit::Card(above)));
    assert_eq!(hit_test(Point::new(10.0, 10.0), &scene, &cam, None, None), Some(Hit::Card(below)));
}

#[test]
fn handle_of_selected_card_beats_body() {
    let mut scene = Scene::new();
    let a = add(&mut scene, 0.0, 0.0, 100.0, 100.0);
    let cam = Camera::default();
    let hit = hit_test(Point::new(99.0, 99.0), &scene, &cam, Some(a), None);
    assert_eq!(hit, Some(Hit::ResizeHandle { card: a, anchor: ResizeAnchor::Se }));
    assert_eq!(hit_test(Point::new(99.0, 99.0), &scene, &cam, None, None), Some(Hit::Card(a)));
}

#[test]
fn locked_card_has_no_handles() {
    let mut scene = Scene::new();
    let a = add(&mut scene, 0.0, 0.0, 100.0, 100.0);
    scene.set_card_locked(&a, true);
    let hit = hit_test(Point::new(99.0, 99.0), &scene, &Camera::default(), Some(a), None);
    assert_eq!(hit, Some(Hit::Card(a)));
}

#[test]
fn handle_radius_is_screen_space() {
    let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
    let near = Point::new(106.0, 100.0);
    assert_eq!(handle_at(near, &rect, &Camera::default()), Some(ResizeAnchor::Se));
    let zoomed = Camera { pan_x: 0.0, pan_y: 0.0, zoom: 4.0 };
    assert_eq!(handle_at(near, &rect, &zoomed), None);
}

#[test]
fn connection_between_cards_is_hit() {
    let mut scene = Scene::new();
    let a = add(&mut scene, 0.0, 0.0, 100.0, 100.0);
    let b = add(&mut scene, 300.0, 0.0, 100.0, 100.0);
    let conn = scene.insert_connection(Connection::new(a, AnchorPosition::Auto, b, AnchorPosition::Auto)).unwrap();
    let cam = Camera::default();
    assert_eq!(hit_test(Point::new(200.0, 53.0), &scene, &cam, None, None), Some(Hit::Connection(conn)));
    assert_eq!(hit_test(Point::new(200.0, 80.0), &scene, &cam, None, None), None);
}

#[test]
fn gap_inside_group_hits_frame_unless_editing() {
    let mut scene = Scene::new();
    let a = add(&mut scene, 0.0, 0.0, 50.0, 50.0);
    let b = add(&mut scene, 100.0, 100.0, 50.0, 50.0);
    let gid = scene.insert_group(Group::new("g", vec![a, b])).unwrap();
    let cam = Camera::default();
    assert_eq!(hit_test(Point::new(75.0, 75.0), &scene, &cam, None, None), Some(Hit::GroupFrame(gid)));
    assert_eq!(hit_test(Point::new(75.0, 75.0), &scene, &cam, None, Some(gid)), None);
}
