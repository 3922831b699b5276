#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn shape_at(x: f64, y: f64, w: f64, h: f64) -> Card {
    Card::new(Rect::new(x, y, w, h), CardPayload::Shape(ShapePayload::new(ShapeType::Rectangle)))
}

fn scene_with(cards: &[Card]) -> Scene {
    let mut scene = Scene::new();
    for card in cards {
        scene.insert_card(card.clone());
    }
    scene
}

// =============================================================
// Card kinds and payload serde
// =============================================================

#[test]
fn kind_serde_all_variants() {
    let cases = [(CardKind::Image, "\"image\""), (CardKind::Text, "\"text\""), (CardKind::Shape, "\"shape\"")];
    for (kind, expected) in cases {
        assert_eq!(serde_json::to_string(&kind).unwrap(), expected);
    }
}

#[test]
fn payload_kind_matches_variant() {
    assert_eq!(CardPayload::Text(TextPayload::default()).kind(), CardKind::Text);
    assert_eq!(CardPayload::Image(ImagePayload::new("a.png", 1.0, 1.0)).kind(), CardKind::Image);
    assert_eq!(CardPayload::Shape(ShapePayload::new(ShapeType::Line)).kind(), CardKind::Shape);
}

#[test]
fn card_serializes_flat_with_kind_tag() {
    let card = Card::new(Rect::new(1.0, 2.0, 30.0, 40.0), CardPayload::Image(ImagePayload::new("ref/cat.jpg", 640.0, 480.0)));
    let value = serde_json::to_value(&card).unwrap();
    assert_eq!(value["kind"], "image");
    assert_eq!(value["source"], "ref/cat.jpg");
    assert_eq!(value["natural_width"], 640.0);
    assert_eq!(value["width"], 30.0);
    assert!(value.get("texture").is_none());
}

#[test]
fn card_deserialize_tolerates_unknown_fields_and_defaults() {
    let value = json!({
        "id": Uuid::nil(),
        "kind": "text",
        "x": 5,
        "y": 6,
        "width": 100,
        "height": 50,
        "content": "hello",
        "future_field": {"nested": true},
    });
    let card: Card = serde_json::from_value(value).unwrap();
    assert_eq!(card.kind(), CardKind::Text);
    assert!(!card.locked);
    assert_eq!(card.z_index, 0);
    let CardPayload::Text(text) = &card.payload else {
        panic!("expected text payload");
    };
    assert_eq!(text.content, "hello");
    assert_eq!(text.font_size, DEFAULT_FONT_SIZE);
    assert!(text.auto_height);
}

#[test]
fn card_deserialize_unknown_kind_rejects() {
    let value = json!({"id": Uuid::nil(), "kind": "hexagon", "x": 0, "y": 0, "width": 1, "height": 1});
    assert!(serde_json::from_value::<Card>(value).is_err());
}

#[test]
fn image_texture_is_not_persisted() {
    let mut payload = ImagePayload::new("x.png", 10.0, 10.0);
    payload.texture = TextureState::Loaded;
    let card = Card::new(Rect::new(0.0, 0.0, 10.0, 10.0), CardPayload::Image(payload));
    let back: Card = serde_json::from_str(&serde_json::to_string(&card).unwrap()).unwrap();
    let CardPayload::Image(img) = back.payload else {
        panic!("expected image payload");
    };
    assert_eq!(img.texture, TextureState::Unloaded);
}

#[test]
fn image_aspect_ratio_requires_both_dimensions() {
    assert_eq!(ImagePayload::new("a", 200.0, 100.0).aspect_ratio(), Some(2.0));
    assert_eq!(ImagePayload::new("a", 0.0, 100.0).aspect_ratio(), None);
}

// =============================================================
// Normalization
// =============================================================

#[test]
fn new_card_clamps_to_minimum_size() {
    let card = shape_at(0.0, 0.0, 1.0, -10.0);
    assert_eq!(card.width, MIN_CARD_SIZE);
    assert_eq!(card.height, MIN_CARD_SIZE);
}

#[test]
fn normalize_repairs_non_finite_values() {
    let mut card = shape_at(0.0, 0.0, 50.0, 50.0);
    card.x = f64::NAN;
    card.width = f64::INFINITY;
    card.rotation = 45.0;
    card.normalize();
    assert_eq!(card.x, 0.0);
    assert_eq!(card.width, MIN_CARD_SIZE);
    assert_eq!(card.rotation, 0.0);
}

#[test]
fn payload_normalize_clamps_font_and_stroke() {
    let mut text = CardPayload::Text(TextPayload { font_size: 9999.0, ..TextPayload::default() });
    text.normalize();
    assert!(matches!(text, CardPayload::Text(ref t) if t.font_size == MAX_FONT_SIZE));

    let mut shape = CardPayload::Shape(ShapePayload { stroke_width: -3.0, ..ShapePayload::new(ShapeType::Ellipse) });
    shape.normalize();
    assert!(matches!(shape, CardPayload::Shape(ref s) if s.stroke_width == MIN_STROKE_WIDTH));
}

#[test]
fn image_cards_keep_aspect_ratio() {
    let image = Card::new(Rect::new(0.0, 0.0, 40.0, 40.0), CardPayload::Image(ImagePayload::new("a", 1.0, 1.0)));
    assert!(image.keeps_aspect_ratio());
    assert!(!shape_at(0.0, 0.0, 40.0, 40.0).keeps_aspect_ratio());
}

// =============================================================
// Scene: cards
// =============================================================

#[test]
fn insert_and_get_card() {
    let card = shape_at(10.0, 20.0, 30.0, 40.0);
    let scene = scene_with(&[card.clone()]);
    assert_eq!(scene.card(&card.id), Some(&card));
    assert_eq!(scene.card_count(), 1);
    assert!(!scene.is_empty());
}

#[test]
fn set_card_rect_clamps_size() {
    let card = shape_at(0.0, 0.0, 100.0, 100.0);
    let mut scene = scene_with(&[card.clone()]);
    assert!(scene.set_card_rect(&card.id, Rect::new(5.0, 6.0, 1.0, 2.0)));
    let stored = scene.card(&card.id).unwrap();
    assert_eq!(stored.rect(), Rect::new(5.0, 6.0, MIN_CARD_SIZE, MIN_CARD_SIZE));
}

#[test]
fn set_card_rect_missing_returns_false() {
    let mut scene = Scene::new();
    assert!(!scene.set_card_rect(&Uuid::new_v4(), Rect::new(0.0, 0.0, 50.0, 50.0)));
}

#[test]
fn sorted_cards_orders_by_z() {
    let mut a = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut b = shape_at(0.0, 0.0, 50.0, 50.0);
    a.z_index = 5;
    b.z_index = -1;
    let scene = scene_with(&[a.clone(), b.clone()]);
    let ids: Vec<CardId> = scene.sorted_cards().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
    assert_eq!(scene.next_z(), 6);
    assert_eq!(scene.lowest_z(), -2);
}

#[test]
fn empty_scene_has_no_bounds() {
    let scene = Scene::new();
    assert_eq!(scene.bounds(), None);
    assert_eq!(scene.next_z(), 0);
}

#[test]
fn bounds_cover_every_card() {
    let scene = scene_with(&[shape_at(-10.0, 0.0, 20.0, 20.0), shape_at(100.0, 50.0, 50.0, 50.0)]);
    assert_eq!(scene.bounds(), Some(Rect::new(-10.0, 0.0, 160.0, 100.0)));
}

// =============================================================
// Scene: cascading removal
// =============================================================

#[test]
fn remove_card_cascades_to_group_and_connections() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(100.0, 0.0, 50.0, 50.0);
    let c = shape_at(200.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone(), c.clone()]);
    let gid = scene.insert_group(Group::new("g", vec![a.id, b.id])).unwrap();
    let ab = scene.insert_connection(Connection::new(a.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto)).unwrap();
    let bc = scene.insert_connection(Connection::new(b.id, AnchorPosition::Auto, c.id, AnchorPosition::Auto)).unwrap();

    let removed = scene.remove_card(&a.id).unwrap();
    assert_eq!(removed.card.id, a.id);
    assert_eq!(removed.connections.len(), 1);
    assert_eq!(removed.connections[0].id, ab);
    assert_eq!(removed.group.as_ref().map(|g| g.members.clone()), Some(vec![a.id, b.id]));

    assert!(scene.card(&a.id).is_none());
    assert!(scene.connection(&ab).is_none());
    assert!(scene.connection(&bc).is_some());
    assert_eq!(scene.group(&gid).unwrap().members, vec![b.id]);
    assert_eq!(scene.group_of(&a.id), None);
    for conn in scene.connections() {
        assert!(scene.contains_card(&conn.source_card_id) && scene.contains_card(&conn.target_card_id));
    }
}

#[test]
fn removing_last_member_drops_group() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone()]);
    let gid = scene.insert_group(Group::new("solo", vec![a.id])).unwrap();
    scene.remove_card(&a.id);
    assert!(scene.group(&gid).is_none());
}

#[test]
fn restore_card_reverses_removal_exactly() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(100.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone()]);
    let gid = scene.insert_group(Group::new("g", vec![a.id, b.id])).unwrap();
    let ab = scene.insert_connection(Connection::new(a.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto)).unwrap();

    let removed_b = scene.remove_card(&b.id).unwrap();
    let removed_a = scene.remove_card(&a.id).unwrap();
    assert!(scene.group(&gid).is_none());

    scene.restore_card(removed_a);
    scene.restore_card(removed_b);
    assert_eq!(scene.group(&gid).unwrap().members, vec![a.id, b.id]);
    assert_eq!(scene.group_of(&b.id), Some(gid));
    assert!(scene.connection(&ab).is_some());
}

#[test]
fn remove_missing_card_is_none() {
    let mut scene = Scene::new();
    assert!(scene.remove_card(&Uuid::new_v4()).is_none());
}

// =============================================================
// Scene: groups
// =============================================================

#[test]
fn insert_group_rejects_missing_member() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let ghost = Uuid::new_v4();
    let mut scene = scene_with(&[a.clone()]);
    let err = scene.insert_group(Group::new("g", vec![a.id, ghost])).unwrap_err();
    assert_eq!(err, SceneError::CardNotFound(ghost));
}

#[test]
fn insert_group_enforces_disjoint_membership() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone()]);
    let first = scene.insert_group(Group::new("one", vec![a.id, b.id])).unwrap();
    let err = scene.insert_group(Group::new("two", vec![a.id])).unwrap_err();
    assert_eq!(err, SceneError::AlreadyGrouped { card: a.id, group: first });
}

#[test]
fn insert_group_rejects_empty() {
    let mut scene = Scene::new();
    assert_eq!(scene.insert_group(Group::new("g", Vec::new())), Err(SceneError::GroupTooSmall(0)));
}

#[test]
fn group_bounds_are_lazy_and_invalidated_by_member_moves() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(100.0, 100.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone()]);
    let gid = scene.insert_group(Group::new("g", vec![a.id, b.id])).unwrap();
    assert!(!scene.group(&gid).unwrap().is_bounds_cached());

    assert_eq!(scene.group_bounds(&gid), Some(Rect::new(0.0, 0.0, 150.0, 150.0)));
    assert!(scene.group(&gid).unwrap().is_bounds_cached());

    scene.set_card_rect(&b.id, Rect::new(200.0, 100.0, 50.0, 50.0));
    assert!(!scene.group(&gid).unwrap().is_bounds_cached());
    assert_eq!(scene.group_bounds(&gid), Some(Rect::new(0.0, 0.0, 250.0, 150.0)));
}

#[test]
fn remove_group_keeps_cards() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone()]);
    let gid = scene.insert_group(Group::new("g", vec![a.id, b.id])).unwrap();
    let group = scene.remove_group(&gid).unwrap();
    assert_eq!(group.members.len(), 2);
    assert_eq!(scene.card_count(), 2);
    assert_eq!(scene.group_of(&a.id), None);
}

#[test]
fn group_equality_ignores_cache() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone()]);
    let gid = scene.insert_group(Group::new("g", vec![a.id])).unwrap();
    let before = scene.group(&gid).unwrap().clone();
    scene.group_bounds(&gid);
    assert_eq!(scene.group(&gid).unwrap(), &before);
}

// =============================================================
// Scene: connections
// =============================================================

#[test]
fn insert_connection_rejects_self_link() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone()]);
    let conn = Connection::new(a.id, AnchorPosition::Auto, a.id, AnchorPosition::Auto);
    assert_eq!(scene.insert_connection(conn), Err(SceneError::SelfConnection));
}

#[test]
fn insert_connection_rejects_missing_endpoint() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let ghost = Uuid::new_v4();
    let mut scene = scene_with(&[a.clone()]);
    let conn = Connection::new(a.id, AnchorPosition::Auto, ghost, AnchorPosition::Auto);
    assert_eq!(scene.insert_connection(conn), Err(SceneError::CardNotFound(ghost)));
}

#[test]
fn connections_touching_finds_both_directions() {
    let a = shape_at(0.0, 0.0, 50.0, 50.0);
    let b = shape_at(0.0, 0.0, 50.0, 50.0);
    let c = shape_at(0.0, 0.0, 50.0, 50.0);
    let mut scene = scene_with(&[a.clone(), b.clone(), c.clone()]);
    let ab = scene.insert_connection(Connection::new(a.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto)).unwrap();
    let cb = scene.insert_connection(Connection::new(c.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto)).unwrap();
    let mut expected = vec![ab, cb];
    expected.sort();
    assert_eq!(scene.connections_touching(&[b.id]), expected);
    assert_eq!(scene.connections_touching(&[a.id]), vec![ab]);
}

#[test]
fn anchor_position_serde_shapes() {
    assert_eq!(serde_json::to_value(AnchorPosition::Auto).unwrap(), json!("auto"));
    assert_eq!(
        serde_json::to_value(AnchorPosition::Edge { side: Side::Right, t: 0.5 }).unwrap(),
        json!({"edge": {"side": "right", "t": 0.5}})
    );
}

#[test]
fn connection_defaults_on_deserialize() {
    let conn: Connection = serde_json::from_value(json!({
        "id": Uuid::nil(),
        "source_card_id": Uuid::nil(),
        "target_card_id": Uuid::nil(),
    }))
    .unwrap();
    assert_eq!(conn.source_anchor, AnchorPosition::Auto);
    assert_eq!(conn.curvature, 0.0);
    assert!(conn.arrow);
    assert_eq!(conn.style, ConnectionStyle::default());
}
