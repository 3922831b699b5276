#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{AnchorPosition, ShapePayload, ShapeType, TextPayload};

fn shape(x: f64, y: f64) -> Card {
    Card::new(Rect::new(x, y, 50.0, 50.0), CardPayload::Shape(ShapePayload::new(ShapeType::Rectangle)))
}

fn create(scene: &mut Scene, history: &mut History, card: Card) -> CardId {
    let id = card.id;
    let entry = HistoryEntry::Create { cards: vec![card], groups: Vec::new(), connections: Vec::new() };
    entry.apply(scene);
    history.commit(entry);
    id
}

fn move_card(scene: &mut Scene, history: &mut History, id: CardId, to: Point) {
    let from = scene.card(&id).unwrap().origin();
    let entry = HistoryEntry::Move { moves: vec![(id, from, to)] };
    entry.apply(scene);
    history.commit(entry);
}

// =============================================================
// Stack mechanics
// =============================================================

#[test]
fn new_history_is_empty() {
    let history = History::new(10);
    assert!(!history.can_undo());
    assert!(!history.can_redo());
    assert_eq!(history.max_depth(), 10);
}

#[test]
fn undo_then_redo() {
    let mut scene = Scene::new();
    let mut history = History::new(10);
    let id = create(&mut scene, &mut history, shape(0.0, 0.0));
    move_card(&mut scene, &mut history, id, Point::new(30.0, 40.0));

    let undone = history.undo(&mut scene).unwrap();
    assert_eq!(undone.label(), "move");
    assert_eq!(scene.card(&id).unwrap().origin(), Point::new(0.0, 0.0));
    assert!(history.can_redo());

    history.redo(&mut scene);
    assert_eq!(scene.card(&id).unwrap().origin(), Point::new(30.0, 40.0));
}

#[test]
fn commit_clears_redo() {
    let mut scene = Scene::new();
    let mut history = History::new(10);
    let id = create(&mut scene, &mut history, shape(0.0, 0.0));
    move_card(&mut scene, &mut history, id, Point::new(10.0, 0.0));
    history.undo(&mut scene);
    assert_eq!(history.redo_len(), 1);
    move_card(&mut scene, &mut history, id, Point::new(20.0, 0.0));
    assert_eq!(history.redo_len(), 0);
}

#[test]
fn overflow_evicts_oldest() {
    let mut scene = Scene::new();
    let depth = 5;
    let mut history = History::new(depth);
    let id = create(&mut scene, &mut history, shape(0.0, 0.0));
    for i in 1..=(depth + 5) {
        #[allow(clippy::cast_precision_loss)]
        move_card(&mut scene, &mut history, id, Point::new(i as f64, 0.0));
    }
    assert_eq!(history.undo_len(), depth);
    let mut undone = 0;
    while history.undo(&mut scene).is_some() {
        undone += 1;
    }
    assert_eq!(undone, depth);
    // The create and the first five moves fell off the bottom.
    assert_eq!(scene.card(&id).unwrap().x, 5.0);
}

#[test]
fn noop_entries_are_not_recorded() {
    let mut history = History::new(10);
    let id = uuid::Uuid::new_v4();
    let p = Point::new(1.0, 1.0);
    assert!(!history.commit(HistoryEntry::Move { moves: vec![(id, p, p)] }));
    assert!(!history.commit(HistoryEntry::Disconnect(Vec::new())));
    assert!(!history.can_undo());
}

#[test]
fn clear_drops_both_stacks() {
    let mut scene = Scene::new();
    let mut history = History::new(10);
    create(&mut scene, &mut history, shape(0.0, 0.0));
    create(&mut scene, &mut history, shape(0.0, 0.0));
    history.undo(&mut scene);
    history.clear();
    assert_eq!(history.undo_len(), 0);
    assert_eq!(history.redo_len(), 0);
}

// =============================================================
// Entry kinds
// =============================================================

#[test]
fn delete_undo_restores_group_and_connections() {
    let mut scene = Scene::new();
    let a = shape(0.0, 0.0);
    let b = shape(100.0, 0.0);
    let (aid, bid) = (a.id, b.id);
    scene.insert_card(a);
    scene.insert_card(b);
    let gid = scene.insert_group(Group::new("g", vec![aid, bid])).unwrap();
    let cid = scene.insert_connection(Connection::new(aid, AnchorPosition::Auto, bid, AnchorPosition::Auto)).unwrap();

    let mut history = History::new(10);
    let removed: Vec<RemovedCard> = [aid, bid].iter().filter_map(|id| scene.remove_card(id)).collect();
    history.commit(HistoryEntry::Delete { removed, connections: Vec::new() });
    assert!(scene.is_empty());
    assert!(scene.group(&gid).is_none());

    history.undo(&mut scene);
    assert_eq!(scene.card_count(), 2);
    assert_eq!(scene.group(&gid).unwrap().members, vec![aid, bid]);
    assert!(scene.connection(&cid).is_some());

    history.redo(&mut scene);
    assert!(scene.is_empty());
    assert_eq!(scene.connection_count(), 0);
}

#[test]
fn payload_undo_restores_content_and_height() {
    let mut scene = Scene::new();
    let card = Card::new(Rect::new(0.0, 0.0, 200.0, 40.0), CardPayload::Text(TextPayload::default()));
    let id = card.id;
    scene.insert_card(card);
    let before = scene.card(&id).unwrap().payload.clone();
    let after = CardPayload::Text(TextPayload { content: "hello".into(), ..TextPayload::default() });
    let entry = HistoryEntry::Payload {
        changes: vec![PayloadChange {
            card: id,
            before,
            after,
            rect_before: Rect::new(0.0, 0.0, 200.0, 40.0),
            rect_after: Rect::new(0.0, 0.0, 200.0, 80.0),
        }],
    };
    entry.apply(&mut scene);
    assert_eq!(scene.card(&id).unwrap().height, 80.0);
    entry.revert(&mut scene);
    let card = scene.card(&id).unwrap();
    assert_eq!(card.height, 40.0);
    assert!(matches!(&card.payload, CardPayload::Text(t) if t.content.is_empty()));
}

#[test]
fn connect_and_edit_round_trip() {
    let mut scene = Scene::new();
    let a = shape(0.0, 0.0);
    let b = shape(100.0, 0.0);
    let conn = Connection::new(a.id, AnchorPosition::Auto, b.id, AnchorPosition::Auto);
    scene.insert_card(a);
    scene.insert_card(b);

    let connect = HistoryEntry::Connect(conn.clone());
    connect.apply(&mut scene);
    assert!(scene.connection(&conn.id).is_some());

    let mut curved = conn.clone();
    curved.curvature = 0.8;
    let edit = HistoryEntry::ConnectionEdit { before: conn.clone(), after: curved };
    edit.apply(&mut scene);
    assert_eq!(scene.connection(&conn.id).unwrap().curvature, 0.8);
    edit.revert(&mut scene);
    assert_eq!(scene.connection(&conn.id).unwrap().curvature, 0.0);

    connect.revert(&mut scene);
    assert!(scene.connection(&conn.id).is_none());
}

#[test]
fn lock_and_reorder_revert() {
    let mut scene = Scene::new();
    let card = shape(0.0, 0.0);
    let id = card.id;
    scene.insert_card(card);
    let lock = HistoryEntry::Lock { changes: vec![(id, false, true)] };
    let reorder = HistoryEntry::Reorder { changes: vec![(id, 0, 7)] };
    lock.apply(&mut scene);
    reorder.apply(&mut scene);
    assert!(scene.card(&id).unwrap().locked);
    assert_eq!(scene.card(&id).unwrap().z_index, 7);
    reorder.revert(&mut scene);
    lock.revert(&mut scene);
    assert!(!scene.card(&id).unwrap().locked);
    assert_eq!(scene.card(&id).unwrap().z_index, 0);
}

#[test]
fn resize_entry_reports_cards() {
    let id = uuid::Uuid::new_v4();
    let entry = HistoryEntry::Resize { changes: vec![(id, Rect::new(0.0, 0.0, 20.0, 20.0), Rect::new(0.0, 0.0, 40.0, 20.0))] };
    assert_eq!(entry.cards(), vec![id]);
    assert!(!entry.is_noop());
}
