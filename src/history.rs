//! Undo/redo: a bounded stack of reversible scene edits.
//!
//! Every user-visible mutation is recorded as one [`HistoryEntry`] holding
//! enough before/after data to replay it in either direction. Gestures
//! (drag, resize) are committed once on pointer-up, so a whole drag undoes
//! in a single step.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use tracing::debug;

use crate::camera::{Point, Rect};
use crate::doc::{Card, CardId, CardPayload, Connection, Group, RemovedCard, Scene};
use crate::group::GroupChange;

/// One payload edit, with geometry in case the edit also changed the card's size.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadChange {
    pub card: CardId,
    pub before: CardPayload,
    pub after: CardPayload,
    pub rect_before: Rect,
    pub rect_after: Rect,
}

/// A reversible unit of scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// Cards translated: `(card, origin before, origin after)`.
    Move { moves: Vec<(CardId, Point, Point)> },
    /// Cards resized: `(card, rect before, rect after)`.
    Resize { changes: Vec<(CardId, Rect, Rect)> },
    /// Cards (and any groups or connections among them) added.
    Create { cards: Vec<Card>, groups: Vec<Group>, connections: Vec<Connection> },
    /// Cards removed with their cascades, plus connections deleted on their own.
    Delete { removed: Vec<RemovedCard>, connections: Vec<Connection> },
    /// Text or shape style edits.
    Payload { changes: Vec<PayloadChange> },
    /// Lock flag changes: `(card, before, after)`.
    Lock { changes: Vec<(CardId, bool, bool)> },
    /// Z-order changes: `(card, before, after)`.
    Reorder { changes: Vec<(CardId, i64, i64)> },
    Group(GroupChange),
    Ungroup(GroupChange),
    Connect(Connection),
    Disconnect(Vec<Connection>),
    /// Curvature, arrow, or style edit of one connection.
    ConnectionEdit { before: Connection, after: Connection },
}

impl HistoryEntry {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Resize { .. } => "resize",
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Payload { .. } => "payload",
            Self::Lock { .. } => "lock",
            Self::Reorder { .. } => "reorder",
            Self::Group(_) => "group",
            Self::Ungroup(_) => "ungroup",
            Self::Connect(_) => "connect",
            Self::Disconnect(_) => "disconnect",
            Self::ConnectionEdit { .. } => "connection-edit",
        }
    }

    /// True when replaying the entry would change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Move { moves } => moves.iter().all(|(_, a, b)| a == b),
            Self::Resize { changes } => changes.iter().all(|(_, a, b)| a == b),
            Self::Create { cards, groups, connections } => cards.is_empty() && groups.is_empty() && connections.is_empty(),
            Self::Delete { removed, connections } => removed.is_empty() && connections.is_empty(),
            Self::Payload { changes } => changes.iter().all(|c| c.before == c.after && c.rect_before == c.rect_after),
            Self::Lock { changes } => changes.iter().all(|(_, a, b)| a == b),
            Self::Reorder { changes } => changes.iter().all(|(_, a, b)| a == b),
            Self::Group(change) | Self::Ungroup(change) => change.before == change.after,
            Self::Connect(_) => false,
            Self::Disconnect(conns) => conns.is_empty(),
            Self::ConnectionEdit { before, after } => before == after,
        }
    }

    /// Cards whose geometry, payload, or existence this entry touches.
    #[must_use]
    pub fn cards(&self) -> Vec<CardId> {
        match self {
            Self::Move { moves } => moves.iter().map(|(id, _, _)| *id).collect(),
            Self::Resize { changes } => changes.iter().map(|(id, _, _)| *id).collect(),
            Self::Create { cards, .. } => cards.iter().map(|c| c.id).collect(),
            Self::Delete { removed, .. } => removed.iter().map(|r| r.card.id).collect(),
            Self::Payload { changes } => changes.iter().map(|c| c.card).collect(),
            Self::Lock { changes } => changes.iter().map(|(id, _, _)| *id).collect(),
            Self::Reorder { changes } => changes.iter().map(|(id, _, _)| *id).collect(),
            Self::Group(_) | Self::Ungroup(_) | Self::Connect(_) | Self::Disconnect(_) | Self::ConnectionEdit { .. } => {
                Vec::new()
            }
        }
    }

    /// Replay the entry forwards.
    pub fn apply(&self, scene: &mut Scene) {
        match self {
            Self::Move { moves } => {
                for (id, _, after) in moves {
                    move_to(scene, id, *after);
                }
            }
            Self::Resize { changes } => {
                for (id, _, after) in changes {
                    scene.set_card_rect(id, *after);
                }
            }
            Self::Create { cards, groups, connections } => {
                for card in cards {
                    scene.insert_card(card.clone());
                }
                scene.swap_groups(&[], groups);
                for conn in connections {
                    insert_connection_quiet(scene, conn);
                }
            }
            Self::Delete { removed, connections } => {
                for conn in connections {
                    scene.remove_connection(&conn.id);
                }
                for r in removed {
                    scene.remove_card(&r.card.id);
                }
            }
            Self::Payload { changes } => {
                for c in changes {
                    set_payload(scene, &c.card, &c.after, c.rect_after);
                }
            }
            Self::Lock { changes } => {
                for (id, _, after) in changes {
                    scene.set_card_locked(id, *after);
                }
            }
            Self::Reorder { changes } => {
                for (id, _, after) in changes {
                    scene.set_card_z(id, *after);
                }
            }
            Self::Group(change) | Self::Ungroup(change) => change.apply(scene),
            Self::Connect(conn) => insert_connection_quiet(scene, conn),
            Self::Disconnect(conns) => {
                for conn in conns {
                    scene.remove_connection(&conn.id);
                }
            }
            Self::ConnectionEdit { after, .. } => replace_connection(scene, after),
        }
    }

    /// Reverse the entry.
    pub fn revert(&self, scene: &mut Scene) {
        match self {
            Self::Move { moves } => {
                for (id, before, _) in moves {
                    move_to(scene, id, *before);
                }
            }
            Self::Resize { changes } => {
                for (id, before, _) in changes {
                    scene.set_card_rect(id, *before);
                }
            }
            Self::Create { cards, groups, connections } => {
                for conn in connections {
                    scene.remove_connection(&conn.id);
                }
                for group in groups {
                    scene.remove_group(&group.id);
                }
                for card in cards {
                    scene.remove_card(&card.id);
                }
            }
            Self::Delete { removed, connections } => {
                for r in removed.iter().rev() {
                    scene.restore_card(r.clone());
                }
                for conn in connections {
                    insert_connection_quiet(scene, conn);
                }
            }
            Self::Payload { changes } => {
                for c in changes {
                    set_payload(scene, &c.card, &c.before, c.rect_before);
                }
            }
            Self::Lock { changes } => {
                for (id, before, _) in changes {
                    scene.set_card_locked(id, *before);
                }
            }
            Self::Reorder { changes } => {
                for (id, before, _) in changes {
                    scene.set_card_z(id, *before);
                }
            }
            Self::Group(change) | Self::Ungroup(change) => change.revert(scene),
            Self::Connect(conn) => {
                scene.remove_connection(&conn.id);
            }
            Self::Disconnect(conns) => {
                for conn in conns {
                    insert_connection_quiet(scene, conn);
                }
            }
            Self::ConnectionEdit { before, .. } => replace_connection(scene, before),
        }
    }
}

fn move_to(scene: &mut Scene, id: &CardId, origin: Point) {
    if let Some(rect) = scene.card(id).map(Card::rect) {
        scene.set_card_rect(id, Rect { x: origin.x, y: origin.y, ..rect });
    }
}

/// Swap in a payload while keeping the transient texture state of image cards.
fn set_payload(scene: &mut Scene, id: &CardId, payload: &CardPayload, rect: Rect) {
    let Some(current) = scene.payload_mut(id) else {
        return;
    };
    let mut next = payload.clone();
    if let (CardPayload::Image(cur), CardPayload::Image(img)) = (&*current, &mut next) {
        img.texture = cur.texture;
    }
    next.normalize();
    *current = next;
    scene.set_card_rect(id, rect);
}

fn replace_connection(scene: &mut Scene, conn: &Connection) {
    if let Some(slot) = scene.connection_mut(&conn.id) {
        slot.clone_from(conn);
    }
}

/// Re-insert a recorded connection. History replays states that existed, so a
/// rejection only happens if an endpoint was removed outside the history.
fn insert_connection_quiet(scene: &mut Scene, conn: &Connection) {
    if let Err(err) = scene.insert_connection(conn.clone()) {
        debug!(connection_id = %conn.id, error = %err, "history skipped connection");
    }
}

/// Bounded undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl History {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { undo_stack: Vec::with_capacity(max_depth.min(256)), redo_stack: Vec::new(), max_depth }
    }

    /// Record an already-applied entry. No-op entries are dropped.
    /// Returns `true` when the entry was recorded.
    pub fn commit(&mut self, entry: HistoryEntry) -> bool {
        if entry.is_noop() || self.max_depth == 0 {
            return false;
        }
        debug!(kind = entry.label(), depth = self.undo_stack.len() + 1, "history commit");
        self.undo_stack.push(entry);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        true
    }

    /// Revert the newest entry. Returns it (now on the redo stack).
    pub fn undo(&mut self, scene: &mut Scene) -> Option<&HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        entry.revert(scene);
        debug!(kind = entry.label(), "history undo");
        self.redo_stack.push(entry);
        self.redo_stack.last()
    }

    /// Re-apply the newest undone entry. Returns it (now on the undo stack).
    pub fn redo(&mut self, scene: &mut Scene) -> Option<&HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        entry.apply(scene);
        debug!(kind = entry.label(), "history redo");
        self.undo_stack.push(entry);
        self.undo_stack.last()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop both stacks, e.g. after a board is restored.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
