//! Hit-testing: what is under the pointer, and resize handle geometry.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point, Rect};
use crate::connect;
use crate::consts::{CONNECTION_HIT_PX, HANDLE_RADIUS_PX, MIN_CARD_SIZE};
use crate::doc::{CardId, ConnectionId, GroupId, Scene};

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [ResizeAnchor; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// World position of this handle on `rect`.
    #[must_use]
    pub fn position(self, rect: &Rect) -> Point {
        let c = rect.center();
        match self {
            Self::N => Point::new(c.x, rect.y),
            Self::Ne => Point::new(rect.right(), rect.y),
            Self::E => Point::new(rect.right(), c.y),
            Self::Se => Point::new(rect.right(), rect.bottom()),
            Self::S => Point::new(c.x, rect.bottom()),
            Self::Sw => Point::new(rect.x, rect.bottom()),
            Self::W => Point::new(rect.x, c.y),
            Self::Nw => Point::new(rect.x, rect.y),
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    /// CSS cursor for hovering this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Nw | Self::Se => "nwse-resize",
        }
    }
}

/// Geometry after dragging `anchor` of `orig` by `(dx, dy)` world units.
///
/// The opposite edge stays fixed and neither side shrinks below
/// [`MIN_CARD_SIZE`]. With `keep_aspect`, the dominant axis drives the other.
#[must_use]
pub fn resize_rect(orig: &Rect, anchor: ResizeAnchor, dx: f64, dy: f64, keep_aspect: bool) -> Rect {
    let mut w = orig.width;
    let mut h = orig.height;
    if anchor.moves_right() {
        w += dx;
    }
    if anchor.moves_left() {
        w -= dx;
    }
    if anchor.moves_bottom() {
        h += dy;
    }
    if anchor.moves_top() {
        h -= dy;
    }
    w = w.max(MIN_CARD_SIZE);
    h = h.max(MIN_CARD_SIZE);

    if keep_aspect && orig.width > 0.0 && orig.height > 0.0 {
        let horizontal = anchor.moves_left() || anchor.moves_right();
        let vertical = anchor.moves_top() || anchor.moves_bottom();
        let sx = w / orig.width;
        let sy = h / orig.height;
        let scale = match (horizontal, vertical) {
            (true, false) => sx,
            (false, true) => sy,
            _ => {
                if (sx - 1.0).abs() >= (sy - 1.0).abs() {
                    sx
                } else {
                    sy
                }
            }
        };
        let min_scale = (MIN_CARD_SIZE / orig.width).max(MIN_CARD_SIZE / orig.height);
        let scale = scale.max(min_scale);
        w = orig.width * scale;
        h = orig.height * scale;
    }

    let x = if anchor.moves_left() { orig.right() - w } else { orig.x };
    let y = if anchor.moves_top() { orig.bottom() - h } else { orig.y };
    Rect::new(x, y, w, h)
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// A resize handle of the single selected card.
    ResizeHandle { card: CardId, anchor: ResizeAnchor },
    Connection(ConnectionId),
    Card(CardId),
    /// Inside a group's bounding box but not on any card.
    GroupFrame(GroupId),
}

/// Test what is under `world_pt`.
///
/// Priority: handles of `handle_card`, then connections, then the topmost card,
/// then group frames. The group named by `editing_group` has no frame hit.
#[must_use]
pub fn hit_test(
    world_pt: Point,
    scene: &Scene,
    camera: &Camera,
    handle_card: Option<CardId>,
    editing_group: Option<GroupId>,
) -> Option<Hit> {
    if let Some(card) = handle_card.and_then(|id| scene.card(&id)) {
        if !card.locked {
            if let Some(anchor) = handle_at(world_pt, &card.rect(), camera) {
                return Some(Hit::ResizeHandle { card: card.id, anchor });
            }
        }
    }

    if let Some(conn) = connection_at(world_pt, scene, camera) {
        return Some(Hit::Connection(conn));
    }

    if let Some(card) = scene.sorted_cards().into_iter().rev().find(|c| c.rect().contains(world_pt)) {
        return Some(Hit::Card(card.id));
    }

    let mut groups: Vec<GroupId> = scene
        .groups()
        .map(|g| g.id)
        .filter(|id| Some(*id) != editing_group)
        .collect();
    groups.sort();
    groups
        .into_iter()
        .find(|id| scene.group_bounds(id).is_some_and(|b| b.contains(world_pt)))
        .map(Hit::GroupFrame)
}

/// The handle of `rect` within [`HANDLE_RADIUS_PX`] screen pixels of `world_pt`.
#[must_use]
pub fn handle_at(world_pt: Point, rect: &Rect, camera: &Camera) -> Option<ResizeAnchor> {
    let radius = camera.screen_dist_to_world(HANDLE_RADIUS_PX);
    ResizeAnchor::ALL
        .into_iter()
        .find(|a| a.position(rect).distance(world_pt) <= radius)
}

/// The nearest connection within [`CONNECTION_HIT_PX`] screen pixels of `world_pt`.
#[must_use]
pub fn connection_at(world_pt: Point, scene: &Scene, camera: &Camera) -> Option<ConnectionId> {
    let limit = camera.screen_dist_to_world(CONNECTION_HIT_PX);
    let mut best: Option<(f64, ConnectionId)> = None;
    for conn in scene.connections() {
        let Some(path) = connect::connection_path(scene, conn) else {
            continue;
        };
        let d = connect::distance_to_connection(world_pt, &path);
        if d >= limit {
            continue;
        }
        if best.is_none_or(|(bd, bid)| d.total_cmp(&bd).then(conn.id.cmp(&bid)).is_lt()) {
            best = Some((d, conn.id));
        }
    }
    best.map(|(_, id)| id)
}
