//! Scene model: cards, groups, connections, and the store that owns them.
//!
//! This module defines the data types that describe what is on the canvas
//! (`Card` with its kind-specific `CardPayload`, `Group`, `Connection`) and
//! the runtime store that owns every live entity (`Scene`).
//!
//! `Scene` is the only place entities are inserted or removed, and every
//! removal performs its own integrity maintenance: deleting a card drops it
//! from its group and deletes every connection that references it in the
//! same call. Callers get back a `RemovedCard` bundle holding everything that
//! was taken out so the removal can be reversed exactly.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::cell::Cell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Rect};
use crate::consts::{
    DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MAX_STROKE_WIDTH, MIN_CARD_SIZE, MIN_FONT_SIZE, MIN_STROKE_WIDTH,
};

/// Unique identifier for a card.
pub type CardId = Uuid;
/// Unique identifier for a group.
pub type GroupId = Uuid;
/// Unique identifier for a connection.
pub type ConnectionId = Uuid;

// =============================================================
// Errors
// =============================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("card not found: {0}")]
    CardNotFound(CardId),
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
    #[error("a connection needs two different cards")]
    SelfConnection,
    #[error("a group needs at least two cards, got {0}")]
    GroupTooSmall(usize),
    #[error("card {card} already belongs to group {group}")]
    AlreadyGrouped { card: CardId, group: GroupId },
}

// =============================================================
// Cards
// =============================================================

/// The kind of a card, derived from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Image,
    Text,
    Shape,
}

/// Lifecycle of an image card's decoded pixels. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureState {
    /// Not decoded; nothing held in memory.
    #[default]
    Unloaded,
    /// A decode was requested; only the result carrying `ticket` may be applied.
    Loading { ticket: u64 },
    /// Decoded pixels are resident.
    Loaded,
    /// The last load failed; the card draws a placeholder until the user retries.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// File path or other identifier understood by the host's image loader.
    pub source: String,
    /// Pixel width of the source image; 0 when unknown.
    #[serde(default)]
    pub natural_width: f64,
    /// Pixel height of the source image; 0 when unknown.
    #[serde(default)]
    pub natural_height: f64,
    #[serde(skip)]
    pub texture: TextureState,
}

impl ImagePayload {
    #[must_use]
    pub fn new(source: impl Into<String>, natural_width: f64, natural_height: f64) -> Self {
        Self { source: source.into(), natural_width, natural_height, texture: TextureState::Unloaded }
    }

    /// Width / height of the source, when both dimensions are known.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.natural_width > 0.0 && self.natural_height > 0.0).then(|| self.natural_width / self.natural_height)
    }
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_true() -> bool {
    true
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// When set, the card height follows the wrapped content.
    #[serde(default = "default_true")]
    pub auto_height: bool,
}

impl Default for TextPayload {
    fn default() -> Self {
        Self { content: String::new(), font_size: DEFAULT_FONT_SIZE, bold: false, italic: false, auto_height: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Ellipse,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_stroke_color() -> String {
    "#ffffff".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePayload {
    #[serde(default)]
    pub shape: ShapeType,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default)]
    pub fill: bool,
    #[serde(default)]
    pub line_style: LineStyle,
}

impl ShapePayload {
    #[must_use]
    pub fn new(shape: ShapeType) -> Self {
        Self {
            shape,
            stroke_width: default_stroke_width(),
            stroke_color: default_stroke_color(),
            fill: false,
            line_style: LineStyle::Solid,
        }
    }
}

/// Kind-specific card content. The serde tag doubles as the card's `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardPayload {
    Image(ImagePayload),
    Text(TextPayload),
    Shape(ShapePayload),
}

impl CardPayload {
    #[must_use]
    pub fn kind(&self) -> CardKind {
        match self {
            Self::Image(_) => CardKind::Image,
            Self::Text(_) => CardKind::Text,
            Self::Shape(_) => CardKind::Shape,
        }
    }

    /// Clamp numeric fields into their valid ranges.
    pub fn normalize(&mut self) {
        match self {
            Self::Image(img) => {
                img.natural_width = non_negative(img.natural_width);
                img.natural_height = non_negative(img.natural_height);
            }
            Self::Text(text) => text.font_size = clamp_font_size(text.font_size),
            Self::Shape(shape) => shape.stroke_width = clamp_stroke_width(shape.stroke_width),
        }
    }
}

/// A card placed on the canvas, as stored in memory and in the board document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Always 0 in this version; kept so documents stay forward compatible.
    #[serde(default)]
    pub rotation: f64,
    /// Stacking order; lower values are drawn beneath higher values.
    #[serde(default)]
    pub z_index: i64,
    /// Locked cards ignore drag, resize, and nudge.
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub payload: CardPayload,
}

impl Card {
    /// Build a card with a fresh id. Size is clamped to [`MIN_CARD_SIZE`].
    #[must_use]
    pub fn new(rect: Rect, payload: CardPayload) -> Self {
        let mut card = Self {
            id: Uuid::new_v4(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation: 0.0,
            z_index: 0,
            locked: false,
            payload,
        };
        card.normalize();
        card
    }

    #[must_use]
    pub fn kind(&self) -> CardKind {
        self.payload.kind()
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether resizing keeps the width/height ratio.
    #[must_use]
    pub fn keeps_aspect_ratio(&self) -> bool {
        match &self.payload {
            CardPayload::Image(_) => true,
            CardPayload::Text(_) | CardPayload::Shape(_) => false,
        }
    }

    /// Enforce geometry and payload invariants after deserialization or a raw write.
    pub fn normalize(&mut self) {
        if !self.x.is_finite() {
            self.x = 0.0;
        }
        if !self.y.is_finite() {
            self.y = 0.0;
        }
        self.width = clamp_card_size(self.width);
        self.height = clamp_card_size(self.height);
        self.rotation = 0.0;
        self.payload.normalize();
    }

    fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = clamp_card_size(rect.width);
        self.height = clamp_card_size(rect.height);
    }
}

/// Clamp a card dimension to the minimum size; non-finite input becomes the minimum.
#[must_use]
pub fn clamp_card_size(v: f64) -> f64 {
    if v.is_finite() { v.max(MIN_CARD_SIZE) } else { MIN_CARD_SIZE }
}

#[must_use]
pub fn clamp_font_size(v: f64) -> f64 {
    if v.is_finite() { v.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE) } else { DEFAULT_FONT_SIZE }
}

#[must_use]
pub fn clamp_stroke_width(v: f64) -> f64 {
    if v.is_finite() { v.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH) } else { default_stroke_width() }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

// =============================================================
// Groups
// =============================================================

/// A named set of cards moved and selected as one unit.
///
/// The bounding box is derived: it is cached on first read and dropped
/// whenever membership or a member's geometry changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "member_ids", default)]
    pub members: Vec<CardId>,
    #[serde(skip)]
    cached_bounds: Cell<Option<Rect>>,
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.members == other.members
    }
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<CardId>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), members, cached_bounds: Cell::new(None) }
    }

    /// Drop the cached bounding box.
    pub fn invalidate(&self) {
        self.cached_bounds.set(None);
    }

    #[must_use]
    pub fn is_bounds_cached(&self) -> bool {
        self.cached_bounds.get().is_some()
    }
}

// =============================================================
// Connections
// =============================================================

/// Side of a card's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Where a connection attaches to a card.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPosition {
    /// Chosen per frame by the smart anchor heuristic.
    #[default]
    Auto,
    /// Pinned to `side`, at parametric position `t` (0 = start of the side, 1 = end).
    Edge { side: Side, t: f64 },
}

fn default_connection_color() -> String {
    "#9aa0a6".to_owned()
}

fn default_connection_width() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStyle {
    #[serde(default = "default_connection_color")]
    pub color: String,
    #[serde(default = "default_connection_width")]
    pub width: f64,
    #[serde(default)]
    pub dashed: bool,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self { color: default_connection_color(), width: default_connection_width(), dashed: false }
    }
}

fn default_curvature() -> f64 {
    0.0
}

/// A directed link from one card anchor to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source_card_id: CardId,
    #[serde(default)]
    pub source_anchor: AnchorPosition,
    pub target_card_id: CardId,
    #[serde(default)]
    pub target_anchor: AnchorPosition,
    /// 0 draws a straight line; larger magnitudes bow the curve further.
    #[serde(default = "default_curvature")]
    pub curvature: f64,
    #[serde(default = "default_true")]
    pub arrow: bool,
    #[serde(default)]
    pub style: ConnectionStyle,
}

impl Connection {
    #[must_use]
    pub fn new(source: CardId, source_anchor: AnchorPosition, target: CardId, target_anchor: AnchorPosition) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_card_id: source,
            source_anchor,
            target_card_id: target,
            target_anchor,
            curvature: 0.0,
            arrow: true,
            style: ConnectionStyle::default(),
        }
    }

    #[must_use]
    pub fn touches(&self, card: &CardId) -> bool {
        self.source_card_id == *card || self.target_card_id == *card
    }
}

// =============================================================
// Store
// =============================================================

/// Everything taken out of the scene when a card is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedCard {
    pub card: Card,
    /// The card's group as it was before the removal.
    pub group: Option<Group>,
    /// Connections deleted because they referenced the card.
    pub connections: Vec<Connection>,
}

/// In-memory store of every live entity on the board.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    cards: HashMap<CardId, Card>,
    groups: HashMap<GroupId, Group>,
    connections: HashMap<ConnectionId, Connection>,
    /// Reverse index enforcing disjoint group membership.
    card_group: HashMap<CardId, GroupId>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Cards ---

    /// Insert or replace a card. The card is normalized on the way in.
    pub fn insert_card(&mut self, mut card: Card) {
        card.normalize();
        let id = card.id;
        self.cards.insert(id, card);
        self.invalidate_group_of(&id);
    }

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    #[must_use]
    pub fn contains_card(&self, id: &CardId) -> bool {
        self.cards.contains_key(id)
    }

    /// Mutable access to a card's payload. Geometry goes through [`Scene::set_card_rect`].
    pub fn payload_mut(&mut self, id: &CardId) -> Option<&mut CardPayload> {
        self.cards.get_mut(id).map(|c| &mut c.payload)
    }

    /// Write a card's geometry, clamping to the minimum size. Ignores the lock flag:
    /// lock enforcement belongs to interactive callers.
    pub fn set_card_rect(&mut self, id: &CardId, rect: Rect) -> bool {
        let Some(card) = self.cards.get_mut(id) else {
            return false;
        };
        card.set_rect(rect);
        self.invalidate_group_of(id);
        true
    }

    pub fn set_card_locked(&mut self, id: &CardId, locked: bool) -> bool {
        let Some(card) = self.cards.get_mut(id) else {
            return false;
        };
        card.locked = locked;
        true
    }

    pub fn set_card_z(&mut self, id: &CardId, z_index: i64) -> bool {
        let Some(card) = self.cards.get_mut(id) else {
            return false;
        };
        card.z_index = z_index;
        true
    }

    /// Remove a card together with every reference to it.
    pub fn remove_card(&mut self, id: &CardId) -> Option<RemovedCard> {
        let card = self.cards.remove(id)?;

        let group = match self.card_group.remove(id) {
            Some(gid) => {
                let before = self.groups.get(&gid).cloned();
                let now_empty = match self.groups.get_mut(&gid) {
                    Some(g) => {
                        g.members.retain(|m| m != id);
                        g.invalidate();
                        g.members.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.groups.remove(&gid);
                }
                before
            }
            None => None,
        };

        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        let mut connections: Vec<Connection> = touching
            .iter()
            .filter_map(|cid| self.connections.remove(cid))
            .collect();
        connections.sort_by_key(|c| c.id);

        Some(RemovedCard { card, group, connections })
    }

    /// Put back everything a [`Scene::remove_card`] took out.
    pub fn restore_card(&mut self, removed: RemovedCard) {
        let RemovedCard { card, group, connections } = removed;
        self.insert_card(card);
        if let Some(group) = group {
            self.replace_group(group);
        }
        for conn in connections {
            if self.contains_card(&conn.source_card_id) && self.contains_card(&conn.target_card_id) {
                self.connections.insert(conn.id, conn);
            }
        }
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Iterate cards in no particular order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Return all cards sorted by `(z_index, id)` for draw order.
    #[must_use]
    pub fn sorted_cards(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.values().collect();
        cards.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        cards
    }

    /// Z-index one above the current topmost card.
    #[must_use]
    pub fn next_z(&self) -> i64 {
        self.cards.values().map(|c| c.z_index).max().map_or(0, |z| z + 1)
    }

    /// Z-index one below the current bottommost card.
    #[must_use]
    pub fn lowest_z(&self) -> i64 {
        self.cards.values().map(|c| c.z_index).min().map_or(0, |z| z - 1)
    }

    /// Bounding box of every card, or `None` for an empty board.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_all(self.cards.values().map(Card::rect))
    }

    // --- Groups ---

    /// Insert a group. Every member must exist and not already belong to another group.
    ///
    /// # Errors
    ///
    /// `CardNotFound` for a missing member, `AlreadyGrouped` for a member owned by
    /// another group, `GroupTooSmall` for an empty member list.
    pub fn insert_group(&mut self, group: Group) -> Result<GroupId, SceneError> {
        if group.members.is_empty() {
            return Err(SceneError::GroupTooSmall(0));
        }
        for member in &group.members {
            if !self.cards.contains_key(member) {
                return Err(SceneError::CardNotFound(*member));
            }
            if let Some(owner) = self.card_group.get(member) {
                if *owner != group.id {
                    return Err(SceneError::AlreadyGrouped { card: *member, group: *owner });
                }
            }
        }
        let id = group.id;
        self.replace_group(group);
        Ok(id)
    }

    /// Insert or overwrite a group, re-indexing its members. Callers guarantee validity.
    fn replace_group(&mut self, group: Group) {
        if let Some(old) = self.groups.remove(&group.id) {
            for m in &old.members {
                self.card_group.remove(m);
            }
        }
        for m in &group.members {
            self.card_group.insert(*m, group.id);
        }
        group.invalidate();
        self.groups.insert(group.id, group);
    }

    /// Dissolve a group. Member cards stay on the board.
    pub fn remove_group(&mut self, id: &GroupId) -> Option<Group> {
        let group = self.groups.remove(id)?;
        for m in &group.members {
            self.card_group.remove(m);
        }
        Some(group)
    }

    /// Remove the groups named in `remove`, then insert copies of `insert`.
    ///
    /// Members that are missing or already owned by another group are dropped;
    /// a group left with no members is skipped.
    pub fn swap_groups(&mut self, remove: &[GroupId], insert: &[Group]) {
        for id in remove {
            self.remove_group(id);
        }
        for group in insert {
            let mut group = group.clone();
            group
                .members
                .retain(|m| self.cards.contains_key(m) && !self.card_group.contains_key(m));
            if !group.members.is_empty() {
                self.replace_group(group);
            }
        }
    }

    #[must_use]
    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// The group a card belongs to, if any.
    #[must_use]
    pub fn group_of(&self, card: &CardId) -> Option<GroupId> {
        self.card_group.get(card).copied()
    }

    /// Bounding box of a group's members, recomputed only when stale.
    #[must_use]
    pub fn group_bounds(&self, id: &GroupId) -> Option<Rect> {
        let group = self.groups.get(id)?;
        if let Some(cached) = group.cached_bounds.get() {
            return Some(cached);
        }
        let bounds = Rect::union_all(group.members.iter().filter_map(|m| self.cards.get(m)).map(Card::rect))?;
        group.cached_bounds.set(Some(bounds));
        Some(bounds)
    }

    fn invalidate_group_of(&self, card: &CardId) {
        if let Some(group) = self.card_group.get(card).and_then(|gid| self.groups.get(gid)) {
            group.invalidate();
        }
    }

    // --- Connections ---

    /// Insert a connection whose endpoints both exist and differ.
    ///
    /// # Errors
    ///
    /// `SelfConnection` when both ends name the same card, `CardNotFound` otherwise.
    pub fn insert_connection(&mut self, conn: Connection) -> Result<ConnectionId, SceneError> {
        if conn.source_card_id == conn.target_card_id {
            return Err(SceneError::SelfConnection);
        }
        for end in [conn.source_card_id, conn.target_card_id] {
            if !self.cards.contains_key(&end) {
                return Err(SceneError::CardNotFound(end));
            }
        }
        let id = conn.id;
        self.connections.insert(id, conn);
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Mutable access for style and curvature edits. Endpoints must not be changed through it.
    pub fn connection_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Ids of every connection with an endpoint on any of `cards`, sorted.
    #[must_use]
    pub fn connections_touching(&self, cards: &[CardId]) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| cards.iter().any(|card| c.touches(card)))
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
