use std::time::Duration;

use tracing::{debug, error, info};
use uuid::Uuid;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point, Rect};
use crate::config::EngineConfig;
use crate::consts::{
    DEFAULT_IMAGE_SIZE, DEFAULT_SHAPE_SIZE, DEFAULT_TEXT_SIZE, DRAG_THRESHOLD_PX, DUPLICATE_OFFSET, FIT_MARGIN_PX,
    MAX_IMAGE_DIMENSION, NUDGE_STEP, WHEEL_PIXELS_PER_STEP, ZOOM_STEP,
};
use crate::cull::{self, LoadFailure, LoadOutcome, LoadRequest, TextureTracker};
use crate::doc::{
    AnchorPosition, Card, CardId, CardKind, CardPayload, Connection, ConnectionId, ConnectionStyle, Group, GroupId,
    ImagePayload, LineStyle, Scene, SceneError, ShapePayload, TextPayload, TextureState, clamp_font_size,
};
use crate::group;
use crate::hit::{self, Hit};
use crate::history::{History, HistoryEntry, PayloadChange};
use crate::input::{Button, InputState, Key, Modifiers, Tool, UiState, WheelDelta};
use crate::minimap::{self, MinimapLayout};
use crate::paint::{self, CanvasMeasure};
use crate::persist::{self, Autosave, BoardDocument, SaveJob, SaveOutcome, SaveTicket};
use crate::render::{self, DrawList, RedrawScheduler};
use crate::selection::{self, Selection, SelectionTarget};
use crate::snap::SnapTargets;
use crate::text::{self, ApproxMeasure, TextMeasure};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Notifications returned from engine calls for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CardsCreated(Vec<CardId>),
    CardsChanged(Vec<CardId>),
    CardsDeleted(Vec<CardId>),
    ConnectionsChanged(Vec<ConnectionId>),
    SelectionChanged,
    GroupsChanged,
    CameraChanged,
    HistoryChanged { can_undo: bool, can_redo: bool },
    /// Decode these images and report back through [`EngineCore::complete_image_load`].
    LoadImages(Vec<LoadRequest>),
    /// Release decoded pixels for these cards.
    UnloadImages(Vec<CardId>),
    /// Hand this job to the save worker and report back through [`EngineCore::apply_save_outcome`].
    SaveRequested(SaveJob),
    SetCursor(String),
    RenderNeeded,
}

/// An image file dropped or pasted onto the board.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedImage {
    pub path: String,
    pub filename: String,
    /// Pixel width; 0 when unknown.
    pub width: f64,
    /// Pixel height; 0 when unknown.
    pub height: f64,
}

/// Partial shape style update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeStyle {
    pub stroke_width: Option<f64>,
    pub stroke_color: Option<String>,
    pub fill: Option<bool>,
    pub line_style: Option<LineStyle>,
}

/// Core engine state: everything that does not need the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub scene: Scene,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub history: History,
    pub autosave: Autosave,
    pub textures: TextureTracker,
    pub redraw: RedrawScheduler,
    pub config: EngineConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    /// Latest host clock reading, from [`EngineCore::tick`].
    now: Duration,
    cursor: String,
    measure: Box<dyn TextMeasure>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default(), Box::new(ApproxMeasure::default()))
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig, measure: Box<dyn TextMeasure>) -> Self {
        Self {
            scene: Scene::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history: History::new(config.history_depth),
            autosave: Autosave::new(config.autosave_debounce),
            textures: TextureTracker::new(),
            redraw: RedrawScheduler::default(),
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
            now: Duration::ZERO,
            cursor: "default".to_owned(),
            measure,
        }
    }

    // =============================================================
    // Queries
    // =============================================================

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.ui.selection
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.scene.card(id)
    }

    /// Build this frame's draw list and consume the pending redraw request.
    pub fn draw_list(&mut self) -> DrawList {
        self.redraw.take();
        render::build(
            &self.scene,
            &self.camera,
            &self.ui,
            self.viewport_width,
            self.viewport_height,
            self.config.cull_padding_px,
            self.measure.as_ref(),
        )
    }

    #[must_use]
    pub fn minimap_layout(&self, panel_w: f64, panel_h: f64) -> Option<MinimapLayout> {
        minimap::project(&self.scene, &self.camera, self.viewport_width, self.viewport_height, panel_w, panel_h)
    }

    /// Snapshot the board for saving.
    #[must_use]
    pub fn document(&self) -> BoardDocument {
        persist::serialize_board(&self.scene, &self.camera)
    }

    // =============================================================
    // Host inputs
    // =============================================================

    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
    }

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.viewport_width = width_css.max(0.0);
        self.viewport_height = height_css.max(0.0);
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let mut actions = self.update_culling();
        self.request_render(&mut actions);
        actions
    }

    /// Advance the host clock and issue an autosave when one is due.
    pub fn tick(&mut self, now: Duration) -> Vec<Action> {
        self.now = now;
        match self.autosave.poll(now) {
            Some(ticket) => self.save_job(ticket),
            None => Vec::new(),
        }
    }

    /// Save immediately, bypassing the debounce.
    pub fn save_now(&mut self) -> Vec<Action> {
        match self.autosave.save_now() {
            Some(ticket) => self.save_job(ticket),
            None => Vec::new(),
        }
    }

    fn save_job(&mut self, ticket: SaveTicket) -> Vec<Action> {
        match persist::to_json(&self.document()) {
            Ok(json) => vec![Action::SaveRequested(SaveJob { ticket, json })],
            Err(e) => {
                error!(error = %e, revision = ticket.revision, "board serialization failed");
                self.autosave.finish(ticket, &Err(e), self.now);
                Vec::new()
            }
        }
    }

    /// Apply a result from the save worker. Returns `true` when the board is clean.
    pub fn apply_save_outcome(&mut self, outcome: SaveOutcome) -> bool {
        self.autosave.finish(outcome.ticket, &outcome.result, self.now)
    }

    /// Start a save worker with the configured queue capacity.
    ///
    /// Must be called inside a tokio runtime.
    #[cfg(not(target_arch = "wasm32"))]
    #[must_use]
    pub fn spawn_save_worker<S: persist::BoardStorage>(&self, storage: S) -> persist::SaveWorker {
        persist::spawn_save_worker(storage, self.config.save_queue_capacity)
    }

    /// Replace the whole board with a stored document.
    pub fn load_document(&mut self, doc: BoardDocument) -> Vec<Action> {
        let (scene, camera, report) = persist::restore_board(doc);
        self.scene = scene;
        self.camera = camera;
        self.input = InputState::Idle;
        self.ui.selection.clear();
        self.ui.editing_group = None;
        self.ui.marquee = None;
        self.ui.creation_preview = None;
        self.ui.snap_guides.clear();
        self.history.clear();
        info!(cards = report.cards, pruned = report.pruned(), "board loaded");

        let mut actions = vec![
            Action::SelectionChanged,
            Action::GroupsChanged,
            Action::CameraChanged,
            self.history_changed(),
        ];
        actions.extend(self.update_culling());
        self.request_render(&mut actions);
        actions
    }

    // =============================================================
    // Card store
    // =============================================================

    /// Create a card of default size with its top-left corner at `at`.
    pub fn create_card(&mut self, payload: CardPayload, at: Point) -> (CardId, Vec<Action>) {
        let (w, h) = default_size(payload.kind());
        self.insert_new_card(Card::new(Rect::new(at.x, at.y, w, h), payload))
    }

    /// Create an image card centered on `at`, scaled down to fit [`MAX_IMAGE_DIMENSION`].
    pub fn import_image(&mut self, image: ImportedImage, at: Point) -> (CardId, Vec<Action>) {
        let (w, h) = image_card_size(image.width, image.height);
        let rect = Rect::new(at.x - w * 0.5, at.y - h * 0.5, w, h);
        let payload = CardPayload::Image(ImagePayload::new(image.path, image.width, image.height));
        let (id, actions) = self.insert_new_card(Card::new(rect, payload));
        info!(card_id = %id, filename = %image.filename, "image imported");
        (id, actions)
    }

    fn insert_new_card(&mut self, mut card: Card) -> (CardId, Vec<Action>) {
        card.z_index = self.scene.next_z();
        if let CardPayload::Text(t) = &card.payload {
            if t.auto_height {
                card.height = text::fit_height(&t.content, card.width, t.font_size, self.measure.as_ref());
            }
        }
        let id = card.id;
        self.scene.insert_card(card.clone());
        self.ui.selection.set([SelectionTarget::Card(id)]);
        debug!(card_id = %id, kind = ?card.kind(), "card created");

        let mut actions = vec![Action::CardsCreated(vec![id]), Action::SelectionChanged];
        self.record(HistoryEntry::Create { cards: vec![card], groups: Vec::new(), connections: Vec::new() }, &mut actions);
        actions.extend(self.update_culling());
        (id, actions)
    }

    /// Move a card's top-left corner. Locked or missing cards are left alone.
    pub fn move_card(&mut self, id: &CardId, x: f64, y: f64) -> Vec<Action> {
        let Some(card) = self.scene.card(id).filter(|c| !c.locked) else {
            return Vec::new();
        };
        let before = card.origin();
        let after = Point::new(x, y);
        if !x.is_finite() || !y.is_finite() || before == after {
            return Vec::new();
        }
        let entry = HistoryEntry::Move { moves: vec![(*id, before, after)] };
        entry.apply(&mut self.scene);
        let mut actions = self.geometry_changed(&[*id]);
        self.record(entry, &mut actions);
        actions
    }

    /// Set a card's geometry. Locked or missing cards are left alone.
    pub fn resize_card_to(&mut self, id: &CardId, rect: Rect) -> Vec<Action> {
        let Some(before) = self.scene.card(id).filter(|c| !c.locked).map(Card::rect) else {
            return Vec::new();
        };
        self.scene.set_card_rect(id, rect);
        let Some(entry) = self.settle_resize(id, before) else {
            return Vec::new();
        };
        let mut actions = self.geometry_changed(&[*id]);
        self.record(entry, &mut actions);
        actions
    }

    /// Finish a resize from `before` to the card's current rect.
    ///
    /// A text card with auto-height re-fits its height when the width changed;
    /// a height-only resize switches auto-height off.
    fn settle_resize(&mut self, id: &CardId, before: Rect) -> Option<HistoryEntry> {
        let card = self.scene.card(id)?;
        let mut after = card.rect();
        if after == before {
            return None;
        }
        let payload_before = card.payload.clone();
        let mut payload_after = payload_before.clone();
        if let CardPayload::Text(t) = &mut payload_after {
            if t.auto_height {
                if (after.width - before.width).abs() > f64::EPSILON {
                    after.height = text::fit_height(&t.content, after.width, t.font_size, self.measure.as_ref());
                } else {
                    t.auto_height = false;
                }
            }
        }
        self.scene.set_card_rect(id, after);
        let after = self.scene.card(id)?.rect();

        if payload_after == payload_before {
            return Some(HistoryEntry::Resize { changes: vec![(*id, before, after)] });
        }
        let entry = HistoryEntry::Payload {
            changes: vec![PayloadChange {
                card: *id,
                before: payload_before,
                after: payload_after,
                rect_before: before,
                rect_after: after,
            }],
        };
        entry.apply(&mut self.scene);
        Some(entry)
    }

    pub fn delete_card(&mut self, id: &CardId) -> Vec<Action> {
        self.delete(vec![*id], Vec::new())
    }

    /// Delete every selected card (groups expand to members) and connection.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        let cards = self.ui.selection.cards(&self.scene);
        let connections = self.ui.selection.connections();
        self.delete(cards, connections)
    }

    fn delete(&mut self, cards: Vec<CardId>, connections: Vec<ConnectionId>) -> Vec<Action> {
        let loose: Vec<Connection> = connections.iter().filter_map(|c| self.scene.remove_connection(c)).collect();
        let removed: Vec<_> = cards.iter().filter_map(|id| self.scene.remove_card(id)).collect();
        if removed.is_empty() && loose.is_empty() {
            return Vec::new();
        }

        let deleted: Vec<CardId> = removed.iter().map(|r| r.card.id).collect();
        let mut gone: Vec<ConnectionId> = loose.iter().map(|c| c.id).collect();
        gone.extend(removed.iter().flat_map(|r| r.connections.iter().map(|c| c.id)));
        let groups_touched = removed.iter().any(|r| r.group.is_some());
        debug!(cards = deleted.len(), connections = gone.len(), "deleted");

        let mut actions = Vec::new();
        if !deleted.is_empty() {
            actions.push(Action::CardsDeleted(deleted));
        }
        if !gone.is_empty() {
            actions.push(Action::ConnectionsChanged(gone));
        }
        if groups_touched {
            actions.push(Action::GroupsChanged);
        }
        self.prune_ui(&mut actions);
        self.record(HistoryEntry::Delete { removed, connections: loose }, &mut actions);
        actions
    }

    /// Copy the selected cards, with any fully copied groups and connections, and select the copies.
    pub fn duplicate_selection(&mut self) -> Vec<Action> {
        let mut originals: Vec<&Card> =
            self.ui.selection.cards(&self.scene).iter().filter_map(|id| self.scene.card(id)).collect();
        if originals.is_empty() {
            return Vec::new();
        }
        originals.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));

        let top = self.scene.next_z();
        let mut id_map: Vec<(CardId, CardId)> = Vec::new();
        let mut cards: Vec<Card> = Vec::new();
        for (z, original) in (top..).zip(originals) {
            let mut copy = original.clone();
            copy.id = Uuid::new_v4();
            copy.x += DUPLICATE_OFFSET;
            copy.y += DUPLICATE_OFFSET;
            copy.z_index = z;
            copy.locked = false;
            if let CardPayload::Image(img) = &mut copy.payload {
                img.texture = TextureState::Unloaded;
            }
            id_map.push((original.id, copy.id));
            cards.push(copy);
        }
        let mapped = |id: &CardId| id_map.iter().find(|(from, _)| from == id).map(|(_, to)| *to);

        let groups: Vec<Group> = self
            .scene
            .groups()
            .filter_map(|g| {
                let members: Option<Vec<CardId>> = g.members.iter().map(mapped).collect();
                members.map(|m| Group::new(format!("{} copy", g.name), m))
            })
            .collect();
        let connections: Vec<Connection> = self
            .scene
            .connections()
            .filter_map(|c| {
                let (source, target) = (mapped(&c.source_card_id)?, mapped(&c.target_card_id)?);
                Some(Connection { id: Uuid::new_v4(), source_card_id: source, target_card_id: target, ..c.clone() })
            })
            .collect();

        let mut targets: Vec<SelectionTarget> = groups.iter().map(|g| SelectionTarget::Group(g.id)).collect();
        for card in &cards {
            if !groups.iter().any(|g| g.members.contains(&card.id)) {
                targets.push(SelectionTarget::Card(card.id));
            }
        }

        let created: Vec<CardId> = cards.iter().map(|c| c.id).collect();
        let entry = HistoryEntry::Create { cards, groups, connections };
        entry.apply(&mut self.scene);
        self.ui.selection.set(targets);
        debug!(cards = created.len(), "selection duplicated");

        let mut actions = vec![Action::CardsCreated(created), Action::GroupsChanged, Action::SelectionChanged];
        self.record(entry, &mut actions);
        actions.extend(self.update_culling());
        actions
    }

    /// Replace a text card's content.
    pub fn set_text(&mut self, id: &CardId, content: String) -> Vec<Action> {
        self.edit_payload(id, |payload| match payload {
            CardPayload::Text(t) => {
                t.content = content;
                true
            }
            CardPayload::Image(_) | CardPayload::Shape(_) => false,
        })
    }

    pub fn set_text_style(&mut self, id: &CardId, font_size: f64, bold: bool, italic: bool) -> Vec<Action> {
        self.edit_payload(id, |payload| match payload {
            CardPayload::Text(t) => {
                t.font_size = clamp_font_size(font_size);
                t.bold = bold;
                t.italic = italic;
                true
            }
            CardPayload::Image(_) | CardPayload::Shape(_) => false,
        })
    }

    pub fn set_shape_style(&mut self, id: &CardId, style: ShapeStyle) -> Vec<Action> {
        self.edit_payload(id, |payload| match payload {
            CardPayload::Shape(s) => {
                apply_shape_style(s, style);
                true
            }
            CardPayload::Image(_) | CardPayload::Text(_) => false,
        })
    }

    /// Edit a payload through `edit`, which returns `false` when the card has the wrong kind.
    fn edit_payload<F>(&mut self, id: &CardId, edit: F) -> Vec<Action>
    where
        F: FnOnce(&mut CardPayload) -> bool,
    {
        let Some(card) = self.scene.card(id) else {
            return Vec::new();
        };
        let before = card.payload.clone();
        let rect_before = card.rect();
        let mut after = before.clone();
        if !edit(&mut after) {
            return Vec::new();
        }
        after.normalize();
        let mut rect_after = rect_before;
        if let CardPayload::Text(t) = &after {
            if t.auto_height {
                rect_after.height = text::fit_height(&t.content, rect_after.width, t.font_size, self.measure.as_ref());
            }
        }
        let entry = HistoryEntry::Payload {
            changes: vec![PayloadChange { card: *id, before, after, rect_before, rect_after }],
        };
        if entry.is_noop() {
            return Vec::new();
        }
        entry.apply(&mut self.scene);
        let mut actions = self.geometry_changed(&[*id]);
        self.record(entry, &mut actions);
        actions
    }

    pub fn set_locked(&mut self, ids: &[CardId], locked: bool) -> Vec<Action> {
        let changes: Vec<(CardId, bool, bool)> = ids
            .iter()
            .filter_map(|id| self.scene.card(id))
            .filter(|c| c.locked != locked)
            .map(|c| (c.id, c.locked, locked))
            .collect();
        self.reorder_or_lock(HistoryEntry::Lock { changes })
    }

    pub fn bring_to_front(&mut self, ids: &[CardId]) -> Vec<Action> {
        let ordered = self.in_z_order(ids);
        let top = self.scene.next_z();
        let changes = (top..).zip(ordered).map(|(z, (id, before))| (id, before, z)).collect();
        self.reorder_or_lock(HistoryEntry::Reorder { changes })
    }

    pub fn send_to_back(&mut self, ids: &[CardId]) -> Vec<Action> {
        let ordered = self.in_z_order(ids);
        let count = i64::try_from(ordered.len()).unwrap_or(i64::MAX);
        let bottom = self.scene.lowest_z().saturating_sub(count - 1);
        let changes = (bottom..).zip(ordered).map(|(z, (id, before))| (id, before, z)).collect();
        self.reorder_or_lock(HistoryEntry::Reorder { changes })
    }

    fn in_z_order(&self, ids: &[CardId]) -> Vec<(CardId, i64)> {
        self.scene
            .sorted_cards()
            .into_iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| (c.id, c.z_index))
            .collect()
    }

    fn reorder_or_lock(&mut self, entry: HistoryEntry) -> Vec<Action> {
        if entry.is_noop() {
            return Vec::new();
        }
        entry.apply(&mut self.scene);
        let mut actions = vec![Action::CardsChanged(entry.cards())];
        self.record(entry, &mut actions);
        actions
    }

    // =============================================================
    // Connections
    // =============================================================

    /// Connect two cards.
    ///
    /// # Errors
    ///
    /// `SelfConnection` when both ends are the same card, `CardNotFound` for a missing card.
    pub fn create_connection(
        &mut self,
        source: CardId,
        source_anchor: AnchorPosition,
        target: CardId,
        target_anchor: AnchorPosition,
        curvature: f64,
    ) -> Result<(ConnectionId, Vec<Action>), SceneError> {
        let mut conn = Connection::new(source, source_anchor, target, target_anchor);
        conn.curvature = finite_or_zero(curvature);
        let id = self.scene.insert_connection(conn.clone())?;
        debug!(connection_id = %id, source = %source, target = %target, "connection created");
        let mut actions = vec![Action::ConnectionsChanged(vec![id])];
        self.record(HistoryEntry::Connect(conn), &mut actions);
        Ok((id, actions))
    }

    /// # Errors
    ///
    /// `ConnectionNotFound` for an unknown id.
    pub fn set_connection_curvature(&mut self, id: &ConnectionId, curvature: f64) -> Result<Vec<Action>, SceneError> {
        let curvature = finite_or_zero(curvature);
        self.edit_connection(id, |c| c.curvature = curvature)
    }

    /// # Errors
    ///
    /// `ConnectionNotFound` for an unknown id.
    pub fn set_connection_style(&mut self, id: &ConnectionId, style: ConnectionStyle) -> Result<Vec<Action>, SceneError> {
        self.edit_connection(id, |c| c.style = style)
    }

    /// # Errors
    ///
    /// `ConnectionNotFound` for an unknown id.
    pub fn toggle_connection_arrow(&mut self, id: &ConnectionId) -> Result<Vec<Action>, SceneError> {
        self.edit_connection(id, |c| c.arrow = !c.arrow)
    }

    fn edit_connection<F>(&mut self, id: &ConnectionId, edit: F) -> Result<Vec<Action>, SceneError>
    where
        F: FnOnce(&mut Connection),
    {
        let before = self.scene.connection(id).cloned().ok_or(SceneError::ConnectionNotFound(*id))?;
        let mut after = before.clone();
        edit(&mut after);
        let entry = HistoryEntry::ConnectionEdit { before, after };
        if entry.is_noop() {
            return Ok(Vec::new());
        }
        entry.apply(&mut self.scene);
        let mut actions = vec![Action::ConnectionsChanged(vec![*id])];
        self.record(entry, &mut actions);
        Ok(actions)
    }

    /// # Errors
    ///
    /// `ConnectionNotFound` for an unknown id.
    pub fn delete_connection(&mut self, id: &ConnectionId) -> Result<Vec<Action>, SceneError> {
        if self.scene.connection(id).is_none() {
            return Err(SceneError::ConnectionNotFound(*id));
        }
        Ok(self.delete(Vec::new(), vec![*id]))
    }

    // =============================================================
    // Groups
    // =============================================================

    /// Group the selected cards.
    ///
    /// # Errors
    ///
    /// `GroupTooSmall` when fewer than two cards are selected.
    pub fn group_selection(&mut self) -> Result<(GroupId, Vec<Action>), SceneError> {
        let (gid, change) = group::group_selected(&mut self.scene, &mut self.ui.selection)?;
        let mut actions = vec![Action::GroupsChanged, Action::SelectionChanged];
        self.record(HistoryEntry::Group(change), &mut actions);
        Ok((gid, actions))
    }

    pub fn ungroup_selection(&mut self) -> Vec<Action> {
        let Some(change) = group::ungroup_selected(&mut self.scene, &mut self.ui.selection) else {
            return Vec::new();
        };
        if self.ui.editing_group.is_some_and(|g| self.scene.group(&g).is_none()) {
            self.ui.editing_group = None;
        }
        let mut actions = vec![Action::GroupsChanged, Action::SelectionChanged];
        self.record(HistoryEntry::Ungroup(change), &mut actions);
        actions
    }

    /// Make the members of `id` individually selectable.
    pub fn enter_group_edit(&mut self, id: &GroupId) -> Vec<Action> {
        if self.scene.group(id).is_none() || self.ui.editing_group == Some(*id) {
            return Vec::new();
        }
        self.ui.editing_group = Some(*id);
        self.ui.selection.clear();
        let mut actions = vec![Action::SelectionChanged];
        self.request_render(&mut actions);
        actions
    }

    pub fn exit_group_edit(&mut self) -> Vec<Action> {
        let Some(gid) = self.ui.editing_group.take() else {
            return Vec::new();
        };
        let target = self.scene.group(&gid).map(|g| SelectionTarget::Group(g.id));
        self.ui.selection.set(target);
        let mut actions = vec![Action::SelectionChanged];
        self.request_render(&mut actions);
        actions
    }

    // =============================================================
    // History
    // =============================================================

    pub fn undo(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        let Some(entry) = self.history.undo(&mut self.scene) else {
            return actions;
        };
        let cards = entry.cards();
        self.after_replay(cards, &mut actions);
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        let mut actions = self.cancel_gesture();
        let Some(entry) = self.history.redo(&mut self.scene) else {
            return actions;
        };
        let cards = entry.cards();
        self.after_replay(cards, &mut actions);
        actions
    }

    fn after_replay(&mut self, cards: Vec<CardId>, actions: &mut Vec<Action>) {
        let (live, gone): (Vec<CardId>, Vec<CardId>) = cards.into_iter().partition(|id| self.scene.contains_card(id));
        if !gone.is_empty() {
            actions.push(Action::CardsDeleted(gone));
        }
        if !live.is_empty() {
            let touching = self.scene.connections_touching(&live);
            actions.push(Action::CardsChanged(live));
            if !touching.is_empty() {
                actions.push(Action::ConnectionsChanged(touching));
            }
        }
        actions.push(Action::GroupsChanged);
        self.prune_ui(actions);
        self.touch(actions);
        actions.extend(self.update_culling());
    }

    // =============================================================
    // Camera
    // =============================================================

    /// Frame every card, or reset to the identity view on an empty board.
    pub fn fit_all(&mut self) -> Vec<Action> {
        match self.scene.bounds() {
            Some(bounds) => self.camera.fit_rect(&bounds, self.viewport_width, self.viewport_height, FIT_MARGIN_PX),
            None => self.camera = Camera::default(),
        }
        self.camera_changed()
    }

    /// Recenter the view on the world point under a minimap click.
    pub fn minimap_navigate(&mut self, panel_pt: Point, panel_w: f64, panel_h: f64) -> Vec<Action> {
        let Some(layout) = self.minimap_layout(panel_w, panel_h) else {
            return Vec::new();
        };
        let world = layout.world_at(panel_pt);
        self.camera.center_on(world, self.viewport_width, self.viewport_height);
        self.camera_changed()
    }

    fn zoom_about_center(&mut self, factor: f64) -> Vec<Action> {
        let center = Point::new(self.viewport_width * 0.5, self.viewport_height * 0.5);
        self.camera.zoom_by(factor, center);
        self.camera_changed()
    }

    fn camera_changed(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::CameraChanged];
        actions.extend(self.update_culling());
        self.request_render(&mut actions);
        actions
    }

    // =============================================================
    // Images
    // =============================================================

    /// Run a culling pass: unload images that left the view, request those that entered it.
    pub fn update_culling(&mut self) -> Vec<Action> {
        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return Vec::new();
        }
        let update = self.textures.update(
            &mut self.scene,
            &self.camera,
            self.viewport_width,
            self.viewport_height,
            self.config.cull_padding_px,
        );
        let mut actions = Vec::new();
        if !update.unload.is_empty() {
            actions.push(Action::UnloadImages(update.unload));
        }
        if !update.load.is_empty() {
            actions.push(Action::LoadImages(update.load));
        }
        actions
    }

    pub fn complete_image_load(&mut self, ticket: u64, card_id: &CardId, result: Result<(), LoadFailure>) -> Vec<Action> {
        match cull::complete_load(&mut self.scene, ticket, card_id, result) {
            LoadOutcome::Loaded | LoadOutcome::Placeholder => {
                let mut actions = vec![Action::CardsChanged(vec![*card_id])];
                self.request_render(&mut actions);
                actions
            }
            LoadOutcome::Stale => Vec::new(),
        }
    }

    /// Retry a failed image. The only way out of the placeholder state.
    pub fn retry_image_load(&mut self, card_id: &CardId) -> Vec<Action> {
        if !cull::retry_load(&mut self.scene, card_id) {
            return Vec::new();
        }
        self.update_culling()
    }

    // =============================================================
    // Pointer input
    // =============================================================

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if self.input.is_active() {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();

        let pan_gesture = button == Button::Middle
            || (button == Button::Primary && (self.ui.tool == Tool::Pan || self.ui.space_held));
        if pan_gesture {
            self.input = InputState::Panning { last_screen: screen_pt };
            self.set_cursor("grabbing", &mut actions);
            return actions;
        }
        if button != Button::Primary {
            return actions;
        }

        if self.ui.tool.creates_card() {
            self.input = InputState::Creating { tool: self.ui.tool, start_world: world, start_screen: screen_pt };
            self.ui.creation_preview = Some(Rect::new(world.x, world.y, 0.0, 0.0));
            self.request_render(&mut actions);
            return actions;
        }

        let handle_card = match self.ui.selection.single() {
            Some(SelectionTarget::Card(id)) => Some(id),
            _ => None,
        };
        let toggle = modifiers.toggle();
        match hit::hit_test(world, &self.scene, &self.camera, handle_card, self.ui.editing_group) {
            Some(Hit::ResizeHandle { card, anchor }) => {
                if let Some(orig) = self.scene.card(&card).map(Card::rect) {
                    self.input = InputState::Resizing { card, anchor, start_world: world, orig };
                    self.set_cursor(anchor.cursor(), &mut actions);
                }
            }
            Some(Hit::Connection(id)) => {
                let target = SelectionTarget::Connection(id);
                if toggle {
                    self.ui.selection.toggle(target);
                } else {
                    self.ui.selection.set([target]);
                }
                actions.push(Action::SelectionChanged);
                self.request_render(&mut actions);
            }
            Some(Hit::Card(card)) => {
                let target = selection::target_for_card(&self.scene, card, self.ui.editing_group);
                self.press_target(target, screen_pt, world, toggle, &mut actions);
            }
            Some(Hit::GroupFrame(gid)) => {
                self.press_target(SelectionTarget::Group(gid), screen_pt, world, toggle, &mut actions);
            }
            None => {
                let before = self.ui.selection.clone();
                let base = if toggle {
                    Some(self.ui.selection.clone())
                } else {
                    if !self.ui.selection.is_empty() {
                        self.ui.selection.clear();
                        actions.push(Action::SelectionChanged);
                    }
                    None
                };
                self.input = InputState::Marquee { start_world: world, base, before };
                self.ui.marquee = Some(Rect::new(world.x, world.y, 0.0, 0.0));
                self.request_render(&mut actions);
            }
        }
        actions
    }

    /// Press on a card or group frame. An unselected target is selected right away so a
    /// drag moves it; the click itself is resolved on release.
    fn press_target(
        &mut self,
        target: SelectionTarget,
        screen_pt: Point,
        world: Point,
        toggle: bool,
        actions: &mut Vec<Action>,
    ) {
        let before = self.ui.selection.clone();
        if !toggle && !self.ui.selection.contains(&target) {
            self.ui.selection.set([target]);
            actions.push(Action::SelectionChanged);
            self.request_render(actions);
        }
        self.input = InputState::PendingDrag { target, start_screen: screen_pt, start_world: world, toggle, before };
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();
        let input = std::mem::take(&mut self.input);

        self.input = match input {
            InputState::Idle => {
                self.update_hover_cursor(world, &mut actions);
                InputState::Idle
            }
            InputState::Panning { last_screen } => {
                self.camera.pan(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                actions.extend(self.camera_changed());
                InputState::Panning { last_screen: screen_pt }
            }
            InputState::PendingDrag { target, start_screen, start_world, toggle, before } => {
                if screen_pt.distance(start_screen) < DRAG_THRESHOLD_PX {
                    InputState::PendingDrag { target, start_screen, start_world, toggle, before }
                } else {
                    if self.ui.selection.insert(target) {
                        actions.push(Action::SelectionChanged);
                    }
                    let (origins, start_bounds, targets) = self.begin_drag();
                    let (dx, dy) = (world.x - start_world.x, world.y - start_world.y);
                    actions.extend(self.drag_to(&origins, &start_bounds, &targets, dx, dy, modifiers.alt));
                    InputState::Dragging { start_world, origins, start_bounds, targets, before }
                }
            }
            InputState::Dragging { start_world, origins, start_bounds, targets, before } => {
                let (dx, dy) = (world.x - start_world.x, world.y - start_world.y);
                actions.extend(self.drag_to(&origins, &start_bounds, &targets, dx, dy, modifiers.alt));
                InputState::Dragging { start_world, origins, start_bounds, targets, before }
            }
            InputState::Resizing { card, anchor, start_world, orig } => {
                let keep = modifiers.shift || self.scene.card(&card).is_some_and(Card::keeps_aspect_ratio);
                let rect = hit::resize_rect(&orig, anchor, world.x - start_world.x, world.y - start_world.y, keep);
                self.scene.set_card_rect(&card, rect);
                actions.extend(self.geometry_changed(&[card]));
                InputState::Resizing { card, anchor, start_world, orig }
            }
            InputState::Marquee { start_world, base, before } => {
                let rect = Rect::from_corners(start_world, world);
                self.ui.marquee = Some(rect);
                let mut next = base.clone().unwrap_or_default();
                for target in selection::marquee_targets(&self.scene, &rect, self.ui.editing_group) {
                    next.insert(target);
                }
                if next != self.ui.selection {
                    self.ui.selection = next;
                    actions.push(Action::SelectionChanged);
                }
                self.request_render(&mut actions);
                InputState::Marquee { start_world, base, before }
            }
            InputState::Creating { tool, start_world, start_screen } => {
                self.ui.creation_preview = Some(Rect::from_corners(start_world, world));
                self.request_render(&mut actions);
                InputState::Creating { tool, start_world, start_screen }
            }
        };
        actions
    }

    /// Snapshot every selected, unlocked card with its bounds and the snap lines around it.
    fn begin_drag(&self) -> (Vec<(CardId, Rect)>, Rect, SnapTargets) {
        let origins: Vec<(CardId, Rect)> = self
            .ui
            .selection
            .cards(&self.scene)
            .iter()
            .filter_map(|id| self.scene.card(id))
            .filter(|c| !c.locked)
            .map(|c| (c.id, c.rect()))
            .collect();
        let moving: Vec<CardId> = origins.iter().map(|(id, _)| *id).collect();
        let start_bounds = Rect::union_all(origins.iter().map(|(_, r)| *r)).unwrap_or_default();
        let targets = SnapTargets::collect(&self.scene, &moving);
        (origins, start_bounds, targets)
    }

    /// Place every dragged card at its origin plus the (snapped) delta.
    fn drag_to(
        &mut self,
        origins: &[(CardId, Rect)],
        start_bounds: &Rect,
        targets: &SnapTargets,
        dx: f64,
        dy: f64,
        free: bool,
    ) -> Vec<Action> {
        self.ui.snap_guides.clear();
        let proposed = start_bounds.translate(dx, dy);
        let (mut bounds_x, mut bounds_y) = (proposed.x, proposed.y);
        if !free && !targets.is_empty() && !origins.is_empty() {
            let threshold = self.camera.screen_dist_to_world(self.config.snap_threshold_px);
            let snap = targets.snap(&proposed, threshold);
            (bounds_x, bounds_y) = snap.origin(&proposed);
            self.ui.snap_guides = snap.guides;
        }
        // Offsets within the group are exact zero for the card on the bounds edge.
        for (id, rect) in origins {
            let placed = Rect {
                x: bounds_x + (rect.x - start_bounds.x),
                y: bounds_y + (rect.y - start_bounds.y),
                ..*rect
            };
            self.scene.set_card_rect(id, placed);
        }
        let ids: Vec<CardId> = origins.iter().map(|(id, _)| *id).collect();
        if ids.is_empty() {
            let mut actions = Vec::new();
            self.request_render(&mut actions);
            return actions;
        }
        self.geometry_changed(&ids)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();
        match std::mem::take(&mut self.input) {
            InputState::Idle => {}
            InputState::Panning { .. } => {
                let cursor = if self.ui.space_held { "grab" } else { "default" };
                self.set_cursor(cursor, &mut actions);
            }
            InputState::PendingDrag { target, toggle, .. } => {
                let before = self.ui.selection.clone();
                if toggle {
                    self.ui.selection.toggle(target);
                } else {
                    self.ui.selection.set([target]);
                }
                if self.ui.selection != before {
                    actions.push(Action::SelectionChanged);
                }
                self.request_render(&mut actions);
            }
            InputState::Dragging { origins, .. } => {
                self.ui.snap_guides.clear();
                let moves: Vec<(CardId, Point, Point)> = origins
                    .iter()
                    .filter_map(|(id, r)| self.scene.card(id).map(|c| (*id, Point::new(r.x, r.y), c.origin())))
                    .collect();
                self.record(HistoryEntry::Move { moves }, &mut actions);
            }
            InputState::Resizing { card, orig, .. } => {
                if let Some(entry) = self.settle_resize(&card, orig) {
                    actions.extend(self.geometry_changed(&[card]));
                    self.record(entry, &mut actions);
                }
                self.set_cursor("default", &mut actions);
            }
            InputState::Marquee { .. } => {
                self.ui.marquee = None;
                self.request_render(&mut actions);
            }
            InputState::Creating { tool, start_world, start_screen } => {
                self.ui.creation_preview = None;
                let payload = match tool.shape_type() {
                    Some(shape) => CardPayload::Shape(ShapePayload::new(shape)),
                    None => CardPayload::Text(TextPayload::default()),
                };
                let rect = if screen_pt.distance(start_screen) < DRAG_THRESHOLD_PX {
                    let (w, h) = default_size(payload.kind());
                    Rect::new(start_world.x, start_world.y, w, h)
                } else {
                    Rect::from_corners(start_world, world)
                };
                let (_, created) = self.insert_new_card(Card::new(rect, payload));
                actions.extend(created);
            }
        }
        actions
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            let factor = ZOOM_STEP.powf(-delta.dy / WHEEL_PIXELS_PER_STEP);
            self.camera.zoom_by(factor, screen_pt);
        } else {
            self.camera.pan(-delta.dx, -delta.dy);
        }
        self.camera_changed()
    }

    /// Restore the pre-gesture state without recording history.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        match std::mem::take(&mut self.input) {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {}
            InputState::PendingDrag { before, .. } => self.restore_selection(before, &mut actions),
            InputState::Dragging { origins, before, .. } => {
                self.ui.snap_guides.clear();
                for (id, rect) in &origins {
                    self.scene.set_card_rect(id, *rect);
                }
                let ids: Vec<CardId> = origins.iter().map(|(id, _)| *id).collect();
                if !ids.is_empty() {
                    actions.extend(self.geometry_changed(&ids));
                }
                self.restore_selection(before, &mut actions);
            }
            InputState::Resizing { card, orig, .. } => {
                self.scene.set_card_rect(&card, orig);
                actions.extend(self.geometry_changed(&[card]));
            }
            InputState::Marquee { before, .. } => {
                self.ui.marquee = None;
                self.restore_selection(before, &mut actions);
            }
            InputState::Creating { .. } => self.ui.creation_preview = None,
        }
        debug!("gesture cancelled");
        self.set_cursor("default", &mut actions);
        self.request_render(&mut actions);
        actions
    }

    fn restore_selection(&mut self, before: Selection, actions: &mut Vec<Action>) {
        if self.ui.selection != before {
            self.ui.selection = before;
            actions.push(Action::SelectionChanged);
        }
    }

    // =============================================================
    // Keyboard input
    // =============================================================

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is(" ") {
            self.ui.space_held = true;
            let mut actions = Vec::new();
            if !self.input.is_active() {
                self.set_cursor("grab", &mut actions);
            }
            return actions;
        }
        if key.is("Escape") {
            return self.escape();
        }
        if self.input.is_active() {
            return Vec::new();
        }

        if modifiers.command() {
            return match key.0.to_ascii_lowercase().as_str() {
                "z" if modifiers.shift => self.redo(),
                "z" => self.undo(),
                "y" => self.redo(),
                "d" => self.duplicate_selection(),
                "g" if modifiers.shift => self.ungroup_selection(),
                "g" => match self.group_selection() {
                    Ok((_, actions)) => actions,
                    Err(e) => {
                        debug!(error = %e, "group shortcut ignored");
                        Vec::new()
                    }
                },
                "s" => self.save_now(),
                "a" => self.select_all(),
                _ => Vec::new(),
            };
        }

        let step = if modifiers.shift { NUDGE_STEP * 10.0 } else { NUDGE_STEP };
        match key.0.as_str() {
            "Delete" | "Backspace" => self.delete_selection(),
            "ArrowLeft" => self.nudge(-step, 0.0),
            "ArrowRight" => self.nudge(step, 0.0),
            "ArrowUp" => self.nudge(0.0, -step),
            "ArrowDown" => self.nudge(0.0, step),
            "+" | "=" => self.zoom_about_center(ZOOM_STEP),
            "-" | "_" => self.zoom_about_center(1.0 / ZOOM_STEP),
            "0" => self.fit_all(),
            "Enter" => match self.ui.selection.single() {
                Some(SelectionTarget::Group(gid)) => self.enter_group_edit(&gid),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub fn on_key_up(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        if key.is(" ") {
            self.ui.space_held = false;
            if !self.input.is_active() {
                self.set_cursor("default", &mut actions);
            }
        }
        actions
    }

    fn escape(&mut self) -> Vec<Action> {
        if self.input.is_active() {
            return self.cancel_gesture();
        }
        if self.ui.editing_group.is_some() {
            return self.exit_group_edit();
        }
        if self.ui.selection.is_empty() {
            return Vec::new();
        }
        self.ui.selection.clear();
        let mut actions = vec![Action::SelectionChanged];
        self.request_render(&mut actions);
        actions
    }

    fn select_all(&mut self) -> Vec<Action> {
        let targets: Vec<SelectionTarget> = self
            .scene
            .sorted_cards()
            .into_iter()
            .filter(|c| self.ui.editing_group.is_none_or(|g| self.scene.group_of(&c.id) == Some(g)))
            .map(|c| selection::target_for_card(&self.scene, c.id, self.ui.editing_group))
            .collect();
        let mut next = Selection::new();
        next.set(targets);
        if next == self.ui.selection {
            return Vec::new();
        }
        self.ui.selection = next;
        let mut actions = vec![Action::SelectionChanged];
        self.request_render(&mut actions);
        actions
    }

    fn nudge(&mut self, dx: f64, dy: f64) -> Vec<Action> {
        let moves: Vec<(CardId, Point, Point)> = self
            .ui
            .selection
            .cards(&self.scene)
            .iter()
            .filter_map(|id| self.scene.card(id))
            .filter(|c| !c.locked)
            .map(|c| (c.id, c.origin(), Point::new(c.x + dx, c.y + dy)))
            .collect();
        if moves.is_empty() {
            return Vec::new();
        }
        let ids: Vec<CardId> = moves.iter().map(|(id, _, _)| *id).collect();
        let entry = HistoryEntry::Move { moves };
        entry.apply(&mut self.scene);
        let mut actions = self.geometry_changed(&ids);
        self.record(entry, &mut actions);
        actions
    }

    // =============================================================
    // Bookkeeping
    // =============================================================

    /// Commit an already-applied entry and report the mutation.
    fn record(&mut self, entry: HistoryEntry, actions: &mut Vec<Action>) {
        if entry.is_noop() {
            self.request_render(actions);
            return;
        }
        self.history.commit(entry);
        self.touch(actions);
    }

    /// Mark the board dirty and announce new history state.
    fn touch(&mut self, actions: &mut Vec<Action>) {
        self.autosave.mark_dirty(self.now);
        actions.push(self.history_changed());
        self.request_render(actions);
    }

    fn history_changed(&self) -> Action {
        Action::HistoryChanged { can_undo: self.history.can_undo(), can_redo: self.history.can_redo() }
    }

    fn request_render(&mut self, actions: &mut Vec<Action>) {
        if self.redraw.request() {
            actions.push(Action::RenderNeeded);
        }
    }

    /// Cards moved or resized: report them and every connection attached to them.
    fn geometry_changed(&mut self, ids: &[CardId]) -> Vec<Action> {
        let mut actions = vec![Action::CardsChanged(ids.to_vec())];
        let touching = self.scene.connections_touching(ids);
        if !touching.is_empty() {
            actions.push(Action::ConnectionsChanged(touching));
        }
        self.request_render(&mut actions);
        actions
    }

    /// Drop UI references to entities that no longer exist.
    fn prune_ui(&mut self, actions: &mut Vec<Action>) {
        if self.ui.selection.retain_live(&self.scene) {
            actions.push(Action::SelectionChanged);
        }
        if self.ui.editing_group.is_some_and(|g| self.scene.group(&g).is_none()) {
            self.ui.editing_group = None;
        }
    }

    fn set_cursor(&mut self, cursor: &str, actions: &mut Vec<Action>) {
        if self.cursor != cursor {
            cursor.clone_into(&mut self.cursor);
            actions.push(Action::SetCursor(cursor.to_owned()));
        }
    }

    fn update_hover_cursor(&mut self, world: Point, actions: &mut Vec<Action>) {
        let handle_card = match self.ui.selection.single() {
            Some(SelectionTarget::Card(id)) => Some(id),
            _ => None,
        };
        let cursor = if self.ui.tool == Tool::Pan || self.ui.space_held {
            "grab"
        } else if self.ui.tool.creates_card() {
            "crosshair"
        } else {
            match hit::hit_test(world, &self.scene, &self.camera, handle_card, self.ui.editing_group) {
                Some(Hit::ResizeHandle { anchor, .. }) => anchor.cursor(),
                Some(Hit::Card(id)) if self.scene.card(&id).is_some_and(|c| c.locked) => "default",
                Some(Hit::Card(_) | Hit::GroupFrame(_)) => "move",
                Some(Hit::Connection(_)) => "pointer",
                None => "default",
            }
        };
        self.set_cursor(cursor, actions);
    }
}

fn default_size(kind: CardKind) -> (f64, f64) {
    match kind {
        CardKind::Image => DEFAULT_IMAGE_SIZE,
        CardKind::Text => DEFAULT_TEXT_SIZE,
        CardKind::Shape => DEFAULT_SHAPE_SIZE,
    }
}

/// Natural size scaled down so the longer side is at most [`MAX_IMAGE_DIMENSION`].
fn image_card_size(width: f64, height: f64) -> (f64, f64) {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return DEFAULT_IMAGE_SIZE;
    }
    let scale = (MAX_IMAGE_DIMENSION / width.max(height)).min(1.0);
    (width * scale, height * scale)
}

fn apply_shape_style(shape: &mut ShapePayload, style: ShapeStyle) {
    if let Some(w) = style.stroke_width {
        shape.stroke_width = w;
    }
    if let Some(color) = style.stroke_color {
        shape.stroke_color = color;
    }
    if let Some(fill) = style.fill {
        shape.fill = fill;
    }
    if let Some(line_style) = style.line_style {
        shape.line_style = line_style;
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let measure = Box::new(CanvasMeasure::new(ctx.clone()));
        let core = EngineCore::with_config(EngineConfig::from_env(), measure);
        Ok(Self { canvas, ctx, core })
    }

    /// Resize the backing store to `width_css` x `height_css` at `dpr`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        let actions = self.core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width((self.core.viewport_width * self.core.dpr).round() as u32);
        self.canvas.set_height((self.core.viewport_height * self.core.dpr).round() as u32);
        actions
    }

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        let list = self.core.draw_list();
        paint::paint(&self.ctx, &list, self.core.dpr)
    }

    // --- Delegated input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn on_key_up(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_up(key, modifiers)
    }
}
