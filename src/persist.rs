//! Persistence bridge: the board document, debounced autosave and the save worker.
//!
//! DESIGN
//! ======
//! The engine never performs I/O. It serializes the scene into a
//! [`BoardDocument`], and the host hands the JSON to a background
//! [`SaveWorker`] that drains a bounded queue one job at a time. Each job
//! carries a [`SaveTicket`] stamped with the scene revision it captured, so
//! a result that arrives after further edits cannot mark the board clean.
//!
//! ERROR HANDLING
//! ==============
//! Restoring never fails on content: dangling references are pruned and
//! counted in a [`RestoreReport`]. A document that does not parse at all
//! falls back to an empty board. Failed writes keep the dirty flag set so
//! the next poll retries them.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::HashSet;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
#[cfg(not(target_arch = "wasm32"))]
use tokio::sync::mpsc;
#[cfg(not(target_arch = "wasm32"))]
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
#[cfg(not(target_arch = "wasm32"))]
use tracing::error;

use crate::camera::Camera;
use crate::consts::BOARD_FORMAT_VERSION;
use crate::doc::{Card, CardId, Connection, Group, Scene};

// =============================================================
// Errors
// =============================================================

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("board json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("board storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("save worker is not running")]
    WorkerClosed,
    #[error("save queue is full")]
    QueueFull,
}

// =============================================================
// Document
// =============================================================

fn default_version() -> u32 {
    BOARD_FORMAT_VERSION
}

fn default_scale() -> f64 {
    1.0
}

/// Camera state as stored in the board document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, scale: default_scale() }
    }
}

/// The whole board as written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Entries dropped by [`parse_board`] because they did not decode.
    #[serde(skip)]
    pub undecodable: usize,
}

/// Wire shape read before entities are decoded one by one.
#[derive(Debug, Deserialize)]
struct RawBoard {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    cards: Vec<serde_json::Value>,
    #[serde(default)]
    groups: Vec<serde_json::Value>,
    #[serde(default)]
    connections: Vec<serde_json::Value>,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self {
            version: BOARD_FORMAT_VERSION,
            viewport: Viewport::default(),
            cards: Vec::new(),
            groups: Vec::new(),
            connections: Vec::new(),
            undecodable: 0,
        }
    }
}

/// Snapshot the scene and camera. Entities are sorted so equal boards produce equal JSON.
#[must_use]
pub fn serialize_board(scene: &Scene, camera: &Camera) -> BoardDocument {
    let cards: Vec<Card> = scene.sorted_cards().into_iter().cloned().collect();
    let mut groups: Vec<Group> = scene.groups().cloned().collect();
    groups.sort_by_key(|g| g.id);
    let mut connections: Vec<Connection> = scene.connections().cloned().collect();
    connections.sort_by_key(|c| c.id);
    BoardDocument {
        version: BOARD_FORMAT_VERSION,
        viewport: Viewport { x: camera.pan_x, y: camera.pan_y, scale: camera.zoom },
        cards,
        groups,
        connections,
        undecodable: 0,
    }
}

/// # Errors
///
/// Returns `PersistError::Json` if serialization fails.
pub fn to_json(doc: &BoardDocument) -> Result<String, PersistError> {
    Ok(serde_json::to_string(doc)?)
}

/// Parse a stored board.
///
/// Cards, groups and connections decode independently: an entry that does
/// not decode is dropped and counted, the rest of the board survives. Only
/// a document that is not a board object at all becomes an empty board.
#[must_use]
pub fn parse_board(json: &str) -> BoardDocument {
    let raw = match serde_json::from_str::<RawBoard>(json) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, bytes = json.len(), "board document unreadable; starting empty");
            return BoardDocument::default();
        }
    };
    if raw.version > BOARD_FORMAT_VERSION {
        warn!(version = raw.version, supported = BOARD_FORMAT_VERSION, "board written by a newer version");
    }
    let mut undecodable = 0;
    let cards = decode_entries(raw.cards, "card", &mut undecodable);
    let groups = decode_entries(raw.groups, "group", &mut undecodable);
    let connections = decode_entries(raw.connections, "connection", &mut undecodable);
    BoardDocument { version: raw.version, viewport: raw.viewport, cards, groups, connections, undecodable }
}

fn decode_entries<T>(values: Vec<serde_json::Value>, entity: &'static str, undecodable: &mut usize) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut decoded = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => decoded.push(entry),
            Err(e) => {
                warn!(error = %e, entity, index, "board entry undecodable; dropped");
                *undecodable += 1;
            }
        }
    }
    decoded
}

/// What [`restore_board`] kept and what it had to drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub cards: usize,
    pub groups: usize,
    pub connections: usize,
    /// Cards whose id repeated an earlier card.
    pub duplicate_cards: usize,
    /// Group member ids that named a missing card or one already grouped.
    pub pruned_members: usize,
    /// Groups dropped because no valid member remained or their id repeated.
    pub dropped_groups: usize,
    /// Connections with a missing or repeated endpoint or id.
    pub dropped_connections: usize,
    /// Entries of any kind that did not decode.
    pub undecodable: usize,
}

impl RestoreReport {
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.duplicate_cards + self.pruned_members + self.dropped_groups + self.dropped_connections + self.undecodable
    }
}

/// Build a fresh scene and camera from a document, pruning whatever does not hold together.
#[must_use]
pub fn restore_board(doc: BoardDocument) -> (Scene, Camera, RestoreReport) {
    let mut scene = Scene::new();
    let mut report = RestoreReport { undecodable: doc.undecodable, ..RestoreReport::default() };

    for card in doc.cards {
        if scene.contains_card(&card.id) {
            report.duplicate_cards += 1;
            continue;
        }
        scene.insert_card(card);
        report.cards += 1;
    }

    for mut group in doc.groups {
        if scene.group(&group.id).is_some() {
            report.dropped_groups += 1;
            continue;
        }
        let before = group.members.len();
        let mut seen: HashSet<CardId> = HashSet::new();
        group
            .members
            .retain(|m| scene.contains_card(m) && scene.group_of(m).is_none() && seen.insert(*m));
        report.pruned_members += before - group.members.len();
        if group.members.is_empty() {
            report.dropped_groups += 1;
            continue;
        }
        match scene.insert_group(group) {
            Ok(_) => report.groups += 1,
            Err(e) => {
                debug!(error = %e, "group dropped on restore");
                report.dropped_groups += 1;
            }
        }
    }

    for conn in doc.connections {
        if scene.connection(&conn.id).is_some() {
            report.dropped_connections += 1;
            continue;
        }
        match scene.insert_connection(conn) {
            Ok(_) => report.connections += 1,
            Err(e) => {
                debug!(error = %e, "connection dropped on restore");
                report.dropped_connections += 1;
            }
        }
    }

    let vp = doc.viewport;
    let camera = Camera::new(finite_or_zero(vp.x), finite_or_zero(vp.y), vp.scale);

    info!(
        cards = report.cards,
        groups = report.groups,
        connections = report.connections,
        pruned = report.pruned(),
        "board restored"
    );
    (scene, camera, report)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

// =============================================================
// Autosave
// =============================================================

/// Ties a save result to the scene revision it captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    pub revision: u64,
}

/// Dirty tracking with a quiet-period debounce.
///
/// Timestamps are monotonic durations from any host clock; only differences matter.
#[derive(Debug, Clone)]
pub struct Autosave {
    debounce: Duration,
    revision: u64,
    dirty: bool,
    last_change: Duration,
    in_flight: Option<u64>,
    forced: bool,
    /// No automatic retry before this instant after a failed write.
    retry_after: Duration,
}

impl Autosave {
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, revision: 0, dirty: false, last_change: Duration::ZERO, in_flight: None, forced: false, retry_after: Duration::ZERO }
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record a mutation at `now`.
    pub fn mark_dirty(&mut self, now: Duration) {
        self.revision += 1;
        self.dirty = true;
        self.last_change = now;
    }

    /// A ticket when the board is dirty, idle, and quiet for the debounce period.
    pub fn poll(&mut self, now: Duration) -> Option<SaveTicket> {
        if !self.dirty || self.in_flight.is_some() {
            return None;
        }
        if !self.forced && (now.saturating_sub(self.last_change) < self.debounce || now < self.retry_after) {
            return None;
        }
        Some(self.issue())
    }

    /// Save immediately. While a save is in flight the request is remembered and
    /// the next poll after it finishes issues the ticket.
    pub fn save_now(&mut self) -> Option<SaveTicket> {
        if self.in_flight.is_some() {
            self.forced = true;
            self.dirty = true;
            return None;
        }
        Some(self.issue())
    }

    fn issue(&mut self) -> SaveTicket {
        self.forced = false;
        self.in_flight = Some(self.revision);
        SaveTicket { revision: self.revision }
    }

    /// Apply a save result that arrived at `now`. Returns `true` when the board is now clean.
    ///
    /// A failure re-arms the debounce so a broken storage is retried once per period.
    pub fn finish(&mut self, ticket: SaveTicket, result: &Result<(), PersistError>, now: Duration) -> bool {
        if self.in_flight == Some(ticket.revision) {
            self.in_flight = None;
        }
        match result {
            Ok(()) if ticket.revision == self.revision && !self.forced => {
                self.dirty = false;
                debug!(revision = ticket.revision, "board saved");
            }
            Ok(()) => {
                debug!(revision = ticket.revision, current = self.revision, "board saved; newer edits pending");
            }
            Err(e) => {
                self.retry_after = now + self.debounce;
                warn!(error = %e, revision = ticket.revision, "board save failed; will retry");
            }
        }
        !self.dirty
    }
}

// =============================================================
// Storage
// =============================================================

/// Where board documents live.
#[async_trait]
pub trait BoardStorage: Send + Sync + 'static {
    /// Replace the stored document with `json`.
    async fn save(&self, json: &str) -> Result<(), PersistError>;
    /// The stored document, or `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<String>, PersistError>;
}

#[cfg(not(target_arch = "wasm32"))]
/// A single JSON file, replaced atomically through a sibling `.tmp` file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl BoardStorage for FileStorage {
    async fn save(&self, json: &str) -> Result<(), PersistError> {
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<String>, PersistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load and restore a board. A missing document yields an empty board.
///
/// # Errors
///
/// Propagates storage read failures; content problems never fail.
pub async fn load_board(storage: &dyn BoardStorage) -> Result<(Scene, Camera, RestoreReport), PersistError> {
    let doc = match storage.load().await? {
        Some(json) => parse_board(&json),
        None => BoardDocument::default(),
    };
    Ok(restore_board(doc))
}

// =============================================================
// Save worker
// =============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveJob {
    pub ticket: SaveTicket,
    pub json: String,
}

#[derive(Debug)]
pub struct SaveOutcome {
    pub ticket: SaveTicket,
    pub result: Result<(), PersistError>,
}

#[cfg(not(target_arch = "wasm32"))]
/// Handle to the background writer spawned by [`spawn_save_worker`].
pub struct SaveWorker {
    jobs: mpsc::Sender<SaveJob>,
    outcomes: mpsc::Receiver<SaveOutcome>,
    handle: JoinHandle<()>,
}

#[cfg(not(target_arch = "wasm32"))]
/// Spawn a writer that saves queued jobs one at a time, in order.
///
/// Must be called inside a tokio runtime.
#[must_use]
pub fn spawn_save_worker<S: BoardStorage>(storage: S, capacity: usize) -> SaveWorker {
    let capacity = capacity.max(1);
    let (job_tx, mut job_rx) = mpsc::channel::<SaveJob>(capacity);
    let (out_tx, out_rx) = mpsc::channel::<SaveOutcome>(capacity);
    info!(queue_capacity = capacity, "save worker started");

    let handle = tokio::spawn(async move {
        while let Some(job) = job_rx.recv().await {
            let result = storage.save(&job.json).await;
            match &result {
                Ok(()) => debug!(revision = job.ticket.revision, bytes = job.json.len(), "save job written"),
                Err(e) => error!(error = %e, revision = job.ticket.revision, "save job failed"),
            }
            if out_tx.send(SaveOutcome { ticket: job.ticket, result }).await.is_err() {
                debug!("save outcome receiver dropped; stopping worker");
                break;
            }
        }
    });

    SaveWorker { jobs: job_tx, outcomes: out_rx, handle }
}

#[cfg(not(target_arch = "wasm32"))]
impl SaveWorker {
    /// Queue a job without waiting.
    ///
    /// # Errors
    ///
    /// `QueueFull` when the bounded queue has no room, `WorkerClosed` when the task has stopped.
    pub fn submit(&self, job: SaveJob) -> Result<(), PersistError> {
        match self.jobs.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(revision = job.ticket.revision, "save queue full");
                Err(PersistError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PersistError::WorkerClosed),
        }
    }

    /// Wait for the next finished job. `None` once the worker has stopped and drained.
    pub async fn next_outcome(&mut self) -> Option<SaveOutcome> {
        self.outcomes.recv().await
    }

    /// A finished job if one is ready.
    pub fn try_outcome(&mut self) -> Option<SaveOutcome> {
        match self.outcomes.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => None,
        }
    }

    /// Stop accepting jobs, let queued ones finish, and wait for the task.
    pub async fn shutdown(self) -> Vec<SaveOutcome> {
        let Self { jobs, mut outcomes, handle } = self;
        drop(jobs);
        let mut finished = Vec::new();
        while let Some(outcome) = outcomes.recv().await {
            finished.push(outcome);
        }
        if let Err(e) = handle.await {
            error!(error = %e, "save worker task failed");
        }
        finished
    }
}
