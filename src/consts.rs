//! Shared numeric constants for the scene engine.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Multiplicative zoom step for keyboard zoom and one wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

/// Wheel delta (pixels) that corresponds to one [`ZOOM_STEP`].
pub const WHEEL_PIXELS_PER_STEP: f64 = 100.0;

/// Screen-space margin around the scene when fitting everything into view.
pub const FIT_MARGIN_PX: f64 = 48.0;

// ── Grid ────────────────────────────────────────────────────────

/// Base grid spacing in world units at zoom 1.0.
pub const GRID_SPACING: f64 = 20.0;

/// How many minor cells make up one major cell.
pub const GRID_LEVEL_FACTOR: f64 = 5.0;

/// Minor lines closer than this on screen are replaced by the next coarser level.
pub const GRID_MIN_SCREEN_SPACING: f64 = 8.0;

// ── Cards ───────────────────────────────────────────────────────

/// Minimum width and height of any card, in world units.
pub const MIN_CARD_SIZE: f64 = 20.0;

/// Longest side of a freshly imported image card.
pub const MAX_IMAGE_DIMENSION: f64 = 800.0;

/// Default image card size when natural dimensions are unknown.
pub const DEFAULT_IMAGE_SIZE: (f64, f64) = (320.0, 240.0);

/// Default text card size.
pub const DEFAULT_TEXT_SIZE: (f64, f64) = (200.0, 40.0);

/// Default shape card size.
pub const DEFAULT_SHAPE_SIZE: (f64, f64) = (120.0, 80.0);

/// Default text font size in world units.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Font size bounds.
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 200.0;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f64 = 1.25;

/// Horizontal and vertical padding inside a text card.
pub const TEXT_PADDING: f64 = 6.0;

/// Stroke width bounds for shapes.
pub const MIN_STROKE_WIDTH: f64 = 0.0;
pub const MAX_STROKE_WIDTH: f64 = 50.0;

/// Offset applied to duplicated cards.
pub const DUPLICATE_OFFSET: f64 = 20.0;

/// Arrow-key nudge distance in world units (multiplied by 10 with shift).
pub const NUDGE_STEP: f64 = 1.0;

// ── Interaction ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Pointer travel in screen pixels before a press on a card becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;

/// Screen-space distance at which a dragged edge snaps to a guide.
pub const SNAP_THRESHOLD_PX: f64 = 8.0;

/// Screen-space distance at which a point counts as "on" a connection.
pub const CONNECTION_HIT_PX: f64 = 6.0;

// ── Connections ─────────────────────────────────────────────────

/// Perpendicular control-point offset per unit curvature, as a fraction of chord length.
pub const CURVE_OFFSET_FACTOR: f64 = 0.5;

/// Number of segments used to flatten a bezier for hit-testing.
pub const BEZIER_SAMPLES: usize = 24;

// ── Resources ───────────────────────────────────────────────────

/// Screen-space padding around the viewport before an image is unloaded.
pub const CULL_PADDING_PX: f64 = 200.0;

// ── Minimap ─────────────────────────────────────────────────────

/// Inner padding of the minimap panel in pixels.
pub const MINIMAP_PADDING_PX: f64 = 6.0;

// ── History / persistence ───────────────────────────────────────

/// Maximum number of undoable entries.
pub const HISTORY_MAX_DEPTH: usize = 50;

/// Quiet period after the last mutation before an autosave fires.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 500;

/// Bounded capacity of the save worker queue.
pub const SAVE_QUEUE_CAPACITY: usize = 4;

/// Board document format version written by this crate.
pub const BOARD_FORMAT_VERSION: u32 = 1;
