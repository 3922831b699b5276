//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Tool` and
//! `Modifiers` capture the user's intent at the time of a pointer event.
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up, carrying all context needed to compute incremental deltas,
//! commit one history entry on release, or restore the pre-gesture geometry
//! when the gesture is cancelled.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::{Point, Rect};
use crate::doc::{CardId, GroupId, ShapeType};
use crate::hit::ResizeAnchor;
use crate::selection::{Selection, SelectionTarget};
use crate::snap::{SnapGuide, SnapTargets};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Draw a rectangle shape card.
    Rect,
    /// Draw an ellipse shape card.
    Ellipse,
    /// Draw a line shape card.
    Line,
    /// Create a text card.
    Text,
    /// Drag to pan the view.
    Pan,
}

impl Tool {
    /// Whether pressing on empty canvas with this tool creates a card.
    #[must_use]
    pub fn creates_card(self) -> bool {
        matches!(self, Self::Rect | Self::Ellipse | Self::Line | Self::Text)
    }

    /// The shape drawn by this tool, if it is a shape tool.
    #[must_use]
    pub fn shape_type(self) -> Option<ShapeType> {
        match self {
            Self::Rect => Some(ShapeType::Rectangle),
            Self::Ellipse => Some(ShapeType::Ellipse),
            Self::Line => Some(ShapeType::Line),
            Self::Select | Self::Text | Self::Pan => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on Linux/Windows, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifier that toggles selection membership instead of replacing it.
    #[must_use]
    pub fn toggle(self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Case-insensitive match for single-character keys, exact match otherwise.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        if self.0.chars().count() == 1 { self.0.eq_ignore_ascii_case(name) } else { self.0 == name }
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Selected cards, groups and connections.
    pub selection: Selection,
    /// Group whose members are individually editable, if any.
    pub editing_group: Option<GroupId>,
    /// World-space marquee rectangle while box-selecting.
    pub marquee: Option<Rect>,
    /// World-space preview rectangle while drawing a new card.
    pub creation_preview: Option<Rect>,
    /// Alignment guides for the current drag.
    pub snap_guides: Vec<SnapGuide>,
    /// Space bar is held; primary drags pan.
    pub space_held: bool,
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// emit final actions on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is panning the canvas.
    Panning {
        /// Screen-space position of the previous pointer event, used to compute pan delta.
        last_screen: Point,
    },
    /// Pressed on a card or group frame; not yet past the drag threshold.
    PendingDrag {
        /// What a click would select.
        target: SelectionTarget,
        /// Screen-space press position, for the drag threshold.
        start_screen: Point,
        /// World-space press position.
        start_world: Point,
        /// Toggle modifier was held at press time.
        toggle: bool,
        /// Selection before the press, restored on cancel.
        before: Selection,
    },
    /// The user is moving the selected cards.
    Dragging {
        /// World-space press position; deltas are measured from here.
        start_world: Point,
        /// Every moving card with its geometry at drag start.
        origins: Vec<(CardId, Rect)>,
        /// Bounding box of the moving cards at drag start.
        start_bounds: Rect,
        /// Alignment lines from the cards that are not moving.
        targets: SnapTargets,
        /// Selection before the press, restored on cancel.
        before: Selection,
    },
    /// The user is resizing one card by dragging one of its eight handles.
    Resizing {
        /// Id of the card being resized.
        card: CardId,
        /// Which corner/edge handle is being dragged.
        anchor: ResizeAnchor,
        /// World-space pointer position at the start of the resize.
        start_world: Point,
        /// Card geometry at the start of the resize.
        orig: Rect,
    },
    /// The user is box-selecting.
    Marquee {
        /// World-space corner where the drag started.
        start_world: Point,
        /// Selection to extend, when the toggle modifier was held.
        base: Option<Selection>,
        /// Selection before the press, restored on cancel.
        before: Selection,
    },
    /// The user is drawing a new card with a creation tool.
    Creating {
        tool: Tool,
        /// The world-space corner where the drag started.
        start_world: Point,
        /// Screen-space press position, to tell a click from a drag.
        start_screen: Point,
    },
}

impl InputState {
    /// Whether a gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}
