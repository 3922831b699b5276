//! Rendering: turns scene and UI state into a backend-neutral draw list.
//!
//! [`build`] receives read-only views of the scene, camera and UI state and
//! produces a [`DrawList`] of world-space [`DrawCommand`]s in paint order:
//! grid, connections, cards by z-order, then selection and gesture overlays.
//! Overlay sizes are pre-divided by the zoom so they stay constant on screen.
//! [`crate::paint`] executes a draw list on a browser canvas.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use crate::camera::{Camera, Point, Rect};
use crate::connect::{self, CubicBezier};
use crate::consts::{GRID_LEVEL_FACTOR, GRID_MIN_SCREEN_SPACING, GRID_SPACING, HANDLE_RADIUS_PX, TEXT_PADDING};
use crate::cull;
use crate::doc::{Card, CardId, CardPayload, LineStyle, Scene, ShapeType, TextureState};
use crate::hit::ResizeAnchor;
use crate::input::UiState;
use crate::selection::SelectionTarget;
use crate::snap::Axis;
use crate::text::{self, TextMeasure};

/// Arrowhead length in screen pixels.
const ARROW_SIZE_PX: f64 = 10.0;

/// Arrowhead half-angle in radians (~30°).
const ARROW_ANGLE: f64 = PI / 6.0;

/// Selection dash segment length in screen pixels.
const SELECTION_DASH_PX: f64 = 4.0;

/// Screen-space padding between a group's members and its frame.
const GROUP_FRAME_PAD_PX: f64 = 6.0;

/// Alpha of major grid lines; minor lines fade towards zero as they crowd together.
const GRID_MAJOR_ALPHA: f64 = 0.5;
const GRID_MINOR_ALPHA: f64 = 0.25;

/// One world-space grid line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: Point,
    pub to: Point,
    pub major: bool,
    pub alpha: f64,
}

/// A single paint operation, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Grid(GridLine),
    Image {
        id: CardId,
        rect: Rect,
        source: String,
        texture: TextureState,
    },
    Text {
        rect: Rect,
        lines: Vec<String>,
        font_size: f64,
        bold: bool,
        italic: bool,
    },
    Shape {
        rect: Rect,
        shape: ShapeType,
        stroke_width: f64,
        stroke_color: String,
        fill: bool,
        dashed: bool,
    },
    Connection {
        path: CubicBezier,
        color: String,
        width: f64,
        dashed: bool,
        /// Arrowhead triangle: tip first.
        arrow: Option<[Point; 3]>,
        selected: bool,
    },
    SelectionFrame {
        rect: Rect,
        line_width: f64,
        dash: f64,
    },
    Handle {
        center: Point,
        half_size: f64,
        line_width: f64,
    },
    GroupFrame {
        rect: Rect,
        label: String,
        editing: bool,
        line_width: f64,
        dash: f64,
    },
    Marquee {
        rect: Rect,
        line_width: f64,
        dash: f64,
    },
    CreationPreview {
        rect: Rect,
        line_width: f64,
        dash: f64,
    },
    SnapGuide {
        from: Point,
        to: Point,
        line_width: f64,
    },
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    pub camera: Camera,
    pub viewport_w: f64,
    pub viewport_h: f64,
    pub commands: Vec<DrawCommand>,
}

/// Build the draw list for one frame. Cards outside the padded viewport are skipped.
#[must_use]
pub fn build(
    scene: &Scene,
    camera: &Camera,
    ui: &UiState,
    viewport_w: f64,
    viewport_h: f64,
    cull_padding_px: f64,
    measure: &dyn TextMeasure,
) -> DrawList {
    let mut commands = Vec::new();
    let px = 1.0 / camera.zoom;

    // Layer 1: grid.
    commands.extend(grid_lines(camera, viewport_w, viewport_h).into_iter().map(DrawCommand::Grid));

    // Layer 2: connections beneath cards.
    let selected_connections = ui.selection.connections();
    let mut conns: Vec<_> = scene.connections().collect();
    conns.sort_by_key(|c| c.id);
    for conn in conns {
        let Some(path) = connect::connection_path(scene, conn) else {
            continue;
        };
        let arrow = conn.arrow.then(|| arrowhead(&path, ARROW_SIZE_PX * px));
        commands.push(DrawCommand::Connection {
            path,
            color: conn.style.color.clone(),
            width: conn.style.width,
            dashed: conn.style.dashed,
            arrow,
            selected: selected_connections.contains(&conn.id),
        });
    }

    // Layer 3: cards in z-order (bottom first).
    for card in scene.sorted_cards() {
        if cull::is_visible(&card.rect(), camera, viewport_w, viewport_h, cull_padding_px) {
            commands.push(card_command(card, measure));
        }
    }

    // Layer 4: group frames and selection UI.
    let dash = SELECTION_DASH_PX * px;
    for target in ui.selection.iter() {
        match target {
            SelectionTarget::Card(id) => {
                if let Some(card) = scene.card(id) {
                    commands.push(DrawCommand::SelectionFrame { rect: card.rect(), line_width: px, dash });
                }
            }
            SelectionTarget::Group(gid) => {
                if let (Some(group), Some(bounds)) = (scene.group(gid), scene.group_bounds(gid)) {
                    commands.push(DrawCommand::GroupFrame {
                        rect: bounds.expand(GROUP_FRAME_PAD_PX * px),
                        label: group.name.clone(),
                        editing: false,
                        line_width: px,
                        dash,
                    });
                }
            }
            SelectionTarget::Connection(_) => {}
        }
    }
    if let Some(gid) = ui.editing_group {
        if let (Some(group), Some(bounds)) = (scene.group(&gid), scene.group_bounds(&gid)) {
            commands.push(DrawCommand::GroupFrame {
                rect: bounds.expand(GROUP_FRAME_PAD_PX * px),
                label: group.name.clone(),
                editing: true,
                line_width: px,
                dash,
            });
        }
    }
    if let Some(SelectionTarget::Card(id)) = ui.selection.single() {
        if let Some(card) = scene.card(&id).filter(|c| !c.locked) {
            let rect = card.rect();
            for anchor in ResizeAnchor::ALL {
                commands.push(DrawCommand::Handle {
                    center: anchor.position(&rect),
                    half_size: HANDLE_RADIUS_PX * 0.5 * px,
                    line_width: px,
                });
            }
        }
    }

    // Layer 5: gesture overlays.
    if let Some(rect) = ui.marquee {
        commands.push(DrawCommand::Marquee { rect, line_width: px, dash });
    }
    if let Some(rect) = ui.creation_preview {
        commands.push(DrawCommand::CreationPreview { rect, line_width: px, dash });
    }
    for guide in &ui.snap_guides {
        let (from, to) = match guide.axis {
            Axis::Vertical => (Point::new(guide.position, guide.start), Point::new(guide.position, guide.end)),
            Axis::Horizontal => (Point::new(guide.start, guide.position), Point::new(guide.end, guide.position)),
        };
        commands.push(DrawCommand::SnapGuide { from, to, line_width: px });
    }

    DrawList { camera: *camera, viewport_w, viewport_h, commands }
}

fn card_command(card: &Card, measure: &dyn TextMeasure) -> DrawCommand {
    let rect = card.rect();
    match &card.payload {
        CardPayload::Image(img) => DrawCommand::Image {
            id: card.id,
            rect,
            source: img.source.clone(),
            texture: img.texture,
        },
        CardPayload::Text(t) => {
            let inner_w = (rect.width - TEXT_PADDING * 2.0).max(1.0);
            let mut lines = text::wrap_lines(&t.content, inner_w, t.font_size, measure);
            let max_lines = max_visible_lines(rect.height, t.font_size);
            lines.truncate(max_lines);
            DrawCommand::Text { rect, lines, font_size: t.font_size, bold: t.bold, italic: t.italic }
        }
        CardPayload::Shape(s) => DrawCommand::Shape {
            rect,
            shape: s.shape,
            stroke_width: s.stroke_width,
            stroke_color: s.stroke_color.clone(),
            fill: s.fill,
            dashed: s.line_style == LineStyle::Dashed,
        },
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_visible_lines(height: f64, font_size: f64) -> usize {
    let inner_h = (height - TEXT_PADDING * 2.0).max(0.0);
    ((inner_h / text::line_height(font_size)).floor() as usize).max(1)
}

/// Arrowhead triangle at the end of `path`, `size` world units long.
#[must_use]
pub fn arrowhead(path: &CubicBezier, size: f64) -> [Point; 3] {
    let tip = path.p3;
    let from = path.end_tangent_origin();
    let angle = (tip.y - from.y).atan2(tip.x - from.x);
    let left = Point::new(tip.x - size * (angle - ARROW_ANGLE).cos(), tip.y - size * (angle - ARROW_ANGLE).sin());
    let right = Point::new(tip.x - size * (angle + ARROW_ANGLE).cos(), tip.y - size * (angle + ARROW_ANGLE).sin());
    [tip, left, right]
}

/// Grid spacing in world units for `zoom`: the base spacing scaled up by
/// [`GRID_LEVEL_FACTOR`] until lines are at least [`GRID_MIN_SCREEN_SPACING`] apart.
#[must_use]
pub fn grid_spacing(zoom: f64) -> f64 {
    let mut spacing = GRID_SPACING;
    while spacing * zoom < GRID_MIN_SCREEN_SPACING {
        spacing *= GRID_LEVEL_FACTOR;
    }
    spacing
}

/// World-space grid lines covering the viewport.
///
/// Every [`GRID_LEVEL_FACTOR`]-th line is major. Minor lines fade out as their
/// on-screen spacing approaches the minimum, so the coarser level takes over
/// smoothly while zooming out.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn grid_lines(camera: &Camera, viewport_w: f64, viewport_h: f64) -> Vec<GridLine> {
    let view = camera.visible_world_rect(viewport_w, viewport_h);
    if view.width <= 0.0 || view.height <= 0.0 {
        return Vec::new();
    }
    let spacing = grid_spacing(camera.zoom);
    let screen_spacing = spacing * camera.zoom;
    let fade_span = GRID_MIN_SCREEN_SPACING * (GRID_LEVEL_FACTOR - 1.0);
    let fade = ((screen_spacing - GRID_MIN_SCREEN_SPACING) / fade_span).clamp(0.0, 1.0);
    let minor_alpha = GRID_MINOR_ALPHA * fade;

    let mut lines = Vec::new();
    let factor = GRID_LEVEL_FACTOR as i64;
    let first_x = (view.x / spacing).floor() as i64;
    let last_x = (view.right() / spacing).ceil() as i64;
    for i in first_x..=last_x {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64 * spacing;
        let major = i.rem_euclid(factor) == 0;
        lines.push(GridLine {
            from: Point::new(x, view.y),
            to: Point::new(x, view.bottom()),
            major,
            alpha: if major { GRID_MAJOR_ALPHA } else { minor_alpha },
        });
    }
    let first_y = (view.y / spacing).floor() as i64;
    let last_y = (view.bottom() / spacing).ceil() as i64;
    for i in first_y..=last_y {
        #[allow(clippy::cast_precision_loss)]
        let y = i as f64 * spacing;
        let major = i.rem_euclid(factor) == 0;
        lines.push(GridLine {
            from: Point::new(view.x, y),
            to: Point::new(view.right(), y),
            major,
            alpha: if major { GRID_MAJOR_ALPHA } else { minor_alpha },
        });
    }
    lines
}

/// Coalesces redraw requests into at most one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedrawScheduler {
    pending: bool,
}

impl RedrawScheduler {
    /// Ask for a redraw. Returns `true` only for the first request since the last frame,
    /// i.e. when the caller should schedule an animation frame.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consume the pending request when the frame runs.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
