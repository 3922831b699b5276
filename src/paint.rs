//! Painting: executes a [`DrawList`] on a 2D canvas context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{Point, Rect};
use crate::consts::{LINE_HEIGHT_RATIO, TEXT_PADDING};
use crate::doc::{ShapeType, TextureState};
use crate::render::{DrawCommand, DrawList, GridLine};
use crate::text::{ApproxMeasure, TextMeasure};

const BACKGROUND: &str = "#1e1e1e";
const GRID_COLOR: &str = "#ffffff";
const SELECTION_COLOR: &str = "#1E90FF";
const GUIDE_COLOR: &str = "#ff4fa3";
const TEXT_COLOR: &str = "#e8e8e8";
const IMAGE_PENDING_FILL: &str = "#2c2c2c";
const IMAGE_FAILED_STROKE: &str = "#c0392b";

/// Paint the whole frame.
///
/// `dpr` is the device pixel ratio; the draw list's viewport is in CSS pixels.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn paint(ctx: &CanvasRenderingContext2d, list: &DrawList, dpr: f64) -> Result<(), JsValue> {
    let cam = list.camera;

    // Layer 1: clear and set up transforms.
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, list.viewport_w, list.viewport_h);
    ctx.translate(cam.pan_x, cam.pan_y)?;
    ctx.scale(cam.zoom, cam.zoom)?;

    let px = 1.0 / cam.zoom;
    for cmd in &list.commands {
        match cmd {
            DrawCommand::Grid(line) => paint_grid_line(ctx, line, px),
            DrawCommand::Image { rect, source, texture, .. } => paint_image(ctx, rect, source, *texture, px)?,
            DrawCommand::Text { rect, lines, font_size, bold, italic } => {
                paint_text(ctx, rect, lines, *font_size, *bold, *italic)?;
            }
            DrawCommand::Shape { rect, shape, stroke_width, stroke_color, fill, dashed } => {
                ctx.save();
                ctx.set_stroke_style_str(stroke_color);
                ctx.set_fill_style_str(stroke_color);
                ctx.set_line_width(*stroke_width);
                if *dashed {
                    set_dash(ctx, stroke_width * 3.0)?;
                }
                paint_shape(ctx, rect, *shape, *fill)?;
                ctx.restore();
            }
            DrawCommand::Connection { path, color, width, dashed, arrow, selected } => {
                ctx.save();
                let stroke = if *selected { SELECTION_COLOR } else { color.as_str() };
                ctx.set_stroke_style_str(stroke);
                ctx.set_fill_style_str(stroke);
                ctx.set_line_width(if *selected { width + 2.0 * px } else { *width });
                if *dashed {
                    set_dash(ctx, width * 3.0)?;
                }
                ctx.begin_path();
                ctx.move_to(path.p0.x, path.p0.y);
                ctx.bezier_curve_to(path.c1.x, path.c1.y, path.c2.x, path.c2.y, path.p3.x, path.p3.y);
                ctx.stroke();
                if let Some(tri) = arrow {
                    fill_triangle(ctx, tri);
                }
                ctx.restore();
            }
            DrawCommand::SelectionFrame { rect, line_width, dash } => {
                stroke_dashed_rect(ctx, rect, SELECTION_COLOR, *line_width, *dash)?;
            }
            DrawCommand::Handle { center, half_size, line_width } => {
                ctx.save();
                ctx.set_fill_style_str("#fff");
                ctx.set_stroke_style_str(SELECTION_COLOR);
                ctx.set_line_width(*line_width);
                let size = half_size * 2.0;
                ctx.fill_rect(center.x - half_size, center.y - half_size, size, size);
                ctx.stroke_rect(center.x - half_size, center.y - half_size, size, size);
                ctx.restore();
            }
            DrawCommand::GroupFrame { rect, label, editing, line_width, dash } => {
                let d = if *editing { dash * 2.0 } else { *dash };
                stroke_dashed_rect(ctx, rect, SELECTION_COLOR, *line_width, d)?;
                if !label.is_empty() {
                    ctx.save();
                    ctx.set_fill_style_str(SELECTION_COLOR);
                    ctx.set_text_align("left");
                    ctx.set_text_baseline("bottom");
                    ctx.set_font(&format!("{}px sans-serif", 12.0 * px));
                    ctx.fill_text(label, rect.x, rect.y - 2.0 * px)?;
                    ctx.restore();
                }
            }
            DrawCommand::Marquee { rect, line_width, dash } => {
                ctx.save();
                ctx.set_fill_style_str("rgba(30, 144, 255, 0.12)");
                ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
                ctx.restore();
                stroke_dashed_rect(ctx, rect, SELECTION_COLOR, *line_width, *dash)?;
            }
            DrawCommand::CreationPreview { rect, line_width, dash } => {
                stroke_dashed_rect(ctx, rect, TEXT_COLOR, *line_width, *dash)?;
            }
            DrawCommand::SnapGuide { from, to, line_width } => {
                ctx.save();
                ctx.set_stroke_style_str(GUIDE_COLOR);
                ctx.set_line_width(*line_width);
                ctx.begin_path();
                ctx.move_to(from.x, from.y);
                ctx.line_to(to.x, to.y);
                ctx.stroke();
                ctx.restore();
            }
        }
    }
    Ok(())
}

// =============================================================
// Cards
// =============================================================

fn paint_image(
    ctx: &CanvasRenderingContext2d,
    rect: &Rect,
    source: &str,
    texture: TextureState,
    px: f64,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str(IMAGE_PENDING_FILL);
    ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
    ctx.set_line_width(px);
    match texture {
        TextureState::Placeholder => {
            ctx.set_stroke_style_str(IMAGE_FAILED_STROKE);
            ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
            ctx.begin_path();
            ctx.move_to(rect.x, rect.y);
            ctx.line_to(rect.right(), rect.bottom());
            ctx.move_to(rect.right(), rect.y);
            ctx.line_to(rect.x, rect.bottom());
            ctx.stroke();
        }
        TextureState::Unloaded | TextureState::Loading { .. } | TextureState::Loaded => {
            ctx.set_stroke_style_str("#444");
            ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
        }
    }
    // Pixels for loaded textures are composited by the host; the label marks the slot.
    let name = source.rsplit(['/', '\\']).next().unwrap_or(source);
    ctx.set_fill_style_str(TEXT_COLOR);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_font(&format!("{}px sans-serif", 11.0 * px));
    let c = rect.center();
    ctx.fill_text(name, c.x, c.y)?;
    ctx.restore();
    Ok(())
}

fn paint_text(
    ctx: &CanvasRenderingContext2d,
    rect: &Rect,
    lines: &[String],
    font_size: f64,
    bold: bool,
    italic: bool,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str(TEXT_COLOR);
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    ctx.set_font(&font_string(font_size, bold, italic));
    let line_height = font_size * LINE_HEIGHT_RATIO;
    let mut y = rect.y + TEXT_PADDING;
    for line in lines {
        ctx.fill_text(line, rect.x + TEXT_PADDING, y)?;
        y += line_height;
    }
    ctx.restore();
    Ok(())
}

fn paint_shape(ctx: &CanvasRenderingContext2d, rect: &Rect, shape: ShapeType, fill: bool) -> Result<(), JsValue> {
    match shape {
        ShapeType::Rectangle => {
            if fill {
                ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
            }
            ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
        }
        ShapeType::Ellipse => {
            let c = rect.center();
            ctx.begin_path();
            ctx.ellipse(c.x, c.y, rect.width / 2.0, rect.height / 2.0, 0.0, 0.0, 2.0 * PI)?;
            if fill {
                ctx.fill();
            }
            ctx.stroke();
        }
        ShapeType::Line => {
            ctx.begin_path();
            ctx.move_to(rect.x, rect.y);
            ctx.line_to(rect.right(), rect.bottom());
            ctx.stroke();
        }
    }
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

fn paint_grid_line(ctx: &CanvasRenderingContext2d, line: &GridLine, px: f64) {
    if line.alpha <= 0.0 {
        return;
    }
    ctx.save();
    ctx.set_global_alpha(line.alpha * 0.2);
    ctx.set_stroke_style_str(GRID_COLOR);
    ctx.set_line_width(px);
    ctx.begin_path();
    ctx.move_to(line.from.x, line.from.y);
    ctx.line_to(line.to.x, line.to.y);
    ctx.stroke();
    ctx.restore();
}

fn fill_triangle(ctx: &CanvasRenderingContext2d, tri: &[Point; 3]) {
    ctx.begin_path();
    ctx.move_to(tri[0].x, tri[0].y);
    ctx.line_to(tri[1].x, tri[1].y);
    ctx.line_to(tri[2].x, tri[2].y);
    ctx.close_path();
    ctx.fill();
}

fn stroke_dashed_rect(
    ctx: &CanvasRenderingContext2d,
    rect: &Rect,
    color: &str,
    line_width: f64,
    dash: f64,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(line_width);
    set_dash(ctx, dash)?;
    ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    ctx.restore();
    Ok(())
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: f64) -> Result<(), JsValue> {
    let dash_array = js_sys::Array::new();
    dash_array.push(&dash.into());
    dash_array.push(&dash.into());
    ctx.set_line_dash(&dash_array)
}

fn font_string(font_size: f64, bold: bool, italic: bool) -> String {
    let style = if italic { "italic " } else { "" };
    let weight = if bold { "bold " } else { "" };
    format!("{style}{weight}{font_size}px sans-serif")
}

/// Text measurement backed by the canvas context, falling back to the fixed-advance
/// approximation if the browser refuses to measure.
pub struct CanvasMeasure {
    ctx: CanvasRenderingContext2d,
}

impl CanvasMeasure {
    #[must_use]
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for CanvasMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        self.ctx.set_font(&font_string(font_size, false, false));
        match self.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(_) => ApproxMeasure::default().text_width(text, font_size),
        }
    }
}
