//! Alignment snapping for dragged cards.
//!
//! While a selection is dragged, its bounding box's left/center/right and
//! top/middle/bottom lines are compared to the same lines of every other card.
//! The closest candidate within the threshold wins on each axis independently.

#[cfg(test)]
#[path = "snap_test.rs"]
mod snap_test;

use crate::camera::Rect;
use crate::doc::{CardId, Scene};

/// Axis a guide line runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// A vertical line at a fixed x.
    Vertical,
    /// A horizontal line at a fixed y.
    Horizontal,
}

/// A transient alignment line shown while snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapGuide {
    pub axis: Axis,
    /// World x for vertical guides, world y for horizontal guides.
    pub position: f64,
    /// Extent of the guide along its own axis.
    pub start: f64,
    pub end: f64,
}

/// Result of snapping a moving box.
///
/// Snapped coordinates are computed from the guide line itself, so an edge
/// that snaps lands on the line exactly rather than within rounding of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    /// Snapped left x of the moving box, if the x axis snapped.
    pub x: Option<f64>,
    /// Snapped top y of the moving box, if the y axis snapped.
    pub y: Option<f64>,
    pub guides: Vec<SnapGuide>,
}

impl SnapResult {
    /// Where the box's origin ends up: snapped axes replaced, others kept.
    #[must_use]
    pub fn origin(&self, proposed: &Rect) -> (f64, f64) {
        (self.x.unwrap_or(proposed.x), self.y.unwrap_or(proposed.y))
    }
}

/// Candidate alignment lines gathered once per drag from every non-moving card.
#[derive(Debug, Clone, Default)]
pub struct SnapTargets {
    rects: Vec<Rect>,
}

impl SnapTargets {
    /// Collect every card not in `moving`.
    #[must_use]
    pub fn collect(scene: &Scene, moving: &[CardId]) -> Self {
        let rects = scene
            .cards()
            .filter(|c| !moving.contains(&c.id))
            .map(|c| c.rect())
            .collect();
        Self { rects }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Snap `moving` to the nearest lines within `threshold` world units.
    #[must_use]
    pub fn snap(&self, moving: &Rect, threshold: f64) -> SnapResult {
        let mut result = SnapResult::default();
        let xs = [moving.x, moving.center().x, moving.right()];
        let ys = [moving.y, moving.center().y, moving.bottom()];

        let best_x = self.best_line(&xs, threshold, |r| [r.x, r.center().x, r.right()]);
        let best_y = self.best_line(&ys, threshold, |r| [r.y, r.center().y, r.bottom()]);

        let mut snapped = *moving;
        if let Some((edge, line)) = best_x {
            snapped.x = origin_for(edge, line, moving.width);
            result.x = Some(snapped.x);
        }
        if let Some((edge, line)) = best_y {
            snapped.y = origin_for(edge, line, moving.height);
            result.y = Some(snapped.y);
        }
        if let Some((_, line)) = best_x {
            result.guides.push(self.guide(Axis::Vertical, line, &snapped));
        }
        if let Some((_, line)) = best_y {
            result.guides.push(self.guide(Axis::Horizontal, line, &snapped));
        }
        result
    }

    /// The candidate line closest to one of `edges`, with the index of that edge.
    fn best_line<F>(&self, edges: &[f64; 3], threshold: f64, lines: F) -> Option<(usize, f64)>
    where
        F: Fn(&Rect) -> [f64; 3],
    {
        let mut best: Option<(f64, usize, f64)> = None;
        for rect in &self.rects {
            for line in lines(rect) {
                for (index, edge) in edges.iter().enumerate() {
                    let distance = (line - edge).abs();
                    if distance > threshold {
                        continue;
                    }
                    if best.is_none_or(|(b, _, _)| distance < b) {
                        best = Some((distance, index, line));
                    }
                }
            }
        }
        best.map(|(_, index, line)| (index, line))
    }

    /// A guide spanning the snapped box and every card touching `line`.
    fn guide(&self, axis: Axis, line: f64, snapped: &Rect) -> SnapGuide {
        let on_line = |r: &Rect| match axis {
            Axis::Vertical => [r.x, r.center().x, r.right()].iter().any(|v| (v - line).abs() < 1e-6),
            Axis::Horizontal => [r.y, r.center().y, r.bottom()].iter().any(|v| (v - line).abs() < 1e-6),
        };
        let span = |r: &Rect| match axis {
            Axis::Vertical => (r.y, r.bottom()),
            Axis::Horizontal => (r.x, r.right()),
        };
        let (mut start, mut end) = span(snapped);
        for rect in self.rects.iter().filter(|r| on_line(r)) {
            let (s, e) = span(rect);
            start = start.min(s);
            end = end.max(e);
        }
        SnapGuide { axis, position: line, start, end }
    }
}

/// Box origin that puts edge `index` (start, center, end) on `line`.
fn origin_for(index: usize, line: f64, extent: f64) -> f64 {
    match index {
        0 => line,
        1 => line - extent / 2.0,
        _ => line - extent,
    }
}
