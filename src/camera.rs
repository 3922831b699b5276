//! Points, rectangles and the pan/zoom camera for the infinite canvas.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other` by `t` in `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new((other.x - self.x).mul_add(t, self.x), (other.y - self.y).mul_add(t, self.y))
    }
}

/// Axis-aligned rectangle. `width` and `height` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width: width.max(0.0), height: height.max(0.0) }
    }

    /// Normalized rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self { x, y, width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// True when the rectangles overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right() && other.x <= self.right() && self.y <= other.bottom() && other.y <= self.bottom()
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Grow on every side by `amount` (shrinks for negative values, never below zero size).
    #[must_use]
    pub fn expand(&self, amount: f64) -> Rect {
        Rect::new(self.x - amount, self.y - amount, self.width + amount * 2.0, self.height + amount * 2.0)
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Union of every rectangle in the iterator, or `None` when it is empty.
    pub fn union_all<I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = Rect>,
    {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `pan_x` / `pan_y` are in screen pixels.
/// `zoom` is a scale factor (1.0 = no zoom), always within [`MIN_ZOOM`, `MAX_ZOOM`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Build a camera, clamping `zoom` into range. Non-finite input falls back to the identity view.
    #[must_use]
    pub fn new(pan_x: f64, pan_y: f64, zoom: f64) -> Self {
        if !(pan_x.is_finite() && pan_y.is_finite() && zoom.is_finite()) {
            return Self::default();
        }
        Self { pan_x, pan_y, zoom: clamp_zoom(zoom) }
    }

    /// Convert a screen-space point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Project a world rectangle to screen space.
    #[must_use]
    pub fn world_rect_to_screen(&self, rect: &Rect) -> Rect {
        let origin = self.world_to_screen(Point::new(rect.x, rect.y));
        Rect::new(origin.x, origin.y, rect.width * self.zoom, rect.height * self.zoom)
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// The world-space rectangle covered by a viewport of the given size.
    #[must_use]
    pub fn visible_world_rect(&self, viewport_w: f64, viewport_h: f64) -> Rect {
        let origin = self.screen_to_world(Point::new(0.0, 0.0));
        Rect::new(origin.x, origin.y, viewport_w / self.zoom, viewport_h / self.zoom)
    }

    /// Translate the view by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.pan_x += dx;
            self.pan_y += dy;
        }
    }

    /// Set the zoom while keeping the world point under `pivot` fixed on screen.
    pub fn zoom_to(&mut self, zoom: f64, pivot: Point) {
        if !zoom.is_finite() {
            return;
        }
        let anchor = self.screen_to_world(pivot);
        self.zoom = clamp_zoom(zoom);
        self.pan_x = pivot.x - anchor.x * self.zoom;
        self.pan_y = pivot.y - anchor.y * self.zoom;
    }

    /// Multiply the zoom by `factor` around `pivot`.
    pub fn zoom_by(&mut self, factor: f64, pivot: Point) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom_to(self.zoom * factor, pivot);
        }
    }

    /// Center the view on `world` without changing zoom.
    pub fn center_on(&mut self, world: Point, viewport_w: f64, viewport_h: f64) {
        self.pan_x = viewport_w * 0.5 - world.x * self.zoom;
        self.pan_y = viewport_h * 0.5 - world.y * self.zoom;
    }

    /// Choose pan and zoom so `bounds` is fully visible with `margin_px` on each side.
    pub fn fit_rect(&mut self, bounds: &Rect, viewport_w: f64, viewport_h: f64, margin_px: f64) {
        let avail_w = (viewport_w - margin_px * 2.0).max(1.0);
        let avail_h = (viewport_h - margin_px * 2.0).max(1.0);
        let zoom = if bounds.width <= f64::EPSILON && bounds.height <= f64::EPSILON {
            1.0
        } else {
            let zx = if bounds.width > f64::EPSILON { avail_w / bounds.width } else { f64::INFINITY };
            let zy = if bounds.height > f64::EPSILON { avail_h / bounds.height } else { f64::INFINITY };
            zx.min(zy)
        };
        self.zoom = clamp_zoom(zoom);
        self.center_on(bounds.center(), viewport_w, viewport_h);
    }
}

/// Clamp a zoom factor into [`MIN_ZOOM`, `MAX_ZOOM`].
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}
