//! Minimap projection: the whole board plus the current view, scaled into a fixed panel.

#[cfg(test)]
#[path = "minimap_test.rs"]
mod minimap_test;

use crate::camera::{Camera, Point, Rect};
use crate::consts::MINIMAP_PADDING_PX;
use crate::doc::{CardId, Scene};

/// A world-to-panel mapping with every card and the viewport already projected.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapLayout {
    /// Panel pixels per world unit.
    pub scale: f64,
    /// World rectangle the panel covers (cards plus viewport).
    pub world: Rect,
    /// Panel position of `world`'s top-left corner.
    pub origin: Point,
    /// Card rectangles in panel coordinates, in draw order.
    pub cards: Vec<(CardId, Rect)>,
    /// The visible viewport in panel coordinates.
    pub viewport: Rect,
}

impl MinimapLayout {
    #[must_use]
    pub fn to_panel(&self, world: Point) -> Point {
        Point::new(
            self.origin.x + (world.x - self.world.x) * self.scale,
            self.origin.y + (world.y - self.world.y) * self.scale,
        )
    }

    #[must_use]
    pub fn rect_to_panel(&self, rect: &Rect) -> Rect {
        let p = self.to_panel(Point::new(rect.x, rect.y));
        Rect::new(p.x, p.y, rect.width * self.scale, rect.height * self.scale)
    }

    /// World point under a panel-space position, for click-to-navigate.
    #[must_use]
    pub fn world_at(&self, panel: Point) -> Point {
        Point::new(
            self.world.x + (panel.x - self.origin.x) / self.scale,
            self.world.y + (panel.y - self.origin.y) / self.scale,
        )
    }
}

/// Fit the union of all cards and the viewport into a `panel_w` x `panel_h` panel.
///
/// The scale is uniform and the content is centered. Returns `None` when the
/// panel or the viewport has no area.
#[must_use]
pub fn project(
    scene: &Scene,
    camera: &Camera,
    viewport_w: f64,
    viewport_h: f64,
    panel_w: f64,
    panel_h: f64,
) -> Option<MinimapLayout> {
    let avail_w = panel_w - MINIMAP_PADDING_PX * 2.0;
    let avail_h = panel_h - MINIMAP_PADDING_PX * 2.0;
    if avail_w <= 0.0 || avail_h <= 0.0 || viewport_w <= 0.0 || viewport_h <= 0.0 {
        return None;
    }

    let view = camera.visible_world_rect(viewport_w, viewport_h);
    let world = scene.bounds().map_or(view, |b| b.union(&view));
    let scale = (avail_w / world.width).min(avail_h / world.height);
    let origin = Point::new(
        (panel_w - world.width * scale) * 0.5,
        (panel_h - world.height * scale) * 0.5,
    );

    let mut layout = MinimapLayout { scale, world, origin, cards: Vec::new(), viewport: Rect::default() };
    layout.cards = scene
        .sorted_cards()
        .into_iter()
        .map(|c| (c.id, layout.rect_to_panel(&c.rect())))
        .collect();
    layout.viewport = layout.rect_to_panel(&view);
    Some(layout)
}
