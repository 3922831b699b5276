//! Connection geometry: anchors, smart anchor choice, bezier paths and hit distance.

#[cfg(test)]
#[path = "connect_test.rs"]
mod connect_test;

use crate::camera::{Point, Rect};
use crate::consts::{BEZIER_SAMPLES, CURVE_OFFSET_FACTOR};
use crate::doc::{AnchorPosition, Connection, Scene, Side};

/// Edge midpoints (top, right, bottom, left) followed by corners (clockwise from top-left).
///
/// The order is the tie-break order for [`smart_anchors`].
#[must_use]
pub fn anchor_candidates(rect: &Rect) -> [Point; 8] {
    let c = rect.center();
    [
        Point::new(c.x, rect.y),
        Point::new(rect.right(), c.y),
        Point::new(c.x, rect.bottom()),
        Point::new(rect.x, c.y),
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ]
}

/// Point at parametric position `t` along `side`. Top and bottom run left to right,
/// left and right run top to bottom.
#[must_use]
pub fn edge_point(rect: &Rect, side: Side, t: f64) -> Point {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    match side {
        Side::Top => Point::new(rect.x + rect.width * t, rect.y),
        Side::Bottom => Point::new(rect.x + rect.width * t, rect.bottom()),
        Side::Left => Point::new(rect.x, rect.y + rect.height * t),
        Side::Right => Point::new(rect.right(), rect.y + rect.height * t),
    }
}

/// Pick the endpoints of a connection between two cards.
///
/// Pinned (`Edge`) anchors are used as-is. Every `Auto` end is chosen from
/// [`anchor_candidates`] to minimise the distance between the two ends;
/// the first candidate pair in candidate order wins ties.
#[must_use]
pub fn smart_anchors(a: &Rect, a_pos: AnchorPosition, b: &Rect, b_pos: AnchorPosition) -> (Point, Point) {
    let a_points: Vec<Point> = match a_pos {
        AnchorPosition::Edge { side, t } => vec![edge_point(a, side, t)],
        AnchorPosition::Auto => anchor_candidates(a).to_vec(),
    };
    let b_points: Vec<Point> = match b_pos {
        AnchorPosition::Edge { side, t } => vec![edge_point(b, side, t)],
        AnchorPosition::Auto => anchor_candidates(b).to_vec(),
    };

    let mut best = (a.center(), b.center());
    let mut best_dist = f64::INFINITY;
    for pa in &a_points {
        for pb in &b_points {
            let d = pa.distance(*pb);
            if d < best_dist {
                best_dist = d;
                best = (*pa, *pb);
            }
        }
    }
    best
}

/// A cubic bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point,
    pub c1: Point,
    pub c2: Point,
    pub p3: Point,
}

impl CubicBezier {
    /// Point on the curve at `t` in `[0, 1]`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point::new(
            b0 * self.p0.x + b1 * self.c1.x + b2 * self.c2.x + b3 * self.p3.x,
            b0 * self.p0.y + b1 * self.c1.y + b2 * self.c2.y + b3 * self.p3.y,
        )
    }

    /// Flatten into `segments + 1` points, endpoints included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments).map(|i| self.point_at(i as f64 / segments as f64)).collect()
    }

    /// Direction the curve arrives at `p3` from, for arrowheads.
    #[must_use]
    pub fn end_tangent_origin(&self) -> Point {
        if self.c2.distance(self.p3) > f64::EPSILON { self.c2 } else { self.p0 }
    }
}

/// Bezier from `from` to `to`. Control points sit at 1/3 and 2/3 along the chord,
/// pushed sideways by `curvature * chord * CURVE_OFFSET_FACTOR`.
#[must_use]
pub fn bezier(from: Point, to: Point, curvature: f64) -> CubicBezier {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = dx.hypot(dy);
    let curvature = if curvature.is_finite() { curvature } else { 0.0 };
    let (nx, ny) = if len > f64::EPSILON { (-dy / len, dx / len) } else { (0.0, 0.0) };
    let offset = curvature * len * CURVE_OFFSET_FACTOR;
    let c1 = Point::new(from.x + dx / 3.0 + nx * offset, from.y + dy / 3.0 + ny * offset);
    let c2 = Point::new(from.x + dx * 2.0 / 3.0 + nx * offset, from.y + dy * 2.0 / 3.0 + ny * offset);
    CubicBezier { p0: from, c1, c2, p3: to }
}

/// The path a connection currently follows, or `None` if an endpoint card is missing.
#[must_use]
pub fn connection_path(scene: &Scene, conn: &Connection) -> Option<CubicBezier> {
    let a = scene.card(&conn.source_card_id)?.rect();
    let b = scene.card(&conn.target_card_id)?.rect();
    let (from, to) = smart_anchors(&a, conn.source_anchor, &b, conn.target_anchor);
    Some(bezier(from, to, conn.curvature))
}

/// Shortest distance from `p` to the polyline through `points`.
#[must_use]
pub fn distance_to_path(p: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => p.distance(*only),
        _ => points
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from `p` to a connection's flattened curve.
#[must_use]
pub fn distance_to_connection(p: Point, path: &CubicBezier) -> f64 {
    distance_to_path(p, &path.sample(BEZIER_SAMPLES))
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + dx * t, a.y + dy * t))
}
