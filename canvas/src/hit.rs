//! Hit-testing against board objects.
//!
//! Everything here is pure geometry over world coordinates. Tolerances come
//! in as screen pixels and are converted through the view, so thin strokes
//! stay clickable at any zoom.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Point, Rect, ViewTransform};
use crate::doc::{BoardObject, ObjectId, Shape};
use crate::input::Selection;
use crate::scene::SceneGraph;

/// Which part of an object was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [Self; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// CSS cursor shown while hovering or dragging this handle.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::N | Self::S => "ns-resize",
            Self::E | Self::W => "ew-resize",
            Self::Ne | Self::Sw => "nesw-resize",
            Self::Nw | Self::Se => "nwse-resize",
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub object_id: ObjectId,
    pub part: HitPart,
}

/// World positions of the eight handles around `bounds`, in
/// [`ResizeAnchor::ALL`] order.
#[must_use]
pub fn resize_handle_positions(bounds: Rect) -> [(ResizeAnchor, Point); 8] {
    let (l, t, r, b) = (bounds.x, bounds.y, bounds.right(), bounds.bottom());
    let c = bounds.center();
    ResizeAnchor::ALL.map(|anchor| {
        let pt = match anchor {
            ResizeAnchor::N => Point::new(c.x, t),
            ResizeAnchor::Ne => Point::new(r, t),
            ResizeAnchor::E => Point::new(r, c.y),
            ResizeAnchor::Se => Point::new(r, b),
            ResizeAnchor::S => Point::new(c.x, b),
            ResizeAnchor::Sw => Point::new(l, b),
            ResizeAnchor::W => Point::new(l, c.y),
            ResizeAnchor::Nw => Point::new(l, t),
        };
        (anchor, pt)
    })
}

/// Box produced by dragging `anchor` of `original` to `pointer`. Edges not
/// controlled by the anchor stay put; dragging past the opposite edge flips
/// the box instead of producing a negative size.
#[must_use]
pub fn resize_box(original: Rect, anchor: ResizeAnchor, pointer: Point) -> Rect {
    let mut left = original.x;
    let mut right = original.right();
    let mut top = original.y;
    let mut bottom = original.bottom();
    if anchor.moves_left() {
        left = pointer.x;
    }
    if anchor.moves_right() {
        right = pointer.x;
    }
    if anchor.moves_top() {
        top = pointer.y;
    }
    if anchor.moves_bottom() {
        bottom = pointer.y;
    }
    Rect::from_corners(Point::new(left, top), Point::new(right, bottom))
}

/// Test which object (if any) is under `world_pt`.
///
/// Handles of a single selected box object are checked first; then objects
/// are scanned top to bottom with per-kind containment.
#[must_use]
pub fn hit_test(
    world_pt: Point,
    scene: &SceneGraph,
    view: &ViewTransform,
    selection: &Selection,
    slop_px: f64,
) -> Option<Hit> {
    let slop = view.screen_dist_to_world(slop_px);

    if let Some(id) = selection.single() {
        if let Some(obj) = scene.get_object(&id).filter(|o| o.is_box()) {
            let handle = resize_handle_positions(obj.bounds())
                .into_iter()
                .find(|(_, pos)| pos.distance(world_pt) <= slop);
            if let Some((anchor, _)) = handle {
                return Some(Hit { object_id: id, part: HitPart::ResizeHandle(anchor) });
            }
        }
    }

    scene
        .get_all_objects()
        .iter()
        .rev()
        .find(|obj| contains_point(obj, world_pt, slop))
        .map(|obj| Hit { object_id: obj.id, part: HitPart::Body })
}

/// Whether `pt` lies on `obj`, allowing `tolerance` world units around
/// outlines and strokes.
#[must_use]
pub fn contains_point(obj: &BoardObject, pt: Point, tolerance: f64) -> bool {
    let stroke = obj.style.stroke_width.max(0.0) / 2.0;
    match &obj.shape {
        Shape::Rect { .. } | Shape::Text { .. } => obj.bounds().inflate(stroke).contains(pt),
        Shape::Ellipse { .. } => {
            let b = obj.bounds();
            let c = b.center();
            let rx = b.width / 2.0 + stroke + tolerance / 2.0;
            let ry = b.height / 2.0 + stroke + tolerance / 2.0;
            let nx = (pt.x - c.x) / rx;
            let ny = (pt.y - c.y) / ry;
            nx * nx + ny * ny <= 1.0
        }
        Shape::Arrow { .. } => obj
            .arrow_endpoints()
            .is_some_and(|(a, b)| distance_to_segment(pt, a, b) <= tolerance + stroke),
        Shape::Path { points } => match points.as_slice() {
            [] => false,
            [only] => only.distance(pt) <= tolerance + stroke,
            _ => points.windows(2).any(|w| distance_to_segment(pt, w[0], w[1]) <= tolerance + stroke),
        },
    }
}

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}
