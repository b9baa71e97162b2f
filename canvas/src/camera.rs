//! View transform: pan/zoom state and screen↔world conversion.
//!
//! Screen space is CSS pixels relative to the canvas element's top-left.
//! World space is the coordinate system objects are stored in. The mapping
//! is `screen = world * zoom + pan`; device pixel density only matters to the
//! renderer when it sizes the backing store.

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
}

/// Axis-aligned rectangle. `width` and `height` are non-negative once
/// built through [`Rect::from_corners`].
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
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self { x: a.x.min(b.x), y: a.y.min(b.y), width: (a.x - b.x).abs(), height: (a.y - b.y).abs() }
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
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Closed-interval overlap test: rectangles that share only an edge
    /// or a corner intersect.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right() && other.x <= self.right() && self.y <= other.bottom() && other.y <= self.bottom()
    }

    /// Whether `pt` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }

    /// Grow the rectangle by `amount` on every side.
    #[must_use]
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect::new(self.x - amount, self.y - amount, self.width + amount * 2.0, self.height + amount * 2.0)
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }
}

/// Size of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Device pixels per CSS pixel.
    pub pixel_density: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 0.0, height: 0.0, pixel_density: 1.0 }
    }
}

/// Persistable view state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    /// Screen-space offset of the world origin, in CSS pixels.
    pub pan: Point,
    /// Scale factor (1.0 = no zoom).
    pub zoom: f64,
    pub viewport: Viewport,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { pan: Point::default(), zoom: 1.0, viewport: Viewport::default() }
    }
}

/// Pan/zoom camera over the infinite canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    state: ViewState,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(MIN_ZOOM, MAX_ZOOM)
    }
}

impl ViewTransform {
    /// Identity view with the given zoom bounds. Bounds that are not a
    /// positive ordered range fall back to the defaults.
    #[must_use]
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) =
            if min_zoom > 0.0 && min_zoom <= max_zoom { (min_zoom, max_zoom) } else { (MIN_ZOOM, MAX_ZOOM) };
        Self { state: ViewState::default(), min_zoom, max_zoom }
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    /// Replace the viewport. Non-finite or negative sizes become 0 and a
    /// non-positive density becomes 1.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = sanitize_viewport(viewport);
    }

    #[must_use]
    pub fn view_state(&self) -> ViewState {
        self.state
    }

    /// Replace the whole view state, clamping zoom into the configured
    /// range and zeroing non-finite pan components.
    pub fn set_view_state(&mut self, state: ViewState) {
        self.state = ViewState {
            pan: Point::new(finite_or(state.pan.x, 0.0), finite_or(state.pan.y, 0.0)),
            zoom: self.clamp_zoom(state.zoom),
            viewport: sanitize_viewport(state.viewport),
        };
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    #[must_use]
    pub fn pan(&self) -> Point {
        self.state.pan
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.state.zoom + self.state.pan.x,
            y: world.y * self.state.zoom + self.state.pan.y,
        }
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.state.pan.x) / self.state.zoom,
            y: (screen.y - self.state.pan.y) / self.state.zoom,
        }
    }

    /// Convert a world-space rectangle to screen space.
    #[must_use]
    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        let origin = self.world_to_screen(Point::new(rect.x, rect.y));
        Rect::new(origin.x, origin.y, rect.width * self.state.zoom, rect.height * self.state.zoom)
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.state.zoom
    }

    /// Multiply zoom by `factor` while keeping the world point under
    /// `anchor` (screen space) on the same pixel. Returns false when the
    /// zoom did not change.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let world = self.screen_to_world(anchor);
        let zoom = self.clamp_zoom(self.state.zoom * factor);
        if (zoom - self.state.zoom).abs() < f64::EPSILON {
            return false;
        }
        self.state.zoom = zoom;
        self.state.pan = Point::new(anchor.x - world.x * zoom, anchor.y - world.y * zoom);
        true
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.state.pan.x += dx;
            self.state.pan.y += dy;
        }
    }

    /// World-space rectangle currently covered by the viewport.
    #[must_use]
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.screen_to_world(Point::new(0.0, 0.0));
        Rect::new(
            top_left.x,
            top_left.y,
            self.state.viewport.width / self.state.zoom,
            self.state.viewport.height / self.state.zoom,
        )
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            1.0_f64.clamp(self.min_zoom, self.max_zoom)
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

fn sanitize_viewport(viewport: Viewport) -> Viewport {
    let size = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    Viewport {
        width: size(viewport.width),
        height: size(viewport.height),
        pixel_density: if viewport.pixel_density.is_finite() && viewport.pixel_density > 0.0 {
            viewport.pixel_density
        } else {
            1.0
        },
    }
}
