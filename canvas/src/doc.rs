//! Document model: board objects, their styles, and sparse patches.
//!
//! This module defines what lives on the canvas (`BoardObject` with its
//! tagged `Shape`), the visual `Style` shared by every kind, and the
//! sparse-update types (`ObjectPatch`, `StylePatch`) that
//! [`crate::scene::SceneGraph::update_object`] merges.
//!
//! Objects arrive from the snapshot layer (JSON deserialization), from the
//! collaboration adapter, and from tool gestures. Bounds are never stored;
//! [`BoardObject::bounds`] derives them from geometry on every call.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Point, Rect};
use crate::consts::MIN_BOUNDS_SIZE;

/// Unique identifier for a board object.
pub type ObjectId = Uuid;

/// The kind of a board object, without its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Rect,
    Ellipse,
    Arrow,
    Path,
    Text,
}

/// Visual style shared by every object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    /// Stroke color as a CSS color string.
    pub stroke: String,
    /// Fill color as a CSS color string; `"transparent"` disables fill.
    pub fill: String,
    /// Stroke width in world units.
    pub stroke_width: f64,
    /// Font size in world units (text objects).
    pub font_size: f64,
    /// CSS font family (text objects).
    pub font_family: String,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke: "#1F1A17".to_owned(),
            fill: "transparent".to_owned(),
            stroke_width: 2.0,
            font_size: 16.0,
            font_family: "sans-serif".to_owned(),
        }
    }
}

impl Style {
    /// Whether the fill color should be painted at all.
    #[must_use]
    pub fn has_fill(&self) -> bool {
        !self.fill.is_empty() && self.fill != "transparent"
    }

    /// CSS `font` shorthand at the given pixel size.
    #[must_use]
    pub fn font(&self, size_px: f64) -> String {
        format!("{size_px}px {}", self.font_family)
    }
}

/// Kind-specific geometry. Serialized inline with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Axis-aligned rectangle at `(x, y)`.
    Rect { width: f64, height: f64 },
    /// Ellipse inscribed in the `(x, y, width, height)` box.
    Ellipse { width: f64, height: f64 },
    /// Directed arrow. When the explicit endpoints are absent they fall back
    /// to `(x, y)` and `(x + width, y + height)`.
    Arrow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<Point>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<Point>,
        #[serde(default)]
        width: f64,
        #[serde(default)]
        height: f64,
    },
    /// Freehand polyline through absolute world points.
    Path {
        #[serde(default)]
        points: Vec<Point>,
    },
    /// Text block laid out inside its box.
    Text {
        width: f64,
        height: f64,
        #[serde(default)]
        text: String,
    },
}

/// A board object as stored in the scene and in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    /// Unique identifier; never changes after creation.
    pub id: ObjectId,
    /// Left edge (box kinds) or origin (arrow start / first path point).
    pub x: f64,
    /// Top edge (box kinds) or origin.
    pub y: f64,
    #[serde(default)]
    pub style: Style,
    #[serde(flatten)]
    pub shape: Shape,
}

impl BoardObject {
    #[must_use]
    pub fn rect(id: ObjectId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id, x, y, style: Style::default(), shape: Shape::Rect { width, height } }
    }

    #[must_use]
    pub fn ellipse(id: ObjectId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id, x, y, style: Style::default(), shape: Shape::Ellipse { width, height } }
    }

    #[must_use]
    pub fn text(id: ObjectId, x: f64, y: f64, width: f64, height: f64, text: impl Into<String>) -> Self {
        Self { id, x, y, style: Style::default(), shape: Shape::Text { width, height, text: text.into() } }
    }

    #[must_use]
    pub fn arrow(id: ObjectId, start: Point, end: Point) -> Self {
        Self {
            id,
            x: start.x,
            y: start.y,
            style: Style::default(),
            shape: Shape::Arrow { start: Some(start), end: Some(end), width: end.x - start.x, height: end.y - start.y },
        }
    }

    #[must_use]
    pub fn path(id: ObjectId, points: Vec<Point>) -> Self {
        let origin = points.first().copied().unwrap_or_default();
        Self { id, x: origin.x, y: origin.y, style: Style::default(), shape: Shape::Path { points } }
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self.shape {
            Shape::Rect { .. } => ObjectKind::Rect,
            Shape::Ellipse { .. } => ObjectKind::Ellipse,
            Shape::Arrow { .. } => ObjectKind::Arrow,
            Shape::Path { .. } => ObjectKind::Path,
            Shape::Text { .. } => ObjectKind::Text,
        }
    }

    /// Whether the object is sized by a box and can be resized by handles.
    #[must_use]
    pub fn is_box(&self) -> bool {
        matches!(self.shape, Shape::Rect { .. } | Shape::Ellipse { .. } | Shape::Text { .. })
    }

    /// Text content, for kinds that carry text.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Arrow endpoints with the `x + width` / `y + height` fallback applied.
    #[must_use]
    pub fn arrow_endpoints(&self) -> Option<(Point, Point)> {
        match self.shape {
            Shape::Arrow { start, end, width, height } => Some((
                start.unwrap_or(Point::new(self.x, self.y)),
                end.unwrap_or(Point::new(self.x + width, self.y + height)),
            )),
            _ => None,
        }
    }

    /// Geometric bounds in world space. Degenerate extents are widened to
    /// [`MIN_BOUNDS_SIZE`] so hit-testing stays well-defined.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let raw = match &self.shape {
            Shape::Rect { width, height } | Shape::Ellipse { width, height } | Shape::Text { width, height, .. } => {
                Rect::from_corners(Point::new(self.x, self.y), Point::new(self.x + width, self.y + height))
            }
            Shape::Arrow { .. } => {
                let (a, b) = self.arrow_endpoints().unwrap_or_default();
                Rect::from_corners(a, b)
            }
            Shape::Path { points } => points_bounds(points).unwrap_or(Rect::new(self.x, self.y, 0.0, 0.0)),
        };
        Rect { width: raw.width.max(MIN_BOUNDS_SIZE), height: raw.height.max(MIN_BOUNDS_SIZE), ..raw }
    }

    /// Move the whole object by a world-space delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        match &mut self.shape {
            Shape::Arrow { start, end, .. } => {
                for p in [start, end].into_iter().flatten() {
                    p.x += dx;
                    p.y += dy;
                }
            }
            Shape::Path { points } => {
                for p in points {
                    p.x += dx;
                    p.y += dy;
                }
            }
            Shape::Rect { .. } | Shape::Ellipse { .. } | Shape::Text { .. } => {}
        }
    }

    /// Set the box of a box-kind object. Returns false for other kinds.
    pub fn set_box(&mut self, rect: Rect) -> bool {
        match &mut self.shape {
            Shape::Rect { width, height } | Shape::Ellipse { width, height } | Shape::Text { width, height, .. } => {
                self.x = rect.x;
                self.y = rect.y;
                *width = rect.width;
                *height = rect.height;
                true
            }
            Shape::Arrow { .. } | Shape::Path { .. } => false,
        }
    }

    /// Merge a sparse patch into this object. Fields that do not apply to
    /// the object's kind are ignored. Returns true if anything changed.
    pub fn apply_patch(&mut self, patch: &ObjectPatch) -> bool {
        let before = self.clone();
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(style) = &patch.style {
            style.merge_into(&mut self.style);
        }
        match &mut self.shape {
            Shape::Rect { width, height } | Shape::Ellipse { width, height } => {
                assign(width, patch.width);
                assign(height, patch.height);
            }
            Shape::Text { width, height, text } => {
                assign(width, patch.width);
                assign(height, patch.height);
                if let Some(t) = &patch.text {
                    text.clone_from(t);
                }
            }
            Shape::Arrow { start, end, width, height } => {
                assign(width, patch.width);
                assign(height, patch.height);
                if patch.start.is_some() {
                    *start = patch.start;
                }
                if patch.end.is_some() {
                    *end = patch.end;
                }
            }
            Shape::Path { points } => {
                if let Some(p) = &patch.points {
                    points.clone_from(p);
                }
            }
        }
        *self != before
    }
}

fn assign(slot: &mut f64, value: Option<f64>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn points_bounds(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Sparse style update. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl StylePatch {
    fn merge_into(&self, style: &mut Style) {
        if let Some(v) = &self.stroke {
            style.stroke.clone_from(v);
        }
        if let Some(v) = &self.fill {
            style.fill.clone_from(v);
        }
        if let Some(v) = self.stroke_width {
            style.stroke_width = v;
        }
        if let Some(v) = self.font_size {
            style.font_size = v;
        }
        if let Some(v) = &self.font_family {
            style.font_family.clone_from(v);
        }
    }
}

/// Sparse update for a board object. There is deliberately no `id` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePatch>,
}

impl ObjectPatch {
    /// Patch that only changes text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
