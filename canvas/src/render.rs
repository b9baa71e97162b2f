//! Rendering: draws the scene, selection UI and remote presence to a
//! [`Surface`].
//!
//! The renderer receives read-only views of scene, view and interaction
//! state and produces draw calls; it does not mutate application state.
//! A dirty flag gates each pass so the host can call [`CanvasRenderer::render`]
//! every animation frame for free.
//!
//! Layers, bottom to top:
//! 1. background
//! 2. objects in z-order (world space, culled to the visible rect)
//! 3. selection outlines, handles and marquee (world space, widths / zoom)
//! 4. remote selections and cursors with name labels (screen space)

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::{Point, Rect, ViewTransform};
use crate::collab::RemotePresence;
use crate::consts::{
    ARROW_HEAD_ANGLE, ARROW_HEAD_SIZE, BACKGROUND_COLOR, CURSOR_SIZE_PX, HANDLE_DRAW_PX, SELECTION_COLOR,
    SELECTION_DASH_PX, TEXT_LINE_HEIGHT,
};
use crate::doc::{BoardObject, ObjectId, Shape, Style};
use crate::error::RenderError;
use crate::hit;
use crate::input::InteractionState;
use crate::scene::SceneGraph;
use crate::surface::Surface;

const MARQUEE_FILL: &str = "rgba(30, 144, 255, 0.12)";

/// Everything one render pass reads.
pub struct Frame<'a> {
    pub scene: &'a SceneGraph,
    pub view: &'a ViewTransform,
    pub interaction: &'a InteractionState,
    pub presences: &'a [&'a RemotePresence],
    /// Text object whose text is shown by the editing overlay instead.
    pub editing: Option<ObjectId>,
}

/// Dirty-flag gated scene renderer.
#[derive(Debug)]
pub struct CanvasRenderer {
    dirty: bool,
    frames_drawn: u64,
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self { dirty: true, frames_drawn: 0 }
    }
}

impl CanvasRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a redraw on the next pass.
    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of passes that actually drew.
    #[must_use]
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Draw `frame` if dirty. The flag is cleared before drawing, so a
    /// change made during the pass schedules another one. Returns whether
    /// anything was drawn.
    ///
    /// # Errors
    ///
    /// Returns the first surface error; the pass is abandoned.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: &Frame<'_>) -> Result<bool, RenderError> {
        if !self.dirty {
            return Ok(false);
        }
        self.dirty = false;
        self.frames_drawn += 1;

        let viewport = frame.view.viewport();
        let dpr = viewport.pixel_density;
        let zoom = frame.view.zoom();
        let pan = frame.view.pan();

        // Layer 1: background.
        surface.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
        surface.clear_rect(0.0, 0.0, viewport.width, viewport.height);
        surface.set_fill_style(BACKGROUND_COLOR);
        surface.fill_rect(0.0, 0.0, viewport.width, viewport.height);

        // Layer 2: objects, world space.
        surface.set_transform(dpr * zoom, 0.0, 0.0, dpr * zoom, dpr * pan.x, dpr * pan.y)?;
        let visible = frame.view.visible_world_rect();
        for obj in frame.scene.get_all_objects() {
            if !obj.bounds().intersects(&visible) {
                continue;
            }
            let skip_text = frame.editing == Some(obj.id);
            draw_object(surface, obj, skip_text)?;
        }

        // Layer 3: local selection UI.
        let selection = frame.interaction.selection.ids();
        let show_handles = selection.len() == 1;
        for id in selection {
            if let Some(obj) = frame.scene.get_object(id) {
                draw_selection(surface, obj, zoom, show_handles)?;
            }
        }
        if let Some(marquee) = frame.interaction.gesture.marquee_rect() {
            draw_marquee(surface, marquee, zoom)?;
        }

        // Layer 4: remote presence, screen space.
        surface.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
        for presence in frame.presences {
            draw_presence(surface, presence, frame.scene, frame.view)?;
        }

        Ok(true)
    }
}

// =============================================================
// Object dispatch
// =============================================================

fn draw_object<S: Surface + ?Sized>(surface: &mut S, obj: &BoardObject, skip_text: bool) -> Result<(), RenderError> {
    isolated(surface, |surface| match &obj.shape {
        Shape::Rect { .. } => {
            draw_rect(surface, obj);
            Ok(())
        }
        Shape::Ellipse { .. } => draw_ellipse(surface, obj),
        Shape::Arrow { .. } => {
            draw_arrow(surface, obj);
            Ok(())
        }
        Shape::Path { points } => {
            draw_path(surface, points, &obj.style);
            Ok(())
        }
        Shape::Text { text, .. } => draw_text(surface, obj, if skip_text { "" } else { text }),
    })
}

// =============================================================
// Shape renderers
// =============================================================

fn draw_rect<S: Surface + ?Sized>(surface: &mut S, obj: &BoardObject) {
    let b = obj.bounds();
    if obj.style.has_fill() {
        surface.set_fill_style(&obj.style.fill);
        surface.fill_rect(b.x, b.y, b.width, b.height);
    }
    apply_stroke_style(surface, &obj.style);
    surface.stroke_rect(b.x, b.y, b.width, b.height);
}

fn draw_ellipse<S: Surface + ?Sized>(surface: &mut S, obj: &BoardObject) -> Result<(), RenderError> {
    let b = obj.bounds();
    let c = b.center();
    surface.begin_path();
    surface.ellipse(c.x, c.y, b.width / 2.0, b.height / 2.0)?;
    if obj.style.has_fill() {
        surface.set_fill_style(&obj.style.fill);
        surface.fill();
    }
    apply_stroke_style(surface, &obj.style);
    surface.stroke();
    Ok(())
}

fn draw_arrow<S: Surface + ?Sized>(surface: &mut S, obj: &BoardObject) {
    let Some((start, end)) = obj.arrow_endpoints() else {
        return;
    };
    apply_stroke_style(surface, &obj.style);
    surface.begin_path();
    surface.move_to(start.x, start.y);
    surface.line_to(end.x, end.y);
    surface.stroke();

    if start.distance(end) > f64::EPSILON {
        let angle = (end.y - start.y).atan2(end.x - start.x);
        surface.set_fill_style(&obj.style.stroke);
        draw_arrowhead(surface, end, angle);
    }
}

fn draw_arrowhead<S: Surface + ?Sized>(surface: &mut S, tip: Point, angle: f64) {
    let x1 = tip.x - ARROW_HEAD_SIZE * (angle - ARROW_HEAD_ANGLE).cos();
    let y1 = tip.y - ARROW_HEAD_SIZE * (angle - ARROW_HEAD_ANGLE).sin();
    let x2 = tip.x - ARROW_HEAD_SIZE * (angle + ARROW_HEAD_ANGLE).cos();
    let y2 = tip.y - ARROW_HEAD_SIZE * (angle + ARROW_HEAD_ANGLE).sin();

    surface.begin_path();
    surface.move_to(tip.x, tip.y);
    surface.line_to(x1, y1);
    surface.line_to(x2, y2);
    surface.close_path();
    surface.fill();
}

fn draw_path<S: Surface + ?Sized>(surface: &mut S, points: &[Point], style: &Style) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    if rest.is_empty() {
        return;
    }
    apply_stroke_style(surface, style);
    surface.begin_path();
    surface.move_to(first.x, first.y);
    for p in rest {
        surface.line_to(p.x, p.y);
    }
    surface.stroke();
}

// =============================================================
// Text
// =============================================================

fn draw_text<S: Surface + ?Sized>(surface: &mut S, obj: &BoardObject, text: &str) -> Result<(), RenderError> {
    let b = obj.bounds();
    if obj.style.has_fill() {
        surface.set_fill_style(&obj.style.fill);
        surface.fill_rect(b.x, b.y, b.width, b.height);
    }
    if text.is_empty() {
        return Ok(());
    }
    let size = obj.style.font_size;
    surface.set_fill_style(&obj.style.stroke);
    surface.set_font(&obj.style.font(size));
    surface.set_text_baseline("top");
    let mut y = b.y;
    for line in text.lines() {
        surface.fill_text(line, b.x, y)?;
        y += size * TEXT_LINE_HEIGHT;
    }
    Ok(())
}

// =============================================================
// Selection UI
// =============================================================

fn draw_selection<S: Surface + ?Sized>(
    surface: &mut S,
    obj: &BoardObject,
    zoom: f64,
    show_handles: bool,
) -> Result<(), RenderError> {
    let b = obj.bounds();
    let dash_world = SELECTION_DASH_PX / zoom;

    isolated(surface, |surface| {
        surface.set_stroke_style(SELECTION_COLOR);
        surface.set_line_width(1.0 / zoom);
        surface.set_line_dash(&[dash_world, dash_world])?;
        surface.stroke_rect(b.x, b.y, b.width, b.height);
        surface.set_line_dash(&[])?;

        if show_handles && obj.is_box() {
            let half = HANDLE_DRAW_PX / zoom;
            surface.set_fill_style("#fff");
            for (_, pos) in hit::resize_handle_positions(b) {
                surface.fill_rect(pos.x - half, pos.y - half, half * 2.0, half * 2.0);
                surface.stroke_rect(pos.x - half, pos.y - half, half * 2.0, half * 2.0);
            }
        }
        Ok(())
    })
}

fn draw_marquee<S: Surface + ?Sized>(surface: &mut S, marquee: Rect, zoom: f64) -> Result<(), RenderError> {
    let dash_world = SELECTION_DASH_PX / zoom;
    isolated(surface, |surface| {
        surface.set_line_dash(&[dash_world, dash_world])?;
        surface.set_stroke_style(SELECTION_COLOR);
        surface.set_fill_style(MARQUEE_FILL);
        surface.set_line_width(1.0 / zoom);
        surface.fill_rect(marquee.x, marquee.y, marquee.width, marquee.height);
        surface.stroke_rect(marquee.x, marquee.y, marquee.width, marquee.height);
        surface.set_line_dash(&[])
    })
}

// =============================================================
// Remote presence
// =============================================================

fn draw_presence<S: Surface + ?Sized>(
    surface: &mut S,
    presence: &RemotePresence,
    scene: &SceneGraph,
    view: &ViewTransform,
) -> Result<(), RenderError> {
    isolated(surface, |surface| {
        surface.set_stroke_style(&presence.color);
        surface.set_line_width(2.0);
        for id in &presence.selection {
            if let Some(obj) = scene.get_object(id) {
                let r = view.world_rect_to_screen(obj.bounds()).inflate(2.0);
                surface.stroke_rect(r.x, r.y, r.width, r.height);
            }
        }

        let Some(cursor) = presence.cursor else {
            return Ok(());
        };
        let p = view.world_to_screen(cursor);
        surface.set_fill_style(&presence.color);
        surface.begin_path();
        surface.move_to(p.x, p.y);
        surface.line_to(p.x, p.y + CURSOR_SIZE_PX);
        surface.line_to(p.x + CURSOR_SIZE_PX * 0.7, p.y + CURSOR_SIZE_PX * 0.7);
        surface.close_path();
        surface.fill();

        surface.set_font("12px sans-serif");
        surface.set_text_baseline("top");
        surface.fill_text(&presence.name, p.x + CURSOR_SIZE_PX * 0.8, p.y + CURSOR_SIZE_PX * 0.8)
    })
}

// =============================================================
// Helpers
// =============================================================

/// Run `draw` between `save` and `restore`; the state stack stays balanced
/// when `draw` fails.
fn isolated<S: Surface + ?Sized>(
    surface: &mut S,
    draw: impl FnOnce(&mut S) -> Result<(), RenderError>,
) -> Result<(), RenderError> {
    surface.save();
    let result = draw(surface);
    surface.restore();
    result
}

fn apply_stroke_style<S: Surface + ?Sized>(surface: &mut S, style: &Style) {
    surface.set_stroke_style(&style.stroke);
    surface.set_line_width(style.stroke_width);
}
