#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::camera::Viewport;
use crate::doc::Style;
use crate::input::{Gesture, Selection};

// =============================================================
// Recording surface
// =============================================================

#[derive(Default)]
struct Recording {
    ops: Vec<String>,
    fail_text: bool,
    fail_dash: bool,
}

impl Recording {
    fn has(&self, prefix: &str) -> bool {
        self.ops.iter().any(|op| op.starts_with(prefix))
    }

    fn position(&self, prefix: &str) -> Option<usize> {
        self.ops.iter().position(|op| op.starts_with(prefix))
    }

    fn count(&self, prefix: &str) -> usize {
        self.ops.iter().filter(|op| op.starts_with(prefix)).count()
    }
}

impl Surface for Recording {
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), RenderError> {
        self.ops.push(format!("transform({a},{b},{c},{d},{e},{f})"));
        Ok(())
    }
    fn save(&mut self) {
        self.ops.push("save".into());
    }
    fn restore(&mut self) {
        self.ops.push("restore".into());
    }
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(format!("clear_rect({x},{y},{w},{h})"));
    }
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(format!("fill_rect({x},{y},{w},{h})"));
    }
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(format!("stroke_rect({x},{y},{w},{h})"));
    }
    fn set_fill_style(&mut self, color: &str) {
        self.ops.push(format!("fill_style({color})"));
    }
    fn set_stroke_style(&mut self, color: &str) {
        self.ops.push(format!("stroke_style({color})"));
    }
    fn set_line_width(&mut self, width: f64) {
        self.ops.push(format!("line_width({width})"));
    }
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), RenderError> {
        if self.fail_dash {
            return Err(RenderError::Surface("dash".into()));
        }
        self.ops.push(format!("line_dash({segments:?})"));
        Ok(())
    }
    fn begin_path(&mut self) {
        self.ops.push("begin_path".into());
    }
    fn close_path(&mut self) {
        self.ops.push("close_path".into());
    }
    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(format!("move_to({x},{y})"));
    }
    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(format!("line_to({x},{y})"));
    }
    fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> Result<(), RenderError> {
        self.ops.push(format!("ellipse({cx},{cy},{rx},{ry})"));
        Ok(())
    }
    fn fill(&mut self) {
        self.ops.push("fill".into());
    }
    fn stroke(&mut self) {
        self.ops.push("stroke".into());
    }
    fn set_font(&mut self, font: &str) {
        self.ops.push(format!("font({font})"));
    }
    fn set_text_baseline(&mut self, baseline: &str) {
        self.ops.push(format!("baseline({baseline})"));
    }
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), RenderError> {
        if self.fail_text {
            return Err(RenderError::Surface("text".into()));
        }
        self.ops.push(format!("fill_text({text},{x},{y})"));
        Ok(())
    }
}

// =============================================================
// Fixture
// =============================================================

struct Fixture {
    scene: SceneGraph,
    view: ViewTransform,
    interaction: InteractionState,
    presences: Vec<RemotePresence>,
    editing: Option<ObjectId>,
}

impl Fixture {
    fn new() -> Self {
        let mut view = ViewTransform::default();
        view.set_viewport(Viewport { width: 800.0, height: 600.0, pixel_density: 1.0 });
        Self {
            scene: SceneGraph::new(),
            view,
            interaction: InteractionState::default(),
            presences: Vec::new(),
            editing: None,
        }
    }

    fn add(&mut self, obj: BoardObject) -> ObjectId {
        let id = obj.id;
        self.scene.add_object(obj).unwrap();
        id
    }

    fn draw(&self, renderer: &mut CanvasRenderer) -> (bool, Recording) {
        let mut surface = Recording::default();
        let drew = self.draw_into(renderer, &mut surface).unwrap();
        (drew, surface)
    }

    fn draw_into(&self, renderer: &mut CanvasRenderer, surface: &mut Recording) -> Result<bool, RenderError> {
        let presences: Vec<&RemotePresence> = self.presences.iter().collect();
        let frame = Frame {
            scene: &self.scene,
            view: &self.view,
            interaction: &self.interaction,
            presences: &presences,
            editing: self.editing,
        };
        renderer.render(surface, &frame)
    }
}

fn filled_style() -> Style {
    Style { fill: "#ff0000".into(), ..Style::default() }
}

// =============================================================
// Dirty flag
// =============================================================

#[test]
fn new_renderer_starts_dirty() {
    let renderer = CanvasRenderer::new();
    assert!(renderer.is_dirty());
    assert_eq!(renderer.frames_drawn(), 0);
}

#[test]
fn clean_renderer_skips_pass() {
    let fx = Fixture::new();
    let mut renderer = CanvasRenderer::new();
    let (drew, _) = fx.draw(&mut renderer);
    assert!(drew);
    assert!(!renderer.is_dirty());

    let (drew, surface) = fx.draw(&mut renderer);
    assert!(!drew);
    assert!(surface.ops.is_empty());
    assert_eq!(renderer.frames_drawn(), 1);
}

#[test]
fn set_dirty_schedules_another_pass() {
    let fx = Fixture::new();
    let mut renderer = CanvasRenderer::new();
    fx.draw(&mut renderer);
    renderer.set_dirty();
    let (drew, _) = fx.draw(&mut renderer);
    assert!(drew);
    assert_eq!(renderer.frames_drawn(), 2);
}

#[test]
fn surface_error_propagates_and_clears_flag() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::text(Uuid::new_v4(), 0.0, 0.0, 100.0, 20.0, "hi"));
    let mut renderer = CanvasRenderer::new();
    let mut surface = Recording { fail_text: true, ..Recording::default() };
    assert!(fx.draw_into(&mut renderer, &mut surface).is_err());
    assert!(!renderer.is_dirty());
}

#[test]
fn failed_selection_dash_still_restores() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    fx.interaction.selection.set(vec![id]);
    let mut surface = Recording { fail_dash: true, ..Recording::default() };
    assert!(fx.draw_into(&mut CanvasRenderer::new(), &mut surface).is_err());
    assert!(surface.count("save") > 0);
    assert_eq!(surface.count("save"), surface.count("restore"));
}

#[test]
fn failed_marquee_dash_still_restores() {
    let mut fx = Fixture::new();
    fx.interaction.gesture = Gesture::Marquee {
        origin: Point::new(0.0, 0.0),
        current: Point::new(10.0, 10.0),
        base: vec![],
        additive: false,
    };
    let mut surface = Recording { fail_dash: true, ..Recording::default() };
    assert!(fx.draw_into(&mut CanvasRenderer::new(), &mut surface).is_err());
    assert_eq!(surface.ops.last().map(String::as_str), Some("restore"));
    assert_eq!(surface.count("save"), surface.count("restore"));
}

#[test]
fn failed_presence_label_still_restores() {
    let mut fx = Fixture::new();
    fx.presences.push(RemotePresence {
        participant_id: "p2".into(),
        name: "Sam".into(),
        color: "#00aa00".into(),
        cursor: Some(Point::new(50.0, 50.0)),
        selection: vec![],
    });
    let mut surface = Recording { fail_text: true, ..Recording::default() };
    assert!(fx.draw_into(&mut CanvasRenderer::new(), &mut surface).is_err());
    assert_eq!(surface.ops.last().map(String::as_str), Some("restore"));
    assert_eq!(surface.count("save"), surface.count("restore"));
}

// =============================================================
// Layers
// =============================================================

#[test]
fn background_uses_pixel_density() {
    let mut fx = Fixture::new();
    fx.view.set_viewport(Viewport { width: 400.0, height: 300.0, pixel_density: 2.0 });
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert_eq!(surface.ops[0], "transform(2,0,0,2,0,0)");
    assert_eq!(surface.ops[1], "clear_rect(0,0,400,300)");
    assert_eq!(surface.ops[2], format!("fill_style({BACKGROUND_COLOR})"));
    assert_eq!(surface.ops[3], "fill_rect(0,0,400,300)");
}

#[test]
fn world_transform_combines_zoom_pan_and_density() {
    let mut fx = Fixture::new();
    fx.view.set_viewport(Viewport { width: 800.0, height: 600.0, pixel_density: 2.0 });
    fx.view.zoom_by(2.0, Point::new(0.0, 0.0));
    fx.view.pan_by(10.0, 20.0);
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("transform(4,0,0,4,20,40)"));
}

#[test]
fn objects_draw_in_z_order() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    fx.add(BoardObject::ellipse(Uuid::new_v4(), 20.0, 0.0, 10.0, 10.0));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    let rect_at = surface.position("stroke_rect(0,0,10,10)").unwrap();
    let ellipse_at = surface.position("ellipse(25,5,5,5)").unwrap();
    assert!(rect_at < ellipse_at);
}

#[test]
fn offscreen_objects_are_culled() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::rect(Uuid::new_v4(), 5000.0, 5000.0, 10.0, 10.0));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(!surface.has("stroke_rect(5000"));
}

#[test]
fn presence_layer_draws_last() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    fx.interaction.selection.set(vec![id]);
    fx.presences.push(RemotePresence {
        participant_id: "p2".into(),
        name: "Sam".into(),
        color: "#00aa00".into(),
        cursor: Some(Point::new(50.0, 50.0)),
        selection: vec![],
    });
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    let selection_at = surface.position("line_dash([4.0, 4.0])").unwrap();
    let label_at = surface.position("fill_text(Sam").unwrap();
    assert!(selection_at < label_at);
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn unfilled_rect_only_strokes() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("stroke_rect(0,0,10,10)"));
    assert!(!surface.has("fill_rect(0,0,10,10)"));
}

#[test]
fn filled_rect_fills_before_stroke() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0).with_style(filled_style()));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    let fill_at = surface.position("fill_rect(0,0,10,10)").unwrap();
    let stroke_at = surface.position("stroke_rect(0,0,10,10)").unwrap();
    assert!(fill_at < stroke_at);
    assert!(surface.has("fill_style(#ff0000)"));
}

#[test]
fn arrow_draws_shaft_and_head() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::arrow(Uuid::new_v4(), Point::new(0.0, 0.0), Point::new(100.0, 0.0)));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("move_to(0,0)"));
    assert!(surface.has("line_to(100,0)"));
    assert!(surface.has("move_to(100,0)"));
    assert!(surface.has("close_path"));
    assert_eq!(surface.ops.iter().filter(|op| *op == "fill").count(), 1);
}

#[test]
fn path_draws_polyline() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::path(
        Uuid::new_v4(),
        vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.0, 0.0)],
    ));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    let start = surface.position("move_to(0,0)").unwrap();
    assert_eq!(surface.ops[start + 1], "line_to(10,5)");
    assert_eq!(surface.ops[start + 2], "line_to(20,0)");
}

#[test]
fn text_draws_each_line_from_top() {
    let mut fx = Fixture::new();
    fx.add(BoardObject::text(Uuid::new_v4(), 10.0, 10.0, 100.0, 40.0, "one\ntwo"));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("baseline(top)"));
    assert!(surface.has("fill_text(one,10,10)"));
    assert!(surface.has("fill_text(two,10,30)"));
}

#[test]
fn text_being_edited_is_not_drawn() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::text(Uuid::new_v4(), 10.0, 10.0, 100.0, 20.0, "secret"));
    fx.editing = Some(id);
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(!surface.has("fill_text(secret"));
}

// =============================================================
// Selection UI
// =============================================================

#[test]
fn single_box_selection_draws_eight_handles() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    fx.interaction.selection.set(vec![id]);
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    // object stroke + dashed outline + 8 handle outlines
    assert_eq!(surface.count("stroke_rect("), 10);
    assert!(surface.has("fill_style(#fff)"));
}

#[test]
fn multi_selection_has_no_handles() {
    let mut fx = Fixture::new();
    let a = fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    let b = fx.add(BoardObject::rect(Uuid::new_v4(), 20.0, 0.0, 10.0, 10.0));
    fx.interaction.selection = Selection::default();
    fx.interaction.selection.set(vec![a, b]);
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert_eq!(surface.count("stroke_rect("), 4);
    assert!(!surface.has("fill_style(#fff)"));
}

#[test]
fn selection_line_width_scales_with_zoom() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 10.0, 10.0));
    fx.interaction.selection.set(vec![id]);
    fx.view.zoom_by(2.0, Point::new(0.0, 0.0));
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("line_width(0.5)"));
    assert!(surface.has("line_dash([2.0, 2.0])"));
}

#[test]
fn marquee_is_drawn_while_dragging() {
    let mut fx = Fixture::new();
    fx.interaction.gesture = Gesture::Marquee {
        origin: Point::new(30.0, 30.0),
        current: Point::new(10.0, 10.0),
        base: vec![],
        additive: false,
    };
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has(&format!("fill_style({MARQUEE_FILL})")));
    assert!(surface.has("stroke_rect(10,10,20,20)"));
}

// =============================================================
// Presence
// =============================================================

#[test]
fn remote_selection_is_outlined_in_screen_space() {
    let mut fx = Fixture::new();
    let id = fx.add(BoardObject::rect(Uuid::new_v4(), 10.0, 10.0, 20.0, 20.0));
    fx.view.pan_by(100.0, 0.0);
    fx.presences.push(RemotePresence {
        participant_id: "p2".into(),
        name: "Ada".into(),
        color: "#123456".into(),
        cursor: None,
        selection: vec![id],
    });
    let (_, surface) = fx.draw(&mut CanvasRenderer::new());
    assert!(surface.has("stroke_style(#123456)"));
    assert!(surface.has("stroke_rect(108,8,24,24)"));
    assert!(!surface.has("fill_text(Ada"));
}
