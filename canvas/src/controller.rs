//! Interaction controller: turns pointer, wheel and key input into scene
//! edits, selection changes and view changes.
//!
//! DESIGN
//! ======
//! A gesture edits the scene directly while it runs so the renderer shows
//! live feedback. When it completes, those transient edits are rolled back
//! and exactly one [`Command`] is executed, so history only ever sees whole
//! gestures. `interrupt` completes a gesture at the last known pointer
//! position (pointer leave, blur, tool switch); `cancel_gesture` rolls it
//! back without recording anything (Escape).
//!
//! The controller does not own the scene, view, history or text bridge. The
//! engine lends them per call through [`EditContext`], which keeps borrows
//! disjoint and lets tests drive the controller with plain values.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cmp::Ordering;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::camera::{Point, Rect, ViewTransform};
use crate::consts::{
    HANDLE_RADIUS_PX, MIN_SHAPE_SIZE, NEW_TEXT_HEIGHT, NEW_TEXT_WIDTH, PATH_MIN_SAMPLE_DIST, WHEEL_ZOOM_STEP,
};
use crate::doc::{BoardObject, ObjectId, ObjectKind, ObjectPatch, Shape};
use crate::history::{Command, CommandStack};
use crate::hit::{self, HitPart, ResizeAnchor};
use crate::input::{Button, Gesture, InteractionState, Key, Modifiers, Selection, Tool, WheelDelta};
use crate::notify::{ListenerId, Listeners};
use crate::scene::SceneGraph;
use crate::text_edit::TextEditBridge;

/// Mutable engine state lent to the controller for one input event.
pub struct EditContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub view: &'a mut ViewTransform,
    pub history: &'a mut CommandStack,
    pub text: &'a mut TextEditBridge,
}

/// Controller-level changes delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ToolChanged(Tool),
    SelectionChanged(Vec<ObjectId>),
    HoverChanged(Option<ObjectId>),
    /// Pan or zoom changed.
    ViewChanged,
}

/// Input state machine for one board.
#[derive(Debug)]
pub struct InteractionController {
    state: InteractionState,
    /// Handle under the pointer while idle, for the cursor.
    hover_anchor: Option<ResizeAnchor>,
    /// Last pointer position in screen space.
    last_pointer: Option<Point>,
    hit_slop_px: f64,
    wheel_zoom_step: f64,
    listeners: Listeners<ControllerEvent>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(HANDLE_RADIUS_PX, WHEEL_ZOOM_STEP)
    }
}

impl InteractionController {
    #[must_use]
    pub fn new(hit_slop_px: f64, wheel_zoom_step: f64) -> Self {
        Self {
            state: InteractionState::default(),
            hover_anchor: None,
            last_pointer: None,
            hit_slop_px,
            wheel_zoom_step,
            listeners: Listeners::new(),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.state.tool
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    #[must_use]
    pub fn hovered(&self) -> Option<ObjectId> {
        self.state.hovered
    }

    #[must_use]
    pub fn interaction_state(&self) -> &InteractionState {
        &self.state
    }

    /// Last pointer position in screen space, if the pointer has been seen.
    #[must_use]
    pub fn last_pointer(&self) -> Option<Point> {
        self.last_pointer
    }

    /// CSS cursor for the current tool, gesture and hover.
    #[must_use]
    pub fn cursor(&self) -> &'static str {
        match &self.state.gesture {
            Gesture::Panning { .. } => "grabbing",
            Gesture::Moving { .. } => "move",
            Gesture::Resizing { anchor, .. } => anchor.cursor(),
            Gesture::Marquee { .. } => "default",
            Gesture::DrawingShape { .. } | Gesture::DrawingArrow { .. } | Gesture::DrawingPath { .. } => "crosshair",
            Gesture::Idle => match (self.hover_anchor, self.state.hovered) {
                (Some(anchor), _) => anchor.cursor(),
                (None, Some(_)) if self.state.tool == Tool::Select => "move",
                _ => self.state.tool.cursor(),
            },
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ControllerEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // --- Tool / selection commands ---

    /// Switch tools. A gesture in progress is completed first.
    pub fn set_tool(&mut self, ctx: &mut EditContext<'_>, tool: Tool) -> bool {
        let mut changed = self.interrupt(ctx);
        if self.state.tool != tool {
            self.state.tool = tool;
            self.listeners.emit(&ControllerEvent::ToolChanged(tool));
            self.set_hover(None, None);
            changed = true;
        }
        changed
    }

    /// Replace the selection (ids missing from the scene are dropped).
    pub fn select(&mut self, scene: &SceneGraph, ids: impl IntoIterator<Item = ObjectId>) -> bool {
        let ids: Vec<ObjectId> = ids.into_iter().filter(|id| scene.get_object(id).is_some()).collect();
        self.update_selection(|sel| sel.set(ids))
    }

    pub fn select_all(&mut self, scene: &SceneGraph) -> bool {
        let ids: Vec<ObjectId> = scene.get_all_objects().iter().map(|o| o.id).collect();
        self.update_selection(|sel| sel.set(ids))
    }

    pub fn clear_selection(&mut self) -> bool {
        self.update_selection(Selection::clear)
    }

    /// Drop selected and hovered ids that no longer exist (after undo,
    /// remote deletes or a snapshot load).
    pub fn prune(&mut self, scene: &SceneGraph) -> bool {
        let mut changed = self.update_selection(|sel| sel.retain(|id| scene.get_object(id).is_some()));
        if self.state.hovered.is_some_and(|id| scene.get_object(&id).is_none()) {
            changed |= self.set_hover(None, None);
        }
        changed
    }

    /// Delete every selected object as one command.
    pub fn delete_selection(&mut self, ctx: &mut EditContext<'_>) -> bool {
        self.interrupt(ctx);
        let mut deletes: Vec<Command> =
            self.state.selection.ids().iter().filter_map(|id| Command::delete(ctx.scene, id)).collect();
        if deletes.is_empty() {
            return false;
        }
        // Topmost first, so undo re-inserts bottom-up at the recorded
        // positions.
        deletes.sort_by_key(|cmd| match cmd {
            Command::Delete { index, .. } => std::cmp::Reverse(*index),
            _ => std::cmp::Reverse(0),
        });
        let command = if deletes.len() == 1 {
            deletes.remove(0)
        } else {
            Command::Batch { label: "delete".to_owned(), commands: deletes }
        };
        execute(ctx, command);
        self.prune(ctx.scene);
        true
    }

    pub fn undo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        self.interrupt(ctx);
        match ctx.history.undo(ctx.scene) {
            Ok(done) => {
                self.prune(ctx.scene);
                done
            }
            Err(e) => {
                warn!(error = %e, "undo failed");
                self.prune(ctx.scene);
                true
            }
        }
    }

    pub fn redo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        self.interrupt(ctx);
        match ctx.history.redo(ctx.scene) {
            Ok(done) => {
                self.prune(ctx.scene);
                done
            }
            Err(e) => {
                warn!(error = %e, "redo failed");
                self.prune(ctx.scene);
                true
            }
        }
    }

    // --- Pointer input ---

    /// Handle a pointer press. Returns true when a redraw is needed.
    pub fn pointer_down(
        &mut self,
        ctx: &mut EditContext<'_>,
        screen: Point,
        button: Button,
        modifiers: Modifiers,
    ) -> bool {
        let mut changed = self.interrupt(ctx);
        self.last_pointer = Some(screen);

        if ctx.text.is_editing() {
            if let Err(e) = ctx.text.commit(ctx.scene, ctx.history) {
                warn!(error = %e, "text commit failed");
            }
            changed = true;
        }

        match button {
            Button::Middle => {
                self.state.gesture = Gesture::Panning { last_screen: screen };
                return changed;
            }
            Button::Secondary => return changed,
            Button::Primary => {}
        }

        let world = ctx.view.screen_to_world(screen);
        match self.state.tool {
            Tool::Select => self.press_select(ctx, world, modifiers),
            Tool::Rect | Tool::Ellipse => {
                let id = Uuid::new_v4();
                let (kind, obj) = if self.state.tool == Tool::Rect {
                    (ObjectKind::Rect, BoardObject::rect(id, world.x, world.y, 0.0, 0.0))
                } else {
                    (ObjectKind::Ellipse, BoardObject::ellipse(id, world.x, world.y, 0.0, 0.0))
                };
                self.begin_drawing(ctx, obj, Gesture::DrawingShape { id, kind, origin: world });
            }
            Tool::Arrow => {
                let id = Uuid::new_v4();
                let gesture = Gesture::DrawingArrow { id, start: world };
                self.begin_drawing(ctx, BoardObject::arrow(id, world, world), gesture);
            }
            Tool::Path => {
                let id = Uuid::new_v4();
                self.begin_drawing(ctx, BoardObject::path(id, vec![world]), Gesture::DrawingPath { id });
            }
            Tool::Text => self.press_text(ctx, world),
        }
        true
    }

    /// Handle pointer motion. Returns true when a redraw is needed.
    pub fn pointer_move(&mut self, ctx: &mut EditContext<'_>, screen: Point, _modifiers: Modifiers) -> bool {
        self.last_pointer = Some(screen);
        if self.state.gesture.is_idle() {
            return self.update_hover(ctx, screen);
        }
        self.drag_to(ctx, screen)
    }

    /// Handle a pointer release: the gesture completes at `screen`.
    pub fn pointer_up(
        &mut self,
        ctx: &mut EditContext<'_>,
        screen: Point,
        _button: Button,
        _modifiers: Modifiers,
    ) -> bool {
        self.last_pointer = Some(screen);
        if self.state.gesture.is_idle() {
            return false;
        }
        self.drag_to(ctx, screen);
        self.finish(ctx)
    }

    /// Double-click on a text object in select mode starts editing it.
    pub fn double_click(&mut self, ctx: &mut EditContext<'_>, screen: Point) -> bool {
        self.interrupt(ctx);
        if self.state.tool != Tool::Select {
            return false;
        }
        let world = ctx.view.screen_to_world(screen);
        let target = hit::hit_test(world, ctx.scene, ctx.view, &Selection::new(), self.hit_slop_px)
            .map(|h| h.object_id)
            .filter(|id| ctx.scene.get_object(id).is_some_and(|o| o.kind() == ObjectKind::Text));
        let Some(id) = target else {
            return false;
        };
        match ctx.text.start_edit(id, ctx.scene, ctx.view) {
            Ok(_) => {
                self.update_selection(|sel| sel.set([id]));
                true
            }
            Err(e) => {
                warn!(%id, error = %e, "could not start text edit");
                false
            }
        }
    }

    /// Wheel pans; with ctrl/meta held it zooms around the pointer.
    pub fn wheel(&mut self, ctx: &mut EditContext<'_>, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> bool {
        self.last_pointer = Some(screen);
        let changed = if modifiers.command() {
            let factor = match delta.dy.partial_cmp(&0.0) {
                Some(Ordering::Less) => self.wheel_zoom_step,
                Some(Ordering::Greater) => 1.0 / self.wheel_zoom_step,
                _ => return false,
            };
            ctx.view.zoom_by(factor, screen)
        } else {
            ctx.view.pan_by(-delta.dx, -delta.dy);
            true
        };
        if changed {
            self.view_changed(ctx);
        }
        changed
    }

    // --- Keyboard ---

    /// Handle a key press. Shortcuts are ignored while a text edit is open.
    pub fn key_down(&mut self, ctx: &mut EditContext<'_>, key: &Key, modifiers: Modifiers) -> bool {
        if ctx.text.is_editing() {
            return false;
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selection(ctx);
        }
        if key.is("Escape") {
            if self.state.gesture.is_idle() {
                return self.clear_selection();
            }
            return self.cancel_gesture(ctx);
        }
        if modifiers.command() {
            if key.is("z") {
                return if modifiers.shift { self.redo(ctx) } else { self.undo(ctx) };
            }
            if key.is("y") {
                return self.redo(ctx);
            }
            if key.is("a") {
                self.interrupt(ctx);
                return self.select_all(ctx.scene);
            }
            return false;
        }
        if modifiers.alt {
            return false;
        }
        match Tool::from_shortcut(&key.0) {
            Some(tool) => self.set_tool(ctx, tool),
            None => false,
        }
    }

    // --- Gesture lifecycle ---

    /// Complete any gesture in progress as if the pointer were released at
    /// its last known position.
    pub fn interrupt(&mut self, ctx: &mut EditContext<'_>) -> bool {
        if self.state.gesture.is_idle() {
            return false;
        }
        debug!("interrupting gesture");
        if let Some(last) = self.last_pointer {
            self.drag_to(ctx, last);
        }
        self.finish(ctx)
    }

    /// Abandon the gesture in progress, restoring the pre-gesture scene and
    /// selection. Nothing is recorded in history.
    pub fn cancel_gesture(&mut self, ctx: &mut EditContext<'_>) -> bool {
        match std::mem::take(&mut self.state.gesture) {
            Gesture::Idle => false,
            Gesture::Panning { .. } => true,
            Gesture::Moving { originals, .. } => {
                restore(ctx.scene, &originals);
                true
            }
            Gesture::Resizing { original, .. } => {
                restore(ctx.scene, std::slice::from_ref(&original));
                true
            }
            Gesture::Marquee { base, .. } => {
                self.update_selection(|sel| sel.set(base));
                true
            }
            Gesture::DrawingShape { id, .. } | Gesture::DrawingArrow { id, .. } | Gesture::DrawingPath { id } => {
                ctx.scene.remove_object(&id);
                true
            }
        }
    }

    // --- Internals ---

    fn press_select(&mut self, ctx: &mut EditContext<'_>, world: Point, modifiers: Modifiers) {
        let hit = hit::hit_test(world, ctx.scene, ctx.view, &self.state.selection, self.hit_slop_px);
        match hit {
            Some(h) => match h.part {
                HitPart::ResizeHandle(anchor) => {
                    if let Some(original) = ctx.scene.get_object(&h.object_id).cloned() {
                        self.state.gesture = Gesture::Resizing { anchor, original };
                    }
                }
                HitPart::Body if modifiers.shift => {
                    self.update_selection(|sel| sel.toggle(h.object_id));
                }
                HitPart::Body => {
                    if !self.state.selection.contains(&h.object_id) {
                        self.update_selection(|sel| sel.set([h.object_id]));
                    }
                    let originals = self
                        .state
                        .selection
                        .ids()
                        .iter()
                        .filter_map(|id| ctx.scene.get_object(id).cloned())
                        .collect();
                    self.state.gesture = Gesture::Moving { origin: world, originals };
                }
            },
            None => {
                let base = self.state.selection.ids().to_vec();
                if !modifiers.shift {
                    self.clear_selection();
                }
                self.state.gesture =
                    Gesture::Marquee { origin: world, current: world, base, additive: modifiers.shift };
            }
        }
    }

    fn press_text(&mut self, ctx: &mut EditContext<'_>, world: Point) {
        let existing = hit::hit_test(world, ctx.scene, ctx.view, &Selection::new(), self.hit_slop_px)
            .map(|h| h.object_id)
            .filter(|id| ctx.scene.get_object(id).is_some_and(|o| o.kind() == ObjectKind::Text));
        let result = match existing {
            Some(id) => ctx.text.start_edit(id, ctx.scene, ctx.view),
            None => {
                let obj = BoardObject::text(Uuid::new_v4(), world.x, world.y, NEW_TEXT_WIDTH, NEW_TEXT_HEIGHT, "");
                ctx.text.start_new(obj, ctx.scene, ctx.view)
            }
        };
        match result {
            Ok(placement) => {
                self.update_selection(|sel| sel.set([placement.id]));
            }
            Err(e) => warn!(error = %e, "could not start text edit"),
        }
    }

    fn begin_drawing(&mut self, ctx: &mut EditContext<'_>, obj: BoardObject, gesture: Gesture) {
        match ctx.scene.add_object(obj) {
            Ok(()) => {
                self.clear_selection();
                self.state.gesture = gesture;
            }
            Err(e) => warn!(error = %e, "could not place transient object"),
        }
    }

    /// Apply the active gesture's transient effect for a pointer at `screen`.
    fn drag_to(&mut self, ctx: &mut EditContext<'_>, screen: Point) -> bool {
        let world = ctx.view.screen_to_world(screen);
        match &mut self.state.gesture {
            Gesture::Idle => false,
            Gesture::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                ctx.view.pan_by(dx, dy);
                self.view_changed(ctx);
                true
            }
            Gesture::Moving { origin, originals } => {
                let (dx, dy) = (world.x - origin.x, world.y - origin.y);
                for original in originals.iter() {
                    let mut moved = original.clone();
                    moved.translate(dx, dy);
                    transient_update(ctx.scene, &moved);
                }
                true
            }
            Gesture::Resizing { anchor, original } => {
                let rect = hit::resize_box(original.bounds(), *anchor, world);
                let mut resized = original.clone();
                resized.set_box(rect);
                transient_update(ctx.scene, &resized);
                true
            }
            Gesture::Marquee { origin, current, base, additive } => {
                *current = world;
                let rect = Rect::from_corners(*origin, world);
                let mut ids = if *additive { base.clone() } else { Vec::new() };
                if rect.width > 0.0 || rect.height > 0.0 {
                    ids.extend(ctx.scene.get_objects_in_rect(&rect).iter().map(|o| o.id));
                }
                self.update_selection(|sel| sel.set(ids));
                true
            }
            Gesture::DrawingShape { id, origin, .. } => {
                let rect = Rect::from_corners(*origin, world);
                let patch = ObjectPatch {
                    x: Some(rect.x),
                    y: Some(rect.y),
                    width: Some(rect.width),
                    height: Some(rect.height),
                    ..ObjectPatch::default()
                };
                transient_patch(ctx.scene, id, &patch);
                true
            }
            Gesture::DrawingArrow { id, start } => {
                let patch = ObjectPatch {
                    end: Some(world),
                    width: Some(world.x - start.x),
                    height: Some(world.y - start.y),
                    ..ObjectPatch::default()
                };
                transient_patch(ctx.scene, id, &patch);
                true
            }
            Gesture::DrawingPath { id } => {
                let Some(Shape::Path { points }) = ctx.scene.get_object(id).map(|o| &o.shape) else {
                    return false;
                };
                if points.last().is_some_and(|last| last.distance(world) < PATH_MIN_SAMPLE_DIST) {
                    return false;
                }
                let mut points = points.clone();
                points.push(world);
                transient_patch(ctx.scene, id, &ObjectPatch { points: Some(points), ..ObjectPatch::default() });
                true
            }
        }
    }

    /// Roll back the transient edits of the finished gesture and record
    /// its net effect as one command.
    fn finish(&mut self, ctx: &mut EditContext<'_>) -> bool {
        match std::mem::take(&mut self.state.gesture) {
            Gesture::Idle => false,
            Gesture::Panning { .. } | Gesture::Marquee { .. } => true,
            Gesture::Moving { originals, .. } => {
                let mut updates: Vec<Command> = originals
                    .iter()
                    .filter_map(|before| {
                        let after = ctx.scene.get_object(&before.id)?.clone();
                        Some(Command::Update { before: before.clone(), after })
                    })
                    .filter(|cmd| !cmd.is_noop())
                    .collect();
                restore(ctx.scene, &originals);
                match updates.len() {
                    0 => {}
                    1 => execute(ctx, updates.remove(0)),
                    _ => execute(ctx, Command::Batch { label: "move".to_owned(), commands: updates }),
                }
                true
            }
            Gesture::Resizing { original, .. } => {
                if let Some(after) = ctx.scene.get_object(&original.id).cloned() {
                    restore(ctx.scene, std::slice::from_ref(&original));
                    execute(ctx, Command::Update { before: original, after });
                }
                true
            }
            Gesture::DrawingShape { id, .. } | Gesture::DrawingArrow { id, .. } | Gesture::DrawingPath { id } => {
                let Some(object) = ctx.scene.remove_object(&id) else {
                    return true;
                };
                if is_degenerate(&object) {
                    debug!(kind = ?object.kind(), "discarding degenerate drawing");
                    return true;
                }
                execute(ctx, Command::Create { object });
                self.update_selection(|sel| sel.set([id]));
                true
            }
        }
    }

    fn update_hover(&mut self, ctx: &mut EditContext<'_>, screen: Point) -> bool {
        if self.state.tool != Tool::Select {
            return self.set_hover(None, None);
        }
        let world = ctx.view.screen_to_world(screen);
        let hit = hit::hit_test(world, ctx.scene, ctx.view, &self.state.selection, self.hit_slop_px);
        let anchor = hit.and_then(|h| match h.part {
            HitPart::ResizeHandle(anchor) => Some(anchor),
            HitPart::Body => None,
        });
        self.set_hover(hit.map(|h| h.object_id), anchor)
    }

    fn set_hover(&mut self, hovered: Option<ObjectId>, anchor: Option<ResizeAnchor>) -> bool {
        self.hover_anchor = anchor;
        if self.state.hovered == hovered {
            return false;
        }
        self.state.hovered = hovered;
        self.listeners.emit(&ControllerEvent::HoverChanged(hovered));
        true
    }

    fn update_selection(&mut self, change: impl FnOnce(&mut Selection)) -> bool {
        let before = self.state.selection.clone();
        change(&mut self.state.selection);
        if self.state.selection == before {
            return false;
        }
        self.listeners.emit(&ControllerEvent::SelectionChanged(self.state.selection.ids().to_vec()));
        true
    }

    fn view_changed(&mut self, ctx: &mut EditContext<'_>) {
        self.listeners.emit(&ControllerEvent::ViewChanged);
        if ctx.text.is_editing() {
            ctx.text.reposition(ctx.scene, ctx.view);
        }
    }
}

/// Drawings too small to keep: a click without drag, a zero-length arrow,
/// a path with fewer than two points.
fn is_degenerate(obj: &BoardObject) -> bool {
    match &obj.shape {
        Shape::Rect { width, height } | Shape::Ellipse { width, height } | Shape::Text { width, height, .. } => {
            width.abs() < MIN_SHAPE_SIZE && height.abs() < MIN_SHAPE_SIZE
        }
        Shape::Arrow { .. } => obj.arrow_endpoints().is_none_or(|(a, b)| a.distance(b) < MIN_SHAPE_SIZE),
        Shape::Path { points } => points.len() < 2,
    }
}

fn execute(ctx: &mut EditContext<'_>, command: Command) {
    let label = command.label().to_owned();
    if let Err(e) = ctx.history.execute(command, ctx.scene) {
        warn!(%label, error = %e, "command rejected");
    }
}

fn transient_update(scene: &mut SceneGraph, obj: &BoardObject) {
    // A collaborator may delete the object mid-gesture; the gesture then
    // simply stops affecting it.
    if let Err(e) = scene.replace_object(obj.clone()) {
        debug!(error = %e, "transient update skipped");
    }
}

fn transient_patch(scene: &mut SceneGraph, id: &ObjectId, patch: &ObjectPatch) {
    if let Err(e) = scene.update_object(id, patch) {
        debug!(error = %e, "transient update skipped");
    }
}

fn restore(scene: &mut SceneGraph, originals: &[BoardObject]) {
    for original in originals {
        if scene.get_object(&original.id).is_some() {
            transient_update(scene, original);
        }
    }
}
