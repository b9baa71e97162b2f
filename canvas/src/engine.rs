//! Engine facade: owns every component and turns host calls into
//! [`Action`]s.
//!
//! DESIGN
//! ======
//! [`EngineCore`] holds all state and logic that does not need a browser,
//! so it is tested natively. [`Engine`] wraps it with the canvas element, a
//! [`WebSurface`] and an optional DOM text overlay, and performs the
//! host-side effects it can do itself.
//!
//! Every entry point follows the same shape: observe history, selection,
//! cursor, text placement and view; run the operation; drain the scene
//! journal (feeding comments, the collaboration adapter and the snapshot
//! throttle); then diff the observations into actions. Remote changes are
//! drained separately so they are never broadcast back.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde_json::Value;
use tracing::{info, warn};
use web_sys::HtmlCanvasElement;

use crate::camera::{Point, ViewTransform, Viewport};
use crate::collab::{CollabMessage, CollabTransport, CollaborationAdapter};
use crate::comments::{Anchor, CommentId, CommentSystem};
use crate::config::EngineConfig;
use crate::controller::{EditContext, InteractionController};
use crate::doc::ObjectId;
use crate::embed::{EmbedHost, SaveStatus, SnapshotThrottle};
use crate::error::{CommentError, RenderError, SaveError, SnapshotError};
use crate::history::{CommandStack, HistoryState};
use crate::input::{Button, InputEvent, InteractionState, Key, Modifiers, Tool, WheelDelta};
use crate::render::{CanvasRenderer, Frame};
use crate::scene::SceneGraph;
use crate::snapshot::{self, RestoreReport, Snapshot};
use crate::surface::Surface;
use crate::text_edit::{TextEditBridge, TextOverlay, TextPlacement};
use crate::web::{DomTextOverlay, WebSurface};

/// Effects for the host to carry out after an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// State visible on the canvas changed; the next frame will draw.
    RenderNeeded,
    /// CSS cursor for the canvas element.
    SetCursor(String),
    /// Show or move the text overlay.
    ShowTextEditor(TextPlacement),
    HideTextEditor,
    HistoryChanged { can_undo: bool, can_redo: bool },
    SelectionChanged(Vec<ObjectId>),
    /// Persist this snapshot JSON, then report back via `save_finished`.
    SaveSnapshot(String),
}

/// State compared before and after each call.
struct Observed {
    history: HistoryState,
    selection: Vec<ObjectId>,
    cursor: &'static str,
    placement: Option<TextPlacement>,
    pan: Point,
    zoom: f64,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from [`Engine`] so it can be tested without a browser.
#[derive(Debug)]
pub struct EngineCore {
    config: EngineConfig,
    scene: SceneGraph,
    view: ViewTransform,
    history: CommandStack,
    text: TextEditBridge,
    controller: InteractionController,
    comments: CommentSystem,
    collab: CollaborationAdapter,
    renderer: CanvasRenderer,
    host: EmbedHost,
    throttle: SnapshotThrottle,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EngineConfig::default(), "board")
    }
}

impl EngineCore {
    /// Empty board. The embed starts at the minimum configured height and
    /// the local participant gets a random id.
    #[must_use]
    pub fn new(config: EngineConfig, board_id: impl Into<String>) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "engine: invalid config, using defaults");
                EngineConfig::default()
            }
        };
        let host = EmbedHost::new(board_id, config.min_embed_height, &config);
        Self {
            scene: SceneGraph::new(),
            view: ViewTransform::new(config.min_zoom, config.max_zoom),
            history: CommandStack::new(config.history_limit),
            text: TextEditBridge::new(),
            controller: InteractionController::new(config.hit_slop_px, config.wheel_zoom_step),
            comments: CommentSystem::new(),
            collab: CollaborationAdapter::new(uuid::Uuid::new_v4().to_string(), "", "#888888"),
            renderer: CanvasRenderer::new(),
            host,
            throttle: SnapshotThrottle::new(config.snapshot_throttle_ms),
            config,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    #[must_use]
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    #[must_use]
    pub fn history(&self) -> &CommandStack {
        &self.history
    }

    #[must_use]
    pub fn comments(&self) -> &CommentSystem {
        &self.comments
    }

    #[must_use]
    pub fn collab(&self) -> &CollaborationAdapter {
        &self.collab
    }

    #[must_use]
    pub fn interaction_state(&self) -> &InteractionState {
        self.controller.interaction_state()
    }

    #[must_use]
    pub fn selection(&self) -> &[ObjectId] {
        self.controller.selection().ids()
    }

    #[must_use]
    pub fn cursor(&self) -> &'static str {
        self.controller.cursor()
    }

    #[must_use]
    pub fn text_placement(&self) -> Option<&TextPlacement> {
        self.text.placement()
    }

    #[must_use]
    pub fn host(&self) -> &EmbedHost {
        &self.host
    }

    #[must_use]
    pub fn save_status(&self) -> &SaveStatus {
        self.throttle.status()
    }

    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.renderer.is_dirty()
    }

    // --- Input ---

    /// Dispatch a host input event.
    pub fn handle_event(&mut self, event: InputEvent) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { position, button, modifiers } => {
                self.on_pointer_down(position, button, modifiers)
            }
            InputEvent::PointerMove { position, modifiers } => self.on_pointer_move(position, modifiers),
            InputEvent::PointerUp { position, button, modifiers } => self.on_pointer_up(position, button, modifiers),
            InputEvent::DoubleClick { position, modifiers } => self.on_double_click(position, modifiers),
            InputEvent::Wheel { position, delta, modifiers } => self.on_wheel(position, delta, modifiers),
            InputEvent::KeyDown { key, modifiers } => self.on_key_down(&key, modifiers),
            InputEvent::PointerLeave => self.on_pointer_leave(),
            InputEvent::Blur => self.on_blur(),
        }
    }

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.pointer_down(ctx, screen, button, modifiers))
    }

    pub fn on_pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        let actions = self.with_controller(|ctl, ctx| ctl.pointer_move(ctx, screen, modifiers));
        self.broadcast_presence();
        actions
    }

    pub fn on_pointer_up(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.pointer_up(ctx, screen, button, modifiers))
    }

    pub fn on_double_click(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.double_click(ctx, screen))
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.wheel(ctx, screen, delta, modifiers))
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.key_down(ctx, key, modifiers))
    }

    /// The pointer left the canvas: complete any gesture where it was last
    /// seen and hide our cursor from collaborators.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let actions = self.with_controller(InteractionController::interrupt);
        self.collab.broadcast_presence(None, self.controller.selection().ids());
        actions
    }

    /// The window lost focus: complete any gesture in progress.
    pub fn on_blur(&mut self) -> Vec<Action> {
        self.with_controller(InteractionController::interrupt)
    }

    // --- Commands ---

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.set_tool(ctx, tool))
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.with_controller(InteractionController::undo)
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.with_controller(InteractionController::redo)
    }

    pub fn delete_selection(&mut self) -> Vec<Action> {
        self.with_controller(InteractionController::delete_selection)
    }

    pub fn select(&mut self, ids: Vec<ObjectId>) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.select(ctx.scene, ids))
    }

    pub fn select_all(&mut self) -> Vec<Action> {
        self.with_controller(|ctl, ctx| ctl.select_all(ctx.scene))
    }

    pub fn clear_selection(&mut self) -> Vec<Action> {
        self.with_controller(|ctl, _| ctl.clear_selection())
    }

    /// Resize the drawing surface (CSS pixels and device pixel ratio).
    pub fn set_viewport(&mut self, width: f64, height: f64, pixel_density: f64) -> Vec<Action> {
        let before = self.observe();
        self.view.set_viewport(Viewport { width, height, pixel_density });
        if self.text.is_editing() {
            self.text.reposition(&mut self.scene, &self.view);
        }
        self.settle(before, true)
    }

    /// Resize the embed inside the host document. Returns the clamped
    /// height.
    pub fn set_embed_height(&mut self, height: f64) -> f64 {
        self.host.set_height(height)
    }

    // --- Text editing ---

    /// Mirror the overlay's contents into the edit session.
    pub fn set_text_draft(&mut self, text: &str) {
        self.text.set_draft(text);
    }

    /// Finish the open text edit as one undoable command.
    pub fn commit_text_edit(&mut self) -> Vec<Action> {
        let before = self.observe();
        let was_editing = before.placement.is_some();
        let changed = match self.text.commit(&mut self.scene, &mut self.history) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, "text commit failed");
                true
            }
        };
        self.settle(before, changed || was_editing)
    }

    /// Abandon the open text edit.
    pub fn cancel_text_edit(&mut self) -> Vec<Action> {
        let before = self.observe();
        self.text.cancel(&mut self.scene);
        let redraw = before.placement.is_some();
        self.settle(before, redraw)
    }

    // --- Comments ---

    pub fn add_comment(
        &mut self,
        anchor: Anchor,
        author: &str,
        text: &str,
        now_ms: f64,
    ) -> (CommentId, Vec<Action>) {
        let before = self.observe();
        let id = self.comments.add_comment(anchor, author, text, now_ms);
        self.throttle.mark_dirty();
        (id, self.settle(before, true))
    }

    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn resolve_comment(&mut self, id: CommentId) -> Result<Vec<Action>, CommentError> {
        let before = self.observe();
        let changed = self.comments.resolve_comment(id)?;
        Ok(self.comment_changed(before, changed))
    }

    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn reopen_comment(&mut self, id: CommentId) -> Result<Vec<Action>, CommentError> {
        let before = self.observe();
        let changed = self.comments.reopen_comment(id)?;
        Ok(self.comment_changed(before, changed))
    }

    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn delete_comment(&mut self, id: CommentId) -> Result<Vec<Action>, CommentError> {
        let before = self.observe();
        self.comments.delete_comment(id)?;
        Ok(self.comment_changed(before, true))
    }

    /// World position of a comment pin.
    #[must_use]
    pub fn comment_position(&self, id: CommentId) -> Option<Point> {
        self.comments.anchor_position(id, &self.scene)
    }

    // --- Collaboration ---

    pub fn connect(&mut self, transport: Box<dyn CollabTransport>, name: &str, color: &str) {
        self.collab.set_identity(name, color);
        self.collab.connect(transport);
        self.broadcast_presence();
    }

    pub fn disconnect(&mut self) -> Vec<Action> {
        let before = self.observe();
        let cleared = self.collab.disconnect();
        self.settle(before, cleared)
    }

    /// Apply a message from another participant. Its scene changes skip
    /// history and are not broadcast back.
    pub fn receive_remote(&mut self, message: CollabMessage) -> Vec<Action> {
        let before = self.observe();
        let mut redraw = self.drain_local();
        redraw |= self.collab.receive(message, &mut self.scene);

        let remote = self.scene.take_events();
        if !remote.is_empty() {
            for event in &remote {
                self.comments.on_scene_event(event);
            }
            self.throttle.mark_dirty();
            self.controller.prune(&self.scene);
            if self.text.is_editing() {
                self.text.reposition(&mut self.scene, &self.view);
            }
            redraw = true;
        }
        self.settle(before, redraw)
    }

    // --- Persistence ---

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        snapshot::create_snapshot(&self.scene, &self.view, &self.comments)
    }

    /// Replace the board with a persisted snapshot string.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] only when `raw` is not JSON at all;
    /// bad entries inside are skipped and reported.
    pub fn load_snapshot_json(&mut self, raw: &str) -> Result<(RestoreReport, Vec<Action>), SnapshotError> {
        let value = snapshot::parse_snapshot(raw)?;
        Ok(self.load_snapshot(&value))
    }

    /// Replace the board with a parsed snapshot. Open gestures and text
    /// edits are discarded and history is cleared.
    pub fn load_snapshot(&mut self, value: &Value) -> (RestoreReport, Vec<Action>) {
        let before = self.observe();
        {
            let mut ctx = EditContext {
                scene: &mut self.scene,
                view: &mut self.view,
                history: &mut self.history,
                text: &mut self.text,
            };
            self.controller.cancel_gesture(&mut ctx);
        }
        self.text.cancel(&mut self.scene);
        self.drain_local();

        let report = snapshot::restore_snapshot(value, &mut self.scene, &mut self.view, &mut self.comments);
        // Comments were replaced wholesale; only collaborators need the reset.
        let events = self.scene.take_events();
        self.collab.broadcast_local(&events, &self.scene);
        self.history.clear();
        self.controller.prune(&self.scene);

        if report.is_clean() {
            info!(objects = report.objects_loaded, comments = report.comments_loaded, "snapshot restored");
        } else {
            warn!(
                objects = report.objects_loaded,
                objects_skipped = report.objects_skipped,
                comments_skipped = report.comments_skipped,
                view_defaulted = report.view_defaulted,
                "snapshot restored with omissions"
            );
        }

        let actions = self.settle(before, true);
        // The loaded board is what storage already holds.
        self.throttle = SnapshotThrottle::new(self.config.snapshot_throttle_ms);
        (report, actions)
    }

    /// Per-frame housekeeping: emits a throttled snapshot when due. Saves
    /// wait while a gesture or a text edit is open so transient edits never
    /// persist.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        if !self.controller.interaction_state().gesture.is_idle() || self.text.is_editing() {
            return Vec::new();
        }
        if !self.throttle.poll(now_ms) {
            return Vec::new();
        }
        self.emit_snapshot().into_iter().collect()
    }

    /// Final flush before the embed goes away: completes any gesture,
    /// commits an open text edit, disconnects and emits a last snapshot.
    pub fn teardown(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = self.with_controller(InteractionController::interrupt);
        actions.extend(self.commit_text_edit());
        self.collab.disconnect();
        self.throttle.flush(now_ms);
        actions.extend(self.emit_snapshot());
        actions
    }

    /// Report the host's result for the last `SaveSnapshot`.
    pub fn save_finished(&mut self, result: Result<(), SaveError>) {
        self.throttle.record_result(result);
    }

    // --- Render ---

    /// Draw to `surface` if anything changed since the last pass.
    ///
    /// # Errors
    ///
    /// Propagates the first surface error.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<bool, RenderError> {
        let presences = self.collab.remote_presences();
        let frame = Frame {
            scene: &self.scene,
            view: &self.view,
            interaction: self.controller.interaction_state(),
            presences: &presences,
            editing: self.text.editing_id(),
        };
        self.renderer.render(surface, &frame)
    }

    // --- Internals ---

    fn observe(&self) -> Observed {
        Observed {
            history: self.history.state(),
            selection: self.controller.selection().ids().to_vec(),
            cursor: self.controller.cursor(),
            placement: self.text.placement().cloned(),
            pan: self.view.pan(),
            zoom: self.view.zoom(),
        }
    }

    fn with_controller(
        &mut self,
        op: impl FnOnce(&mut InteractionController, &mut EditContext<'_>) -> bool,
    ) -> Vec<Action> {
        let before = self.observe();
        let redraw = {
            let mut ctx = EditContext {
                scene: &mut self.scene,
                view: &mut self.view,
                history: &mut self.history,
                text: &mut self.text,
            };
            op(&mut self.controller, &mut ctx)
        };
        self.settle(before, redraw)
    }

    /// Fan out local scene changes. Returns whether there were any.
    fn drain_local(&mut self) -> bool {
        let events = self.scene.take_events();
        if events.is_empty() {
            return false;
        }
        for event in &events {
            self.comments.on_scene_event(event);
        }
        self.collab.broadcast_local(&events, &self.scene);
        self.throttle.mark_dirty();
        true
    }

    fn settle(&mut self, before: Observed, redraw: bool) -> Vec<Action> {
        let mut redraw = redraw | self.drain_local();
        let after = self.observe();
        let mut actions = Vec::new();

        if after.pan != before.pan || (after.zoom - before.zoom).abs() > f64::EPSILON {
            self.throttle.mark_dirty();
            redraw = true;
        }
        if after.history != before.history {
            actions.push(Action::HistoryChanged {
                can_undo: after.history.can_undo(),
                can_redo: after.history.can_redo(),
            });
        }
        if after.selection != before.selection {
            self.broadcast_presence();
            actions.push(Action::SelectionChanged(after.selection));
            redraw = true;
        }
        match (before.placement, after.placement) {
            (old, Some(now)) if old.as_ref() != Some(&now) => actions.push(Action::ShowTextEditor(now)),
            (Some(_), None) => actions.push(Action::HideTextEditor),
            _ => {}
        }
        if after.cursor != before.cursor {
            actions.push(Action::SetCursor(after.cursor.to_owned()));
        }
        if redraw {
            self.renderer.set_dirty();
            actions.insert(0, Action::RenderNeeded);
        }
        actions
    }

    fn comment_changed(&mut self, before: Observed, changed: bool) -> Vec<Action> {
        if changed {
            self.throttle.mark_dirty();
        }
        self.settle(before, changed)
    }

    fn broadcast_presence(&mut self) {
        let cursor = self.controller.last_pointer().map(|p| self.view.screen_to_world(p));
        self.collab.broadcast_presence(cursor, self.controller.selection().ids());
    }

    fn emit_snapshot(&mut self) -> Option<Action> {
        match self.snapshot().to_json() {
            Ok(json) => Some(Action::SaveSnapshot(json)),
            Err(e) => {
                self.throttle.record_result(Err(SaveError::Serialize(e.to_string())));
                None
            }
        }
    }
}

/// The full canvas engine. Wraps [`EngineCore`] and owns the browser canvas
/// element, its 2D surface and the text overlay.
pub struct Engine {
    canvas: HtmlCanvasElement,
    surface: WebSurface,
    overlay: Option<DomTextOverlay>,
    save_callback: Option<js_sys::Function>,
    pub core: EngineCore,
}

impl Engine {
    /// Bind a new engine to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: EngineConfig, board_id: &str) -> Result<Self, RenderError> {
        let surface = WebSurface::from_canvas(&canvas)?;
        Ok(Self { canvas, surface, overlay: None, save_callback: None, core: EngineCore::new(config, board_id) })
    }

    /// Create the text overlay next to the canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM rejects the new element.
    pub fn attach_text_overlay(&mut self) -> Result<(), RenderError> {
        self.overlay = Some(DomTextOverlay::create(&self.canvas)?);
        Ok(())
    }

    /// Called with the snapshot JSON whenever a save is due. A throwing
    /// callback marks the save failed.
    pub fn set_save_callback(&mut self, callback: js_sys::Function) {
        self.save_callback = Some(callback);
    }

    /// Resize the canvas backing store and the view.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        let actions = self.core.set_viewport(width_css, height_css, dpr);
        let viewport = self.core.view().viewport();
        self.canvas.set_width((viewport.width * viewport.pixel_density).round() as u32);
        self.canvas.set_height((viewport.height * viewport.pixel_density).round() as u32);
        self.apply(actions)
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Vec<Action> {
        let actions = self.core.handle_event(event);
        self.apply(actions)
    }

    /// Copy the overlay's text into the edit session; call on its `input`
    /// event.
    pub fn sync_text_draft(&mut self) {
        if let Some(overlay) = &self.overlay {
            self.core.set_text_draft(&overlay.value());
        }
    }

    pub fn commit_text_edit(&mut self) -> Vec<Action> {
        self.sync_text_draft();
        let actions = self.core.commit_text_edit();
        self.apply(actions)
    }

    pub fn cancel_text_edit(&mut self) -> Vec<Action> {
        let actions = self.core.cancel_text_edit();
        self.apply(actions)
    }

    /// Animation frame: draw if dirty, then emit a throttled save if due.
    pub fn frame(&mut self, now_ms: f64) -> Vec<Action> {
        if let Err(e) = self.core.render(&mut self.surface) {
            warn!(error = %e, "render failed");
        }
        let actions = self.core.tick(now_ms);
        self.apply(actions)
    }

    /// Final save and cleanup before the canvas is removed.
    pub fn teardown(&mut self, now_ms: f64) -> Vec<Action> {
        self.sync_text_draft();
        let actions = self.core.teardown(now_ms);
        self.apply(actions)
    }

    /// Carry out the actions the engine can perform itself and hand all of
    /// them back for the host.
    fn apply(&mut self, actions: Vec<Action>) -> Vec<Action> {
        for action in &actions {
            let result = match action {
                Action::SetCursor(cursor) => crate::web::set_cursor(&self.canvas, cursor),
                Action::ShowTextEditor(placement) => self.overlay.as_mut().map_or(Ok(()), |o| o.show(placement)),
                Action::HideTextEditor => self.overlay.as_mut().map_or(Ok(()), |o| o.hide()),
                Action::SaveSnapshot(json) => {
                    if let Some(callback) = &self.save_callback {
                        let outcome = crate::web::call_save(callback, json);
                        self.core.save_finished(outcome);
                    }
                    Ok(())
                }
                Action::RenderNeeded | Action::HistoryChanged { .. } | Action::SelectionChanged(_) => Ok(()),
            };
            if let Err(e) = result {
                warn!(error = %e, "host effect failed");
            }
        }
        actions
    }
}
