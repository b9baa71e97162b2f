//! Text editing bridge between canvas-rendered text objects and a DOM
//! overlay.
//!
//! DESIGN
//! ======
//! The canvas cannot host a caret, so editing happens in a platform text
//! field positioned over the object. The bridge owns the edit session: which
//! object is edited, the draft text, and whether the object was created for
//! this edit. Nothing reaches history until [`TextEditBridge::commit`], which
//! executes exactly one command. A text object created by the text tool sits
//! in the scene transiently and is removed again on cancel, so a cancelled
//! edit leaves no net mutation.
//!
//! The platform side is the [`TextOverlay`] trait; the browser implementation
//! lives in [`crate::web`].

#[cfg(test)]
#[path = "text_edit_test.rs"]
mod text_edit_test;

use tracing::warn;

use crate::camera::{Rect, ViewTransform};
use crate::consts::TEXT_LINE_HEIGHT;
use crate::doc::{BoardObject, ObjectId, ObjectPatch};
use crate::error::{CommandError, RenderError, SceneError};
use crate::history::{Command, CommandStack};
use crate::notify::{ListenerId, Listeners};
use crate::scene::SceneGraph;

/// Where and how the overlay should appear, in canvas CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub id: ObjectId,
    /// Screen rectangle covering the object.
    pub rect: Rect,
    /// Current draft text.
    pub text: String,
    /// Font size in CSS pixels (style size times zoom).
    pub font_size_px: f64,
    pub font_family: String,
    pub color: String,
}

/// Overlay lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum TextEditEvent {
    Show(TextPlacement),
    Hide,
}

/// Platform text field shown over the canvas while editing.
pub trait TextOverlay {
    /// Show (or move) the field at `placement` and focus it.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the update.
    fn show(&mut self, placement: &TextPlacement) -> Result<(), RenderError>;

    /// Hide the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the update.
    fn hide(&mut self) -> Result<(), RenderError>;

    /// The field's current contents.
    fn value(&self) -> String;
}

#[derive(Debug, Clone)]
struct Session {
    id: ObjectId,
    /// The transient object when the edit created it.
    created: Option<BoardObject>,
    draft: String,
}

/// Owns the active text edit session.
#[derive(Debug, Default)]
pub struct TextEditBridge {
    session: Option<Session>,
    placement: Option<TextPlacement>,
    listeners: Listeners<TextEditEvent>,
}

impl TextEditBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin editing an existing text object. Any edit already in progress
    /// is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] or [`SceneError::NotText`].
    pub fn start_edit(
        &mut self,
        id: ObjectId,
        scene: &mut SceneGraph,
        view: &ViewTransform,
    ) -> Result<TextPlacement, SceneError> {
        let obj = scene.get_object(&id).ok_or(SceneError::NotFound(id))?;
        let draft = obj.text_content().ok_or(SceneError::NotText(id))?.to_owned();
        self.cancel(scene);
        self.session = Some(Session { id, created: None, draft });
        self.show(scene, view).ok_or(SceneError::NotFound(id))
    }

    /// Place a new, empty text object transiently and begin editing it.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotText`] for non-text objects and
    /// [`SceneError::DuplicateId`] if the id is taken.
    pub fn start_new(
        &mut self,
        object: BoardObject,
        scene: &mut SceneGraph,
        view: &ViewTransform,
    ) -> Result<TextPlacement, SceneError> {
        let id = object.id;
        let draft = object.text_content().ok_or(SceneError::NotText(id))?.to_owned();
        self.cancel(scene);
        scene.add_object(object.clone())?;
        self.session = Some(Session { id, created: Some(object), draft });
        self.show(scene, view).ok_or(SceneError::NotFound(id))
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn editing_id(&self) -> Option<ObjectId> {
        self.session.as_ref().map(|s| s.id)
    }

    #[must_use]
    pub fn draft(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.draft.as_str())
    }

    /// Replace the draft with the overlay's current contents.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let Some(session) = &mut self.session {
            session.draft = text.into();
            if let Some(p) = &mut self.placement {
                p.text.clone_from(&session.draft);
            }
        }
    }

    /// Current overlay placement while editing.
    #[must_use]
    pub fn placement(&self) -> Option<&TextPlacement> {
        self.placement.as_ref()
    }

    /// Recompute the placement after the view or the object moved. Ends the
    /// session if the object disappeared (e.g. a remote delete).
    pub fn reposition(&mut self, scene: &mut SceneGraph, view: &ViewTransform) -> Option<TextPlacement> {
        let id = self.editing_id()?;
        if scene.get_object(&id).is_none() {
            warn!(%id, "edited text object vanished; ending edit");
            self.end();
            return None;
        }
        self.show(scene, view)
    }

    /// Finish the session and record its effect as one command. Returns
    /// whether a command was executed.
    ///
    /// # Errors
    ///
    /// Propagates a command failure; the session ends either way.
    pub fn commit(&mut self, scene: &mut SceneGraph, history: &mut CommandStack) -> Result<bool, CommandError> {
        let Some(session) = self.session.take() else {
            return Ok(false);
        };
        self.end();

        if let Some(created) = session.created {
            // The transient object leaves the scene either way; the command
            // re-adds it with its final text.
            let current = scene.remove_object(&session.id).unwrap_or(created);
            if session.draft.trim().is_empty() {
                return Ok(false);
            }
            let object = with_text(current, &session.draft);
            history.execute(Command::Create { object }, scene)?;
            return Ok(true);
        }

        let Some(before) = scene.get_object(&session.id).cloned() else {
            warn!(id = %session.id, "edited text object vanished before commit");
            return Ok(false);
        };
        if before.text_content() == Some(session.draft.as_str()) {
            return Ok(false);
        }
        let after = with_text(before.clone(), &session.draft);
        history.execute(Command::Update { before, after }, scene)?;
        Ok(true)
    }

    /// Abandon the session. A transient object created for it is removed.
    pub fn cancel(&mut self, scene: &mut SceneGraph) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.created.is_some() {
            scene.remove_object(&session.id);
        }
        self.end();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TextEditEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn show(&mut self, scene: &SceneGraph, view: &ViewTransform) -> Option<TextPlacement> {
        let session = self.session.as_ref()?;
        let obj = scene.get_object(&session.id)?;
        let placement = TextPlacement {
            id: obj.id,
            rect: view.world_rect_to_screen(obj.bounds()),
            text: session.draft.clone(),
            font_size_px: obj.style.font_size * view.zoom(),
            font_family: obj.style.font_family.clone(),
            color: obj.style.stroke.clone(),
        };
        self.placement = Some(placement.clone());
        self.listeners.emit(&TextEditEvent::Show(placement.clone()));
        Some(placement)
    }

    fn end(&mut self) {
        self.session = None;
        if self.placement.take().is_some() {
            self.listeners.emit(&TextEditEvent::Hide);
        }
    }
}

/// `obj` with `text`, its box grown to fit every line.
fn with_text(mut obj: BoardObject, text: &str) -> BoardObject {
    let lines = text.lines().count().max(1);
    #[allow(clippy::cast_precision_loss)]
    let needed = obj.style.font_size * TEXT_LINE_HEIGHT * lines as f64;
    let grow = obj.bounds().height < needed;
    obj.apply_patch(&ObjectPatch {
        text: Some(text.to_owned()),
        height: grow.then_some(needed),
        ..ObjectPatch::default()
    });
    obj
}
