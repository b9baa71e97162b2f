//! Comment threads anchored to board objects or positions.
//!
//! DESIGN
//! ======
//! Comments live outside the scene and never enter the command history.
//! An anchor names an object while it exists. When the scene reports the
//! object removed, the anchor degrades to the object's last top-left bounds
//! corner and remembers the id it came from; if that id is added back (an
//! undone delete, a remote upsert) the anchor re-attaches.

#[cfg(test)]
#[path = "comments_test.rs"]
mod comments_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::doc::ObjectId;
use crate::error::CommentError;
use crate::notify::{ListenerId, Listeners};
use crate::scene::{SceneEvent, SceneGraph};

pub type CommentId = Uuid;

/// Where a comment is pinned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Anchor {
    /// Follows a live object.
    Object { object_id: ObjectId },
    /// Fixed world position. `detached_from` is set when the anchor degraded
    /// from an object that was removed.
    Position {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detached_from: Option<ObjectId>,
    },
}

impl Anchor {
    #[must_use]
    pub fn at(point: Point) -> Self {
        Self::Position { x: point.x, y: point.y, detached_from: None }
    }

    /// Object this anchor follows, if still attached.
    #[must_use]
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Object { object_id } => Some(*object_id),
            Self::Position { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub anchor: Anchor,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub resolved: bool,
    /// Milliseconds since the epoch, supplied by the caller.
    #[serde(default)]
    pub created_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentEvent {
    Added(Comment),
    /// Resolved flag or anchor changed; carries the new state.
    Updated(Comment),
    Removed(CommentId),
    /// The whole set was replaced by `load_comments`.
    Reloaded,
}

/// Comment store in creation order.
#[derive(Debug, Default)]
pub struct CommentSystem {
    comments: Vec<Comment>,
    listeners: Listeners<CommentEvent>,
}

impl CommentSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a comment and return its id.
    pub fn add_comment(
        &mut self,
        anchor: Anchor,
        author: impl Into<String>,
        text: impl Into<String>,
        now_ms: f64,
    ) -> CommentId {
        let comment = Comment {
            id: Uuid::new_v4(),
            anchor,
            author: author.into(),
            text: text.into(),
            resolved: false,
            created_at: now_ms,
        };
        let id = comment.id;
        self.listeners.emit(&CommentEvent::Added(comment.clone()));
        self.comments.push(comment);
        id
    }

    /// Mark a comment resolved. Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn resolve_comment(&mut self, id: CommentId) -> Result<bool, CommentError> {
        self.set_resolved(id, true)
    }

    /// Clear the resolved flag. Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn reopen_comment(&mut self, id: CommentId) -> Result<bool, CommentError> {
        self.set_resolved(id, false)
    }

    /// Remove a comment and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CommentError::NotFound`] for an unknown id.
    pub fn delete_comment(&mut self, id: CommentId) -> Result<Comment, CommentError> {
        let pos = self.comments.iter().position(|c| c.id == id).ok_or(CommentError::NotFound(id))?;
        let removed = self.comments.remove(pos);
        self.listeners.emit(&CommentEvent::Removed(id));
        Ok(removed)
    }

    #[must_use]
    pub fn get_comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn get_all_comments(&self) -> &[Comment] {
        &self.comments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Replace every comment. Later duplicates of an id are dropped.
    pub fn load_comments(&mut self, comments: Vec<Comment>) {
        self.comments.clear();
        for comment in comments {
            if self.get_comment(comment.id).is_some() {
                tracing::warn!(id = %comment.id, "duplicate comment id in load; keeping first");
                continue;
            }
            self.comments.push(comment);
        }
        self.listeners.emit(&CommentEvent::Reloaded);
    }

    /// World position of a comment's pin: the anchored object's top-left
    /// bounds corner, or the stored position. `None` for an unknown comment
    /// or an object anchor whose object is not in `scene`.
    #[must_use]
    pub fn anchor_position(&self, id: CommentId, scene: &SceneGraph) -> Option<Point> {
        match &self.get_comment(id)?.anchor {
            Anchor::Object { object_id } => {
                let b = scene.get_object(object_id)?.bounds();
                Some(Point::new(b.x, b.y))
            }
            Anchor::Position { x, y, .. } => Some(Point::new(*x, *y)),
        }
    }

    /// Keep anchors consistent with a scene change. Returns whether any
    /// comment changed.
    pub fn on_scene_event(&mut self, event: &SceneEvent) -> bool {
        let mut changed = Vec::new();
        match event {
            SceneEvent::Remove { object, .. } => {
                let b = object.bounds();
                changed.extend(self.detach(object.id, Point::new(b.x, b.y)));
            }
            SceneEvent::Add(object) => changed.extend(self.reattach(object.id)),
            SceneEvent::Update(_) => {}
            SceneEvent::Reset { previous, current } => {
                for object in previous.iter().filter(|o| !current.contains(&o.id)) {
                    let b = object.bounds();
                    changed.extend(self.detach(object.id, Point::new(b.x, b.y)));
                }
                for id in current {
                    changed.extend(self.reattach(*id));
                }
            }
        }
        for comment in &changed {
            self.listeners.emit(&CommentEvent::Updated(comment.clone()));
        }
        !changed.is_empty()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&CommentEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn set_resolved(&mut self, id: CommentId, resolved: bool) -> Result<bool, CommentError> {
        let comment = self.comments.iter_mut().find(|c| c.id == id).ok_or(CommentError::NotFound(id))?;
        if comment.resolved == resolved {
            return Ok(false);
        }
        comment.resolved = resolved;
        let snapshot = comment.clone();
        self.listeners.emit(&CommentEvent::Updated(snapshot));
        Ok(true)
    }

    fn detach(&mut self, object_id: ObjectId, at: Point) -> Vec<Comment> {
        let mut changed = Vec::new();
        for comment in &mut self.comments {
            if comment.anchor.object_id() == Some(object_id) {
                comment.anchor = Anchor::Position { x: at.x, y: at.y, detached_from: Some(object_id) };
                changed.push(comment.clone());
            }
        }
        changed
    }

    fn reattach(&mut self, object_id: ObjectId) -> Vec<Comment> {
        let mut changed = Vec::new();
        for comment in &mut self.comments {
            if matches!(comment.anchor, Anchor::Position { detached_from: Some(from), .. } if from == object_id) {
                comment.anchor = Anchor::Object { object_id };
                changed.push(comment.clone());
            }
        }
        changed
    }
}
