//! Scene graph: the authoritative, z-ordered store of board objects.
//!
//! Objects live in a single `Vec` whose order is the draw order (bottom
//! first); an id→index map gives O(1) lookup and is rebuilt whenever
//! positions shift. Every mutation emits a [`SceneEvent`] to subscribers and
//! records it in an internal journal that the engine drains with
//! [`SceneGraph::take_events`] to fan changes out to the renderer, comments,
//! persistence and collaboration.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use crate::camera::Rect;
use crate::doc::{BoardObject, ObjectId, ObjectPatch};
use crate::error::SceneError;
use crate::notify::{ListenerId, Listeners};

/// A change applied to the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// An object was added (appended or inserted).
    Add(BoardObject),
    /// An object was removed; `object` is its last state and `index` its
    /// former z position.
    Remove { object: BoardObject, index: usize },
    /// An object changed; carries the new state.
    Update(BoardObject),
    /// The whole scene was replaced.
    Reset { previous: Vec<BoardObject>, current: Vec<ObjectId> },
}

impl SceneEvent {
    /// Ids of the objects this event touches.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        match self {
            Self::Add(obj) | Self::Update(obj) | Self::Remove { object: obj, .. } => vec![obj.id],
            Self::Reset { previous, current } => {
                let mut ids: Vec<ObjectId> = previous.iter().map(|o| o.id).collect();
                for id in current {
                    if !ids.contains(id) {
                        ids.push(*id);
                    }
                }
                ids
            }
        }
    }
}

/// In-memory store of board objects in z-order.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<BoardObject>,
    index: HashMap<ObjectId, usize>,
    listeners: Listeners<SceneEvent>,
    journal: Vec<SceneEvent>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object on top of the z-order.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateId`] if a live object has the same id.
    pub fn add_object(&mut self, object: BoardObject) -> Result<(), SceneError> {
        let at = self.objects.len();
        self.insert_object(at, object)
    }

    /// Insert an object at z position `index` (clamped to the top).
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::DuplicateId`] if a live object has the same id.
    pub fn insert_object(&mut self, index: usize, object: BoardObject) -> Result<(), SceneError> {
        if self.index.contains_key(&object.id) {
            return Err(SceneError::DuplicateId(object.id));
        }
        let at = index.min(self.objects.len());
        self.objects.insert(at, object.clone());
        self.reindex_from(at);
        self.emit(SceneEvent::Add(object));
        Ok(())
    }

    /// Remove an object by id, returning it if it was present.
    pub fn remove_object(&mut self, id: &ObjectId) -> Option<BoardObject> {
        let at = self.index.remove(id)?;
        let object = self.objects.remove(at);
        self.reindex_from(at);
        self.emit(SceneEvent::Remove { object: object.clone(), index: at });
        Some(object)
    }

    /// Merge a sparse patch into an existing object. A patch that changes
    /// nothing emits no event.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the object does not exist.
    pub fn update_object(&mut self, id: &ObjectId, patch: &ObjectPatch) -> Result<(), SceneError> {
        let at = *self.index.get(id).ok_or(SceneError::NotFound(*id))?;
        let object = &mut self.objects[at];
        if object.apply_patch(patch) {
            let updated = object.clone();
            self.emit(SceneEvent::Update(updated));
        }
        Ok(())
    }

    /// Swap in a whole new state for an existing object, keeping its z
    /// position. Fields absent from `object` are cleared, and the kind may
    /// change. Replacing with an equal object emits no event.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if the object does not exist.
    pub fn replace_object(&mut self, object: BoardObject) -> Result<(), SceneError> {
        let at = *self.index.get(&object.id).ok_or(SceneError::NotFound(object.id))?;
        if self.objects[at] == object {
            return Ok(());
        }
        self.objects[at] = object.clone();
        self.emit(SceneEvent::Update(object));
        Ok(())
    }

    #[must_use]
    pub fn get_object(&self, id: &ObjectId) -> Option<&BoardObject> {
        self.index.get(id).map(|&at| &self.objects[at])
    }

    /// Z position of an object (0 = bottom).
    #[must_use]
    pub fn index_of(&self, id: &ObjectId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// All objects, bottom to top.
    #[must_use]
    pub fn get_all_objects(&self) -> &[BoardObject] {
        &self.objects
    }

    /// Objects whose bounds intersect `rect` (edges touching count), in
    /// z-order.
    #[must_use]
    pub fn get_objects_in_rect(&self, rect: &Rect) -> Vec<&BoardObject> {
        self.objects.iter().filter(|obj| obj.bounds().intersects(rect)).collect()
    }

    /// Replace the whole scene. Objects repeating an earlier id in the list
    /// are dropped.
    pub fn load_objects(&mut self, objects: Vec<BoardObject>) {
        let previous = std::mem::take(&mut self.objects);
        self.index.clear();
        for obj in objects {
            if self.index.contains_key(&obj.id) {
                tracing::warn!(id = %obj.id, "duplicate object id in load; keeping first");
                continue;
            }
            self.index.insert(obj.id, self.objects.len());
            self.objects.push(obj);
        }
        let current = self.objects.iter().map(|o| o.id).collect();
        self.emit(SceneEvent::Reset { previous, current });
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.load_objects(Vec::new());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SceneEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.journal)
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, obj) in self.objects[start..].iter().enumerate() {
            self.index.insert(obj.id, start + offset);
        }
    }

    fn emit(&mut self, event: SceneEvent) {
        self.listeners.emit(&event);
        self.journal.push(event);
    }
}
