//! Command history: reversible scene edits with undo/redo.
//!
//! DESIGN
//! ======
//! A [`Command`] stores the before/after state it needs, so its forward and
//! inverse applications are pure functions of that data: no clocks, no ids
//! minted at apply time. Both directions go through the scene's public
//! mutation API. A failed step inside a batch rolls back the steps that
//! already ran, so the scene never holds half a command.
//!
//! History is capped at a configurable number of entries; the oldest entry
//! falls off first.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use tracing::warn;

use crate::consts::HISTORY_LIMIT;
use crate::doc::{BoardObject, ObjectId};
use crate::error::{CommandError, SceneError};
use crate::notify::{ListenerId, Listeners};
use crate::scene::SceneGraph;

/// A reversible unit of change against the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Append `object` on top.
    Create { object: BoardObject },
    /// Remove `object`, which sits at z position `index`.
    Delete { object: BoardObject, index: usize },
    /// Replace `before` with `after` (same id, same kind).
    Update { before: BoardObject, after: BoardObject },
    /// Several commands applied as one undo step.
    Batch { label: String, commands: Vec<Command> },
}

impl Command {
    /// Build a delete command from the scene's current state.
    #[must_use]
    pub fn delete(scene: &SceneGraph, id: &ObjectId) -> Option<Self> {
        let index = scene.index_of(id)?;
        let object = scene.get_object(id)?.clone();
        Some(Self::Delete { object, index })
    }

    /// Short description for logs and UI.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
            Self::Batch { label, .. } => label,
        }
    }

    /// Whether applying this command would change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Update { before, after } => before == after,
            Self::Batch { commands, .. } => commands.iter().all(Self::is_noop),
            Self::Create { .. } | Self::Delete { .. } => false,
        }
    }

    /// Check structural invariants. Malformed commands trip a debug
    /// assertion in development builds.
    fn validate(&self) -> Result<(), CommandError> {
        match self {
            Self::Update { before, after } => {
                let ok = before.id == after.id && before.kind() == after.kind();
                debug_assert!(ok, "update command must keep id and kind");
                if ok { Ok(()) } else { Err(CommandError::Malformed("update changes id or kind")) }
            }
            Self::Batch { commands, .. } => commands.iter().try_for_each(Self::validate),
            Self::Create { .. } | Self::Delete { .. } => Ok(()),
        }
    }

    fn apply_forward(&self, scene: &mut SceneGraph) -> Result<(), CommandError> {
        match self {
            Self::Create { object } => scene.add_object(object.clone())?,
            Self::Delete { object, .. } => {
                if scene.remove_object(&object.id).is_none() {
                    return Err(SceneError::NotFound(object.id).into());
                }
            }
            Self::Update { after, .. } => scene.replace_object(after.clone())?,
            Self::Batch { commands, .. } => {
                for (done, cmd) in commands.iter().enumerate() {
                    if let Err(e) = cmd.apply_forward(scene) {
                        rollback(&commands[..done], scene, Direction::Forward);
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_inverse(&self, scene: &mut SceneGraph) -> Result<(), CommandError> {
        match self {
            Self::Create { object } => {
                if scene.remove_object(&object.id).is_none() {
                    return Err(SceneError::NotFound(object.id).into());
                }
            }
            Self::Delete { object, index } => scene.insert_object(*index, object.clone())?,
            Self::Update { before, .. } => scene.replace_object(before.clone())?,
            Self::Batch { commands, .. } => {
                for (done, cmd) in commands.iter().rev().enumerate() {
                    if let Err(e) = cmd.apply_inverse(scene) {
                        let undone = &commands[commands.len() - done..];
                        rollback(undone, scene, Direction::Inverse);
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Inverse,
}

/// Undo the effect of `applied` after a later step failed.
fn rollback(applied: &[Command], scene: &mut SceneGraph, direction: Direction) {
    let result = match direction {
        Direction::Forward => applied.iter().rev().try_for_each(|cmd| cmd.apply_inverse(scene)),
        Direction::Inverse => applied.iter().try_for_each(|cmd| cmd.apply_forward(scene)),
    };
    if let Err(e) = result {
        warn!(error = %e, "batch rollback failed; scene may diverge from history");
    }
}

/// Summary delivered to history subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    pub undo_len: usize,
    pub redo_len: usize,
}

impl HistoryState {
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_len > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redo_len > 0
    }
}

/// Bounded undo/redo stacks.
#[derive(Debug)]
pub struct CommandStack {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    limit: usize,
    listeners: Listeners<HistoryState>,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl CommandStack {
    /// Empty history keeping at most `limit` undo steps (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), limit: limit.max(1), listeners: Listeners::new() }
    }

    /// Apply `command`, push it onto the undo stack and clear the redo tail.
    /// No-op commands are not recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is malformed or the scene rejects it;
    /// the scene and history are then unchanged.
    pub fn execute(&mut self, command: Command, scene: &mut SceneGraph) -> Result<(), CommandError> {
        command.validate()?;
        if command.is_noop() {
            return Ok(());
        }
        command.apply_forward(scene)?;
        self.undo.push_back(command);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
        self.notify();
        Ok(())
    }

    /// Revert the most recent command. Returns `Ok(false)` on an empty
    /// stack.
    ///
    /// # Errors
    ///
    /// If the inverse no longer applies (for example a remote participant
    /// deleted the object), the entry is dropped and the error returned.
    pub fn undo(&mut self, scene: &mut SceneGraph) -> Result<bool, CommandError> {
        let Some(command) = self.undo.pop_back() else {
            return Ok(false);
        };
        let result = command.apply_inverse(scene);
        match result {
            Ok(()) => self.redo.push(command),
            Err(ref e) => warn!(error = %e, label = command.label(), "undo failed; dropping entry"),
        }
        self.notify();
        result.map(|()| true)
    }

    /// Reapply the most recently undone command. Returns `Ok(false)` when
    /// there is nothing to redo.
    ///
    /// # Errors
    ///
    /// If the command no longer applies, the entry is dropped and the error
    /// returned.
    pub fn redo(&mut self, scene: &mut SceneGraph) -> Result<bool, CommandError> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        let result = command.apply_forward(scene);
        match result {
            Ok(()) => self.undo.push_back(command),
            Err(ref e) => warn!(error = %e, label = command.label(), "redo failed; dropping entry"),
        }
        self.notify();
        result.map(|()| true)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub fn state(&self) -> HistoryState {
        HistoryState { undo_len: self.undo.len(), redo_len: self.redo.len() }
    }

    /// The most recent undoable command.
    #[must_use]
    pub fn last(&self) -> Option<&Command> {
        self.undo.back()
    }

    /// Forget all history (e.g. after a snapshot load).
    pub fn clear(&mut self) {
        if self.undo.is_empty() && self.redo.is_empty() {
            return;
        }
        self.undo.clear();
        self.redo.clear();
        self.notify();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryState) + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&mut self) {
        let state = self.state();
        self.listeners.emit(&state);
    }
}
