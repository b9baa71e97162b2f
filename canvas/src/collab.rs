//! Collaboration adapter: merges remote edits and presence into local state.
//!
//! DESIGN
//! ======
//! The adapter defines a local merge contract only; the wire protocol
//! belongs to whatever [`CollabTransport`] the host connects. Remote ops
//! are applied straight to the [`SceneGraph`] and never reach the command
//! history, so local undo only ever reverts local work. The engine drains
//! the scene journal around [`CollaborationAdapter::receive`] so remote
//! changes are not broadcast back.
//!
//! Conflict policy is last-writer-wins per object: an `Upsert` replaces the
//! whole object and keeps its z position.

#[cfg(test)]
#[path = "collab_test.rs"]
mod collab_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::camera::Point;
use crate::doc::{BoardObject, ObjectId, ObjectPatch};
use crate::error::CollabError;
use crate::scene::{SceneEvent, SceneGraph};

pub type ParticipantId = String;

/// Another participant's cursor and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePresence {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub name: String,
    /// CSS color used for the cursor and selection outlines.
    #[serde(default)]
    pub color: String,
    /// Cursor in world coordinates; `None` while off-canvas.
    #[serde(default)]
    pub cursor: Option<Point>,
    #[serde(default)]
    pub selection: Vec<ObjectId>,
}

/// A scene change made by another participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RemoteOp {
    /// Create the object, or replace it in place if the id exists.
    Upsert { object: BoardObject },
    Update { id: ObjectId, patch: ObjectPatch },
    Remove { id: ObjectId },
}

/// Everything that crosses the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum CollabMessage {
    Op { from: ParticipantId, op: RemoteOp },
    Presence { presence: RemotePresence },
    Leave { participant_id: ParticipantId },
}

impl CollabMessage {
    fn sender(&self) -> &str {
        match self {
            Self::Op { from, .. } => from,
            Self::Presence { presence } => &presence.participant_id,
            Self::Leave { participant_id } => participant_id,
        }
    }
}

/// Outbound channel supplied by the host.
pub trait CollabTransport {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::Send`] when the message could not be queued.
    fn send(&mut self, message: &CollabMessage) -> Result<(), CollabError>;
}

/// Merges remote ops and tracks remote presence.
pub struct CollaborationAdapter {
    participant_id: ParticipantId,
    name: String,
    color: String,
    transport: Option<Box<dyn CollabTransport>>,
    presences: BTreeMap<ParticipantId, RemotePresence>,
}

impl std::fmt::Debug for CollaborationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborationAdapter")
            .field("participant_id", &self.participant_id)
            .field("connected", &self.transport.is_some())
            .field("presences", &self.presences.len())
            .finish_non_exhaustive()
    }
}

impl CollaborationAdapter {
    #[must_use]
    pub fn new(participant_id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            name: name.into(),
            color: color.into(),
            transport: None,
            presences: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Display name and color sent with our presence.
    pub fn set_identity(&mut self, name: impl Into<String>, color: impl Into<String>) {
        self.name = name.into();
        self.color = color.into();
    }

    /// Attach a transport, replacing any previous one.
    pub fn connect(&mut self, transport: Box<dyn CollabTransport>) {
        self.transport = Some(transport);
    }

    /// Drop the transport and forget every remote participant. Sends a
    /// best-effort `Leave` first. Returns whether presence was cleared.
    pub fn disconnect(&mut self) -> bool {
        if let Some(mut transport) = self.transport.take() {
            let leave = CollabMessage::Leave { participant_id: self.participant_id.clone() };
            if let Err(e) = transport.send(&leave) {
                debug!(error = %e, "leave message not sent");
            }
        }
        let had_presence = !self.presences.is_empty();
        self.presences.clear();
        had_presence
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Remote participants ordered by id.
    #[must_use]
    pub fn remote_presences(&self) -> Vec<&RemotePresence> {
        self.presences.values().collect()
    }

    /// Apply an inbound message. Returns whether the scene or presence
    /// changed. Messages echoing our own participant id and messages
    /// arriving while disconnected are ignored.
    pub fn receive(&mut self, message: CollabMessage, scene: &mut SceneGraph) -> bool {
        if !self.is_connected() {
            debug!("collaboration message ignored while disconnected");
            return false;
        }
        if message.sender() == self.participant_id {
            return false;
        }
        match message {
            CollabMessage::Op { from, op } => apply_remote_op(&from, op, scene),
            CollabMessage::Presence { presence } => {
                let changed = self.presences.get(&presence.participant_id) != Some(&presence);
                self.presences.insert(presence.participant_id.clone(), presence);
                changed
            }
            CollabMessage::Leave { participant_id } => self.presences.remove(&participant_id).is_some(),
        }
    }

    /// Forward local scene changes. Returns the number of messages sent;
    /// send failures are logged and the rest are still attempted.
    pub fn broadcast_local(&mut self, events: &[SceneEvent], scene: &SceneGraph) -> usize {
        if self.transport.is_none() || events.is_empty() {
            return 0;
        }
        let mut sent = 0;
        for op in events.iter().flat_map(|e| ops_for_event(e, scene)) {
            let from = self.participant_id.clone();
            if self.send(CollabMessage::Op { from, op }) {
                sent += 1;
            }
        }
        sent
    }

    /// Publish our cursor and selection. Returns whether it was sent.
    pub fn broadcast_presence(&mut self, cursor: Option<Point>, selection: &[ObjectId]) -> bool {
        if self.transport.is_none() {
            return false;
        }
        let presence = RemotePresence {
            participant_id: self.participant_id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            cursor,
            selection: selection.to_vec(),
        };
        self.send(CollabMessage::Presence { presence })
    }

    fn send(&mut self, message: CollabMessage) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(&message) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "collaboration send failed");
                false
            }
        }
    }
}

fn apply_remote_op(from: &str, op: RemoteOp, scene: &mut SceneGraph) -> bool {
    match op {
        RemoteOp::Upsert { object } => upsert(from, object, scene),
        RemoteOp::Update { id, patch } => {
            if scene.get_object(&id).is_none() {
                debug!(%id, from, "remote update for unknown object");
                return false;
            }
            let before = scene.get_object(&id).cloned();
            match scene.update_object(&id, &patch) {
                Ok(()) => scene.get_object(&id).cloned() != before,
                Err(e) => {
                    warn!(%id, from, error = %e, "remote update rejected");
                    false
                }
            }
        }
        RemoteOp::Remove { id } => scene.remove_object(&id).is_some(),
    }
}

fn upsert(from: &str, object: BoardObject, scene: &mut SceneGraph) -> bool {
    let id = object.id;
    let result = match scene.get_object(&id) {
        None => scene.add_object(object),
        Some(existing) if *existing == object => return false,
        // Whole-object replace so fields the sender cleared stay cleared.
        Some(_) => scene.replace_object(object),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(%id, from, error = %e, "remote upsert rejected");
            false
        }
    }
}

fn ops_for_event(event: &SceneEvent, scene: &SceneGraph) -> Vec<RemoteOp> {
    match event {
        SceneEvent::Add(object) | SceneEvent::Update(object) => vec![RemoteOp::Upsert { object: object.clone() }],
        SceneEvent::Remove { object, .. } => vec![RemoteOp::Remove { id: object.id }],
        SceneEvent::Reset { previous, current } => {
            let removed = previous
                .iter()
                .filter(|o| !current.contains(&o.id))
                .map(|o| RemoteOp::Remove { id: o.id });
            let upserted = current
                .iter()
                .filter_map(|id| scene.get_object(id))
                .map(|o| RemoteOp::Upsert { object: o.clone() });
            removed.chain(upserted).collect()
        }
    }
}
