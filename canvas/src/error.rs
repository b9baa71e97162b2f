//! Error types shared across the engine.
//!
//! Each subsystem owns one `thiserror` enum. Callers at the host boundary
//! match on these; nothing inside the engine panics on bad input.

use crate::comments::CommentId;
use crate::doc::ObjectId;

/// Failure applying a mutation to the scene graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("object already exists: {0}")]
    DuplicateId(ObjectId),
    #[error("object not found: {0}")]
    NotFound(ObjectId),
    #[error("object {0} does not carry text")]
    NotText(ObjectId),
}

/// Failure executing, undoing or redoing a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("scene rejected command: {0}")]
    Scene(#[from] SceneError),
    #[error("malformed command: {0}")]
    Malformed(&'static str),
}

/// Failure issuing draw calls to a surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("surface call failed: {0}")]
    Surface(String),
}

/// Failure at the snapshot string boundary.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid zoom range: min {min} must be positive and below max {max}")]
    ZoomRange { min: f64, max: f64 },
    #[error("invalid embed height range: min {min} must be below max {max}")]
    HeightRange { min: f64, max: f64 },
    #[error("history_limit must be at least 1")]
    HistoryLimit,
}

/// Failure reported by a collaboration transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollabError {
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Failure reported by the host while persisting a snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SaveError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(String),
    #[error("host rejected snapshot: {0}")]
    Host(String),
}

/// Failure looking up a comment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommentError {
    #[error("comment not found: {0}")]
    NotFound(CommentId),
}
