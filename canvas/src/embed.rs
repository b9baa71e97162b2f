//! Host document embedding: board identity, element height and throttled
//! persistence.
//!
//! DESIGN
//! ======
//! The host editor owns storage. The engine only tells it when a snapshot
//! is due: [`SnapshotThrottle`] collapses bursts of changes into at most one
//! save per interval and forces a final save on teardown. A failed save
//! keeps the board marked pending so the next poll or flush retries it.

#[cfg(test)]
#[path = "embed_test.rs"]
mod embed_test;

use tracing::warn;

use crate::config::EngineConfig;
use crate::consts::{MAX_EMBED_HEIGHT, MIN_EMBED_HEIGHT};
use crate::error::SaveError;

/// Identity and size of the board inside the host document.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedHost {
    board_id: String,
    height: f64,
    min_height: f64,
    max_height: f64,
}

impl EmbedHost {
    /// `height` is clamped into the configured embed range. An unordered
    /// range falls back to the default one.
    #[must_use]
    pub fn new(board_id: impl Into<String>, height: f64, config: &EngineConfig) -> Self {
        let (min_height, max_height) = if config.min_embed_height <= config.max_embed_height {
            (config.min_embed_height, config.max_embed_height)
        } else {
            (MIN_EMBED_HEIGHT, MAX_EMBED_HEIGHT)
        };
        let mut host = Self { board_id: board_id.into(), height: min_height, min_height, max_height };
        host.set_height(height);
        host
    }

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Height in CSS pixels.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Resize the embed. Non-finite input falls back to the minimum.
    /// Returns the applied height.
    pub fn set_height(&mut self, height: f64) -> f64 {
        self.height = if height.is_finite() {
            height.clamp(self.min_height, self.max_height)
        } else {
            self.min_height
        };
        self.height
    }
}

/// Outcome of the most recent save.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SaveStatus {
    /// Nothing has changed since load.
    #[default]
    Clean,
    /// Changes are waiting for the next save.
    Pending,
    /// The host accepted the snapshot emitted at `at_ms`.
    Saved { at_ms: f64 },
    /// The host rejected the last snapshot; it will be retried.
    NotSaved(String),
}

/// Rate limiter for snapshot saves.
#[derive(Debug, Clone)]
pub struct SnapshotThrottle {
    interval_ms: f64,
    pending: bool,
    last_emit_ms: Option<f64>,
    status: SaveStatus,
}

impl SnapshotThrottle {
    #[must_use]
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms: interval_ms.max(0.0), pending: false, last_emit_ms: None, status: SaveStatus::Clean }
    }

    /// Record that the board changed.
    pub fn mark_dirty(&mut self) {
        self.pending = true;
        if !matches!(self.status, SaveStatus::NotSaved(_)) {
            self.status = SaveStatus::Pending;
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    /// Whether a snapshot should be emitted now. Emits on the first change
    /// and then at most once per interval while changes keep arriving.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if !self.pending {
            return false;
        }
        if let Some(last) = self.last_emit_ms {
            if now_ms - last < self.interval_ms {
                return false;
            }
        }
        self.emit(now_ms);
        true
    }

    /// Emit regardless of the interval or pending state. Used on teardown.
    pub fn flush(&mut self, now_ms: f64) {
        self.emit(now_ms);
    }

    /// Apply the host's answer for the snapshot emitted last.
    pub fn record_result(&mut self, result: Result<(), SaveError>) {
        match result {
            Ok(()) => {
                if !self.pending {
                    self.status = SaveStatus::Saved { at_ms: self.last_emit_ms.unwrap_or_default() };
                }
            }
            Err(e) => {
                warn!(error = %e, "snapshot save failed; will retry");
                self.pending = true;
                self.status = SaveStatus::NotSaved(e.to_string());
            }
        }
    }

    fn emit(&mut self, now_ms: f64) {
        self.pending = false;
        self.last_emit_ms = Some(now_ms);
    }
}
