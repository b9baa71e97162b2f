//! Engine configuration.
//!
//! The host passes an optional JSON object when mounting a board; any field
//! left out falls back to the constants in [`crate::consts`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    HANDLE_RADIUS_PX, HISTORY_LIMIT, MAX_EMBED_HEIGHT, MAX_ZOOM, MIN_EMBED_HEIGHT, MIN_ZOOM, SNAPSHOT_THROTTLE_MS,
    WHEEL_ZOOM_STEP,
};
use crate::error::ConfigError;

/// Tuning knobs for one mounted board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower zoom bound.
    pub min_zoom: f64,
    /// Upper zoom bound.
    pub max_zoom: f64,
    /// Maximum number of undo steps kept; the oldest is dropped first.
    pub history_limit: usize,
    /// Hit slop for handles and thin strokes, in screen pixels.
    pub hit_slop_px: f64,
    /// Minimum interval between throttled snapshot saves, in milliseconds.
    pub snapshot_throttle_ms: f64,
    /// Smallest height the host may give the embedded board.
    pub min_embed_height: f64,
    /// Largest height the host may give the embedded board.
    pub max_embed_height: f64,
    /// Zoom multiplier per wheel notch.
    pub wheel_zoom_step: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            history_limit: HISTORY_LIMIT,
            hit_slop_px: HANDLE_RADIUS_PX,
            snapshot_throttle_ms: SNAPSHOT_THROTTLE_MS,
            min_embed_height: MIN_EMBED_HEIGHT,
            max_embed_height: MAX_EMBED_HEIGHT,
            wheel_zoom_step: WHEEL_ZOOM_STEP,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a config from host-provided JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed JSON and the range
    /// variants when [`EngineConfig::validate`] fails.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that ranges are ordered and limits are usable.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0 && self.min_zoom < self.max_zoom) {
            return Err(ConfigError::ZoomRange { min: self.min_zoom, max: self.max_zoom });
        }
        if self.min_embed_height >= self.max_embed_height {
            return Err(ConfigError::HeightRange { min: self.min_embed_height, max: self.max_embed_height });
        }
        if self.history_limit == 0 {
            return Err(ConfigError::HistoryLimit);
        }
        Ok(())
    }
}
