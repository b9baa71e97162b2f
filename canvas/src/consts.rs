//! Shared numeric constants for the canvas crate.

// ── View ────────────────────────────────────────────────────────

/// Smallest zoom factor the view accepts by default.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the view accepts by default.
pub const MAX_ZOOM: f64 = 8.0;

/// Zoom multiplier applied per wheel notch when zooming with ctrl/meta held.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Geometry ────────────────────────────────────────────────────

/// Degenerate bounds are widened to at least this many world units.
pub const MIN_BOUNDS_SIZE: f64 = 1.0;

/// Drags smaller than this (world units, both axes) create nothing.
pub const MIN_SHAPE_SIZE: f64 = 1.0;

/// Path samples closer than this to the previous point are dropped.
pub const PATH_MIN_SAMPLE_DIST: f64 = 0.5;

/// Box given to a text object created by a single click, in world units.
pub const NEW_TEXT_WIDTH: f64 = 200.0;
pub const NEW_TEXT_HEIGHT: f64 = 24.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles and thin strokes.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

// ── Rendering ───────────────────────────────────────────────────

/// Arrowhead length in world units.
pub const ARROW_HEAD_SIZE: f64 = 12.0;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Half-size of a drawn resize handle in screen pixels.
pub const HANDLE_DRAW_PX: f64 = 4.0;

/// Remote cursor arrow size in screen pixels.
pub const CURSOR_SIZE_PX: f64 = 14.0;

/// Selection dash segment length in screen pixels.
pub const SELECTION_DASH_PX: f64 = 4.0;

/// Line height as a multiple of font size for multi-line text.
pub const TEXT_LINE_HEIGHT: f64 = 1.25;

/// Canvas background color.
pub const BACKGROUND_COLOR: &str = "#FFFFFF";

/// Local selection accent color.
pub const SELECTION_COLOR: &str = "#1E90FF";

// ── Snapshot / embedding ────────────────────────────────────────

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: &str = "1";

/// Default command history cap.
pub const HISTORY_LIMIT: usize = 200;

/// Minimum interval between throttled snapshot saves.
pub const SNAPSHOT_THROTTLE_MS: f64 = 1000.0;

/// Embedded board height bounds in CSS pixels.
pub const MIN_EMBED_HEIGHT: f64 = 200.0;
pub const MAX_EMBED_HEIGHT: f64 = 800.0;
