//! Snapshot serialization: the persisted form of a board.
//!
//! A snapshot is `{ version, objects, viewState, comments }` in camelCase
//! JSON. Writing is strict; reading is lenient. Only JSON that fails to
//! parse at the top level is an error. Missing sections default, entries
//! that do not deserialize are skipped with a warning, and the view state is
//! sanitized by [`ViewTransform::set_view_state`].

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::camera::{ViewState, ViewTransform};
use crate::comments::{Comment, CommentSystem};
use crate::consts::SNAPSHOT_VERSION;
use crate::doc::BoardObject;
use crate::error::SnapshotError;
use crate::scene::SceneGraph;

/// Persisted board state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub objects: Vec<BoardObject>,
    pub view_state: ViewState,
    pub comments: Vec<Comment>,
}

impl Snapshot {
    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What [`restore_snapshot`] kept and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    /// Version string found in the input, if any.
    pub version: Option<String>,
    pub objects_loaded: usize,
    pub objects_skipped: usize,
    pub comments_loaded: usize,
    pub comments_skipped: usize,
    /// View state as read from the input, before the current viewport was
    /// kept. Defaults when missing or malformed.
    pub view_state: ViewState,
    pub view_defaulted: bool,
}

impl RestoreReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.objects_skipped == 0 && self.comments_skipped == 0 && !self.view_defaulted
    }
}

/// Capture the current board.
#[must_use]
pub fn create_snapshot(scene: &SceneGraph, view: &ViewTransform, comments: &CommentSystem) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION.to_owned(),
        objects: scene.get_all_objects().to_vec(),
        view_state: view.view_state(),
        comments: comments.get_all_comments().to_vec(),
    }
}

/// Parse a snapshot string into a JSON value for [`restore_snapshot`].
///
/// # Errors
///
/// Returns [`SnapshotError::Json`] if `raw` is not valid JSON.
pub fn parse_snapshot(raw: &str) -> Result<Value, SnapshotError> {
    Ok(serde_json::from_str(raw)?)
}

/// Replace scene, view and comments with the contents of `value`.
///
/// The current viewport size is kept since it belongs to the host element,
/// not the board. Never fails; everything unusable is reported instead.
pub fn restore_snapshot(
    value: &Value,
    scene: &mut SceneGraph,
    view: &mut ViewTransform,
    comments: &mut CommentSystem,
) -> RestoreReport {
    let mut report = RestoreReport::default();
    if !value.is_object() {
        warn!("snapshot is not a JSON object; loading an empty board");
    }

    report.version = value.get("version").and_then(Value::as_str).map(str::to_owned);
    match report.version.as_deref() {
        Some(SNAPSHOT_VERSION) => {}
        Some(other) => warn!(version = other, "unknown snapshot version; loading leniently"),
        None => warn!("snapshot has no version; loading leniently"),
    }

    let (objects, skipped) = read_entries::<BoardObject>(value.get("objects"), "object");
    report.objects_skipped = skipped;
    scene.load_objects(objects);
    report.objects_loaded = scene.len();
    report.objects_skipped += report_duplicates(skipped, report.objects_loaded, value.get("objects"));

    match value.get("viewState").map(|v| serde_json::from_value::<ViewState>(v.clone())) {
        Some(Ok(state)) => report.view_state = state,
        Some(Err(e)) => {
            warn!(error = %e, "malformed viewState; using default view");
            report.view_defaulted = true;
        }
        None => report.view_defaulted = true,
    }
    let mut state = report.view_state;
    state.viewport = view.viewport();
    view.set_view_state(state);

    let (loaded, skipped) = read_entries::<Comment>(value.get("comments"), "comment");
    report.comments_skipped = skipped;
    comments.load_comments(loaded);
    report.comments_loaded = comments.len();
    report.comments_skipped += report_duplicates(skipped, report.comments_loaded, value.get("comments"));

    report
}

/// Deserialize each array element on its own, skipping the bad ones.
fn read_entries<T: serde::de::DeserializeOwned>(section: Option<&Value>, what: &str) -> (Vec<T>, usize) {
    let Some(section) = section else {
        return (Vec::new(), 0);
    };
    let Some(entries) = section.as_array() else {
        warn!(kind = what, "snapshot section is not an array; ignoring it");
        return (Vec::new(), 0);
    };
    let mut out = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<T>(entry.clone()) {
            Ok(item) => out.push(item),
            Err(e) => {
                warn!(kind = what, index, error = %e, "skipping malformed snapshot entry");
                skipped += 1;
            }
        }
    }
    (out, skipped)
}

/// Entries that parsed but were dropped by the scene as duplicate ids.
fn report_duplicates(parse_skipped: usize, loaded: usize, section: Option<&Value>) -> usize {
    let total = section.and_then(Value::as_array).map_or(0, Vec::len);
    total.saturating_sub(parse_skipped + loaded)
}
