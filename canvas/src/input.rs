//! Input model: tools, modifier keys, host events, selection, and the
//! gesture state machine's state.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. [`InputEvent`] is the serde shape the host posts for every DOM
//! event. [`Gesture`] is the active gesture tracked between pointer-down and
//! pointer-up, carrying the context needed to roll back its transient edits
//! and emit one command on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::{Point, Rect};
use crate::doc::{BoardObject, ObjectId, ObjectKind};
use crate::hit::ResizeAnchor;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Draw a rectangle.
    Rect,
    /// Draw an ellipse.
    Ellipse,
    /// Draw a directed arrow.
    Arrow,
    /// Draw a freehand path.
    Path,
    /// Create a text object.
    Text,
}

impl Tool {
    /// Tool bound to a single-key shortcut (`v r o a p t`).
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" | "V" => Some(Self::Select),
            "r" | "R" => Some(Self::Rect),
            "o" | "O" => Some(Self::Ellipse),
            "a" | "A" => Some(Self::Arrow),
            "p" | "P" => Some(Self::Path),
            "t" | "T" => Some(Self::Text),
            _ => None,
        }
    }

    /// Idle cursor for this tool.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Select => "default",
            Self::Text => "text",
            Self::Rect | Self::Ellipse | Self::Arrow | Self::Path => "crosshair",
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Platform command modifier: ctrl or meta.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` index.
    #[must_use]
    pub fn from_dom(index: i16) -> Option<Self> {
        match index {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub String);

impl Key {
    /// Case-insensitive comparison against a key name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// One input event posted by the host, positions in canvas CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InputEvent {
    PointerDown {
        position: Point,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        position: Point,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    DoubleClick {
        position: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Wheel {
        position: Point,
        delta: WheelDelta,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerLeave,
    Blur,
}

/// Ordered set of selected object ids (selection order is kept).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    /// Add `id` if absent. Returns true if it was added.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`. Returns true if it was present.
    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|x| x != id);
        self.ids.len() != before
    }

    /// Flip membership of `id`.
    pub fn toggle(&mut self, id: ObjectId) {
        if !self.remove(&id) {
            self.ids.push(id);
        }
    }

    /// Replace the whole selection, dropping repeated ids.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids.clear();
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Keep only ids for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ObjectId) -> bool) {
        self.ids.retain(|id| keep(id));
    }

    #[must_use]
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    /// The selected id when exactly one object is selected.
    #[must_use]
    pub fn single(&self) -> Option<ObjectId> {
        match self.ids.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The gesture in progress between pointer-down and pointer-up.
///
/// Variants that edit the scene transiently carry what is needed to undo
/// those edits before the final command is executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Panning the view with a middle-button drag.
    Panning {
        /// Screen position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving the selected objects.
    Moving {
        /// World position of the pointer at press.
        origin: Point,
        /// Pre-gesture state of every moved object.
        originals: Vec<BoardObject>,
    },
    /// Dragging one of the eight handles of a single box object.
    Resizing {
        anchor: ResizeAnchor,
        /// Pre-gesture state of the resized object.
        original: BoardObject,
    },
    /// Rubber-band selection.
    Marquee {
        /// World position where the drag started.
        origin: Point,
        /// World position of the pointer now.
        current: Point,
        /// Selection before the drag; kept when shift is held.
        base: Vec<ObjectId>,
        additive: bool,
    },
    /// Sizing a new rect or ellipse.
    DrawingShape {
        /// Id of the transient object.
        id: ObjectId,
        kind: ObjectKind,
        /// World position where the drag started.
        origin: Point,
    },
    /// Placing the end point of a new arrow.
    DrawingArrow {
        /// Id of the transient object.
        id: ObjectId,
        start: Point,
    },
    /// Collecting points for a new freehand path.
    DrawingPath {
        /// Id of the transient object.
        id: ObjectId,
    },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// World-space marquee rectangle, while one is being dragged.
    #[must_use]
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Self::Marquee { origin, current, .. } => Some(Rect::from_corners(*origin, *current)),
            _ => None,
        }
    }
}

/// Controller state visible to the renderer and the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    /// Currently active drawing tool.
    pub tool: Tool,
    pub selection: Selection,
    /// Topmost object under the pointer while idle in select mode.
    pub hovered: Option<ObjectId>,
    pub gesture: Gesture,
}
