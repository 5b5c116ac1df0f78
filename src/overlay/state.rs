//! Engine state
//!
//! Focus is a tagged state machine: an element is either unfocused, or
//! focused and viewing, text editing, or being resized. The combinations
//! the boolean flags of a page script would allow (resizing while text
//! editing) cannot be expressed.

use super::protocol::BoxRect;
use super::resize::{ResizeHandle, ResizeSession};
use super::styles::{StyleMap, is_neutral};
use super::timers::TimerId;
use crate::dom::{NodeId, Rect};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Highlight boxes for the identifier under the pointer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverState {
    /// One box per live instance, the focused node excluded
    pub boxes: Vec<Rect>,
    /// Box of the instance actually under the pointer
    pub primary: Option<Rect>,
    pub tag: Option<String>,
}

impl HoverState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.primary.is_none()
    }
}

/// Text editing session on the focused element
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    /// Direct text as of the last emitted change
    pub baseline: String,
    pub release: EditRelease,
}

/// What has to be undone when an element stops being editable
#[derive(Debug, Clone, PartialEq)]
pub struct EditRelease {
    pub node: NodeId,
    /// The element was `contenteditable` before editing started
    pub was_editable: bool,
    /// Descendants made non-editable while the element is edited
    pub protected: Vec<NodeId>,
}

/// Sub-state of a focused element
#[derive(Debug, Clone, PartialEq)]
pub enum FocusMode {
    Viewing,
    TextEditing(TextEdit),
    Resizing(ResizeSession),
}

/// The single focused element
#[derive(Debug, Clone, PartialEq)]
pub struct FocusState {
    pub node: NodeId,
    pub id: String,
    pub tag: String,
    /// Expanded focus box
    pub rect: Rect,
    pub baseline_styles: StyleMap,
    pub mode: FocusMode,
}

impl FocusState {
    pub fn is_resizing(&self) -> bool {
        matches!(self.mode, FocusMode::Resizing(_))
    }

    pub fn text_edit(&self) -> Option<&TextEdit> {
        match &self.mode {
            FocusMode::TextEditing(edit) => Some(edit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Unfocused,
    Focused(FocusState),
}

impl Session {
    pub fn focus(&self) -> Option<&FocusState> {
        match self {
            Session::Focused(focus) => Some(focus),
            Session::Unfocused => None,
        }
    }

    pub fn focus_mut(&mut self) -> Option<&mut FocusState> {
        match self {
            Session::Focused(focus) => Some(focus),
            Session::Unfocused => None,
        }
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.focus().map(|f| f.id.as_str())
    }

    pub fn focused_node(&self) -> Option<NodeId> {
        self.focus().map(|f| f.node)
    }

    pub fn is_resizing(&self) -> bool {
        self.focus().is_some_and(FocusState::is_resizing)
    }
}

/// Applied style properties of one identifier, camelCase names
pub type StylePatch = StyleMap;

/// Style properties accumulated per identifier until flushed
#[derive(Debug, Clone, Default)]
pub struct PendingPatches {
    patches: BTreeMap<String, StylePatch>,
}

impl PendingPatches {
    /// Merge `styles` into the patch for `id`, last write wins; neutral
    /// values drop the property
    pub fn merge(&mut self, id: &str, styles: &StyleMap) {
        let patch = self.patches.entry(id.to_string()).or_default();
        for (property, value) in styles {
            if is_neutral(property, value) {
                patch.remove(property);
            } else {
                patch.insert(property.clone(), value.clone());
            }
        }
        if patch.is_empty() {
            self.patches.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&StylePatch> {
        self.patches.get(id)
    }

    /// Remove and return the patch for `id` when it has properties
    pub fn take(&mut self, id: &str) -> Option<StylePatch> {
        self.patches.remove(id).filter(|patch| !patch.is_empty())
    }

    pub fn remove(&mut self, id: &str) {
        self.patches.remove(id);
    }

    pub fn clear(&mut self) {
        self.patches.clear();
    }

    pub fn has_pending(&self, id: &str) -> bool {
        self.patches.get(id).is_some_and(|p| !p.is_empty())
    }
}

/// Focused image and the source last reported to the parent
#[derive(Debug, Clone, Default)]
pub struct ImageTracker {
    pub target: Option<NodeId>,
    /// Normalized source
    pub baseline: String,
}

impl ImageTracker {
    pub fn clear(&mut self) {
        self.target = None;
    }
}

/// Loaded web fonts and recently committed families
#[derive(Debug, Default)]
pub struct FontRegistry {
    loaded: HashSet<String>,
    /// identifier -> (family, grace timer)
    committed: HashMap<String, (String, TimerId)>,
}

impl FontRegistry {
    /// Record a font key; `true` when it was not loaded before
    pub fn mark_loaded(&mut self, key: &str) -> bool {
        self.loaded.insert(key.to_string())
    }

    /// Remember a committed family; returns the timer it replaces
    pub fn commit(&mut self, id: &str, family: &str, timer: TimerId) -> Option<TimerId> {
        self.committed
            .insert(id.to_string(), (family.to_string(), timer))
            .map(|(_, previous)| previous)
    }

    pub fn committed_family(&self, id: &str) -> Option<&str> {
        self.committed.get(id).map(|(family, _)| family.as_str())
    }

    /// End the grace window for `id`
    pub fn expire(&mut self, id: &str) {
        self.committed.remove(id);
    }

    /// End every grace window at once
    pub fn clear_committed(&mut self) {
        self.committed.clear();
    }
}

/// Everything an overlay renderer draws
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub hover_boxes: Vec<BoxRect>,
    pub hover_box: Option<BoxRect>,
    /// Label drawn on the first hover box
    pub hover_tag: Option<String>,
    pub focus_box: Option<BoxRect>,
    pub focus_tag: Option<String>,
    pub handles: Vec<(ResizeHandle, BoxRect)>,
    pub resizing: bool,
}
