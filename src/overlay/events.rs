//! Host events delivered to the overlay engine
//!
//! Coordinates are viewport coordinates. A `target` of `None` means the
//! engine resolves the element under the point itself.

use crate::dom::NodeId;

/// Input and lifecycle events of the page
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PointerMove { x: f32, y: f32 },
    /// Pointer left the document
    PointerLeave,
    PointerDown {
        x: f32,
        y: f32,
        target: Option<NodeId>,
    },
    PointerUp { x: f32, y: f32 },
    Click {
        x: f32,
        y: f32,
        target: Option<NodeId>,
    },
    /// A form is about to submit
    Submit,
    Scroll,
    /// The window was resized
    WindowResize,
    /// An element's box changed size
    LayoutChanged { node: NodeId },
    /// An element received keyboard focus
    Focus { node: NodeId },
    /// An element lost keyboard focus
    Blur { node: NodeId },
    /// Content of an editable element changed
    Input { node: NodeId },
}

impl HostEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::PointerMove { .. } => "pointermove",
            HostEvent::PointerLeave => "pointerleave",
            HostEvent::PointerDown { .. } => "pointerdown",
            HostEvent::PointerUp { .. } => "pointerup",
            HostEvent::Click { .. } => "click",
            HostEvent::Submit => "submit",
            HostEvent::Scroll => "scroll",
            HostEvent::WindowResize => "resize",
            HostEvent::LayoutChanged { .. } => "layout",
            HostEvent::Focus { .. } => "focus",
            HostEvent::Blur { .. } => "blur",
            HostEvent::Input { .. } => "input",
        }
    }
}

/// What the host should do with the native event afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// Suppress the native action (navigation, submission, text selection)
    pub default_prevented: bool,
}

impl EventOutcome {
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn prevent() -> Self {
        Self {
            default_prevented: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        assert!(!EventOutcome::proceed().default_prevented);
        assert!(EventOutcome::prevent().default_prevented);
        assert_eq!(HostEvent::Submit.name(), "submit");
    }
}
