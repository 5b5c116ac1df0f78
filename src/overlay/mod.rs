//! In-page overlay engine
//!
//! Tracks hover and focus over tagged elements, makes the focused element
//! editable and talks to the parent frame over the hover channel. The page
//! itself is reached through [`crate::dom::LiveDocument`]; persisted state
//! through a [`KeyValueStore`]; the parent through a [`MessageSink`].

mod config;
mod engine;
mod events;
mod identifier;
mod image;
mod index;
mod messenger;
pub mod protocol;
mod resize;
mod state;
mod storage;
pub mod styles;
mod timers;

pub use config::OverlayConfig;
pub use engine::{OverlayEngine, wrap_multiline};
pub use events::{EventOutcome, HostEvent};
pub use identifier::ElementId;
pub use image::{normalize_image_src, resolve_image_src};
pub use index::IdentifierIndex;
pub use messenger::{ChannelSink, MessageSink, Messenger, Outbox};
pub use protocol::{BoxRect, CHANNEL, InboundMessage, OutboundMessage};
pub use resize::{ResizeHandle, ResizeSession, release_values};
pub use state::{
    EditRelease, FocusMode, FocusState, HoverState, OverlayView, PendingPatches, Session,
    StylePatch, TextEdit,
};
pub use storage::{
    EDIT_MODE_KEY, FOCUSED_ELEMENT_KEY, FileStore, FocusRecord, KeyValueStore, MemoryStore,
};
pub use styles::StyleMap;
pub use timers::{TimerId, Timers};
