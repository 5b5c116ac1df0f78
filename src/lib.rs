//! # visual-edits - Element tagging and in-page visual editing
//!
//! Two halves that meet at a handful of `data-*` attributes:
//!
//! - **tagger**: build-time transform that stamps every eligible JSX/TSX
//!   element with a `file:line:column` identifier and a semantic name, and
//!   emits a source map for the rewrite
//! - **overlay**: runtime engine that reads those attributes from the live
//!   page, tracks hover and focus, applies text, style, image and size edits
//!   and reports them to the parent frame
//! - **dom**: live document abstraction plus an in-memory implementation
//! - **utils**: shared utilities and error types

pub mod dom;
pub mod overlay;
pub mod tagger;
pub mod utils;

// Re-export main types for convenience
pub use overlay::{OverlayConfig, OverlayEngine};
pub use tagger::{ComponentTagger, TagOutcome, TaggerConfig};
pub use utils::error::{Result, VisualEditsError};

use serde::Deserialize;
use std::path::Path;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "visual-edits";

/// Attribute carrying the element identifier
pub const ID_ATTRIBUTE: &str = "data-orchids-id";
/// Attribute carrying the semantic tag name
pub const NAME_ATTRIBUTE: &str = "data-orchids-name";
/// Attribute carrying the list index inside mapped lists
pub const MAP_INDEX_ATTRIBUTE: &str = "data-map-index";

/// Settings file layout: `{"tagger": {...}, "overlay": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tagger: TaggerConfig,
    pub overlay: OverlayConfig,
}

impl Config {
    /// Read a JSON settings file; missing sections keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| VisualEditsError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
