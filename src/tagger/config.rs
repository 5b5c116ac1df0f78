//! Tagger configuration

use super::exclusions::{FRAGMENT_NAMES, HELPER_COMPONENTS, SCENE_PRIMITIVES};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Which elements get tagged, and how identifiers name files
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Identifiers carry file paths relative to this directory
    pub root: PathBuf,
    /// Element names never tagged
    pub excluded_elements: Vec<String>,
    /// Names treated as fragments
    pub fragment_names: Vec<String>,
    /// Modules whose imports render an `img`
    pub image_modules: Vec<String>,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            excluded_elements: SCENE_PRIMITIVES
                .iter()
                .chain(HELPER_COMPONENTS)
                .map(|name| name.to_string())
                .collect(),
            fragment_names: FRAGMENT_NAMES.iter().map(|name| name.to_string()).collect(),
            image_modules: vec!["next/image".to_string()],
        }
    }
}

impl TaggerConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Every name that is skipped outright
    pub(crate) fn skipped_names(&self) -> HashSet<String> {
        self.excluded_elements
            .iter()
            .chain(&self.fragment_names)
            .cloned()
            .collect()
    }
}
