//! Build-time element tagger
//!
//! Rewrites JSX/TSX sources so that every eligible element carries the
//! identifier and semantic name attributes the overlay reads at runtime,
//! and returns a source map back to the untouched input.
//!
//! ```text
//! <li key={i}>                      // src/app/page.tsx, line 14, column 10
//! <li data-map-index={i} data-orchids-id="src/app/page.tsx:14:10@items"
//!     data-orchids-name="li" key={i}>
//! ```

mod config;
mod exclusions;
mod lines;
mod literal;
mod source_map;
mod syntax;
mod walker;

pub use config::TaggerConfig;
pub use exclusions::{FRAGMENT_NAMES, HELPER_COMPONENTS, SCENE_PRIMITIVES};
pub use lines::LineIndex;
pub use literal::{LiteralKind, VariableIndex};
pub use source_map::{EditBuffer, Segment, SourceMap};
pub use syntax::{SyntaxError, parse};
pub use walker::TaggedElement;

use crate::utils::TaggerError;
use std::collections::HashSet;
use std::path::{Component, Path};
use walker::{WalkContext, Walker};

/// Result of tagging one file
#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    /// Nothing qualified, or the file was not eligible; use the input as is
    Unchanged,
    Tagged(TaggedSource),
}

impl TagOutcome {
    pub fn is_tagged(&self) -> bool {
        matches!(self, TagOutcome::Tagged(_))
    }

    /// Output code, falling back to `original` when unchanged
    pub fn code<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            TagOutcome::Unchanged => original,
            TagOutcome::Tagged(tagged) => &tagged.code,
        }
    }
}

/// Rewritten source with its map
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSource {
    pub code: String,
    pub map: SourceMap,
    pub elements: Vec<TaggedElement>,
}

/// Element tagger
#[derive(Debug, Clone)]
pub struct ComponentTagger {
    config: TaggerConfig,
    skipped: HashSet<String>,
}

impl Default for ComponentTagger {
    fn default() -> Self {
        Self::new(TaggerConfig::default())
    }
}

impl ComponentTagger {
    pub fn new(config: TaggerConfig) -> Self {
        let skipped = config.skipped_names();
        Self { config, skipped }
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Tag one source file
    ///
    /// `resource_path` decides eligibility, the markup dialect and the path
    /// written into identifiers. Parse failures abort the whole file.
    pub fn tag(&self, resource_path: &Path, source: &str) -> Result<TagOutcome, TaggerError> {
        if resource_path
            .components()
            .any(|c| c.as_os_str() == "node_modules")
        {
            log::trace!("skipping dependency source {}", resource_path.display());
            return Ok(TagOutcome::Unchanged);
        }

        let file = relative_path(&self.config.root, resource_path);
        let lines = LineIndex::new(source);
        let tokens = parse(source, markup_enabled(resource_path)).map_err(|err| {
            let (line, column) = lines.position(err.offset);
            TaggerError::Parse {
                file: file.clone(),
                line,
                column,
                message: err.message,
            }
        })?;

        let image_aliases = literal::image_aliases(&tokens, &self.config.image_modules);
        let variables = VariableIndex::build(&tokens, &lines);
        let (insertions, elements) = Walker::new(WalkContext {
            file: &file,
            lines: &lines,
            skipped: &self.skipped,
            image_aliases: &image_aliases,
            variables: &variables,
        })
        .run(&tokens);

        if insertions.is_empty() {
            return Ok(TagOutcome::Unchanged);
        }
        let mut buffer = EditBuffer::new(source);
        for insertion in insertions {
            buffer.insert(insertion.offset, insertion.text);
        }
        let output_name = resource_path.file_name().map(|n| n.to_string_lossy());
        let (code, map) = buffer.finish(output_name.as_deref(), &file);
        log::debug!("tagged {} elements in {}", elements.len(), file);
        Ok(TagOutcome::Tagged(TaggedSource {
            code,
            map,
            elements,
        }))
    }

    /// Read and tag a file from disk
    pub fn tag_file(&self, path: &Path) -> crate::Result<TagOutcome> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.tag(path, &source)?)
    }
}

/// Plain TypeScript uses `<T>value` casts, so markup is off there
fn markup_enabled(path: &Path) -> bool {
    !matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts")
    )
}

/// `path` relative to `root`, with `/` separators
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
