//! HTML loading using html5ever
//!
//! Builds a [`Document`] from markup. Element boxes come from inline
//! `left`/`top` pixel offsets relative to the parent box; missing offsets
//! and sizes fall back to the parent's.

use super::css::{self, InlineStyle};
use super::document::Document;
use super::geometry::Rect;
use super::{LiveDocument, NodeId};
use crate::utils::error::DocumentError;
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Elements that never take part in the live page
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "noscript"];

/// HTML to [`Document`] loader
pub struct HtmlLoader {
    viewport: Rect,
}

impl HtmlLoader {
    pub fn new() -> Self {
        Self {
            viewport: Rect::new(0.0, 0.0, 1280.0, 720.0),
        }
    }

    pub fn with_viewport(width: f32, height: f32) -> Self {
        Self {
            viewport: Rect::new(0.0, 0.0, width, height),
        }
    }

    /// Parse an HTML string
    pub fn parse(&self, html: &str) -> Result<Document, DocumentError> {
        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|e| DocumentError::HtmlParse(e.to_string()))?;

        let mut document = Document::with_viewport(self.viewport.width, self.viewport.height);
        let root = document.root();
        for child in dom.document.children.borrow().iter() {
            if let NodeData::Element { name, attrs, .. } = &child.data {
                if name.local.as_ref() == "html" {
                    for attr in attrs.borrow().iter() {
                        document.set_attribute(root, attr.name.local.as_ref(), &attr.value);
                    }
                    self.append_children(&mut document, root, child);
                }
            }
        }

        log::debug!("Loaded HTML document with {} nodes", document.node_count());
        Ok(document)
    }

    fn append_children(&self, document: &mut Document, parent: NodeId, handle: &Handle) {
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, attrs, .. } => {
                    let tag = name.local.as_ref();
                    if SKIPPED_ELEMENTS.contains(&tag) {
                        continue;
                    }
                    let element = document.create_element(tag);
                    let mut style = InlineStyle::default();
                    for attr in attrs.borrow().iter() {
                        let attr_name = attr.name.local.as_ref();
                        if attr_name == "style" {
                            style = InlineStyle::parse(&attr.value);
                        }
                        document.set_attribute(element, attr_name, &attr.value);
                    }
                    let rect = self.element_box(document, parent, &style);
                    document.set_bounding_box(element, rect);
                    document.append_child(parent, element);
                    self.append_children(document, element, child);
                }
                NodeData::Text { contents } => {
                    let text = contents.borrow();
                    if !text.trim().is_empty() {
                        document.append_text(parent, &text);
                    }
                }
                _ => {}
            }
        }
    }

    fn element_box(&self, document: &Document, parent: NodeId, style: &InlineStyle) -> Rect {
        let parent_box = document
            .get_node(parent)
            .and_then(|node| node.bounding_box)
            .unwrap_or(self.viewport);
        let px = |property: &str| style.get(property).and_then(css::parse_px);
        Rect::new(
            parent_box.x + px("left").unwrap_or(0.0),
            parent_box.y + px("top").unwrap_or(0.0),
            px("width").unwrap_or(parent_box.width),
            px("height").unwrap_or(parent_box.height),
        )
    }
}

impl Default for HtmlLoader {
    fn default() -> Self {
        Self::new()
    }
}
