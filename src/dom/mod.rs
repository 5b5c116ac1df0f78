//! Live document abstraction
//!
//! The overlay engine never touches a concrete page. It talks to a
//! [`LiveDocument`], which a host implements over its real element tree.
//! [`Document`] is the in-memory implementation used by the CLI, the
//! benchmarks and the test-suite.

pub mod css;
mod document;
pub mod geometry;
mod html;

pub use css::{InlineStyle, Length};
pub use document::{Document, DomNode, DomNodeType};
pub use geometry::{Point, Rect, Size};
pub use html::HtmlLoader;

/// Handle of a live node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A direct child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum ChildNode {
    Element(NodeId),
    Text(String),
}

/// The page as seen by the overlay engine
///
/// Property names passed to the style methods are CSS (kebab-case) names.
pub trait LiveDocument {
    /// Counter bumped whenever nodes are added/removed or identifiers change
    fn generation(&self) -> u64;

    /// All elements carrying `attribute`, in document order, with its value
    fn elements_with_attribute(&self, attribute: &str) -> Vec<(NodeId, String)>;

    /// Topmost element at a viewport point
    fn element_from_point(&self, x: f32, y: f32) -> Option<NodeId>;

    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// Lower-case tag name
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn child_nodes(&self, node: NodeId) -> Vec<ChildNode>;

    /// Every element below `node`, in document order
    fn descendant_elements(&self, node: NodeId) -> Vec<NodeId>;

    /// Concatenated text of the whole subtree
    fn text_content(&self, node: NodeId) -> String;

    /// Border box in viewport coordinates
    fn bounding_client_rect(&self, node: NodeId) -> Rect;

    fn computed_style(&self, node: NodeId, property: &str) -> String;

    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str, important: bool);

    fn remove_style_property(&mut self, node: NodeId, property: &str);

    /// Current image source of an `img` element
    fn image_source(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "src")
    }

    fn set_image_source(&mut self, node: NodeId, src: &str) {
        self.set_attribute(node, "src", src);
    }

    /// Drop keyboard focus from `node`
    fn blur(&mut self, node: NodeId);

    fn scroll_by(&mut self, dx: f32, dy: f32);

    /// Toggle pointer events for the whole page
    fn set_pointer_events_enabled(&mut self, enabled: bool);

    /// Append a `<link rel="stylesheet">`
    fn load_stylesheet(&mut self, href: &str);

    /// Install or remove the edit-mode stylesheet
    fn set_edit_stylesheet(&mut self, css: Option<&str>);
}
