//! In-memory document
//!
//! Arena of element and text nodes with attributes, inline styles and a
//! trivial absolute layout: every element owns an explicit box, and inline
//! `width`/`height` declarations override its size (percentages resolve
//! against the parent's content box).

use super::css::{self, InlineStyle, Length};
use super::geometry::Rect;
use super::{ChildNode, LiveDocument, NodeId};
use std::collections::HashMap;

/// Node types held by the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNodeType {
    Element,
    Text,
}

/// One arena node
#[derive(Debug, Clone)]
pub struct DomNode {
    pub id: NodeId,
    pub node_type: DomNodeType,
    pub tag_name: Option<String>,
    pub attributes: HashMap<String, String>,
    pub text_content: Option<String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub inline_style: InlineStyle,
    pub computed_styles: HashMap<String, String>,
    pub bounding_box: Option<Rect>,
}

impl DomNode {
    fn element(id: NodeId, tag_name: &str) -> Self {
        Self {
            id,
            node_type: DomNodeType::Element,
            tag_name: Some(tag_name.to_ascii_lowercase()),
            attributes: HashMap::new(),
            text_content: None,
            children: Vec::new(),
            parent: None,
            inline_style: InlineStyle::default(),
            computed_styles: HashMap::new(),
            bounding_box: None,
        }
    }

    fn text(id: NodeId, content: &str) -> Self {
        Self {
            id,
            node_type: DomNodeType::Text,
            tag_name: None,
            attributes: HashMap::new(),
            text_content: Some(content.to_string()),
            children: Vec::new(),
            parent: None,
            inline_style: InlineStyle::default(),
            computed_styles: HashMap::new(),
            bounding_box: None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == DomNodeType::Element
    }
}

/// In-memory page
#[derive(Debug, Clone)]
pub struct Document {
    nodes: HashMap<NodeId, DomNode>,
    root: NodeId,
    next_id: u64,
    generation: u64,
    scroll_x: f32,
    scroll_y: f32,
    pointer_events: bool,
    stylesheets: Vec<String>,
    edit_stylesheet: Option<String>,
    blurred: Vec<NodeId>,
}

impl Document {
    /// Create a document whose root `html` element spans a 1280x720 viewport
    pub fn new() -> Self {
        Self::with_viewport(1280.0, 720.0)
    }

    pub fn with_viewport(width: f32, height: f32) -> Self {
        let root = NodeId(0);
        let mut html = DomNode::element(root, "html");
        html.bounding_box = Some(Rect::new(0.0, 0.0, width, height));
        let mut nodes = HashMap::new();
        nodes.insert(root, html);
        Self {
            nodes,
            root,
            next_id: 1,
            generation: 0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            pointer_events: true,
            stylesheets: Vec::new(),
            edit_stylesheet: None,
            blurred: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, DomNode::element(id, tag_name));
        id
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, DomNode::text(id, content));
        id
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        self.generation += 1;
    }

    /// Convenience: create an element, give it a box and append it
    pub fn append_element(&mut self, parent: NodeId, tag_name: &str, rect: Rect) -> NodeId {
        let id = self.create_element(tag_name);
        self.set_bounding_box(id, rect);
        self.append_child(parent, id);
        id
    }

    /// Convenience: create and append a text node
    pub fn append_text(&mut self, parent: NodeId, content: &str) -> NodeId {
        let id = self.create_text(content);
        self.append_child(parent, id);
        id
    }

    /// Remove a node and its subtree
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&id) {
                stack.extend(removed.children);
            }
        }
        self.generation += 1;
    }

    /// Replace the text of a text node (simulates typing)
    pub fn set_text(&mut self, node: NodeId, content: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            if n.node_type == DomNodeType::Text {
                n.text_content = Some(content.to_string());
            }
        }
    }

    pub fn set_bounding_box(&mut self, node: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.bounding_box = Some(rect);
        }
    }

    /// Set a value returned by `computed_style` when no inline value exists
    pub fn set_computed_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.computed_styles.insert(property.to_string(), value.to_string());
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn inline_style(&self, node: NodeId) -> Option<&InlineStyle> {
        self.nodes.get(&node).map(|n| &n.inline_style)
    }

    pub fn scroll_offset(&self) -> (f32, f32) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn pointer_events_enabled(&self) -> bool {
        self.pointer_events
    }

    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    pub fn edit_stylesheet(&self) -> Option<&str> {
        self.edit_stylesheet.as_deref()
    }

    /// Nodes that were blurred, oldest first
    pub fn blurred(&self) -> &[NodeId] {
        &self.blurred
    }

    /// Elements in document order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        if !n.is_element() {
            return;
        }
        out.push(node);
        for child in &n.children {
            self.collect_elements(*child, out);
        }
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get(&node).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != node);
            }
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = None;
        }
    }

    /// Box in document coordinates with inline size overrides applied
    fn layout_rect(&self, node: NodeId) -> Rect {
        let Some(n) = self.nodes.get(&node) else {
            return Rect::empty();
        };
        let mut rect = n.bounding_box.unwrap_or_default();
        if let Some(width) = n.inline_style.get("width").and_then(css::parse_length) {
            rect.width = self.resolve_length(width, n.parent, Axis::Horizontal);
        }
        if let Some(height) = n.inline_style.get("height").and_then(css::parse_length) {
            rect.height = self.resolve_length(height, n.parent, Axis::Vertical);
        }
        rect
    }

    fn resolve_length(&self, length: Length, parent: Option<NodeId>, axis: Axis) -> f32 {
        match length {
            Length::Px(px) => px,
            Length::Percent(pct) => {
                let Some(parent) = parent else {
                    return 0.0;
                };
                let outer = self.layout_rect(parent);
                let content = match axis {
                    Axis::Horizontal => {
                        outer.width
                            - self.padding(parent, "padding-left")
                            - self.padding(parent, "padding-right")
                    }
                    Axis::Vertical => {
                        outer.height
                            - self.padding(parent, "padding-top")
                            - self.padding(parent, "padding-bottom")
                    }
                };
                content * pct / 100.0
            }
        }
    }

    fn padding(&self, node: NodeId, property: &str) -> f32 {
        css::parse_px(&self.computed_style(node, property)).unwrap_or(0.0)
    }

    fn is_hit_testable(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .map(|n| n.inline_style.get("pointer-events") != Some("none"))
            .unwrap_or(false)
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        match n.node_type {
            DomNodeType::Text => out.push_str(n.text_content.as_deref().unwrap_or("")),
            DomNodeType::Element => {
                for child in &n.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

fn default_computed_value(tag: &str, property: &str) -> &'static str {
    match property {
        "font-size" => "16px",
        "color" => "rgb(0, 0, 0)",
        "font-weight" => "400",
        "font-style" => "normal",
        "text-decoration" => "none solid rgb(0, 0, 0)",
        "text-align" => "start",
        "line-height" | "letter-spacing" | "gap" | "align-items" | "justify-content" => "normal",
        "background-color" => "rgba(0, 0, 0, 0)",
        "background-image" | "max-width" | "max-height" => "none",
        "font-family" => "serif",
        "opacity" => "1",
        "flex-direction" => "row",
        "display" => match tag {
            "span" | "a" | "img" | "label" | "button" | "input" | "strong" | "em" => "inline",
            _ => "block",
        },
        p if p.starts_with("padding") || p.starts_with("margin") || p == "border-radius" => "0px",
        _ => "",
    }
}

impl LiveDocument for Document {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn elements_with_attribute(&self, attribute: &str) -> Vec<(NodeId, String)> {
        self.elements()
            .into_iter()
            .filter_map(|id| {
                let value = self.nodes.get(&id)?.attributes.get(attribute)?;
                Some((id, value.clone()))
            })
            .collect()
    }

    fn element_from_point(&self, x: f32, y: f32) -> Option<NodeId> {
        if !self.pointer_events {
            return None;
        }
        // Later elements in document order paint on top
        self.elements().into_iter().rev().find(|id| {
            self.is_hit_testable(*id) && self.bounding_client_rect(*id).contains(x, y)
        })
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node)?.tag_name.clone()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let n = self.nodes.get(&node)?;
        if name == "style" {
            return (!n.inline_style.is_empty()).then(|| n.inline_style.to_css_text());
        }
        n.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        if name == "style" {
            n.inline_style = InlineStyle::parse(value);
            return;
        }
        n.attributes.insert(name.to_string(), value.to_string());
        if name == crate::ID_ATTRIBUTE {
            self.generation += 1;
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        if name == "style" {
            n.inline_style = InlineStyle::default();
            return;
        }
        if n.attributes.remove(name).is_some() && name == crate::ID_ATTRIBUTE {
            self.generation += 1;
        }
    }

    fn child_nodes(&self, node: NodeId) -> Vec<ChildNode> {
        let Some(n) = self.nodes.get(&node) else {
            return Vec::new();
        };
        n.children
            .iter()
            .filter_map(|id| {
                let child = self.nodes.get(id)?;
                Some(match child.node_type {
                    DomNodeType::Element => ChildNode::Element(*id),
                    DomNodeType::Text => {
                        ChildNode::Text(child.text_content.clone().unwrap_or_default())
                    }
                })
            })
            .collect()
    }

    fn descendant_elements(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(n) = self.nodes.get(&node) {
            for child in &n.children {
                self.collect_elements(*child, &mut out);
            }
        }
        out
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn bounding_client_rect(&self, node: NodeId) -> Rect {
        self.layout_rect(node)
            .translate(-self.scroll_x, -self.scroll_y)
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        let Some(n) = self.nodes.get(&node) else {
            return String::new();
        };
        if let Some(value) = n.inline_style.get(property) {
            return value.to_string();
        }
        if let Some(value) = n.computed_styles.get(property) {
            return value.clone();
        }
        match property {
            "width" => format!("{}px", self.layout_rect(node).width),
            "height" => format!("{}px", self.layout_rect(node).height),
            _ => default_computed_value(n.tag_name.as_deref().unwrap_or(""), property).to_string(),
        }
    }

    fn set_style_property(&mut self, node: NodeId, property: &str, value: &str, important: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.inline_style.set(property, value, important);
        }
    }

    fn remove_style_property(&mut self, node: NodeId, property: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.inline_style.remove(property);
        }
    }

    fn blur(&mut self, node: NodeId) {
        self.blurred.push(node);
    }

    fn scroll_by(&mut self, dx: f32, dy: f32) {
        self.scroll_x = (self.scroll_x + dx).max(0.0);
        self.scroll_y = (self.scroll_y + dy).max(0.0);
    }

    fn set_pointer_events_enabled(&mut self, enabled: bool) {
        self.pointer_events = enabled;
    }

    fn load_stylesheet(&mut self, href: &str) {
        self.stylesheets.push(href.to_string());
    }

    fn set_edit_stylesheet(&mut self, css: Option<&str>) {
        self.edit_stylesheet = css.map(str::to_string);
    }
}
