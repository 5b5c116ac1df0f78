//! Element walk: decides which elements are tagged and with what

use super::lines::LineIndex;
use super::literal::VariableIndex;
use super::syntax::{
    Delimiter, JsxAttrValue, JsxAttribute, JsxChild, JsxElement, JsxNameKind, Token, TokenKind,
};
use std::collections::HashSet;

/// Levels searched above an element for an enclosing `.map(…)` call
const MAP_SEARCH_DEPTH: usize = 9;

/// Words that take a parenthesized operand without calling anything
const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "with", "return", "typeof", "function", "async",
    "await", "yield", "void", "delete", "in", "of", "case", "throw", "else", "do", "default",
];

/// An element that received identifier attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedElement {
    pub id: String,
    /// Semantic name written to the name attribute
    pub name: String,
    /// 1-based
    pub line: usize,
    /// 0-based, UTF-16 units
    pub column: usize,
    /// Index parameter of the enclosing map callback
    pub map_index: Option<String>,
}

/// Text to insert after an element name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MapContext {
    array: String,
    index: Option<String>,
}

/// Syntactic nesting between an element and the code around it
#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Element,
    Container,
    Block,
    Array,
    Arrow,
    Call(Option<MapContext>),
}

/// What the walker reads while tagging one file
pub(crate) struct WalkContext<'a> {
    pub file: &'a str,
    pub lines: &'a LineIndex<'a>,
    pub skipped: &'a HashSet<String>,
    pub image_aliases: &'a HashSet<String>,
    pub variables: &'a VariableIndex,
}

pub(crate) struct Walker<'a> {
    cx: WalkContext<'a>,
    levels: Vec<Level>,
    insertions: Vec<Insertion>,
    tagged: Vec<TaggedElement>,
}

impl<'a> Walker<'a> {
    pub fn new(cx: WalkContext<'a>) -> Self {
        Self {
            cx,
            levels: Vec::new(),
            insertions: Vec::new(),
            tagged: Vec::new(),
        }
    }

    /// Walk a whole file; returns the insertions in source order
    pub fn run(mut self, tokens: &[Token]) -> (Vec<Insertion>, Vec<TaggedElement>) {
        self.walk_run(tokens);
        (self.insertions, self.tagged)
    }

    fn walk_run(&mut self, run: &[Token]) {
        let mut arrows = 0;
        for (i, token) in run.iter().enumerate() {
            match &token.kind {
                TokenKind::Punct("=>") => {
                    self.levels.push(Level::Arrow);
                    arrows += 1;
                }
                TokenKind::Punct("," | ";") => {
                    self.pop_levels(arrows);
                    arrows = 0;
                }
                TokenKind::Group(Delimiter::Paren, inner) => {
                    if is_call(run, i) {
                        self.nested(Level::Call(map_call(run, i)), inner);
                    } else {
                        self.walk_run(inner);
                    }
                }
                TokenKind::Group(Delimiter::Bracket, inner) => self.nested(Level::Array, inner),
                TokenKind::Group(Delimiter::Brace, inner) => self.nested(Level::Block, inner),
                TokenKind::Template(parts) => {
                    for part in parts {
                        self.walk_run(part);
                    }
                }
                TokenKind::Element(element) => self.walk_element(element),
                _ => {}
            }
        }
        self.pop_levels(arrows);
    }

    fn nested(&mut self, level: Level, run: &[Token]) {
        self.levels.push(level);
        self.walk_run(run);
        self.levels.pop();
    }

    fn pop_levels(&mut self, count: usize) {
        let keep = self.levels.len().saturating_sub(count);
        self.levels.truncate(keep);
    }

    fn walk_element(&mut self, element: &JsxElement) {
        self.tag(element);
        self.levels.push(Level::Element);
        for attribute in &element.attributes {
            match attribute {
                JsxAttribute::Named {
                    value: Some(JsxAttrValue::Expr(tokens)),
                    ..
                }
                | JsxAttribute::Spread { tokens, .. } => self.nested(Level::Container, tokens),
                JsxAttribute::Named {
                    value: Some(JsxAttrValue::Element(inner)),
                    ..
                } => self.walk_element(inner),
                JsxAttribute::Named { .. } => {}
            }
        }
        for child in &element.children {
            match child {
                JsxChild::Expr(tokens) => self.nested(Level::Container, tokens),
                JsxChild::Element(inner) => self.walk_element(inner),
                JsxChild::Text(_) => {}
            }
        }
        self.levels.pop();
    }

    fn tag(&mut self, element: &JsxElement) {
        let Some(name) = &element.name else {
            return;
        };
        if name.kind == JsxNameKind::Namespaced || element.has_attribute(crate::ID_ATTRIBUTE) {
            return;
        }
        let semantic = if self.cx.image_aliases.contains(&name.text) {
            "img".to_string()
        } else {
            name.text.clone()
        };
        if self.cx.skipped.contains(&semantic) {
            return;
        }

        let (line, column) = self.cx.lines.position(element.span.start);
        let mut id = format!("{}:{}:{}", self.cx.file, line, column);
        let map = self.map_context().cloned();
        let suffixes = map
            .iter()
            .map(|m| m.array.as_str())
            .chain(element.attributes.iter().filter_map(bare_reference))
            .filter(|name| self.cx.variables.contains(name));
        for name in suffixes {
            id.push('@');
            id.push_str(name);
        }

        let map_index = map.and_then(|m| m.index);
        let mut text = String::new();
        if let Some(index) = &map_index {
            text.push_str(&format!(" {}={{{}}}", crate::MAP_INDEX_ATTRIBUTE, index));
        }
        text.push_str(&format!(
            " {}=\"{}\" {}=\"{}\"",
            crate::ID_ATTRIBUTE,
            id,
            crate::NAME_ATTRIBUTE,
            semantic
        ));
        log::trace!("tagging <{}> as {}", name.text, id);
        self.insertions.push(Insertion {
            offset: name.span.end,
            text,
        });
        self.tagged.push(TaggedElement {
            id,
            name: semantic,
            line,
            column,
            map_index,
        });
    }

    /// Closest enclosing map call within the search depth
    fn map_context(&self) -> Option<&MapContext> {
        // The element node itself sits one level above its opening tag
        let mut depth = 1;
        for level in self.levels.iter().rev() {
            depth += 1;
            if depth > MAP_SEARCH_DEPTH {
                return None;
            }
            match level {
                Level::Call(Some(context)) => return Some(context),
                // Block plus the statement inside it
                Level::Block => depth += 1,
                _ => {}
            }
        }
        None
    }
}

/// `var` in `attr={var}`
fn bare_reference(attribute: &JsxAttribute) -> Option<&str> {
    match attribute {
        JsxAttribute::Named {
            value: Some(JsxAttrValue::Expr(tokens)),
            ..
        } => match tokens.as_slice() {
            [token] => token.ident(),
            _ => None,
        },
        _ => None,
    }
}

/// Whether the parenthesized group at `i` is a call's argument list
fn is_call(run: &[Token], i: usize) -> bool {
    let Some(previous) = i.checked_sub(1).and_then(|p| run.get(p)) else {
        return false;
    };
    match &previous.kind {
        TokenKind::Ident(word) => !NON_CALL_KEYWORDS.contains(&word.as_str()),
        TokenKind::Group(Delimiter::Paren | Delimiter::Bracket, _) => true,
        _ => false,
    }
}

/// `array.map(item => …)` or `array.map((item, index) => …)` at group `i`
fn map_call(run: &[Token], i: usize) -> Option<MapContext> {
    if i < 3 || !run[i - 1].is_ident("map") || !run[i - 2].is_punct(".") {
        return None;
    }
    let array = run[i - 3].ident()?;
    if matches!(array, "this" | "super") {
        return None;
    }
    if i >= 4 && (run[i - 4].is_punct(".") || run[i - 4].is_punct("?.")) {
        return None;
    }
    let args = run[i].group(Delimiter::Paren)?;
    let index = arrow_callback_index(args)?;
    Some(MapContext {
        array: array.to_string(),
        index,
    })
}

/// For an arrow callback with a plain first parameter, its index parameter
fn arrow_callback_index(args: &[Token]) -> Option<Option<String>> {
    let mut i = 0;
    if args.first()?.is_ident("async") && args.get(1).is_some_and(|t| !t.is_punct("=>")) {
        i = 1;
    }
    let params = args.get(i)?;
    match &params.kind {
        TokenKind::Ident(_) => args.get(i + 1)?.is_punct("=>").then_some(None),
        TokenKind::Group(Delimiter::Paren, params) => {
            // Allow a return type annotation between the parameters and `=>`
            args[i + 1..]
                .iter()
                .take_while(|t| !t.is_punct(","))
                .any(|t| t.is_punct("=>"))
                .then_some(())?;
            let mut list = params.split(|t| t.is_punct(","));
            plain_parameter(list.next()?)?;
            Some(list.next().and_then(plain_parameter))
        }
        _ => None,
    }
}

/// Name of a parameter that is a bare identifier, possibly typed
fn plain_parameter(tokens: &[Token]) -> Option<String> {
    let (first, rest) = tokens.split_first()?;
    let name = first.ident()?;
    let plain = match rest.first() {
        None => true,
        Some(t) => t.is_punct(":") || (t.is_punct("?") && rest.get(1).is_some_and(|t| t.is_punct(":"))),
    };
    plain.then(|| name.to_string())
}
