//! Style snapshots and inline style mutation
//!
//! Property names on the protocol are camelCase (`backgroundColor`); the
//! document API takes CSS names (`background-color`).

use crate::dom::{LiveDocument, NodeId};
use std::collections::BTreeMap;

/// camelCase property -> value
pub type StyleMap = BTreeMap<String, String>;

/// Properties captured as the pre-edit baseline of a focused element
pub const SNAPSHOT_PROPERTIES: [&str; 26] = [
    "fontSize",
    "color",
    "fontWeight",
    "fontStyle",
    "textDecoration",
    "textAlign",
    "lineHeight",
    "letterSpacing",
    "paddingLeft",
    "paddingRight",
    "paddingTop",
    "paddingBottom",
    "marginLeft",
    "marginRight",
    "marginTop",
    "marginBottom",
    "backgroundColor",
    "backgroundImage",
    "borderRadius",
    "fontFamily",
    "opacity",
    "display",
    "flexDirection",
    "alignItems",
    "justifyContent",
    "gap",
];

/// Properties reset by `CLEAR_INLINE_STYLES`
pub const CLEARABLE_PROPERTIES: [&str; 16] = [
    "fontSize",
    "color",
    "fontWeight",
    "fontStyle",
    "textDecoration",
    "textAlign",
    "paddingLeft",
    "paddingRight",
    "paddingTop",
    "paddingBottom",
    "marginLeft",
    "marginRight",
    "marginTop",
    "marginBottom",
    "backgroundColor",
    "backgroundImage",
];

/// Installed while edit mode is on
pub const EDIT_STYLESHEET: &str = r#"[contenteditable="true"]:focus { outline: none !important; box-shadow: none !important; }
[contenteditable="true"] { cursor: text !important; }
[contenteditable="true"]::selection { background-color: rgba(59, 130, 246, 0.3); }
[contenteditable="true"] [contenteditable="false"] { user-select: none !important; opacity: 0.7 !important; cursor: default !important; }
[data-orchids-protected="true"] { user-select: none !important; }"#;

/// `backgroundColor` -> `background-color`
pub fn to_kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn is_box_spacing(property: &str) -> bool {
    property.contains("padding") || property.contains("margin")
}

fn is_transparent(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    compact == "transparent" || compact == "rgba(0,0,0,0)" || compact == "rgb(0,0,0,0)"
}

/// Normalize a computed value the way the parent controller expects it
pub fn normalize_computed(property: &str, value: &str) -> String {
    match property {
        "backgroundColor" if value.is_empty() || is_transparent(value) => "transparent".into(),
        "backgroundImage" if value.is_empty() || value == "none" => "none".into(),
        "textDecoration" if value.is_empty() || value.contains("none") => "none".into(),
        "fontStyle" if value.is_empty() => "normal".into(),
        "opacity" if value.is_empty() => "1".into(),
        "fontWeight" => {
            let digits: String = value
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            match digits.parse::<u32>() {
                Ok(weight) => weight.to_string(),
                Err(_) if value.is_empty() => "400".into(),
                Err(_) => value.to_string(),
            }
        }
        p if (is_box_spacing(p) || p == "borderRadius") && (value == "0px" || value == "0") => {
            "0".into()
        }
        "letterSpacing" | "gap" if value == "0px" => "normal".into(),
        _ => value.to_string(),
    }
}

/// Whether setting `value` amounts to removing the inline property
pub fn is_neutral(property: &str, value: &str) -> bool {
    match property {
        "backgroundColor" => is_transparent(value),
        "backgroundImage" | "textDecoration" => value == "none",
        "fontStyle" => value == "normal",
        "opacity" => value == "1",
        "borderRadius" => value == "0",
        "letterSpacing" | "gap" => value == "normal",
        p if is_box_spacing(p) => value == "0",
        _ => false,
    }
}

/// Snapshot the baseline style properties of `node`
pub fn snapshot<D: LiveDocument>(document: &D, node: NodeId) -> StyleMap {
    SNAPSHOT_PROPERTIES
        .iter()
        .map(|property| {
            let computed = document.computed_style(node, &to_kebab_case(property));
            (property.to_string(), normalize_computed(property, &computed))
        })
        .collect()
}

/// Apply one protocol property to a node: neutral values remove, others
/// are written with `!important`
pub fn apply_property<D: LiveDocument>(document: &mut D, node: NodeId, property: &str, value: &str) {
    let css_property = to_kebab_case(property);
    if is_neutral(property, value) {
        document.remove_style_property(node, &css_property);
    } else {
        document.set_style_property(node, &css_property, value, true);
    }
}

/// Collapse each run of characters matching `is_separator` into one `+`
fn collapse_runs(family: &str, is_separator: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(family.len());
    let mut in_run = false;
    for c in family.chars() {
        if is_separator(c) {
            if !in_run {
                out.push('+');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Registry key of a committed font family (quotes and whitespace collapse)
pub fn font_key(family: &str) -> String {
    collapse_runs(family, |c| c == '\'' || c.is_whitespace())
}

/// Registry key of a previewed font family (whitespace collapses)
pub fn preview_font_key(family: &str) -> String {
    collapse_runs(family, char::is_whitespace)
}

/// Web font stylesheet for a registry key
pub fn font_stylesheet_url(base: &str, key: &str) -> String {
    format!("{}?family={}:wght@400&display=swap", base, key)
}
