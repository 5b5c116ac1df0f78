//! Parent frame message protocol
//!
//! Every message travels as a JSON object tagged with [`CHANNEL`] under
//! `type` and its kind under `msg`. A few inbound updates use their own
//! top-level `type` instead.

use super::styles::StyleMap;
use crate::dom::{Point, Rect};
use crate::utils::error::ProtocolError;
use serde::Serialize;
use serde_json::Value;

/// Channel tag shared with the parent controller
pub const CHANNEL: &str = "ORCHIDS_HOVER_v1";

/// Box as reported to the parent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoxRect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for BoxRect {
    fn from(rect: Rect) -> Self {
        Self {
            top: rect.y,
            left: rect.x,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// Messages sent to the parent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msg", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    Hit {
        id: Option<String>,
        tag: Option<String>,
        rect: Option<BoxRect>,
    },
    #[serde(rename_all = "camelCase")]
    ElementClicked {
        id: Option<String>,
        tag: Option<String>,
        rect: BoxRect,
        click_position: Point,
        is_editable: bool,
        current_styles: StyleMap,
        class_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        src: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TextChanged {
        id: String,
        old_text: String,
        new_text: String,
        file_path: String,
        line: u32,
        column: u32,
    },
    #[serde(rename_all = "camelCase")]
    StyleBlur {
        id: String,
        styles: StyleMap,
        class_name: String,
        file_path: String,
        line: u32,
        column: u32,
    },
    #[serde(rename_all = "camelCase")]
    ImageBlur {
        id: String,
        old_src: String,
        new_src: String,
        file_path: String,
        line: u32,
        column: u32,
    },
    #[serde(rename_all = "camelCase")]
    ResizeElement {
        element_id: String,
        width: i64,
        height: i64,
    },
    FocusMoved {
        id: String,
        rect: BoxRect,
    },
    ScrollStarted,
    ScrollStopped,
    VisualEditModeAck {
        active: bool,
    },
    VisualEditModeRestored {
        active: bool,
    },
}

impl OutboundMessage {
    /// The `msg` discriminant
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Hit { .. } => "HIT",
            OutboundMessage::ElementClicked { .. } => "ELEMENT_CLICKED",
            OutboundMessage::TextChanged { .. } => "TEXT_CHANGED",
            OutboundMessage::StyleBlur { .. } => "STYLE_BLUR",
            OutboundMessage::ImageBlur { .. } => "IMAGE_BLUR",
            OutboundMessage::ResizeElement { .. } => "RESIZE_ELEMENT",
            OutboundMessage::FocusMoved { .. } => "FOCUS_MOVED",
            OutboundMessage::ScrollStarted => "SCROLL_STARTED",
            OutboundMessage::ScrollStopped => "SCROLL_STOPPED",
            OutboundMessage::VisualEditModeAck { .. } => "VISUAL_EDIT_MODE_ACK",
            OutboundMessage::VisualEditModeRestored { .. } => "VISUAL_EDIT_MODE_RESTORED",
        }
    }

    /// "Nothing under the pointer"
    pub fn no_hit() -> Self {
        OutboundMessage::Hit {
            id: None,
            tag: None,
            rect: None,
        }
    }

    /// Wire form: the message object with the channel tag added
    pub fn to_envelope(&self) -> Result<Value, ProtocolError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(CHANNEL.to_string()));
        }
        Ok(value)
    }
}

/// Messages received from the parent
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    StyleUpdate {
        element_id: String,
        styles: StyleMap,
    },
    ImageUpdate {
        element_id: String,
        src: String,
        old_src: Option<String>,
    },
    ResizeElement {
        element_id: String,
        width: f64,
        height: f64,
    },
    PreviewFont {
        element_id: String,
        font_family: String,
    },
    Scroll {
        dx: f32,
        dy: f32,
    },
    VisualEditMode {
        active: bool,
    },
    ClearInlineStyles {
        element_id: String,
    },
    /// `None` clears the parent-driven hover
    ShowElementHover {
        element_id: Option<String>,
    },
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_string)
}

/// Non-empty string field
fn id_field(value: &Value, key: &str) -> Option<String> {
    str_field(value, key).filter(|s| !s.is_empty())
}

fn num_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

/// Style values may arrive as strings or numbers
fn style_field(value: &Value) -> StyleMap {
    let Some(map) = value.get("styles").and_then(Value::as_object) else {
        return StyleMap::new();
    };
    map.iter()
        .filter_map(|(property, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((property.clone(), text))
        })
        .collect()
}

impl InboundMessage {
    /// Decode a message object; unrelated or incomplete payloads give `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("type")?.as_str()? {
            "ORCHIDS_STYLE_UPDATE" => Some(InboundMessage::StyleUpdate {
                element_id: id_field(value, "elementId")?,
                styles: style_field(value),
            }),
            "ORCHIDS_IMAGE_UPDATE" => Some(InboundMessage::ImageUpdate {
                element_id: id_field(value, "elementId")?,
                src: str_field(value, "src")?,
                old_src: id_field(value, "oldSrc"),
            }),
            "RESIZE_ELEMENT" => Some(InboundMessage::ResizeElement {
                element_id: id_field(value, "elementId")?,
                width: num_field(value, "width")?,
                height: num_field(value, "height")?,
            }),
            CHANNEL => Self::from_channel(value),
            _ => None,
        }
    }

    fn from_channel(value: &Value) -> Option<Self> {
        match value.get("msg")?.as_str()? {
            "PREVIEW_FONT" => Some(InboundMessage::PreviewFont {
                element_id: id_field(value, "elementId")?,
                font_family: str_field(value, "fontFamily")?,
            }),
            "SCROLL" => Some(InboundMessage::Scroll {
                dx: num_field(value, "dx")? as f32,
                dy: num_field(value, "dy").unwrap_or(0.0) as f32,
            }),
            "VISUAL_EDIT_MODE" => Some(InboundMessage::VisualEditMode {
                active: value.get("active")?.as_bool()?,
            }),
            "CLEAR_INLINE_STYLES" => Some(InboundMessage::ClearInlineStyles {
                element_id: id_field(value, "elementId")?,
            }),
            "SHOW_ELEMENT_HOVER" => {
                let field = value.get("elementId")?;
                Some(InboundMessage::ShowElementHover {
                    element_id: field.as_str().filter(|s| !s.is_empty()).map(str::to_string),
                })
            }
            _ => None,
        }
    }

    /// Decode a JSON text
    pub fn from_json(text: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_envelope_shape() {
        let msg = OutboundMessage::Hit {
            id: Some("page.tsx:1:0".to_string()),
            tag: Some("h1".to_string()),
            rect: Some(BoxRect::from(Rect::new(6.0, 16.0, 108.0, 58.0))),
        };
        assert_eq!(
            msg.to_envelope().unwrap(),
            json!({
                "type": CHANNEL,
                "msg": "HIT",
                "id": "page.tsx:1:0",
                "tag": "h1",
                "rect": {"top": 16.0, "left": 6.0, "width": 108.0, "height": 58.0}
            })
        );
        assert_eq!(
            OutboundMessage::no_hit().to_envelope().unwrap(),
            json!({"type": CHANNEL, "msg": "HIT", "id": null, "tag": null, "rect": null})
        );
    }

    #[test]
    fn test_outbound_camel_case_fields() {
        let msg = OutboundMessage::ResizeElement {
            element_id: "a:1:2".to_string(),
            width: 120,
            height: 40,
        };
        let value = msg.to_envelope().unwrap();
        assert_eq!(value["msg"], "RESIZE_ELEMENT");
        assert_eq!(value["elementId"], "a:1:2");
        assert_eq!(msg.kind(), "RESIZE_ELEMENT");

        let unit = OutboundMessage::ScrollStarted.to_envelope().unwrap();
        assert_eq!(unit, json!({"type": CHANNEL, "msg": "SCROLL_STARTED"}));
    }

    #[test]
    fn test_inbound_top_level_types() {
        let msg = InboundMessage::from_value(&json!({
            "type": "ORCHIDS_STYLE_UPDATE",
            "elementId": "a:1:2",
            "styles": {"color": "red", "opacity": 0.5, "bogus": null}
        }))
        .unwrap();
        let InboundMessage::StyleUpdate { element_id, styles } = msg else {
            panic!("expected a style update");
        };
        assert_eq!(element_id, "a:1:2");
        assert_eq!(styles.get("opacity").map(String::as_str), Some("0.5"));
        assert_eq!(styles.len(), 2);
    }

    #[test]
    fn test_inbound_channel_messages() {
        assert_eq!(
            InboundMessage::from_value(&json!({"type": CHANNEL, "msg": "VISUAL_EDIT_MODE", "active": false})),
            Some(InboundMessage::VisualEditMode { active: false })
        );
        assert_eq!(
            InboundMessage::from_value(&json!({"type": CHANNEL, "msg": "SHOW_ELEMENT_HOVER", "elementId": null})),
            Some(InboundMessage::ShowElementHover { element_id: None })
        );
        assert_eq!(
            InboundMessage::from_value(&json!({"type": CHANNEL, "msg": "SCROLL", "dx": 0, "dy": 40})),
            Some(InboundMessage::Scroll { dx: 0.0, dy: 40.0 })
        );
        assert_eq!(
            InboundMessage::from_value(&json!({"type": CHANNEL, "msg": "PREVIEW_FONT", "elementId": ""})),
            None
        );
        assert_eq!(InboundMessage::from_value(&json!({"type": "OTHER"})), None);
    }

    #[test]
    fn test_inbound_from_json_reports_invalid_payloads() {
        assert!(InboundMessage::from_json("{oops").is_err());
        assert_eq!(InboundMessage::from_json("[]").unwrap(), None);
    }
}
