//! Overlay engine configuration

use serde::Deserialize;

/// Timing, geometry and URL settings of the overlay engine
///
/// Times are in milliseconds of the host clock passed to every handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Padding added around hover and focus boxes
    pub box_padding: f32,
    /// Quiet period after the last scroll event before `SCROLL_STOPPED`
    pub scroll_settle_ms: u64,
    /// How long a committed font shadows preview fonts for the same element
    pub font_grace_ms: u64,
    /// Delay before re-focusing the persisted element after mount
    pub restore_focus_delay_ms: u64,
    /// Clicks closer together than this are ignored
    pub click_debounce_ms: u64,
    /// Smallest width/height a resize drag can produce
    pub min_resize: f32,
    /// Base for resolving relative image sources
    pub page_origin: String,
    /// Stylesheet endpoint used when loading web fonts
    pub font_stylesheet_base: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            box_padding: 4.0,
            scroll_settle_ms: 16,
            font_grace_ms: 2000,
            restore_focus_delay_ms: 500,
            click_debounce_ms: 100,
            min_resize: 20.0,
            page_origin: "http://localhost:3000".to_string(),
            font_stylesheet_base: "https://fonts.googleapis.com/css2".to_string(),
        }
    }
}
