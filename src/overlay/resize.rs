//! Resize handles and drag arithmetic

use crate::dom::{Point, Rect, Size};
use serde::Serialize;

/// Handle edge length along the edge
const HANDLE_LONG: f32 = 16.0;
/// Handle thickness across the edge, and the side of corner handles
const HANDLE_SHORT: f32 = 8.0;

/// One of the eight handles on the focus box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NW,
    NE,
    SW,
    SE,
}

impl ResizeHandle {
    /// Hit-test order: corners win over the edge handles they overlap
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SW,
        ResizeHandle::SE,
        ResizeHandle::N,
        ResizeHandle::S,
        ResizeHandle::E,
        ResizeHandle::W,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResizeHandle::N => "n",
            ResizeHandle::S => "s",
            ResizeHandle::E => "e",
            ResizeHandle::W => "w",
            ResizeHandle::NW => "nw",
            ResizeHandle::NE => "ne",
            ResizeHandle::SW => "sw",
            ResizeHandle::SE => "se",
        }
    }

    fn moves_east(self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::NE | ResizeHandle::SE)
    }

    fn moves_west(self) -> bool {
        matches!(self, ResizeHandle::W | ResizeHandle::NW | ResizeHandle::SW)
    }

    fn moves_south(self) -> bool {
        matches!(self, ResizeHandle::S | ResizeHandle::SW | ResizeHandle::SE)
    }

    fn moves_north(self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::NW | ResizeHandle::NE)
    }

    /// Handle rectangle for a focus box
    pub fn rect(self, focus: Rect) -> Rect {
        let half = HANDLE_SHORT / 2.0;
        let (left, top, right, bottom) = (
            focus.x,
            focus.y,
            focus.x + focus.width,
            focus.y + focus.height,
        );
        let mid_x = focus.x + focus.width / 2.0;
        let mid_y = focus.y + focus.height / 2.0;
        match self {
            ResizeHandle::N => Rect::new(mid_x - HANDLE_LONG / 2.0, top - half, HANDLE_LONG, HANDLE_SHORT),
            ResizeHandle::S => {
                Rect::new(mid_x - HANDLE_LONG / 2.0, bottom - half, HANDLE_LONG, HANDLE_SHORT)
            }
            ResizeHandle::E => Rect::new(right - half, mid_y - HANDLE_LONG / 2.0, HANDLE_SHORT, HANDLE_LONG),
            ResizeHandle::W => Rect::new(left - half, mid_y - HANDLE_LONG / 2.0, HANDLE_SHORT, HANDLE_LONG),
            ResizeHandle::NW => Rect::new(left - half, top - half, HANDLE_SHORT, HANDLE_SHORT),
            ResizeHandle::NE => Rect::new(right - half, top - half, HANDLE_SHORT, HANDLE_SHORT),
            ResizeHandle::SW => Rect::new(left - half, bottom - half, HANDLE_SHORT, HANDLE_SHORT),
            ResizeHandle::SE => Rect::new(right - half, bottom - half, HANDLE_SHORT, HANDLE_SHORT),
        }
    }

    /// All handle rectangles, in hit-test order
    pub fn layout(focus: Rect) -> Vec<(ResizeHandle, Rect)> {
        Self::ALL.iter().map(|h| (*h, h.rect(focus))).collect()
    }

    /// Handle under a point, if any
    pub fn hit_test(focus: Rect, x: f32, y: f32) -> Option<ResizeHandle> {
        Self::ALL.into_iter().find(|h| h.rect(focus).contains(x, y))
    }
}

/// An in-progress drag
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub handle: ResizeHandle,
    pub origin: Point,
    pub start: Size,
    /// Content box of the parent, when there is one
    pub bounds: Option<Size>,
}

impl ResizeSession {
    /// Size for the pointer at `pointer`, clamped to `[min, bounds]`
    ///
    /// The minimum wins when the parent is smaller than it.
    pub fn size_at(&self, pointer: Point, min: f32) -> Size {
        let dx = pointer.x - self.origin.x;
        let dy = pointer.y - self.origin.y;
        let mut width = self.start.width;
        let mut height = self.start.height;
        if self.handle.moves_east() {
            width = self.start.width + dx;
        }
        if self.handle.moves_west() {
            width = self.start.width - dx;
        }
        if self.handle.moves_south() {
            height = self.start.height + dy;
        }
        if self.handle.moves_north() {
            height = self.start.height - dy;
        }
        if let Some(bounds) = self.bounds {
            width = width.min(bounds.width);
            height = height.min(bounds.height);
        }
        Size {
            width: width.max(min),
            height: height.max(min),
        }
    }

    /// [`size_at`](Self::size_at) in whole pixels; rounding never crosses
    /// the bounds
    pub fn pixel_size_at(&self, pointer: Point, min: f32) -> (i64, i64) {
        let size = self.size_at(pointer, min);
        (
            whole_pixels(size.width, self.bounds.map(|b| b.width.max(min))),
            whole_pixels(size.height, self.bounds.map(|b| b.height.max(min))),
        )
    }
}

fn whole_pixels(value: f32, max: Option<f32>) -> i64 {
    let rounded = value.round();
    match max {
        Some(max) if rounded > max => value.floor() as i64,
        _ => rounded as i64,
    }
}

const WIDTH_BREAKPOINTS: [f64; 6] = [25.0, 33.333, 50.0, 66.667, 75.0, 100.0];
const HEIGHT_BREAKPOINTS: [f64; 4] = [25.0, 50.0, 75.0, 100.0];
const BREAKPOINT_TOLERANCE: f64 = 0.5;

/// Final CSS value for a released dimension
///
/// Lands on a percentage of the parent's content box when within half a
/// percent of a breakpoint, otherwise rounded pixels.
fn release_value(value: f32, parent: Option<f32>, breakpoints: &[f64]) -> String {
    if let Some(parent) = parent.filter(|p| *p > 0.0) {
        let percent = f64::from(value) / f64::from(parent) * 100.0;
        if breakpoints
            .iter()
            .any(|b| (percent - b).abs() < BREAKPOINT_TOLERANCE)
        {
            let rounded = (percent * 10.0).round() / 10.0;
            return format!("{}%", rounded);
        }
    }
    format!("{}px", f64::from(value).round())
}

/// Width and height values emitted when a drag ends
pub fn release_values(size: Size, parent: Option<Size>) -> (String, String) {
    (
        release_value(size.width, parent.map(|p| p.width), &WIDTH_BREAKPOINTS),
        release_value(size.height, parent.map(|p| p.height), &HEIGHT_BREAKPOINTS),
    )
}
