//! The overlay engine
//!
//! Owns every piece of mutable overlay state: edit mode, hover, focus, the
//! pending style patches, the image tracker, the font registry, the
//! deferred-task queue and the duplicate-suppressing messenger. Hosts feed
//! it [`HostEvent`]s and [`InboundMessage`]s, each stamped with the current
//! time; due deferred tasks run before the handler itself.

use super::config::OverlayConfig;
use super::events::{EventOutcome, HostEvent};
use super::identifier::ElementId;
use super::image::{normalize_image_src, resolve_image_src};
use super::index::IdentifierIndex;
use super::messenger::{MessageSink, Messenger};
use super::protocol::{BoxRect, InboundMessage, OutboundMessage};
use super::resize::{ResizeHandle, ResizeSession, release_values};
use super::state::{
    EditRelease, FocusMode, FocusState, FontRegistry, HoverState, ImageTracker, OverlayView,
    PendingPatches, Session, TextEdit,
};
use super::storage::{EDIT_MODE_KEY, FOCUSED_ELEMENT_KEY, FocusRecord, KeyValueStore};
use super::styles::{self, StyleMap};
use super::timers::{TimerId, Timers};
use crate::dom::{ChildNode, LiveDocument, NodeId, Point, Rect, Size, css};
use crate::{ID_ATTRIBUTE, NAME_ATTRIBUTE};
use serde_json::Value;
use url::Url;

/// Marks descendants locked while their container is edited
const PROTECTED_ATTRIBUTE: &str = "data-orchids-protected";

/// Tags whose simple text content can be edited in place
const TEXT_EDITABLE_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "span", "div", "li", "td", "th", "label", "a",
    "button",
];

/// Work queued for later
#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    /// Undo the editing markup of a node that lost focus
    ReleaseEditing(EditRelease),
    /// Re-focus the persisted element after mount
    RestoreFocus,
    ScrollSettled,
    FontGraceExpired(String),
}

/// In-page overlay over a live document
pub struct OverlayEngine<D: LiveDocument, S: KeyValueStore, P: MessageSink> {
    config: OverlayConfig,
    origin: Option<Url>,
    document: D,
    store: S,
    messenger: Messenger<P>,
    index: IdentifierIndex,
    timers: Timers<Deferred>,
    edit_mode: bool,
    session: Session,
    hover: HoverState,
    last_hit: Option<NodeId>,
    last_hit_id: Option<String>,
    /// Editing markup applied on pointer down, before the click lands
    prepared: Option<EditRelease>,
    scrolling: bool,
    scroll_timer: Option<TimerId>,
    patches: PendingPatches,
    image: ImageTracker,
    fonts: FontRegistry,
    last_click_at: Option<u64>,
    stylesheet_installed: bool,
}

impl<D: LiveDocument, S: KeyValueStore, P: MessageSink> OverlayEngine<D, S, P> {
    /// Create an engine; edit mode starts as persisted in `store`
    pub fn new(document: D, store: S, sink: P, config: OverlayConfig) -> Self {
        let origin = match Url::parse(&config.page_origin) {
            Ok(origin) => Some(origin),
            Err(e) => {
                log::warn!("Invalid page origin {:?}: {}", config.page_origin, e);
                None
            }
        };
        let edit_mode = store.get(EDIT_MODE_KEY).as_deref() == Some("true");
        Self {
            config,
            origin,
            document,
            store,
            messenger: Messenger::new(sink),
            index: IdentifierIndex::new(),
            timers: Timers::new(),
            edit_mode,
            session: Session::Unfocused,
            hover: HoverState::default(),
            last_hit: None,
            last_hit_id: None,
            prepared: None,
            scrolling: false,
            scroll_timer: None,
            patches: PendingPatches::default(),
            image: ImageTracker::default(),
            fonts: FontRegistry::default(),
            last_click_at: None,
            stylesheet_installed: false,
        }
    }

    /// Announce a restored edit mode and schedule focus restoration
    pub fn mount(&mut self, now: u64) {
        self.run_due(now);
        if !self.edit_mode {
            return;
        }
        self.store_set(EDIT_MODE_KEY, "true");
        self.install_stylesheet();
        self.post(OutboundMessage::VisualEditModeAck { active: true });
        self.post(OutboundMessage::VisualEditModeRestored { active: true });
        self.timers
            .schedule(now + self.config.restore_focus_delay_ms, Deferred::RestoreFocus);
        log::debug!("Mounted with edit mode restored");
    }

    /// Tear down page-visible side effects
    pub fn dispose(&mut self) {
        self.timers.clear();
        self.scroll_timer = None;
        self.scrolling = false;
        if let Session::Focused(focus) = std::mem::take(&mut self.session) {
            match focus.mode {
                FocusMode::TextEditing(edit) => self.release_editing(&edit.release),
                FocusMode::Resizing(_) => self.document.set_pointer_events_enabled(true),
                FocusMode::Viewing => {}
            }
        }
        if let Some(stale) = self.prepared.take() {
            self.release_editing(&stale);
        }
        self.hover.clear();
        self.fonts.clear_committed();
        self.index.invalidate();
        self.remove_stylesheet();
        self.messenger.reset();
        log::debug!("Overlay engine disposed");
    }

    /// Run deferred work that is due
    pub fn advance(&mut self, now: u64) {
        self.run_due(now);
    }

    /// Handle a page event
    pub fn handle_event(&mut self, event: HostEvent, now: u64) -> EventOutcome {
        self.run_due(now);
        log::trace!("Host event: {}", event.name());
        match event {
            HostEvent::PointerMove { x, y } => {
                self.on_pointer_move(x, y);
                EventOutcome::proceed()
            }
            HostEvent::PointerLeave => {
                self.on_pointer_leave();
                EventOutcome::proceed()
            }
            HostEvent::PointerDown { x, y, target } => self.on_pointer_down(x, y, target),
            HostEvent::PointerUp { .. } => {
                self.on_pointer_up();
                EventOutcome::proceed()
            }
            HostEvent::Click { x, y, target } => self.on_click(x, y, target, now),
            HostEvent::Submit if self.edit_mode => EventOutcome::prevent(),
            HostEvent::Submit => EventOutcome::proceed(),
            HostEvent::Scroll => {
                self.on_scroll(now);
                EventOutcome::proceed()
            }
            HostEvent::WindowResize => {
                self.refresh_focus();
                EventOutcome::proceed()
            }
            HostEvent::LayoutChanged { node } | HostEvent::Input { node } => {
                if self.session.focused_node() == Some(node) {
                    self.refresh_focus();
                }
                EventOutcome::proceed()
            }
            HostEvent::Focus { node } => {
                self.on_edit_focus(node);
                EventOutcome::proceed()
            }
            HostEvent::Blur { node } => {
                self.on_edit_blur(node);
                EventOutcome::proceed()
            }
        }
    }

    /// Handle a decoded parent message
    pub fn handle_message(&mut self, message: InboundMessage, now: u64) {
        self.run_due(now);
        match message {
            InboundMessage::StyleUpdate { element_id, styles } => {
                self.apply_style_update(&element_id, &styles, now)
            }
            InboundMessage::ImageUpdate {
                element_id,
                src,
                old_src,
            } => self.apply_image_update(&element_id, &src, old_src.as_deref()),
            InboundMessage::ResizeElement {
                element_id,
                width,
                height,
            } => self.apply_resize(&element_id, width, height),
            InboundMessage::PreviewFont {
                element_id,
                font_family,
            } => self.preview_font(&element_id, &font_family),
            InboundMessage::Scroll { dx, dy } => {
                self.document.scroll_by(dx, dy);
                self.on_scroll(now);
            }
            InboundMessage::VisualEditMode { active } => self.set_edit_mode(active),
            InboundMessage::ClearInlineStyles { element_id } => {
                self.clear_inline_styles(&element_id)
            }
            InboundMessage::ShowElementHover { element_id } => {
                self.show_element_hover(element_id.as_deref())
            }
        }
    }

    /// Handle a raw parent message, ignoring anything unrecognised
    pub fn handle_message_value(&mut self, value: &Value, now: u64) {
        match InboundMessage::from_value(value) {
            Some(message) => self.handle_message(message, now),
            None => {
                self.run_due(now);
                log::debug!("Ignoring message: {}", value);
            }
        }
    }

    /// What a renderer should draw right now
    pub fn view(&self) -> OverlayView {
        let focus = self.session.focus();
        OverlayView {
            hover_boxes: self.hover.boxes.iter().map(|r| BoxRect::from(*r)).collect(),
            hover_box: self.hover.primary.map(BoxRect::from),
            hover_tag: self.hover.tag.clone(),
            focus_box: focus.map(|f| BoxRect::from(f.rect)),
            focus_tag: focus.map(|f| f.tag.clone()),
            handles: focus
                .map(|f| {
                    ResizeHandle::layout(f.rect)
                        .into_iter()
                        .map(|(handle, rect)| (handle, BoxRect::from(rect)))
                        .collect()
                })
                .unwrap_or_default(),
            resizing: self.session.is_resizing(),
        }
    }

    /// Resize handle under a viewport point
    pub fn resize_handle_at(&self, x: f32, y: f32) -> Option<ResizeHandle> {
        let focus = self.session.focus()?;
        ResizeHandle::hit_test(focus.rect, x, y)
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn pending_patches(&self) -> &PendingPatches {
        &self.patches
    }

    pub fn is_scrolling(&self) -> bool {
        self.scrolling
    }

    /// Earliest time `advance` has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_due()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn messenger(&self) -> &Messenger<P> {
        &self.messenger
    }

    pub fn sink_mut(&mut self) -> &mut P {
        self.messenger.sink_mut()
    }

    pub fn into_parts(self) -> (D, S, P) {
        (self.document, self.store, self.messenger.into_sink())
    }

    // --- deferred work ---

    fn run_due(&mut self, now: u64) {
        while let Some((due, task)) = self.timers.pop_due(now) {
            self.execute(task, due);
        }
    }

    fn execute(&mut self, task: Deferred, due: u64) {
        match task {
            Deferred::ReleaseEditing(release) => {
                let editing = self
                    .session
                    .focus()
                    .and_then(FocusState::text_edit)
                    .is_some_and(|edit| edit.release.node == release.node);
                let prepared = self.prepared.as_ref().is_some_and(|p| p.node == release.node);
                if !editing && !prepared {
                    self.release_editing(&release);
                }
            }
            Deferred::RestoreFocus => self.restore_focus(due),
            Deferred::ScrollSettled => {
                self.scroll_timer = None;
                self.scrolling = false;
                self.post(OutboundMessage::ScrollStopped);
            }
            Deferred::FontGraceExpired(id) => self.fonts.expire(&id),
        }
    }

    fn restore_focus(&mut self, now: u64) {
        let Some(raw) = self.store.get(FOCUSED_ELEMENT_KEY) else {
            return;
        };
        let record: FocusRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Ignoring unreadable focus record: {}", e);
                return;
            }
        };
        self.index.refresh(&self.document);
        let Some(node) = self.index.first(&record.id) else {
            return;
        };
        let center = self.document.bounding_client_rect(node).center();
        log::debug!("Restoring focus to {}", record.id);
        self.on_click(center.x, center.y, Some(node), now);
    }

    // --- hover ---

    fn on_pointer_move(&mut self, x: f32, y: f32) {
        if let Some(focus) = self.session.focus() {
            if let FocusMode::Resizing(session) = &focus.mode {
                let (width, height) =
                    session.pixel_size_at(Point::new(x, y), self.config.min_resize);
                let element_id = focus.id.clone();
                self.hover.primary = None;
                self.post(OutboundMessage::ResizeElement {
                    element_id,
                    width,
                    height,
                });
                return;
            }
        }
        if !self.edit_mode || self.scrolling {
            return;
        }

        let hit = self
            .document
            .element_from_point(x, y)
            .and_then(|node| self.closest_tagged(node));
        if hit == self.last_hit {
            return;
        }
        self.last_hit = hit;

        let Some(hit) = hit else {
            self.hover.clear();
            self.last_hit_id = None;
            self.flush_image();
            self.post(OutboundMessage::no_hit());
            return;
        };
        let Some(id) = self.document.attribute(hit, ID_ATTRIBUTE) else {
            return;
        };
        if self.last_hit_id.as_deref() == Some(id.as_str()) {
            return;
        }
        self.last_hit_id = Some(id.clone());

        let tag = self.semantic_tag(hit);
        let is_focused = self.session.focused_id() == Some(id.as_str());
        self.hover.boxes = self.instance_boxes(&id, self.session.focused_node());
        self.hover.primary = (!is_focused).then(|| self.expanded_rect(hit));
        self.hover.tag = Some(tag.clone());
        self.post(OutboundMessage::Hit {
            id: Some(id),
            tag: Some(tag),
            rect: self.hover.primary.map(BoxRect::from),
        });
    }

    fn on_pointer_leave(&mut self) {
        if !self.edit_mode || self.session.is_resizing() {
            return;
        }
        self.hover.clear();
        self.flush_image();
        self.last_hit = None;
        self.last_hit_id = None;
        self.post(OutboundMessage::no_hit());
    }

    fn on_scroll(&mut self, now: u64) {
        if self.edit_mode && !self.session.is_resizing() {
            self.begin_scrolling(now);
        }
        self.refresh_focus();
    }

    fn begin_scrolling(&mut self, now: u64) {
        let started = !self.scrolling;
        self.scrolling = true;
        self.hover.clear();
        self.last_hit = None;
        self.last_hit_id = None;
        self.flush_image();
        if started {
            self.post(OutboundMessage::ScrollStarted);
        }
        if let Some(timer) = self.scroll_timer.take() {
            self.timers.cancel(timer);
        }
        self.scroll_timer = Some(
            self.timers
                .schedule(now + self.config.scroll_settle_ms, Deferred::ScrollSettled),
        );
    }

    // --- focus ---

    fn on_click(&mut self, x: f32, y: f32, target: Option<NodeId>, now: u64) -> EventOutcome {
        if !self.edit_mode || self.session.is_resizing() {
            return EventOutcome::proceed();
        }
        let target = target.or_else(|| self.document.element_from_point(x, y));
        let inside_link = target.is_some_and(|node| self.inside_static_link(node));

        if let Some(last) = self.last_click_at {
            if now.saturating_sub(last) < self.config.click_debounce_ms {
                log::trace!("Click debounced");
                return EventOutcome {
                    default_prevented: inside_link,
                };
            }
        }
        self.last_click_at = Some(now);

        let click = Point::new(x, y);
        let prevent = match target.and_then(|node| self.closest_tagged(node)) {
            Some(hit) => self.focus_element(hit, click, now),
            None => {
                if self.session.focus().is_some() {
                    self.close_focus();
                    self.post(OutboundMessage::ElementClicked {
                        id: None,
                        tag: None,
                        rect: BoxRect::default(),
                        click_position: click,
                        is_editable: false,
                        current_styles: StyleMap::new(),
                        class_name: String::new(),
                        src: None,
                    });
                }
                false
            }
        };
        EventOutcome {
            default_prevented: prevent || inside_link,
        }
    }

    /// Focus `hit`; returns whether the click's native action is suppressed
    fn focus_element(&mut self, hit: NodeId, click: Point, now: u64) -> bool {
        let id = self
            .document
            .attribute(hit, ID_ATTRIBUTE)
            .unwrap_or_default();
        let tag = self.semantic_tag(hit);
        let tag_name = self.document.tag_name(hit).unwrap_or_default();
        let is_editable = self.is_text_editable(hit);
        let prevent = tag_name == "a"
            || self.has_ancestor_tag(hit, "a")
            || tag_name == "button"
            || self.document.attribute(hit, "role").as_deref() == Some("button")
            || !is_editable;

        // Close out the previous focus before switching
        self.flush_image();
        let mut kept_edit = None;
        if let Session::Focused(previous) = std::mem::take(&mut self.session) {
            if previous.node == hit {
                if let FocusMode::TextEditing(edit) = previous.mode {
                    kept_edit = Some(edit);
                }
            } else {
                self.flush_style(&previous.id, previous.node);
                if let FocusMode::TextEditing(edit) = previous.mode {
                    self.flush_text(previous.node, &previous.id, &edit.baseline);
                    self.timers
                        .schedule(now, Deferred::ReleaseEditing(edit.release));
                }
            }
        }
        let prepared = match self.prepared.take() {
            Some(p) if p.node == hit => Some(p),
            Some(stale) => {
                self.release_editing(&stale);
                None
            }
            None => None,
        };

        if let Ok(record) = serde_json::to_string(&FocusRecord {
            id: id.clone(),
            tag: tag.clone(),
        }) {
            self.store_set(FOCUSED_ELEMENT_KEY, &record);
        }

        let baseline_styles = styles::snapshot(&self.document, hit);
        self.hover.boxes = self.instance_boxes(&id, Some(hit));
        self.hover.primary = None;
        self.hover.tag = (!self.hover.boxes.is_empty()).then(|| tag.clone());

        let src = if tag_name == "img" {
            self.document.image_source(hit)
        } else {
            None
        };
        self.image.target = (tag_name == "img").then_some(hit);
        if let Some(src) = &src {
            self.image.baseline = normalize_image_src(src, self.origin.as_ref());
        }

        let mode = if is_editable {
            let edit = match kept_edit {
                Some(edit) => edit,
                None => {
                    let release = match prepared {
                        Some(release) => release,
                        None => self.prepare_editing(hit),
                    };
                    TextEdit {
                        baseline: self.current_text(hit),
                        release,
                    }
                }
            };
            FocusMode::TextEditing(edit)
        } else {
            if let Some(release) = prepared {
                self.release_editing(&release);
            }
            FocusMode::Viewing
        };

        let rect = self.expanded_rect(hit);
        let class_name = self.document.attribute(hit, "class").unwrap_or_default();
        let src = src.map(|raw| {
            resolve_image_src(&raw, self.origin.as_ref())
                .map(|url| url.to_string())
                .unwrap_or(raw)
        });
        log::debug!("Focused {} ({})", id, tag);
        self.session = Session::Focused(FocusState {
            node: hit,
            id: id.clone(),
            tag: tag.clone(),
            rect,
            baseline_styles: baseline_styles.clone(),
            mode,
        });
        self.post(OutboundMessage::ElementClicked {
            id: Some(id),
            tag: Some(tag),
            rect: rect.into(),
            click_position: click,
            is_editable,
            current_styles: baseline_styles,
            class_name,
            src,
        });
        prevent
    }

    /// Flush everything pending for the focused element and drop focus
    fn close_focus(&mut self) {
        self.flush_image();
        if let Session::Focused(previous) = std::mem::take(&mut self.session) {
            self.flush_style(&previous.id, previous.node);
            match previous.mode {
                FocusMode::TextEditing(edit) => {
                    self.flush_text(previous.node, &previous.id, &edit.baseline);
                    self.release_editing(&edit.release);
                }
                FocusMode::Resizing(_) => self.document.set_pointer_events_enabled(true),
                FocusMode::Viewing => {}
            }
            log::debug!("Focus cleared from {}", previous.id);
        }
        if let Some(stale) = self.prepared.take() {
            self.release_editing(&stale);
        }
        self.image.clear();
        self.hover.clear();
        self.store_remove(FOCUSED_ELEMENT_KEY);
    }

    fn refresh_focus(&mut self) {
        let Some(focus) = self.session.focus() else {
            return;
        };
        let rect = self.expanded_rect(focus.node);
        let id = focus.id.clone();
        if let Some(focus) = self.session.focus_mut() {
            focus.rect = rect;
        }
        self.post(OutboundMessage::FocusMoved {
            id,
            rect: rect.into(),
        });
    }

    /// Recompute the focus box without notifying the parent
    fn update_focus_box(&mut self) {
        let Some(node) = self.session.focused_node() else {
            return;
        };
        let rect = self.expanded_rect(node);
        if let Some(focus) = self.session.focus_mut() {
            focus.rect = rect;
        }
    }

    // --- text editing ---

    fn on_pointer_down(&mut self, x: f32, y: f32, target: Option<NodeId>) -> EventOutcome {
        if !self.edit_mode || self.session.is_resizing() {
            return EventOutcome::proceed();
        }
        if let Some(handle) = self.resize_handle_at(x, y) {
            self.start_resize(handle, x, y);
            return EventOutcome::prevent();
        }

        let target = target.or_else(|| self.document.element_from_point(x, y));
        let Some(hit) = target.and_then(|node| self.closest_tagged(node)) else {
            return EventOutcome::proceed();
        };
        if !self.is_text_editable(hit) {
            return EventOutcome::proceed();
        }
        let editing = self
            .session
            .focus()
            .and_then(FocusState::text_edit)
            .is_some_and(|edit| edit.release.node == hit);
        if editing || self.prepared.as_ref().is_some_and(|p| p.node == hit) {
            return EventOutcome::proceed();
        }
        if let Some(stale) = self.prepared.take() {
            self.release_editing(&stale);
        }
        self.prepared = Some(self.prepare_editing(hit));
        EventOutcome::proceed()
    }

    fn on_edit_focus(&mut self, node: NodeId) {
        let Some(id) = self.editing_id(node) else {
            return;
        };
        self.flush_style(&id, node);
        let text = self.current_text(node);
        if let Some(FocusMode::TextEditing(edit)) =
            self.session.focus_mut().map(|f| &mut f.mode)
        {
            edit.baseline = text;
        }
    }

    fn on_edit_blur(&mut self, node: NodeId) {
        let Some(id) = self.editing_id(node) else {
            return;
        };
        self.flush_style(&id, node);
        self.flush_editing_text();
    }

    /// Identifier of `node` when it is the element being text edited
    fn editing_id(&self, node: NodeId) -> Option<String> {
        let focus = self.session.focus()?;
        let edit = focus.text_edit()?;
        (edit.release.node == node).then(|| focus.id.clone())
    }

    /// Compare the edited element's text with its baseline and report a change
    fn flush_editing_text(&mut self) {
        let Some(focus) = self.session.focus() else {
            return;
        };
        let Some(edit) = focus.text_edit() else {
            return;
        };
        let (node, id, baseline) = (focus.node, focus.id.clone(), edit.baseline.clone());
        if let Some(text) = self.flush_text(node, &id, &baseline) {
            if let Some(FocusMode::TextEditing(edit)) =
                self.session.focus_mut().map(|f| &mut f.mode)
            {
                edit.baseline = text;
            }
        }
    }

    /// Emit `TEXT_CHANGED` when the text moved off `baseline`; returns the
    /// new baseline
    fn flush_text(&mut self, node: NodeId, id: &str, baseline: &str) -> Option<String> {
        let current = self.current_text(node);
        if current == baseline {
            return None;
        }
        let location = ElementId::parse(id)?;
        self.post(OutboundMessage::TextChanged {
            id: id.to_string(),
            old_text: wrap_multiline(baseline),
            new_text: wrap_multiline(&current),
            file_path: location.file_path,
            line: location.line,
            column: location.column,
        });
        Some(current)
    }

    /// Make `node` editable, locking its descendant elements
    fn prepare_editing(&mut self, node: NodeId) -> EditRelease {
        let was_editable =
            self.document.attribute(node, "contenteditable").as_deref() == Some("true");
        let mut protected = Vec::new();
        if !was_editable {
            self.document.set_style_property(node, "outline", "none", true);
            self.document.set_style_property(node, "box-shadow", "none", true);
            self.document.set_attribute(node, "contenteditable", "true");
            if self.child_element_count(node) > 0 {
                for child in self.document.descendant_elements(node) {
                    self.document.set_attribute(child, "contenteditable", "false");
                    self.document.set_attribute(child, PROTECTED_ATTRIBUTE, "true");
                    self.document.set_style_property(child, "user-select", "none", false);
                    protected.push(child);
                }
            }
        }
        EditRelease {
            node,
            was_editable,
            protected,
        }
    }

    fn release_editing(&mut self, release: &EditRelease) {
        for child in &release.protected {
            self.document.remove_attribute(*child, "contenteditable");
            self.document.remove_attribute(*child, PROTECTED_ATTRIBUTE);
            self.document.remove_style_property(*child, "user-select");
        }
        if !release.was_editable {
            self.document
                .set_attribute(release.node, "contenteditable", "false");
            self.document.remove_style_property(release.node, "outline");
            self.document.remove_style_property(release.node, "box-shadow");
        }
        self.document.blur(release.node);
    }

    fn is_text_editable(&self, node: NodeId) -> bool {
        if self.document.attribute(node, "contenteditable").as_deref() == Some("true") {
            return true;
        }
        let tag = self.document.tag_name(node).unwrap_or_default();
        if tag == "input" || tag == "textarea" {
            return true;
        }
        if !TEXT_EDITABLE_TAGS.contains(&tag.as_str())
            || self.document.text_content(node).trim().is_empty()
        {
            return false;
        }
        let children = self.document.child_nodes(node);
        let elements = children
            .iter()
            .filter(|c| matches!(c, ChildNode::Element(_)))
            .count();
        let direct_text = children
            .iter()
            .any(|c| matches!(c, ChildNode::Text(t) if !t.trim().is_empty()));
        elements == 0 || (elements <= 1 && direct_text)
    }

    /// Direct text when the element has child elements, else all text
    fn current_text(&self, node: NodeId) -> String {
        if self.child_element_count(node) == 0 {
            return self.document.text_content(node);
        }
        self.document
            .child_nodes(node)
            .into_iter()
            .filter_map(|child| match child {
                ChildNode::Text(text) => Some(text),
                ChildNode::Element(_) => None,
            })
            .collect()
    }

    fn child_element_count(&self, node: NodeId) -> usize {
        self.document
            .child_nodes(node)
            .iter()
            .filter(|c| matches!(c, ChildNode::Element(_)))
            .count()
    }

    // --- style, image, font ---

    fn flush_style(&mut self, id: &str, node: NodeId) {
        let Some(location) = ElementId::parse(id) else {
            return;
        };
        let Some(styles) = self.patches.take(id) else {
            return;
        };
        let class_name = self.document.attribute(node, "class").unwrap_or_default();
        self.post(OutboundMessage::StyleBlur {
            id: id.to_string(),
            styles,
            class_name,
            file_path: location.file_path,
            line: location.line,
            column: location.column,
        });
    }

    fn flush_image(&mut self) {
        let Some(node) = self.image.target else {
            return;
        };
        let Some(id) = self.document.attribute(node, ID_ATTRIBUTE) else {
            return;
        };
        let Some(location) = ElementId::parse(&id) else {
            return;
        };
        let origin = self.origin.as_ref();
        let current = self.document.image_source(node).unwrap_or_default();
        let new_src = normalize_image_src(&current, origin);
        let old_src = normalize_image_src(&self.image.baseline, origin);
        if new_src.is_empty() || new_src == old_src {
            return;
        }
        self.post(OutboundMessage::ImageBlur {
            id,
            old_src,
            new_src: new_src.clone(),
            file_path: location.file_path,
            line: location.line,
            column: location.column,
        });
        self.image.baseline = new_src;
        self.image.target = None;
    }

    fn apply_style_update(&mut self, id: &str, styles: &StyleMap, now: u64) {
        self.index.refresh(&self.document);
        let nodes = self.index.nodes(id).to_vec();
        if nodes.is_empty() {
            log::debug!("Style update for unknown element {}", id);
            return;
        }

        if let Some(family) = styles.get("fontFamily") {
            self.load_font(&styles::font_key(family));
            let timer = self.timers.schedule(
                now + self.config.font_grace_ms,
                Deferred::FontGraceExpired(id.to_string()),
            );
            if let Some(previous) = self.fonts.commit(id, family, timer) {
                self.timers.cancel(previous);
            }
        }

        for node in &nodes {
            for (property, value) in styles {
                styles::apply_property(&mut self.document, *node, property, value);
            }
        }

        let focused_here = self
            .session
            .focused_node()
            .is_some_and(|node| nodes.contains(&node));
        if focused_here {
            self.flush_editing_text();
            self.patches.merge(id, styles);
            self.update_focus_box();
        }
    }

    fn apply_image_update(&mut self, id: &str, src: &str, old_src: Option<&str>) {
        self.index.refresh(&self.document);
        let origin = self.origin.as_ref();
        let wanted = old_src.map(|s| normalize_image_src(s, origin));
        let images: Vec<NodeId> = self
            .index
            .nodes(id)
            .iter()
            .copied()
            .filter(|node| self.document.tag_name(*node).as_deref() == Some("img"))
            .collect();
        let matching = wanted.and_then(|wanted| {
            images.iter().copied().find(|node| {
                let current = self.document.image_source(*node).unwrap_or_default();
                normalize_image_src(&current, origin) == wanted
            })
        });
        let Some(node) = matching.or_else(|| images.first().copied()) else {
            log::debug!("Image update for unknown element {}", id);
            return;
        };

        self.document.remove_attribute(node, "srcset");
        self.document.set_image_source(node, src);
        self.image.baseline = normalize_image_src(src, self.origin.as_ref());
        self.image.target = Some(node);
        self.update_focus_box();
    }

    fn apply_resize(&mut self, id: &str, width: f64, height: f64) {
        self.index.refresh(&self.document);
        let Some(node) = self.index.first(id) else {
            return;
        };
        if self.session.focused_node() != Some(node) {
            return;
        }
        self.document
            .set_style_property(node, "width", &format!("{}px", width), true);
        self.document
            .set_style_property(node, "height", &format!("{}px", height), true);
        self.update_focus_box();
    }

    fn preview_font(&mut self, id: &str, family: &str) {
        if self.fonts.committed_family(id).is_some() {
            log::debug!("Preview font for {} ignored during grace window", id);
            return;
        }
        self.index.refresh(&self.document);
        let Some(node) = self.index.first(id) else {
            return;
        };
        self.load_font(&styles::preview_font_key(family));
        self.document.set_style_property(
            node,
            "font-family",
            &format!("'{}', sans-serif", family),
            false,
        );
    }

    fn load_font(&mut self, key: &str) {
        if self.fonts.mark_loaded(key) {
            let href = styles::font_stylesheet_url(&self.config.font_stylesheet_base, key);
            log::debug!("Loading font stylesheet {}", href);
            self.document.load_stylesheet(&href);
        }
    }

    fn clear_inline_styles(&mut self, id: &str) {
        self.index.refresh(&self.document);
        for node in self.index.nodes(id).to_vec() {
            for property in styles::CLEARABLE_PROPERTIES {
                self.document
                    .remove_style_property(node, &styles::to_kebab_case(property));
            }
        }
        self.patches.remove(id);
    }

    fn show_element_hover(&mut self, id: Option<&str>) {
        let Some(id) = id else {
            self.hover.boxes.clear();
            self.hover.tag = None;
            return;
        };
        self.index.refresh(&self.document);
        let nodes = self.index.nodes(id).to_vec();
        if nodes.is_empty() {
            return;
        }
        let focused = self.session.focused_node();
        let visible: Vec<NodeId> = nodes.into_iter().filter(|n| Some(*n) != focused).collect();
        self.hover.tag = visible.first().map(|node| self.semantic_tag(*node));
        self.hover.boxes = visible.iter().map(|node| self.expanded_rect(*node)).collect();
    }

    // --- resize ---

    fn start_resize(&mut self, handle: ResizeHandle, x: f32, y: f32) {
        let Some(focus) = self.session.focus() else {
            return;
        };
        let (node, id) = (focus.node, focus.id.clone());
        if let Some(edit) = focus.text_edit().cloned() {
            self.flush_text(node, &id, &edit.baseline);
            self.release_editing(&edit.release);
        }

        let rect = self.document.bounding_client_rect(node);
        let bounds = self.parent_content_size(node);
        self.hover.clear();
        self.last_hit = None;
        self.last_hit_id = None;
        self.document.set_pointer_events_enabled(false);
        if let Some(focus) = self.session.focus_mut() {
            focus.mode = FocusMode::Resizing(ResizeSession {
                handle,
                origin: Point::new(x, y),
                start: Size {
                    width: rect.width,
                    height: rect.height,
                },
                bounds,
            });
        }
        log::debug!("Resize started on {} from {}", id, handle.name());
    }

    fn on_pointer_up(&mut self) {
        let Some(focus) = self.session.focus_mut() else {
            return;
        };
        if !focus.is_resizing() {
            return;
        }
        focus.mode = FocusMode::Viewing;
        let (node, id) = (focus.node, focus.id.clone());

        let rect = self.document.bounding_client_rect(node);
        let width = css::parse_px(&self.document.computed_style(node, "width")).unwrap_or(rect.width);
        let height =
            css::parse_px(&self.document.computed_style(node, "height")).unwrap_or(rect.height);
        let parent = self.parent_content_size(node);
        let (width, height) = release_values(Size { width, height }, parent);

        let mut styles = StyleMap::new();
        if is_constrained(&self.document.computed_style(node, "max-width")) {
            styles.insert("maxWidth".to_string(), width.clone());
        }
        if is_constrained(&self.document.computed_style(node, "max-height")) {
            styles.insert("maxHeight".to_string(), height.clone());
        }
        styles.insert("width".to_string(), width);
        styles.insert("height".to_string(), height);

        let location = ElementId::parse(&id);
        let class_name = self.document.attribute(node, "class").unwrap_or_default();
        self.post(OutboundMessage::StyleBlur {
            id: id.clone(),
            styles,
            class_name,
            file_path: location
                .as_ref()
                .map(|l| l.file_path.clone())
                .unwrap_or_default(),
            line: location.as_ref().map_or(0, |l| l.line),
            column: location.as_ref().map_or(0, |l| l.column),
        });
        self.document.set_pointer_events_enabled(true);
        self.last_hit = None;
        log::debug!("Resize finished on {}", id);
    }

    fn parent_content_size(&self, node: NodeId) -> Option<Size> {
        let parent = self.document.parent_element(node)?;
        let rect = self.document.bounding_client_rect(parent);
        let padding = |property: &str| {
            css::parse_px(&self.document.computed_style(parent, property)).unwrap_or(0.0)
        };
        Some(Size {
            width: rect.width - padding("padding-left") - padding("padding-right"),
            height: rect.height - padding("padding-top") - padding("padding-bottom"),
        })
    }

    // --- edit mode ---

    fn set_edit_mode(&mut self, active: bool) {
        if active {
            self.edit_mode = true;
            self.store_set(EDIT_MODE_KEY, "true");
            self.install_stylesheet();
            self.post(OutboundMessage::VisualEditModeAck { active: true });
            log::debug!("Edit mode on");
            return;
        }

        self.edit_mode = false;
        self.post(OutboundMessage::VisualEditModeAck { active: false });
        self.close_focus();
        if let Some(timer) = self.scroll_timer.take() {
            self.timers.cancel(timer);
        }
        self.scrolling = false;
        self.patches.clear();
        self.fonts.clear_committed();
        self.image = ImageTracker::default();
        self.hover.clear();
        self.last_hit = None;
        self.last_hit_id = None;
        self.store_remove(EDIT_MODE_KEY);
        self.store_remove(FOCUSED_ELEMENT_KEY);
        self.remove_stylesheet();
        self.document.set_pointer_events_enabled(true);
        self.post(OutboundMessage::no_hit());
        self.messenger.reset();
        log::debug!("Edit mode off");
    }

    fn install_stylesheet(&mut self) {
        if !self.stylesheet_installed {
            self.document.set_edit_stylesheet(Some(styles::EDIT_STYLESHEET));
            self.stylesheet_installed = true;
        }
    }

    fn remove_stylesheet(&mut self) {
        if self.stylesheet_installed {
            self.document.set_edit_stylesheet(None);
            self.stylesheet_installed = false;
        }
    }

    // --- helpers ---

    fn post(&mut self, message: OutboundMessage) {
        self.messenger.post(&message);
    }

    fn store_set(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("Failed to persist {}: {}", key, e);
        }
    }

    fn store_remove(&mut self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            log::warn!("Failed to remove {}: {}", key, e);
        }
    }

    fn closest_tagged(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.document.attribute(n, ID_ATTRIBUTE).is_some() {
                return Some(n);
            }
            current = self.document.parent_element(n);
        }
        None
    }

    fn has_ancestor_tag(&self, node: NodeId, tag: &str) -> bool {
        let mut current = self.document.parent_element(node);
        while let Some(n) = current {
            if self.document.tag_name(n).as_deref() == Some(tag) {
                return true;
            }
            current = self.document.parent_element(n);
        }
        false
    }

    /// Inside an anchor that is not itself being edited
    fn inside_static_link(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.document.tag_name(n).as_deref() == Some("a") {
                return self.document.attribute(n, "contenteditable").as_deref() != Some("true");
            }
            current = self.document.parent_element(n);
        }
        false
    }

    fn semantic_tag(&self, node: NodeId) -> String {
        self.document
            .attribute(node, NAME_ATTRIBUTE)
            .or_else(|| self.document.tag_name(node))
            .unwrap_or_default()
    }

    fn expanded_rect(&self, node: NodeId) -> Rect {
        self.document
            .bounding_client_rect(node)
            .expand(self.config.box_padding)
    }

    /// Boxes of every live instance of `id` except `exclude`
    fn instance_boxes(&mut self, id: &str, exclude: Option<NodeId>) -> Vec<Rect> {
        self.index.refresh(&self.document);
        self.index
            .nodes(id)
            .iter()
            .filter(|node| Some(**node) != exclude)
            .map(|node| self.expanded_rect(*node))
            .collect()
    }
}

fn is_constrained(value: &str) -> bool {
    !value.is_empty() && value != "none" && value != "initial"
}

/// Multi-line text travels as a template literal expression
pub fn wrap_multiline(text: &str) -> String {
    if text.contains('\n') {
        format!("{{`{}`}}", text.replace('\n', "\\n"))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::overlay::messenger::Outbox;
    use crate::overlay::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    type TestEngine = OverlayEngine<Document, MemoryStore, Outbox>;

    struct Page {
        engine: TestEngine,
        heading: NodeId,
        items: Vec<NodeId>,
        image: NodeId,
        link: NodeId,
        card: NodeId,
    }

    const HEADING: &str = "src/app/page.tsx:10:6";
    const ITEM: &str = "src/app/page.tsx:14:10@items";
    const IMAGE: &str = "src/app/page.tsx:20:6";
    const LINK: &str = "src/app/page.tsx:22:6";
    const CARD: &str = "src/app/page.tsx:24:6";

    fn tag(doc: &mut Document, node: NodeId, id: &str, name: &str) {
        doc.set_attribute(node, ID_ATTRIBUTE, id);
        doc.set_attribute(node, NAME_ATTRIBUTE, name);
    }

    fn page_with_store(store: MemoryStore) -> Page {
        let mut doc = Document::new();
        let root = doc.root();
        let main = doc.append_element(root, "main", Rect::new(0.0, 0.0, 1000.0, 700.0));
        doc.set_computed_style(main, "padding-left", "50px");
        doc.set_computed_style(main, "padding-right", "50px");

        let heading = doc.append_element(main, "h1", Rect::new(100.0, 20.0, 400.0, 40.0));
        tag(&mut doc, heading, HEADING, "h1");
        doc.set_attribute(heading, "class", "text-4xl");
        doc.append_text(heading, "Welcome");

        let mut items = Vec::new();
        for i in 0..3 {
            let li = doc.append_element(
                main,
                "li",
                Rect::new(100.0, 100.0 + 30.0 * i as f32, 200.0, 20.0),
            );
            tag(&mut doc, li, ITEM, "li");
            doc.append_text(li, &format!("Item {}", i));
            items.push(li);
        }

        let image = doc.append_element(main, "img", Rect::new(100.0, 250.0, 300.0, 150.0));
        tag(&mut doc, image, IMAGE, "img");
        doc.set_attribute(image, "src", "/hero.png");
        doc.set_attribute(image, "srcset", "/hero.png 1x, /hero@2x.png 2x");

        let link = doc.append_element(main, "a", Rect::new(100.0, 420.0, 100.0, 20.0));
        tag(&mut doc, link, LINK, "a");
        doc.set_attribute(link, "href", "/about");
        doc.append_text(link, "About");

        let card = doc.append_element(main, "div", Rect::new(500.0, 420.0, 300.0, 200.0));
        tag(&mut doc, card, CARD, "div");
        doc.append_text(card, "Card title ");
        let badge = doc.append_element(card, "span", Rect::new(510.0, 430.0, 40.0, 20.0));
        doc.append_text(badge, "new");

        let engine = OverlayEngine::new(doc, store, Outbox::new(), OverlayConfig::default());
        Page {
            engine,
            heading,
            items,
            image,
            link,
            card,
        }
    }

    fn page() -> Page {
        let mut page = page_with_store(MemoryStore::new());
        page.engine
            .handle_message(InboundMessage::VisualEditMode { active: true }, 0);
        page.engine.sink_mut().drain();
        page
    }

    fn drain(engine: &mut TestEngine) -> Vec<Value> {
        engine.sink_mut().drain()
    }

    fn kinds(messages: &[Value]) -> Vec<&str> {
        messages.iter().filter_map(|m| m["msg"].as_str()).collect()
    }

    fn click(engine: &mut TestEngine, node: NodeId, now: u64) -> EventOutcome {
        let c = engine.document().bounding_client_rect(node).center();
        engine.handle_event(
            HostEvent::PointerDown {
                x: c.x,
                y: c.y,
                target: Some(node),
            },
            now,
        );
        engine.handle_event(
            HostEvent::Click {
                x: c.x,
                y: c.y,
                target: Some(node),
            },
            now,
        )
    }

    fn style_update(engine: &mut TestEngine, id: &str, styles: &[(&str, &str)], now: u64) {
        engine.handle_message(
            InboundMessage::StyleUpdate {
                element_id: id.to_string(),
                styles: styles
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            now,
        );
    }

    #[test]
    fn test_hover_reports_hit_with_padded_box() {
        let mut page = page();
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 30.0 }, 1);
        let messages = drain(&mut page.engine);
        assert_eq!(
            messages,
            vec![json!({
                "type": "ORCHIDS_HOVER_v1",
                "msg": "HIT",
                "id": HEADING,
                "tag": "h1",
                "rect": {"top": 16.0, "left": 96.0, "width": 408.0, "height": 48.0}
            })]
        );
        assert_eq!(page.engine.hover().boxes.len(), 1);
    }

    #[test]
    fn test_hover_covers_every_instance() {
        let mut page = page();
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 110.0 }, 1);
        assert_eq!(page.engine.hover().boxes.len(), 3);
        assert_eq!(page.engine.hover().tag.as_deref(), Some("li"));

        // Moving to a sibling instance of the same identifier stays quiet
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 140.0 }, 2);
        assert_eq!(kinds(&drain(&mut page.engine)), vec!["HIT"]);
    }

    #[test]
    fn test_hover_is_inactive_outside_edit_mode() {
        let mut page = page_with_store(MemoryStore::new());
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 30.0 }, 1);
        assert!(drain(&mut page.engine).is_empty());
    }

    #[test]
    fn test_hover_over_focused_identifier_suppresses_primary_box() {
        let mut page = page();
        click(&mut page.engine, page.items[0], 1);
        drain(&mut page.engine);

        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 140.0 }, 2);
        let messages = drain(&mut page.engine);
        assert_eq!(messages[0]["id"], ITEM);
        assert_eq!(messages[0]["rect"], Value::Null);
        assert_eq!(page.engine.hover().boxes.len(), 2);
        assert!(page.engine.hover().primary.is_none());
    }

    #[test]
    fn test_pointer_leave_clears_hover() {
        let mut page = page();
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 30.0 }, 1);
        page.engine.handle_event(HostEvent::PointerLeave, 2);
        let messages = drain(&mut page.engine);
        assert_eq!(messages[1], json!({"type": "ORCHIDS_HOVER_v1", "msg": "HIT", "id": null, "tag": null, "rect": null}));
        assert!(page.engine.hover().is_empty());
    }

    #[test]
    fn test_click_focuses_and_persists() {
        let mut page = page();
        let outcome = click(&mut page.engine, page.heading, 5);
        assert!(!outcome.default_prevented);

        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["ELEMENT_CLICKED"]);
        let clicked = &messages[0];
        assert_eq!(clicked["id"], HEADING);
        assert_eq!(clicked["isEditable"], true);
        assert_eq!(clicked["className"], "text-4xl");
        assert_eq!(clicked["clickPosition"], json!({"x": 300.0, "y": 40.0}));
        assert_eq!(clicked["currentStyles"]["backgroundColor"], "transparent");
        assert!(clicked.get("src").is_none());

        let record: FocusRecord =
            serde_json::from_str(&page.engine.store().get(FOCUSED_ELEMENT_KEY).unwrap()).unwrap();
        assert_eq!(record.id, HEADING);
        assert!(matches!(
            page.engine.session().focus().map(|f| &f.mode),
            Some(FocusMode::TextEditing(_))
        ));
        assert_eq!(
            page.engine.document().attribute(page.heading, "contenteditable").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_click_debounce() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        click(&mut page.engine, page.image, 1050);
        assert_eq!(page.engine.session().focused_node(), Some(page.heading));
        click(&mut page.engine, page.image, 1200);
        assert_eq!(page.engine.session().focused_node(), Some(page.image));
    }

    #[test]
    fn test_link_and_container_clicks_are_prevented() {
        let mut page = page();
        assert!(click(&mut page.engine, page.link, 1000).default_prevented);
        assert!(click(&mut page.engine, page.image, 2000).default_prevented);
        assert!(page.engine.handle_event(HostEvent::Submit, 3000).default_prevented);
    }

    #[test]
    fn test_style_update_applies_to_all_instances_but_patches_only_focus() {
        let mut page = page();
        click(&mut page.engine, page.items[1], 1000);
        style_update(&mut page.engine, ITEM, &[("color", "red")], 1100);

        for item in &page.items {
            let style = page.engine.document().inline_style(*item).unwrap();
            assert_eq!(style.get("color"), Some("red"));
            assert!(style.is_important("color"));
        }
        assert!(page.engine.pending_patches().has_pending(ITEM));

        style_update(&mut page.engine, HEADING, &[("color", "blue")], 1200);
        assert!(!page.engine.pending_patches().has_pending(HEADING));
    }

    #[test]
    fn test_neutral_style_removes_property_and_stays_out_of_flush() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        style_update(&mut page.engine, HEADING, &[("backgroundColor", "red"), ("fontSize", "20px")], 1100);
        style_update(&mut page.engine, HEADING, &[("backgroundColor", "rgba(0,0,0,0)")], 1200);
        let style = page.engine.document().inline_style(page.heading).unwrap();
        assert_eq!(style.get("background-color"), None);
        drain(&mut page.engine);

        page.engine
            .handle_event(HostEvent::Blur { node: page.heading }, 1300);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["STYLE_BLUR"]);
        assert_eq!(messages[0]["styles"], json!({"fontSize": "20px"}));
        assert_eq!(messages[0]["filePath"], "src/app/page.tsx");
        assert_eq!(messages[0]["line"], 10);
        assert_eq!(messages[0]["column"], 6);

        // Nothing pending: a second blur is silent
        page.engine
            .handle_event(HostEvent::Blur { node: page.heading }, 1400);
        assert!(drain(&mut page.engine).is_empty());
    }

    #[test]
    fn test_switching_focus_flushes_previous_edits_first() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        style_update(&mut page.engine, HEADING, &[("color", "red")], 1100);
        let text = page.engine.document().child_nodes(page.heading).len();
        assert_eq!(text, 1);
        let text_node = page.engine.document().get_node(page.heading).unwrap().children[0];
        page.engine.document_mut().set_text(text_node, "Hello\nthere");
        drain(&mut page.engine);

        click(&mut page.engine, page.items[0], 1200);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["STYLE_BLUR", "TEXT_CHANGED", "ELEMENT_CLICKED"]);
        assert_eq!(messages[1]["oldText"], "Welcome");
        assert_eq!(messages[1]["newText"], "{`Hello\\nthere`}");

        // The heading is released once deferred work runs
        page.engine.advance(1200);
        assert_eq!(
            page.engine.document().attribute(page.heading, "contenteditable").as_deref(),
            Some("false")
        );
        assert!(page.engine.document().blurred().contains(&page.heading));
    }

    #[test]
    fn test_unchanged_text_emits_nothing_on_switch() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        drain(&mut page.engine);
        click(&mut page.engine, page.items[0], 1200);
        assert_eq!(kinds(&drain(&mut page.engine)), vec!["ELEMENT_CLICKED"]);
    }

    #[test]
    fn test_container_edit_protects_children_and_tracks_direct_text() {
        let mut page = page();
        click(&mut page.engine, page.card, 1000);
        let badge = page.engine.document().descendant_elements(page.card)[0];
        assert_eq!(
            page.engine.document().attribute(badge, PROTECTED_ATTRIBUTE).as_deref(),
            Some("true")
        );
        let text_node = page.engine.document().get_node(page.card).unwrap().children[0];
        page.engine.document_mut().set_text(text_node, "Card heading ");
        drain(&mut page.engine);

        page.engine.handle_event(HostEvent::Blur { node: page.card }, 1100);
        let messages = drain(&mut page.engine);
        assert_eq!(messages[0]["oldText"], "Card title ");
        assert_eq!(messages[0]["newText"], "Card heading ");

        // Baseline moved: blurring again is silent
        page.engine.handle_event(HostEvent::Blur { node: page.card }, 1200);
        assert!(drain(&mut page.engine).is_empty());
    }

    #[test]
    fn test_click_outside_clears_focus() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        drain(&mut page.engine);
        page.engine.handle_event(
            HostEvent::Click {
                x: 1200.0,
                y: 710.0,
                target: None,
            },
            1200,
        );
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["ELEMENT_CLICKED"]);
        assert_eq!(messages[0]["id"], Value::Null);
        assert_eq!(messages[0]["currentStyles"], json!({}));
        assert!(page.engine.session().focus().is_none());
        assert_eq!(page.engine.store().get(FOCUSED_ELEMENT_KEY), None);
    }

    #[test]
    fn test_image_update_and_flush_on_scroll() {
        let mut page = page();
        click(&mut page.engine, page.image, 1000);
        let messages = drain(&mut page.engine);
        assert_eq!(messages[0]["src"], "http://localhost:3000/hero.png");

        page.engine.document_mut().set_attribute(page.image, "src", "/_next/image?url=%2Fnew.png&w=640");
        page.engine.handle_event(HostEvent::Scroll, 1100);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["IMAGE_BLUR", "SCROLL_STARTED", "FOCUS_MOVED"]);
        assert_eq!(messages[0]["oldSrc"], "http://localhost:3000/hero.png");
        assert_eq!(messages[0]["newSrc"], "http://localhost:3000/new.png");

        page.engine.handle_event(HostEvent::Scroll, 1105);
        page.engine.advance(1200);
        assert_eq!(kinds(&drain(&mut page.engine)), vec!["SCROLL_STOPPED"]);
        assert!(!page.engine.is_scrolling());
    }

    #[test]
    fn test_proxied_copy_of_same_image_is_not_a_change() {
        let mut page = page();
        click(&mut page.engine, page.image, 1000);
        drain(&mut page.engine);

        page.engine.document_mut().set_attribute(
            page.image,
            "src",
            "/_next/image?url=%2Fhero.png&w=640&q=75",
        );
        page.engine.handle_event(HostEvent::Scroll, 1100);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["SCROLL_STARTED", "FOCUS_MOVED"]);
    }

    #[test]
    fn test_inbound_image_update_sets_source_without_echo() {
        let mut page = page();
        click(&mut page.engine, page.image, 1000);
        page.engine.handle_message(
            InboundMessage::ImageUpdate {
                element_id: IMAGE.to_string(),
                src: "/other.png".to_string(),
                old_src: Some("/hero.png".to_string()),
            },
            1100,
        );
        let doc = page.engine.document();
        assert_eq!(doc.attribute(page.image, "src").as_deref(), Some("/other.png"));
        assert_eq!(doc.attribute(page.image, "srcset"), None);
        drain(&mut page.engine);
        page.engine.handle_event(HostEvent::PointerLeave, 1200);
        assert_eq!(kinds(&drain(&mut page.engine)), vec!["HIT"]);
    }

    #[test]
    fn test_resize_drag_and_release() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        drain(&mut page.engine);

        // Focus box is (96, 16, 408, 48): the east handle sits at x 500..508
        let view = page.engine.view();
        assert_eq!(view.handles.len(), 8);
        assert_eq!(page.engine.resize_handle_at(504.0, 40.0), Some(ResizeHandle::E));
        let outcome = page.engine.handle_event(
            HostEvent::PointerDown {
                x: 504.0,
                y: 40.0,
                target: None,
            },
            1100,
        );
        assert!(outcome.default_prevented);
        assert!(page.engine.session().is_resizing());
        assert!(!page.engine.document().pointer_events_enabled());

        page.engine
            .handle_event(HostEvent::PointerMove { x: 604.0, y: 40.0 }, 1110);
        page.engine
            .handle_event(HostEvent::PointerMove { x: 5000.0, y: 40.0 }, 1120);
        let messages = drain(&mut page.engine);
        assert_eq!(messages[0]["msg"], "RESIZE_ELEMENT");
        assert_eq!(messages[0]["width"], 500);
        assert_eq!(messages[0]["height"], 40);
        // Parent content box is 1000 - 2 * 50
        assert_eq!(messages[1]["width"], 900);

        page.engine.handle_message(
            InboundMessage::ResizeElement {
                element_id: HEADING.to_string(),
                width: 450.0,
                height: 40.0,
            },
            1130,
        );
        page.engine
            .handle_event(HostEvent::PointerUp { x: 5000.0, y: 40.0 }, 1140);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["STYLE_BLUR"]);
        assert_eq!(messages[0]["styles"], json!({"width": "50%", "height": "40px"}));
        assert!(!page.engine.session().is_resizing());
        assert!(page.engine.document().pointer_events_enabled());
    }

    #[test]
    fn test_resize_suppresses_hover_and_clicks() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        page.engine.handle_event(
            HostEvent::PointerDown {
                x: 504.0,
                y: 40.0,
                target: None,
            },
            1100,
        );
        drain(&mut page.engine);
        page.engine.handle_event(
            HostEvent::Click {
                x: 150.0,
                y: 110.0,
                target: Some(page.items[0]),
            },
            1300,
        );
        assert_eq!(page.engine.session().focused_node(), Some(page.heading));
        assert!(page.engine.hover().is_empty());
    }

    #[test]
    fn test_font_grace_window_blocks_preview() {
        let mut page = page();
        style_update(&mut page.engine, HEADING, &[("fontFamily", "Open Sans")], 1000);
        page.engine.handle_message(
            InboundMessage::PreviewFont {
                element_id: HEADING.to_string(),
                font_family: "Lora".to_string(),
            },
            1500,
        );
        let doc = page.engine.document();
        assert_eq!(
            doc.inline_style(page.heading).unwrap().get("font-family"),
            Some("Open Sans")
        );
        assert_eq!(
            doc.stylesheets(),
            &["https://fonts.googleapis.com/css2?family=Open+Sans:wght@400&display=swap".to_string()]
        );

        page.engine.handle_message(
            InboundMessage::PreviewFont {
                element_id: HEADING.to_string(),
                font_family: "Lora".to_string(),
            },
            3001,
        );
        assert_eq!(
            page.engine.document().inline_style(page.heading).unwrap().get("font-family"),
            Some("'Lora', sans-serif")
        );
    }

    fn preview_lora(engine: &mut TestEngine, now: u64) {
        engine.handle_message(
            InboundMessage::PreviewFont {
                element_id: HEADING.to_string(),
                font_family: "Lora".to_string(),
            },
            now,
        );
    }

    #[test]
    fn test_dispose_ends_font_grace_window() {
        let mut page = page();
        style_update(&mut page.engine, HEADING, &[("fontFamily", "Open Sans")], 1000);
        page.engine.dispose();
        page.engine.mount(1100);
        preview_lora(&mut page.engine, 1200);
        assert_eq!(
            page.engine.document().inline_style(page.heading).unwrap().get("font-family"),
            Some("'Lora', sans-serif")
        );
    }

    #[test]
    fn test_leaving_edit_mode_ends_font_grace_window() {
        let mut page = page();
        style_update(&mut page.engine, HEADING, &[("fontFamily", "Open Sans")], 1000);
        page.engine
            .handle_message(InboundMessage::VisualEditMode { active: false }, 1100);
        page.engine
            .handle_message(InboundMessage::VisualEditMode { active: true }, 1200);
        preview_lora(&mut page.engine, 1300);
        assert_eq!(
            page.engine.document().inline_style(page.heading).unwrap().get("font-family"),
            Some("'Lora', sans-serif")
        );
    }

    #[test]
    fn test_clear_inline_styles() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        style_update(&mut page.engine, HEADING, &[("color", "red"), ("width", "10px")], 1100);
        page.engine.handle_message(
            InboundMessage::ClearInlineStyles {
                element_id: HEADING.to_string(),
            },
            1200,
        );
        let style = page.engine.document().inline_style(page.heading).unwrap();
        assert_eq!(style.get("color"), None);
        assert_eq!(style.get("width"), Some("10px"));
        assert!(!page.engine.pending_patches().has_pending(HEADING));
    }

    #[test]
    fn test_show_element_hover() {
        let mut page = page();
        page.engine.handle_message(
            InboundMessage::ShowElementHover {
                element_id: Some(ITEM.to_string()),
            },
            1,
        );
        assert_eq!(page.engine.view().hover_boxes.len(), 3);
        assert_eq!(page.engine.view().hover_tag.as_deref(), Some("li"));
        page.engine
            .handle_message(InboundMessage::ShowElementHover { element_id: None }, 2);
        assert!(page.engine.view().hover_boxes.is_empty());
    }

    #[test]
    fn test_edit_mode_off_resets_everything() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        page.engine
            .handle_event(HostEvent::PointerMove { x: 150.0, y: 110.0 }, 1100);
        drain(&mut page.engine);

        page.engine
            .handle_message(InboundMessage::VisualEditMode { active: false }, 1200);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["VISUAL_EDIT_MODE_ACK", "HIT"]);
        assert_eq!(messages[0]["active"], false);
        assert_eq!(messages[1]["id"], Value::Null);

        assert!(page.engine.session().focus().is_none());
        assert!(page.engine.hover().is_empty());
        assert_eq!(page.engine.store().get(EDIT_MODE_KEY), None);
        assert_eq!(page.engine.store().get(FOCUSED_ELEMENT_KEY), None);
        assert_eq!(page.engine.document().edit_stylesheet(), None);
    }

    #[test]
    fn test_mount_restores_focus() {
        let mut store = MemoryStore::new();
        store.set(EDIT_MODE_KEY, "true").unwrap();
        store
            .set(FOCUSED_ELEMENT_KEY, &json!({"id": ITEM, "tag": "li"}).to_string())
            .unwrap();
        let mut page = page_with_store(store);
        page.engine.mount(0);
        assert_eq!(
            kinds(&drain(&mut page.engine)),
            vec!["VISUAL_EDIT_MODE_ACK", "VISUAL_EDIT_MODE_RESTORED"]
        );
        assert!(page.engine.document().edit_stylesheet().is_some());

        page.engine.advance(499);
        assert!(page.engine.session().focus().is_none());
        page.engine.advance(500);
        assert_eq!(page.engine.session().focused_node(), Some(page.items[0]));
        assert_eq!(kinds(&drain(&mut page.engine)), vec!["ELEMENT_CLICKED"]);
    }

    #[test]
    fn test_layout_change_reports_focus_move() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        drain(&mut page.engine);
        page.engine
            .document_mut()
            .set_bounding_box(page.heading, Rect::new(100.0, 20.0, 400.0, 80.0));
        page.engine
            .handle_event(HostEvent::LayoutChanged { node: page.heading }, 1100);
        let messages = drain(&mut page.engine);
        assert_eq!(kinds(&messages), vec!["FOCUS_MOVED"]);
        assert_eq!(messages[0]["rect"]["height"], 88.0);
    }

    #[test]
    fn test_dispose_removes_page_side_effects() {
        let mut page = page();
        click(&mut page.engine, page.heading, 1000);
        page.engine.dispose();
        let doc = page.engine.document();
        assert_eq!(doc.edit_stylesheet(), None);
        assert_eq!(doc.attribute(page.heading, "contenteditable").as_deref(), Some("false"));
        assert!(page.engine.next_deadline().is_none());
    }

    #[test]
    fn test_mount_after_dispose_announces_edit_mode_again() {
        let mut page = page();
        page.engine.dispose();
        page.engine.mount(100);
        let sent = drain(&mut page.engine);
        assert_eq!(
            kinds(&sent),
            vec!["VISUAL_EDIT_MODE_ACK", "VISUAL_EDIT_MODE_RESTORED"]
        );
    }

    #[test]
    fn test_wrap_multiline() {
        assert_eq!(wrap_multiline("one line"), "one line");
        assert_eq!(wrap_multiline("a\nb"), "{`a\\nb`}");
    }
}
