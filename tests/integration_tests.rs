//! Integration tests for visual-edits
//!
//! These drive the tagger and the overlay engine through their public API
//! the way a build step and a host page would.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use visual_edits::dom::{Document, HtmlLoader, LiveDocument, NodeId, Point, Size};
use visual_edits::overlay::{
    EDIT_MODE_KEY, ElementId, FOCUSED_ELEMENT_KEY, FileStore, HostEvent, InboundMessage,
    KeyValueStore, MemoryStore, MessageSink, Messenger, OutboundMessage, Outbox, ResizeHandle,
    ResizeSession, Session, StyleMap,
};
use visual_edits::{ComponentTagger, ID_ATTRIBUTE, OverlayConfig, OverlayEngine, TagOutcome, TaggerConfig};

const ITEMS: &str = "src/app/page.tsx:8:8@items";
const HEADING: &str = "src/app/page.tsx:5:6";

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Health</title></head>
  <body style="width: 800px; height: 600px">
    <section data-orchids-id="src/app/page.tsx:4:4" data-orchids-name="section"
      style="width: 600px; height: 400px; padding-left: 20px; padding-right: 20px; padding-top: 10px; padding-bottom: 10px">
      <h1 data-orchids-id="src/app/page.tsx:5:6" data-orchids-name="h1" class="title"
        style="left: 20px; top: 10px; width: 300px; height: 40px">Health</h1>
      <p data-map-index="0" data-orchids-id="src/app/page.tsx:8:8@items" data-orchids-name="p"
        style="left: 20px; top: 60px; width: 200px; height: 20px">Steps</p>
      <p data-map-index="1" data-orchids-id="src/app/page.tsx:8:8@items" data-orchids-name="p"
        style="left: 20px; top: 90px; width: 200px; height: 20px">Sleep</p>
    </section>
  </body>
</html>"#;

// Centers of the boxes laid out above
const HEADING_AT: (f32, f32) = (170.0, 30.0);
const FIRST_ITEM_AT: (f32, f32) = (120.0, 70.0);
const SECOND_ITEM_AT: (f32, f32) = (120.0, 100.0);

type Engine<S> = OverlayEngine<Document, S, Outbox>;

fn load_page() -> Document {
    HtmlLoader::new().parse(PAGE_HTML).unwrap()
}

/// Engine over the sample page with edit mode switched on and the outbox empty
fn editing_engine() -> Engine<MemoryStore> {
    let mut engine = OverlayEngine::new(
        load_page(),
        MemoryStore::new(),
        Outbox::new(),
        OverlayConfig::default(),
    );
    engine.handle_message(InboundMessage::VisualEditMode { active: true }, 0);
    engine.sink_mut().drain();
    engine
}

fn click<S: KeyValueStore>(engine: &mut Engine<S>, (x, y): (f32, f32), now: u64) {
    engine.handle_event(HostEvent::PointerDown { x, y, target: None }, now);
    engine.handle_event(HostEvent::Click { x, y, target: None }, now);
}

fn style_update<S: KeyValueStore>(engine: &mut Engine<S>, id: &str, pairs: &[(&str, &str)], now: u64) {
    let styles: StyleMap = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    engine.handle_message(
        InboundMessage::StyleUpdate {
            element_id: id.to_string(),
            styles,
        },
        now,
    );
}

fn kinds(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| m["msg"].as_str())
        .map(str::to_string)
        .collect()
}

fn nodes_with_id(document: &Document, id: &str) -> Vec<NodeId> {
    document
        .elements_with_attribute(ID_ATTRIBUTE)
        .into_iter()
        .filter(|(_, value)| value == id)
        .map(|(node, _)| node)
        .collect()
}

#[test]
fn test_style_update_reaches_every_instance_but_only_focus_accumulates() {
    let mut engine = editing_engine();
    let items = nodes_with_id(engine.document(), ITEMS);
    assert_eq!(items.len(), 2);

    click(&mut engine, FIRST_ITEM_AT, 1000);
    style_update(&mut engine, ITEMS, &[("color", "red")], 1100);
    for node in &items {
        let style = engine.document().inline_style(*node).unwrap();
        assert_eq!(style.get("color"), Some("red"));
    }
    assert_eq!(
        engine.pending_patches().get(ITEMS).and_then(|p| p.get("color")).map(String::as_str),
        Some("red")
    );

    engine.sink_mut().drain();
    click(&mut engine, HEADING_AT, 2000);
    let messages = engine.sink_mut().drain();
    assert_eq!(kinds(&messages), vec!["STYLE_BLUR", "ELEMENT_CLICKED"]);
    assert_eq!(
        messages[0],
        json!({
            "type": "ORCHIDS_HOVER_v1",
            "msg": "STYLE_BLUR",
            "id": ITEMS,
            "styles": {"color": "red"},
            "className": "",
            "filePath": "src/app/page.tsx",
            "line": 8,
            "column": 8,
        })
    );
    assert_eq!(messages[1]["id"], HEADING);
    assert_eq!(messages[1]["className"], "title");

    // Not focused any more: applied, not recorded
    style_update(&mut engine, ITEMS, &[("fontSize", "20px")], 2100);
    let style = engine.document().inline_style(items[1]).unwrap();
    assert_eq!(style.get("font-size"), Some("20px"));
    assert!(engine.pending_patches().get(ITEMS).is_none());
}

#[test]
fn test_switching_focus_without_edits_posts_only_the_click() {
    let mut engine = editing_engine();
    click(&mut engine, HEADING_AT, 1000);
    engine.sink_mut().drain();

    click(&mut engine, FIRST_ITEM_AT, 2000);
    let messages = engine.sink_mut().drain();
    assert_eq!(kinds(&messages), vec!["ELEMENT_CLICKED"]);
    assert_eq!(messages[0]["id"], ITEMS);
    assert_eq!(messages[0]["isEditable"], true);
}

#[test]
fn test_switching_focus_flushes_style_then_text_before_the_click() {
    let mut engine = editing_engine();
    click(&mut engine, FIRST_ITEM_AT, 1000);
    style_update(&mut engine, ITEMS, &[("fontWeight", "700")], 1100);

    let first = nodes_with_id(engine.document(), ITEMS)[0];
    let text_node = engine.document().get_node(first).unwrap().children[0];
    engine.document_mut().set_text(text_node, "Steps walked");
    engine.sink_mut().drain();

    click(&mut engine, HEADING_AT, 2000);
    let messages = engine.sink_mut().drain();
    assert_eq!(
        kinds(&messages),
        vec!["STYLE_BLUR", "TEXT_CHANGED", "ELEMENT_CLICKED"]
    );
    assert_eq!(messages[0]["styles"], json!({"fontWeight": "700"}));
    assert_eq!(
        messages[1],
        json!({
            "type": "ORCHIDS_HOVER_v1",
            "msg": "TEXT_CHANGED",
            "id": ITEMS,
            "oldText": "Steps",
            "newText": "Steps walked",
            "filePath": "src/app/page.tsx",
            "line": 8,
            "column": 8,
        })
    );
    assert_eq!(messages[2]["id"], HEADING);
}

#[test]
fn test_clicks_inside_debounce_window_are_ignored() {
    let mut engine = editing_engine();
    click(&mut engine, HEADING_AT, 1000);
    click(&mut engine, FIRST_ITEM_AT, 1050);
    assert_eq!(engine.session().focused_id(), Some(HEADING));
    click(&mut engine, FIRST_ITEM_AT, 1100);
    assert_eq!(engine.session().focused_id(), Some(ITEMS));
}

#[test]
fn test_neutral_value_removes_property_and_leaves_nothing_to_flush() {
    let mut engine = editing_engine();
    click(&mut engine, FIRST_ITEM_AT, 1000);
    style_update(&mut engine, ITEMS, &[("backgroundColor", "red")], 1100);
    style_update(&mut engine, ITEMS, &[("backgroundColor", "rgba(0, 0, 0, 0)")], 1200);

    for node in nodes_with_id(engine.document(), ITEMS) {
        let background = engine
            .document()
            .inline_style(node)
            .and_then(|s| s.get("background-color"));
        assert_eq!(background, None);
    }
    assert!(engine.pending_patches().get(ITEMS).is_none());

    engine.sink_mut().drain();
    click(&mut engine, HEADING_AT, 2000);
    assert_eq!(kinds(&engine.sink_mut().drain()), vec!["ELEMENT_CLICKED"]);
}

#[test]
fn test_leaving_edit_mode_clears_everything() {
    let mut engine = editing_engine();
    click(&mut engine, HEADING_AT, 1000);
    let (x, y) = SECOND_ITEM_AT;
    engine.handle_event(HostEvent::PointerMove { x, y }, 1100);
    assert!(!engine.hover().is_empty());
    assert!(engine.store().get(FOCUSED_ELEMENT_KEY).is_some());
    engine.sink_mut().drain();

    engine.handle_message(InboundMessage::VisualEditMode { active: false }, 1200);
    let messages = engine.sink_mut().drain();
    assert_eq!(messages[0]["msg"], "VISUAL_EDIT_MODE_ACK");
    assert_eq!(messages[0]["active"], false);
    let hits: Vec<&Value> = messages.iter().filter(|m| m["msg"] == "HIT").collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(messages.last().unwrap()["msg"], "HIT");
    assert_eq!(messages.last().unwrap()["id"], Value::Null);

    assert!(!engine.is_edit_mode());
    assert!(matches!(engine.session(), Session::Unfocused));
    assert!(engine.hover().is_empty());
    assert_eq!(engine.store().get(EDIT_MODE_KEY), None);
    assert_eq!(engine.store().get(FOCUSED_ELEMENT_KEY), None);

    // Inert until switched back on
    engine.handle_event(HostEvent::PointerMove { x: 170.0, y: 30.0 }, 1300);
    click(&mut engine, FIRST_ITEM_AT, 1400);
    assert!(engine.sink_mut().drain().is_empty());
}

#[test]
fn test_resize_drag_reports_sizes_and_commits_on_release() {
    let mut engine = editing_engine();
    click(&mut engine, HEADING_AT, 1000);
    let view = engine.view();
    let (_, corner) = view
        .handles
        .iter()
        .find(|(handle, _)| *handle == ResizeHandle::SE)
        .copied()
        .unwrap();
    let (x, y) = (corner.left + corner.width / 2.0, corner.top + corner.height / 2.0);
    engine.sink_mut().drain();

    engine.handle_event(HostEvent::PointerDown { x, y, target: None }, 2000);
    assert!(engine.view().resizing);
    engine.handle_event(HostEvent::PointerMove { x: x + 50.0, y: y + 10.0 }, 2010);
    let moved = engine.sink_mut().drain();
    assert_eq!(
        moved.last().unwrap(),
        &json!({
            "type": "ORCHIDS_HOVER_v1",
            "msg": "RESIZE_ELEMENT",
            "elementId": HEADING,
            "width": 350,
            "height": 50,
        })
    );

    engine.handle_message(
        InboundMessage::ResizeElement {
            element_id: HEADING.to_string(),
            width: 350.0,
            height: 50.0,
        },
        2020,
    );
    engine.handle_event(HostEvent::PointerUp { x: x + 50.0, y: y + 10.0 }, 2030);
    let released = engine.sink_mut().drain();
    assert_eq!(kinds(&released), vec!["STYLE_BLUR"]);
    assert_eq!(released[0]["id"], HEADING);
    assert!(released[0]["styles"]["width"].is_string());
    assert!(released[0]["styles"]["height"].is_string());
    assert!(!engine.view().resizing);
}

#[test]
fn test_raw_parent_messages_drive_the_engine() {
    let mut engine = OverlayEngine::new(
        load_page(),
        MemoryStore::new(),
        Outbox::new(),
        OverlayConfig::default(),
    );
    engine.handle_message_value(&json!({"type": "SOMETHING_ELSE", "active": true}), 0);
    assert!(!engine.is_edit_mode());

    engine.handle_message_value(
        &json!({"type": "ORCHIDS_HOVER_v1", "msg": "VISUAL_EDIT_MODE", "active": true}),
        10,
    );
    assert!(engine.is_edit_mode());
    assert_eq!(kinds(engine.sink_mut().messages()), vec!["VISUAL_EDIT_MODE_ACK"]);

    engine.handle_message_value(
        &json!({"type": "ORCHIDS_STYLE_UPDATE", "elementId": HEADING, "styles": {"fontSize": 24}}),
        20,
    );
    let heading = nodes_with_id(engine.document(), HEADING)[0];
    let style = engine.document().inline_style(heading).unwrap();
    assert_eq!(style.get("font-size"), Some("24"));
}

#[test]
fn test_scroll_burst_reports_start_and_stop_once() {
    let mut engine = editing_engine();
    for now in [100, 105, 110] {
        engine.handle_event(HostEvent::Scroll, now);
    }
    assert!(engine.is_scrolling());
    assert_eq!(engine.next_deadline(), Some(126));
    engine.advance(126);
    assert!(!engine.is_scrolling());
    assert_eq!(
        kinds(&engine.sink_mut().drain()),
        vec!["SCROLL_STARTED", "SCROLL_STOPPED"]
    );
}

#[test]
fn test_file_store_restores_edit_mode_and_focus_after_reload() {
    let path = std::env::temp_dir().join(format!(
        "visual-edits-reload-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let mut engine = OverlayEngine::new(
        load_page(),
        FileStore::open(&path).unwrap(),
        Outbox::new(),
        OverlayConfig::default(),
    );
    engine.handle_message(InboundMessage::VisualEditMode { active: true }, 0);
    click(&mut engine, HEADING_AT, 1000);
    drop(engine);

    let mut reloaded = OverlayEngine::new(
        load_page(),
        FileStore::open(&path).unwrap(),
        Outbox::new(),
        OverlayConfig::default(),
    );
    assert!(reloaded.is_edit_mode());
    reloaded.mount(0);
    assert_eq!(
        kinds(&reloaded.sink_mut().drain()),
        vec!["VISUAL_EDIT_MODE_ACK", "VISUAL_EDIT_MODE_RESTORED"]
    );
    assert_eq!(reloaded.next_deadline(), Some(500));

    reloaded.advance(500);
    let messages = reloaded.sink_mut().drain();
    assert_eq!(kinds(&messages), vec!["ELEMENT_CLICKED"]);
    assert_eq!(messages[0]["id"], HEADING);
    assert_eq!(reloaded.session().focused_id(), Some(HEADING));

    std::fs::remove_file(&path).ok();
}

const CARD_SOURCE: &str = r#"export default function Card() {
  return (
    <div className="card">
      <h2>Title</h2>
    </div>
  );
}
"#;

#[test]
fn test_tagged_source_locations_reach_the_parent() {
    let tagger = ComponentTagger::new(TaggerConfig::with_root("/app"));
    let outcome = tagger
        .tag(Path::new("/app/src/components/Card.jsx"), CARD_SOURCE)
        .unwrap();
    let TagOutcome::Tagged(tagged) = outcome else {
        panic!("expected tagged output");
    };
    let ids: Vec<&str> = tagged.elements.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["src/components/Card.jsx:3:4", "src/components/Card.jsx:4:6"]);

    // Render the page the way the browser would see the tagged output
    let (card, title) = (&tagged.elements[0], &tagged.elements[1]);
    let html = format!(
        r#"<html><body style="width: 800px; height: 600px">
<div data-orchids-id="{}" data-orchids-name="{}" class="card" style="width: 400px; height: 200px">
<h2 data-orchids-id="{}" data-orchids-name="{}" style="left: 10px; top: 10px; width: 200px; height: 30px">Title</h2>
</div></body></html>"#,
        card.id, card.name, title.id, title.name
    );
    let mut engine = OverlayEngine::new(
        HtmlLoader::new().parse(&html).unwrap(),
        MemoryStore::new(),
        Outbox::new(),
        OverlayConfig::default(),
    );
    engine.handle_message(InboundMessage::VisualEditMode { active: true }, 0);
    click(&mut engine, (110.0, 25.0), 1000);
    style_update(&mut engine, &title.id, &[("color", "blue")], 1100);
    engine.sink_mut().drain();

    click(&mut engine, (300.0, 150.0), 2000);
    let messages = engine.sink_mut().drain();
    assert_eq!(kinds(&messages), vec!["STYLE_BLUR", "ELEMENT_CLICKED"]);
    assert_eq!(messages[0]["filePath"], "src/components/Card.jsx");
    assert_eq!(messages[0]["line"], json!(title.line));
    assert_eq!(messages[0]["column"], json!(title.column));
    assert_eq!(messages[1]["id"], card.id.as_str());
    assert_eq!(messages[1]["tag"], "div");
}

fn message_for(choice: u8) -> OutboundMessage {
    match choice {
        0 => OutboundMessage::ScrollStarted,
        1 => OutboundMessage::ScrollStopped,
        _ => OutboundMessage::VisualEditModeAck { active: true },
    }
}

proptest! {
    #[test]
    fn test_messenger_drops_exactly_consecutive_duplicates(
        choices in prop::collection::vec(0u8..3, 0..40)
    ) {
        let mut messenger = Messenger::new(Outbox::new());
        for choice in &choices {
            messenger.post(&message_for(*choice));
        }
        let mut expected: Vec<&str> = choices.iter().map(|c| message_for(*c).kind()).collect();
        expected.dedup();
        prop_assert_eq!(messenger.sink().kinds(), expected.clone());
        prop_assert_eq!(messenger.sent() as usize, expected.len());
        prop_assert_eq!((messenger.sent() + messenger.suppressed()) as usize, choices.len());
    }

    #[test]
    fn test_resize_size_stays_within_min_and_bounds(
        handle in 0usize..8,
        dx in -2000.0f32..2000.0,
        dy in -2000.0f32..2000.0,
        bound_w in 20.0f32..1000.0,
        bound_h in 20.0f32..1000.0,
    ) {
        let session = ResizeSession {
            handle: ResizeHandle::ALL[handle],
            origin: Point::new(100.0, 100.0),
            start: Size { width: 80.0, height: 60.0 },
            bounds: Some(Size { width: bound_w, height: bound_h }),
        };
        let size = session.size_at(Point::new(100.0 + dx, 100.0 + dy), 20.0);
        prop_assert!(size.width >= 20.0 && size.width <= bound_w);
        prop_assert!(size.height >= 20.0 && size.height <= bound_h);
    }

    #[test]
    fn test_engine_drag_never_leaves_parent_content_box(
        handle in 0usize..8,
        moves in prop::collection::vec((-800.0f32..800.0, -800.0f32..800.0), 1..5),
    ) {
        let mut engine = editing_engine();
        click(&mut engine, HEADING_AT, 1000);
        let wanted = ResizeHandle::ALL[handle];
        let (_, rect) = engine
            .view()
            .handles
            .iter()
            .find(|(h, _)| *h == wanted)
            .copied()
            .unwrap();
        let (x, y) = (rect.left + rect.width / 2.0, rect.top + rect.height / 2.0);
        engine.handle_event(HostEvent::PointerDown { x, y, target: None }, 2000);
        prop_assert!(engine.view().resizing);
        engine.sink_mut().drain();

        for (i, (dx, dy)) in moves.iter().enumerate() {
            engine.handle_event(HostEvent::PointerMove { x: x + dx, y: y + dy }, 2001 + i as u64);
        }
        for message in engine.sink_mut().drain() {
            prop_assert_eq!(message["msg"].as_str(), Some("RESIZE_ELEMENT"));
            let width = message["width"].as_i64().unwrap();
            let height = message["height"].as_i64().unwrap();
            // Section content box: 600x400 minus padding
            prop_assert!((20..=560).contains(&width));
            prop_assert!((20..=380).contains(&height));
        }
    }

    #[test]
    fn test_identifier_parsing_never_panics(raw in "\\PC*") {
        let _ = ElementId::parse(&raw);
    }

    #[test]
    fn test_identifier_reads_location_before_context(
        path in "[a-z]{1,8}(/[a-z]{1,8}){0,3}\\.tsx",
        line in 1u32..10_000,
        column in 0u32..500,
        context in "(@[a-z]{1,6}){0,3}",
    ) {
        let raw = format!("{}:{}:{}{}", path, line, column, context);
        let parsed = ElementId::parse(&raw).unwrap();
        prop_assert_eq!(parsed.to_string(), raw);
        let map_context = context.strip_prefix('@').map(str::to_string);
        prop_assert_eq!(parsed, ElementId { file_path: path, line, column, map_context });
    }

    #[test]
    fn test_tagger_never_panics_on_arbitrary_input(source in "\\PC{0,200}") {
        let tagger = ComponentTagger::default();
        let _ = tagger.tag(Path::new("src/page.tsx"), &source);
        let _ = visual_edits::tagger::parse(&source, true);
    }

    #[test]
    fn test_tagging_preserves_original_text(depth in 1usize..6, text in "[a-zA-Z ]{0,12}") {
        let mut source = String::from("const v = ");
        for _ in 0..depth {
            source.push_str("<div>");
        }
        source.push_str(&text);
        for _ in 0..depth {
            source.push_str("</div>");
        }
        source.push(';');

        let outcome = ComponentTagger::default()
            .tag(Path::new("src/page.jsx"), &source)
            .unwrap();
        let TagOutcome::Tagged(tagged) = outcome else {
            return Err(TestCaseError::fail("expected tagged output"));
        };
        prop_assert_eq!(tagged.elements.len(), depth);
        let stripped = tagged
            .elements
            .iter()
            .fold(tagged.code.clone(), |code, element| {
                code.replacen(
                    &format!(" data-orchids-id=\"{}\" data-orchids-name=\"div\"", element.id),
                    "",
                    1,
                )
            });
        prop_assert_eq!(stripped, source);
    }
}

/// Sink that counts deliveries, for hosts wrapping their own transport
struct CountingSink(usize);

impl MessageSink for CountingSink {
    fn post(&mut self, _message: &Value) {
        self.0 += 1;
    }
}

#[test]
fn test_custom_sink_receives_deduplicated_stream() {
    let mut engine = OverlayEngine::new(
        load_page(),
        MemoryStore::new(),
        CountingSink(0),
        OverlayConfig::default(),
    );
    engine.handle_message(InboundMessage::VisualEditMode { active: true }, 0);
    engine.handle_message(InboundMessage::VisualEditMode { active: true }, 1);
    let (x, y) = HEADING_AT;
    engine.handle_event(HostEvent::PointerMove { x, y }, 10);
    engine.handle_event(HostEvent::PointerMove { x: x + 1.0, y }, 11);
    let (_, _, sink) = engine.into_parts();
    // ACK once, HIT once
    assert_eq!(sink.0, 2);
}
