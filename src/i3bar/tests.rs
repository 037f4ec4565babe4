use super::*;
use crossbeam_channel::bounded;
use std::io::Cursor;
use std::time::Duration;

fn route(name: &str) -> (ClickRoute, crossbeam_channel::Receiver<ClickEvent>) {
    let (tx, rx) = bounded(1);
    (ClickRoute::new(name, tx, rx.clone()), rx)
}

fn click(name: &str, instance: &str, button: u32) -> ClickEvent {
    ClickEvent {
        name: name.to_string(),
        instance: instance.to_string(),
        button,
        ..ClickEvent::default()
    }
}

#[test]
fn header_serializes_protocol_fields() {
    let json = serde_json::to_string(&Header::new(10, 12)).expect("serialize header");
    assert_eq!(
        json,
        r#"{"version":1,"stop_signal":10,"cont_signal":12,"click_events":true}"#
    );
}

#[test]
fn block_omits_unset_fields() {
    let mut block = Block::new("t", "12:00");
    block.name = "clock".to_string();
    let json = serde_json::to_string(&block).expect("serialize block");
    assert_eq!(json, r#"{"name":"clock","instance":"t","full_text":"12:00"}"#);
}

#[test]
fn block_serializes_styling_fields() {
    let block = Block::new("BAT0", "BAT0: 4%")
        .with_color("#cc6666")
        .with_short_text("4%")
        .with_min_width_of("BAT0: 4%")
        .with_urgent(true);
    let value: serde_json::Value = serde_json::to_value(&block).expect("serialize");
    assert_eq!(value["color"], "#cc6666");
    assert_eq!(value["short_text"], "4%");
    assert_eq!(value["min_width"], 8);
    assert_eq!(value["urgent"], true);
    assert!(value.get("separator").is_none());
}

#[test]
fn block_align_uses_lowercase_names() {
    let mut block = Block::new("x", "y");
    block.align = Some(Align::Center);
    let value: serde_json::Value = serde_json::to_value(&block).expect("serialize");
    assert_eq!(value["align"], "center");
}

#[test]
fn click_event_tolerates_missing_and_null_fields() {
    let event: ClickEvent =
        serde_json::from_str(r#"{"name":"memory","instance":null,"button":3}"#).expect("parse");
    assert_eq!(event.name, "memory");
    assert_eq!(event.instance, "");
    assert!(event.is_button(RIGHT_CLICK));
    assert!(event.modifiers.is_empty());
}

#[test]
fn click_stream_frames_elements() {
    let input = concat!(
        "[\n",
        r#"{"name":"a","instance":"1","button":1,"modifiers":["Shift"],"x":5,"y":6}"#,
        "\n,",
        r#"{"name":"b","instance":"2","button":2}"#,
        "\n"
    );
    let mut stream = ClickStream::new(Cursor::new(input));
    let first = stream.next_event().expect("io").expect("element").expect("parse");
    assert_eq!(first.name, "a");
    assert_eq!(first.modifiers, vec!["Shift".to_string()]);
    assert_eq!((first.x, first.y), (5, 6));
    let second = stream.next_event().expect("io").expect("element").expect("parse");
    assert_eq!(second.name, "b");
    assert!(second.is_button(MIDDLE_CLICK));
    assert!(stream.next_event().expect("io").is_none());
}

#[test]
fn click_stream_without_opening_bracket_ends_quietly() {
    let mut stream = ClickStream::new(Cursor::new("no array here"));
    assert!(stream.next_event().expect("io").is_none());
}

#[test]
fn click_stream_resyncs_after_garbage() {
    let input = concat!(
        "[",
        r#"{"name": oops}"#,
        ",",
        r#"{"name":"ok","button":1}"#,
    );
    let mut stream = ClickStream::new(Cursor::new(input));
    assert!(stream.next_event().expect("io").expect("element").is_err());
    let event = stream.next_event().expect("io").expect("element").expect("parse");
    assert_eq!(event.name, "ok");
}

#[test]
fn router_delivers_to_matching_module_only() {
    let (clock, clock_rx) = route("clock");
    let (text, text_rx) = route("text");
    let input = concat!("[", r#"{"name":"text","instance":"t","button":1}"#);
    let parsed = run_click_router(Cursor::new(input), &[clock, text]);
    assert_eq!(parsed, 1);
    let event = text_rx
        .recv_timeout(Duration::from_millis(100))
        .expect("text click");
    assert_eq!(event.instance, "t");
    assert!(clock_rx.try_recv().is_err());
}

#[test]
fn router_skips_unknown_module_names() {
    let (clock, clock_rx) = route("clock");
    let delivery = route_click(&[clock], click("nothing", "x", LEFT_CLICK));
    assert_eq!(delivery, Delivery::Dropped);
    assert!(clock_rx.try_recv().is_err());
}

#[test]
fn router_keeps_latest_click_when_module_is_busy() {
    let (memory, memory_rx) = route("memory");
    let routes = [memory];
    assert_eq!(
        route_click(&routes, click("memory", "m", LEFT_CLICK)),
        Delivery::Queued
    );
    assert_eq!(
        route_click(&routes, click("memory", "m", RIGHT_CLICK)),
        Delivery::Replaced
    );
    let event = memory_rx.try_recv().expect("pending click");
    assert!(event.is_button(RIGHT_CLICK));
    assert!(memory_rx.try_recv().is_err());
}

#[test]
fn router_drops_clicks_for_departed_module() {
    let (tx, rx) = bounded::<ClickEvent>(1);
    drop(rx);
    let (_keep, unrelated) = bounded::<ClickEvent>(1);
    let routes = [ClickRoute::new("gone", tx, unrelated)];
    assert_eq!(
        route_click(&routes, click("gone", "", LEFT_CLICK)),
        Delivery::Dropped
    );
}
