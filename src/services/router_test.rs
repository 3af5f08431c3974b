use super::*;
use crate::services::registry::ClientSender;
use crate::state::test_helpers;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use uuid::Uuid;

fn listen(state: &AppState) -> mpsc::Receiver<Arc<OutboundEvent>> {
    let (tx, rx): (ClientSender, _) = mpsc::channel(32);
    state.registry.register(Uuid::new_v4(), tx);
    rx
}

async fn recv_event(rx: &mut mpsc::Receiver<Arc<OutboundEvent>>) -> OutboundEvent {
    let event = timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("client channel closed unexpectedly");
    (*event).clone()
}

async fn assert_no_event(rx: &mut mpsc::Receiver<Arc<OutboundEvent>>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no broadcast"
    );
}

fn body(value: serde_json::Value) -> Body {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// =============================================================================
// classify
// =============================================================================

#[test]
fn classify_pixel_array() {
    let raw = r##"[{"x":1,"y":2,"color":"#ff0000"},{"x":3,"y":4,"color":"#00ff00"}]"##;
    assert_eq!(
        classify(raw),
        Inbound::PixelBatch(vec![Pixel::new(1, 2, "#ff0000"), Pixel::new(3, 4, "#00ff00")])
    );
}

#[test]
fn classify_empty_array_is_clear_sentinel() {
    assert_eq!(classify("[]"), Inbound::PixelBatch(Vec::new()));
    assert_eq!(classify(" [ ] "), Inbound::PixelBatch(Vec::new()));
}

#[test]
fn classify_tagged_objects() {
    assert!(matches!(classify(r#"{"type":"cursor","x":1,"y":2}"#), Inbound::Cursor(_)));
    assert!(matches!(classify(r#"{"type":"chat","text":"hi"}"#), Inbound::Chat(_)));
    assert_eq!(
        classify(r#"{"type":"resize","size":30}"#),
        Inbound::Resize { size: Some(30), body: body(json!({"type": "resize", "size": 30})) }
    );
}

#[test]
fn classify_resize_size_variants() {
    let size_of = |raw: &str| match classify(raw) {
        Inbound::Resize { size, .. } => size,
        other => panic!("expected resize, got {other:?}"),
    };
    assert_eq!(size_of(r#"{"type":"resize","size":32.9}"#), Some(32));
    assert_eq!(size_of(r#"{"type":"resize","size":"30"}"#), None);
    assert_eq!(size_of(r#"{"type":"resize","size":0}"#), None);
    assert_eq!(size_of(r#"{"type":"resize","size":-5}"#), None);
    assert_eq!(size_of(r#"{"type":"resize","size":1e20}"#), None);
    assert_eq!(size_of(r#"{"type":"resize"}"#), None);
}

#[test]
fn classify_unrecognized_shapes() {
    for raw in [
        r#"{"type":"teleport"}"#,
        r#"{"type":7}"#,
        r#"{"no_type":true}"#,
        "[1,2,3]",
        r##"[{"x":-1,"y":0,"color":"#000000"}]"##,
        r#"[{"x":1}]"#,
        "\"cursor\"",
        "42",
        "not json",
        "",
    ] {
        assert_eq!(classify(raw), Inbound::Unrecognized, "{raw:?}");
    }
}

// =============================================================================
// route
// =============================================================================

#[tokio::test]
async fn pixel_batch_applies_then_broadcasts() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);
    let sender = Uuid::new_v4();

    route(&state, sender, r##"[{"x":0,"y":0,"color":"#ff0000"}]"##).await.unwrap();

    assert_eq!(recv_event(&mut rx).await, OutboundEvent::Pixels(vec![Pixel::new(0, 0, "#ff0000")]));
    assert_eq!(state.canvas.snapshot(), vec![Pixel::new(0, 0, "#ff0000")]);
    assert!(state.canvas.is_dirty());
}

#[tokio::test]
async fn empty_batch_clears_and_broadcasts_empty() {
    let state = test_helpers::test_app_state();
    state.canvas.apply_pixels(&[Pixel::new(1, 1, "#111111")]);
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), "[]").await.unwrap();

    assert_eq!(recv_event(&mut rx).await, OutboundEvent::Pixels(Vec::new()));
    assert!(state.canvas.is_empty());
}

#[tokio::test]
async fn malformed_colors_are_filtered_before_apply() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r##"[{"x":0,"y":0,"color":"red"},{"x":1,"y":0,"color":"#00ff00"}]"##)
        .await
        .unwrap();

    assert_eq!(recv_event(&mut rx).await, OutboundEvent::Pixels(vec![Pixel::new(1, 0, "#00ff00")]));
    assert_eq!(state.canvas.snapshot(), vec![Pixel::new(1, 0, "#00ff00")]);
}

#[tokio::test]
async fn all_malformed_batch_is_not_a_clear() {
    let state = test_helpers::test_app_state();
    state.canvas.apply_pixels(&[Pixel::new(1, 1, "#111111")]);
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r#"[{"x":0,"y":0,"color":"red"}]"#).await.unwrap();

    assert_no_event(&mut rx).await;
    assert_eq!(state.canvas.len(), 1);
}

#[tokio::test]
async fn cursor_is_stamped_with_sender_id() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);
    let sender = Uuid::new_v4();

    route(&state, sender, r#"{"type":"cursor","x":10,"y":12,"id":"spoofed","name":"ana"}"#)
        .await
        .unwrap();

    let expected = body(json!({"type": "cursor", "x": 10, "y": 12, "id": sender.to_string(), "name": "ana"}));
    assert_eq!(recv_event(&mut rx).await, OutboundEvent::Cursor(expected));
}

#[tokio::test]
async fn resize_updates_grid_and_relays_verbatim() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r#"{"type":"resize","size":30}"#).await.unwrap();

    assert_eq!(state.canvas.grid_size(), 30);
    assert_eq!(
        recv_event(&mut rx).await,
        OutboundEvent::Resize(body(json!({"type": "resize", "size": 30})))
    );
}

#[tokio::test]
async fn resize_with_bad_size_still_relays() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r#"{"type":"resize","size":"big"}"#).await.unwrap();

    assert_eq!(state.canvas.grid_size(), crate::services::canvas::DEFAULT_GRID_SIZE);
    assert_eq!(
        recv_event(&mut rx).await,
        OutboundEvent::Resize(body(json!({"type": "resize", "size": "big"})))
    );
}

#[tokio::test]
async fn chat_relays_unchanged() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r#"{"type":"chat","user":"bo","text":"hello"}"#).await.unwrap();

    assert_eq!(
        recv_event(&mut rx).await,
        OutboundEvent::Chat(body(json!({"type": "chat", "user": "bo", "text": "hello"})))
    );
    assert!(!state.canvas.is_dirty());
}

#[tokio::test]
async fn unrecognized_messages_are_silent() {
    let state = test_helpers::test_app_state();
    let mut rx = listen(&state);

    route(&state, Uuid::new_v4(), r#"{"type":"teleport","to":"mars"}"#).await.unwrap();
    route(&state, Uuid::new_v4(), "garbage").await.unwrap();

    assert_no_event(&mut rx).await;
    assert!(!state.canvas.is_dirty());
}
