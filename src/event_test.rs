use super::*;
use serde_json::json;
use uuid::Uuid;

#[test]
fn init_wire_shape() {
    let id = Uuid::new_v4();
    let value = serde_json::to_value(OutboundEvent::Init { id, size: 20 }).unwrap();
    assert_eq!(value, json!({"type": "init", "id": id.to_string(), "size": 20}));
}

#[test]
fn presence_wire_shape() {
    let value = serde_json::to_value(OutboundEvent::Presence { online_users: 3 }).unwrap();
    assert_eq!(value, json!({"type": "presence", "online_users": 3}));
}

#[test]
fn cursor_remove_wire_shape() {
    let id = Uuid::new_v4();
    let value = serde_json::to_value(OutboundEvent::CursorRemove { id }).unwrap();
    assert_eq!(value, json!({"type": "cursor_remove", "id": id.to_string()}));
}

#[test]
fn relayed_messages_keep_their_fields() {
    let body = json!({"type": "chat", "user": "ana", "text": "hi", "extra": [1, 2]});
    let Value::Object(map) = body.clone() else { unreachable!() };
    let value = serde_json::to_value(OutboundEvent::Chat(map)).unwrap();
    assert_eq!(value, body);
}

#[test]
fn pixel_batch_is_a_bare_array() {
    let event = OutboundEvent::Pixels(vec![Pixel::new(1, 2, "#abcdef")]);
    let value = serde_json::to_value(event).unwrap();
    assert_eq!(value, json!([{"x": 1, "y": 2, "color": "#abcdef"}]));

    let clear = serde_json::to_string(&OutboundEvent::Pixels(Vec::new())).unwrap();
    assert_eq!(clear, "[]");
}

#[test]
fn kind_names_match_wire_tags() {
    assert_eq!(OutboundEvent::Presence { online_users: 0 }.kind(), "presence");
    assert_eq!(OutboundEvent::CursorRemove { id: Uuid::nil() }.kind(), "cursor_remove");
    assert_eq!(OutboundEvent::Pixels(Vec::new()).kind(), "pixels");
}
