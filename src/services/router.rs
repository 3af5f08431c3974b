//! Message router — classify one inbound client message and apply it.
//!
//! DESIGN
//! ======
//! Classification is two explicit stages:
//! 1. Does the payload parse as an array of pixel entries? An empty array
//!    is the clear-canvas sentinel, so this must run before the object
//!    check.
//! 2. Otherwise, is it a JSON object with a string `type`? `cursor`,
//!    `resize` and `chat` are recognized; any other type is ignored so new
//!    client message kinds don't break older servers.
//! Anything else is dropped. Nothing is ever reported back to the sender.
//!
//! A pixel batch is relayed as the filtered, re-serialized entries, so
//! fields beyond `x`, `y` and `color` are not forwarded.
//!
//! Effects are applied to the canvas first and then enqueued on the hub, so
//! a client that sees a broadcast can already read the matching state.

use serde_json::Value;
use tracing::debug;

use crate::event::{Body, OutboundEvent};
use crate::pixel::{ClientId, Pixel};
use crate::services::hub::HubClosed;
use crate::state::AppState;

/// One classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    PixelBatch(Vec<Pixel>),
    Cursor(Body),
    /// `size` is `None` when the field is missing or not a usable number.
    Resize { size: Option<u32>, body: Body },
    Chat(Body),
    Unrecognized,
}

/// Classify a raw text frame.
#[must_use]
pub fn classify(raw: &str) -> Inbound {
    if let Ok(batch) = serde_json::from_str::<Vec<Pixel>>(raw) {
        return Inbound::PixelBatch(batch);
    }

    let Ok(Value::Object(body)) = serde_json::from_str::<Value>(raw) else {
        return Inbound::Unrecognized;
    };

    match body.get("type").and_then(Value::as_str) {
        Some("cursor") => Inbound::Cursor(body),
        Some("resize") => {
            let size = body.get("size").and_then(parse_grid_size);
            Inbound::Resize { size, body }
        }
        Some("chat") => Inbound::Chat(body),
        _ => Inbound::Unrecognized,
    }
}

/// Accept any JSON number whose integer part is at least 1 and fits a `u32`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_grid_size(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|n| *n > 0);
    }
    let f = value.as_f64()?.trunc();
    (f.is_finite() && f >= 1.0 && f <= f64::from(u32::MAX)).then(|| f as u32)
}

/// Classify `raw` from `client_id` and apply its effect.
///
/// # Errors
///
/// Returns [`HubClosed`] if the broadcast dispatcher is gone.
pub async fn route(state: &AppState, client_id: ClientId, raw: &str) -> Result<(), HubClosed> {
    match classify(raw) {
        Inbound::PixelBatch(batch) if batch.is_empty() => {
            state.canvas.clear();
            debug!(%client_id, "router: canvas cleared");
            state.hub.publish(OutboundEvent::Pixels(batch)).await
        }
        Inbound::PixelBatch(batch) => {
            let received = batch.len();
            let valid: Vec<Pixel> = batch.into_iter().filter(Pixel::has_valid_color).collect();
            if valid.is_empty() {
                debug!(%client_id, received, "router: pixel batch had no valid colors, dropped");
                return Ok(());
            }
            if valid.len() < received {
                debug!(%client_id, dropped = received - valid.len(), "router: skipped malformed colors");
            }
            state.canvas.apply_pixels(&valid);
            state.hub.publish(OutboundEvent::Pixels(valid)).await
        }
        Inbound::Cursor(mut body) => {
            body.insert("id".into(), Value::String(client_id.to_string()));
            state.hub.publish(OutboundEvent::Cursor(body)).await
        }
        Inbound::Resize { size, body } => {
            match size {
                Some(size) => {
                    state.canvas.set_grid_size(size);
                    debug!(%client_id, size, "router: grid resized");
                }
                None => debug!(%client_id, "router: resize without usable size, relaying anyway"),
            }
            state.hub.publish(OutboundEvent::Resize(body)).await
        }
        Inbound::Chat(body) => state.hub.publish(OutboundEvent::Chat(body)).await,
        Inbound::Unrecognized => {
            debug!(%client_id, len = raw.len(), "router: unrecognized message dropped");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
