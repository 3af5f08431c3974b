//! Outbound events — everything the server fans out to connected clients.
//!
//! DESIGN
//! ======
//! Server-originated notices (`init`, `presence`, `cursor_remove`) are built
//! from typed fields. Client-originated messages (`cursor`, `resize`, `chat`)
//! are relayed as the JSON object the sender wrote, so unknown fields pass
//! through untouched. Pixel batches go out as a bare array.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::pixel::{ClientId, Pixel};

/// JSON object body of a relayed client message.
pub type Body = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Sent once to a new connection, never broadcast.
    Init { id: ClientId, size: u32 },
    Presence { online_users: usize },
    Cursor(Body),
    CursorRemove { id: ClientId },
    Resize(Body),
    Chat(Body),
    /// Non-empty = edits, empty = clear canvas.
    Pixels(Vec<Pixel>),
}

impl OutboundEvent {
    /// Short tag used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Presence { .. } => "presence",
            Self::Cursor(_) => "cursor",
            Self::CursorRemove { .. } => "cursor_remove",
            Self::Resize(_) => "resize",
            Self::Chat(_) => "chat",
            Self::Pixels(_) => "pixels",
        }
    }
}

impl Serialize for OutboundEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Init { id, size } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "init")?;
                map.serialize_entry("id", id)?;
                map.serialize_entry("size", size)?;
                map.end()
            }
            Self::Presence { online_users } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "presence")?;
                map.serialize_entry("online_users", online_users)?;
                map.end()
            }
            Self::CursorRemove { id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "cursor_remove")?;
                map.serialize_entry("id", id)?;
                map.end()
            }
            Self::Cursor(body) | Self::Resize(body) | Self::Chat(body) => body.serialize(serializer),
            Self::Pixels(pixels) => pixels.serialize(serializer),
        }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
