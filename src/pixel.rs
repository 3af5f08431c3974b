//! Cell coordinates, colors, and the wire-level pixel entry.
//!
//! DESIGN
//! ======
//! Colors travel as `#rrggbb` strings and are stored as received. Validation
//! lives here so the router, the save endpoint, and the exporter all agree on
//! what a well-formed color is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to one live connection.
pub type ClientId = Uuid;

/// Grid coordinate of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// One cell edit as it appears on the wire and in the canvas file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub color: String,
}

impl Pixel {
    #[must_use]
    pub fn new(x: u32, y: u32, color: impl Into<String>) -> Self {
        Self { x, y, color: color.into() }
    }

    #[must_use]
    pub fn point(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    /// True when `color` is a well-formed `#rrggbb` value.
    #[must_use]
    pub fn has_valid_color(&self) -> bool {
        parse_hex_color(&self.color).is_some()
    }
}

/// Parse `#rrggbb` into its RGB components. Anything else yields `None`.
#[must_use]
pub fn parse_hex_color(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
#[path = "pixel_test.rs"]
mod tests;
