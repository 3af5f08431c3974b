//! Domain services behind the websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own shared state and its lock discipline so route
//! handlers stay focused on transport and protocol translation.

pub mod canvas;
pub mod export;
pub mod hub;
pub mod persistence;
pub mod registry;
pub mod router;
