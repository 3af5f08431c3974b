//! Runtime configuration loaded from environment variables.
//!
//! Every knob has a default; an absent or unparseable variable falls back
//! to it rather than failing startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::hub::DEFAULT_BROADCAST_QUEUE_CAPACITY;
use crate::services::persistence::DEFAULT_AUTOSAVE_INTERVAL_MS;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CANVAS_FILE: &str = "public/canvas.json";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port on `0.0.0.0`.
    pub port: u16,
    /// Persisted canvas path.
    pub canvas_file: PathBuf,
    /// Static assets served at `/`.
    pub static_dir: PathBuf,
    pub autosave_interval: Duration,
    /// Capacity of the broadcast hub queue.
    pub broadcast_queue_capacity: usize,
    /// Capacity of each connection's outbound queue.
    pub client_queue_capacity: usize,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            canvas_file: env_path("CANVAS_FILE", DEFAULT_CANVAS_FILE),
            static_dir: env_path("STATIC_DIR", DEFAULT_STATIC_DIR),
            autosave_interval: Duration::from_millis(
                env_parse("AUTOSAVE_INTERVAL_MS", DEFAULT_AUTOSAVE_INTERVAL_MS).max(1),
            ),
            broadcast_queue_capacity: env_parse("BROADCAST_QUEUE_CAPACITY", DEFAULT_BROADCAST_QUEUE_CAPACITY).max(1),
            client_queue_capacity: env_parse("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY).max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            canvas_file: PathBuf::from(DEFAULT_CANVAS_FILE),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            autosave_interval: Duration::from_millis(DEFAULT_AUTOSAVE_INTERVAL_MS),
            broadcast_queue_capacity: DEFAULT_BROADCAST_QUEUE_CAPACITY,
            client_queue_capacity: DEFAULT_CLIENT_QUEUE_CAPACITY,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(default), PathBuf::from)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
