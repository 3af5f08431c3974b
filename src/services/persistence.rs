//! Persistence service — canvas file I/O and the dirty-flag autosave task.
//!
//! DESIGN
//! ======
//! The canvas is stored wholesale as a JSON array of `{x, y, color}`. A
//! background task ticks on a fixed interval; when the store is dirty it
//! takes a snapshot and clears the flag in one critical section, then writes
//! outside the lock.
//!
//! ERROR HANDLING
//! ==============
//! The dirty flag is cleared before the write completes. A failed write is
//! logged and not retried; the next mutation re-dirties the store and the
//! following tick writes the full canvas again. Writes go to a sibling temp
//! file that is renamed into place, so a crash mid-write leaves the previous
//! file intact.
//!
//! The autosave tick and the save endpoint both write the same file. Each
//! holds the canvas persist gate from snapshot through store, so an older
//! snapshot can never be renamed over a newer one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::pixel::Pixel;
use crate::services::canvas::CanvasStore;

/// Default autosave tick.
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("canvas file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("canvas file format: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home of the canvas.
#[async_trait]
pub trait CanvasStorage: Send + Sync {
    /// Read the whole persisted canvas. A missing file is an empty canvas.
    async fn load(&self) -> Result<Vec<Pixel>, PersistError>;

    /// Replace the persisted canvas with `pixels`.
    async fn store(&self, pixels: &[Pixel]) -> Result<(), PersistError>;
}

// =============================================================================
// FILE STORAGE
// =============================================================================

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CanvasStorage for FileStorage {
    async fn load(&self) -> Result<Vec<Pixel>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store(&self, pixels: &[Pixel]) -> Result<(), PersistError> {
        let json = serde_json::to_vec(pixels)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

// =============================================================================
// HYDRATION
// =============================================================================

/// Load the persisted canvas into `canvas` without marking it dirty.
/// Malformed colors are skipped. Returns the number of cells loaded.
pub async fn hydrate(canvas: &CanvasStore, storage: &dyn CanvasStorage) -> usize {
    let pixels = match storage.load().await {
        Ok(pixels) => pixels,
        Err(e) => {
            warn!(error = %e, "canvas load failed; starting empty");
            return 0;
        }
    };

    let total = pixels.len();
    let valid: Vec<Pixel> = pixels.into_iter().filter(Pixel::has_valid_color).collect();
    if valid.len() < total {
        warn!(skipped = total - valid.len(), "skipped persisted cells with malformed colors");
    }
    canvas.hydrate(&valid);
    info!(count = canvas.len(), "hydrated canvas from storage");
    canvas.len()
}

// =============================================================================
// AUTOSAVE
// =============================================================================

/// What one autosave tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    Clean,
    Written(usize),
    Failed,
}

/// Spawn the background autosave task. Returns a handle for shutdown.
pub fn spawn_autosave_task(
    canvas: std::sync::Arc<CanvasStore>,
    storage: std::sync::Arc<dyn CanvasStorage>,
    every: Duration,
) -> JoinHandle<()> {
    info!(interval = ?every, "canvas autosave configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            flush_if_dirty(&canvas, storage.as_ref()).await;
        }
    })
}

/// Write the canvas if it changed since the last flush.
pub async fn flush_if_dirty(canvas: &CanvasStore, storage: &dyn CanvasStorage) -> Flush {
    let _gate = canvas.persist_gate().await;
    let Some(pixels) = canvas.take_dirty_snapshot() else {
        return Flush::Clean;
    };

    match storage.store(&pixels).await {
        Ok(()) => {
            debug!(count = pixels.len(), "autosave: canvas written");
            Flush::Written(pixels.len())
        }
        Err(e) => {
            error!(error = %e, count = pixels.len(), "autosave: canvas write failed");
            Flush::Failed
        }
    }
}

/// Write the current canvas now, regardless of the dirty flag. The flag is
/// cleared as part of the snapshot.
///
/// # Errors
///
/// Returns the storage error if the write fails.
pub async fn save_now(canvas: &CanvasStore, storage: &dyn CanvasStorage) -> Result<usize, PersistError> {
    let _gate = canvas.persist_gate().await;
    let pixels = canvas.take_dirty_snapshot().unwrap_or_else(|| canvas.snapshot());
    storage.store(&pixels).await?;
    Ok(pixels.len())
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
