//! Canvas store — the authoritative cell map, dirty flag, and grid size.
//!
//! DESIGN
//! ======
//! One `std::sync::RwLock` guards the cell map, the dirty flag, and the
//! shared grid size. Every public method takes the lock internally and
//! releases it before returning, so callers never hold it across an await
//! and never see a half-applied batch. Snapshots copy under the read lock
//! and hand back an owned `Vec`.
//!
//! The dirty flag is set by every mutation and cleared only by
//! `take_dirty_snapshot`, which the persister calls. Hydration at startup
//! leaves the flag untouched.
//!
//! Writers to storage also hold `persist_gate` from snapshot until the write
//! finishes, so files land in the same order their snapshots were taken.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, MutexGuard};

use crate::pixel::{Pixel, Point};

/// Grid dimension reported to clients until someone resizes.
pub const DEFAULT_GRID_SIZE: u32 = 20;

pub struct CanvasStore {
    inner: RwLock<CanvasInner>,
    persist_gate: Mutex<()>,
}

struct CanvasInner {
    cells: HashMap<Point, String>,
    dirty: bool,
    grid_size: u32,
}

impl CanvasStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CanvasInner { cells: HashMap::new(), dirty: false, grid_size: DEFAULT_GRID_SIZE }),
            persist_gate: Mutex::new(()),
        }
    }

    /// Write every entry of `batch`; later duplicates win. An empty batch
    /// is a no-op here; clearing goes through [`CanvasStore::clear`].
    pub fn apply_pixels(&self, batch: &[Pixel]) {
        if batch.is_empty() {
            return;
        }
        let mut inner = self.write();
        write_cells(&mut inner.cells, batch);
        inner.dirty = true;
    }

    /// Drop every cell and mark dirty.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.cells = HashMap::new();
        inner.dirty = true;
    }

    /// Clear and apply in one critical section. Used by the save endpoint.
    pub fn replace(&self, batch: &[Pixel]) {
        let mut inner = self.write();
        inner.cells = HashMap::with_capacity(batch.len());
        write_cells(&mut inner.cells, batch);
        inner.dirty = true;
    }

    /// Load persisted cells at startup without marking dirty.
    pub fn hydrate(&self, pixels: &[Pixel]) {
        let mut inner = self.write();
        write_cells(&mut inner.cells, pixels);
    }

    /// Point-in-time copy of all cells, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Pixel> {
        collect_pixels(&self.read().cells)
    }

    /// Atomically clear the dirty flag and copy the cells. `None` when clean.
    #[must_use]
    pub fn take_dirty_snapshot(&self) -> Option<Vec<Pixel>> {
        let mut inner = self.write();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(collect_pixels(&inner.cells))
    }

    /// Serialize snapshot-then-store sequences. Hold the guard across the
    /// storage write; the cell lock itself is never held across an await.
    pub async fn persist_gate(&self) -> MutexGuard<'_, ()> {
        self.persist_gate.lock().await
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().cells.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().cells.is_empty()
    }

    #[must_use]
    pub fn grid_size(&self) -> u32 {
        self.read().grid_size
    }

    /// Set the shared grid size. Zero is ignored; returns whether it applied.
    pub fn set_grid_size(&self, size: u32) -> bool {
        if size == 0 {
            return false;
        }
        self.write().grid_size = size;
        true
    }

    fn read(&self) -> RwLockReadGuard<'_, CanvasInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CanvasInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new()
    }
}

fn write_cells(cells: &mut HashMap<Point, String>, batch: &[Pixel]) {
    for pixel in batch {
        cells.insert(pixel.point(), pixel.color.clone());
    }
}

fn collect_pixels(cells: &HashMap<Point, String>) -> Vec<Pixel> {
    cells
        .iter()
        .map(|(point, color)| Pixel::new(point.x, point.y, color.clone()))
        .collect()
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
