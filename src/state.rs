//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! bundles the two independently locked stores (canvas and client
//! registry), the producer handle of the broadcast hub, and the canvas
//! storage backend. Everything inside is `Arc`-wrapped or cheap to clone.

use std::sync::Arc;

use crate::config::Config;
use crate::services::canvas::CanvasStore;
use crate::services::hub::BroadcastHub;
use crate::services::persistence::CanvasStorage;
use crate::services::registry::ClientRegistry;

#[derive(Clone)]
pub struct AppState {
    pub canvas: Arc<CanvasStore>,
    pub registry: Arc<ClientRegistry>,
    pub hub: BroadcastHub,
    pub storage: Arc<dyn CanvasStorage>,
    /// Capacity of each connection's outbound queue.
    pub client_queue_capacity: usize,
}

impl AppState {
    /// Build the state and spawn the broadcast dispatcher.
    #[must_use]
    pub fn new(config: &Config, storage: Arc<dyn CanvasStorage>) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let (hub, _dispatcher) = BroadcastHub::spawn(Arc::clone(&registry), config.broadcast_queue_capacity);
        Self {
            canvas: Arc::new(CanvasStore::new()),
            registry,
            hub,
            storage,
            client_queue_capacity: config.client_queue_capacity,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::pixel::Pixel;
    use crate::services::persistence::PersistError;

    /// In-memory `CanvasStorage` that counts writes and can be told to fail.
    #[derive(Default)]
    pub struct MemoryStorage {
        pixels: Mutex<Vec<Pixel>>,
        writes: Mutex<usize>,
        fail: bool,
    }

    impl MemoryStorage {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn with_pixels(pixels: Vec<Pixel>) -> Self {
            Self { pixels: Mutex::new(pixels), ..Self::default() }
        }

        #[must_use]
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn stored(&self) -> Vec<Pixel> {
            self.pixels.lock().expect("storage mutex should lock").clone()
        }

        pub fn writes(&self) -> usize {
            *self.writes.lock().expect("storage mutex should lock")
        }
    }

    #[async_trait]
    impl CanvasStorage for MemoryStorage {
        async fn load(&self) -> Result<Vec<Pixel>, PersistError> {
            if self.fail {
                return Err(PersistError::Io(std::io::Error::other("load failed")));
            }
            Ok(self.stored())
        }

        async fn store(&self, pixels: &[Pixel]) -> Result<(), PersistError> {
            if self.fail {
                return Err(PersistError::Io(std::io::Error::other("store failed")));
            }
            *self.pixels.lock().expect("storage mutex should lock") = pixels.to_vec();
            *self.writes.lock().expect("storage mutex should lock") += 1;
            Ok(())
        }
    }

    /// Create a test `AppState` backed by in-memory storage. Needs a tokio
    /// runtime because the hub dispatcher is spawned.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_storage(Arc::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn test_app_state_with_storage(storage: Arc<dyn CanvasStorage>) -> AppState {
        AppState::new(&Config::default(), storage)
    }
}
