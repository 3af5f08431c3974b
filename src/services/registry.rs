//! Client registry — the set of live connections and their outbound queues.
//!
//! DESIGN
//! ======
//! Each connection registers the sending half of its own bounded channel.
//! The registry has its own `RwLock`, separate from the canvas lock, and
//! neither lock is ever taken while holding the other.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::event::OutboundEvent;
use crate::pixel::ClientId;

/// Sending half of a connection's outbound queue.
pub type ClientSender = mpsc::Sender<Arc<OutboundEvent>>;

#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, ClientSender>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client. Returns the connected count afterwards.
    pub fn register(&self, client_id: ClientId, tx: ClientSender) -> usize {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.insert(client_id, tx);
        clients.len()
    }

    /// Remove a client. Unknown ids are ignored. Returns the connected count afterwards.
    pub fn unregister(&self, client_id: ClientId) -> usize {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.remove(&client_id);
        clients.len()
    }

    /// Apply `f` to every client under one read lock, so all calls see the
    /// same membership. `f` must not block and must not call back into the
    /// registry.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(ClientId, &ClientSender),
    {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        for (client_id, tx) in clients.iter() {
            f(*client_id, tx);
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.clients.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&client_id)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
