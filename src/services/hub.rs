//! Broadcast hub — bounded event queue drained by a single dispatcher.
//!
//! DESIGN
//! ======
//! Producers (connection read loops, the router) push `OutboundEvent`s into
//! one bounded `mpsc` queue. `publish` waits when the queue is full, which
//! is the only backpressure in the system. One dispatcher task pops events
//! in FIFO order and hands each to every registered client with
//! `try_send`, so a slow or dead client never stalls the others. Because
//! there is exactly one dispatcher and per-client queues are FIFO, every
//! client sees events in the same relative order.
//!
//! Presence counts are re-read from the registry at dispatch time. The last
//! presence event is always enqueued after the last membership change, so
//! clients settle on the true count however connects and disconnects raced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::event::OutboundEvent;
use crate::services::registry::ClientRegistry;

/// Default capacity of the hub queue.
pub const DEFAULT_BROADCAST_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
#[error("broadcast dispatcher has stopped")]
pub struct HubClosed;

/// Cloneable producer handle onto the hub queue.
#[derive(Clone)]
pub struct BroadcastHub {
    tx: mpsc::Sender<OutboundEvent>,
}

/// Per-event delivery tally returned by [`deliver`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

impl BroadcastHub {
    /// Create the queue and spawn its dispatcher.
    pub fn spawn(registry: Arc<ClientRegistry>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (hub, rx) = Self::channel(capacity);
        let handle = tokio::spawn(run_dispatcher(rx, registry));
        (hub, handle)
    }

    /// Create the queue without a dispatcher. The caller drives `rx`.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue an event, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the dispatcher is gone.
    pub async fn publish(&self, event: OutboundEvent) -> Result<(), HubClosed> {
        self.tx.send(event).await.map_err(|_| HubClosed)
    }

    /// Events waiting to be dispatched.
    #[cfg(test)]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

async fn run_dispatcher(mut rx: mpsc::Receiver<OutboundEvent>, registry: Arc<ClientRegistry>) {
    info!("broadcast dispatcher started");
    while let Some(event) = rx.recv().await {
        let event = match event {
            OutboundEvent::Presence { .. } => OutboundEvent::Presence { online_users: registry.count() },
            other => other,
        };
        let kind = event.kind();
        let tally = deliver(&registry, Arc::new(event));
        debug!(kind, delivered = tally.delivered, dropped = tally.dropped, "hub: dispatched event");
    }
    info!("broadcast dispatcher stopped");
}

/// Hand one event to every registered client without blocking.
pub fn deliver(registry: &ClientRegistry, event: Arc<OutboundEvent>) -> Delivery {
    let mut tally = Delivery::default();
    registry.for_each(|client_id, tx| match tx.try_send(Arc::clone(&event)) {
        Ok(()) => tally.delivered += 1,
        Err(TrySendError::Full(_)) => {
            tally.dropped += 1;
            debug!(%client_id, kind = event.kind(), "hub: client queue full, event dropped");
        }
        Err(TrySendError::Closed(_)) => {
            tally.dropped += 1;
            debug!(%client_id, kind = event.kind(), "hub: client queue closed");
        }
    });
    tally
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
