//! # Event Subscription
//!
//! Receiving side of the event bus. A lagging subscriber loses the oldest
//! events; the loss is logged and reception continues.

use crate::events::CseEvent;
use tokio::sync::broadcast;
use tracing::warn;

/// A handle receiving events published after the subscription was created.
pub struct Subscription {
    receiver: broadcast::Receiver<CseEvent>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<CseEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<CseEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagged, dropping oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` when no event is pending.
    pub fn try_recv(&mut self) -> Option<CseEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagged, dropping oldest events");
                }
                Err(_) => return None,
            }
        }
    }
}
