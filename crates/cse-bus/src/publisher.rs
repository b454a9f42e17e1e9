//! # Event Publisher
//!
//! The publishing side of the event bus.

use crate::events::CseEvent;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Trait for publishing events to the bus.
///
/// The federation manager and the registration hooks publish through this
/// seam so tests can observe emissions without a live channel.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns the number of subscribers that received it.
    async fn publish(&self, event: CseEvent) -> usize;

    /// Total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation over `tokio::sync::broadcast`.
///
/// Suitable for single-node operation; publishing never blocks, and a bus
/// with no subscribers simply drops events.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<CseEvent>,
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// New bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// New bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to all events from this point on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.sender.subscribe())
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: CseEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        debug!(kind = event.kind(), "publishing event");
        // send() only fails when there are no receivers; that is fine.
        self.sender.send(event).unwrap_or(0)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
