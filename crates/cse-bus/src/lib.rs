//! # CSE Event Bus
//!
//! Events produced by the federation manager and the registration hooks for
//! other collaborators (announcement logic, statistics, ...). Delivery is
//! in-process fan-out over `tokio::sync::broadcast`; slow subscribers lose
//! the oldest events rather than blocking publishers.

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::CseEvent;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::Subscription;

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
