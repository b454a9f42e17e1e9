//! # CSE Node Runtime
//!
//! Wires the middleware core into a runnable node: one [`NodeConfig`] plus
//! the four collaborator ports produce an event bus, a scheduler, a
//! federation manager, a request coordinator and the registration hooks,
//! with the periodic workers started and stopped together.

pub mod config;
pub mod node;

pub use config::{NodeConfig, NodeConfigError};
pub use node::{init_tracing, CseNode};
