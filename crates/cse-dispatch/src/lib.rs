//! # Request Coordinator
//!
//! The dispatch layer of the CSE: admits request primitives, decides between
//! local execution and transit forwarding, runs the non-blocking `<request>`
//! lifecycle, applies the per-type registration hooks, and sweeps expired
//! resources.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod sweeper;

pub use config::{CoordinatorConfig, FlexBlockingPolicy};
pub use coordinator::RequestCoordinator;
pub use error::DispatchError;
pub use hooks::RegistrationHooks;
pub use sweeper::ExpirationSweeper;
