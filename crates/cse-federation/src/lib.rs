//! # CSE Federation Manager
//!
//! Tracks the local CSE's link to its registrar (upstream) and to its
//! registree CSEs (downstream), and resolves arbitrary CSE-IDs to a
//! forwarding link. A periodic connection monitor reconciles registrar
//! state (bootstrap, drift sync, teardown) and checks registree liveliness.
//!
//! ## Topology model
//!
//! The federation table maps every known CSE-ID to the entry it was learned
//! from. Direct registrees carry a concrete link (their `<CSR>` projection);
//! CSE-IDs known only through a registree's descendant list carry no link and
//! resolve transitively through `registered_at`. Following `registered_at`
//! from any entry terminates at the local CSE — the table is always a tree
//! rooted at the local node.

pub mod config;
pub mod domain;
pub mod error;
pub mod manager;
pub mod monitor;

pub use config::{FederationConfig, RegistrarConfig};
pub use domain::table::FederationTable;
pub use error::FederationError;
pub use manager::{FederationManager, RegistrationState};
