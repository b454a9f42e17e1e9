//! # Trellis Test Suite
//!
//! Unified test crate containing cross-subsystem scenarios:
//!
//! ```text
//! tests/src/
//! ├── support.rs          # Executor and transport doubles with real semantics
//! ├── federation_flows.rs # Multi-CSE registration tree and transit routing
//! └── request_flows.rs    # Blocking and non-blocking request lifecycles
//! ```
//!
//! Run with `cargo test -p trellis-tests`.

pub mod support;

pub mod federation_flows;
pub mod request_flows;
