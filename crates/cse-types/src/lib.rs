//! # Shared CSE Types
//!
//! Entities shared by every Trellis subsystem: operations and requests,
//! the universal [`ResultEnvelope`], resource representations, structured
//! target-id addressing, the error taxonomy, and the port traits for the
//! external collaborators (resource store, local executor, transport,
//! notifier).
//!
//! Everything here is plain data plus pure functions; the subsystem crates
//! (`cse-federation`, `cse-dispatch`, ...) own the behavior.

pub mod address;
pub mod envelope;
pub mod errors;
pub mod link;
pub mod operation;
pub mod ports;
pub mod request;
pub mod resource;
pub mod timestamp;

/// Port doubles for tests (in-memory store, scripted executor/transport,
/// recording notifier). Requires feature: `test-utils`
#[cfg(feature = "test-utils")]
pub mod testing;

pub use address::ResourceAddress;
pub use envelope::{ResponseStatusCode, ResultEnvelope};
pub use errors::CseError;
pub use link::RemoteCseLink;
pub use operation::{FilterCriteria, FilterUsage, Operation, ResponseType};
pub use ports::{LocalExecutor, Notifier, ResourceFilter, ResourceStore, Transport};
pub use request::CseRequest;
pub use resource::{attr, RequestStatus, Resource, ResourceType};
pub use timestamp::{format_timestamp, now_timestamp};
