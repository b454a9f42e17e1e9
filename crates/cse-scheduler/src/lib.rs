//! # Background Scheduler
//!
//! The shared scheduling primitive behind the connection monitor, the
//! expiration sweep, and deferred request execution. Two kinds of task:
//!
//! - **Worker** — re-invokes a callback on a fixed interval until the
//!   callback returns `false` or the worker is stopped.
//! - **Actor** — invokes a callback once at a relative (or absolute) future
//!   time, optionally immediately.
//!
//! Both run on spawned tasks distinct from the caller. Names are unique:
//! starting a task under a name that is still running stops the previous
//! instance first, and stopping waits for any in-flight invocation to finish,
//! so at most one invocation per name is ever executing.

mod scheduler;

pub use scheduler::Scheduler;
