//! Pure federation-topology logic, no I/O.

pub mod table;
