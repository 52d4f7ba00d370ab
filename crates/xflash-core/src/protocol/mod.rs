//! Protocol implementations
//!
//! Command sequences for the serial NOR device: readiness polling,
//! memory-mapped entry, erase and program.

mod nor;

pub use nor::*;
