//! CLI command implementations
//!
//! Every command takes an initialized [`ExternalFlash`](xflash_core::ExternalFlash)
//! and leaves it in memory-mapped mode, whatever the outcome.

mod erase;
mod info;
mod read;
mod write;

pub use erase::{run_erase, run_erase_sector};
pub use info::{run_info, run_status};
pub use read::run_read;
pub use write::run_write;

/// Chunk size for progress reporting on reads, writes and verification
const CHUNK_SIZE: usize = 4096;
