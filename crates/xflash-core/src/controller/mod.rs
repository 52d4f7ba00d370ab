//! QSPI controller abstraction
//!
//! [`QspiMaster`] is the seam between the command sequences in
//! [`crate::protocol`] and the hardware. [`QuadSpi`] implements it on top of
//! a QUADSPI register block.

mod quadspi;

pub use quadspi::{control_word, QuadSpi};

use crate::error::Result;
use crate::spi::{Command, FunctionalMode};

/// Something that can drive one QSPI command to completion
pub trait QspiMaster {
    /// Issue a command and wait for the controller to finish it
    ///
    /// Indirect commands return once the controller is no longer busy and
    /// any read buffer has been filled. A memory-mapped command returns as
    /// soon as it is programmed.
    fn execute(&mut self, cmd: &mut Command<'_>) -> Result<()>;

    /// The functional mode of the last command programmed, if any
    fn functional_mode(&self) -> Option<FunctionalMode>;

    /// Returns true while the controller serves the memory-mapped window
    fn is_memory_mapped(&self) -> bool {
        self.functional_mode() == Some(FunctionalMode::MemoryMapped)
    }
}
