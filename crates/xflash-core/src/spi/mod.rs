//! QSPI command types
//!
//! This module provides the command descriptor handed to the controller,
//! the wire-count and functional modes it carries, the device status
//! register view, and the opcodes understood by the NOR device.

mod command;
mod operating_mode;
pub mod opcodes;
mod status;

pub use command::{Command, Data, FunctionalMode};
pub use operating_mode::OperatingMode;
pub use opcodes::*;
pub use status::StatusRegister;
