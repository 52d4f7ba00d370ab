//! Error types for xflash-core
//!
//! This module provides a no_std compatible error type that is shared by
//! the controller, the protocol helpers and the high-level operations.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A busy flag (controller or device) did not clear within the poll budget
    Timeout,
    /// The requested erase granularity or protocol mode has no command sequence
    NotImplemented,
    /// A command or operation argument is malformed
    InvalidArgument,
    /// Address range lies outside the flash device
    AddressOutOfBounds,
    /// Operation requires an aligned address or size
    InvalidAlignment,
    /// A mapped read was attempted while the controller is in indirect mode
    NotMemoryMapped,
    /// The flash configuration failed validation
    InvalidConfig,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "operation timed out"),
            Self::NotImplemented => write!(f, "operation not implemented for this configuration"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::NotMemoryMapped => write!(f, "controller is not in memory-mapped mode"),
            Self::InvalidConfig => write!(f, "invalid flash configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
