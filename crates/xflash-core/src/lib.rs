//! xflash-core - Driver for an external NOR flash behind a QUADSPI controller
//!
//! This crate encodes commands for an STM32-style QUADSPI peripheral, polls
//! the attached serial NOR device for readiness, and keeps the controller in
//! memory-mapped mode whenever no operation is in flight. It is `no_std`
//! compatible and performs no allocation.
//!
//! # Features
//!
//! - `std` - Enable standard library support, TOML configuration loading
//!   and `std::error::Error` impls
//!
//! # Example
//!
//! ```ignore
//! use xflash_core::{config::FlashConfig, flash::ExternalFlash, regs::Stm32f7};
//!
//! let soc = unsafe { Stm32f7::new() };
//! let mut flash = ExternalFlash::new(soc, FlashConfig::default());
//! flash.init()?;
//! flash.erase_sector(0x1000)?;
//! flash.write_memory(0x9000_1000, b"hello")?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod config;
pub mod controller;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod regs;
pub mod spi;

#[cfg(test)]
mod testing;

pub use config::FlashConfig;
pub use error::{Error, Result};
pub use flash::ExternalFlash;
