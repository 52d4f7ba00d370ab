//! Flash device and controller configuration
//!
//! [`FlashConfig::default`] describes the reference board: an 8 MiB device
//! mapped at 0x9000_0000, driven on a single wire with the slowest clock
//! and the longest chip select high time. With the `std` feature a TOML
//! file can override any of it.

#[cfg(feature = "std")]
mod toml;

#[cfg(feature = "std")]
pub use self::toml::ConfigError;

use crate::error::{Error, Result};
use crate::regs::gpio::DEFAULT_PINS;
use crate::regs::{quadspi, QspiPin};
use crate::spi::{opcodes, OperatingMode};

/// Maximum number of erase granularities
pub const MAX_ERASE_BLOCKS: usize = 4;
/// Maximum number of bus pins
pub const MAX_PINS: usize = 8;

/// One erase granularity the device supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseBlock {
    /// Bytes erased by one command
    pub size: u32,
    /// Erase instruction
    pub opcode: u8,
}

impl EraseBlock {
    /// Create an erase block description
    pub const fn new(size: u32, opcode: u8) -> Self {
        Self { size, opcode }
    }
}

/// Sector and block erase commands of the reference device
pub const DEFAULT_ERASE_BLOCKS: [EraseBlock; 3] = [
    EraseBlock::new(4 * 1024, opcodes::SE_20),
    EraseBlock::new(32 * 1024, opcodes::BE_52),
    EraseBlock::new(64 * 1024, opcodes::BE_D8),
];

/// Bounds on busy polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLimits {
    /// SR reads while waiting for the controller to finish a command
    pub controller_busy: u32,
    /// Status register commands while waiting for the device
    pub device_ready: u32,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            controller_busy: 1_000_000,
            device_ready: 10_000_000,
        }
    }
}

/// Everything the driver needs to know about the board and the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    /// Device size in bytes (power of two)
    pub size: u32,
    /// Program page size in bytes (power of two)
    pub page_size: u32,
    /// Address of flash offset 0 in the memory-mapped window
    pub base_address: u32,
    /// Wire count used once the device is initialized
    pub operating_mode: OperatingMode,
    /// Chip select high time, in cycles minus one (0-7)
    pub chip_select_high_time: u8,
    /// Controller clock prescaler (kernel clock / (prescaler + 1))
    pub prescaler: u8,
    /// Busy polling bounds
    pub poll: PollLimits,
    /// Supported erase granularities
    pub erase_blocks: heapless::Vec<EraseBlock, MAX_ERASE_BLOCKS>,
    /// Bus pins
    pub pins: heapless::Vec<QspiPin, MAX_PINS>,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            size: 8 * 1024 * 1024,
            page_size: 256,
            base_address: 0x9000_0000,
            operating_mode: OperatingMode::Single,
            chip_select_high_time: 7,
            prescaler: 255,
            poll: PollLimits::default(),
            erase_blocks: heapless::Vec::from_slice(&DEFAULT_ERASE_BLOCKS).unwrap_or_default(),
            pins: heapless::Vec::from_slice(&DEFAULT_PINS).unwrap_or_default(),
        }
    }
}

impl FlashConfig {
    /// Check that every field is usable by the controller
    pub fn validate(&self) -> Result<()> {
        let max_size = quadspi::MAX_ADDRESS_24BIT + 1;
        if !self.size.is_power_of_two() || self.size < 2 || self.size > max_size {
            return Err(Error::InvalidConfig);
        }
        if !self.page_size.is_power_of_two() || self.page_size > self.size {
            return Err(Error::InvalidConfig);
        }
        if self.base_address.checked_add(self.size - 1).is_none() {
            return Err(Error::InvalidConfig);
        }
        if self.chip_select_high_time as u32 > quadspi::DCR_CSHT_MASK {
            return Err(Error::InvalidConfig);
        }
        if self.poll.controller_busy == 0 || self.poll.device_ready == 0 {
            return Err(Error::InvalidConfig);
        }
        for block in &self.erase_blocks {
            if !block.size.is_power_of_two() || block.size > self.size {
                return Err(Error::InvalidConfig);
            }
        }
        for pin in &self.pins {
            if pin.pin > 15 || pin.af > 15 {
                return Err(Error::InvalidConfig);
            }
        }
        Ok(())
    }

    /// Value for the controller's FSIZE field (address bits minus one)
    pub fn fsize(&self) -> u8 {
        (self.size.trailing_zeros() as u8).saturating_sub(1)
    }

    /// Translate a memory-mapped address into a flash offset
    pub fn offset_of(&self, mapped_address: u32) -> Result<u32> {
        let offset = mapped_address
            .checked_sub(self.base_address)
            .ok_or(Error::InvalidArgument)?;
        if offset >= self.size {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(offset)
    }

    /// Check if a range lies within the device
    pub fn is_valid_range(&self, offset: u32, len: usize) -> bool {
        let Ok(len) = u32::try_from(len) else {
            return false;
        };
        offset.checked_add(len).is_some_and(|end| end <= self.size)
    }

    /// Erase instruction for a block size, if the device has one
    pub fn erase_opcode(&self, size: u32) -> Option<u8> {
        self.erase_blocks
            .iter()
            .find(|b| b.size == size)
            .map(|b| b.opcode)
    }

    /// Smallest supported erase block size
    pub fn min_erase_size(&self) -> Option<u32> {
        self.erase_blocks.iter().map(|b| b.size).min()
    }
}
