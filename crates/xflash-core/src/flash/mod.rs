//! External flash driver
//!
//! [`ExternalFlash`] owns the controller and the configuration, and exposes
//! the bring-up sequence plus the high-level operations. The operations are
//! also available as free functions in [`operations`], generic over any
//! [`QspiMaster`].

mod init;
pub mod operations;

pub use init::negotiate_protocol_mode;
pub use operations::{select_erase_block, SECTOR_SIZE};

use crate::config::FlashConfig;
use crate::controller::{QspiMaster, QuadSpi};
use crate::error::Result;
use crate::regs::Soc;
use crate::spi::StatusRegister;

/// Driver handle for the external NOR flash
pub struct ExternalFlash<S: Soc> {
    qspi: QuadSpi<S>,
    config: FlashConfig,
}

impl<S: Soc> ExternalFlash<S> {
    /// Create a driver; nothing touches the hardware until [`init`](Self::init)
    pub fn new(soc: S, config: FlashConfig) -> Self {
        let qspi = QuadSpi::new(soc, config.poll.controller_busy);
        Self { qspi, config }
    }

    /// The active configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// The underlying controller
    pub fn controller(&self) -> &QuadSpi<S> {
        &self.qspi
    }

    /// Mutable access to the controller, for issuing raw commands
    pub fn controller_mut(&mut self) -> &mut QuadSpi<S> {
        &mut self.qspi
    }

    /// Give the SoC capability back
    pub fn release(self) -> S {
        self.qspi.release()
    }

    /// Returns true while the flash is readable through the mapped window
    pub fn is_memory_mapped(&self) -> bool {
        self.qspi.is_memory_mapped()
    }

    /// Erase the entire device
    pub fn mass_erase(&mut self) -> Result<()> {
        operations::mass_erase(&mut self.qspi, &self.config)
    }

    /// Erase the 4 KiB sector at flash offset `offset`
    pub fn erase_sector(&mut self, offset: u32) -> Result<()> {
        operations::erase_sector(&mut self.qspi, &self.config, offset)
    }

    /// Erase one configured block of `size` bytes at `offset`
    pub fn erase_block(&mut self, offset: u32, size: u32) -> Result<()> {
        operations::erase_block(&mut self.qspi, &self.config, offset, size)
    }

    /// Erase an aligned range
    pub fn erase(&mut self, offset: u32, len: u32) -> Result<()> {
        operations::erase(&mut self.qspi, &self.config, offset, len)
    }

    /// Program `data` at `destination` in the memory-mapped window
    pub fn write_memory(&mut self, destination: u32, data: &[u8]) -> Result<()> {
        operations::write_memory(&mut self.qspi, &self.config, destination, data)
    }

    /// Read with indirect commands
    pub fn read_memory(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        operations::read_memory(&mut self.qspi, &self.config, offset, buf)
    }

    /// Read through the memory-mapped window
    pub fn read_mapped(&self, offset: u32, buf: &mut [u8]) -> Result<()> {
        if !self.config.is_valid_range(offset, buf.len()) {
            return Err(crate::Error::AddressOutOfBounds);
        }
        self.qspi.read_mapped(offset, buf)
    }

    /// Read the device status register
    pub fn read_status(&mut self) -> Result<StatusRegister> {
        operations::read_status(&mut self.qspi, &self.config)
    }

    /// Read the JEDEC manufacturer and device ID
    pub fn read_jedec_id(&mut self) -> Result<(u8, u16)> {
        operations::read_jedec_id(&mut self.qspi, &self.config)
    }
}
