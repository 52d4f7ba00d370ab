//! High-level flash operations
//!
//! Each operation drops the controller into indirect mode, runs its command
//! sequence and switches back to memory-mapped mode on every exit path. The
//! first error wins; a failure to restore memory-mapped mode after an
//! earlier error is only logged. The configuration is validated before any
//! command is issued, so a bad one yields [`Error::InvalidConfig`].
//!
//! Erase and read operations take flash offsets. [`write_memory`] takes an
//! address in the memory-mapped window, the way code that reads the flash
//! through the window sees it.
//!
//! None of these may run while the caller executes from, or takes
//! interrupts served from, the mapped window.

use log::{debug, warn};

use crate::config::{EraseBlock, FlashConfig};
use crate::controller::QspiMaster;
use crate::error::{Error, Result};
use crate::protocol;
use crate::spi::StatusRegister;

/// Size of the sector erased by [`erase_sector`]
pub const SECTOR_SIZE: u32 = 4096;

/// Re-enter memory-mapped mode, keeping the first error
fn finish<M: QspiMaster + ?Sized, T>(
    master: &mut M,
    config: &FlashConfig,
    result: Result<T>,
) -> Result<T> {
    let restore = protocol::enter_memory_mapped(master, config.operating_mode);
    match (result, restore) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_err)) => {
            warn!(
                "failed to restore memory-mapped mode after {}: {}",
                e, restore_err
            );
            Err(e)
        }
    }
}

/// Erase the entire device
pub fn mass_erase<M: QspiMaster + ?Sized>(master: &mut M, config: &FlashConfig) -> Result<()> {
    debug!("mass erase");
    let result = config.validate().and_then(|()| {
        protocol::chip_erase(master, config.operating_mode, config.poll.device_ready)
    });
    finish(master, config, result)
}

/// Erase the 4 KiB sector at `offset`
pub fn erase_sector<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
) -> Result<()> {
    erase_block(master, config, offset, SECTOR_SIZE)
}

/// Erase one block of `size` bytes at `offset`
///
/// `size` must be one of the configured erase granularities.
pub fn erase_block<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    size: u32,
) -> Result<()> {
    let result = config
        .validate()
        .and_then(|()| erase_block_inner(master, config, offset, size));
    finish(master, config, result)
}

fn erase_block_inner<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    size: u32,
) -> Result<()> {
    let opcode = config.erase_opcode(size).ok_or(Error::NotImplemented)?;
    if offset % size != 0 {
        return Err(Error::InvalidAlignment);
    }
    if !config.is_valid_range(offset, size as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    debug!(
        "erasing {} bytes at 0x{:06X} (opcode 0x{:02X})",
        size, offset, opcode
    );
    protocol::erase_block(
        master,
        config.operating_mode,
        opcode,
        offset,
        config.poll.device_ready,
    )
}

/// Select the largest erase block that is aligned at `offset` and fits in
/// `remaining` bytes
pub fn select_erase_block(
    config: &FlashConfig,
    offset: u32,
    remaining: u32,
) -> Option<EraseBlock> {
    config
        .erase_blocks
        .iter()
        .filter(|b| b.size != 0 && offset % b.size == 0 && b.size <= remaining)
        .max_by_key(|b| b.size)
        .copied()
}

/// Erase `len` bytes starting at `offset`
///
/// Both must be aligned to the smallest erase granularity. Each step uses
/// the largest block that fits.
pub fn erase<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    len: u32,
) -> Result<()> {
    let result = config
        .validate()
        .and_then(|()| erase_inner(master, config, offset, len));
    finish(master, config, result)
}

fn erase_inner<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    len: u32,
) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    let min_size = config.min_erase_size().ok_or(Error::NotImplemented)?;
    if offset % min_size != 0 || len % min_size != 0 {
        return Err(Error::InvalidAlignment);
    }
    if !config.is_valid_range(offset, len as usize) {
        return Err(Error::AddressOutOfBounds);
    }

    let end = offset + len;
    let mut addr = offset;
    while addr < end {
        let block = select_erase_block(config, addr, end - addr).ok_or(Error::InvalidAlignment)?;
        debug!("erasing {} bytes at 0x{:06X}", block.size, addr);
        protocol::erase_block(
            master,
            config.operating_mode,
            block.opcode,
            addr,
            config.poll.device_ready,
        )?;
        addr += block.size;
    }
    Ok(())
}

/// Program `data` at `destination`, an address in the memory-mapped window
///
/// The target range must be erased. Data is split so that no page program
/// crosses a page boundary; each page gets its own write enable and
/// readiness wait. Empty `data` is rejected with
/// [`Error::InvalidArgument`].
pub fn write_memory<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    destination: u32,
    data: &[u8],
) -> Result<()> {
    let result = config
        .validate()
        .and_then(|()| config.offset_of(destination))
        .and_then(|offset| program(master, config, offset, data));
    finish(master, config, result)
}

fn program<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    if data.is_empty() || data.len() > config.size as usize {
        return Err(Error::InvalidArgument);
    }
    if !config.is_valid_range(offset, data.len()) {
        return Err(Error::AddressOutOfBounds);
    }

    let page_size = config.page_size;
    let mut addr = offset;
    let mut done = 0usize;

    while done < data.len() {
        let page_offset = addr % page_size;
        let chunk = core::cmp::min((page_size - page_offset) as usize, data.len() - done);

        protocol::program_page(
            master,
            config.operating_mode,
            addr,
            &data[done..done + chunk],
            config.poll.device_ready,
        )?;

        done += chunk;
        addr += chunk as u32;
    }

    debug!("programmed {} bytes at 0x{:06X}", data.len(), offset);
    Ok(())
}

/// Read `buf.len()` bytes at `offset` with indirect read commands
pub fn read_memory<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    let result = config.validate().and_then(|()| {
        if config.is_valid_range(offset, buf.len()) {
            protocol::read_data(master, config.operating_mode, offset, buf)
        } else {
            Err(Error::AddressOutOfBounds)
        }
    });
    finish(master, config, result)
}

/// Read the device status register
pub fn read_status<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
) -> Result<StatusRegister> {
    let result = config
        .validate()
        .and_then(|()| protocol::read_status(master, config.operating_mode));
    finish(master, config, result)
}

/// Read the JEDEC manufacturer and device ID
pub fn read_jedec_id<M: QspiMaster + ?Sized>(
    master: &mut M,
    config: &FlashConfig,
) -> Result<(u8, u16)> {
    let result = config
        .validate()
        .and_then(|()| protocol::read_jedec_id(master, config.operating_mode));
    finish(master, config, result)
}
