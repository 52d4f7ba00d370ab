//! Serial NOR command sequences
//!
//! Free functions over any [`QspiMaster`]. Each takes the wire mode the
//! device currently expects; only [`enable_qpi`] ignores it, because the
//! device only understands the switch in single-wire mode.

use log::{debug, trace};

use crate::controller::QspiMaster;
use crate::error::{Error, Result};
use crate::spi::{opcodes, Command, OperatingMode, StatusRegister};

/// Read the JEDEC ID from the device
///
/// Returns (manufacturer_id, device_id) on success.
pub fn read_jedec_id<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
) -> Result<(u8, u16)> {
    let mut buf = [0u8; 3];
    let mut cmd = Command::read_reg(opcodes::RDID, &mut buf).with_operating_mode(mode);
    master.execute(&mut cmd)?;

    let manufacturer = buf[0];
    let device = ((buf[1] as u16) << 8) | (buf[2] as u16);

    Ok((manufacturer, device))
}

/// Read status register 1
pub fn read_status<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
) -> Result<StatusRegister> {
    let mut buf = [0u8; 1];
    let mut cmd = Command::read_reg(opcodes::RDSR, &mut buf).with_operating_mode(mode);
    master.execute(&mut cmd)?;
    Ok(StatusRegister::from_raw(buf[0]))
}

/// Send the Write Enable command
pub fn write_enable<M: QspiMaster + ?Sized>(master: &mut M, mode: OperatingMode) -> Result<()> {
    let mut cmd = Command::simple(opcodes::WREN).with_operating_mode(mode);
    master.execute(&mut cmd)
}

/// Wait for the device busy bit to clear
///
/// Issues at most `max_polls` status reads.
pub fn wait_ready<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
    max_polls: u32,
) -> Result<()> {
    for polls in 0..max_polls {
        if !read_status(master, mode)?.is_busy() {
            trace!("device ready after {} polls", polls + 1);
            return Ok(());
        }
    }

    Err(Error::Timeout)
}

/// Switch the controller to memory-mapped mode
///
/// Does nothing when the controller already serves the mapped window.
pub fn enter_memory_mapped<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
) -> Result<()> {
    if master.is_memory_mapped() {
        return Ok(());
    }
    let mut cmd = Command::memory_mapped(opcodes::READ).with_operating_mode(mode);
    master.execute(&mut cmd)
}

/// Put the device into QPI mode
///
/// The device powers up in single-wire mode, so the switch itself is
/// always sent on one wire.
pub fn enable_qpi<M: QspiMaster + ?Sized>(master: &mut M) -> Result<()> {
    debug!("switching device to QPI");
    let mut cmd = Command::simple(opcodes::EQIO).with_operating_mode(OperatingMode::Single);
    master.execute(&mut cmd)
}

/// Erase the entire device
pub fn chip_erase<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
    max_polls: u32,
) -> Result<()> {
    write_enable(master, mode)?;
    let mut cmd = Command::simple(opcodes::CE_C7).with_operating_mode(mode);
    master.execute(&mut cmd)?;
    wait_ready(master, mode, max_polls)
}

/// Erase one block with the given opcode
pub fn erase_block<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
    opcode: u8,
    addr: u32,
    max_polls: u32,
) -> Result<()> {
    write_enable(master, mode)?;
    let mut cmd = Command::erase(opcode, addr).with_operating_mode(mode);
    master.execute(&mut cmd)?;
    wait_ready(master, mode, max_polls)
}

/// Program a single page
///
/// The data must not cross a page boundary.
pub fn program_page<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
    addr: u32,
    data: &[u8],
    max_polls: u32,
) -> Result<()> {
    write_enable(master, mode)?;
    let mut cmd = Command::program(opcodes::PP, addr, data).with_operating_mode(mode);
    master.execute(&mut cmd)?;
    wait_ready(master, mode, max_polls)
}

/// Read data through indirect read commands
pub fn read_data<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
    addr: u32,
    buf: &mut [u8],
) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let mut cmd = Command::read(opcodes::READ, addr, buf).with_operating_mode(mode);
    master.execute(&mut cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::FunctionalMode;
    use crate::testing::MockMaster;
    use std::vec;

    #[test]
    fn test_read_jedec_id() {
        let mut master = MockMaster::new(0x1000);
        let (mfr, dev) = read_jedec_id(&mut master, OperatingMode::Single).unwrap();
        assert_eq!(mfr, 0xEF);
        assert_eq!(dev, 0x4017);
    }

    #[test]
    fn test_wait_ready_polls_until_clear() {
        let mut master = MockMaster::new(0x1000);
        master.busy_polls = 3;
        erase_block(&mut master, OperatingMode::Single, opcodes::SE_20, 0, 10).unwrap();

        assert_eq!(master.count(opcodes::RDSR), 4);
        assert!(master
            .issued
            .iter()
            .filter(|c| c.instruction == opcodes::RDSR)
            .all(|c| c.functional_mode == FunctionalMode::IndirectRead));
    }

    #[test]
    fn test_wait_ready_timeout() {
        let mut master = MockMaster::new(0x1000);
        master.stuck_busy = true;
        let result = wait_ready(&mut master, OperatingMode::Single, 5);
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(master.count(opcodes::RDSR), 5);
    }

    #[test]
    fn test_enter_memory_mapped_is_idempotent() {
        let mut master = MockMaster::new(0x1000);
        enter_memory_mapped(&mut master, OperatingMode::Quad).unwrap();
        enter_memory_mapped(&mut master, OperatingMode::Quad).unwrap();

        assert_eq!(master.issued.len(), 1);
        let cmd = &master.issued[0];
        assert_eq!(cmd.instruction, opcodes::READ);
        assert_eq!(cmd.functional_mode, FunctionalMode::MemoryMapped);
        assert_eq!(cmd.operating_mode, OperatingMode::Quad);
        assert_eq!(cmd.address, None);
    }

    #[test]
    fn test_enable_qpi_is_single_wire() {
        let mut master = MockMaster::new(0x1000);
        enable_qpi(&mut master).unwrap();
        assert_eq!(master.issued[0].instruction, opcodes::EQIO);
        assert_eq!(master.issued[0].operating_mode, OperatingMode::Single);
    }

    #[test]
    fn test_chip_erase_sequence() {
        let mut master = MockMaster::new(0x1000);
        master.memory[0x10] = 0x00;
        chip_erase(&mut master, OperatingMode::Single, 10).unwrap();

        assert_eq!(
            master.sequence(),
            vec![opcodes::WREN, opcodes::CE_C7, opcodes::RDSR]
        );
        assert_eq!(master.memory[0x10], 0xFF);
    }

    #[test]
    fn test_program_page_at_offset_zero_carries_address() {
        let mut master = MockMaster::new(0x1000);
        program_page(&mut master, OperatingMode::Single, 0, &[0x12, 0x34], 10).unwrap();

        let pp = master
            .issued
            .iter()
            .find(|c| c.instruction == opcodes::PP)
            .unwrap();
        assert_eq!(pp.address, Some(0));
        assert_eq!(pp.data, vec![0x12, 0x34]);
        assert_eq!(&master.memory[..2], &[0x12, 0x34]);
    }

    #[test]
    fn test_read_data_empty_buffer_issues_nothing() {
        let mut master = MockMaster::new(0x1000);
        read_data(&mut master, OperatingMode::Single, 0x10, &mut []).unwrap();
        assert!(master.issued.is_empty());
    }
}
