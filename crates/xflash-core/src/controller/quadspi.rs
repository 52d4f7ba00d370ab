//! QUADSPI command encoder
//!
//! Turns a [`Command`] into register writes:
//!
//! 1. DLR gets the data length minus one
//! 2. CCR gets the composed control word; with no address and no data the
//!    controller starts the command here
//! 3. AR gets the address, if the command carries one; with no data phase
//!    the command starts here
//! 4. Data moves one byte per DR access
//! 5. SR.BUSY is polled until clear, except in memory-mapped mode where
//!    BUSY stays set while the controller prefetches
//!
//! Leaving memory-mapped mode requires an abort before the next command is
//! programmed.

use log::{trace, warn};

use super::QspiMaster;
use crate::error::{Error, Result};
use crate::regs::{gpio, quadspi, rcc, QspiPin, RegisterBlock, Soc};
use crate::spi::{Command, Data, FunctionalMode};

/// Compose the CCR value for a command
pub fn control_word(cmd: &Command<'_>) -> u32 {
    let mode = cmd.operating_mode.field();

    let mut ccr = cmd.functional_mode.field() << quadspi::CCR_FMODE_SHIFT;
    if cmd.has_data_phase() {
        ccr |= mode << quadspi::CCR_DMODE_SHIFT;
    }
    ccr |= (cmd.dummy_cycles as u32 & quadspi::CCR_DCYC_MASK) << quadspi::CCR_DCYC_SHIFT;
    if cmd.has_address_phase() {
        ccr |= mode << quadspi::CCR_ADMODE_SHIFT;
        ccr |= quadspi::CCR_ADSIZE_24BIT << quadspi::CCR_ADSIZE_SHIFT;
    }
    ccr |= mode << quadspi::CCR_IMODE_SHIFT;
    ccr |= (cmd.instruction as u32) << quadspi::CCR_INSTRUCTION_SHIFT;
    ccr
}

fn validate(cmd: &Command<'_>) -> Result<()> {
    if cmd.data.is_present() && cmd.data.is_empty() {
        return Err(Error::InvalidArgument);
    }
    let direction_ok = match (&cmd.data, cmd.functional_mode) {
        (Data::None, _) => true,
        (Data::Write(_), FunctionalMode::IndirectWrite) => true,
        (Data::Read(_), FunctionalMode::IndirectRead) => true,
        _ => false,
    };
    if !direction_ok {
        return Err(Error::InvalidArgument);
    }
    if cmd.address.is_some_and(|a| a > quadspi::MAX_ADDRESS_24BIT) {
        return Err(Error::InvalidArgument);
    }
    if cmd.dummy_cycles as u32 > quadspi::CCR_DCYC_MASK {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

/// QUADSPI controller handle
///
/// Owns the SoC register capability; at most one handle exists per
/// controller, and every register access goes through it.
pub struct QuadSpi<S: Soc> {
    soc: S,
    mode: Option<FunctionalMode>,
    busy_poll_limit: u32,
}

impl<S: Soc> QuadSpi<S> {
    /// Create a handle; `busy_poll_limit` bounds every wait on the controller
    pub fn new(soc: S, busy_poll_limit: u32) -> Self {
        Self {
            soc,
            mode: None,
            busy_poll_limit,
        }
    }

    /// Access the underlying SoC capability
    pub fn soc(&self) -> &S {
        &self.soc
    }

    /// Give the SoC capability back
    pub fn release(self) -> S {
        self.soc
    }

    /// Enable the QUADSPI peripheral clock
    pub fn enable_clock(&mut self) {
        self.soc
            .rcc()
            .modify32(rcc::AHB3ENR, |v| v | rcc::AHB3ENR_QSPIEN);
    }

    /// Route each bus pin to the controller through its alternate function
    pub fn configure_pins(&mut self, pins: &[QspiPin]) {
        for pin in pins {
            let port = self.soc.gpio(pin.port);

            let shift = pin.moder_shift();
            port.modify32(gpio::MODER, |v| {
                (v & !(gpio::MODER_MASK << shift)) | (gpio::MODER_ALTERNATE << shift)
            });

            let (afr, shift) = pin.afr_location();
            port.modify32(afr, |v| {
                (v & !(gpio::AFR_MASK << shift)) | ((pin.af as u32 & gpio::AFR_MASK) << shift)
            });

            trace!("QSPI pin P{:?}{} -> AF{}", pin.port, pin.pin, pin.af);
        }
    }

    /// Program device size, chip select high time and clock prescaler
    ///
    /// `fsize` is the number of address bits minus one.
    pub fn configure(&mut self, fsize: u8, chip_select_high_time: u8, prescaler: u8) {
        let regs = self.soc.quadspi();
        regs.write32(
            quadspi::DCR,
            ((fsize as u32 & quadspi::DCR_FSIZE_MASK) << quadspi::DCR_FSIZE_SHIFT)
                | ((chip_select_high_time as u32 & quadspi::DCR_CSHT_MASK)
                    << quadspi::DCR_CSHT_SHIFT),
        );
        regs.modify32(quadspi::CR, |v| {
            (v & !(quadspi::CR_PRESCALER_MASK << quadspi::CR_PRESCALER_SHIFT))
                | ((prescaler as u32) << quadspi::CR_PRESCALER_SHIFT)
        });
    }

    /// Enable the controller
    pub fn enable(&mut self) {
        self.soc
            .quadspi()
            .modify32(quadspi::CR, |v| v | quadspi::CR_EN);
    }

    /// Read flash contents through the memory-mapped window
    pub fn read_mapped(&self, offset: u32, buf: &mut [u8]) -> Result<()> {
        if !self.is_memory_mapped() {
            return Err(Error::NotMemoryMapped);
        }
        self.soc.read_mapped(offset, buf);
        Ok(())
    }

    /// Abort the current command and wait for the controller to idle
    fn abort(&mut self) -> Result<()> {
        let regs = self.soc.quadspi();
        regs.modify32(quadspi::CR, |v| v | quadspi::CR_ABORT);
        for _ in 0..self.busy_poll_limit {
            if regs.read32(quadspi::CR) & quadspi::CR_ABORT == 0 {
                self.mode = None;
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    fn wait_not_busy(&self) -> Result<()> {
        let regs = self.soc.quadspi();
        for _ in 0..self.busy_poll_limit {
            if regs.read32(quadspi::SR) & quadspi::SR_BUSY == 0 {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }
}

impl<S: Soc> QspiMaster for QuadSpi<S> {
    fn execute(&mut self, cmd: &mut Command<'_>) -> Result<()> {
        validate(cmd)?;

        if self.is_memory_mapped() {
            self.abort()?;
        }

        let ccr = control_word(cmd);
        trace!(
            "QSPI cmd 0x{:02X} ccr=0x{:08X} addr={:?} len={}",
            cmd.instruction,
            ccr,
            cmd.address,
            cmd.data.len()
        );

        let regs = self.soc.quadspi();
        regs.write32(quadspi::DLR, cmd.data_length_field());
        regs.write32(quadspi::CCR, ccr);
        if let Some(address) = cmd.address {
            regs.write32(quadspi::AR, address);
        }

        match &mut cmd.data {
            Data::Write(data) => {
                for &byte in data.iter() {
                    regs.write8(quadspi::DR, byte);
                }
            }
            Data::Read(buf) => {
                for byte in buf.iter_mut() {
                    *byte = regs.read8(quadspi::DR);
                }
            }
            Data::None => {}
        }

        self.mode = Some(cmd.functional_mode);

        if cmd.functional_mode.is_indirect() {
            if let Err(e) = self.wait_not_busy() {
                // A stuck controller drops the next CCR write unless aborted
                if let Err(abort_err) = self.abort() {
                    warn!("QSPI abort after busy timeout failed: {}", abort_err);
                }
                self.mode = None;
                return Err(e);
            }
        }
        Ok(())
    }

    fn functional_mode(&self) -> Option<FunctionalMode> {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::GpioPort;
    use crate::spi::{opcodes, OperatingMode};
    use crate::testing::{Block, FakeSoc};
    use std::vec;
    use std::vec::Vec;

    fn field(ccr: u32, shift: u32) -> u32 {
        (ccr >> shift) & quadspi::CCR_MODE_MASK
    }

    #[test]
    fn test_control_word_simple() {
        let ccr = control_word(&Command::simple(opcodes::WREN));
        assert_eq!(ccr & 0xFF, opcodes::WREN as u32);
        assert_eq!(field(ccr, quadspi::CCR_FMODE_SHIFT), 0b00);
        assert_eq!(field(ccr, quadspi::CCR_IMODE_SHIFT), 0b01);
        assert_eq!(field(ccr, quadspi::CCR_ADMODE_SHIFT), 0);
        assert_eq!(field(ccr, quadspi::CCR_ADSIZE_SHIFT), 0);
        assert_eq!(field(ccr, quadspi::CCR_DMODE_SHIFT), 0);
    }

    #[test]
    fn test_control_word_memory_mapped() {
        let ccr = control_word(
            &Command::memory_mapped(opcodes::READ).with_operating_mode(OperatingMode::Quad),
        );
        assert_eq!(field(ccr, quadspi::CCR_FMODE_SHIFT), 0b11);
        assert_eq!(field(ccr, quadspi::CCR_IMODE_SHIFT), 0b11);
        assert_eq!(field(ccr, quadspi::CCR_ADMODE_SHIFT), 0b11);
        assert_eq!(field(ccr, quadspi::CCR_ADSIZE_SHIFT), quadspi::CCR_ADSIZE_24BIT);
        assert_eq!(field(ccr, quadspi::CCR_DMODE_SHIFT), 0b11);
        assert_eq!((ccr >> quadspi::CCR_DCYC_SHIFT) & quadspi::CCR_DCYC_MASK, 0);
    }

    #[test]
    fn test_control_word_address_zero_rule() {
        let data = [0xAA];
        let plain = control_word(&Command::indirect_write(opcodes::PP, 0, &data));
        assert_eq!(field(plain, quadspi::CCR_ADMODE_SHIFT), 0);
        assert_eq!(field(plain, quadspi::CCR_DMODE_SHIFT), 0b01);

        let explicit = control_word(&Command::program(opcodes::PP, 0, &data));
        assert_eq!(field(explicit, quadspi::CCR_ADMODE_SHIFT), 0b01);
    }

    #[test]
    fn test_control_word_dummy_cycles() {
        let mut buf = [0u8; 4];
        let ccr = control_word(&Command::read(0x0B, 0x10, &mut buf).with_dummy_cycles(8));
        assert_eq!((ccr >> quadspi::CCR_DCYC_SHIFT) & quadspi::CCR_DCYC_MASK, 8);
        assert_eq!(field(ccr, quadspi::CCR_FMODE_SHIFT), 0b01);
    }

    #[test]
    fn test_execute_register_order() {
        let soc = FakeSoc::new();
        let mut qspi = QuadSpi::new(soc, 100);

        let data = [0x11, 0x22, 0x33];
        let mut cmd = Command::program(opcodes::PP, 0x000100, &data);
        qspi.execute(&mut cmd).unwrap();

        let writes = qspi.soc().writes_to(Block::Qspi);
        let offsets: Vec<usize> = writes.iter().map(|w| w.0).collect();
        assert_eq!(
            offsets,
            vec![
                quadspi::DLR,
                quadspi::CCR,
                quadspi::AR,
                quadspi::DR,
                quadspi::DR,
                quadspi::DR
            ]
        );
        assert_eq!(writes[0].1, 2);
        assert_eq!(writes[2].1, 0x000100);
        assert_eq!(writes[3].1, 0x11);
        assert_eq!(writes[5].1, 0x33);
        assert_eq!(qspi.functional_mode(), Some(FunctionalMode::IndirectWrite));
    }

    #[test]
    fn test_execute_waits_for_busy() {
        let soc = FakeSoc::new();
        soc.set_busy_reads(3);
        let mut qspi = QuadSpi::new(soc, 100);

        qspi.execute(&mut Command::simple(opcodes::WREN)).unwrap();
        // Three busy reads plus the one that saw BUSY clear
        assert_eq!(qspi.soc().status_reads(), 4);
    }

    #[test]
    fn test_execute_busy_timeout() {
        let soc = FakeSoc::new();
        soc.set_stuck_busy(true);
        let mut qspi = QuadSpi::new(soc, 10);

        let result = qspi.execute(&mut Command::simple(opcodes::WREN));
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(qspi.soc().status_reads(), 10);

        // The timed-out command is aborted and the mode forgotten
        let writes = qspi.soc().writes_to(Block::Qspi);
        let last = writes.last().unwrap();
        assert_eq!(last.0, quadspi::CR);
        assert_ne!(last.1 & quadspi::CR_ABORT, 0);
        assert_eq!(qspi.functional_mode(), None);
    }

    #[test]
    fn test_busy_timeout_then_memory_mapped() {
        let soc = FakeSoc::new();
        soc.set_stuck_busy(true);
        let mut qspi = QuadSpi::new(soc, 10);

        assert_eq!(
            qspi.execute(&mut Command::simple(opcodes::WREN)),
            Err(Error::Timeout)
        );
        qspi.execute(&mut Command::memory_mapped(opcodes::READ)).unwrap();
        assert!(qspi.is_memory_mapped());

        // No second abort: the timeout already left the controller idle
        let aborts = qspi
            .soc()
            .writes_to(Block::Qspi)
            .iter()
            .filter(|w| w.0 == quadspi::CR && w.1 & quadspi::CR_ABORT != 0)
            .count();
        assert_eq!(aborts, 1);
    }

    #[test]
    fn test_memory_mapped_never_polls_busy() {
        let soc = FakeSoc::new();
        soc.set_stuck_busy(true);
        let mut qspi = QuadSpi::new(soc, 10);

        qspi.execute(&mut Command::memory_mapped(opcodes::READ)).unwrap();
        assert_eq!(qspi.soc().status_reads(), 0);
        assert!(qspi.is_memory_mapped());

        let writes = qspi.soc().writes_to(Block::Qspi);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], (quadspi::DLR, 0));
        assert_eq!(writes[1].0, quadspi::CCR);
    }

    #[test]
    fn test_indirect_read_fills_buffer() {
        let soc = FakeSoc::new();
        soc.queue_rx(&[0xEF, 0x40, 0x17]);
        let mut qspi = QuadSpi::new(soc, 100);

        let mut id = [0u8; 3];
        qspi.execute(&mut Command::read_reg(opcodes::RDID, &mut id)).unwrap();
        assert_eq!(id, [0xEF, 0x40, 0x17]);

        let writes = qspi.soc().writes_to(Block::Qspi);
        assert_eq!(writes[0], (quadspi::DLR, 2));
        // No address phase, so nothing written to AR
        assert!(writes.iter().all(|w| w.0 != quadspi::AR));
    }

    #[test]
    fn test_leaving_memory_mapped_aborts_first() {
        let soc = FakeSoc::new();
        let mut qspi = QuadSpi::new(soc, 100);

        qspi.execute(&mut Command::memory_mapped(opcodes::READ)).unwrap();
        qspi.soc().clear_writes();

        qspi.execute(&mut Command::simple(opcodes::WREN)).unwrap();
        let writes = qspi.soc().writes_to(Block::Qspi);
        assert_eq!(writes[0].0, quadspi::CR);
        assert_ne!(writes[0].1 & quadspi::CR_ABORT, 0);
        assert_eq!(writes[1].0, quadspi::DLR);
        assert_eq!(qspi.functional_mode(), Some(FunctionalMode::IndirectWrite));
    }

    #[test]
    fn test_rejects_malformed_commands() {
        let soc = FakeSoc::new();
        let mut qspi = QuadSpi::new(soc, 100);

        let data = [1u8];
        let mut wrong_direction = Command {
            functional_mode: FunctionalMode::IndirectRead,
            ..Command::program(opcodes::PP, 0x10, &data)
        };
        assert_eq!(
            qspi.execute(&mut wrong_direction),
            Err(Error::InvalidArgument)
        );

        let mut empty = Command {
            data: Data::Write(&[]),
            ..Command::simple(opcodes::PP)
        };
        assert_eq!(qspi.execute(&mut empty), Err(Error::InvalidArgument));

        let mut too_far = Command::erase(opcodes::SE_20, 0x0100_0000);
        assert_eq!(qspi.execute(&mut too_far), Err(Error::InvalidArgument));

        let mut too_many_dummies = Command::simple(opcodes::READ).with_dummy_cycles(32);
        assert_eq!(
            qspi.execute(&mut too_many_dummies),
            Err(Error::InvalidArgument)
        );

        let mut mapped_with_data = Command {
            data: Data::Write(&data),
            ..Command::memory_mapped(opcodes::READ)
        };
        assert_eq!(
            qspi.execute(&mut mapped_with_data),
            Err(Error::InvalidArgument)
        );

        // Nothing reached the hardware
        assert!(qspi.soc().writes_to(Block::Qspi).is_empty());
    }

    #[test]
    fn test_read_mapped_requires_mapped_mode() {
        let soc = FakeSoc::new();
        soc.set_mapped_contents(&[1, 2, 3, 4]);
        let mut qspi = QuadSpi::new(soc, 100);

        let mut buf = [0u8; 2];
        assert_eq!(qspi.read_mapped(0, &mut buf), Err(Error::NotMemoryMapped));

        qspi.execute(&mut Command::memory_mapped(opcodes::READ)).unwrap();
        qspi.read_mapped(2, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
    }

    #[test]
    fn test_configure_and_pins() {
        let soc = FakeSoc::new();
        let mut qspi = QuadSpi::new(soc, 100);

        qspi.configure_pins(&[
            QspiPin::new(GpioPort::B, 6, 10),
            QspiPin::new(GpioPort::D, 12, 9),
        ]);
        qspi.enable_clock();
        qspi.configure(22, 7, 255);
        qspi.enable();

        let soc = qspi.soc();
        let moder_b = soc.register(Block::Gpio(GpioPort::B), gpio::MODER);
        assert_eq!((moder_b >> 12) & 0b11, gpio::MODER_ALTERNATE);
        let afrl_b = soc.register(Block::Gpio(GpioPort::B), gpio::AFRL);
        assert_eq!((afrl_b >> 24) & 0xF, 10);
        let afrh_d = soc.register(Block::Gpio(GpioPort::D), gpio::AFRH);
        assert_eq!((afrh_d >> 16) & 0xF, 9);

        assert_ne!(
            soc.register(Block::Rcc, rcc::AHB3ENR) & rcc::AHB3ENR_QSPIEN,
            0
        );

        let dcr = soc.register(Block::Qspi, quadspi::DCR);
        assert_eq!((dcr >> quadspi::DCR_FSIZE_SHIFT) & quadspi::DCR_FSIZE_MASK, 22);
        assert_eq!((dcr >> quadspi::DCR_CSHT_SHIFT) & quadspi::DCR_CSHT_MASK, 7);

        let cr = soc.register(Block::Qspi, quadspi::CR);
        assert_eq!(cr >> quadspi::CR_PRESCALER_SHIFT, 255);
        assert_ne!(cr & quadspi::CR_EN, 0);
    }
}
