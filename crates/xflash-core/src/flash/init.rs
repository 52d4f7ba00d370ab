//! One-time bring-up of the controller and the device

use log::{debug, info};

use super::ExternalFlash;
use crate::controller::QspiMaster;
use crate::error::{Error, Result};
use crate::protocol;
use crate::regs::Soc;
use crate::spi::OperatingMode;

/// Switch the device from its power-up protocol to `mode`
///
/// The device starts out in single-wire mode. Quad needs one switch command
/// sent on a single wire; dual has no switch sequence.
pub fn negotiate_protocol_mode<M: QspiMaster + ?Sized>(
    master: &mut M,
    mode: OperatingMode,
) -> Result<()> {
    match mode {
        OperatingMode::Single => Ok(()),
        OperatingMode::Quad => protocol::enable_qpi(master),
        OperatingMode::Dual => Err(Error::NotImplemented),
    }
}

impl<S: Soc> ExternalFlash<S> {
    /// Bring up pins, clock, controller and device, ending in memory-mapped
    /// mode
    ///
    /// Must run exactly once after reset: a device already switched to QPI
    /// ignores the single-wire switch command.
    pub fn init(&mut self) -> Result<()> {
        self.config.validate()?;

        self.configure_gpio();
        self.enable_peripheral_clock();
        self.configure_controller();
        negotiate_protocol_mode(&mut self.qspi, self.config.operating_mode)?;
        protocol::enter_memory_mapped(&mut self.qspi, self.config.operating_mode)?;

        info!(
            "external flash ready: {} KiB at 0x{:08X}, {} mode",
            self.config.size / 1024,
            self.config.base_address,
            self.config.operating_mode
        );
        Ok(())
    }

    fn configure_gpio(&mut self) {
        debug!("configuring {} QSPI pins", self.config.pins.len());
        self.qspi.configure_pins(&self.config.pins);
    }

    fn enable_peripheral_clock(&mut self) {
        self.qspi.enable_clock();
    }

    fn configure_controller(&mut self) {
        let fsize = self.config.fsize();
        debug!(
            "QSPI fsize={} csht={} prescaler={}",
            fsize, self.config.chip_select_high_time, self.config.prescaler
        );
        self.qspi.configure(
            fsize,
            self.config.chip_select_high_time,
            self.config.prescaler,
        );
        self.qspi.enable();
    }
}
