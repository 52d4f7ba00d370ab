//! Serial NOR flash device model
//!
//! Behaves like a small SPI/QPI NOR part: commands are only accepted on
//! the wire count of the current protocol, program and erase need the write
//! enable latch, a busy device ignores everything but status reads, and a
//! page program wraps around inside its page.

use log::{debug, trace, warn};
use xflash_core::spi::opcodes;

use crate::Violation;

/// Configuration for the emulated device
#[derive(Debug, Clone)]
pub struct NorConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Device size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Status reads that report busy after each program or erase
    pub busy_polls: u32,
}

impl Default for NorConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xC8, // GigaDevice
            device_id: 0x6017,     // GD25LQ64C
            size: 8 * 1024 * 1024,
            page_size: 256,
            busy_polls: 2,
        }
    }
}

/// One command as it arrives on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCommand {
    /// Instruction byte
    pub instruction: u8,
    /// Wires used by the instruction phase
    pub instruction_lines: u8,
    /// Wires used by the address phase (0 without one)
    pub address_lines: u8,
    /// Wires used by the data phase (0 without one)
    pub data_lines: u8,
    /// Address, if an address phase was sent
    pub address: Option<u32>,
}

impl BusCommand {
    fn uses_only(&self, lines: u8) -> bool {
        self.instruction_lines == lines
            && (self.address_lines == 0 || self.address_lines == lines)
            && (self.data_lines == 0 || self.data_lines == lines)
    }
}

/// Emulated NOR flash
#[derive(Debug)]
pub struct NorDevice {
    config: NorConfig,
    data: Vec<u8>,
    write_enabled: bool,
    qpi: bool,
    busy_remaining: u32,
    stuck_busy: bool,
    violations: Vec<Violation>,
}

impl NorDevice {
    /// Create an erased device
    pub fn new(config: NorConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            qpi: false,
            busy_remaining: 0,
            stuck_busy: false,
            violations: Vec::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &NorConfig {
        &self.config
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns true once the device has been switched to QPI
    pub fn is_qpi(&self) -> bool {
        self.qpi
    }

    /// Returns true if the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Keep the device busy forever (or release it)
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Protocol violations seen so far
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub(crate) fn take_violations(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.violations)
    }

    fn protocol_lines(&self) -> u8 {
        if self.qpi {
            4
        } else {
            1
        }
    }

    fn status(&self) -> u8 {
        let mut sr = 0;
        if self.stuck_busy || self.busy_remaining > 0 {
            sr |= opcodes::SR1_WIP;
        }
        if self.write_enabled {
            sr |= opcodes::SR1_WEL;
        }
        sr
    }

    fn violation(&mut self, v: Violation) {
        warn!("NOR device: {}", v);
        self.violations.push(v);
    }

    /// Returns true if the device would act on `cmd` in its current protocol
    pub fn accepts(&self, cmd: &BusCommand) -> bool {
        cmd.uses_only(self.protocol_lines())
    }

    /// Run one command; `write` holds the data phase sent to the device and
    /// `read` receives the data phase it drives
    pub fn execute(&mut self, cmd: &BusCommand, write: &[u8], read: &mut [u8]) {
        read.fill(0xFF);

        if !self.accepts(cmd) {
            self.violation(Violation::ProtocolMismatch {
                instruction: cmd.instruction,
                lines: cmd.instruction_lines,
            });
            return;
        }

        let busy = self.stuck_busy || self.busy_remaining > 0;
        if cmd.instruction == opcodes::RDSR {
            let sr = self.status();
            read.fill(sr);
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
            trace!("NOR RDSR -> 0x{:02X}", sr);
            return;
        }
        if busy {
            self.violation(Violation::DeviceBusy {
                instruction: cmd.instruction,
            });
            return;
        }

        match cmd.instruction {
            opcodes::RDID => {
                let id = [
                    self.config.manufacturer_id,
                    (self.config.device_id >> 8) as u8,
                    self.config.device_id as u8,
                ];
                for (dst, src) in read.iter_mut().zip(id) {
                    *dst = src;
                }
            }
            opcodes::WREN => self.write_enabled = true,
            opcodes::READ => {
                if let Some(addr) = self.require_address(cmd) {
                    self.read(addr, read);
                }
            }
            opcodes::PP => {
                if let Some(addr) = self.require_address(cmd) {
                    if self.require_write_enable(cmd) {
                        self.program(addr, write);
                    }
                }
            }
            opcodes::SE_20 => self.erase_command(cmd, 4 * 1024),
            opcodes::BE_52 => self.erase_command(cmd, 32 * 1024),
            opcodes::BE_D8 => self.erase_command(cmd, 64 * 1024),
            opcodes::CE_C7 | opcodes::CE_60 => {
                if self.require_write_enable(cmd) {
                    debug!("NOR chip erase");
                    self.data.fill(0xFF);
                    self.finish_write();
                }
            }
            opcodes::EQIO => {
                debug!("NOR entering QPI mode");
                self.qpi = true;
            }
            opcodes::RSTQIO => {
                debug!("NOR leaving QPI mode");
                self.qpi = false;
            }
            other => debug!("NOR ignoring unknown instruction 0x{:02X}", other),
        }
    }

    /// Read array data the way a memory-mapped fetch does
    pub fn read(&self, addr: u32, buf: &mut [u8]) {
        let size = self.data.len();
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.data[(addr as usize + i) % size];
        }
    }

    fn require_address(&mut self, cmd: &BusCommand) -> Option<u32> {
        if cmd.address.is_none() {
            self.violation(Violation::MissingAddress {
                instruction: cmd.instruction,
            });
        }
        cmd.address
    }

    fn require_write_enable(&mut self, cmd: &BusCommand) -> bool {
        if !self.write_enabled {
            self.violation(Violation::WriteNotEnabled {
                instruction: cmd.instruction,
            });
        }
        self.write_enabled
    }

    fn finish_write(&mut self) {
        self.write_enabled = false;
        self.busy_remaining = self.config.busy_polls;
    }

    fn program(&mut self, addr: u32, data: &[u8]) {
        let page_size = self.config.page_size;
        let addr = addr as usize % self.data.len();
        let page_base = addr - addr % page_size;
        let mut column = addr % page_size;

        // Bytes past the end of the page wrap to its start
        for &byte in data {
            self.data[page_base + column] &= byte;
            column = (column + 1) % page_size;
        }

        trace!("NOR PP {} bytes at 0x{:06X}", data.len(), addr);
        self.finish_write();
    }

    fn erase_command(&mut self, cmd: &BusCommand, size: usize) {
        let Some(addr) = self.require_address(cmd) else {
            return;
        };
        if !self.require_write_enable(cmd) {
            return;
        }
        let start = (addr as usize % self.data.len()) & !(size - 1);
        debug!("NOR erase {} bytes at 0x{:06X}", size, start);
        self.data[start..start + size].fill(0xFF);
        self.finish_write();
    }
}
