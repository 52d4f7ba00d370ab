//! QUADSPI controller model
//!
//! Decodes register writes the way the peripheral does. A command starts:
//!
//! - indirect write: on the CCR write with no address and no data, on the
//!   AR write with an address and no data, or once DLR + 1 bytes have been
//!   pushed through DR
//! - indirect read: on the CCR write with no address, else on the AR write
//! - memory-mapped: on the CCR write; BUSY then stays set until an abort
//!
//! Register writes while the clock is off, or a CCR write while busy, are
//! dropped and reported as violations.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::{trace, warn};
use xflash_core::regs::{quadspi, rcc, RegisterBlock};
use xflash_core::spi::FunctionalMode;

use crate::nor::{BusCommand, NorDevice};
use crate::registers::PlainRegisters;
use crate::Violation;

/// A command the controller put on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    /// Instruction byte
    pub instruction: u8,
    /// Functional mode from CCR.FMODE
    pub functional_mode: FunctionalMode,
    /// Wires per phase (instruction, address, data); 0 for an absent phase
    pub lines: (u8, u8, u8),
    /// Address, if an address phase was sent
    pub address: Option<u32>,
    /// Dummy cycles
    pub dummy_cycles: u8,
    /// Bytes written to, or read from, the device
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ccr: u32,
    length: usize,
    address: Option<u32>,
}

#[derive(Debug)]
struct QspiState {
    device: NorDevice,
    cr: u32,
    dcr: u32,
    dlr: u32,
    ccr: u32,
    ar: u32,
    pending: Option<Pending>,
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    mapped: Option<BusCommand>,
    busy_reads: u32,
    busy_after_command: u32,
    commands: Vec<IssuedCommand>,
    violations: Vec<Violation>,
}

/// Emulated QUADSPI register block with the NOR device attached
#[derive(Debug)]
pub struct QspiBlock {
    state: RefCell<QspiState>,
    rcc: Rc<PlainRegisters>,
}

fn lines(field: u32) -> u8 {
    match field & quadspi::CCR_MODE_MASK {
        0b00 => 0,
        0b01 => 1,
        0b10 => 2,
        _ => 4,
    }
}

fn functional_mode(ccr: u32) -> FunctionalMode {
    match (ccr >> quadspi::CCR_FMODE_SHIFT) & quadspi::CCR_MODE_MASK {
        0b00 => FunctionalMode::IndirectWrite,
        0b01 => FunctionalMode::IndirectRead,
        // Automatic polling is never used; treat it like mapped mode
        _ => FunctionalMode::MemoryMapped,
    }
}

fn has_address(ccr: u32) -> bool {
    (ccr >> quadspi::CCR_ADMODE_SHIFT) & quadspi::CCR_MODE_MASK != 0
}

fn has_data(ccr: u32) -> bool {
    (ccr >> quadspi::CCR_DMODE_SHIFT) & quadspi::CCR_MODE_MASK != 0
}

fn bus_command(ccr: u32, address: Option<u32>) -> BusCommand {
    BusCommand {
        instruction: (ccr & quadspi::CCR_INSTRUCTION_MASK) as u8,
        instruction_lines: lines(ccr >> quadspi::CCR_IMODE_SHIFT),
        address_lines: lines(ccr >> quadspi::CCR_ADMODE_SHIFT),
        data_lines: lines(ccr >> quadspi::CCR_DMODE_SHIFT),
        address,
    }
}

impl QspiState {
    fn violation(&mut self, v: Violation) {
        warn!("QUADSPI: {}", v);
        self.violations.push(v);
    }

    fn busy(&self) -> bool {
        self.mapped.is_some() || self.pending.is_some() || self.busy_reads > 0
    }

    fn write_ccr(&mut self, ccr: u32) {
        if self.cr & quadspi::CR_EN == 0 {
            self.violation(Violation::ControllerDisabled);
            return;
        }
        if self.busy() {
            self.violation(Violation::CommandWhileBusy {
                instruction: (ccr & quadspi::CCR_INSTRUCTION_MASK) as u8,
            });
            return;
        }
        self.ccr = ccr;

        let pending = Pending {
            ccr,
            length: self.dlr as usize + 1,
            address: None,
        };
        match functional_mode(ccr) {
            FunctionalMode::MemoryMapped => {
                let cmd = bus_command(ccr, None);
                trace!("QUADSPI memory-mapped, instruction 0x{:02X}", cmd.instruction);
                self.log(ccr, None, Vec::new());
                self.mapped = Some(cmd);
            }
            FunctionalMode::IndirectWrite => {
                self.pending = Some(pending);
                self.tx.clear();
                if !has_address(ccr) && !has_data(ccr) {
                    self.run();
                }
            }
            FunctionalMode::IndirectRead => {
                self.pending = Some(pending);
                if !has_address(ccr) {
                    self.run();
                }
            }
        }
    }

    fn write_ar(&mut self, address: u32) {
        self.ar = address;
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if !has_address(pending.ccr) {
            return;
        }
        pending.address = Some(address);
        let ccr = pending.ccr;
        let starts = match functional_mode(ccr) {
            FunctionalMode::IndirectWrite => !has_data(ccr),
            FunctionalMode::IndirectRead => true,
            FunctionalMode::MemoryMapped => false,
        };
        if starts {
            self.run();
        }
    }

    fn write_dr(&mut self, byte: u8) {
        let Some(pending) = self.pending else {
            return;
        };
        if functional_mode(pending.ccr) != FunctionalMode::IndirectWrite {
            return;
        }
        if has_address(pending.ccr) && pending.address.is_none() {
            self.violation(Violation::DataBeforeAddress);
        }
        self.tx.push(byte);
        if self.tx.len() >= pending.length {
            self.run();
        }
    }

    fn read_dr(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or_else(|| {
            self.violation(Violation::FifoUnderrun);
            0
        })
    }

    /// Put the pending command on the bus
    fn run(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let ccr = pending.ccr;
        let cmd = bus_command(ccr, pending.address);

        match functional_mode(ccr) {
            FunctionalMode::IndirectRead => {
                let len = if has_data(ccr) { pending.length } else { 0 };
                let mut buf = vec![0u8; len];
                self.device.execute(&cmd, &[], &mut buf);
                self.rx.extend(buf.iter().copied());
                self.log(ccr, pending.address, buf);
            }
            _ => {
                let tx = std::mem::take(&mut self.tx);
                self.device.execute(&cmd, &tx, &mut []);
                self.log(ccr, pending.address, tx);
            }
        }

        let device_violations = self.device.take_violations();
        self.violations.extend(device_violations);
        self.busy_reads = self.busy_after_command;
    }

    fn log(&mut self, ccr: u32, address: Option<u32>, data: Vec<u8>) {
        let cmd = bus_command(ccr, address);
        self.commands.push(IssuedCommand {
            instruction: cmd.instruction,
            functional_mode: functional_mode(ccr),
            lines: (cmd.instruction_lines, cmd.address_lines, cmd.data_lines),
            address,
            dummy_cycles: ((ccr >> quadspi::CCR_DCYC_SHIFT) & quadspi::CCR_DCYC_MASK) as u8,
            data,
        });
    }

    fn abort(&mut self) {
        trace!("QUADSPI abort");
        self.pending = None;
        self.mapped = None;
        self.tx.clear();
        self.rx.clear();
        self.busy_reads = 0;
    }
}

impl QspiBlock {
    pub(crate) fn new(device: NorDevice, busy_after_command: u32, rcc: Rc<PlainRegisters>) -> Self {
        Self {
            state: RefCell::new(QspiState {
                device,
                cr: 0,
                dcr: 0,
                dlr: 0,
                ccr: 0,
                ar: 0,
                pending: None,
                tx: Vec::new(),
                rx: VecDeque::new(),
                mapped: None,
                busy_reads: 0,
                busy_after_command,
                commands: Vec::new(),
                violations: Vec::new(),
            }),
            rcc,
        }
    }

    fn clock_enabled(&self) -> bool {
        self.rcc.value(rcc::AHB3ENR) & rcc::AHB3ENR_QSPIEN != 0
    }

    /// Run `f` on the attached device
    pub fn with_device<T>(&self, f: impl FnOnce(&NorDevice) -> T) -> T {
        f(&self.state.borrow().device)
    }

    /// Run `f` on the attached device, mutably
    pub fn with_device_mut<T>(&self, f: impl FnOnce(&mut NorDevice) -> T) -> T {
        f(&mut self.state.borrow_mut().device)
    }

    /// Commands put on the bus so far
    pub fn commands(&self) -> Vec<IssuedCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forget the command log
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Violations seen by the controller and the device
    pub fn violations(&self) -> Vec<Violation> {
        self.state.borrow().violations.clone()
    }

    /// Returns true while the controller serves the mapped window
    pub fn is_memory_mapped(&self) -> bool {
        self.state.borrow().mapped.is_some()
    }

    /// Current DCR value
    pub fn dcr(&self) -> u32 {
        self.state.borrow().dcr
    }

    /// Current CR value
    pub fn cr(&self) -> u32 {
        self.state.borrow().cr
    }

    /// Fetch through the mapped window
    pub(crate) fn read_mapped(&self, offset: u32, buf: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        let mapped = state.mapped;
        match mapped {
            Some(cmd) if state.device.accepts(&cmd) => state.device.read(offset, buf),
            Some(cmd) => {
                buf.fill(0xFF);
                state.violation(Violation::ProtocolMismatch {
                    instruction: cmd.instruction,
                    lines: cmd.instruction_lines,
                });
            }
            None => {
                buf.fill(0);
                state.violation(Violation::MappedReadInIndirectMode);
            }
        }
    }
}

impl RegisterBlock for QspiBlock {
    fn read32(&self, offset: usize) -> u32 {
        let mut state = self.state.borrow_mut();
        match offset {
            quadspi::CR => state.cr,
            quadspi::DCR => state.dcr,
            quadspi::SR => {
                let busy = state.busy();
                state.busy_reads = state.busy_reads.saturating_sub(1);
                let level = (state.rx.len().min(32) as u32) << 8;
                if busy {
                    quadspi::SR_BUSY | level
                } else {
                    quadspi::SR_TCF | level
                }
            }
            quadspi::DLR => state.dlr,
            quadspi::CCR => state.ccr,
            quadspi::AR => state.ar,
            quadspi::DR => state.read_dr() as u32,
            _ => 0,
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        if !self.clock_enabled() {
            self.state
                .borrow_mut()
                .violation(Violation::ClockDisabled { offset });
            return;
        }
        let mut state = self.state.borrow_mut();
        match offset {
            quadspi::CR => {
                if value & quadspi::CR_ABORT != 0 {
                    state.abort();
                }
                state.cr = value & !quadspi::CR_ABORT;
            }
            quadspi::DCR => state.dcr = value,
            quadspi::DLR => state.dlr = value,
            quadspi::CCR => state.write_ccr(value),
            quadspi::AR => state.write_ar(value),
            quadspi::DR => state.write_dr(value as u8),
            _ => {}
        }
    }

    fn read8(&self, offset: usize) -> u8 {
        self.read32(offset) as u8
    }

    fn write8(&self, offset: usize, value: u8) {
        self.write32(offset, value as u32)
    }
}
