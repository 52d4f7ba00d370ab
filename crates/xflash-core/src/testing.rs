//! Test doubles shared by the unit tests
//!
//! `FakeSoc` is a register file that records every write and answers
//! status reads from a scripted busy countdown. `MockMaster` sits one layer
//! up and records whole commands, emulating just enough of a NOR device for
//! the command sequences to run.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use crate::controller::QspiMaster;
use crate::error::{Error, Result};
use crate::regs::{quadspi, GpioPort, RegisterBlock, Soc};
use crate::spi::{opcodes, Command, Data, FunctionalMode, OperatingMode};

/// Which register block an access went to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    Qspi,
    Rcc,
    Gpio(GpioPort),
}

#[derive(Default)]
struct Registers {
    values: RefCell<HashMap<(Block, usize), u32>>,
    writes: RefCell<Vec<(Block, usize, u32)>>,
    rx: RefCell<VecDeque<u8>>,
    mapped: RefCell<Vec<u8>>,
    busy_reads: Cell<u32>,
    busy_after_command: Cell<u32>,
    stuck_busy: Cell<bool>,
    status_reads: Cell<u32>,
}

impl Registers {
    fn value(&self, block: Block, offset: usize) -> u32 {
        self.values
            .borrow()
            .get(&(block, offset))
            .copied()
            .unwrap_or(0)
    }

    fn read(&self, block: Block, offset: usize) -> u32 {
        if block == Block::Qspi && offset == quadspi::SR {
            self.status_reads.set(self.status_reads.get() + 1);
            let remaining = self.busy_reads.get();
            if self.stuck_busy.get() || remaining > 0 {
                self.busy_reads.set(remaining.saturating_sub(1));
                return quadspi::SR_BUSY;
            }
            return 0;
        }
        if block == Block::Qspi && offset == quadspi::DR {
            return self.rx.borrow_mut().pop_front().unwrap_or(0) as u32;
        }
        self.value(block, offset)
    }

    fn write(&self, block: Block, offset: usize, value: u32) {
        self.writes.borrow_mut().push((block, offset, value));
        let stored = if block == Block::Qspi && offset == quadspi::CR {
            // ABORT completes immediately
            value & !quadspi::CR_ABORT
        } else {
            value
        };
        self.values.borrow_mut().insert((block, offset), stored);
        if block == Block::Qspi && offset == quadspi::CCR {
            self.busy_reads.set(self.busy_after_command.get());
        }
    }
}

/// One register block of the fake, handed out through [`Soc`]
pub struct BlockView {
    block: Block,
    registers: Rc<Registers>,
}

impl RegisterBlock for BlockView {
    fn read32(&self, offset: usize) -> u32 {
        self.registers.read(self.block, offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.registers.write(self.block, offset, value)
    }

    fn read8(&self, offset: usize) -> u8 {
        self.registers.read(self.block, offset) as u8
    }

    fn write8(&self, offset: usize, value: u8) {
        self.registers.write(self.block, offset, value as u32)
    }
}

/// Recording register file standing in for the SoC
pub struct FakeSoc {
    registers: Rc<Registers>,
    qspi: BlockView,
    rcc: BlockView,
    gpio: Vec<BlockView>,
}

impl FakeSoc {
    pub fn new() -> Self {
        let registers = Rc::new(Registers::default());
        let view = |block| BlockView {
            block,
            registers: Rc::clone(&registers),
        };
        Self {
            qspi: view(Block::Qspi),
            rcc: view(Block::Rcc),
            gpio: GpioPort::ALL
                .iter()
                .map(|&port| view(Block::Gpio(port)))
                .collect(),
            registers: Rc::clone(&registers),
        }
    }

    /// Number of SR reads that report BUSY after each command
    pub fn set_busy_reads(&self, reads: u32) {
        self.registers.busy_after_command.set(reads);
    }

    pub fn set_stuck_busy(&self, stuck: bool) {
        self.registers.stuck_busy.set(stuck);
    }

    pub fn status_reads(&self) -> u32 {
        self.registers.status_reads.get()
    }

    /// Bytes returned by successive DR reads
    pub fn queue_rx(&self, bytes: &[u8]) {
        self.registers.rx.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn set_mapped_contents(&self, bytes: &[u8]) {
        *self.registers.mapped.borrow_mut() = bytes.to_vec();
    }

    /// Writes to one block, in order, as (offset, value)
    pub fn writes_to(&self, block: Block) -> Vec<(usize, u32)> {
        self.registers
            .writes
            .borrow()
            .iter()
            .filter(|w| w.0 == block)
            .map(|w| (w.1, w.2))
            .collect()
    }

    /// Every write, in order, as (block, offset, value)
    pub fn all_writes(&self) -> Vec<(Block, usize, u32)> {
        self.registers.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.registers.writes.borrow_mut().clear();
    }

    /// Current value of a register
    pub fn register(&self, block: Block, offset: usize) -> u32 {
        self.registers.value(block, offset)
    }
}

impl Soc for FakeSoc {
    type Qspi = BlockView;
    type Rcc = BlockView;
    type Gpio = BlockView;

    fn quadspi(&self) -> &BlockView {
        &self.qspi
    }

    fn rcc(&self) -> &BlockView {
        &self.rcc
    }

    fn gpio(&self, port: GpioPort) -> &BlockView {
        &self.gpio[port.index()]
    }

    fn read_mapped(&self, offset: u32, buf: &mut [u8]) {
        let mapped = self.registers.mapped.borrow();
        let start = offset as usize;
        buf.copy_from_slice(&mapped[start..start + buf.len()]);
    }
}

/// A command as seen by [`MockMaster`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issued {
    pub instruction: u8,
    pub functional_mode: FunctionalMode,
    pub operating_mode: OperatingMode,
    pub address: Option<u32>,
    pub data: Vec<u8>,
}

/// Command-level mock with a minimal NOR device behind it
pub struct MockMaster {
    pub memory: Vec<u8>,
    pub issued: Vec<Issued>,
    /// RDSR polls reporting busy after each program or erase
    pub busy_polls: u32,
    /// Device never leaves busy
    pub stuck_busy: bool,
    /// Fail the next command with each instruction, once
    pub fail_on: Vec<(u8, Error)>,
    pub jedec_id: [u8; 3],
    mode: Option<FunctionalMode>,
    busy_remaining: u32,
}

impl MockMaster {
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0xFF; size],
            issued: Vec::new(),
            busy_polls: 0,
            stuck_busy: false,
            fail_on: Vec::new(),
            jedec_id: [0xEF, 0x40, 0x17],
            mode: None,
            busy_remaining: 0,
        }
    }

    /// Issued instructions in order
    pub fn instructions(&self) -> Vec<u8> {
        self.issued.iter().map(|c| c.instruction).collect()
    }

    /// Issued instructions with the status polls collapsed into one entry
    pub fn sequence(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for op in self.instructions() {
            if op == opcodes::RDSR && out.last() == Some(&opcodes::RDSR) {
                continue;
            }
            out.push(op);
        }
        out
    }

    pub fn count(&self, instruction: u8) -> usize {
        self.issued
            .iter()
            .filter(|c| c.instruction == instruction)
            .count()
    }

    fn erase(&mut self, address: Option<u32>, size: usize) {
        let start = address.unwrap_or(0) as usize;
        let end = (start + size).min(self.memory.len());
        self.memory[start..end].fill(0xFF);
        self.busy_remaining = self.busy_polls;
    }
}

impl QspiMaster for MockMaster {
    fn execute(&mut self, cmd: &mut Command<'_>) -> Result<()> {
        let data = match &cmd.data {
            Data::Write(d) => d.to_vec(),
            _ => Vec::new(),
        };
        self.issued.push(Issued {
            instruction: cmd.instruction,
            functional_mode: cmd.functional_mode,
            operating_mode: cmd.operating_mode,
            address: cmd.address,
            data,
        });
        self.mode = Some(cmd.functional_mode);

        if let Some(pos) = self
            .fail_on
            .iter()
            .position(|(op, _)| *op == cmd.instruction)
        {
            let (_, err) = self.fail_on.remove(pos);
            return Err(err);
        }

        if cmd.functional_mode == FunctionalMode::MemoryMapped {
            return Ok(());
        }

        match cmd.instruction {
            opcodes::RDSR => {
                let busy = self.stuck_busy || self.busy_remaining > 0;
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
                if let Data::Read(buf) = &mut cmd.data {
                    buf[0] = if busy { opcodes::SR1_WIP } else { 0 };
                }
            }
            opcodes::RDID => {
                if let Data::Read(buf) = &mut cmd.data {
                    let n = buf.len().min(3);
                    buf[..n].copy_from_slice(&self.jedec_id[..n]);
                }
            }
            opcodes::READ => {
                let start = cmd.address.unwrap_or(0) as usize;
                if let Data::Read(buf) = &mut cmd.data {
                    let len = buf.len();
                    buf.copy_from_slice(&self.memory[start..start + len]);
                }
            }
            opcodes::PP => {
                let start = cmd.address.unwrap_or(0) as usize;
                if let Data::Write(d) = &cmd.data {
                    for (i, byte) in d.iter().enumerate() {
                        self.memory[start + i] &= byte;
                    }
                }
                self.busy_remaining = self.busy_polls;
            }
            opcodes::SE_20 => self.erase(cmd.address, 0x1000),
            opcodes::BE_52 => self.erase(cmd.address, 0x8000),
            opcodes::BE_D8 => self.erase(cmd.address, 0x10000),
            opcodes::CE_C7 | opcodes::CE_60 => {
                let len = self.memory.len();
                self.erase(Some(0), len);
            }
            _ => {}
        }
        Ok(())
    }

    fn functional_mode(&self) -> Option<FunctionalMode> {
        self.mode
    }
}
