//! Plain register files for blocks without side effects

use std::cell::RefCell;
use std::collections::HashMap;

use xflash_core::regs::RegisterBlock;

/// A register block that just stores what is written
///
/// Used for the clock controller and the GPIO ports. Every write is also
/// appended to a trace.
#[derive(Debug, Default)]
pub struct PlainRegisters {
    values: RefCell<HashMap<usize, u32>>,
    trace: RefCell<Vec<(usize, u32)>>,
}

impl PlainRegisters {
    /// Create an all-zero register block
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a register
    pub fn value(&self, offset: usize) -> u32 {
        self.values.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// Writes so far, as (offset, value)
    pub fn trace(&self) -> Vec<(usize, u32)> {
        self.trace.borrow().clone()
    }
}

impl RegisterBlock for PlainRegisters {
    fn read32(&self, offset: usize) -> u32 {
        self.value(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.trace.borrow_mut().push((offset, value));
        self.values.borrow_mut().insert(offset, value);
    }

    fn read8(&self, offset: usize) -> u8 {
        self.value(offset) as u8
    }

    fn write8(&self, offset: usize, value: u8) {
        self.modify32(offset, |v| (v & !0xFF) | value as u32);
    }
}
