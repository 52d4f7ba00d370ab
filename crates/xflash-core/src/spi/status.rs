//! Device status register view

use bitflags::bitflags;

use super::opcodes;

bitflags! {
    /// Decoded Status Register 1 of the NOR device
    ///
    /// Recomputed on every poll; never cached.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusRegister: u8 {
        /// Program or erase in progress
        const BUSY = opcodes::SR1_WIP;
        /// Write enable latch is set
        const WEL = opcodes::SR1_WEL;
    }
}

impl StatusRegister {
    /// Decode a raw status byte, keeping unknown bits
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Returns true while the device is busy
    pub const fn is_busy(&self) -> bool {
        self.contains(Self::BUSY)
    }

    /// Returns true if the write enable latch is set
    pub const fn write_enabled(&self) -> bool {
        self.contains(Self::WEL)
    }
}
