//! Reset and clock control register definitions

/// AHB3 peripheral clock enable register
pub const AHB3ENR: usize = 0x38;

/// QUADSPI clock enable
pub const AHB3ENR_QSPIEN: u32 = 1 << 1;
