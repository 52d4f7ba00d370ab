//! QUADSPI controller register definitions
//!
//! Offsets are relative to the controller base. Multi-bit fields are given
//! as a shift plus an unshifted mask.

/// Control register
pub const CR: usize = 0x00;
/// Device configuration register
pub const DCR: usize = 0x04;
/// Status register
pub const SR: usize = 0x08;
/// Data length register (programmed as length - 1)
pub const DLR: usize = 0x10;
/// Communication configuration register
pub const CCR: usize = 0x14;
/// Address register
pub const AR: usize = 0x18;
/// Data register (byte access moves one FIFO entry)
pub const DR: usize = 0x20;

// CR bits
/// Peripheral enable
pub const CR_EN: u32 = 1 << 0;
/// Abort the ongoing command; self-clears when done
pub const CR_ABORT: u32 = 1 << 1;
/// Clock prescaler field shift (kernel clock / (PRESCALER + 1))
pub const CR_PRESCALER_SHIFT: u32 = 24;
/// Clock prescaler field mask
pub const CR_PRESCALER_MASK: u32 = 0xFF;

// DCR bits
/// Chip select high time field shift (CSHT + 1 cycles)
pub const DCR_CSHT_SHIFT: u32 = 8;
/// Chip select high time field mask
pub const DCR_CSHT_MASK: u32 = 0x7;
/// Flash size field shift (2^(FSIZE + 1) bytes)
pub const DCR_FSIZE_SHIFT: u32 = 16;
/// Flash size field mask
pub const DCR_FSIZE_MASK: u32 = 0x1F;

// SR bits
/// Transfer complete flag
pub const SR_TCF: u32 = 1 << 1;
/// Busy: a command is in progress
pub const SR_BUSY: u32 = 1 << 5;

// CCR fields
/// Instruction byte shift
pub const CCR_INSTRUCTION_SHIFT: u32 = 0;
/// Instruction byte mask
pub const CCR_INSTRUCTION_MASK: u32 = 0xFF;
/// Instruction phase mode shift
pub const CCR_IMODE_SHIFT: u32 = 8;
/// Address phase mode shift
pub const CCR_ADMODE_SHIFT: u32 = 10;
/// Address size shift
pub const CCR_ADSIZE_SHIFT: u32 = 12;
/// Address size value for 24-bit addresses
pub const CCR_ADSIZE_24BIT: u32 = 0b10;
/// Dummy cycles shift
pub const CCR_DCYC_SHIFT: u32 = 18;
/// Dummy cycles mask
pub const CCR_DCYC_MASK: u32 = 0x1F;
/// Data phase mode shift
pub const CCR_DMODE_SHIFT: u32 = 24;
/// Functional mode shift
pub const CCR_FMODE_SHIFT: u32 = 26;
/// Mask for every 2-bit mode field
pub const CCR_MODE_MASK: u32 = 0b11;

/// Largest address that fits in a 24-bit address phase
pub const MAX_ADDRESS_24BIT: u32 = 0x00FF_FFFF;
