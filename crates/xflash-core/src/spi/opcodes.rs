//! Serial NOR flash opcodes
//!
//! Instruction bytes for the commands this driver issues, plus the status
//! register bits it decodes.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase operation
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register 1
pub const RDSR: u8 = 0x05;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Read commands - 3-byte address
// ============================================================================

/// Read Data, also used as the memory-mapped fetch instruction
pub const READ: u8 = 0x03;

// ============================================================================
// Program commands - 3-byte address
// ============================================================================

/// Page Program
pub const PP: u8 = 0x02;

// ============================================================================
// Erase commands - 3-byte address
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;
/// Chip Erase (alternate opcode)
pub const CE_60: u8 = 0x60;

// ============================================================================
// Protocol mode
// ============================================================================

/// Enter QPI mode (all phases on four wires)
pub const EQIO: u8 = 0x38;
/// Reset QPI mode back to single-wire SPI, only valid in QPI
pub const RSTQIO: u8 = 0xFF;

// ============================================================================
// Status register bits
// ============================================================================

/// Status Register 1: Write In Progress (busy)
pub const SR1_WIP: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
