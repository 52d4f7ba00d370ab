//! QSPI command descriptor

use super::OperatingMode;

/// How the controller treats a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionalMode {
    /// Controller shifts data out to the device
    IndirectWrite,
    /// Controller shifts data in from the device
    IndirectRead,
    /// Controller fetches on demand when the mapped window is read
    MemoryMapped,
}

impl FunctionalMode {
    /// Returns the 2-bit FMODE field value
    pub const fn field(&self) -> u32 {
        match self {
            Self::IndirectWrite => 0b00,
            Self::IndirectRead => 0b01,
            Self::MemoryMapped => 0b11,
        }
    }

    /// Returns true for either indirect mode
    pub const fn is_indirect(&self) -> bool {
        !matches!(self, Self::MemoryMapped)
    }
}

/// Data phase payload of a command
#[derive(Debug)]
pub enum Data<'a> {
    /// No data phase
    None,
    /// Bytes shifted out to the device
    Write(&'a [u8]),
    /// Buffer filled from the device
    Read(&'a mut [u8]),
}

impl Data<'_> {
    /// Number of bytes in the data phase
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Write(data) => data.len(),
            Self::Read(buf) => buf.len(),
        }
    }

    /// Returns true if there is nothing to transfer
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true unless this is `Data::None`
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A single command for the QUADSPI controller
///
/// Built on the stack, committed by the controller and dropped within one
/// operation. The lifetime ties the command to the buffer it references.
///
/// Address phase rule: a descriptor built from a plain `u32` address
/// (`indirect_write`, `indirect_read`) only gets an address phase when the
/// address is non-zero. Use the explicit constructors or
/// [`Command::with_address`] to address offset 0.
#[derive(Debug)]
pub struct Command<'a> {
    /// The instruction byte
    pub instruction: u8,

    /// Direction and completion semantics
    pub functional_mode: FunctionalMode,

    /// Wire count for every phase the command touches
    pub operating_mode: OperatingMode,

    /// 24-bit device address, if the command carries one
    pub address: Option<u32>,

    /// Number of dummy cycles after the address
    pub dummy_cycles: u8,

    /// Data phase payload
    pub data: Data<'a>,
}

impl<'a> Command<'a> {
    /// Create an instruction-only command (e.g., WREN, CE)
    pub fn simple(instruction: u8) -> Self {
        Self {
            instruction,
            functional_mode: FunctionalMode::IndirectWrite,
            operating_mode: OperatingMode::Single,
            address: None,
            dummy_cycles: 0,
            data: Data::None,
        }
    }

    /// Create a register read with no address (e.g., RDSR, RDID)
    pub fn read_reg(instruction: u8, buf: &'a mut [u8]) -> Self {
        Self {
            functional_mode: FunctionalMode::IndirectRead,
            data: read_data(buf),
            ..Self::simple(instruction)
        }
    }

    /// Create an indirect write; the address phase is omitted for address 0
    pub fn indirect_write(instruction: u8, address: u32, data: &'a [u8]) -> Self {
        Self {
            address: plain_address(address),
            data: write_data(data),
            ..Self::simple(instruction)
        }
    }

    /// Create an indirect read; the address phase is omitted for address 0
    pub fn indirect_read(instruction: u8, address: u32, buf: &'a mut [u8]) -> Self {
        Self {
            functional_mode: FunctionalMode::IndirectRead,
            address: plain_address(address),
            data: read_data(buf),
            ..Self::simple(instruction)
        }
    }

    /// Create an erase command that always carries its address
    pub fn erase(instruction: u8, address: u32) -> Self {
        Self::simple(instruction).with_address(address)
    }

    /// Create a program command that always carries its address
    pub fn program(instruction: u8, address: u32, data: &'a [u8]) -> Self {
        Self {
            data: write_data(data),
            ..Self::simple(instruction)
        }
        .with_address(address)
    }

    /// Create a data read that always carries its address
    pub fn read(instruction: u8, address: u32, buf: &'a mut [u8]) -> Self {
        Self::read_reg(instruction, buf).with_address(address)
    }

    /// Create the command that switches the controller to memory-mapped mode
    ///
    /// The controller supplies the address of each fetch itself.
    pub fn memory_mapped(instruction: u8) -> Self {
        Self {
            functional_mode: FunctionalMode::MemoryMapped,
            ..Self::simple(instruction)
        }
    }

    /// Force an address phase carrying `address`, including address 0
    pub fn with_address(mut self, address: u32) -> Self {
        self.address = Some(address);
        self
    }

    /// Set the wire count for this command
    pub fn with_operating_mode(mut self, mode: OperatingMode) -> Self {
        self.operating_mode = mode;
        self
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Returns true if the address phase is programmed
    pub fn has_address_phase(&self) -> bool {
        self.address.is_some() || self.functional_mode == FunctionalMode::MemoryMapped
    }

    /// Returns true if the data phase wire mode is programmed
    pub fn has_data_phase(&self) -> bool {
        self.data.is_present() || self.functional_mode == FunctionalMode::MemoryMapped
    }

    /// Value for the data length register: `len - 1`, or 0 with no data
    pub fn data_length_field(&self) -> u32 {
        (self.data.len() as u32).saturating_sub(1)
    }
}

fn plain_address(address: u32) -> Option<u32> {
    (address != 0).then_some(address)
}

fn write_data(data: &[u8]) -> Data<'_> {
    if data.is_empty() {
        Data::None
    } else {
        Data::Write(data)
    }
}

fn read_data(buf: &mut [u8]) -> Data<'_> {
    if buf.is_empty() {
        Data::None
    } else {
        Data::Read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    #[test]
    fn test_plain_address_zero_has_no_address_phase() {
        let cmd = Command::indirect_write(opcodes::PP, 0, &[1, 2]);
        assert_eq!(cmd.address, None);
        assert!(!cmd.has_address_phase());

        let cmd = Command::indirect_write(opcodes::PP, 0x100, &[1, 2]);
        assert_eq!(cmd.address, Some(0x100));
        assert!(cmd.has_address_phase());
    }

    #[test]
    fn test_memory_mapped_always_has_address_phase() {
        let cmd = Command::memory_mapped(opcodes::READ);
        assert_eq!(cmd.address, None);
        assert!(cmd.has_address_phase());
        assert!(cmd.has_data_phase());
        assert_eq!(cmd.data_length_field(), 0);
    }

    #[test]
    fn test_explicit_address_zero() {
        let cmd = Command::erase(opcodes::SE_20, 0);
        assert_eq!(cmd.address, Some(0));
        assert!(cmd.has_address_phase());
        assert!(!cmd.has_data_phase());
    }

    #[test]
    fn test_data_length_field() {
        assert_eq!(Command::simple(opcodes::WREN).data_length_field(), 0);

        let mut one = [0u8; 1];
        assert_eq!(
            Command::read_reg(opcodes::RDSR, &mut one).data_length_field(),
            0
        );

        let data = [0u8; 256];
        assert_eq!(
            Command::program(opcodes::PP, 0, &data).data_length_field(),
            255
        );
    }

    #[test]
    fn test_empty_slices_drop_data_phase() {
        let cmd = Command::indirect_write(opcodes::PP, 0x10, &[]);
        assert!(!cmd.data.is_present());

        let mut empty: [u8; 0] = [];
        let cmd = Command::read(opcodes::READ, 0x10, &mut empty);
        assert!(!cmd.has_data_phase());
        assert_eq!(cmd.functional_mode, FunctionalMode::IndirectRead);
    }

    #[test]
    fn test_builders() {
        let cmd = Command::simple(opcodes::EQIO)
            .with_operating_mode(OperatingMode::Quad)
            .with_dummy_cycles(8);
        assert_eq!(cmd.operating_mode, OperatingMode::Quad);
        assert_eq!(cmd.dummy_cycles, 8);
        assert_eq!(cmd.functional_mode, FunctionalMode::IndirectWrite);
    }
}
