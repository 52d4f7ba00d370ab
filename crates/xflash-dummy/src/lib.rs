//! xflash-dummy - Emulated QUADSPI controller with a NOR flash attached
//!
//! [`DummySoc`] implements the driver's [`Soc`] capability on top of a
//! register-level model of the QUADSPI controller and a behavioral model of
//! a serial NOR device. It lets the whole driver, from pin setup to
//! memory-mapped reads, run on a host without hardware, and it records
//! every protocol mistake the driver makes as a [`Violation`].

pub mod image;
mod nor;
mod quadspi;
mod registers;

use std::rc::Rc;

use thiserror::Error;
use xflash_core::regs::{GpioPort, Soc};

pub use nor::{BusCommand, NorConfig, NorDevice};
pub use quadspi::{IssuedCommand, QspiBlock};
pub use registers::PlainRegisters;

/// A protocol mistake seen by the emulated hardware
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// The command used a wire count the device is not listening on
    #[error("instruction 0x{instruction:02X} sent on {lines} line(s) in the wrong protocol")]
    ProtocolMismatch {
        /// Instruction byte
        instruction: u8,
        /// Wires used by the instruction phase
        lines: u8,
    },

    /// The device was busy programming or erasing
    #[error("instruction 0x{instruction:02X} sent while the device was busy")]
    DeviceBusy {
        /// Instruction byte
        instruction: u8,
    },

    /// An addressed command arrived without an address phase
    #[error("instruction 0x{instruction:02X} needs an address")]
    MissingAddress {
        /// Instruction byte
        instruction: u8,
    },

    /// Program or erase without the write enable latch set
    #[error("instruction 0x{instruction:02X} sent without write enable")]
    WriteNotEnabled {
        /// Instruction byte
        instruction: u8,
    },

    /// CCR was written while the controller was still busy
    #[error("instruction 0x{instruction:02X} issued while the controller was busy")]
    CommandWhileBusy {
        /// Instruction byte
        instruction: u8,
    },

    /// A command was issued before the controller was enabled
    #[error("command issued with the controller disabled")]
    ControllerDisabled,

    /// A controller register was written with its clock gated
    #[error("QUADSPI register 0x{offset:02X} written with the peripheral clock off")]
    ClockDisabled {
        /// Register offset
        offset: usize,
    },

    /// Data was pushed before the address of an addressed write
    #[error("data written before the address phase")]
    DataBeforeAddress,

    /// The data register was read with nothing received
    #[error("data register read with an empty FIFO")]
    FifoUnderrun,

    /// The mapped window was read outside memory-mapped mode
    #[error("mapped window read outside memory-mapped mode")]
    MappedReadInIndirectMode,
}

/// Configuration for the emulated hardware
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// The NOR device behind the controller
    pub nor: NorConfig,
    /// Status reads the controller reports busy after each command
    pub controller_busy_reads: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            nor: NorConfig::default(),
            controller_busy_reads: 1,
        }
    }
}

/// Emulated SoC: QUADSPI controller, clock controller and GPIO ports
#[derive(Debug)]
pub struct DummySoc {
    qspi: QspiBlock,
    rcc: Rc<PlainRegisters>,
    gpio: Vec<PlainRegisters>,
}

impl DummySoc {
    /// Create a SoC with an erased device
    pub fn new(config: DummyConfig) -> Self {
        let rcc = Rc::new(PlainRegisters::new());
        let device = NorDevice::new(config.nor);
        Self {
            qspi: QspiBlock::new(device, config.controller_busy_reads, Rc::clone(&rcc)),
            rcc,
            gpio: GpioPort::ALL.iter().map(|_| PlainRegisters::new()).collect(),
        }
    }

    /// Create a SoC with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a SoC whose device starts out holding `initial_data`
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let soc = Self::new(config);
        soc.qspi.with_device_mut(|device| {
            let data = device.data_mut();
            let len = core::cmp::min(initial_data.len(), data.len());
            data[..len].copy_from_slice(&initial_data[..len]);
        });
        soc
    }

    /// Copy of the device contents
    pub fn contents(&self) -> Vec<u8> {
        self.qspi.with_device(|device| device.data().to_vec())
    }

    /// Returns true once the device has been switched to QPI
    pub fn device_is_qpi(&self) -> bool {
        self.qspi.with_device(NorDevice::is_qpi)
    }

    /// Keep the device busy forever (or release it)
    pub fn set_device_stuck(&self, stuck: bool) {
        self.qspi.with_device_mut(|device| device.set_stuck_busy(stuck));
    }

    /// Commands the controller has put on the bus
    pub fn commands(&self) -> Vec<IssuedCommand> {
        self.qspi.commands()
    }

    /// Forget the command log
    pub fn clear_commands(&self) {
        self.qspi.clear_commands();
    }

    /// Every violation seen so far
    pub fn violations(&self) -> Vec<Violation> {
        self.qspi.violations()
    }

    /// Returns true while the controller serves the mapped window
    pub fn is_memory_mapped(&self) -> bool {
        self.qspi.is_memory_mapped()
    }

    /// The emulated clock controller
    pub fn rcc_registers(&self) -> &PlainRegisters {
        &self.rcc
    }

    /// The emulated GPIO port
    pub fn gpio_registers(&self, port: GpioPort) -> &PlainRegisters {
        &self.gpio[port.index()]
    }

    /// The emulated QUADSPI controller
    pub fn qspi_registers(&self) -> &QspiBlock {
        &self.qspi
    }
}

impl Soc for DummySoc {
    type Qspi = QspiBlock;
    type Rcc = PlainRegisters;
    type Gpio = PlainRegisters;

    fn quadspi(&self) -> &QspiBlock {
        &self.qspi
    }

    fn rcc(&self) -> &PlainRegisters {
        &self.rcc
    }

    fn gpio(&self, port: GpioPort) -> &PlainRegisters {
        &self.gpio[port.index()]
    }

    fn read_mapped(&self, offset: u32, buf: &mut [u8]) {
        self.qspi.read_mapped(offset, buf);
    }
}
