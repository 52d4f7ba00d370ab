//! Hardware register access
//!
//! The driver never touches hardware directly. It goes through a [`Soc`]
//! capability that hands out [`RegisterBlock`]s for the QUADSPI controller,
//! the clock controller and the GPIO ports, and reads the memory-mapped
//! flash window. [`Stm32f7`] is the volatile MMIO implementation for the
//! real chip; tests substitute a recording register file.

pub mod gpio;
pub mod quadspi;
pub mod rcc;

pub use gpio::{GpioPort, QspiPin};

/// A block of memory-mapped registers addressed by byte offset
pub trait RegisterBlock {
    /// Read a 32-bit register
    fn read32(&self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write32(&self, offset: usize, value: u32);

    /// Read a register with an 8-bit access
    fn read8(&self, offset: usize) -> u8;

    /// Write a register with an 8-bit access
    fn write8(&self, offset: usize, value: u8);

    /// Read-modify-write a 32-bit register
    fn modify32<F: FnOnce(u32) -> u32>(&self, offset: usize, f: F) {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }
}

/// The register blocks and mapped window the flash driver needs
pub trait Soc {
    /// QUADSPI controller registers
    type Qspi: RegisterBlock;
    /// Reset and clock control registers
    type Rcc: RegisterBlock;
    /// GPIO port registers
    type Gpio: RegisterBlock;

    /// The QUADSPI controller
    fn quadspi(&self) -> &Self::Qspi;

    /// The reset and clock controller
    fn rcc(&self) -> &Self::Rcc;

    /// A GPIO port
    fn gpio(&self, port: GpioPort) -> &Self::Gpio;

    /// Copy bytes out of the memory-mapped flash window starting at `offset`
    ///
    /// Only meaningful while the controller is in memory-mapped mode.
    fn read_mapped(&self, offset: u32, buf: &mut [u8]);
}

/// Volatile access to a register block at a fixed physical address
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create an accessor for the block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of a register block that stays valid for
    /// the lifetime of the accessor, and no other code may access it.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the block
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBlock for Mmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: validity of the block is a precondition of `Mmio::new`
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: validity of the block is a precondition of `Mmio::new`
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    #[inline]
    fn read8(&self, offset: usize) -> u8 {
        // SAFETY: validity of the block is a precondition of `Mmio::new`
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u8) }
    }

    #[inline]
    fn write8(&self, offset: usize, value: u8) {
        // SAFETY: validity of the block is a precondition of `Mmio::new`
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u8, value) }
    }
}

/// QUADSPI register block base on STM32F7
pub const STM32F7_QUADSPI_BASE: usize = 0xA000_1000;
/// RCC register block base on STM32F7
pub const STM32F7_RCC_BASE: usize = 0x4002_3800;
/// GPIOA register block base on STM32F7; later ports follow at 0x400 strides
pub const STM32F7_GPIO_BASE: usize = 0x4002_0000;
/// Start of the memory-mapped QUADSPI window on STM32F7
pub const STM32F7_QSPI_MAPPED_BASE: usize = 0x9000_0000;

/// Register access for an STM32F7 with the flash on its QUADSPI bank
pub struct Stm32f7 {
    quadspi: Mmio,
    rcc: Mmio,
    gpio: [Mmio; 11],
}

impl Stm32f7 {
    /// Take ownership of the QUADSPI, RCC and GPIO register blocks
    ///
    /// # Safety
    ///
    /// Must run on an STM32F7 and at most one instance may exist.
    pub unsafe fn new() -> Self {
        Self {
            quadspi: Mmio::new(STM32F7_QUADSPI_BASE),
            rcc: Mmio::new(STM32F7_RCC_BASE),
            gpio: GpioPort::ALL
                .map(|port| Mmio::new(STM32F7_GPIO_BASE + port.index() * gpio::PORT_STRIDE)),
        }
    }
}

impl Soc for Stm32f7 {
    type Qspi = Mmio;
    type Rcc = Mmio;
    type Gpio = Mmio;

    fn quadspi(&self) -> &Mmio {
        &self.quadspi
    }

    fn rcc(&self) -> &Mmio {
        &self.rcc
    }

    fn gpio(&self, port: GpioPort) -> &Mmio {
        &self.gpio[port.index()]
    }

    fn read_mapped(&self, offset: u32, buf: &mut [u8]) {
        let base = STM32F7_QSPI_MAPPED_BASE + offset as usize;
        for (i, byte) in buf.iter_mut().enumerate() {
            // SAFETY: the window is mapped while the controller is in
            // memory-mapped mode, which the caller checks
            *byte = unsafe { core::ptr::read_volatile((base + i) as *const u8) };
        }
    }
}
