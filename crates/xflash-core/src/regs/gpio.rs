//! GPIO register definitions and pin descriptions

/// Mode register (2 bits per pin)
pub const MODER: usize = 0x00;
/// Alternate function low register (pins 0-7, 4 bits per pin)
pub const AFRL: usize = 0x20;
/// Alternate function high register (pins 8-15, 4 bits per pin)
pub const AFRH: usize = 0x24;

/// MODER value selecting alternate function mode
pub const MODER_ALTERNATE: u32 = 0b10;
/// Mask of one MODER pin field
pub const MODER_MASK: u32 = 0b11;
/// Mask of one AFR pin field
pub const AFR_MASK: u32 = 0xF;

/// Distance between consecutive GPIO port register blocks
pub const PORT_STRIDE: usize = 0x400;

/// A GPIO port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum GpioPort {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
}

impl GpioPort {
    /// All ports in register-block order
    pub const ALL: [GpioPort; 11] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::I,
        Self::J,
        Self::K,
    ];

    /// Index of the port's register block
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Look up a port by its letter ("A" to "K", case-insensitive)
    pub fn from_letter(letter: &str) -> Option<Self> {
        let mut chars = letter.chars();
        let c = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !c.is_ascii_uppercase() {
            return None;
        }
        Self::ALL.get((c as u8 - b'A') as usize).copied()
    }
}

/// One QSPI bus pin and the alternate function routing it to the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QspiPin {
    /// GPIO port
    pub port: GpioPort,
    /// Pin number within the port (0-15)
    pub pin: u8,
    /// Alternate function selector (0-15)
    pub af: u8,
}

impl QspiPin {
    /// Create a pin description
    pub const fn new(port: GpioPort, pin: u8, af: u8) -> Self {
        Self { port, pin, af }
    }

    /// MODER bit shift of this pin
    pub const fn moder_shift(&self) -> u32 {
        (self.pin as u32) * 2
    }

    /// AFR register holding this pin and the bit shift within it
    pub const fn afr_location(&self) -> (usize, u32) {
        if self.pin < 8 {
            (AFRL, (self.pin as u32) * 4)
        } else {
            (AFRH, (self.pin as u32 - 8) * 4)
        }
    }
}

/// QSPI pin table of the reference board
///
/// PB6 carries the chip select and is routed through AF10; every other
/// bus line uses AF9.
pub const DEFAULT_PINS: [QspiPin; 6] = [
    QspiPin::new(GpioPort::B, 2, 9),
    QspiPin::new(GpioPort::B, 6, 10),
    QspiPin::new(GpioPort::C, 9, 9),
    QspiPin::new(GpioPort::D, 12, 9),
    QspiPin::new(GpioPort::D, 13, 9),
    QspiPin::new(GpioPort::E, 2, 9),
];
