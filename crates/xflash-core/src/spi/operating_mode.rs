//! Bus wire-count modes

/// Number of signal wires used on each phase of a command
///
/// The driver always applies one uniform wire count to every phase a
/// command touches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// One wire (standard SPI)
    #[default]
    Single,
    /// Two wires
    Dual,
    /// Four wires (QPI)
    Quad,
}

impl OperatingMode {
    /// Returns the number of data lines used per phase
    pub const fn lines(&self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Dual => 2,
            Self::Quad => 4,
        }
    }

    /// Returns the 2-bit phase mode field value for the control register
    pub const fn field(&self) -> u32 {
        match self {
            Self::Single => 0b01,
            Self::Dual => 0b10,
            Self::Quad => 0b11,
        }
    }

    /// Parse a mode name ("single", "dual" or "quad")
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "single" | "spi" => Some(Self::Single),
            "dual" => Some(Self::Dual),
            "quad" | "qpi" => Some(Self::Quad),
            _ => None,
        }
    }
}

impl core::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Dual => write!(f, "dual"),
            Self::Quad => write!(f, "quad"),
        }
    }
}
