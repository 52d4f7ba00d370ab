//! TOML configuration file parsing
//!
//! Every key is optional; missing keys keep the defaults. An `erase_block`
//! or `pin` array replaces the whole default table.
//!
//! ```toml
//! [flash]
//! size = "8 MiB"
//! page_size = 256
//! base_address = 0x90000000
//! mode = "quad"
//!
//! [controller]
//! chip_select_high_time = 7
//! prescaler = 255
//!
//! [poll]
//! controller_busy = 1000000
//! device_ready = 10000000
//!
//! [[erase_block]]
//! size = "4 KiB"
//! opcode = 0x20
//!
//! [[pin]]
//! port = "B"
//! pin = 6
//! af = 10
//! ```

use std::format;
use std::fs;
use std::path::Path;
use std::string::{String, ToString};
use std::vec::Vec;

use thiserror::Error;

use super::{EraseBlock, FlashConfig};
use crate::regs::{GpioPort, QspiPin};
use crate::spi::OperatingMode;

/// Errors from loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has unexpected keys
    #[error("failed to parse config file: {0}")]
    Parse(#[from] ::toml::de::Error),

    /// A value could not be interpreted
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Key that held the value
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A table has more entries than the driver can hold
    #[error("too many `{0}` entries")]
    TooManyEntries(&'static str),

    /// The resulting configuration failed validation
    #[error("configuration rejected: {0}")]
    Rejected(#[from] crate::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfigFile {
    flash: Option<TomlFlash>,
    controller: Option<TomlController>,
    poll: Option<TomlPoll>,
    erase_block: Option<Vec<TomlEraseBlock>>,
    pin: Option<Vec<TomlPin>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFlash {
    size: Option<SizeValue>,
    page_size: Option<SizeValue>,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    base_address: Option<u32>,
    mode: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlController {
    chip_select_high_time: Option<u8>,
    prescaler: Option<u8>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPoll {
    controller_busy: Option<u32>,
    device_ready: Option<u32>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlEraseBlock {
    size: SizeValue,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    opcode: u32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPin {
    port: String,
    pin: u8,
    af: u8,
}

/// A size given as a number or as a string like "4 KiB"
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Int(u32),
    Str(String),
}

impl SizeValue {
    fn resolve(&self, field: &'static str) -> Result<u32, ConfigError> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Str(s) => {
                parse_size(s).map_err(|reason| ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_hex_u32(deserializer).map(Some)
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "8 MiB", "4KiB" or "0x1000"
fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = parse_number(s) {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

impl FlashConfig {
    /// Load a configuration from a TOML file, on top of the defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string, on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlConfigFile = ::toml::from_str(content)?;
        let mut config = FlashConfig::default();

        if let Some(flash) = file.flash {
            if let Some(size) = flash.size {
                config.size = size.resolve("flash.size")?;
            }
            if let Some(page_size) = flash.page_size {
                config.page_size = page_size.resolve("flash.page_size")?;
            }
            if let Some(base) = flash.base_address {
                config.base_address = base;
            }
            if let Some(mode) = flash.mode {
                config.operating_mode = OperatingMode::from_name(&mode.to_lowercase())
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "flash.mode",
                        reason: format!("unknown mode `{}`", mode),
                    })?;
            }
        }

        if let Some(controller) = file.controller {
            if let Some(csht) = controller.chip_select_high_time {
                config.chip_select_high_time = csht;
            }
            if let Some(prescaler) = controller.prescaler {
                config.prescaler = prescaler;
            }
        }

        if let Some(poll) = file.poll {
            if let Some(n) = poll.controller_busy {
                config.poll.controller_busy = n;
            }
            if let Some(n) = poll.device_ready {
                config.poll.device_ready = n;
            }
        }

        if let Some(blocks) = file.erase_block {
            config.erase_blocks.clear();
            for block in blocks {
                let opcode = u8::try_from(block.opcode).map_err(|_| ConfigError::InvalidValue {
                    field: "erase_block.opcode",
                    reason: block.opcode.to_string(),
                })?;
                let size = block.size.resolve("erase_block.size")?;
                config
                    .erase_blocks
                    .push(EraseBlock::new(size, opcode))
                    .map_err(|_| ConfigError::TooManyEntries("erase_block"))?;
            }
        }

        if let Some(pins) = file.pin {
            config.pins.clear();
            for pin in pins {
                let port =
                    GpioPort::from_letter(&pin.port).ok_or_else(|| ConfigError::InvalidValue {
                        field: "pin.port",
                        reason: format!("unknown port `{}`", pin.port),
                    })?;
                config
                    .pins
                    .push(QspiPin::new(port, pin.pin, pin.af))
                    .map_err(|_| ConfigError::TooManyEntries("pin"))?;
            }
        }

        config.validate()?;
        Ok(config)
    }
}
