//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xflash_core::spi::OperatingMode;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a bus protocol name
fn parse_mode(s: &str) -> Result<OperatingMode, String> {
    OperatingMode::from_name(&s.to_lowercase())
        .ok_or_else(|| format!("Unknown mode '{}' [available: single, dual, quad]", s))
}

#[derive(Parser)]
#[command(name = "xflash")]
#[command(author, version, about = "External QSPI NOR flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Flash configuration file (TOML format)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backing image for the emulated device; created if missing
    #[arg(long, global = true, default_value = "flash.bin")]
    pub image: PathBuf,

    /// Bus protocol, overriding the configuration file
    #[arg(long, global = true, value_parser = parse_mode)]
    pub mode: Option<OperatingMode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device ID, status and configuration
    Info,

    /// Show the device status register
    Status,

    /// Erase the whole device, or an aligned range
    Erase {
        /// Start offset in flash (requires --length)
        #[arg(long, value_parser = parse_hex_u32, requires = "length")]
        offset: Option<u32>,

        /// Number of bytes to erase
        #[arg(long, value_parser = parse_hex_u32, requires = "offset")]
        length: Option<u32>,
    },

    /// Erase the 4 KiB sector containing an offset
    EraseSector {
        /// Flash offset inside the sector
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,
    },

    /// Program a file into flash
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Destination in the memory-mapped window (defaults to its start)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: Option<u32>,

        /// Erase the covered blocks before programming
        #[arg(long)]
        erase: bool,

        /// Verify through the mapped window after writing
        #[arg(long, default_value = "true")]
        verify: bool,
    },

    /// Read flash contents to a file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start offset in flash
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Number of bytes (defaults to the rest of the device)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Read with indirect commands instead of the mapped window
        #[arg(long)]
        indirect: bool,
    },
}
