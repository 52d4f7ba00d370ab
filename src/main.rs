//! xflash - External QSPI NOR flash tool
//!
//! Drives the external flash driver against an emulated QUADSPI controller
//! and NOR device whose contents persist in an image file. Every command
//! runs the full bring-up first, so the tool exercises the same sequence the
//! firmware runs at boot.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use xflash_core::{ExternalFlash, FlashConfig};
use xflash_dummy::{image, DummyConfig, DummySoc, NorConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match load_config(cli.config.as_deref(), &cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let dummy = DummyConfig {
        nor: NorConfig {
            size: config.size as usize,
            page_size: config.page_size as usize,
            ..NorConfig::default()
        },
        ..DummyConfig::default()
    };
    let soc = image::load(dummy, &cli.image)?;

    let mut flash = ExternalFlash::new(soc, config);
    flash.init()?;

    let modifies = matches!(
        cli.command,
        Commands::Erase { .. } | Commands::EraseSector { .. } | Commands::Write { .. }
    );

    let result = match cli.command {
        Commands::Info => commands::run_info(&mut flash),
        Commands::Status => commands::run_status(&mut flash),
        Commands::Erase { offset, length } => commands::run_erase(&mut flash, offset, length),
        Commands::EraseSector { offset } => commands::run_erase_sector(&mut flash, offset),
        Commands::Write {
            input,
            address,
            erase,
            verify,
        } => commands::run_write(&mut flash, &input, address, erase, verify),
        Commands::Read {
            output,
            offset,
            length,
            indirect,
        } => commands::run_read(&mut flash, &output, offset, length, indirect),
    };

    let soc = flash.release();
    for violation in soc.violations() {
        log::warn!("bus protocol violation: {}", violation);
    }

    // Keep partial progress, as real flash would
    if modifies {
        image::save(&soc, &cli.image)?;
    }

    result
}

/// Load the configuration file, if any, and apply command-line overrides
fn load_config(path: Option<&Path>, cli: &Cli) -> Result<FlashConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            let config = FlashConfig::from_toml_file(path)?;
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        None => FlashConfig::default(),
    };

    if let Some(mode) = cli.mode {
        config.operating_mode = mode;
    }
    config.validate()?;
    Ok(config)
}
