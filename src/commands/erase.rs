//! Erase command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use xflash_core::regs::Soc;
use xflash_core::ExternalFlash;

pub(crate) fn spinner(message: String) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Run the erase command: the whole device, or an aligned range
pub fn run_erase<S: Soc>(
    flash: &mut ExternalFlash<S>,
    start: Option<u32>,
    length: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (start, length) {
        (Some(start), Some(len)) => {
            let pb = spinner(format!("Erasing {} bytes at 0x{:08X}...", len, start))?;
            if let Err(e) = flash.erase(start, len) {
                pb.abandon_with_message("Erase failed");
                return Err(e.into());
            }
            pb.finish_with_message(format!("Erased {} bytes at 0x{:08X}", len, start));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err("Both --offset and --length must be specified for partial erase".into());
        }
        (None, None) => {
            let size = flash.config().size;
            let pb = spinner(format!(
                "Erasing {} bytes (this may take a while)...",
                size
            ))?;
            if let Err(e) = flash.mass_erase() {
                pb.abandon_with_message("Erase failed");
                return Err(e.into());
            }
            pb.finish_with_message(format!("Erased {} bytes", size));
        }
    }
    Ok(())
}

/// Erase the 4 KiB sector containing `offset`
pub fn run_erase_sector<S: Soc>(
    flash: &mut ExternalFlash<S>,
    offset: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let sector = offset - offset % xflash_core::flash::SECTOR_SIZE;
    flash.erase_sector(sector)?;
    println!("Erased sector at 0x{:08X}", sector);
    Ok(())
}
