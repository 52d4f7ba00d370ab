//! Write command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use xflash_core::regs::Soc;
use xflash_core::ExternalFlash;

use super::erase::spinner;
use super::read::read_with_progress;
use super::CHUNK_SIZE;

/// Widen `[offset, offset + len)` to the smallest erase block
fn erase_span(offset: u32, len: u32, block: u32) -> (u32, u32) {
    let start = offset - offset % block;
    let end = (offset + len).div_ceil(block) * block;
    (start, end - start)
}

/// Program `input` at `address` in the memory-mapped window
pub fn run_write<S: Soc>(
    flash: &mut ExternalFlash<S>,
    input: &Path,
    address: Option<u32>,
    erase: bool,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let config = flash.config().clone();
    let address = address.unwrap_or(config.base_address);
    let offset = config.offset_of(address)?;

    if !config.is_valid_range(offset, data.len()) {
        return Err(format!(
            "{} bytes at 0x{:08X} do not fit in the device ({} bytes)",
            data.len(),
            address,
            config.size
        )
        .into());
    }

    println!("Writing {} bytes to 0x{:08X}", data.len(), address);

    if erase && !data.is_empty() {
        let block = config.min_erase_size().ok_or("No erase block configured")?;
        let (start, len) = erase_span(offset, data.len() as u32, block);
        let pb = spinner(format!("Erasing {} bytes at 0x{:08X}...", len, start))?;
        if let Err(e) = flash.erase(start, len) {
            pb.abandon_with_message("Erase failed");
            return Err(e.into());
        }
        pb.finish_with_message(format!("Erased {} bytes", len));
    }

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Writing")?
            .progress_chars("#>-"),
    );
    let mut done = 0usize;
    for chunk in data.chunks(CHUNK_SIZE) {
        flash.write_memory(address + done as u32, chunk)?;
        done += chunk.len();
        pb.set_position(done as u64);
    }
    pb.finish_with_message("Write complete");

    if verify {
        let actual = read_with_progress(flash, offset, data.len(), false)?;
        if let Some(pos) = data.iter().zip(&actual).position(|(a, b)| a != b) {
            return Err(format!(
                "Verification failed at 0x{:08X}: expected 0x{:02X}, got 0x{:02X}",
                address + pos as u32,
                data[pos],
                actual[pos]
            )
            .into());
        }
        println!("Verification passed");
    }

    Ok(())
}
