//! Read command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use xflash_core::regs::Soc;
use xflash_core::ExternalFlash;

use super::CHUNK_SIZE;

/// Read `length` bytes at `offset` into `output`
///
/// Reads go through the memory-mapped window unless `indirect` is set.
pub fn run_read<S: Soc>(
    flash: &mut ExternalFlash<S>,
    output: &Path,
    offset: u32,
    length: Option<u32>,
    indirect: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = flash.config().size;
    let length = match length {
        Some(len) => len,
        None => size.checked_sub(offset).ok_or("Offset is past the end of the device")?,
    };

    let data = read_with_progress(flash, offset, length as usize, indirect)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Read a range with a progress bar
pub(crate) fn read_with_progress<S: Soc>(
    flash: &mut ExternalFlash<S>,
    offset: u32,
    length: usize,
    indirect: bool,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut done = 0usize;
    for chunk in data.chunks_mut(CHUNK_SIZE) {
        let addr = offset + done as u32;
        if indirect {
            flash.read_memory(addr, chunk)?;
        } else {
            flash.read_mapped(addr, chunk)?;
        }
        done += chunk.len();
        pb.set_position(done as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
