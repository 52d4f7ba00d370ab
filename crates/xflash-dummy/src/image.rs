//! Loading and saving the emulated device contents

use std::fs;
use std::io;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::{DummyConfig, DummySoc};

/// Errors from image files
#[derive(Debug, Error)]
pub enum ImageError {
    /// Reading or writing the file failed
    #[error("image I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file holds more bytes than the device
    #[error("image is {len} bytes but the device holds {size}")]
    TooLarge {
        /// Bytes in the file
        len: usize,
        /// Device size
        size: usize,
    },
}

/// Create a SoC whose device holds the image at `path`
///
/// A missing file gives an erased device. A shorter image fills the start
/// of the device and leaves the rest erased.
pub fn load(config: DummyConfig, path: impl AsRef<Path>) -> Result<DummySoc, ImageError> {
    let path = path.as_ref();
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist, starting erased", path.display());
            return Ok(DummySoc::new(config));
        }
        Err(e) => return Err(e.into()),
    };

    if data.len() > config.nor.size {
        return Err(ImageError::TooLarge {
            len: data.len(),
            size: config.nor.size,
        });
    }

    debug!("loaded {} bytes from {}", data.len(), path.display());
    Ok(DummySoc::with_data(config, &data))
}

/// Write the device contents to `path`
pub fn save(soc: &DummySoc, path: impl AsRef<Path>) -> Result<(), ImageError> {
    let path = path.as_ref();
    let contents = soc.contents();
    fs::write(path, &contents)?;
    debug!("saved {} bytes to {}", contents.len(), path.display());
    Ok(())
}
