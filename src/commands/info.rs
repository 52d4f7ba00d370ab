//! Info and status commands

use xflash_core::regs::Soc;
use xflash_core::spi::StatusRegister;
use xflash_core::ExternalFlash;

fn describe_status(status: StatusRegister) -> String {
    let mut flags = Vec::new();
    if status.is_busy() {
        flags.push("busy");
    }
    if status.write_enabled() {
        flags.push("write enabled");
    }
    if flags.is_empty() {
        flags.push("idle");
    }
    format!("0x{:02X} ({})", status.bits(), flags.join(", "))
}

/// Print the device ID, status and active configuration
pub fn run_info<S: Soc>(flash: &mut ExternalFlash<S>) -> Result<(), Box<dyn std::error::Error>> {
    let (manufacturer, device) = flash.read_jedec_id()?;
    let status = flash.read_status()?;
    let config = flash.config();

    println!("JEDEC ID:      {:02X} {:04X}", manufacturer, device);
    println!("Status:        {}", describe_status(status));
    println!(
        "Size:          {} bytes ({} KiB)",
        config.size,
        config.size / 1024
    );
    println!("Page size:     {} bytes", config.page_size);
    println!(
        "Mapped window: 0x{:08X} - 0x{:08X}",
        config.base_address,
        config.base_address + (config.size - 1)
    );
    println!("Mode:          {}", config.operating_mode);

    let blocks: Vec<String> = config
        .erase_blocks
        .iter()
        .map(|b| format!("{} KiB (0x{:02X})", b.size / 1024, b.opcode))
        .collect();
    println!("Erase blocks:  {}", blocks.join(", "));
    Ok(())
}

/// Print the device status register
pub fn run_status<S: Soc>(flash: &mut ExternalFlash<S>) -> Result<(), Box<dyn std::error::Error>> {
    let status = flash.read_status()?;
    println!("Status: {}", describe_status(status));
    Ok(())
}
