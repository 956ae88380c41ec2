//! GPT partition table creation via parted.

use crate::disk::plan::PartitionLayout;
use crate::error::BuildError;
use crate::process::Cmd;
use std::path::Path;
use tracing::info;

/// Write a GPT label and both partitions to `device`.
///
/// Partition 1 is the EFI System Partition (fat32, boot + esp flags);
/// partition 2 is the root partition (ext4 type hint) spanning the rest
/// of the disk.
pub fn apply(device: &Path, layout: &PartitionLayout) -> Result<(), BuildError> {
    info!("initializing {} with a GPT partition table", device.display());
    parted(device, &["mklabel", "gpt"])?;

    info!(
        "creating EFI system partition from {} to {}",
        layout.efi_start(),
        layout.efi_end()
    );
    parted(
        device,
        &[
            "mkpart",
            "primary",
            "fat32",
            &layout.efi_start(),
            &layout.efi_end(),
        ],
    )?;
    parted(device, &["set", "1", "boot", "on"])?;
    parted(device, &["set", "1", "esp", "on"])?;

    info!(
        "creating root partition from {} to {}",
        layout.efi_end(),
        layout.root_end()
    );
    parted(
        device,
        &[
            "mkpart",
            "primary",
            "ext4",
            &layout.efi_end(),
            layout.root_end(),
        ],
    )?;

    Ok(())
}

fn parted(device: &Path, args: &[&str]) -> Result<(), BuildError> {
    Cmd::new("parted")
        .arg("-s")
        .arg_path(device)
        .args(args.iter().copied())
        .error_msg(format!("parted {} failed", args.join(" ")))
        .run()
        .map_err(|err| BuildError::Format(format!("{:#}", err)))?;
    Ok(())
}
