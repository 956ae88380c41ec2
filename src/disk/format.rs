//! Filesystem formatting with fixed, reproducible identifiers.
//!
//! The identifiers are constants rather than random so repeated builds
//! produce byte-identical filesystem metadata and boot configuration can
//! reference the root partition by UUID.

use crate::error::BuildError;
use crate::process::Cmd;
use std::path::Path;
use tracing::info;

/// FAT32 volume id of the EFI System Partition (8 hex digits).
pub const EFI_VOLUME_ID: &str = "DEADBEEF";

/// Filesystem UUID of the ext4 root partition.
pub const ROOT_FS_UUID: &str = "F59E7ACA-1868-4E4D-B34D-9087DDA43174";

pub const EFI_LABEL: &str = "EFI";
pub const ROOT_LABEL: &str = "ROOT";

/// Format the EFI partition as FAT32 with the fixed volume id.
pub fn format_efi(device: &Path) -> Result<(), BuildError> {
    info!("formatting {} as FAT32 (EFI partition)", device.display());
    Cmd::new("mkfs.fat")
        .args(["-F", "32", "-n", EFI_LABEL, "-i", EFI_VOLUME_ID])
        .arg_path(device)
        .error_msg("mkfs.fat failed")
        .run()
        .map_err(|err| BuildError::Format(format!("{:#}", err)))?;
    Ok(())
}

/// Format the root partition as ext4, then set the fixed UUID.
///
/// Two steps because mkfs and the UUID-setting tool are independent
/// operations; tune2fs rewrites the superblock UUID after the fact.
pub fn format_root(device: &Path) -> Result<(), BuildError> {
    info!("formatting {} as ext4", device.display());
    Cmd::new("mkfs.ext4")
        .args(["-F", "-L", ROOT_LABEL])
        .arg_path(device)
        .error_msg("mkfs.ext4 failed")
        .run()
        .map_err(|err| BuildError::Format(format!("{:#}", err)))?;

    info!("setting root filesystem UUID to {}", ROOT_FS_UUID);
    Cmd::new("tune2fs")
        .arg("-U")
        .arg(ROOT_FS_UUID.to_lowercase())
        .arg_path(device)
        .error_msg("tune2fs -U failed")
        .run()
        .map_err(|err| BuildError::Format(format!("{:#}", err)))?;
    Ok(())
}
