//! Raw image conversion to other virtual-disk container formats.

use crate::error::BuildError;
use crate::process::Cmd;
use crate::spec::DiskFormat;
use std::path::Path;
use tracing::info;

/// Convert the finished raw image to `format` at `target`.
///
/// Runs only after the loop device has been detached; the raw image must
/// not be open anywhere while qemu-img reads it.
pub fn convert(raw_image: &Path, target: &Path, format: DiskFormat) -> Result<(), BuildError> {
    info!(
        "converting '{}' to {} as '{}'",
        raw_image.display(),
        format,
        target.display()
    );
    Cmd::new("qemu-img")
        .args(["convert", "-f", "raw", "-O", format.as_str()])
        .arg_path(raw_image)
        .arg_path(target)
        .error_msg("qemu-img convert failed")
        .run()
        .map_err(|err| BuildError::Conversion(format!("{:#}", err)))?;
    Ok(())
}
