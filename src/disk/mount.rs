//! Mount guard.
//!
//! A partition device mounted on a temporary directory. The stage that
//! creates the mount owns it: it is released before the stage returns, on
//! success via `unmount()` and on error via drop. An unmount failure is a
//! cleanup warning; it never prevents the outer loop-device detach because
//! this guard always drops before the loop guard.

use crate::error::BuildError;
use crate::process::Cmd;
use std::path::Path;
use tempfile::TempDir;
use tracing::{info, warn};

/// A temporary directory with a partition device mounted on it.
pub struct Mount {
    // Kept alive for the lifetime of the mount; removed (after unmount)
    // when the guard drops.
    dir: TempDir,
    mounted: bool,
}

impl Mount {
    /// Mount `device` on a fresh temporary directory.
    ///
    /// `label` only names the directory, e.g. `efi_mount_abc123`.
    pub fn new(device: &Path, label: &str) -> Result<Self, BuildError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}_mount_", label))
            .tempdir()
            .map_err(|err| {
                BuildError::ResourceAcquisition(format!("creating mount point: {}", err))
            })?;

        info!("mounting {} on {}", device.display(), dir.path().display());
        Cmd::new("mount")
            .arg_path(device)
            .arg_path(dir.path())
            .error_msg("mount failed")
            .run()
            .map_err(|err| {
                BuildError::ResourceAcquisition(format!(
                    "mounting {}: {:#}",
                    device.display(),
                    err
                ))
            })?;

        Ok(Self { dir, mounted: true })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Unmount explicitly. Callers treat a failure here as a cleanup
    /// warning, not a build failure.
    pub fn unmount(mut self) -> Result<(), BuildError> {
        self.release().map_err(BuildError::Cleanup)
    }

    fn release(&mut self) -> Result<(), String> {
        if !self.mounted {
            return Ok(());
        }
        self.mounted = false;
        info!("unmounting {}", self.dir.path().display());
        Cmd::new("umount")
            .arg_path(self.dir.path())
            .error_msg("umount failed")
            .run()
            .map_err(|err| format!("unmounting {}: {:#}", self.dir.path().display(), err))?;
        Ok(())
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("cleanup: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_skips_when_not_mounted() {
        let dir = TempDir::new().unwrap();
        let mut mount = Mount { dir, mounted: false };
        assert!(mount.release().is_ok());
    }
}
