//! Loop device guard.
//!
//! The loop device is the first OS-level resource the build acquires, so it
//! is the last one released: the guard detaches on drop, which covers every
//! error path after attachment, and `detach()` consumes the guard on the
//! success path. Detachment is attempted exactly once either way.

use crate::error::BuildError;
use crate::process::Cmd;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long to wait for the kernel to expose partition sub-devices after
/// the partition table is written. A fixed sleep here is racy on slow
/// storage; we poll instead.
const PARTITION_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const PARTITION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An OS-assigned loop device bound to the image file, with partition
/// scanning enabled so partition sub-devices appear automatically.
pub struct LoopDevice {
    path: PathBuf,
    detached: bool,
}

impl LoopDevice {
    /// Attach `image` to a free loop device with partition scanning.
    pub fn attach(image: &Path) -> Result<Self, BuildError> {
        info!("attaching '{}' as a loop device", image.display());
        let device = Cmd::new("losetup")
            .args(["--find", "--partscan", "--show"])
            .arg_path(image)
            .error_msg("losetup failed")
            .run_capture()
            .map_err(|err| {
                BuildError::ResourceAcquisition(format!(
                    "attaching '{}' to a loop device: {:#}",
                    image.display(),
                    err
                ))
            })?;

        if device.is_empty() {
            return Err(BuildError::ResourceAcquisition(
                "losetup reported no device".to_string(),
            ));
        }

        info!("loop device {} attached", device);
        Ok(Self {
            path: PathBuf::from(device),
            detached: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Device node of partition `number` (1-based), e.g. `/dev/loop0p1`.
    pub fn partition(&self, number: u32) -> PathBuf {
        PathBuf::from(format!("{}p{}", self.path.display(), number))
    }

    /// Poll until the first `count` partition device nodes exist.
    ///
    /// Times out with a descriptive error if the kernel never exposes them.
    pub fn wait_for_partitions(&self, count: u32) -> Result<(), BuildError> {
        let deadline = Instant::now() + PARTITION_WAIT_TIMEOUT;
        loop {
            let missing: Vec<PathBuf> = (1..=count)
                .map(|n| self.partition(n))
                .filter(|p| !p.exists())
                .collect();
            if missing.is_empty() {
                debug!("all {} partition nodes present on {}", count, self.path.display());
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BuildError::ResourceAcquisition(format!(
                    "partition devices did not appear within {:?}: {}",
                    PARTITION_WAIT_TIMEOUT,
                    missing
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            thread::sleep(PARTITION_POLL_INTERVAL);
        }
    }

    /// Detach explicitly on the success path. The raw image must not be
    /// open anywhere before a format conversion runs.
    pub fn detach(mut self) -> Result<(), BuildError> {
        self.release().map_err(BuildError::Cleanup)
    }

    fn release(&mut self) -> Result<(), String> {
        if self.detached {
            return Ok(());
        }
        // Mark first: even a failed detach must not be retried.
        self.detached = true;
        info!("detaching loop device {}", self.path.display());
        Cmd::new("losetup")
            .arg("-d")
            .arg_path(&self.path)
            .error_msg("losetup -d failed")
            .run()
            .map_err(|err| format!("detaching {}: {:#}", self.path.display(), err))?;
        Ok(())
    }
}

impl Drop for LoopDevice {
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
    fn test_partition_device_naming() {
        let dev = LoopDevice {
            path: PathBuf::from("/dev/loop7"),
            detached: true,
        };
        assert_eq!(dev.partition(1), PathBuf::from("/dev/loop7p1"));
        assert_eq!(dev.partition(2), PathBuf::from("/dev/loop7p2"));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut dev = LoopDevice {
            path: PathBuf::from("/dev/loop7"),
            detached: true,
        };
        // Already detached: no command is run, no error.
        assert!(dev.release().is_ok());
        assert!(dev.release().is_ok());
    }
}
