//! Partition planning.
//!
//! Pure boundary computation; no I/O happens here. The layout is fixed once
//! computed: EFI partition at `[1 MiB, 1 MiB + efi_size]`, root partition
//! from there to 100% of the disk.

use crate::error::BuildError;
use crate::spec::ALIGNMENT_MIB;

/// Partition boundaries derived from the requested sizes, in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLayout {
    pub disk_size_mib: u64,
    pub efi_start_mib: u64,
    pub efi_end_mib: u64,
}

impl PartitionLayout {
    /// Compute the layout, validating the size relationship first.
    pub fn plan(disk_size_mib: u64, efi_size_mib: u64) -> Result<Self, BuildError> {
        if disk_size_mib <= efi_size_mib + ALIGNMENT_MIB {
            return Err(BuildError::Configuration(format!(
                "disk size ({} MiB) must exceed EFI size ({} MiB) plus {} MiB of alignment",
                disk_size_mib, efi_size_mib, ALIGNMENT_MIB
            )));
        }
        Ok(Self {
            disk_size_mib,
            efi_start_mib: ALIGNMENT_MIB,
            efi_end_mib: ALIGNMENT_MIB + efi_size_mib,
        })
    }

    /// EFI partition start, as parted expects it.
    pub fn efi_start(&self) -> String {
        format!("{}MiB", self.efi_start_mib)
    }

    /// EFI partition end / root partition start, as parted expects it.
    pub fn efi_end(&self) -> String {
        format!("{}MiB", self.efi_end_mib)
    }

    /// Root partition end. Always the whole remainder of the disk.
    pub fn root_end(&self) -> &'static str {
        "100%"
    }

    pub fn disk_size_bytes(&self) -> u64 {
        self.disk_size_mib * 1024 * 1024
    }
}
