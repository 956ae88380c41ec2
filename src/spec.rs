//! The build request and its domain enums.
//!
//! `DiskImageSpec` is validated in full before any OS-level resource is
//! touched: size relationship, destination collision, and loader presence
//! are all rejected up front.

use crate::error::BuildError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Partition alignment unit in MiB. The EFI partition starts here and every
/// boundary is a multiple of it, which the formatting tools require.
pub const ALIGNMENT_MIB: u64 = 1;

/// Target architectures the image can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
}

impl Arch {
    /// UEFI default-boot filename under `EFI/Boot` for this architecture.
    pub fn loader_filename(self) -> &'static str {
        match self {
            Self::X86_64 => "BOOTX64.EFI",
            Self::Arm64 => "BOOTAA64.EFI",
        }
    }

    /// Filename the kernel build produces for this architecture.
    pub fn kernel_image_name(self) -> &'static str {
        match self {
            Self::X86_64 => "bzImage",
            Self::Arm64 => "Image",
        }
    }

    /// Cross-toolchain prefix used when building on a foreign host.
    pub fn cross_compile_prefix(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64-linux-gnu-",
            Self::Arm64 => "aarch64-linux-gnu-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

impl FromStr for Arch {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" => Ok(Self::X86_64),
            "arm64" => Ok(Self::Arm64),
            other => Err(BuildError::UnsupportedArchitecture(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Virtual-disk container formats `qemu-img` can convert the raw image to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    Raw,
    Qcow2,
    Vmdk,
    Vdi,
    Vhdx,
    Vpc,
}

impl DiskFormat {
    /// Format name as `qemu-img convert -O` expects it.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Qcow2 => "qcow2",
            Self::Vmdk => "vmdk",
            Self::Vdi => "vdi",
            Self::Vhdx => "vhdx",
            Self::Vpc => "vpc",
        }
    }
}

impl FromStr for DiskFormat {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "qcow2" => Ok(Self::Qcow2),
            "vmdk" => Ok(Self::Vmdk),
            "vdi" => Ok(Self::Vdi),
            "vhdx" => Ok(Self::Vhdx),
            "vpc" => Ok(Self::Vpc),
            other => Err(BuildError::Configuration(format!(
                "unsupported target format '{}' (expected: raw, qcow2, vmdk, vdi, vhdx, vpc)",
                other
            ))),
        }
    }
}

impl fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional final conversion of the raw image.
#[derive(Debug, Clone)]
pub struct ConvertTarget {
    pub path: PathBuf,
    pub format: DiskFormat,
}

/// A complete disk image build request.
#[derive(Debug, Clone)]
pub struct DiskImageSpec {
    /// Destination path for the raw image. Must not exist yet.
    pub image_path: PathBuf,
    pub arch: Arch,
    /// UEFI loader binary to install into the EFI System Partition.
    pub os_loader: PathBuf,
    /// Directory searched recursively for `*.cpio.gz` layer archives.
    /// Optional: a missing directory yields an empty root filesystem.
    pub layers_dir: PathBuf,
    /// Total disk size in MiB.
    pub disk_size_mib: u64,
    /// EFI System Partition size in MiB.
    pub efi_size_mib: u64,
    /// Convert the finished raw image when set.
    pub convert: Option<ConvertTarget>,
}

impl DiskImageSpec {
    /// Reject invalid requests before any resource is acquired.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.disk_size_mib <= self.efi_size_mib + ALIGNMENT_MIB {
            return Err(BuildError::Configuration(format!(
                "disk size ({} MiB) must exceed EFI size ({} MiB) plus {} MiB of alignment",
                self.disk_size_mib, self.efi_size_mib, ALIGNMENT_MIB
            )));
        }
        if self.image_path.exists() {
            return Err(BuildError::AlreadyExists(self.image_path.clone()));
        }
        if !self.os_loader.is_file() {
            return Err(BuildError::Configuration(format!(
                "OS loader '{}' does not exist",
                self.os_loader.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec_in(temp: &TempDir) -> DiskImageSpec {
        let loader = temp.path().join("bzImage");
        fs::write(&loader, b"loader").unwrap();
        DiskImageSpec {
            image_path: temp.path().join("disk.img"),
            arch: Arch::X86_64,
            os_loader: loader,
            layers_dir: temp.path().join("layers"),
            disk_size_mib: 512,
            efi_size_mib: 256,
            convert: None,
        }
    }

    #[test]
    fn test_valid_spec_passes() {
        let temp = TempDir::new().unwrap();
        assert!(spec_in(&temp).validate().is_ok());
    }

    #[test]
    fn test_disk_must_exceed_efi_plus_alignment() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(&temp);
        spec.disk_size_mib = 257;
        spec.efi_size_mib = 256;
        assert!(matches!(
            spec.validate(),
            Err(BuildError::Configuration(_))
        ));

        // One MiB above the boundary is accepted.
        spec.disk_size_mib = 258;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_existing_image_path_rejected() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        fs::write(&spec.image_path, b"").unwrap();
        assert!(matches!(
            spec.validate(),
            Err(BuildError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_missing_loader_rejected() {
        let temp = TempDir::new().unwrap();
        let mut spec = spec_in(&temp);
        spec.os_loader = temp.path().join("no-such-loader");
        assert!(matches!(
            spec.validate(),
            Err(BuildError::Configuration(_))
        ));
    }

    #[test]
    fn test_arch_loader_filenames() {
        assert_eq!(Arch::X86_64.loader_filename(), "BOOTX64.EFI");
        assert_eq!(Arch::Arm64.loader_filename(), "BOOTAA64.EFI");
    }

    #[test]
    fn test_arch_kernel_image_names() {
        assert_eq!(Arch::X86_64.kernel_image_name(), "bzImage");
        assert_eq!(Arch::Arm64.kernel_image_name(), "Image");
    }

    #[test]
    fn test_arch_parsing() {
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("arm64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert!(matches!(
            "riscv64".parse::<Arch>(),
            Err(BuildError::UnsupportedArchitecture(_))
        ));
    }

    #[test]
    fn test_disk_format_parsing_round_trip() {
        for name in ["raw", "qcow2", "vmdk", "vdi", "vhdx", "vpc"] {
            let fmt: DiskFormat = name.parse().unwrap();
            assert_eq!(fmt.as_str(), name);
        }
        assert!("img".parse::<DiskFormat>().is_err());
    }
}
