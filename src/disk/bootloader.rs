//! Boot payload installation into the EFI System Partition.

use crate::disk::mount::Mount;
use crate::error::BuildError;
use crate::spec::Arch;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// UEFI-mandated default-boot directory inside the ESP.
const DEFAULT_BOOT_DIR: &str = "EFI/Boot";

/// Mount the EFI partition and copy the loader to the architecture's
/// default boot filename (`EFI/Boot/BOOTX64.EFI` or `BOOTAA64.EFI`).
///
/// The mount is released before returning, on success and on error.
pub fn install(efi_device: &Path, os_loader: &Path, arch: Arch) -> Result<(), BuildError> {
    let mount = Mount::new(efi_device, "efi")?;

    let boot_dir = mount.path().join(DEFAULT_BOOT_DIR);
    fs::create_dir_all(&boot_dir)?;

    let dest = boot_dir.join(arch.loader_filename());
    info!(
        "installing OS loader '{}' as '{}'",
        os_loader.display(),
        dest.display()
    );
    fs::copy(os_loader, &dest)?;

    if let Err(err) = mount.unmount() {
        warn!("cleanup: {}", err);
    }
    Ok(())
}

/// Search `root` recursively for the architecture's kernel image.
///
/// Used when the caller did not name a loader explicitly. Exactly one match
/// is required: none means the kernel was never built, more than one is
/// ambiguous and the caller must pick.
pub fn find_os_loader(root: &Path, arch: Arch) -> Result<PathBuf, BuildError> {
    let wanted = arch.kernel_image_name();
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == wanted)
        .map(|e| e.into_path())
        .collect();
    found.sort();

    match found.len() {
        0 => Err(BuildError::Configuration(format!(
            "OS loader '{}' not found under '{}'; build the kernel first or pass --os-loader",
            wanted,
            root.display()
        ))),
        1 => Ok(found.remove(0)),
        _ => Err(BuildError::Configuration(format!(
            "multiple OS loaders found for {}: {}; pick one with --os-loader",
            arch,
            found
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_os_loader_single_match() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("out/x86_64/boot")).unwrap();
        fs::write(temp.path().join("out/x86_64/boot/bzImage"), b"k").unwrap();
        // An arm64 image in the same tree must not match.
        fs::write(temp.path().join("out/Image"), b"k").unwrap();

        let loader = find_os_loader(temp.path(), Arch::X86_64).unwrap();
        assert_eq!(loader, temp.path().join("out/x86_64/boot/bzImage"));
    }

    #[test]
    fn test_find_os_loader_missing() {
        let temp = TempDir::new().unwrap();
        let err = find_os_loader(temp.path(), Arch::Arm64).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }

    #[test]
    fn test_find_os_loader_ambiguous() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("a/Image"), b"k").unwrap();
        fs::write(temp.path().join("b/Image"), b"k").unwrap();

        let err = find_os_loader(temp.path(), Arch::Arm64).unwrap_err();
        assert!(err.to_string().contains("multiple OS loaders"));
    }
}
