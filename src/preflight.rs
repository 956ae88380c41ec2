//! Preflight checks for build validation.
//!
//! Validates that the host system has required tools before building.
//! This prevents cryptic errors after the loop device is already attached.

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools the disk build pipeline invokes.
///
/// Each tuple is (command_name, package_name).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("losetup", "util-linux"),
    ("parted", "parted"),
    ("mkfs.fat", "dosfstools"),
    ("mkfs.ext4", "e2fsprogs"),
    ("tune2fs", "e2fsprogs"),
    ("mount", "util-linux"),
    ("umount", "util-linux"),
    ("cpio", "cpio"),
];

/// Tools needed only when a format conversion is requested.
pub const CONVERT_TOOLS: &[(&str, &str)] = &[("qemu-img", "qemu-img")];

/// Check that specific tools are available.
///
/// Returns an error listing every missing tool and its package.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check all tools the build needs; includes the conversion tools only
/// when a conversion target was requested.
pub fn check_host_tools(with_convert: bool) -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)?;
    if with_convert {
        check_required_tools(CONVERT_TOOLS)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        // 'ls' should exist on any Unix system
        assert!(command_exists("ls"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_failure() {
        let tools = &[("nonexistent_command_xyz", "fake-package")];
        let err = check_required_tools(tools).unwrap_err();
        assert!(err.to_string().contains("fake-package"));
    }

    #[test]
    fn test_required_tools_list() {
        assert!(!REQUIRED_TOOLS.is_empty());
        for (tool, package) in REQUIRED_TOOLS {
            assert!(!tool.is_empty());
            assert!(!package.is_empty());
        }
    }
}
