//! Layered root filesystem population.
//!
//! Layers are gzip-compressed cpio archives, named with an architecture tag
//! or `noarch`. They are applied in lexicographic path order; a later layer
//! may overwrite files from an earlier one (last write wins), the same
//! overwrite semantics as container image layers.

use crate::disk::mount::Mount;
use crate::error::BuildError;
use crate::spec::Arch;
use anyhow::{bail, Context};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const LAYER_SUFFIX: &str = ".cpio.gz";

/// Discover the layer archives to apply, in application order.
///
/// Recursively collects `*.cpio.gz` files under `layers_dir`, keeps those
/// whose name contains `noarch` or the target architecture, and sorts them
/// by path. Deterministic for a given directory tree. A missing directory
/// yields an empty list; layers are optional.
pub fn discover_layers(layers_dir: &Path, arch: Arch) -> Vec<PathBuf> {
    if !layers_dir.is_dir() {
        return Vec::new();
    }

    let mut layers: Vec<PathBuf> = WalkDir::new(layers_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let name = match p.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => return false,
            };
            name.ends_with(LAYER_SUFFIX)
                && (name.contains("noarch") || name.contains(arch.as_str()))
        })
        .collect();
    layers.sort();
    layers
}

/// Mount the root partition and extract every matching layer into it.
///
/// No matching layers is non-fatal: the build produces an empty root
/// filesystem. An extraction failure aborts the build; the mount is
/// released regardless of outcome.
pub fn populate(root_device: &Path, layers_dir: &Path, arch: Arch) -> Result<(), BuildError> {
    let layers = discover_layers(layers_dir, arch);
    if layers.is_empty() {
        info!(
            "no layer archives for {} under '{}'; leaving root filesystem empty",
            arch,
            layers_dir.display()
        );
        return Ok(());
    }

    let mount = Mount::new(root_device, "root")?;

    let result = layers.iter().try_for_each(|layer| {
        info!("extracting layer '{}'", layer.display());
        extract_layer(layer, mount.path())
            .map_err(|err| BuildError::Extraction(format!("'{}': {:#}", layer.display(), err)))
    });

    if let Err(err) = mount.unmount() {
        warn!("cleanup: {}", err);
    }
    result
}

/// Unpack one gzip-compressed cpio archive into `dest`.
///
/// Streams the decompressed bytes into `cpio -idmu` running inside the
/// mounted tree, preserving paths, permissions, and ownership.
fn extract_layer(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("opening layer '{}'", archive.display()))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));

    let mut child = Command::new("cpio")
        .args(["-idmu", "--quiet"])
        .current_dir(dest)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .context("failed to run cpio")?;

    if let Some(mut stdin) = child.stdin.take() {
        io::copy(&mut decoder, &mut stdin)
            .with_context(|| format!("decompressing '{}'", archive.display()))?;
    }

    let status = child.wait().context("waiting for cpio")?;
    if !status.success() {
        bail!("cpio exited with {}", status);
    }
    debug!("layer '{}' extracted", archive.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_selection_and_ordering_for_arm64() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a-noarch.cpio.gz"));
        touch(&temp.path().join("b-x86_64.cpio.gz"));
        touch(&temp.path().join("b-arm64.cpio.gz"));

        let layers = discover_layers(temp.path(), Arch::Arm64);
        assert_eq!(
            layers,
            vec![
                temp.path().join("a-noarch.cpio.gz"),
                temp.path().join("b-arm64.cpio.gz"),
            ]
        );
    }

    #[test]
    fn test_discovery_is_recursive_and_sorted_by_path() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("sub/20-extra-noarch.cpio.gz"));
        touch(&temp.path().join("10-base-noarch.cpio.gz"));
        touch(&temp.path().join("sub/05-early-x86_64.cpio.gz"));

        let layers = discover_layers(temp.path(), Arch::X86_64);
        assert_eq!(
            layers,
            vec![
                temp.path().join("10-base-noarch.cpio.gz"),
                temp.path().join("sub/05-early-x86_64.cpio.gz"),
                temp.path().join("sub/20-extra-noarch.cpio.gz"),
            ]
        );
    }

    #[test]
    fn test_non_layer_files_ignored() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("readme-noarch.txt"));
        touch(&temp.path().join("layer-noarch.cpio"));
        touch(&temp.path().join("layer-noarch.cpio.gz"));

        let layers = discover_layers(temp.path(), Arch::X86_64);
        assert_eq!(layers, vec![temp.path().join("layer-noarch.cpio.gz")]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let layers = discover_layers(&temp.path().join("nope"), Arch::X86_64);
        assert!(layers.is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("c-noarch.cpio.gz"));
        touch(&temp.path().join("a-arm64.cpio.gz"));
        touch(&temp.path().join("b-noarch.cpio.gz"));

        let first = discover_layers(temp.path(), Arch::Arm64);
        let second = discover_layers(temp.path(), Arch::Arm64);
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_layer_into_directory() {
        if !crate::preflight::command_exists("cpio") {
            return;
        }
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        touch(&src.join("etc/hostname"));
        fs::write(src.join("etc/hostname"), b"bootdisk\n").unwrap();

        // Build a small cpio.gz the same way the layer tooling does.
        let archive = temp.path().join("layer-noarch.cpio.gz");
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!(
                "cd {} && find . -print0 | cpio --null -o -H newc 2>/dev/null | gzip > {}",
                src.display(),
                archive.display()
            ))
            .status()
            .unwrap();
        assert!(status.success());

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        extract_layer(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("etc/hostname")).unwrap(), b"bootdisk\n");
    }
}
