//! Backing image file allocation.

use crate::error::BuildError;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Create the raw backing file with the exact requested logical size.
///
/// The file is sparse; only the logical size matters because the formatting
/// tools validate against the reported size. Refuses to overwrite an
/// existing file, race-free via `create_new`.
pub fn create_image_file(path: &Path, size_bytes: u64) -> Result<(), BuildError> {
    info!(
        "creating raw disk image '{}' of {} MiB",
        path.display(),
        size_bytes / (1024 * 1024)
    );

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| match err.kind() {
            ErrorKind::AlreadyExists => BuildError::AlreadyExists(path.to_path_buf()),
            _ => BuildError::ResourceAcquisition(format!(
                "creating image file '{}': {}",
                path.display(),
                err
            )),
        })?;

    file.set_len(size_bytes).map_err(|err| {
        BuildError::ResourceAcquisition(format!(
            "sizing image file '{}' to {} bytes: {}",
            path.display(),
            size_bytes,
            err
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_creates_file_with_exact_logical_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("disk.img");
        create_image_file(&path, 512 * 1024 * 1024).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 512 * 1024 * 1024);
    }

    #[test]
    fn test_existing_path_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("disk.img");
        fs::write(&path, b"old data").unwrap();

        let err = create_image_file(&path, 1024).unwrap_err();
        assert!(matches!(err, BuildError::AlreadyExists(_)));
        // The existing file is untouched.
        assert_eq!(fs::read(&path).unwrap(), b"old data");
    }

    #[test]
    fn test_missing_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("no/such/dir/disk.img");
        let err = create_image_file(&path, 1024).unwrap_err();
        assert!(matches!(err, BuildError::ResourceAcquisition(_)));
    }
}
