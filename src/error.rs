//! Error taxonomy for the disk image build pipeline.
//!
//! Every fatal error aborts the remaining pipeline stages and triggers the
//! resource guards' reverse-order release. Release failures are reported as
//! warnings by the guards themselves and never mask the original error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building a disk image.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid build request, rejected before any resource is touched.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The destination image path already exists (no implicit overwrite).
    #[error("disk image already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Architecture value outside the supported set.
    #[error("unsupported architecture: {0} (expected: x86_64, arm64)")]
    UnsupportedArchitecture(String),

    /// Allocation, loop-attach, or mount failure.
    #[error("failed to acquire resource: {0}")]
    ResourceAcquisition(String),

    /// Partitioning, filesystem creation, or UUID-set failure.
    #[error("filesystem formatting failed: {0}")]
    Format(String),

    /// Layer archive decompression or unpack failure.
    #[error("layer extraction failed: {0}")]
    Extraction(String),

    /// Final format-conversion failure.
    #[error("image conversion failed: {0}")]
    Conversion(String),

    /// A release step (unmount, loop detach) failed. Guards downgrade this
    /// to a warning when another error is already propagating; the final
    /// detach on the success path keeps it fatal because the raw image must
    /// be closed before conversion.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
