//! Bootable disk image construction.
//!
//! Builds a raw GPT block-device image with two partitions: a FAT32 EFI
//! System Partition carrying a UEFI loader at the default boot path, and an
//! ext4 root partition populated from layered `*.cpio.gz` archives. The raw
//! image can optionally be converted to another virtual-disk format.
//!
//! External tools (losetup, parted, mkfs.*, tune2fs, mount, cpio, qemu-img)
//! do the actual formatting; this crate owns the sequencing and the cleanup
//! obligations around the stateful OS resources it acquires:
//!
//! ```text
//! Allocate → Attach (loop) → Partition → Format → Install loader
//!         → Populate root layers → Detach → Convert (optional)
//! ```
//!
//! The loop device and every mount are scoped guards ([`disk::LoopDevice`],
//! [`disk::Mount`]): acquisition is paired with a release that runs on all
//! exit paths, in the exact reverse of acquisition order. Filesystem
//! identifiers are fixed constants so builds are reproducible.
//!
//! # Example
//!
//! ```rust,ignore
//! use bootdisk::{disk, Arch, DiskImageSpec};
//!
//! let spec = DiskImageSpec {
//!     image_path: "disk.img".into(),
//!     arch: Arch::X86_64,
//!     os_loader: "out/bzImage".into(),
//!     layers_dir: "ramfs-layers".into(),
//!     disk_size_mib: 512,
//!     efi_size_mib: 256,
//!     convert: None,
//! };
//! disk::build(&spec)?;
//! ```

pub mod disk;
pub mod error;
pub mod preflight;
pub mod process;
pub mod spec;

pub use error::BuildError;
pub use spec::{Arch, ConvertTarget, DiskFormat, DiskImageSpec};
