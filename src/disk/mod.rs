//! The disk image build pipeline.
//!
//! Strictly sequential: Allocate → Attach → Partition → Format → Install
//! Boot Payload → Populate Root → Detach → Convert. Each stage runs only if
//! all prior stages succeeded. The loop device and any mount are scoped
//! guards, so a failure anywhere unwinds the acquired resources in reverse
//! order; guard release failures are logged as warnings and never mask the
//! stage error.

pub mod allocate;
pub mod bootloader;
pub mod convert;
pub mod format;
pub mod layers;
pub mod loopdev;
pub mod mount;
pub mod partition;
pub mod plan;

pub use loopdev::LoopDevice;
pub use mount::Mount;
pub use plan::PartitionLayout;

use crate::error::BuildError;
use crate::preflight;
use crate::spec::DiskImageSpec;
use tracing::info;

/// Build a bootable raw disk image (and optionally convert it).
///
/// On failure the partially built image file is left on disk for
/// postmortem inspection; only the loop device and mounts are released.
pub fn build(spec: &DiskImageSpec) -> Result<(), BuildError> {
    spec.validate()?;
    let layout = PartitionLayout::plan(spec.disk_size_mib, spec.efi_size_mib)?;

    preflight::check_host_tools(spec.convert.is_some())
        .map_err(|err| BuildError::Configuration(format!("{:#}", err)))?;

    allocate::create_image_file(&spec.image_path, layout.disk_size_bytes())?;
    let loop_dev = LoopDevice::attach(&spec.image_path)?;

    partition::apply(loop_dev.path(), &layout)?;
    loop_dev.wait_for_partitions(2)?;

    let efi_part = loop_dev.partition(1);
    let root_part = loop_dev.partition(2);

    format::format_efi(&efi_part)?;
    format::format_root(&root_part)?;

    bootloader::install(&efi_part, &spec.os_loader, spec.arch)?;
    layers::populate(&root_part, &spec.layers_dir, spec.arch)?;

    // The image must be closed everywhere before conversion reads it.
    loop_dev.detach()?;

    info!(
        "EFI boot disk image created successfully at '{}'",
        spec.image_path.display()
    );

    if let Some(target) = &spec.convert {
        convert::convert(&spec.image_path, &target.path, target.format)?;
        info!("converted image available at '{}'", target.path.display());
    }

    Ok(())
}
