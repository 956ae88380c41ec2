//! CLI for building bootable EFI disk images.

use anyhow::Result;
use bootdisk::disk::bootloader::find_os_loader;
use bootdisk::{disk, Arch, ConvertTarget, DiskFormat, DiskImageSpec};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Create a disk image with an EFI partition (FAT32) and an ext4 root
/// partition populated from layer archives. Optionally convert the raw
/// image to another disk format.
#[derive(Parser, Debug)]
#[command(name = "bootdisk", version)]
struct Cli {
    /// Path for the new raw disk image file (e.g. /path/to/disk.img)
    image_path: PathBuf,

    /// Architecture of the OS loader (x86_64 or arm64)
    arch: String,

    /// Path to the OS loader EFI file; searched under --loader-dir when omitted
    #[arg(long)]
    os_loader: Option<PathBuf>,

    /// Directory searched for the kernel image when --os-loader is omitted
    #[arg(long, default_value = "out")]
    loader_dir: PathBuf,

    /// Directory with *.cpio.gz layer archives for the root filesystem
    #[arg(long, default_value = "ramfs-layers")]
    layers_dir: PathBuf,

    /// Total disk image size in MiB
    #[arg(long, default_value_t = 512)]
    disk_size: u64,

    /// EFI partition size in MiB
    #[arg(long, default_value_t = 256)]
    efi_size: u64,

    /// Path for the converted disk image file (enables conversion)
    #[arg(long)]
    target_image: Option<PathBuf>,

    /// Target disk format for conversion
    #[arg(long, default_value = "vhdx")]
    target_format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Concise message by default; the full context chain under -v.
            // The partially built image is left on disk for inspection.
            if cli.verbose {
                error!("an error occurred: {:?}", err);
            } else {
                error!("an error occurred: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let arch: Arch = cli.arch.parse()?;

    let os_loader = match &cli.os_loader {
        Some(path) => path.clone(),
        None => find_os_loader(&cli.loader_dir, arch)?,
    };

    let convert = match &cli.target_image {
        Some(target) => {
            let format: DiskFormat = cli.target_format.parse()?;
            Some(ConvertTarget {
                path: target.clone(),
                format,
            })
        }
        None => None,
    };

    let spec = DiskImageSpec {
        image_path: cli.image_path.clone(),
        arch,
        os_loader,
        layers_dir: cli.layers_dir.clone(),
        disk_size_mib: cli.disk_size,
        efi_size_mib: cli.efi_size,
        convert,
    };

    disk::build(&spec)?;
    Ok(())
}
