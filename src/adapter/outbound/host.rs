//! Host hardware probe.
//!
//! Reads core count, memory, free disk under the install directory and the
//! GPU vendor. Every query degrades: a missing tool means no GPU, a failed
//! memory or disk query leaves that fact unknown.

use std::path::{Path, PathBuf};
use std::process::Command;

use sysinfo::{Disk, Disks, MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

use crate::domain::hardware::{GpuInfo, GpuVendor, HardwareFacts, OsFamily};
use crate::port::outbound::probe::HardwareProbe;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Probe for the machine the installer runs on.
#[derive(Debug, Clone)]
pub struct HostProbe {
    /// Directory whose filesystem receives the stack's volumes.
    disk_path: PathBuf,
}

impl HostProbe {
    #[must_use]
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HardwareProbe for HostProbe {
    fn detect(&self) -> HardwareFacts {
        let sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::new().with_ram()),
        );
        let cpu_cores = detect_cpu_cores();
        let total_memory_mb = Some(sys.total_memory() / BYTES_PER_MB).filter(|&mb| mb > 0);
        let free_disk_mb = detect_free_disk_mb(&self.disk_path);
        let gpu = detect_gpu();
        let os = OsFamily::current();

        debug!(
            cpu_cores,
            total_memory_mb = ?total_memory_mb,
            free_disk_mb = ?free_disk_mb,
            gpu = ?gpu.vendor,
            os = %os,
            "Host probed"
        );

        HardwareFacts::detected(cpu_cores, total_memory_mb, free_disk_mb, gpu, os)
    }
}

/// Logical cores, capped by a cgroup CPU quota when one is set.
fn detect_cpu_cores() -> u32 {
    u32::try_from(num_cpus::get()).unwrap_or(u32::MAX)
}

/// Space available to unprivileged users on the filesystem holding `path`.
fn detect_free_disk_mb(path: &Path) -> Option<u64> {
    let target = nearest_existing(path)?;
    let target = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let disk = containing_disk(disks.list(), &target)?;
    Some(disk.available_space() / BYTES_PER_MB)
}

/// The install directory may not exist yet; measure its closest ancestor.
fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.exists())
}

/// Disk with the longest mount point that contains `path`.
fn containing_disk<'a>(disks: &'a [Disk], path: &Path) -> Option<&'a Disk> {
    deepest_mount(disks.iter().map(Disk::mount_point), path)
        .and_then(|index| disks.get(index))
}

/// Index of the longest mount point that is an ancestor of `path`.
fn deepest_mount<'a>(mounts: impl Iterator<Item = &'a Path>, path: &Path) -> Option<usize> {
    mounts
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}

fn detect_gpu() -> GpuInfo {
    if nvidia_present() {
        return GpuInfo::from_vendor(GpuVendor::Nvidia);
    }
    if other_gpu_present() {
        return GpuInfo::from_vendor(GpuVendor::Other);
    }
    GpuInfo::absent()
}

fn nvidia_present() -> bool {
    run_quiet("nvidia-smi", &["--query-gpu=name", "--format=csv,noheader"])
        .is_some_and(|out| out.lines().any(|l| !l.trim().is_empty()))
}

/// AMD through ROCm, or a discrete-looking display controller on the PCI
/// bus. Device passthrough needs `/dev/dri` as well.
fn other_gpu_present() -> bool {
    if !Path::new("/dev/dri").exists() {
        return false;
    }
    if run_quiet("rocm-smi", &["--showid"]).is_some() {
        return true;
    }
    run_quiet("lspci", &[]).is_some_and(|out| lspci_has_accelerator(&out))
}

fn lspci_has_accelerator(output: &str) -> bool {
    output.lines().any(|line| {
        let lower = line.to_ascii_lowercase();
        (lower.contains("vga") || lower.contains("3d controller") || lower.contains("display"))
            && (lower.contains("amd") || lower.contains("ati ") || lower.contains("radeon"))
    })
}

/// Stdout of a successful command, `None` on any failure.
fn run_quiet(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
