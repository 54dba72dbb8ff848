//! Immutable snapshot of host capabilities.
//!
//! A [`HardwareFacts`] value is produced once per run by a hardware probe and
//! then only read. It is a plain value object so planning and checking can be
//! exercised with fabricated hosts.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Memory planned for when the host does not report it.
pub const ASSUMED_MEMORY_MB: u64 = 8 * 1024;

/// GPU vendor classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    /// No usable GPU detected.
    #[default]
    None,
    /// NVIDIA GPU with a working driver (`nvidia-smi` answered).
    Nvidia,
    /// Any other accelerator (AMD ROCm, Intel).
    Other,
}

/// GPU presence and vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpuInfo {
    pub present: bool,
    pub vendor: GpuVendor,
}

impl GpuInfo {
    /// No GPU.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            present: false,
            vendor: GpuVendor::None,
        }
    }

    /// A GPU of the given vendor.
    #[must_use]
    pub const fn from_vendor(vendor: GpuVendor) -> Self {
        Self {
            present: !matches!(vendor, GpuVendor::None),
            vendor,
        }
    }
}

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
}

impl OsFamily {
    /// The family this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        })
    }
}

/// Read-only snapshot of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareFacts {
    cpu_cores: u32,
    /// `None` when the memory query failed.
    total_memory_mb: Option<u64>,
    /// `None` when the disk query failed.
    free_disk_mb: Option<u64>,
    gpu: GpuInfo,
    os: OsFamily,
}

impl HardwareFacts {
    /// Build a snapshot, rejecting a zero core count.
    pub fn try_new(
        cpu_cores: u32,
        total_memory_mb: u64,
        free_disk_mb: Option<u64>,
        gpu: GpuInfo,
        os: OsFamily,
    ) -> Result<Self, DomainError> {
        if cpu_cores == 0 {
            return Err(DomainError::ZeroCores);
        }
        Ok(Self {
            cpu_cores,
            total_memory_mb: Some(total_memory_mb).filter(|&mb| mb > 0),
            free_disk_mb,
            gpu,
            os,
        })
    }

    /// Build a snapshot, clamping the core count to at least one.
    #[must_use]
    pub fn new(
        cpu_cores: u32,
        total_memory_mb: u64,
        free_disk_mb: Option<u64>,
        gpu: GpuInfo,
        os: OsFamily,
    ) -> Self {
        Self::detected(cpu_cores, Some(total_memory_mb), free_disk_mb, gpu, os)
    }

    /// Build a snapshot where memory may be unknown.
    #[must_use]
    pub fn detected(
        cpu_cores: u32,
        total_memory_mb: Option<u64>,
        free_disk_mb: Option<u64>,
        gpu: GpuInfo,
        os: OsFamily,
    ) -> Self {
        Self {
            cpu_cores: cpu_cores.max(1),
            total_memory_mb: total_memory_mb.filter(|&mb| mb > 0),
            free_disk_mb,
            gpu,
            os,
        }
    }

    #[must_use]
    pub const fn cpu_cores(&self) -> u32 {
        self.cpu_cores
    }

    /// Memory to plan with: the detected total, or [`ASSUMED_MEMORY_MB`].
    #[must_use]
    pub fn total_memory_mb(&self) -> u64 {
        self.total_memory_mb.unwrap_or(ASSUMED_MEMORY_MB)
    }

    /// Whether total memory was detected or configured.
    #[must_use]
    pub const fn memory_known(&self) -> bool {
        self.total_memory_mb.is_some()
    }

    /// Free disk space, or `None` if it could not be determined.
    #[must_use]
    pub const fn free_disk_mb(&self) -> Option<u64> {
        self.free_disk_mb
    }

    #[must_use]
    pub const fn gpu(&self) -> GpuInfo {
        self.gpu
    }

    #[must_use]
    pub const fn os(&self) -> OsFamily {
        self.os
    }

    /// Copy with selected fields replaced; used to apply configured overrides.
    #[must_use]
    pub fn with_overrides(
        self,
        cpu_cores: Option<u32>,
        total_memory_mb: Option<u64>,
        free_disk_mb: Option<u64>,
        gpu: Option<GpuVendor>,
    ) -> Self {
        Self {
            cpu_cores: cpu_cores.map_or(self.cpu_cores, |c| c.max(1)),
            total_memory_mb: total_memory_mb.or(self.total_memory_mb),
            free_disk_mb: free_disk_mb.or(self.free_disk_mb),
            gpu: gpu.map_or(self.gpu, GpuInfo::from_vendor),
            os: self.os,
        }
    }
}
