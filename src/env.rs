//! Where a profiling run happened, stored beside its CSV.
//!
//! Timings from two runs are only comparable if they came from the same
//! machine, the same build of the driver and the same storage under the
//! engine's data directory, so all three are recorded.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Disks, System};

/// Snapshot taken when a profiling run finishes.
#[derive(Debug, Serialize)]
pub struct RunEnvironment {
    /// Collection time.
    pub collected_at: DateTime<Utc>,
    /// Host the driver ran on.
    pub machine: Machine,
    /// Filesystem holding the engine's data directory, if it exists.
    pub data_volume: Option<DataVolume>,
    /// The driver executable that produced the timings.
    pub executable: Option<Executable>,
    /// `git describe --always --dirty` of the working directory.
    pub revision: Option<String>,
}

/// CPU, memory and load of the host.
#[derive(Debug, Serialize)]
pub struct Machine {
    /// Host name.
    pub hostname: Option<String>,
    /// OS name and version.
    pub os: Option<String>,
    /// Kernel version.
    pub kernel: Option<String>,
    /// Brand string of the first CPU.
    pub cpu_brand: Option<String>,
    /// Frequency of the first CPU in MHz.
    pub cpu_mhz: Option<u64>,
    /// Logical CPUs.
    pub logical_cpus: usize,
    /// Installed memory in bytes.
    pub memory_bytes: u64,
    /// Memory available when the snapshot was taken, in bytes.
    pub available_memory_bytes: u64,
    /// One-minute load average; 0 where the platform has none.
    pub load_one: f64,
}

/// Mount that the engine writes its fragments to.
#[derive(Debug, Serialize)]
pub struct DataVolume {
    /// Canonical engine data directory.
    pub data_dir: PathBuf,
    /// Mount point containing it.
    pub mount_point: PathBuf,
    /// Filesystem type.
    pub filesystem: String,
    /// Free bytes on the mount.
    pub available_bytes: u64,
}

/// Identity of an executable on disk.
#[derive(Debug, Serialize)]
pub struct Executable {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modification time, if the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

impl RunEnvironment {
    /// Collects the snapshot for an engine rooted at `data_dir`.
    pub fn collect(data_dir: &Path) -> Self {
        Self {
            collected_at: Utc::now(),
            machine: Machine::collect(),
            data_volume: DataVolume::locate(data_dir),
            executable: env::current_exe().ok().and_then(|path| Executable::inspect(&path)),
            revision: git_revision(),
        }
    }
}

impl Machine {
    fn collect() -> Self {
        let sys = System::new_all();
        let first_cpu = sys.cpus().first();
        Self {
            hostname: System::host_name(),
            os: System::long_os_version(),
            kernel: System::kernel_version(),
            cpu_brand: first_cpu.map(|cpu| cpu.brand().to_string()),
            cpu_mhz: first_cpu.map(|cpu| cpu.frequency()),
            logical_cpus: sys.cpus().len().max(1),
            memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            load_one: System::load_average().one,
        }
    }
}

impl DataVolume {
    /// Longest mount point that contains `data_dir`.
    pub fn locate(data_dir: &Path) -> Option<Self> {
        let data_dir = data_dir.canonicalize().ok()?;
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|disk| data_dir.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())?;
        Some(Self {
            mount_point: disk.mount_point().to_path_buf(),
            filesystem: disk.file_system().to_string_lossy().into_owned(),
            available_bytes: disk.available_space(),
            data_dir,
        })
    }
}

impl Executable {
    /// Reads size and mtime of `path`; `None` if it cannot be stat'ed.
    pub fn inspect(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    Some(revision.trim().to_string()).filter(|r| !r.is_empty())
}
