//! Host telemetry collection
//!
//! Periodically snapshots memory, disk, CPU, and load-average figures for the
//! worker host. The snapshot is stored on the worker and served read-only via
//! `GET /stats`; nothing in the scheduling core depends on it.

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// 1/5/15-minute load averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAvg {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Point-in-time host telemetry snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mem_total_kb: u64,
    pub mem_available_kb: u64,
    pub mem_used_kb: u64,
    pub mem_used_percent: f64,
    pub disk_total: u64,
    pub disk_free: u64,
    pub disk_used: u64,
    pub cpu_usage_percent: f64,
    pub load_avg: LoadAvg,
    /// Number of tasks in the worker database at collection time.
    pub task_count: usize,
}

/// Owns the sampling state between collections so CPU usage reflects the
/// delta since the previous tick rather than a cold reading.
pub struct StatsCollector {
    system: System,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Takes a fresh snapshot of the host, mirroring `task_count` from the
    /// caller.
    pub fn collect(&mut self, task_count: usize) -> Stats {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        let mem_total = self.system.total_memory();
        let mem_available = self.system.available_memory();
        let mem_used = self.system.used_memory();
        let mem_used_percent = if mem_total > 0 {
            mem_used as f64 / mem_total as f64 * 100.0
        } else {
            0.0
        };

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_free) = disks
            .list()
            .iter()
            .fold((0u64, 0u64), |(total, free), disk| {
                (total + disk.total_space(), free + disk.available_space())
            });

        let load = System::load_average();

        Stats {
            mem_total_kb: mem_total / 1024,
            mem_available_kb: mem_available / 1024,
            mem_used_kb: mem_used / 1024,
            mem_used_percent,
            disk_total,
            disk_free,
            disk_used: disk_total.saturating_sub(disk_free),
            cpu_usage_percent: self.system.global_cpu_info().cpu_usage() as f64,
            load_avg: LoadAvg {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            task_count,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
