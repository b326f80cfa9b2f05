//! CPU utilization from /proc/stat, measured over a sampling window.

use crate::error::{Error, Result};
use std::fs;
use std::time::Duration;

const PROC_STAT: &str = "/proc/stat";

/// Raw CPU time values from the aggregate line of /proc/stat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Guest time is already accounted in user and nice, so it is left out.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Read the aggregate CPU times.
pub fn read_cpu_times() -> Result<CpuTimes> {
    let content = fs::read_to_string(PROC_STAT).map_err(|source| Error::Sampling {
        path: PROC_STAT,
        source,
    })?;

    parse_cpu_times(&content)
}

/// Parse the `cpu ` line out of /proc/stat content.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or(Error::Malformed {
            path: PROC_STAT,
            reason: "no aggregate cpu line",
        })?;

    let parts: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|s| s.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::Malformed {
            path: PROC_STAT,
            reason: "non-numeric cpu field",
        })?;

    // user, nice, system, idle are present on every kernel we care about
    if parts.len() < 4 {
        return Err(Error::Malformed {
            path: PROC_STAT,
            reason: "too few cpu fields",
        });
    }

    Ok(CpuTimes {
        user: parts[0],
        nice: parts[1],
        system: parts[2],
        idle: parts[3],
        iowait: *parts.get(4).unwrap_or(&0),
        irq: *parts.get(5).unwrap_or(&0),
        softirq: *parts.get(6).unwrap_or(&0),
        steal: *parts.get(7).unwrap_or(&0),
    })
}

/// Busy percentage between two snapshots, in [0, 100].
pub fn utilization(prev: &CpuTimes, curr: &CpuTimes) -> f64 {
    let total_delta = curr.total().saturating_sub(prev.total());
    if total_delta == 0 {
        return 0.0;
    }

    let idle_delta = curr.idle_total().saturating_sub(prev.idle_total());
    let busy = 100.0 * (1.0 - (idle_delta as f64 / total_delta as f64));

    busy.clamp(0.0, 100.0)
}

/// Measure CPU utilization across `window`.
///
/// Suspends the caller for the whole window.
pub async fn sample(window: Duration) -> Result<f64> {
    let before = read_cpu_times()?;
    tokio::time::sleep(window).await;
    let after = read_cpu_times()?;

    Ok(utilization(&before, &after))
}
