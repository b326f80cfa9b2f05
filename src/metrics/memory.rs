//! Physical memory utilization from /proc/meminfo.

use crate::error::{Error, Result};
use std::fs;

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Memory figures in bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
}

impl MemoryUsage {
    /// Used memory percentage, in [0, 100]
    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let used = self.total.saturating_sub(self.available);
        (100.0 * used as f64 / self.total as f64).clamp(0.0, 100.0)
    }
}

pub fn read_memory_usage() -> Result<MemoryUsage> {
    let meminfo = fs::read_to_string(PROC_MEMINFO).map_err(|source| Error::Sampling {
        path: PROC_MEMINFO,
        source,
    })?;

    parse_meminfo(&meminfo)
}

pub fn parse_meminfo(meminfo: &str) -> Result<MemoryUsage> {
    let mut total: Option<u64> = None;
    let mut available: Option<u64> = None;
    let mut free: u64 = 0;
    let mut buffers: u64 = 0;
    let mut cached: u64 = 0;

    for line in meminfo.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let kb: u64 = match parts[1].parse() {
            Ok(kb) => kb,
            Err(_) => continue,
        };
        let value = kb.checked_mul(1024).ok_or(Error::Malformed {
            path: PROC_MEMINFO,
            reason: "value out of range",
        })?;

        match parts[0] {
            "MemTotal:" => total = Some(value),
            "MemAvailable:" => available = Some(value),
            "MemFree:" => free = value,
            "Buffers:" => buffers = value,
            "Cached:" => cached = value,
            _ => {}
        }
    }

    let total = match total {
        Some(total) if total > 0 => total,
        _ => {
            return Err(Error::Malformed {
                path: PROC_MEMINFO,
                reason: "MemTotal missing or zero",
            })
        }
    };

    // Pre-3.14 kernels have no MemAvailable
    let available = match available {
        Some(available) => available,
        None => free
            .checked_add(buffers)
            .and_then(|sum| sum.checked_add(cached))
            .ok_or(Error::Malformed {
                path: PROC_MEMINFO,
                reason: "value out of range",
            })?,
    };

    Ok(MemoryUsage { total, available })
}

/// Current used memory percentage. Does not block.
pub fn sample() -> Result<f64> {
    Ok(read_memory_usage()?.used_percent())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16000000 kB
MemFree:         2000000 kB
MemAvailable:    8480000 kB
Buffers:          500000 kB
Cached:          4000000 kB
SwapTotal:       2000000 kB
HugePages_Total:       0
";

    #[test]
    fn used_percent_from_available() {
        let usage = parse_meminfo(MEMINFO).unwrap();

        assert_eq!(usage.total, 16_000_000 * 1024);
        assert_eq!(usage.available, 8_480_000 * 1024);
        assert!((usage.used_percent() - 47.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_without_mem_available() {
        let meminfo = "\
MemTotal:       1000 kB
MemFree:         200 kB
Buffers:         100 kB
Cached:          200 kB
";
        let usage = parse_meminfo(meminfo).unwrap();

        assert_eq!(usage.available, 500 * 1024);
        assert_eq!(usage.used_percent(), 50.0);
    }

    #[test]
    fn missing_total_is_malformed() {
        assert!(matches!(
            parse_meminfo("MemFree: 10 kB\n"),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            parse_meminfo("MemTotal: 0 kB\n"),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn oversized_values_are_malformed() {
        let meminfo = format!("MemTotal: {} kB\n", u64::MAX / 2);
        assert!(matches!(
            parse_meminfo(&meminfo),
            Err(Error::Malformed { .. })
        ));

        let near_max = u64::MAX / 1024;
        let meminfo = format!(
            "MemTotal: 1000 kB\nMemFree: {near_max} kB\nBuffers: {near_max} kB\nCached: 0 kB\n"
        );
        assert!(matches!(
            parse_meminfo(&meminfo),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn available_above_total_reads_as_idle() {
        let usage = MemoryUsage {
            total: 100,
            available: 150,
        };
        assert_eq!(usage.used_percent(), 0.0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn samples_live_host() {
        let used = sample().unwrap();
        assert!(used > 0.0 && used <= 100.0);
    }
}
