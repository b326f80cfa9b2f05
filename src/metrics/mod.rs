//! Host metrics sampling.

pub mod cpu;
pub mod memory;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host name reported when `HOSTNAME` is unset or empty
pub const DEFAULT_HOSTNAME: &str = "default-hostname";

/// One CPU and memory utilization reading, both percentages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub cpu_percent: f64,
    pub ram_percent: f64,
}

/// The record published every cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub hostname: String,
    pub cpu_percent: f64,
    pub ram_percent: f64,
}

impl MetricsRecord {
    pub fn new(hostname: impl Into<String>, reading: Reading) -> Self {
        Self {
            hostname: hostname.into(),
            cpu_percent: reading.cpu_percent,
            ram_percent: reading.ram_percent,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Source of utilization readings.
#[async_trait]
pub trait MetricsSource: Send {
    async fn sample(&mut self) -> Result<Reading>;
}

/// Reads the local host through /proc.
///
/// Keeps no state between samples: each CPU reading brackets its own window.
pub struct SystemSampler {
    window: Duration,
}

impl SystemSampler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

#[async_trait]
impl MetricsSource for SystemSampler {
    async fn sample(&mut self) -> Result<Reading> {
        let cpu_percent = cpu::sample(self.window).await?;
        let ram_percent = memory::sample()?;

        Ok(Reading {
            cpu_percent: round_tenth(cpu_percent),
            ram_percent: round_tenth(ram_percent),
        })
    }
}

/// Resolve the host name from the `HOSTNAME` environment variable.
pub fn resolve_hostname() -> String {
    hostname_or_default(std::env::var("HOSTNAME").ok())
}

pub fn hostname_or_default(value: Option<String>) -> String {
    match value {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_HOSTNAME.to_string(),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_matches_published_shape() {
        let record = MetricsRecord::new(
            "test-host",
            Reading {
                cpu_percent: 12.5,
                ram_percent: 47.0,
            },
        );

        let payload: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(
            payload,
            json!({"hostname": "test-host", "cpu_percent": 12.5, "ram_percent": 47.0})
        );
        assert_eq!(payload.as_object().unwrap().len(), 3);
    }

    #[test]
    fn payload_round_trips() {
        for (cpu, ram) in [(0.0, 100.0), (33.3, 0.1), (100.0, 64.7)] {
            let record = MetricsRecord::new(
                "box",
                Reading {
                    cpu_percent: cpu,
                    ram_percent: ram,
                },
            );

            let decoded: MetricsRecord = serde_json::from_str(&record.to_json().unwrap()).unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn hostname_fallback() {
        assert_eq!(hostname_or_default(None), DEFAULT_HOSTNAME);
        assert_eq!(hostname_or_default(Some(String::new())), DEFAULT_HOSTNAME);
        assert_eq!(hostname_or_default(Some("X".to_string())), "X");
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_tenth(12.54), 12.5);
        assert_eq!(round_tenth(12.56), 12.6);
        assert_eq!(round_tenth(100.0), 100.0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn repeated_samples_stay_in_range() {
        let mut sampler = SystemSampler::new(Duration::from_millis(20));

        for _ in 0..3 {
            let reading = sampler.sample().await.unwrap();
            assert!((0.0..=100.0).contains(&reading.cpu_percent));
            assert!((0.0..=100.0).contains(&reading.ram_percent));
        }
    }
}
