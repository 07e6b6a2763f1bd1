//! CPU temperature, CPU load and RAM usage for the `get_info` command.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// One telemetry reading, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub cpu_temp: String,
    pub cpu_percent: String,
    pub ram_percent: String,
}

impl SystemInfo {
    /// `[cpuTemp, cpuPercent, ramPercent]`, the shape clients expect.
    pub fn to_list(&self) -> Vec<String> {
        vec![
            self.cpu_temp.clone(),
            self.cpu_percent.clone(),
            self.ram_percent.clone(),
        ]
    }
}

/// Source of [`SystemInfo`].
pub trait Telemetry: Send + Sync {
    fn read(&self) -> Result<SystemInfo>;
}

/// Always returns the same reading.
#[derive(Debug, Clone)]
pub struct FixedTelemetry(pub SystemInfo);

impl Telemetry for FixedTelemetry {
    fn read(&self) -> Result<SystemInfo> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

/// Reads sysfs and procfs on Linux.
pub struct SystemTelemetry {
    temp_path: PathBuf,
    stat_path: PathBuf,
    meminfo_path: PathBuf,
    last_cpu: Mutex<Option<CpuTimes>>,
}

impl Default for SystemTelemetry {
    fn default() -> Self {
        Self::with_paths(
            "/sys/class/thermal/thermal_zone0/temp",
            "/proc/stat",
            "/proc/meminfo",
        )
    }
}

impl SystemTelemetry {
    pub fn with_paths(
        temp_path: impl Into<PathBuf>,
        stat_path: impl Into<PathBuf>,
        meminfo_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            temp_path: temp_path.into(),
            stat_path: stat_path.into(),
            meminfo_path: meminfo_path.into(),
            last_cpu: Mutex::new(None),
        }
    }

    /// CPU temperature in °C, rounded to 0.1.
    pub fn cpu_temp(&self) -> Result<f64> {
        let content = read(&self.temp_path)?;
        let last = content.lines().last().unwrap_or("0").trim();
        let millis: f64 = last
            .parse()
            .map_err(|_| CoreError::Telemetry(format!("bad temperature value '{}'", last)))?;
        Ok(round1(millis / 1000.0))
    }

    /// CPU utilisation since the previous call (since boot on the first call).
    pub fn cpu_percent(&self) -> Result<f64> {
        let now = parse_cpu_times(&read(&self.stat_path)?)?;
        let mut last = self.last_cpu.lock().unwrap();
        let (busy, total) = match *last {
            Some(prev) if now.total > prev.total => {
                (now.busy.saturating_sub(prev.busy), now.total - prev.total)
            }
            _ => (now.busy, now.total),
        };
        *last = Some(now);
        if total == 0 {
            return Ok(0.0);
        }
        Ok(round1(busy as f64 * 100.0 / total as f64))
    }

    /// Share of RAM in use.
    pub fn ram_percent(&self) -> Result<f64> {
        let content = read(&self.meminfo_path)?;
        let field = |name: &str| -> Result<f64> {
            content
                .lines()
                .find_map(|line| line.strip_prefix(name))
                .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
                .and_then(|value| value.parse::<f64>().ok())
                .ok_or_else(|| CoreError::Telemetry(format!("{} missing from meminfo", name)))
        };
        let total = field("MemTotal")?;
        let available = field("MemAvailable")?;
        if total <= 0.0 {
            return Err(CoreError::Telemetry("MemTotal is zero".to_string()));
        }
        Ok(round1((total - available) * 100.0 / total))
    }
}

impl Telemetry for SystemTelemetry {
    fn read(&self) -> Result<SystemInfo> {
        let info = SystemInfo {
            cpu_temp: format!("{:.1}", self.cpu_temp()?),
            cpu_percent: format!("{:.1}", self.cpu_percent()?),
            ram_percent: format!("{:.1}", self.ram_percent()?),
        };
        trace!(target: "rasptank::telemetry", "{:?}", info);
        Ok(info)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CoreError::Telemetry(format!("{}: {}", path.display(), e)))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// user nice system idle iowait irq softirq steal; guest time is already in user.
fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| CoreError::Telemetry("no aggregate cpu line in stat".to_string()))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| CoreError::Telemetry(format!("bad cpu line: {}", e)))?;
    if fields.len() < 4 {
        return Err(CoreError::Telemetry("short cpu line in stat".to_string()));
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total - idle,
        total,
    })
}
