//! Battery telemetry sources.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a sample could not be taken this tick.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The underlying sensor could not be read. Transient: the scheduler
    /// skips the tick and the next one retries.
    #[error("sensor unavailable: {0}")]
    Unavailable(#[from] io::Error),
}

/// One raw reading from the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryReading {
    /// Instantaneous current; >= 0 charging, < 0 discharging.
    pub current: i64,
    /// Instantaneous voltage.
    pub voltage: i64,
    /// Capacity percentage as reported, 0..=100.
    pub capacity_percent: i32,
}

/// Source of instantaneous battery readings.
///
/// Takes `&mut self` because real sources keep file handles or per-source
/// state between calls.
pub trait TelemetrySource: Send {
    fn sample(&mut self) -> Result<TelemetryReading, SensorError>;
}

/// Default sysfs power-supply directory on Linux.
pub const DEFAULT_POWER_SUPPLY_DIR: &str = "/sys/class/power_supply/battery";

/// Reads `current_now`, `voltage_now` and `capacity` under a sysfs
/// power-supply directory.
///
/// A file that cannot be read at all makes the whole sample unavailable. A
/// value that fails to parse, or a capacity outside the i32 range, degrades
/// to 0, so one flaky attribute from a kernel driver cannot stop recording.
pub struct SysfsTelemetrySource {
    base: PathBuf,
}

impl SysfsTelemetrySource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        SysfsTelemetrySource { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn read_attr(&self, name: &str) -> Result<i64, SensorError> {
        let text = std::fs::read_to_string(self.base.join(name))?;
        Ok(text.trim().parse().unwrap_or(0))
    }
}

impl TelemetrySource for SysfsTelemetrySource {
    fn sample(&mut self) -> Result<TelemetryReading, SensorError> {
        let current = self.read_attr("current_now")?;
        let voltage = self.read_attr("voltage_now")?;
        let capacity = self.read_attr("capacity")?;
        Ok(TelemetryReading {
            current,
            voltage,
            capacity_percent: i32::try_from(capacity).unwrap_or(0),
        })
    }
}
