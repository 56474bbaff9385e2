//! Sampler thread: turns the configured interval into `Sample` commands.
//!
//! The sampler owns the telemetry source outright. Each tick it reads the
//! sensors, stamps the reading with the wall clock and the last-known
//! foreground package, and hands the finished record to the engine thread.
//! It never touches the buffer or the writer itself.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::warn;

use br_common::record::Record;

use crate::source::TelemetrySource;

use super::{EngineCommand, EngineShared};

/// Minimum spacing between sensor failure warnings. A detached battery
/// fails every tick; once per tick would drown the log.
const SENSOR_WARN_INTERVAL: Duration = Duration::from_secs(10);

pub(crate) struct Sampler {
    source: Box<dyn TelemetrySource>,
    shared: Arc<EngineShared>,
    commands: mpsc::Sender<EngineCommand>,
    last_sensor_warn: Option<Instant>,
}

impl Sampler {
    pub(crate) fn new(
        source: Box<dyn TelemetrySource>,
        shared: Arc<EngineShared>,
        commands: mpsc::Sender<EngineCommand>,
    ) -> Self {
        Sampler {
            source,
            shared,
            commands,
            last_sensor_warn: None,
        }
    }

    /// Tick until stopped. Exits when the stop signal fires or the engine
    /// side of the channel goes away.
    pub(crate) fn run(mut self) {
        loop {
            let interval = self.shared.interval();
            if !self.shared.await_next(interval) {
                return;
            }
            if let Some(record) = self.sample_once() {
                if self.commands.send(EngineCommand::Sample(record)).is_err() {
                    return;
                }
            }
        }
    }

    /// One tick: read the sensors and assemble a record.
    ///
    /// A failed read skips the tick; the schedule is unaffected and the
    /// failure is logged at most once per [`SENSOR_WARN_INTERVAL`].
    fn sample_once(&mut self) -> Option<Record> {
        let reading = match self.source.sample() {
            Ok(reading) => reading,
            Err(error) => {
                self.warn_sensor(&error);
                return None;
            }
        };
        Some(Record {
            timestamp_ms: Utc::now().timestamp_millis(),
            current: reading.current,
            voltage: reading.voltage,
            foreground_package: self.shared.foreground(),
            capacity_percent: reading.capacity_percent,
        })
    }

    fn warn_sensor(&mut self, error: &crate::source::SensorError) {
        let due = self
            .last_sensor_warn
            .map_or(true, |last| last.elapsed() >= SENSOR_WARN_INTERVAL);
        if due {
            warn!(%error, "telemetry read failed; skipping tick");
            self.last_sensor_warn = Some(Instant::now());
        }
    }
}
