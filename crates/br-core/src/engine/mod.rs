//! The recorder engine: a single-owner actor plus its control surface.
//!
//! One dedicated engine thread exclusively owns the batch buffer, the
//! segmented writer, the config provider and the foreground tracker
//! registration. Everything that mutates them arrives as a command over an
//! mpsc channel: samples from the sampler thread, foreground changes from
//! platform notifiers, and synchronous control operations from
//! [`RecorderHandle`] carrying one-shot reply channels. No lock is ever
//! held around buffer or writer state.
//!
//! A second dedicated thread runs the [`sampler`], which owns the telemetry
//! source and turns the sampling interval into `Sample` commands.

pub(crate) mod sampler;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use br_common::record::Record;
use br_config::{ConfigError, ConfigProvider, DefaultConfigProvider, RecorderConfig};
use br_storage::{BatchBuffer, NoopOwnership, OwnershipHandler, SegmentedWriter, StorageError};

use crate::foreground::{ForegroundEvents, ForegroundTracker, NullForegroundTracker};
use crate::source::TelemetrySource;

use self::sampler::Sampler;

/// Commands processed by the engine thread.
pub(crate) enum EngineCommand {
    /// A sampled record from the sampler thread.
    Sample(Record),
    /// The platform reported a new foreground application.
    ForegroundChanged(String),
    /// Reload configuration from the provider and apply it wholesale.
    Reconfigure(mpsc::Sender<Result<RecorderConfig, ConfigError>>),
    /// Flush whatever is buffered right now.
    ForceFlush(mpsc::Sender<Result<(), StorageError>>),
    /// Final flush, close storage, release listeners, exit the loop.
    Stop(mpsc::Sender<Result<(), StorageError>>),
}

/// State shared between the engine thread, the sampler thread and the
/// control handle.
pub(crate) struct EngineShared {
    /// Current sampling period. Re-read by the sampler at every scheduling
    /// decision, so a reconfigure applies without a restart.
    interval_millis: AtomicU64,
    /// Last-known foreground package. Written only by the engine thread,
    /// read by the sampler when it stamps a record.
    foreground: Mutex<Option<String>>,
    /// Stop flag, paired with the condvar so a pending sampler wait can be
    /// cancelled instead of running one last tick.
    stopped: Mutex<bool>,
    stop_signal: Condvar,
}

impl EngineShared {
    pub(crate) fn new(interval_millis: u64) -> Self {
        EngineShared {
            interval_millis: AtomicU64::new(interval_millis),
            foreground: Mutex::new(None),
            stopped: Mutex::new(false),
            stop_signal: Condvar::new(),
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis.load(Ordering::Relaxed))
    }

    fn set_interval_millis(&self, millis: u64) {
        self.interval_millis.store(millis, Ordering::Relaxed);
    }

    pub(crate) fn foreground(&self) -> Option<String> {
        self.foreground.lock().unwrap().clone()
    }

    fn set_foreground(&self, package: String) {
        *self.foreground.lock().unwrap() = Some(package);
    }

    /// Cancel any pending sampler wait and prevent further ticks.
    pub(crate) fn signal_stop(&self) {
        let mut stopped = self.stopped.lock().unwrap();
        *stopped = true;
        self.stop_signal.notify_all();
    }

    /// Sleep until the next tick is due or a stop arrives.
    ///
    /// Returns `true` when the tick should run, `false` when stopping. The
    /// deadline is measured from now, so tick duration pushes the schedule
    /// back instead of producing catch-up bursts.
    pub(crate) fn await_next(&self, interval: Duration) -> bool {
        let deadline = Instant::now().checked_add(interval);
        let mut stopped = self.stopped.lock().unwrap();
        loop {
            if *stopped {
                return false;
            }
            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) if now >= deadline => return true,
                Some(deadline) => deadline - now,
                // An interval too large to represent: only stop wakes us.
                None => Duration::from_secs(3600),
            };
            let (guard, _) = self
                .stop_signal
                .wait_timeout(stopped, remaining)
                .unwrap();
            stopped = guard;
        }
    }
}

/// The actor state owned exclusively by the engine thread.
pub(crate) struct EngineCore {
    buffer: BatchBuffer,
    writer: SegmentedWriter,
    provider: Box<dyn ConfigProvider + Send>,
    tracker: Box<dyn ForegroundTracker>,
    shared: Arc<EngineShared>,
    self_package: Option<String>,
    on_self_surfaced: Option<Box<dyn FnMut() + Send>>,
    flush_after: Duration,
    /// Armed while the buffer is non-empty; reaching it flushes records
    /// that would otherwise sit below the batch threshold indefinitely.
    flush_deadline: Option<Instant>,
}

impl EngineCore {
    pub(crate) fn handle_sample(&mut self, record: Record) {
        self.buffer.insert(record);
        if self.buffer.should_flush() {
            // Failure keeps records buffered; the next trigger retries.
            let _ = self.flush();
        } else if self.flush_deadline.is_none() {
            self.flush_deadline = Some(Instant::now() + self.flush_after);
        }
    }

    pub(crate) fn handle_foreground(&mut self, package: String) {
        if self.self_package.as_deref() == Some(package.as_str()) {
            debug!("own package surfaced");
            if let Some(hook) = self.on_self_surfaced.as_mut() {
                hook();
            }
        }
        self.shared.set_foreground(package);
    }

    /// Reload from the provider and apply the result wholesale.
    ///
    /// On a load failure nothing is touched: interval, batch size and flush
    /// deadline all keep their previously applied values.
    pub(crate) fn handle_reconfigure(&mut self) -> Result<RecorderConfig, ConfigError> {
        let config = self.provider.load()?;
        self.apply_config(&config);
        info!(
            interval_millis = config.interval_millis,
            batch_size = config.batch_size,
            flush_after_millis = config.flush_after_millis,
            "configuration applied"
        );
        Ok(config)
    }

    fn apply_config(&mut self, config: &RecorderConfig) {
        self.buffer.set_batch_size(config.batch_size);
        self.shared.set_interval_millis(config.interval_millis);
        self.flush_after = Duration::from_millis(config.flush_after_millis);
    }

    /// Flush buffered records, clearing or rearming the deadline.
    pub(crate) fn flush(&mut self) -> Result<(), StorageError> {
        match self.buffer.flush(&mut self.writer) {
            Ok(flushed) => {
                if flushed > 0 {
                    debug!(records = flushed, "flushed batch");
                }
                self.flush_deadline = None;
                Ok(())
            }
            Err(error) => {
                warn!(
                    buffered = self.buffer.len(),
                    %error,
                    "flush failed; keeping records buffered"
                );
                self.flush_deadline = Some(Instant::now() + self.flush_after);
                Err(error)
            }
        }
    }

    /// Orderly shutdown: final flush, close storage, release the tracker.
    ///
    /// Every step runs regardless of earlier failures; the first error is
    /// what gets reported.
    pub(crate) fn shutdown(&mut self) -> Result<(), StorageError> {
        self.shared.signal_stop();
        let flush_result = self.buffer.flush(&mut self.writer).map(|_| ());
        if let Err(error) = &flush_result {
            warn!(
                buffered = self.buffer.len(),
                %error,
                "final flush failed; buffered records were lost"
            );
        }
        let close_result = self.writer.close();
        self.tracker.unregister();
        info!("recorder stopped");
        flush_result.and(close_result)
    }
}

/// Command loop run by the engine thread.
pub(crate) fn run_engine(mut core: EngineCore, commands: mpsc::Receiver<EngineCommand>) {
    loop {
        let received = match core.flush_deadline {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match commands.recv_timeout(timeout) {
                    Ok(command) => Some(command),
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        // The buffer aged past its flush deadline.
                        let _ = core.flush();
                        continue;
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => None,
                }
            }
            None => commands.recv().ok(),
        };

        match received {
            Some(EngineCommand::Sample(record)) => core.handle_sample(record),
            Some(EngineCommand::ForegroundChanged(package)) => core.handle_foreground(package),
            Some(EngineCommand::Reconfigure(reply)) => {
                let _ = reply.send(core.handle_reconfigure());
            }
            Some(EngineCommand::ForceFlush(reply)) => {
                let _ = reply.send(core.flush());
            }
            Some(EngineCommand::Stop(reply)) => {
                let _ = reply.send(core.shutdown());
                return;
            }
            None => {
                // Every sender is gone without a Stop; shut down anyway.
                let _ = core.shutdown();
                return;
            }
        }
    }
}

/// Failures surfaced by the control operations on [`RecorderHandle`].
#[derive(Error, Debug)]
pub enum ControlError {
    /// The engine thread is no longer running.
    #[error("recorder is not running")]
    Disconnected,

    /// Reconfigure could not load the config source; the previous
    /// configuration stays active.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A flush or shutdown hit storage trouble.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Builds and launches a recorder engine.
///
/// Only the storage directory and the telemetry source are mandatory;
/// everything else defaults to inert implementations so a headless
/// deployment is one call.
pub struct RecorderBuilder {
    data_dir: PathBuf,
    source: Box<dyn TelemetrySource>,
    provider: Box<dyn ConfigProvider + Send>,
    tracker: Box<dyn ForegroundTracker>,
    ownership: Box<dyn OwnershipHandler>,
    self_package: Option<String>,
    on_self_surfaced: Option<Box<dyn FnMut() + Send>>,
}

impl RecorderBuilder {
    pub fn new(data_dir: impl Into<PathBuf>, source: Box<dyn TelemetrySource>) -> Self {
        RecorderBuilder {
            data_dir: data_dir.into(),
            source,
            provider: Box::new(DefaultConfigProvider),
            tracker: Box::new(NullForegroundTracker),
            ownership: Box::new(NoopOwnership),
            self_package: None,
            on_self_surfaced: None,
        }
    }

    /// Configuration source re-read on every reconfigure command.
    pub fn with_config_provider(mut self, provider: Box<dyn ConfigProvider + Send>) -> Self {
        self.provider = provider;
        self
    }

    /// Platform integration reporting foreground changes.
    pub fn with_foreground_tracker(mut self, tracker: Box<dyn ForegroundTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Ownership adjustment applied to created storage paths.
    pub fn with_ownership(mut self, ownership: Box<dyn OwnershipHandler>) -> Self {
        self.ownership = ownership;
        self
    }

    /// Identify our own package and the hook to invoke when it surfaces.
    pub fn with_self_package(
        mut self,
        package: impl Into<String>,
        on_surfaced: Box<dyn FnMut() + Send>,
    ) -> Self {
        self.self_package = Some(package.into());
        self.on_self_surfaced = Some(on_surfaced);
        self
    }

    /// Load the initial configuration, start the engine and sampler
    /// threads, and hand back the control surface.
    ///
    /// The recorder starts even when the config source or the storage
    /// directory is currently broken: the former falls back to defaults
    /// (a later reload can fix it), the latter retries lazily on every
    /// write attempt.
    pub fn spawn(self) -> std::io::Result<RecorderHandle> {
        let initial = match self.provider.load() {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "initial config load failed; starting with defaults");
                RecorderConfig::default()
            }
        };

        let writer = SegmentedWriter::new(&self.data_dir, self.ownership);
        if let Err(error) = writer.ensure_directory() {
            warn!(%error, "storage directory not available yet; writes will retry");
        }

        let shared = Arc::new(EngineShared::new(initial.interval_millis));
        let (commands, inbox) = mpsc::channel();

        let mut tracker = self.tracker;
        tracker.register(ForegroundEvents::new(commands.clone()));

        let core = EngineCore {
            buffer: BatchBuffer::new(initial.batch_size),
            writer,
            provider: self.provider,
            tracker,
            shared: shared.clone(),
            self_package: self.self_package,
            on_self_surfaced: self.on_self_surfaced,
            flush_after: Duration::from_millis(initial.flush_after_millis),
            flush_deadline: None,
        };
        let engine = thread::Builder::new()
            .name("br-engine".to_string())
            .spawn(move || run_engine(core, inbox))?;

        let sampler = Sampler::new(self.source, shared.clone(), commands.clone());
        let sampler_thread = thread::Builder::new()
            .name("br-sampler".to_string())
            .spawn(move || sampler.run())?;

        info!(
            interval_millis = initial.interval_millis,
            batch_size = initial.batch_size,
            "recorder started"
        );

        Ok(RecorderHandle {
            commands,
            shared,
            threads: Some(EngineThreads {
                engine,
                sampler: sampler_thread,
            }),
        })
    }
}

struct EngineThreads {
    engine: JoinHandle<()>,
    sampler: JoinHandle<()>,
}

/// Control surface for a running recorder.
///
/// Every operation is synchronous: it sends a command and blocks on the
/// engine's reply. Dropping the handle performs the same orderly shutdown
/// as [`RecorderHandle::stop`], best-effort.
pub struct RecorderHandle {
    commands: mpsc::Sender<EngineCommand>,
    shared: Arc<EngineShared>,
    threads: Option<EngineThreads>,
}

impl RecorderHandle {
    /// Reload configuration from the provider and apply it.
    ///
    /// Returns the applied configuration. On failure the previous
    /// configuration stays active and recording continues.
    pub fn refresh_config(&self) -> Result<RecorderConfig, ControlError> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(EngineCommand::Reconfigure(reply))
            .map_err(|_| ControlError::Disconnected)?;
        let applied = response.recv().map_err(|_| ControlError::Disconnected)?;
        Ok(applied?)
    }

    /// Flush buffered records to disk immediately. An empty buffer is a
    /// successful no-op.
    pub fn force_flush(&self) -> Result<(), ControlError> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(EngineCommand::ForceFlush(reply))
            .map_err(|_| ControlError::Disconnected)?;
        let result = response.recv().map_err(|_| ControlError::Disconnected)?;
        Ok(result?)
    }

    /// Stop recording: cancel the pending tick, flush, close storage,
    /// release listeners, and join both threads.
    ///
    /// A tick already delivered when stop arrives is recorded in full; one
    /// that races the shutdown is dropped in full. There is no state in
    /// between.
    pub fn stop(mut self) -> Result<(), ControlError> {
        self.stop_impl()
    }

    fn stop_impl(&mut self) -> Result<(), ControlError> {
        let threads = match self.threads.take() {
            Some(threads) => threads,
            None => return Ok(()),
        };

        // Cancel the sampler's pending wait before telling the engine, so
        // no fresh tick can race the shutdown sequence.
        self.shared.signal_stop();

        let (reply, response) = mpsc::channel();
        let result = match self.commands.send(EngineCommand::Stop(reply)) {
            Ok(()) => match response.recv() {
                Ok(result) => result.map_err(ControlError::Storage),
                Err(_) => Err(ControlError::Disconnected),
            },
            Err(_) => Err(ControlError::Disconnected),
        };

        let _ = threads.sampler.join();
        let _ = threads.engine.join();
        result
    }
}

impl Drop for RecorderHandle {
    fn drop(&mut self) {
        let _ = self.stop_impl();
    }
}
