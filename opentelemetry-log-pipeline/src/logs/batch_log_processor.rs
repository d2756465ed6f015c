//! # OpenTelemetry Batch Log Record Processor
//! The `BatchLogRecordProcessor` is one implementation of the
//! `LogRecordProcessor` interface.
//!
//! It buffers log records in a bounded queue and sends them to the exporter
//! in batches. This processor is designed for **production use** in
//! high-throughput applications and reduces the overhead of frequent exports
//! by using a background thread for batch processing.
//!
//! ## Diagram
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Batch)LogProcessor   +--->  (OTLPExporter)   |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```

use crate::async_result::call_guarded;
use crate::error::{ConfigError, OTelSdkError, OTelSdkResult};
use crate::logs::{LogBatch, LogRecordData, LogRecordExporter, LogRecordProcessor, SdkLogRecord};
use crate::AsyncResult;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};

use opentelemetry::metrics::{Counter, Meter, ObservableGauge};
use opentelemetry::{global, otel_debug, otel_warn, Context, KeyValue};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{
    env,
    fmt::{self, Debug, Formatter},
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

/// Delay interval between two consecutive exports.
pub(crate) const OTEL_BLRP_SCHEDULE_DELAY: &str = "OTEL_BLRP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive exports.
pub(crate) const OTEL_BLRP_SCHEDULE_DELAY_DEFAULT: Duration = Duration::from_millis(1_000);
/// Maximum allowed time to export data.
pub(crate) const OTEL_BLRP_EXPORT_TIMEOUT: &str = "OTEL_BLRP_EXPORT_TIMEOUT";
/// Default maximum allowed time to export data.
pub(crate) const OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(30_000);
/// Maximum queue size.
pub(crate) const OTEL_BLRP_MAX_QUEUE_SIZE: &str = "OTEL_BLRP_MAX_QUEUE_SIZE";
/// Default maximum queue size.
pub(crate) const OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Maximum batch size, must be less than or equal to OTEL_BLRP_MAX_QUEUE_SIZE.
pub(crate) const OTEL_BLRP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE";
/// Default maximum batch size.
pub(crate) const OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;

const METER_NAME: &str = "opentelemetry-log-pipeline";
const PROCESSOR_TYPE_LABEL: &str = "processorType";
const PROCESSOR_TYPE_VALUE: &str = "BatchLogRecordProcessor";
const DROPPED_LABEL: &str = "dropped";

/// Worker is not waiting for records.
const NOT_WAITING: usize = usize::MAX;

/// State shared between the emitting threads and the worker thread.
#[derive(Debug)]
struct WorkerShared {
    /// Records accepted into the queue and not yet taken by the worker.
    queue_len: AtomicUsize,
    /// Queue length at which producers wake the worker up early.
    logs_needed: AtomicUsize,
    flush_request: Mutex<Option<FlushRequest>>,
    /// Set once the worker stopped taking records.
    stopped: AtomicBool,
    dropped_logs_count: AtomicUsize,
}

impl WorkerShared {
    /// Counts `count` records as dropped. Returns the previous total.
    fn add_dropped(&self, count: usize, metrics: &ProcessorMetrics) -> usize {
        metrics
            .processed_logs
            .add(count as u64, &metrics.dropped_attributes);
        self.dropped_logs_count.fetch_add(count, Ordering::Relaxed)
    }

    /// Takes back one record counted in `queue_len` and counts it as
    /// dropped, unless the stopping worker already did. Returns the previous
    /// dropped total when the record was counted here.
    fn reclaim_dropped(&self, metrics: &ProcessorMetrics) -> Option<usize> {
        self.queue_len
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |len| len.checked_sub(1))
            .ok()
            .map(|_| self.add_dropped(1, metrics))
    }
}

/// A flush the worker has not started yet. Concurrent callers share it.
#[derive(Debug)]
struct FlushRequest {
    result: AsyncResult,
    /// Stop the worker once the flush is done.
    shutdown: bool,
}

#[derive(Debug)]
struct ProcessorMetrics {
    processed_logs: Counter<u64>,
    exported_attributes: [KeyValue; 2],
    dropped_attributes: [KeyValue; 2],
    _queue_size: ObservableGauge<u64>,
}

impl ProcessorMetrics {
    fn new(meter: &Meter, shared: Arc<WorkerShared>) -> Self {
        let queue_size_attributes = [KeyValue::new(PROCESSOR_TYPE_LABEL, PROCESSOR_TYPE_VALUE)];
        let queue_size = meter
            .u64_observable_gauge("queueSize")
            .with_description("The number of logs queued")
            .with_unit("1")
            .with_callback(move |observer| {
                observer.observe(
                    shared.queue_len.load(Ordering::Relaxed) as u64,
                    &queue_size_attributes,
                )
            })
            .build();
        let processed_logs = meter
            .u64_counter("processedLogs")
            .with_description(
                "The number of logs processed by the BatchLogRecordProcessor. \
                 [dropped=true if they were dropped due to high throughput]",
            )
            .with_unit("1")
            .build();

        ProcessorMetrics {
            processed_logs,
            exported_attributes: [
                KeyValue::new(PROCESSOR_TYPE_LABEL, PROCESSOR_TYPE_VALUE),
                KeyValue::new(DROPPED_LABEL, false),
            ],
            dropped_attributes: [
                KeyValue::new(PROCESSOR_TYPE_LABEL, PROCESSOR_TYPE_VALUE),
                KeyValue::new(DROPPED_LABEL, true),
            ],
            _queue_size: queue_size,
        }
    }
}

/// The `BatchLogRecordProcessor` collects emitted logs in a bounded queue and
/// exports them in batches to the configured [`LogRecordExporter`]. It uses a
/// **dedicated background thread** to manage and export logs, so the
/// application's threads are never blocked by an export.
///
/// This processor supports the following configurations:
/// - **Queue size**: Maximum number of log records that can be buffered.
///   Records emitted while the queue is full are dropped and counted.
/// - **Batch size**: Maximum number of log records to include in a single export.
/// - **Scheduled delay**: Maximum time between two exports.
/// - **Export timeout**: How long the worker waits for a single export.
///
/// An export is triggered when `max_export_batch_size` records are queued or
/// every `scheduled_delay`. Users can explicitly trigger an export using
/// [`force_flush`](LogRecordProcessor::force_flush). Shutdown also exports
/// all buffered logs and is recommended to be called before the application
/// exits.
///
/// Each batch is exported at most once: a batch whose export fails, panics or
/// times out is logged and discarded.
///
/// ### Using a BatchLogRecordProcessor:
///
/// ```rust
/// use opentelemetry_log_pipeline::logs::{
///     BatchConfigBuilder, BatchLogRecordProcessor, NoopLogRecordExporter, SdkLoggerProvider,
/// };
/// use std::time::Duration;
///
/// # fn main() -> Result<(), opentelemetry_log_pipeline::error::ConfigError> {
/// let exporter = NoopLogRecordExporter; // Replace with an actual exporter
/// let processor = BatchLogRecordProcessor::builder(exporter)
///     .with_batch_config(
///         BatchConfigBuilder::default()
///             .with_max_queue_size(2048)
///             .with_max_export_batch_size(512)
///             .with_scheduled_delay(Duration::from_secs(5))
///             .build()?,
///     )
///     .build();
///
/// let provider = SdkLoggerProvider::builder()
///     .with_log_processor(processor)
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct BatchLogRecordProcessor {
    logs_sender: SyncSender<Arc<SdkLogRecord>>, // Data channel to store log records
    signal_sender: SyncSender<()>,              // Wakes the worker thread up
    shared: Arc<WorkerShared>,
    exporter: Arc<dyn LogRecordExporter>,
    metrics: Arc<ProcessorMetrics>,
    is_shutdown: AtomicBool,
    max_queue_size: usize,
}

impl Debug for BatchLogRecordProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLogRecordProcessor")
            .field("exporter", &self.exporter)
            .field("max_queue_size", &self.max_queue_size)
            .field("queue_len", &self.queue_len())
            .field("dropped_logs_count", &self.dropped_logs_count())
            .finish()
    }
}

impl LogRecordProcessor for BatchLogRecordProcessor {
    fn on_emit(&self, _context: &Context, record: &Arc<SdkLogRecord>) {
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_warn!(
                name: "BatchLogRecordProcessor.Emit.AfterShutdown",
                message = "Logs are being emitted even after Shutdown. This indicates incorrect lifecycle management of OTelLoggerProvider in application. Logs will not be exported."
            );
            return;
        }

        self.enqueue(record.clone());
    }

    fn force_flush(&self) -> AsyncResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_debug!(
                name: "BatchLogRecordProcessor.ForceFlush.AlreadyShutdown",
                message = "ForceFlush invoked after Shutdown. This will not perform Flush and indicates a incorrect lifecycle management in Application."
            );
            return AsyncResult::of_failure(OTelSdkError::AlreadyShutdown);
        }
        self.request_flush(false)
    }

    fn shutdown(&self) -> AsyncResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            otel_debug!(
                name: "BatchLogRecordProcessor.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is noop, but indicates a potential issue in the application's lifecycle management."
            );
            return AsyncResult::of_success();
        }

        let dropped_logs = self.dropped_logs_count();
        if dropped_logs > 0 {
            otel_warn!(
                name: "BatchLogRecordProcessor.LogsDropped",
                dropped_logs_count = dropped_logs,
                max_queue_size = self.max_queue_size,
                message = "Logs were dropped due to a queue being full. The count represents the total count of log records dropped in the lifetime of this BatchLogRecordProcessor. Consider increasing the queue size and/or decrease delay between intervals."
            );
        }

        let result = AsyncResult::pending();
        let shutdown_result = result.clone();
        let exporter = self.exporter.clone();
        self.request_flush(true).on_complete(move |flushed| {
            let flush_error = flushed.error();
            let exporter_shutdown = call_guarded(|| exporter.shutdown()).unwrap_or_else(|panic| {
                otel_warn!(
                    name: "BatchLogRecordProcessor.Shutdown.ExporterPanicked",
                    reason = panic.as_str()
                );
                AsyncResult::of_failure(OTelSdkError::InternalFailure(panic))
            });
            exporter_shutdown.on_complete(move |exporter_shutdown| {
                match flush_error.or_else(|| exporter_shutdown.error()) {
                    Some(err) => shutdown_result.fail_with(err),
                    None => shutdown_result.succeed(),
                };
            });
        });
        result
    }
}

impl BatchLogRecordProcessor {
    pub(crate) fn new<E>(exporter: E, config: BatchConfig, meter: Meter) -> Self
    where
        E: LogRecordExporter + 'static,
    {
        let (logs_sender, logs_receiver) =
            mpsc::sync_channel::<Arc<SdkLogRecord>>(config.max_queue_size);
        // Single slot: a wake-up that is already pending covers later ones.
        let (signal_sender, signal_receiver) = mpsc::sync_channel::<()>(1);
        let exporter: Arc<dyn LogRecordExporter> = Arc::new(exporter);
        let shared = Arc::new(WorkerShared {
            queue_len: AtomicUsize::new(0),
            logs_needed: AtomicUsize::new(NOT_WAITING),
            flush_request: Mutex::new(None),
            stopped: AtomicBool::new(false),
            dropped_logs_count: AtomicUsize::new(0),
        });
        let metrics = Arc::new(ProcessorMetrics::new(&meter, shared.clone()));

        let worker = Worker {
            logs_receiver,
            signal_receiver,
            exporter: exporter.clone(),
            shared: shared.clone(),
            metrics: metrics.clone(),
            batch: Vec::with_capacity(config.max_export_batch_size),
            config,
        };
        thread::Builder::new()
            .name("OpenTelemetry.Logs.BatchProcessor".to_string())
            .spawn(move || worker.run())
            .expect("Thread spawn failed."); //TODO: Handle thread spawn failure

        BatchLogRecordProcessor {
            logs_sender,
            signal_sender,
            shared,
            exporter,
            metrics,
            is_shutdown: AtomicBool::new(false),
            max_queue_size: config.max_queue_size,
        }
    }

    /// Create a new batch processor builder
    pub fn builder<E>(exporter: E) -> BatchLogRecordProcessorBuilder<E>
    where
        E: LogRecordExporter,
    {
        BatchLogRecordProcessorBuilder {
            exporter,
            config: Default::default(),
            meter: None,
        }
    }

    /// The exporter batches are sent to.
    pub fn exporter(&self) -> &dyn LogRecordExporter {
        self.exporter.as_ref()
    }

    /// Number of records dropped so far, because the queue was full or
    /// because they arrived after the worker stopped.
    pub fn dropped_logs_count(&self) -> usize {
        self.shared.dropped_logs_count.load(Ordering::Relaxed)
    }

    /// Number of records currently queued.
    pub fn queue_len(&self) -> usize {
        self.shared.queue_len.load(Ordering::Relaxed)
    }

    /// Hands `record` to the worker, or counts it as dropped.
    fn enqueue(&self, record: Arc<SdkLogRecord>) {
        // Count the record before it becomes visible to the worker, so the
        // worker never observes the length going below zero.
        let queue_len = self.shared.queue_len.fetch_add(1, Ordering::SeqCst) + 1;
        match self.logs_sender.try_send(record) {
            Ok(()) => {
                if self.shared.stopped.load(Ordering::SeqCst) {
                    // Nothing will take the record out of the channel.
                    self.shared.reclaim_dropped(&self.metrics);
                } else if queue_len >= self.shared.logs_needed.load(Ordering::SeqCst) {
                    // A pending signal is as good as a new one.
                    let _ = self.signal_sender.try_send(());
                }
            }
            Err(TrySendError::Full(_)) => {
                // The first time we have to drop a log, emit a warning.
                if self.shared.reclaim_dropped(&self.metrics) == Some(0) {
                    otel_warn!(name: "BatchLogRecordProcessor.LogDroppingStarted",
                        message = "BatchLogRecordProcessor dropped a LogRecord due to queue full. No further log will be emitted for further drops until Shutdown. During Shutdown time, a log will be emitted with exact count of total logs dropped.");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.reclaim_dropped(&self.metrics);
                otel_debug!(
                    name: "BatchLogRecordProcessor.Emit.WorkerGone",
                    message = "The worker thread has exited. Logs will not be exported."
                );
            }
        }
    }

    fn request_flush(&self, shutdown: bool) -> AsyncResult {
        let result = {
            let mut pending = self
                .shared
                .flush_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let request = pending.get_or_insert_with(|| FlushRequest {
                result: AsyncResult::pending(),
                shutdown: false,
            });
            request.shutdown |= shutdown;
            request.result.clone()
        };
        let _ = self.signal_sender.try_send(());
        result
    }
}

struct Worker {
    logs_receiver: Receiver<Arc<SdkLogRecord>>,
    signal_receiver: Receiver<()>,
    exporter: Arc<dyn LogRecordExporter>,
    shared: Arc<WorkerShared>,
    metrics: Arc<ProcessorMetrics>,
    config: BatchConfig,
    batch: Vec<LogRecordData>,
}

impl Worker {
    fn run(mut self) {
        let _suppress_guard = Context::enter_telemetry_suppressed_scope();
        otel_debug!(
            name: "BatchLogRecordProcessor.ThreadStarted",
            interval_in_millisecs = self.config.scheduled_delay.as_millis(),
            max_export_batch_size = self.config.max_export_batch_size,
            max_queue_size = self.config.max_queue_size,
        );

        let mut next_export_time = Instant::now() + self.config.scheduled_delay;
        loop {
            let flush_request = self
                .shared
                .flush_request
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(request) = flush_request {
                otel_debug!(name: "BatchLogRecordProcessor.ExportingDueToForceFlush");
                let result = self.flush();
                if request.shutdown {
                    self.stop();
                    request.result.complete(result);
                    otel_debug!(
                        name: "BatchLogRecordProcessor.ThreadExiting",
                        reason = "ShutdownRequested"
                    );
                    break;
                }
                request.result.complete(result);
                next_export_time = Instant::now() + self.config.scheduled_delay;
            }

            self.drain_queue();

            if self.batch.len() >= self.config.max_export_batch_size {
                otel_debug!(name: "BatchLogRecordProcessor.ExportingDueToBatchSize");
                let _ = self.export_current_batch();
                next_export_time = Instant::now() + self.config.scheduled_delay;
            } else if Instant::now() >= next_export_time {
                otel_debug!(name: "BatchLogRecordProcessor.ExportingDueToTimer");
                let _ = self.export_current_batch();
                next_export_time = Instant::now() + self.config.scheduled_delay;
            }

            if self.shared.queue_len.load(Ordering::Acquire) == 0 {
                let wait = next_export_time.saturating_duration_since(Instant::now());
                if wait.is_zero() {
                    continue;
                }
                let logs_needed = self.config.max_export_batch_size - self.batch.len();
                self.shared
                    .logs_needed
                    .store(logs_needed, Ordering::SeqCst);
                // A producer may have enqueued before seeing `logs_needed`.
                if self.shared.queue_len.load(Ordering::SeqCst) >= logs_needed {
                    self.shared.logs_needed.store(NOT_WAITING, Ordering::SeqCst);
                    continue;
                }
                let signal = self.signal_receiver.recv_timeout(wait);
                self.shared.logs_needed.store(NOT_WAITING, Ordering::SeqCst);
                if let Err(RecvTimeoutError::Disconnected) = signal {
                    // The processor was dropped without a shutdown; nothing
                    // can be exported or flushed any more.
                    otel_debug!(
                        name: "BatchLogRecordProcessor.ThreadExiting",
                        reason = "ProcessorDropped"
                    );
                    break;
                }
            }
        }
        otel_debug!(name: "BatchLogRecordProcessor.ThreadStopped");
    }

    /// Moves queued records into the batch until it is full or the queue is
    /// empty.
    fn drain_queue(&mut self) {
        while self.batch.len() < self.config.max_export_batch_size {
            match self.logs_receiver.try_recv() {
                Ok(record) => self.take(&record),
                Err(_) => break,
            }
        }
    }

    fn take(&mut self, record: &SdkLogRecord) {
        self.shared.queue_len.fetch_sub(1, Ordering::AcqRel);
        self.batch.push(record.to_log_record_data());
    }

    /// Exports everything queued when the flush started. Returns the first
    /// export failure, if any.
    fn flush(&mut self) -> OTelSdkResult {
        let mut logs_to_flush = self.shared.queue_len.load(Ordering::Acquire);
        let mut result = Ok(());
        while logs_to_flush > 0 {
            let Ok(record) = self.logs_receiver.try_recv() else {
                break;
            };
            self.take(&record);
            logs_to_flush -= 1;
            if self.batch.len() >= self.config.max_export_batch_size {
                result = result.and(self.export_current_batch());
            }
        }
        result.and(self.export_current_batch())
    }

    /// Stops taking records. Whatever is still queued will never be
    /// exported and is counted as dropped.
    fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        let leftover = self.shared.queue_len.swap(0, Ordering::SeqCst);
        if leftover > 0 {
            self.shared.add_dropped(leftover, &self.metrics);
            otel_debug!(
                name: "BatchLogRecordProcessor.LogsLeftInQueue",
                dropped_logs_count = leftover,
                message = "Logs emitted during shutdown arrived after the final flush and will not be exported."
            );
        }
    }

    /// Exports the current batch, waiting at most `max_export_timeout`. The
    /// batch is cleared whatever the outcome.
    fn export_current_batch(&mut self) -> OTelSdkResult {
        if self.batch.is_empty() {
            return Ok(());
        }

        let batch = &self.batch;
        let exporter = &self.exporter;
        let result = match call_guarded(|| exporter.export(LogBatch::new(batch))) {
            Ok(export) => match export.join_until(self.config.max_export_timeout).result() {
                Some(Ok(())) => {
                    self.metrics.processed_logs.add(
                        self.batch.len() as u64,
                        &self.metrics.exported_attributes,
                    );
                    Ok(())
                }
                Some(Err(err)) => {
                    otel_warn!(
                        name: "BatchLogRecordProcessor.ExportFailed",
                        error = format!("{}", err),
                        batch_size = self.batch.len()
                    );
                    Err(err)
                }
                None => {
                    otel_warn!(
                        name: "BatchLogRecordProcessor.ExportTimedOut",
                        timeout_in_millisecs = self.config.max_export_timeout.as_millis(),
                        batch_size = self.batch.len()
                    );
                    Err(OTelSdkError::Timeout(self.config.max_export_timeout))
                }
            },
            Err(panic) => {
                otel_warn!(
                    name: "BatchLogRecordProcessor.ExportPanicked",
                    reason = panic.as_str(),
                    batch_size = self.batch.len()
                );
                Err(OTelSdkError::InternalFailure(panic))
            }
        };

        // Clear the batch vec after exporting
        self.batch.clear();
        result
    }
}

///
/// A builder for creating [`BatchLogRecordProcessor`] instances.
///
#[derive(Debug)]
pub struct BatchLogRecordProcessorBuilder<E> {
    exporter: E,
    config: BatchConfig,
    meter: Option<Meter>,
}

impl<E> BatchLogRecordProcessorBuilder<E>
where
    E: LogRecordExporter + 'static,
{
    /// Set the BatchConfig for [`BatchLogRecordProcessorBuilder`]
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchLogRecordProcessorBuilder { config, ..self }
    }

    /// Set the meter used to report the queue size and the number of
    /// processed logs. Defaults to the global meter provider's
    /// `opentelemetry-log-pipeline` meter.
    pub fn with_meter(self, meter: Meter) -> Self {
        BatchLogRecordProcessorBuilder {
            meter: Some(meter),
            ..self
        }
    }

    /// Build a batch processor
    pub fn build(self) -> BatchLogRecordProcessor {
        let meter = self.meter.unwrap_or_else(|| global::meter(METER_NAME));
        BatchLogRecordProcessor::new(self.exporter, self.config, meter)
    }
}

/// Batch log processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance of [`BatchConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// The maximum queue size to buffer logs for delayed processing. If the
    /// queue gets full it drops the logs. The default value of is 2048.
    pub(crate) max_queue_size: usize,

    /// The delay interval in milliseconds between two consecutive processing
    /// of batches. The default value is 1 second.
    pub(crate) scheduled_delay: Duration,

    /// The maximum number of logs to process in a single batch. If there are
    /// more than one batch worth of logs then it processes multiple batches
    /// of logs one batch after the other without any delay. The default value
    /// is 512.
    pub(crate) max_export_batch_size: usize,

    /// The maximum duration to export a batch of data.
    pub(crate) max_export_timeout: Duration,
}

impl BatchConfig {
    const DEFAULT: BatchConfig = BatchConfig {
        max_queue_size: OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT,
        scheduled_delay: OTEL_BLRP_SCHEDULE_DELAY_DEFAULT,
        max_export_batch_size: OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
        max_export_timeout: OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT,
    };

    /// The maximum number of records buffered.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// The maximum time between two exports.
    pub fn scheduled_delay(&self) -> Duration {
        self.scheduled_delay
    }

    /// The maximum number of records per export.
    pub fn max_export_batch_size(&self) -> usize {
        self.max_export_batch_size
    }

    /// How long the worker waits for a single export.
    pub fn max_export_timeout(&self) -> Duration {
        self.max_export_timeout
    }
}

impl Default for BatchConfig {
    /// The default configuration, overridden by environment variables if set.
    /// An invalid combination of environment variables is reported and
    /// replaced by the built-in defaults.
    fn default() -> Self {
        BatchConfigBuilder::default().build().unwrap_or_else(|err| {
            otel_warn!(
                name: "BatchLogRecordProcessor.InvalidConfig",
                error = format!("{}", err),
                message = "Invalid batch configuration from environment variables. Falling back to defaults."
            );
            BatchConfig::DEFAULT
        })
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Create a new [`BatchConfigBuilder`] initialized with default batch config values defined by OpenTelemetry.
    /// The values are overridden by environment variables if set.
    /// The supported environment variables are:
    /// * `OTEL_BLRP_MAX_QUEUE_SIZE`
    /// * `OTEL_BLRP_SCHEDULE_DELAY`
    /// * `OTEL_BLRP_MAX_EXPORT_BATCH_SIZE`
    /// * `OTEL_BLRP_EXPORT_TIMEOUT`
    ///
    /// Note: Programmatic configuration overrides any value set via the environment variable.
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: OTEL_BLRP_SCHEDULE_DELAY_DEFAULT,
            max_export_batch_size: OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT,
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    /// Set max_queue_size for [`BatchConfigBuilder`].
    /// It's the maximum queue size to buffer logs for delayed processing.
    /// If the queue gets full it will drop the logs.
    /// The default value is 2048.
    ///
    /// Corresponding environment variable: `OTEL_BLRP_MAX_QUEUE_SIZE`.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set scheduled_delay for [`BatchConfigBuilder`].
    /// It's the delay interval in milliseconds between two consecutive processing of batches.
    /// The default value is 1000 milliseconds.
    ///
    /// Corresponding environment variable: `OTEL_BLRP_SCHEDULE_DELAY`.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set max_export_timeout for [`BatchConfigBuilder`].
    /// It's the maximum duration to export a batch of data.
    /// The default value is 30000 milliseconds.
    ///
    /// Corresponding environment variable: `OTEL_BLRP_EXPORT_TIMEOUT`.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Set max_export_batch_size for [`BatchConfigBuilder`].
    /// It's the maximum number of logs to process in a single batch. If there are
    /// more than one batch worth of logs then it processes multiple batches
    /// of logs one batch after the other without any delay.
    /// The default value is 512.
    ///
    /// Corresponding environment variable: `OTEL_BLRP_MAX_EXPORT_BATCH_SIZE`.
    ///
    /// Note: Programmatically setting this will override any value set via the environment variable.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Builds a `BatchConfig` enforcing the following invariants:
    /// * `max_queue_size` is greater than zero.
    /// * `max_export_batch_size` is greater than zero and less than or equal to `max_queue_size`.
    /// * `scheduled_delay` is greater than zero.
    pub fn build(self) -> Result<BatchConfig, ConfigError> {
        if self.max_queue_size == 0 {
            return Err(ConfigError::invalid_value(
                "max_queue_size",
                "must be greater than 0",
            ));
        }
        if self.max_export_batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "max_export_batch_size",
                "must be greater than 0",
            ));
        }
        if self.max_export_batch_size > self.max_queue_size {
            return Err(ConfigError::invalid_value(
                "max_export_batch_size",
                format!(
                    "{} exceeds max_queue_size {}",
                    self.max_export_batch_size, self.max_queue_size
                ),
            ));
        }
        if self.scheduled_delay.is_zero() {
            return Err(ConfigError::invalid_value(
                "scheduled_delay",
                "must be greater than 0",
            ));
        }

        Ok(BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_batch_size: self.max_export_batch_size,
            max_export_timeout: self.max_export_timeout,
        })
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(max_queue_size) = env::var(OTEL_BLRP_MAX_QUEUE_SIZE)
            .ok()
            .and_then(|queue_size| usize::from_str(&queue_size).ok())
        {
            self.max_queue_size = max_queue_size;
        }

        if let Some(max_export_batch_size) = env::var(OTEL_BLRP_MAX_EXPORT_BATCH_SIZE)
            .ok()
            .and_then(|batch_size| usize::from_str(&batch_size).ok())
        {
            self.max_export_batch_size = max_export_batch_size;
        }

        if let Some(scheduled_delay) = env::var(OTEL_BLRP_SCHEDULE_DELAY)
            .ok()
            .and_then(|delay| u64::from_str(&delay).ok())
        {
            self.scheduled_delay = Duration::from_millis(scheduled_delay);
        }

        if let Some(max_export_timeout) = env::var(OTEL_BLRP_EXPORT_TIMEOUT)
            .ok()
            .and_then(|s| u64::from_str(&s).ok())
        {
            self.max_export_timeout = Duration::from_millis(max_export_timeout);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BatchConfig, BatchConfigBuilder, BatchLogRecordProcessor, OTEL_BLRP_EXPORT_TIMEOUT,
        OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT, OTEL_BLRP_MAX_EXPORT_BATCH_SIZE,
        OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT, OTEL_BLRP_MAX_QUEUE_SIZE,
        OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT, OTEL_BLRP_SCHEDULE_DELAY,
        OTEL_BLRP_SCHEDULE_DELAY_DEFAULT,
    };
    use crate::error::{ConfigError, OTelSdkError};
    use crate::logs::log_processor::tests::test_record;
    use crate::logs::{
        InMemoryLogExporter, InMemoryLogExporterBuilder, LogBatch, LogRecordExporter,
        LogRecordProcessor,
    };
    use crate::AsyncResult;
    use opentelemetry::metrics::MeterProvider as _;
    use opentelemetry::{Context, Value};
    use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData, ResourceMetrics};
    use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(5);

    fn config(max_queue_size: usize, max_export_batch_size: usize, delay: Duration) -> BatchConfig {
        BatchConfigBuilder::default()
            .with_max_queue_size(max_queue_size)
            .with_max_export_batch_size(max_export_batch_size)
            .with_scheduled_delay(delay)
            .with_max_export_timeout(WAIT)
            .build()
            .unwrap()
    }

    fn bodies(exporter: &InMemoryLogExporter) -> Vec<String> {
        exporter
            .get_emitted_logs()
            .unwrap()
            .iter()
            .map(|log| log.body.as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    /// Sums the `processedLogs` points of the latest collection into
    /// `(exported, dropped)`.
    fn processed_logs(metrics: &[ResourceMetrics]) -> (u64, u64) {
        let latest = metrics.last().expect("metrics were exported");
        let mut counts = (0, 0);
        for metric in latest.scope_metrics().flat_map(|scope| scope.metrics()) {
            if metric.name() != "processedLogs" {
                continue;
            }
            let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() else {
                panic!("processedLogs is not a u64 sum: {:?}", metric.data());
            };
            for point in sum.data_points() {
                let dropped = point
                    .attributes()
                    .any(|kv| kv.key.as_str() == "dropped" && kv.value == Value::Bool(true));
                if dropped {
                    counts.1 += point.value();
                } else {
                    counts.0 += point.value();
                }
            }
        }
        counts
    }

    /// Blocks every export until the test releases it.
    #[derive(Debug)]
    struct GatedExporter {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        inner: InMemoryLogExporter,
    }

    impl LogRecordExporter for GatedExporter {
        fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            self.inner.export(batch)
        }
    }

    #[derive(Debug, Default)]
    struct NeverCompletingExporter {
        exports: AtomicUsize,
    }

    impl LogRecordExporter for NeverCompletingExporter {
        fn export(&self, _batch: LogBatch<'_>) -> AsyncResult {
            self.exports.fetch_add(1, Ordering::SeqCst);
            AsyncResult::pending()
        }
    }

    #[derive(Debug)]
    struct PanickingExporter;

    impl LogRecordExporter for PanickingExporter {
        fn export(&self, _batch: LogBatch<'_>) -> AsyncResult {
            panic!("export exploded");
        }
    }

    #[test]
    fn test_default_const_values() {
        assert_eq!(OTEL_BLRP_SCHEDULE_DELAY, "OTEL_BLRP_SCHEDULE_DELAY");
        assert_eq!(OTEL_BLRP_SCHEDULE_DELAY_DEFAULT.as_millis(), 1_000);
        assert_eq!(OTEL_BLRP_EXPORT_TIMEOUT, "OTEL_BLRP_EXPORT_TIMEOUT");
        assert_eq!(OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT.as_millis(), 30_000);
        assert_eq!(OTEL_BLRP_MAX_QUEUE_SIZE, "OTEL_BLRP_MAX_QUEUE_SIZE");
        assert_eq!(OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT, 2_048);
        assert_eq!(
            OTEL_BLRP_MAX_EXPORT_BATCH_SIZE,
            "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE"
        );
        assert_eq!(OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT, 512);
    }

    #[test]
    fn test_default_batch_config_uses_standard_defaults() {
        // The following environment variables are expected to be unset so that their default values are used.
        let env_vars = vec![
            OTEL_BLRP_SCHEDULE_DELAY,
            OTEL_BLRP_EXPORT_TIMEOUT,
            OTEL_BLRP_MAX_QUEUE_SIZE,
            OTEL_BLRP_MAX_EXPORT_BATCH_SIZE,
        ];

        let config = temp_env::with_vars_unset(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay(), OTEL_BLRP_SCHEDULE_DELAY_DEFAULT);
        assert_eq!(config.max_export_timeout(), OTEL_BLRP_EXPORT_TIMEOUT_DEFAULT);
        assert_eq!(config.max_queue_size(), OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT);
        assert_eq!(
            config.max_export_batch_size(),
            OTEL_BLRP_MAX_EXPORT_BATCH_SIZE_DEFAULT
        );
    }

    #[test]
    fn test_code_based_config_overrides_env_vars() {
        let env_vars = vec![
            (OTEL_BLRP_SCHEDULE_DELAY, Some("2000")),
            (OTEL_BLRP_MAX_QUEUE_SIZE, Some("4096")),
            (OTEL_BLRP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        temp_env::with_vars(env_vars, || {
            let config = BatchConfigBuilder::default()
                .with_max_queue_size(2048)
                .with_scheduled_delay(Duration::from_millis(1000))
                .with_max_export_batch_size(512)
                .build()
                .unwrap();

            assert_eq!(config.scheduled_delay(), Duration::from_millis(1000));
            assert_eq!(config.max_queue_size(), 2048);
            assert_eq!(config.max_export_batch_size(), 512);
        });
    }

    #[test]
    fn test_batch_config_configurable_by_env_vars() {
        let env_vars = vec![
            (OTEL_BLRP_SCHEDULE_DELAY, Some("2000")),
            (OTEL_BLRP_EXPORT_TIMEOUT, Some("60000")),
            (OTEL_BLRP_MAX_QUEUE_SIZE, Some("4096")),
            (OTEL_BLRP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay(), Duration::from_millis(2000));
        assert_eq!(config.max_export_timeout(), Duration::from_millis(60000));
        assert_eq!(config.max_queue_size(), 4096);
        assert_eq!(config.max_export_batch_size(), 1024);
    }

    #[test]
    fn test_invalid_env_vars_fall_back_to_defaults() {
        let env_vars = vec![
            (OTEL_BLRP_SCHEDULE_DELAY, Some("I am not number")),
            (OTEL_BLRP_MAX_QUEUE_SIZE, Some("256")),
            (OTEL_BLRP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        temp_env::with_vars(env_vars, || {
            assert!(BatchConfigBuilder::default().build().is_err());
            assert_eq!(BatchConfig::default(), BatchConfig::DEFAULT);
        });
    }

    #[test]
    fn test_batch_config_with_fields() {
        let batch = BatchConfigBuilder::default()
            .with_max_export_batch_size(1)
            .with_scheduled_delay(Duration::from_millis(2))
            .with_max_export_timeout(Duration::from_millis(3))
            .with_max_queue_size(4)
            .build()
            .unwrap();

        assert_eq!(batch.max_export_batch_size(), 1);
        assert_eq!(batch.scheduled_delay(), Duration::from_millis(2));
        assert_eq!(batch.max_export_timeout(), Duration::from_millis(3));
        assert_eq!(batch.max_queue_size(), 4);
    }

    #[test]
    fn test_batch_config_validation() {
        let err = BatchConfigBuilder::default()
            .with_max_queue_size(256)
            .with_max_export_batch_size(1024)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "max_export_batch_size",
                ..
            }
        ));

        let err = BatchConfigBuilder::default()
            .with_max_export_batch_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "max_export_batch_size",
                ..
            }
        ));

        let err = BatchConfigBuilder::default()
            .with_max_queue_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "max_queue_size",
                ..
            }
        ));

        let err = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "scheduled_delay",
                ..
            }
        ));
    }

    #[test]
    fn test_build_batch_log_processor_builder() {
        let env_vars = vec![
            (OTEL_BLRP_MAX_EXPORT_BATCH_SIZE, Some("500")),
            (OTEL_BLRP_SCHEDULE_DELAY, Some("I am not number")),
            (OTEL_BLRP_EXPORT_TIMEOUT, Some("2046")),
        ];
        temp_env::with_vars(env_vars, || {
            let builder = BatchLogRecordProcessor::builder(InMemoryLogExporter::default());

            assert_eq!(builder.config.max_export_batch_size, 500);
            assert_eq!(
                builder.config.scheduled_delay,
                OTEL_BLRP_SCHEDULE_DELAY_DEFAULT
            );
            assert_eq!(
                builder.config.max_queue_size,
                OTEL_BLRP_MAX_QUEUE_SIZE_DEFAULT
            );
            assert_eq!(
                builder.config.max_export_timeout,
                Duration::from_millis(2046)
            );
        });
    }

    #[test]
    fn test_exports_in_order_within_batch_size() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 3, Duration::from_secs(3600)))
            .build();

        let expected: Vec<String> = (0..10).map(|i| format!("log-{i}")).collect();
        for body in &expected {
            let record = test_record("");
            let record = {
                let mut record = std::sync::Arc::try_unwrap(record).unwrap();
                record.body = body.clone().into();
                std::sync::Arc::new(record)
            };
            processor.on_emit(&Context::current(), &record);
        }

        assert!(processor.force_flush().join_until(WAIT).is_success());
        assert_eq!(bodies(&exporter), expected);
        assert_eq!(processor.dropped_logs_count(), 0);
        let batch_sizes = exporter.get_batch_sizes().unwrap();
        assert!(batch_sizes.iter().all(|size| *size <= 3), "{batch_sizes:?}");
        assert_eq!(batch_sizes.iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_drops_when_queue_is_full() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let inner = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(GatedExporter {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
            inner: inner.clone(),
        })
        .with_batch_config(config(4, 1, Duration::from_secs(3600)))
        .build();

        // The worker takes the first record and blocks exporting it.
        processor.on_emit(&Context::current(), &test_record("first"));
        started_rx.recv_timeout(WAIT).unwrap();

        for _ in 0..7 {
            processor.on_emit(&Context::current(), &test_record("queued"));
        }
        assert_eq!(processor.dropped_logs_count(), 3);
        assert_eq!(processor.queue_len(), 4);

        drop(release_tx);
        assert!(processor.force_flush().join_until(WAIT).is_success());
        assert_eq!(inner.get_emitted_logs().unwrap().len(), 5);
        assert_eq!(processor.queue_len(), 0);
    }

    #[test]
    fn test_processed_logs_metric_matches_counts() {
        let metric_exporter = InMemoryMetricExporter::default();
        let meter_provider = SdkMeterProvider::builder()
            .with_periodic_exporter(metric_exporter.clone())
            .build();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let inner = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(GatedExporter {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
            inner: inner.clone(),
        })
        .with_batch_config(config(4, 1, Duration::from_secs(3600)))
        .with_meter(meter_provider.meter("batch-metrics-test"))
        .build();

        processor.on_emit(&Context::current(), &test_record("first"));
        started_rx.recv_timeout(WAIT).unwrap();
        for _ in 0..7 {
            processor.on_emit(&Context::current(), &test_record("queued"));
        }
        drop(release_tx);
        assert!(processor.force_flush().join_until(WAIT).is_success());

        meter_provider.force_flush().unwrap();
        let (exported, dropped) = processed_logs(&metric_exporter.get_finished_metrics().unwrap());
        assert_eq!(dropped, processor.dropped_logs_count() as u64);
        assert_eq!(dropped, 3);
        assert_eq!(exported, inner.get_emitted_logs().unwrap().len() as u64);
        assert_eq!(exported, 5);
    }

    #[test]
    fn test_records_missing_the_final_flush_are_dropped() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let inner = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(GatedExporter {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
            inner: inner.clone(),
        })
        .with_batch_config(config(4, 1, Duration::from_secs(3600)))
        .build();

        processor.on_emit(&Context::current(), &test_record("first"));
        started_rx.recv_timeout(WAIT).unwrap();
        processor.on_emit(&Context::current(), &test_record("second"));
        let shutdown = processor.shutdown();
        release_tx.send(()).unwrap();

        // The final flush is exporting "second". A producer that passed the
        // shutdown check earlier enqueues behind it.
        started_rx.recv_timeout(WAIT).unwrap();
        processor.enqueue(test_record("during-flush"));
        release_tx.send(()).unwrap();
        assert!(shutdown.join_until(WAIT).is_success());
        assert_eq!(bodies(&inner), vec!["first", "second"]);
        assert_eq!(processor.dropped_logs_count(), 1);
        assert_eq!(processor.queue_len(), 0);

        // Once the worker is gone, nothing is left unaccounted either.
        processor.enqueue(test_record("after-stop"));
        assert_eq!(processor.dropped_logs_count(), 2);
        assert_eq!(processor.queue_len(), 0);
        assert_eq!(inner.export_count(), 2);
    }

    #[test]
    fn test_force_flush_fails_if_a_batch_fails() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 4, Duration::from_secs(3600)))
            .build();

        exporter.set_export_failure(true);
        processor.on_emit(&Context::current(), &test_record("lost"));
        let flushed = processor.force_flush();
        assert!(flushed.join_until(WAIT).is_done());
        assert!(matches!(
            flushed.error(),
            Some(OTelSdkError::InternalFailure(_))
        ));

        exporter.set_export_failure(false);
        processor.on_emit(&Context::current(), &test_record("kept"));
        assert!(processor.force_flush().join_until(WAIT).is_success());

        // failed batches are not retried
        assert_eq!(bodies(&exporter), vec!["kept"]);
        assert_eq!(exporter.export_count(), 2);
    }

    #[test]
    fn test_force_flush_with_empty_queue() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 4, Duration::from_secs(3600)))
            .build();
        assert!(processor.force_flush().join_until(WAIT).is_success());
        assert_eq!(exporter.export_count(), 0);
    }

    #[test]
    fn test_exports_on_timer() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 8, Duration::from_millis(50)))
            .build();

        processor.on_emit(&Context::current(), &test_record("lonely"));
        assert!(wait_for(|| exporter.get_emitted_logs().unwrap().len() == 1));
        assert_eq!(exporter.get_batch_sizes().unwrap(), vec![1]);
    }

    #[test]
    fn test_exports_when_batch_is_full() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 2, Duration::from_secs(3600)))
            .build();

        processor.on_emit(&Context::current(), &test_record("a"));
        processor.on_emit(&Context::current(), &test_record("b"));
        assert!(wait_for(|| exporter.get_emitted_logs().unwrap().len() == 2));
    }

    #[test]
    fn test_export_timeout_fails_batch() {
        let processor = BatchLogRecordProcessor::builder(NeverCompletingExporter::default())
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_queue_size(16)
                    .with_max_export_batch_size(4)
                    .with_scheduled_delay(Duration::from_secs(3600))
                    .with_max_export_timeout(Duration::from_millis(50))
                    .build()
                    .unwrap(),
            )
            .build();

        processor.on_emit(&Context::current(), &test_record("slow"));
        let flushed = processor.force_flush();
        assert!(flushed.join_until(WAIT).is_done());
        assert_eq!(
            flushed.error(),
            Some(OTelSdkError::Timeout(Duration::from_millis(50)))
        );

        // the worker moves on to the next batch
        processor.on_emit(&Context::current(), &test_record("next"));
        assert!(processor.force_flush().join_until(WAIT).is_done());
    }

    #[test]
    fn test_panicking_exporter_does_not_stop_worker() {
        let processor = BatchLogRecordProcessor::builder(PanickingExporter)
            .with_batch_config(config(16, 4, Duration::from_secs(3600)))
            .build();

        for _ in 0..2 {
            processor.on_emit(&Context::current(), &test_record("boom"));
            let flushed = processor.force_flush();
            assert!(flushed.join_until(WAIT).is_done());
            assert_eq!(
                flushed.error(),
                Some(OTelSdkError::InternalFailure("export exploded".into()))
            );
        }
    }

    #[test]
    fn test_batch_shutdown() {
        let exporter = InMemoryLogExporterBuilder::default()
            .keep_records_on_shutdown()
            .build();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 4, Duration::from_secs(3600)))
            .build();

        processor.on_emit(&Context::current(), &test_record("before"));
        assert!(processor.shutdown().join_until(WAIT).is_success());
        assert!(exporter.is_shutdown_called());
        assert_eq!(bodies(&exporter), vec!["before"]);

        // shutdown is idempotent and nothing reaches the exporter any more
        let export_count = exporter.export_count();
        assert!(processor.shutdown().is_success());
        processor.on_emit(&Context::current(), &test_record("after"));
        assert_eq!(
            processor.force_flush().error(),
            Some(OTelSdkError::AlreadyShutdown)
        );
        assert_eq!(exporter.export_count(), export_count);
    }

    #[test]
    fn test_concurrent_force_flush_covers_all_records() {
        let exporter = InMemoryLogExporter::default();
        let processor = std::sync::Arc::new(
            BatchLogRecordProcessor::builder(exporter.clone())
                .with_batch_config(config(1024, 16, Duration::from_secs(3600)))
                .build(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let processor = processor.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        processor.on_emit(&Context::current(), &test_record("log"));
                    }
                    processor.force_flush().join_until(WAIT).is_success()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(exporter.get_emitted_logs().unwrap().len(), 200);
    }

    #[test]
    fn test_drop_without_shutdown_stops_worker() {
        let exporter = InMemoryLogExporter::default();
        let processor = BatchLogRecordProcessor::builder(exporter.clone())
            .with_batch_config(config(16, 4, Duration::from_millis(20)))
            .build();
        drop(processor);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(exporter.export_count(), 0);
    }
}
