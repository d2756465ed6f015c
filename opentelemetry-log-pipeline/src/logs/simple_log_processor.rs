//! # OpenTelemetry Simple Log Record Processor
//! The `SimpleLogRecordProcessor` is one implementation of the
//! `LogRecordProcessor` interface.
//!
//! It forwards every log record to the exporter as soon as it is emitted, one
//! export call per record. This processor is designed for debugging, testing
//! or low-volume scenarios. It is **not suitable for high-throughput**
//! environments due to its lack of batching.
//!
//! ## Diagram
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Simple)LogProcessor  +--->  LogExporter      |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```

use crate::async_result::call_guarded;
use crate::error::OTelSdkError;
use crate::logs::{LogBatch, LogRecordExporter, LogRecordProcessor, SdkLogRecord};
use crate::AsyncResult;

use opentelemetry::{otel_debug, otel_error, otel_warn, Context};

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A [`LogRecordProcessor`] that exports log records as they are emitted.
///
/// The export is started on the thread that emits the record. Exports that
/// complete later are tracked so that [`force_flush`](LogRecordProcessor::force_flush)
/// can wait for all of them.
///
/// ## Example
///
/// ```rust
/// use opentelemetry_log_pipeline::logs::{NoopLogRecordExporter, SdkLoggerProvider};
///
/// let exporter = NoopLogRecordExporter; // Replace with an actual exporter
/// let provider = SdkLoggerProvider::builder()
///     .with_simple_exporter(exporter)
///     .build();
/// ```
#[derive(Debug)]
pub struct SimpleLogRecordProcessor<E: LogRecordExporter> {
    exporter: Arc<E>,
    pending_exports: Arc<Mutex<HashMap<u64, AsyncResult>>>,
    next_export_id: AtomicU64,
    is_shutdown: AtomicBool,
}

impl<E: LogRecordExporter + 'static> SimpleLogRecordProcessor<E> {
    /// Creates a new instance of `SimpleLogRecordProcessor`.
    pub fn new(exporter: E) -> Self {
        SimpleLogRecordProcessor {
            exporter: Arc::new(exporter),
            pending_exports: Arc::new(Mutex::new(HashMap::new())),
            next_export_id: AtomicU64::new(0),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// The exporter records are forwarded to.
    pub fn exporter(&self) -> &E {
        &self.exporter
    }

    fn export_record(&self, record: &SdkLogRecord) -> AsyncResult {
        let data = [record.to_log_record_data()];
        call_guarded(|| self.exporter.export(LogBatch::new(&data))).unwrap_or_else(|panic| {
            otel_error!(
                name: "SimpleLogRecordProcessor.ExportPanicked",
                reason = panic.as_str()
            );
            AsyncResult::of_failure(OTelSdkError::InternalFailure(panic))
        })
    }
}

impl<E: LogRecordExporter + 'static> LogRecordProcessor for SimpleLogRecordProcessor<E> {
    fn on_emit(&self, _context: &Context, record: &Arc<SdkLogRecord>) {
        // noop after shutdown
        if self.is_shutdown.load(Ordering::Relaxed) {
            // this is a warning, as the user is trying to log after the processor has been shutdown
            otel_warn!(
                name: "SimpleLogRecordProcessor.Emit.AfterShutdown",
            );
            return;
        }

        let result = {
            let _suppress_guard = Context::enter_telemetry_suppressed_scope();
            self.export_record(record)
        };

        let id = self.next_export_id.fetch_add(1, Ordering::Relaxed);
        self.pending_exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, result.clone());

        let pending_exports = self.pending_exports.clone();
        result.on_complete(move |result| {
            pending_exports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            if let Some(err) = result.error() {
                otel_error!(
                    name: "SimpleLogRecordProcessor.ExportFailed",
                    error = format!("{}", err)
                );
            }
        });
    }

    fn force_flush(&self) -> AsyncResult {
        let pending: Vec<AsyncResult> = self
            .pending_exports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        AsyncResult::all_of(pending)
    }

    fn shutdown(&self) -> AsyncResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            otel_debug!(
                name: "SimpleLogRecordProcessor.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is noop, but indicates a potential issue in the application's lifecycle management."
            );
            return AsyncResult::of_success();
        }

        let result = AsyncResult::pending();
        let shutdown_result = result.clone();
        let exporter = self.exporter.clone();
        self.force_flush().on_complete(move |flushed| {
            let flush_error = flushed.error();
            let exporter_shutdown = call_guarded(|| exporter.shutdown()).unwrap_or_else(|panic| {
                otel_warn!(
                    name: "SimpleLogRecordProcessor.Shutdown.ExporterPanicked",
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
