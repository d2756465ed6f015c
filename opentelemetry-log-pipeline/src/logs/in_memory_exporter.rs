use crate::error::{OTelSdkError, OTelSdkResult};
use crate::logs::{LogBatch, LogRecordData, LogRecordExporter};
use crate::AsyncResult;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type LogResult<T> = Result<T, OTelSdkError>;

/// An in-memory logs exporter that stores logs data in memory.
///
/// This exporter is useful for testing and debugging purposes. It stores
/// every exported [`LogRecordData`]; they can be retrieved with
/// [`get_emitted_logs`](Self::get_emitted_logs). Clones share the same
/// storage, so a clone can be handed to a processor while the test keeps
/// another one.
///
/// # Example
/// ```
/// use opentelemetry_log_pipeline::logs::{InMemoryLogExporter, SdkLoggerProvider};
///
/// let exporter = InMemoryLogExporter::default();
/// let provider = SdkLoggerProvider::builder()
///     .with_simple_exporter(exporter.clone())
///     .build();
///
/// provider.logger("example").log_record_builder().with_body("hello").emit();
/// provider.force_flush();
///
/// let emitted_logs = exporter.get_emitted_logs().unwrap();
/// assert_eq!(emitted_logs.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryLogExporter {
    logs: Arc<Mutex<Vec<LogRecordData>>>,
    batch_sizes: Arc<Mutex<Vec<usize>>>,
    export_count: Arc<AtomicUsize>,
    should_fail: Arc<AtomicBool>,
    is_shutdown: Arc<AtomicBool>,
    should_reset_on_shutdown: bool,
}

impl Default for InMemoryLogExporter {
    fn default() -> Self {
        InMemoryLogExporterBuilder::new().build()
    }
}

/// Builder for [`InMemoryLogExporter`].
#[derive(Debug, Clone)]
pub struct InMemoryLogExporterBuilder {
    reset_on_shutdown: bool,
}

impl Default for InMemoryLogExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogExporterBuilder {
    /// Creates a new builder. By default the stored records are cleared on
    /// shutdown.
    pub fn new() -> Self {
        Self {
            reset_on_shutdown: true,
        }
    }

    /// Creates a new instance of `InMemoryLogExporter`.
    pub fn build(&self) -> InMemoryLogExporter {
        InMemoryLogExporter {
            logs: Arc::new(Mutex::new(Vec::new())),
            batch_sizes: Arc::new(Mutex::new(Vec::new())),
            export_count: Arc::new(AtomicUsize::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
            is_shutdown: Arc::new(AtomicBool::new(false)),
            should_reset_on_shutdown: self.reset_on_shutdown,
        }
    }

    /// If set, the records will not be [`InMemoryLogExporter::reset`] on shutdown.
    pub fn keep_records_on_shutdown(self) -> Self {
        Self {
            reset_on_shutdown: false,
        }
    }
}

impl InMemoryLogExporter {
    /// Returns the records exported so far, in export order.
    pub fn get_emitted_logs(&self) -> LogResult<Vec<LogRecordData>> {
        let logs_guard = self.logs.lock()?;
        Ok(logs_guard.clone())
    }

    /// Returns the size of every batch received, in export order.
    pub fn get_batch_sizes(&self) -> LogResult<Vec<usize>> {
        let guard = self.batch_sizes.lock()?;
        Ok(guard.clone())
    }

    /// Number of `export` calls received, including failed ones.
    pub fn export_count(&self) -> usize {
        self.export_count.load(Ordering::SeqCst)
    }

    /// Makes subsequent exports fail (and drop their records) while `fail`
    /// is set.
    pub fn set_export_failure(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Returns `true` once `shutdown` was called.
    pub fn is_shutdown_called(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Clears the internal (in-memory) storage of logs.
    pub fn reset(&self) {
        let _ = self
            .logs
            .lock()
            .map(|mut logs_guard| logs_guard.clear())
            .map_err(|e| OTelSdkError::InternalFailure(format!("Failed to reset logs: {}", e)));
        let _ = self
            .batch_sizes
            .lock()
            .map(|mut guard| guard.clear());
    }

    fn store(&self, batch: LogBatch<'_>) -> OTelSdkResult {
        if self.is_shutdown_called() {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(OTelSdkError::InternalFailure(
                "export failure requested".to_string(),
            ));
        }
        let mut logs_guard = self.logs.lock()?;
        logs_guard.extend(batch.iter().cloned());
        self.batch_sizes.lock()?.push(batch.len());
        Ok(())
    }
}

impl LogRecordExporter for InMemoryLogExporter {
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
        self.export_count.fetch_add(1, Ordering::SeqCst);
        self.store(batch).into()
    }

    fn shutdown(&self) -> AsyncResult {
        self.is_shutdown.store(true, Ordering::SeqCst);
        if self.should_reset_on_shutdown {
            self.reset();
        }
        AsyncResult::of_success()
    }
}
