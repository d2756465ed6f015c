//! Log exporters
use crate::async_result::call_guarded;
use crate::error::OTelSdkError;
use crate::logs::LogRecordData;
use crate::AsyncResult;
use opentelemetry::otel_warn;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A batch of log records to be exported by a [`LogRecordExporter`].
///
/// The batch borrows the records from the processor, which owns them until
/// `export` returns. Exporters that finish their work after returning must
/// copy what they need before they return.
#[derive(Debug, Clone, Copy)]
pub struct LogBatch<'a> {
    data: &'a [LogRecordData],
}

impl<'a> LogBatch<'a> {
    /// Creates a new instance of `LogBatch`.
    pub fn new(data: &'a [LogRecordData]) -> LogBatch<'a> {
        LogBatch { data }
    }

    /// Returns an iterator over the log records in the batch, in the order
    /// they were emitted.
    pub fn iter(&self) -> impl Iterator<Item = &'a LogRecordData> {
        self.data.iter()
    }

    /// The records of the batch.
    pub fn as_slice(&self) -> &'a [LogRecordData] {
        self.data
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the batch holds no record.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `LogRecordExporter` defines the interface that log exporters should
/// implement.
///
/// Exporters receive finite batches of immutable records and report the
/// outcome of each operation through an [`AsyncResult`], which they may
/// resolve after returning. A [`BatchLogRecordProcessor`] calls its exporter
/// from a single thread, one export at a time.
///
/// [`BatchLogRecordProcessor`]: crate::logs::BatchLogRecordProcessor
pub trait LogRecordExporter: Send + Sync + Debug {
    /// Exports a batch of log records.
    ///
    /// The returned result resolves once the batch was delivered, or failed
    /// to be delivered.
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult;

    /// Exports any data the exporter buffered internally.
    fn flush(&self) -> AsyncResult {
        AsyncResult::of_success()
    }

    /// Shuts down the exporter. Called once by the owning processor; exports
    /// after shutdown should fail.
    fn shutdown(&self) -> AsyncResult {
        AsyncResult::of_success()
    }

    /// Shuts the exporter down and waits up to 10 seconds for it to finish.
    fn close(&self) {
        self.shutdown().join_until(Duration::from_secs(10));
    }
}

impl<T: LogRecordExporter + ?Sized> LogRecordExporter for Box<T> {
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
        (**self).export(batch)
    }

    fn flush(&self) -> AsyncResult {
        (**self).flush()
    }

    fn shutdown(&self) -> AsyncResult {
        (**self).shutdown()
    }
}

impl<T: LogRecordExporter + ?Sized> LogRecordExporter for Arc<T> {
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
        (**self).export(batch)
    }

    fn flush(&self) -> AsyncResult {
        (**self).flush()
    }

    fn shutdown(&self) -> AsyncResult {
        (**self).shutdown()
    }
}

/// An exporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogRecordExporter;

impl LogRecordExporter for NoopLogRecordExporter {
    fn export(&self, _batch: LogBatch<'_>) -> AsyncResult {
        AsyncResult::of_success()
    }
}

/// Broadcasts every operation to a list of exporters, in registration order.
///
/// A member that panics counts as a failed result for that member; the
/// remaining members are still called.
#[derive(Debug)]
pub struct MultiLogRecordExporter {
    exporters: Vec<Box<dyn LogRecordExporter>>,
}

impl MultiLogRecordExporter {
    /// Creates a fan-out over `exporters`.
    pub fn new(exporters: Vec<Box<dyn LogRecordExporter>>) -> Self {
        MultiLogRecordExporter { exporters }
    }

    fn for_each_member<F>(&self, operation: &'static str, f: F) -> AsyncResult
    where
        F: Fn(&dyn LogRecordExporter) -> AsyncResult,
    {
        let results: Vec<AsyncResult> = self
            .exporters
            .iter()
            .map(|exporter| {
                call_guarded(|| f(exporter.as_ref())).unwrap_or_else(|panic| {
                    otel_warn!(
                        name: "MultiLogRecordExporter.MemberPanicked",
                        operation = operation,
                        exporter = format!("{:?}", exporter),
                        reason = panic.as_str()
                    );
                    AsyncResult::of_failure(OTelSdkError::InternalFailure(panic))
                })
            })
            .collect();
        AsyncResult::all_of(results)
    }
}

impl LogRecordExporter for MultiLogRecordExporter {
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
        self.for_each_member("export", |exporter| exporter.export(batch))
    }

    fn flush(&self) -> AsyncResult {
        self.for_each_member("flush", |exporter| exporter.flush())
    }

    fn shutdown(&self) -> AsyncResult {
        self.for_each_member("shutdown", |exporter| exporter.shutdown())
    }
}

/// Combines `exporters` into one: none yields a [`NoopLogRecordExporter`], a
/// single exporter is returned as is, and more are wrapped in a
/// [`MultiLogRecordExporter`].
pub fn composite<I>(exporters: I) -> Box<dyn LogRecordExporter>
where
    I: IntoIterator<Item = Box<dyn LogRecordExporter>>,
{
    let mut exporters: Vec<_> = exporters.into_iter().collect();
    match exporters.len() {
        0 => Box::new(NoopLogRecordExporter),
        1 => exporters.swap_remove(0),
        _ => Box::new(MultiLogRecordExporter::new(exporters)),
    }
}
