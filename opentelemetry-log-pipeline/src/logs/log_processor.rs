//! # OpenTelemetry Log Record Processor Interface
//!
//! The `LogRecordProcessor` interface provides hooks for log record processing
//! and exporting. Log processors receive [`SdkLogRecord`]s emitted by the
//! SDK's `Logger` and determine how these records are handled.
//!
//! Built-in log processors convert records to their exportable
//! [`LogRecordData`] form and pass them to configured exporters. They can be
//! registered directly with a [`SdkLoggerProvider`].
//!
//! ## Types of Log Processors
//!
//! - **SimpleLogRecordProcessor**: Forwards log records to the exporter immediately.
//! - **BatchLogRecordProcessor**: Buffers log records and sends them to the exporter in batches.
//! - **MultiLogRecordProcessor**: Broadcasts to several processors.
//!
//! ## Diagram
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Simple)LogProcessor  +--->  LogExporter      |
//!   |     |               |   | (Batch)LogProcessor   +--->  (OTLPExporter)   |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```
//!
//! [`LogRecordData`]: crate::logs::LogRecordData
//! [`SdkLoggerProvider`]: crate::logs::SdkLoggerProvider

use crate::async_result::panic_message;
use crate::error::OTelSdkError;
use crate::logs::SdkLogRecord;
use crate::AsyncResult;
use opentelemetry::{otel_debug, otel_warn, Context};
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The interface for plugging into a [`SdkLogger`].
///
/// [`SdkLogger`]: crate::logs::SdkLogger
pub trait LogRecordProcessor: Send + Sync + Debug {
    /// Called on the emitting thread when a log record is ready to be
    /// processed and exported. Must not block indefinitely.
    ///
    /// Processors that export later must hold on to the `Arc` or snapshot the
    /// record. Attributes added here with
    /// [`SdkLogRecord::set_attribute`] are visible to processors registered
    /// after this one.
    fn on_emit(&self, context: &Context, record: &Arc<SdkLogRecord>);

    /// Exports everything the processor buffered.
    fn force_flush(&self) -> AsyncResult;

    /// Shuts down the processor. After shutdown the processor stops
    /// processing logs; calling it again has no further effect.
    fn shutdown(&self) -> AsyncResult;

    /// Shuts the processor down and waits up to 10 seconds for it to finish.
    fn close(&self) {
        self.shutdown().join_until(Duration::from_secs(10));
    }
}

impl<T: LogRecordProcessor + ?Sized> LogRecordProcessor for Box<T> {
    fn on_emit(&self, context: &Context, record: &Arc<SdkLogRecord>) {
        (**self).on_emit(context, record)
    }

    fn force_flush(&self) -> AsyncResult {
        (**self).force_flush()
    }

    fn shutdown(&self) -> AsyncResult {
        (**self).shutdown()
    }
}

impl<T: LogRecordProcessor + ?Sized> LogRecordProcessor for Arc<T> {
    fn on_emit(&self, context: &Context, record: &Arc<SdkLogRecord>) {
        (**self).on_emit(context, record)
    }

    fn force_flush(&self) -> AsyncResult {
        (**self).force_flush()
    }

    fn shutdown(&self) -> AsyncResult {
        (**self).shutdown()
    }
}

/// A processor that ignores every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogRecordProcessor;

impl LogRecordProcessor for NoopLogRecordProcessor {
    fn on_emit(&self, _context: &Context, _record: &Arc<SdkLogRecord>) {}

    fn force_flush(&self) -> AsyncResult {
        AsyncResult::of_success()
    }

    fn shutdown(&self) -> AsyncResult {
        AsyncResult::of_success()
    }
}

/// Broadcasts every record to a list of processors, in registration order.
///
/// A member that panics in `on_emit` is logged and skipped; the remaining
/// members are still notified.
#[derive(Debug)]
pub struct MultiLogRecordProcessor {
    processors: Vec<Box<dyn LogRecordProcessor>>,
    is_shutdown: AtomicBool,
}

impl MultiLogRecordProcessor {
    /// Creates a fan-out over `processors`.
    pub fn new(processors: Vec<Box<dyn LogRecordProcessor>>) -> Self {
        MultiLogRecordProcessor {
            processors,
            is_shutdown: AtomicBool::new(false),
        }
    }

    fn for_each_member<F>(&self, operation: &'static str, f: F) -> AsyncResult
    where
        F: Fn(&dyn LogRecordProcessor) -> AsyncResult,
    {
        let results: Vec<AsyncResult> = self
            .processors
            .iter()
            .map(|processor| {
                catch_unwind(AssertUnwindSafe(|| f(processor.as_ref()))).unwrap_or_else(
                    |payload| {
                        let reason = panic_message(payload.as_ref());
                        otel_warn!(
                            name: "MultiLogRecordProcessor.MemberPanicked",
                            operation = operation,
                            reason = reason.as_str()
                        );
                        AsyncResult::of_failure(OTelSdkError::InternalFailure(reason))
                    },
                )
            })
            .collect();
        AsyncResult::all_of(results)
    }
}

impl LogRecordProcessor for MultiLogRecordProcessor {
    fn on_emit(&self, context: &Context, record: &Arc<SdkLogRecord>) {
        for processor in &self.processors {
            if let Err(payload) =
                catch_unwind(AssertUnwindSafe(|| processor.on_emit(context, record)))
            {
                otel_warn!(
                    name: "MultiLogRecordProcessor.EmitPanicked",
                    processor = format!("{:?}", processor),
                    reason = panic_message(payload.as_ref())
                );
            }
        }
    }

    fn force_flush(&self) -> AsyncResult {
        self.for_each_member("force_flush", |processor| processor.force_flush())
    }

    fn shutdown(&self) -> AsyncResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            otel_debug!(
                name: "MultiLogRecordProcessor.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is noop."
            );
            return AsyncResult::of_success();
        }
        self.for_each_member("shutdown", |processor| processor.shutdown())
    }
}

/// Combines `processors` into one: none yields a [`NoopLogRecordProcessor`],
/// a single processor is returned as is, and more are wrapped in a
/// [`MultiLogRecordProcessor`].
pub fn composite<I>(processors: I) -> Box<dyn LogRecordProcessor>
where
    I: IntoIterator<Item = Box<dyn LogRecordProcessor>>,
{
    let mut processors: Vec<_> = processors.into_iter().collect();
    match processors.len() {
        0 => Box::new(NoopLogRecordProcessor),
        1 => processors.swap_remove(0),
        _ => Box::new(MultiLogRecordProcessor::new(processors)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logs::LogLimits;
    use crate::Resource;
    use opentelemetry::logs::AnyValue;
    use opentelemetry::{InstrumentationScope, Key};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    pub(crate) fn test_record(body: &'static str) -> Arc<SdkLogRecord> {
        let mut record = SdkLogRecord::new(
            Arc::new(Resource::builder_empty().build()),
            Arc::new(InstrumentationScope::builder("processor-test").build()),
            &LogLimits::default(),
        );
        record.body = body.into();
        Arc::new(record)
    }

    #[derive(Debug, Default)]
    pub(crate) struct RecordingProcessor {
        pub(crate) bodies: Mutex<Vec<String>>,
        pub(crate) flushes: AtomicUsize,
        pub(crate) shutdowns: AtomicUsize,
    }

    impl LogRecordProcessor for RecordingProcessor {
        fn on_emit(&self, _context: &Context, record: &Arc<SdkLogRecord>) {
            let body = record.body().as_str().unwrap_or_default().to_string();
            self.bodies.lock().unwrap().push(body);
        }

        fn force_flush(&self) -> AsyncResult {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            AsyncResult::of_success()
        }

        fn shutdown(&self) -> AsyncResult {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            AsyncResult::of_success()
        }
    }

    #[derive(Debug)]
    struct PanickingProcessor;

    impl LogRecordProcessor for PanickingProcessor {
        fn on_emit(&self, _context: &Context, _record: &Arc<SdkLogRecord>) {
            panic!("on_emit exploded");
        }

        fn force_flush(&self) -> AsyncResult {
            panic!("force_flush exploded");
        }

        fn shutdown(&self) -> AsyncResult {
            AsyncResult::of_failure(OTelSdkError::InternalFailure("nope".into()))
        }
    }

    #[derive(Debug)]
    struct EnrichingProcessor;

    impl LogRecordProcessor for EnrichingProcessor {
        fn on_emit(&self, _context: &Context, record: &Arc<SdkLogRecord>) {
            record.set_attribute("processed_by", "EnrichingProcessor");
        }

        fn force_flush(&self) -> AsyncResult {
            AsyncResult::of_success()
        }

        fn shutdown(&self) -> AsyncResult {
            AsyncResult::of_success()
        }
    }

    #[test]
    fn composite_collapses() {
        let none = composite(Vec::new());
        assert!(format!("{none:?}").contains("NoopLogRecordProcessor"));

        let single = composite(vec![
            Box::new(RecordingProcessor::default()) as Box<dyn LogRecordProcessor>
        ]);
        assert!(format!("{single:?}").contains("RecordingProcessor"));

        let many = composite(vec![
            Box::new(RecordingProcessor::default()) as Box<dyn LogRecordProcessor>,
            Box::new(NoopLogRecordProcessor),
        ]);
        assert!(format!("{many:?}").contains("MultiLogRecordProcessor"));
    }

    #[test]
    fn multi_broadcasts_in_order_and_isolates_panics() {
        let first = Arc::new(RecordingProcessor::default());
        let last = Arc::new(RecordingProcessor::default());
        let multi = MultiLogRecordProcessor::new(vec![
            Box::new(first.clone()),
            Box::new(PanickingProcessor),
            Box::new(last.clone()),
        ]);

        multi.on_emit(&Context::current(), &test_record("one"));
        multi.on_emit(&Context::current(), &test_record("two"));

        assert_eq!(*first.bodies.lock().unwrap(), vec!["one", "two"]);
        assert_eq!(*last.bodies.lock().unwrap(), vec!["one", "two"]);

        let flushed = multi.force_flush();
        assert_eq!(
            flushed.error(),
            Some(OTelSdkError::InternalFailure("force_flush exploded".into()))
        );
        assert_eq!(first.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(last.flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn later_processors_see_added_attributes() {
        #[derive(Debug, Default)]
        struct AttributeReader(Mutex<Option<AnyValue>>);

        impl LogRecordProcessor for AttributeReader {
            fn on_emit(&self, _context: &Context, record: &Arc<SdkLogRecord>) {
                *self.0.lock().unwrap() = record.attribute(&Key::new("processed_by"));
            }

            fn force_flush(&self) -> AsyncResult {
                AsyncResult::of_success()
            }

            fn shutdown(&self) -> AsyncResult {
                AsyncResult::of_success()
            }
        }

        let reader = Arc::new(AttributeReader::default());
        let multi = MultiLogRecordProcessor::new(vec![
            Box::new(EnrichingProcessor),
            Box::new(reader.clone()),
        ]);
        multi.on_emit(&Context::current(), &test_record("body"));

        assert_eq!(
            *reader.0.lock().unwrap(),
            Some(AnyValue::String("EnrichingProcessor".into()))
        );
    }

    #[test]
    fn multi_shutdown_is_one_shot() {
        let member = Arc::new(RecordingProcessor::default());
        let multi = MultiLogRecordProcessor::new(vec![
            Box::new(member.clone()),
            Box::new(NoopLogRecordProcessor),
        ]);

        assert!(multi.shutdown().is_success());
        assert!(multi.shutdown().is_success());
        assert_eq!(member.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multi_shutdown_reports_member_failure() {
        let member = Arc::new(RecordingProcessor::default());
        let multi = MultiLogRecordProcessor::new(vec![
            Box::new(PanickingProcessor),
            Box::new(member.clone()),
        ]);
        assert!(!multi.shutdown().is_success());
        assert_eq!(member.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_shuts_down() {
        let member = Arc::new(RecordingProcessor::default());
        member.close();
        assert_eq!(member.shutdowns.load(Ordering::SeqCst), 1);
    }
}
