use super::{Body, LoggerConfig, SdkLogRecord, SdkLoggerProvider, TraceContext};
use opentelemetry::logs::{AnyValue, Severity};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, InstrumentationScope, Key};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
/// The object for emitting log records, obtained from
/// [`SdkLoggerProvider::logger`].
pub struct SdkLogger {
    scope: Arc<InstrumentationScope>,
    provider: SdkLoggerProvider,
    config: LoggerConfig,
}

impl SdkLogger {
    pub(crate) fn new(
        scope: Arc<InstrumentationScope>,
        provider: SdkLoggerProvider,
        config: LoggerConfig,
    ) -> Self {
        SdkLogger {
            scope,
            provider,
            config,
        }
    }

    /// The instrumentation scope of the logger.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// The configuration resolved for this logger's scope.
    pub fn config(&self) -> LoggerConfig {
        self.config
    }

    /// Returns `true` if records emitted now would reach the processors.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
            && !self.provider.is_shutdown()
            && !Context::is_current_telemetry_suppressed()
    }

    /// Starts a new log record.
    pub fn log_record_builder(&self) -> SdkLogRecordBuilder<'_> {
        SdkLogRecordBuilder {
            logger: self,
            record: SdkLogRecord::new(
                self.provider.resource().clone(),
                self.scope.clone(),
                self.provider.log_limits(),
            ),
            observed_timestamp: None,
            context: None,
        }
    }
}

/// Populates a log record and hands it to the processors on
/// [`emit`](Self::emit).
#[derive(Debug)]
#[must_use = "a log record is only processed once `emit` is called"]
pub struct SdkLogRecordBuilder<'a> {
    logger: &'a SdkLogger,
    record: SdkLogRecord,
    observed_timestamp: Option<SystemTime>,
    context: Option<Context>,
}

impl SdkLogRecordBuilder<'_> {
    /// Time when the event occurred.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.record.timestamp = Some(timestamp);
        self
    }

    /// Time when the event was observed. Defaults to the time of `emit()`.
    pub fn with_observed_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.observed_timestamp = Some(timestamp);
        self
    }

    /// Context passed to the processors and used to look up the active span.
    /// Defaults to [`Context::current`] at `emit()`.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.record.severity_number = Some(severity);
        self
    }

    /// Severity text
    pub fn with_severity_text(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.record.severity_text = Some(text.into());
        self
    }

    /// Record body
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.record.body = body.into();
        self
    }

    /// Adds an attribute, subject to the provider's [`LogLimits`].
    ///
    /// [`LogLimits`]: crate::logs::LogLimits
    pub fn with_attribute<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        self.record.set_attribute(key, value);
        self
    }

    /// Emits the record. Does nothing if the logger is disabled, the provider
    /// is shut down, or telemetry is suppressed on the emitting thread.
    pub fn emit(self) {
        let SdkLogRecordBuilder {
            logger,
            mut record,
            observed_timestamp,
            context,
        } = self;
        if !logger.is_enabled() {
            return;
        }
        let context = context.unwrap_or_else(Context::current);
        if context.is_telemetry_suppressed() {
            return;
        }

        record.observed_timestamp = observed_timestamp.unwrap_or_else(SystemTime::now);
        if context.has_active_span() {
            record.trace_context = Some(TraceContext::from(context.span().span_context()));
        }

        logger
            .provider
            .processor()
            .on_emit(&context, &Arc::new(record));
    }
}
