//! Events are log records that carry an `event.name` attribute. The event
//! logger emits them through an [`SdkLoggerProvider`], so they share its
//! processors, limits and lifecycle.
use super::{SdkLogRecordBuilder, SdkLogger, SdkLoggerProvider};
use opentelemetry::logs::{AnyValue, Severity};
use opentelemetry::{Context, InstrumentationScope, Key};
use std::borrow::Cow;
use std::time::SystemTime;

/// Attribute holding the name of an event.
pub const EVENT_NAME: &str = "event.name";

/// Severity of events that do not set one.
const DEFAULT_SEVERITY: Severity = Severity::Info;

/// Creates [`SdkEventLogger`]s on top of a [`SdkLoggerProvider`].
///
/// Cloning is cheap; every clone uses the same logger provider. Shutting the
/// logger provider down also stops its event loggers.
#[derive(Debug, Clone)]
pub struct SdkEventLoggerProvider {
    logger_provider: SdkLoggerProvider,
}

impl SdkEventLoggerProvider {
    /// Emits events through `logger_provider`.
    pub fn new(logger_provider: SdkLoggerProvider) -> Self {
        SdkEventLoggerProvider { logger_provider }
    }

    /// The provider events are emitted through.
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    /// Returns an event logger for the instrumentation scope `name`.
    pub fn event_logger(&self, name: impl Into<Cow<'static, str>>) -> SdkEventLogger {
        self.event_logger_builder(name).build()
    }

    /// Starts an event logger whose scope also has a version or a schema
    /// URL.
    pub fn event_logger_builder(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> SdkEventLoggerBuilder<'_> {
        SdkEventLoggerBuilder {
            provider: self,
            name: name.into(),
            version: None,
            schema_url: None,
        }
    }
}

/// Builder for [`SdkEventLogger`].
#[derive(Debug)]
pub struct SdkEventLoggerBuilder<'a> {
    provider: &'a SdkEventLoggerProvider,
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
}

impl SdkEventLoggerBuilder<'_> {
    /// Version of the instrumentation scope.
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Schema URL of the instrumentation scope.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// Creates the event logger.
    pub fn build(self) -> SdkEventLogger {
        let mut scope = InstrumentationScope::builder(self.name);
        if let Some(version) = self.version {
            scope = scope.with_version(version);
        }
        if let Some(schema_url) = self.schema_url {
            scope = scope.with_schema_url(schema_url);
        }
        SdkEventLogger {
            logger: self.provider.logger_provider.logger_with_scope(scope.build()),
        }
    }
}

/// Emits events for one instrumentation scope.
#[derive(Debug, Clone)]
pub struct SdkEventLogger {
    logger: SdkLogger,
}

impl SdkEventLogger {
    /// The logger events are emitted with.
    pub fn logger(&self) -> &SdkLogger {
        &self.logger
    }

    /// Starts an event named `event_name`.
    ///
    /// The event has [`Severity::Info`] and the context current at this call
    /// unless the builder overrides them.
    pub fn event_builder(&self, event_name: impl Into<Cow<'static, str>>) -> SdkEventBuilder<'_> {
        SdkEventBuilder {
            record: self
                .logger
                .log_record_builder()
                .with_severity(DEFAULT_SEVERITY)
                .with_context(Context::current()),
            event_name: event_name.into(),
            payload: Vec::new(),
            has_timestamp: false,
        }
    }
}

/// Populates an event and emits it on [`emit`](Self::emit).
#[derive(Debug)]
#[must_use = "an event is only processed once `emit` is called"]
pub struct SdkEventBuilder<'a> {
    record: SdkLogRecordBuilder<'a>,
    event_name: Cow<'static, str>,
    payload: Vec<(Key, String)>,
    has_timestamp: bool,
}

impl SdkEventBuilder<'_> {
    /// Adds a payload field. Payload fields are recorded as attributes on
    /// `emit()`, after the ones set with [`with_attribute`](Self::with_attribute).
    pub fn put(mut self, key: impl Into<Key>, value: impl Into<String>) -> Self {
        self.payload.push((key.into(), value.into()));
        self
    }

    /// Time when the event occurred. Defaults to the time of `emit()`.
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.record = self.record.with_timestamp(timestamp);
        self.has_timestamp = true;
        self
    }

    /// Context of the event.
    pub fn with_context(mut self, context: Context) -> Self {
        self.record = self.record.with_context(context);
        self
    }

    /// Severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.record = self.record.with_severity(severity);
        self
    }

    /// Adds an attribute. `event.name` is always overwritten with the name
    /// of the event.
    pub fn with_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        self.record = self.record.with_attribute(key, value);
        self
    }

    /// Emits the event.
    pub fn emit(self) {
        let SdkEventBuilder {
            mut record,
            event_name,
            payload,
            has_timestamp,
        } = self;
        for (key, value) in payload {
            record = record.with_attribute(key, value);
        }
        if !has_timestamp {
            record = record.with_timestamp(SystemTime::now());
        }
        record.with_attribute(EVENT_NAME, event_name).emit();
    }
}
