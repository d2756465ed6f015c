use crate::logs::{BoundedAttributes, LogLimits};
use crate::Resource;
use opentelemetry::{
    logs::{AnyValue, Severity},
    trace::{SpanContext, SpanId, TraceFlags, TraceId},
    InstrumentationScope, Key,
};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// The body of a log record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body was set.
    #[default]
    Empty,
    /// A string body.
    String(Cow<'static, str>),
}

impl Body {
    /// The body as a string slice, `None` when empty.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Body::Empty => None,
            Body::String(s) => Some(s),
        }
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::String(Cow::Borrowed(s))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::String(Cow::Owned(s))
    }
}

impl From<Cow<'static, str>> for Body {
    fn from(s: Cow<'static, str>) -> Self {
        Body::String(s)
    }
}

/// TraceContext stores the trace context for logs that have an associated
/// span.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct TraceContext {
    /// Trace id
    pub trace_id: TraceId,
    /// Span Id
    pub span_id: SpanId,
    /// Trace flags
    pub trace_flags: Option<TraceFlags>,
}

impl From<&SpanContext> for TraceContext {
    fn from(span_context: &SpanContext) -> Self {
        TraceContext {
            trace_id: span_context.trace_id(),
            span_id: span_context.span_id(),
            trace_flags: Some(span_context.trace_flags()),
        }
    }
}

/// An immutable snapshot of one emitted log record, handed to
/// [`LogRecordExporter`]s.
///
/// [`LogRecordExporter`]: crate::logs::LogRecordExporter
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct LogRecordData {
    /// Resource of the provider that emitted the record.
    pub resource: Arc<Resource>,
    /// Instrumentation scope of the logger that emitted the record.
    pub instrumentation_scope: Arc<InstrumentationScope>,
    /// Event time
    pub timestamp: Option<SystemTime>,
    /// Timestamp for when the record was observed by OpenTelemetry
    pub observed_timestamp: SystemTime,
    /// Trace context for logs associated with spans
    pub trace_context: Option<TraceContext>,
    /// The corresponding severity value, normalized
    pub severity_number: Option<Severity>,
    /// The original severity string from the source
    pub severity_text: Option<Cow<'static, str>>,
    /// Record body
    pub body: Body,
    /// Attributes retained within the configured limits
    pub attributes: Vec<(Key, AnyValue)>,
    /// Number of attributes recorded, including those dropped by the limits
    pub total_attribute_count: usize,
}

impl LogRecordData {
    /// Number of attributes that were recorded but not retained.
    pub fn dropped_attributes_count(&self) -> usize {
        self.total_attribute_count.saturating_sub(self.attributes.len())
    }

    /// Returns the value of the attribute `key`, if retained.
    pub fn attribute(&self, key: &Key) -> Option<&AnyValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A log record after `emit()`, as seen by [`LogRecordProcessor`]s.
///
/// Everything but the attributes is fixed. Processors may still add
/// attributes with [`set_attribute`](Self::set_attribute) until the record is
/// snapshotted into a [`LogRecordData`] for export; both operations take the
/// record's lock.
///
/// [`LogRecordProcessor`]: crate::logs::LogRecordProcessor
#[derive(Debug)]
pub struct SdkLogRecord {
    pub(crate) resource: Arc<Resource>,
    pub(crate) instrumentation_scope: Arc<InstrumentationScope>,
    pub(crate) timestamp: Option<SystemTime>,
    pub(crate) observed_timestamp: SystemTime,
    pub(crate) trace_context: Option<TraceContext>,
    pub(crate) severity_number: Option<Severity>,
    pub(crate) severity_text: Option<Cow<'static, str>>,
    pub(crate) body: Body,
    pub(crate) attributes: Mutex<BoundedAttributes>,
}

impl SdkLogRecord {
    /// Creates a record with no body, severity or attributes, observed now.
    pub fn new(
        resource: Arc<Resource>,
        instrumentation_scope: Arc<InstrumentationScope>,
        log_limits: &LogLimits,
    ) -> Self {
        SdkLogRecord {
            resource,
            instrumentation_scope,
            timestamp: None,
            observed_timestamp: SystemTime::now(),
            trace_context: None,
            severity_number: None,
            severity_text: None,
            body: Body::Empty,
            attributes: Mutex::new(log_limits.new_attributes()),
        }
    }

    /// Adds or overwrites an attribute, subject to the record's limits.
    pub fn set_attribute<K, V>(&self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<AnyValue>,
    {
        self.lock_attributes().put(key, value);
    }

    /// Returns the current value of the attribute `key`.
    pub fn attribute(&self, key: &Key) -> Option<AnyValue> {
        self.lock_attributes().get(key).cloned()
    }

    /// Number of attributes currently retained.
    pub fn attributes_len(&self) -> usize {
        self.lock_attributes().len()
    }

    /// Resource of the provider that emitted the record.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Instrumentation scope of the logger that emitted the record.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.instrumentation_scope
    }

    /// Event time
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    /// Timestamp for when the record was observed by OpenTelemetry
    pub fn observed_timestamp(&self) -> SystemTime {
        self.observed_timestamp
    }

    /// Trace context of the span active at emit time
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.trace_context.as_ref()
    }

    /// Severity
    pub fn severity_number(&self) -> Option<Severity> {
        self.severity_number
    }

    /// Severity text
    pub fn severity_text(&self) -> Option<&str> {
        self.severity_text.as_deref()
    }

    /// Record body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Snapshots the record for export.
    pub fn to_log_record_data(&self) -> LogRecordData {
        let (attributes, total_attribute_count) = {
            let attributes = self.lock_attributes();
            (attributes.to_vec(), attributes.total_added_values())
        };
        LogRecordData {
            resource: self.resource.clone(),
            instrumentation_scope: self.instrumentation_scope.clone(),
            timestamp: self.timestamp,
            observed_timestamp: self.observed_timestamp,
            trace_context: self.trace_context.clone(),
            severity_number: self.severity_number,
            severity_text: self.severity_text.clone(),
            body: self.body.clone(),
            attributes,
            total_attribute_count,
        }
    }

    fn lock_attributes(&self) -> MutexGuard<'_, BoundedAttributes> {
        self.attributes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TraceState;
    use std::thread;

    fn record(limits: &LogLimits) -> SdkLogRecord {
        SdkLogRecord::new(
            Arc::new(Resource::builder_empty().build()),
            Arc::new(InstrumentationScope::builder("test").build()),
            limits,
        )
    }

    #[test]
    fn snapshot_reports_total_attribute_count() {
        let limits = LogLimits::builder()
            .with_max_number_of_attributes(2)
            .build()
            .unwrap();
        let record = record(&limits);
        record.set_attribute("a", 1);
        record.set_attribute("b", 2);
        record.set_attribute("c", 3);

        let data = record.to_log_record_data();
        assert_eq!(data.attributes.len(), 2);
        assert_eq!(data.total_attribute_count, 3);
        assert_eq!(data.dropped_attributes_count(), 1);
        assert_eq!(data.attribute(&Key::new("a")), Some(&AnyValue::Int(1)));
    }

    #[test]
    fn snapshot_is_detached_from_record() {
        let record = record(&LogLimits::default());
        record.set_attribute("before", true);
        let data = record.to_log_record_data();
        record.set_attribute("after", true);

        assert_eq!(data.attributes.len(), 1);
        assert_eq!(record.attributes_len(), 2);
    }

    #[test]
    fn attributes_can_be_added_from_many_threads() {
        let record = Arc::new(record(&LogLimits::default()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let record = record.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        record.set_attribute(format!("key-{t}-{i}"), i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(record.attributes_len(), 40);
        assert_eq!(record.to_log_record_data().total_attribute_count, 40);
    }

    #[test]
    fn trace_context_from_span_context() {
        let span_context = SpanContext::new(
            TraceId::from(42u128),
            SpanId::from(7u64),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );
        let trace_context = TraceContext::from(&span_context);
        assert_eq!(trace_context.trace_id, TraceId::from(42u128));
        assert_eq!(trace_context.span_id, SpanId::from(7u64));
        assert_eq!(trace_context.trace_flags, Some(TraceFlags::SAMPLED));
    }

    #[test]
    fn body_conversions() {
        assert_eq!(Body::default().as_str(), None);
        assert_eq!(Body::from("static").as_str(), Some("static"));
        assert_eq!(Body::from("owned".to_string()).as_str(), Some("owned"));
    }
}
