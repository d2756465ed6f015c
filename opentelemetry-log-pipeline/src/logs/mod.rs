//! # OpenTelemetry Log Pipeline
mod attributes;
mod batch_log_processor;
mod event_logger;
pub mod export;
mod limits;
pub mod log_processor;
mod logger;
mod logger_provider;
pub(crate) mod record;
mod scope_config;
mod simple_log_processor;

/// In-Memory log exporter for testing purpose.
#[cfg(any(feature = "testing", test))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "testing", test))))]
pub mod in_memory_exporter;
#[cfg(any(feature = "testing", test))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "testing", test))))]
pub use in_memory_exporter::{InMemoryLogExporter, InMemoryLogExporterBuilder};

pub use attributes::BoundedAttributes;
pub use batch_log_processor::{
    BatchConfig, BatchConfigBuilder, BatchLogRecordProcessor, BatchLogRecordProcessorBuilder,
};
pub use event_logger::{
    SdkEventBuilder, SdkEventLogger, SdkEventLoggerBuilder, SdkEventLoggerProvider, EVENT_NAME,
};
pub use export::{LogBatch, LogRecordExporter, MultiLogRecordExporter, NoopLogRecordExporter};
pub use limits::{LogLimits, LogLimitsBuilder};
pub use log_processor::{LogRecordProcessor, MultiLogRecordProcessor, NoopLogRecordProcessor};
pub use logger::{SdkLogRecordBuilder, SdkLogger};
pub use logger_provider::{LoggerProviderBuilder, SdkLoggerProvider};
pub use record::{Body, LogRecordData, SdkLogRecord, TraceContext};
pub use scope_config::{LoggerConfig, ScopeConfigurator, ScopeConfiguratorBuilder, ScopeMatcher};
pub use simple_log_processor::SimpleLogRecordProcessor;
