use super::{
    log_processor, BatchLogRecordProcessor, LogLimits, LogRecordExporter, LogRecordProcessor,
    LoggerConfig, ScopeConfigurator, ScopeMatcher, SdkLogger, SimpleLogRecordProcessor,
};
use crate::error::OTelSdkError;
use crate::{AsyncResult, Resource};
use opentelemetry::{otel_debug, otel_info, InstrumentationScope};
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// How long dropping the last provider handle waits for the shutdown.
const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Name given to loggers requested with an empty name.
pub(crate) const DEFAULT_LOGGER_NAME: &str = "unknown";

fn with_default_name(scope: &InstrumentationScope) -> InstrumentationScope {
    let mut builder = InstrumentationScope::builder(DEFAULT_LOGGER_NAME)
        .with_attributes(scope.attributes().cloned());
    if let Some(version) = scope.version() {
        builder = builder.with_version(version.to_owned());
    }
    if let Some(schema_url) = scope.schema_url() {
        builder = builder.with_schema_url(schema_url.to_owned());
    }
    builder.build()
}

#[derive(Debug, Clone)]
/// Handles the creation and coordination of [`SdkLogger`]s.
///
/// All `SdkLogger`s created by a `SdkLoggerProvider` share the same
/// [`Resource`] and [`LogLimits`], and have their records processed by the
/// configured log processors. This is a clonable handle to the
/// `SdkLoggerProvider` itself, and cloning it will create a new reference, not
/// a new instance of a `SdkLoggerProvider`. Dropping the last reference will
/// trigger the shutdown of the provider, ensuring that all remaining logs are
/// flushed and no further logs are processed. Shutdown can also be triggered
/// manually by calling the [`shutdown`](SdkLoggerProvider::shutdown) method.
///
/// [`Resource`]: crate::Resource
pub struct SdkLoggerProvider {
    inner: Arc<LoggerProviderInner>,
}

impl SdkLoggerProvider {
    /// Create a new `LoggerProvider` builder.
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// Returns a logger for the instrumentation scope `name`.
    pub fn logger(&self, name: impl Into<Cow<'static, str>>) -> SdkLogger {
        let scope = InstrumentationScope::builder(name).build();
        self.logger_with_scope(scope)
    }

    /// Returns a logger for `scope`. The [`LoggerConfig`] of the logger is
    /// resolved here, once. A scope without a name is renamed `unknown`.
    pub fn logger_with_scope(&self, scope: InstrumentationScope) -> SdkLogger {
        let scope = if scope.name().is_empty() {
            otel_info!(name: "LoggerNameEmpty",  message = "Logger name is empty; consider providing a meaningful name. The logger will be named `unknown`.");
            with_default_name(&scope)
        } else {
            scope
        };
        let config = self.inner.logger_configurator.resolve(&scope);
        otel_debug!(
            name: "LoggerProvider.NewLoggerReturned",
            logger_name = scope.name(),
            enabled = config.is_enabled()
        );
        SdkLogger::new(Arc::new(scope), self.clone(), config)
    }

    pub(crate) fn processor(&self) -> &dyn LogRecordProcessor {
        self.inner.processor.as_ref()
    }

    pub(crate) fn resource(&self) -> &Arc<Resource> {
        &self.inner.resource
    }

    /// The limits applied to the attributes of every record.
    pub fn log_limits(&self) -> &LogLimits {
        &self.inner.log_limits
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Acquire)
    }

    /// Exports the logs buffered by every processor.
    pub fn force_flush(&self) -> AsyncResult {
        if self.is_shutdown() {
            return AsyncResult::of_failure(OTelSdkError::AlreadyShutdown);
        }
        self.inner.processor.force_flush()
    }

    /// Shuts down this `LoggerProvider` and all of its processors.
    ///
    /// Only the first call reaches the processors and returns their result.
    /// Later calls are no-ops that succeed right away.
    pub fn shutdown(&self) -> AsyncResult {
        otel_debug!(
            name: "LoggerProvider.ShutdownInvokedByUser",
        );
        self.inner.shutdown().unwrap_or_else(|| {
            otel_debug!(
                name: "LoggerProvider.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is noop, but indicates a potential issue in the application's lifecycle management."
            );
            AsyncResult::of_success()
        })
    }

    /// Shuts the provider down and waits up to 10 seconds for it to finish.
    pub fn close(&self) {
        self.shutdown().join_until(DROP_SHUTDOWN_TIMEOUT);
    }
}

#[derive(Debug)]
struct LoggerProviderInner {
    processor: Box<dyn LogRecordProcessor>,
    resource: Arc<Resource>,
    log_limits: LogLimits,
    logger_configurator: ScopeConfigurator<LoggerConfig>,
    is_shutdown: AtomicBool,
}

impl LoggerProviderInner {
    /// Shuts the processors down. Returns `None` if shutdown was already
    /// started by another call.
    fn shutdown(&self) -> Option<AsyncResult> {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return None;
        }
        let result = self.processor.shutdown();
        result.on_complete(|result| {
            if let Some(err) = result.error() {
                // Log at debug level because the error is also returned
                // to the user, or is not actionable during drop.
                otel_debug!(name: "LoggerProvider.ShutdownError",
                    error = format!("{err}"));
            }
        });
        Some(result)
    }
}

impl Drop for LoggerProviderInner {
    fn drop(&mut self) {
        if let Some(result) = self.shutdown() {
            otel_info!(
                name: "LoggerProvider.Drop",
                message = "Last reference of LoggerProvider dropped, initiating shutdown."
            );
            result.join_until(DROP_SHUTDOWN_TIMEOUT);
        } else {
            otel_debug!(
                name: "LoggerProvider.Drop.AlreadyShutdown",
                message = "LoggerProvider was already shut down; drop will not attempt shutdown again."
            );
        }
    }
}

#[derive(Debug, Default)]
/// Builder for provider attributes.
pub struct LoggerProviderBuilder {
    processors: Vec<Box<dyn LogRecordProcessor>>,
    resource: Option<Resource>,
    log_limits: Option<LogLimits>,
    logger_configurator: Option<ScopeConfigurator<LoggerConfig>>,
    logger_conditions: Vec<(ScopeMatcher, LoggerConfig)>,
}

impl LoggerProviderBuilder {
    /// Adds a [SimpleLogRecordProcessor] with the configured exporter to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_simple_exporter<T: LogRecordExporter + 'static>(self, exporter: T) -> Self {
        self.with_log_processor(SimpleLogRecordProcessor::new(exporter))
    }

    /// Adds a [BatchLogRecordProcessor] with the configured exporter and the
    /// default [`BatchConfig`](super::BatchConfig) to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_batch_exporter<T: LogRecordExporter + 'static>(self, exporter: T) -> Self {
        let batch = BatchLogRecordProcessor::builder(exporter).build();
        self.with_log_processor(batch)
    }

    /// Adds a custom [LogRecordProcessor] to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_log_processor<T: LogRecordProcessor + 'static>(self, processor: T) -> Self {
        let mut processors = self.processors;
        processors.push(Box::new(processor));

        LoggerProviderBuilder { processors, ..self }
    }

    /// The `Resource` to be associated with this Provider.
    pub fn with_resource(self, resource: Resource) -> Self {
        LoggerProviderBuilder {
            resource: Some(resource),
            ..self
        }
    }

    /// The limits applied to the attributes of every record. Defaults to
    /// [`LogLimits::builder`], which reads the environment.
    pub fn with_log_limits(self, log_limits: LogLimits) -> Self {
        LoggerProviderBuilder {
            log_limits: Some(log_limits),
            ..self
        }
    }

    /// Resolves the [`LoggerConfig`] of each logger. Loggers whose scope it
    /// does not match are enabled.
    pub fn with_logger_configurator(self, configurator: ScopeConfigurator<LoggerConfig>) -> Self {
        LoggerProviderBuilder {
            logger_configurator: Some(configurator),
            ..self
        }
    }

    /// Applies `config` to loggers whose scope matches `matcher`, unless the
    /// configurator set with [`with_logger_configurator`](Self::with_logger_configurator)
    /// already resolves them.
    pub fn add_logger_configurator_condition(
        mut self,
        matcher: ScopeMatcher,
        config: LoggerConfig,
    ) -> Self {
        self.logger_conditions.push((matcher, config));
        self
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> SdkLoggerProvider {
        let resource = self.resource.unwrap_or_else(|| Resource::builder().build());
        let log_limits = self.log_limits.unwrap_or_else(|| {
            LogLimits::builder().build().unwrap_or_else(|err| {
                otel_info!(
                    name: "LoggerProvider.InvalidLogLimits",
                    error = format!("{err}"),
                    message = "Invalid log limits from environment variables. Falling back to defaults."
                );
                LogLimits::default()
            })
        });

        let configurator = self.logger_configurator.unwrap_or_default();
        let logger_configurator = if self.logger_conditions.is_empty() {
            configurator
        } else {
            self.logger_conditions
                .into_iter()
                .fold(configurator.to_builder(), |builder, (matcher, config)| {
                    builder.add_condition(matcher, config)
                })
                .build()
        };

        let logger_provider = SdkLoggerProvider {
            inner: Arc::new(LoggerProviderInner {
                processor: log_processor::composite(self.processors),
                resource: Arc::new(resource),
                log_limits,
                logger_configurator,
                is_shutdown: AtomicBool::new(false),
            }),
        };

        otel_debug!(
            name: "LoggerProvider.Built",
        );
        logger_provider
    }
}
