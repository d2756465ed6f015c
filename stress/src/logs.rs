/*
    Stress test results:
    Measures how many records per second the emitting threads can hand to a
    BatchLogRecordProcessor whose exporter does nothing. Records emitted
    while the queue is full are dropped, which is part of what is measured.

    Run with:
    cargo run --release --bin logs
*/

use opentelemetry::logs::Severity;
use opentelemetry_log_pipeline::logs::{NoopLogRecordExporter, SdkLogger, SdkLoggerProvider};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod throughput;

static LOGGER: OnceLock<SdkLogger> = OnceLock::new();

fn main() {
    // Surfaces the processor's own diagnostics, e.g. RUST_LOG=debug
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let provider = SdkLoggerProvider::builder()
        .with_batch_exporter(NoopLogRecordExporter)
        .build();
    let _ = LOGGER.set(provider.logger("stress"));

    throughput::test_throughput(test_log);

    provider.shutdown().join_until(Duration::from_secs(10));
}

fn test_log() {
    if let Some(logger) = LOGGER.get() {
        logger
            .log_record_builder()
            .with_severity(Severity::Error)
            .with_body("my-event_name")
            .with_attribute("event_id", 20)
            .with_attribute("user_name", "otel")
            .with_attribute("user_email", "otel@opentelemetry.io")
            .emit();
    }
}
