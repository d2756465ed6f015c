/*
    Emits a large number of logs from several threads through a
    BatchLogRecordProcessor whose exporter is deliberately slow, then checks
    that every log was either received by the exporter or counted as dropped.

    Run with:
    cargo run --release --bin logs_batch
*/

use num_format::{Locale, ToFormattedString};
use opentelemetry_log_pipeline::logs::{
    BatchLogRecordProcessor, LogBatch, LogRecordExporter, SdkLoggerProvider,
};
use opentelemetry_log_pipeline::AsyncResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CountingExporter {
    count: Arc<AtomicU64>,
}

impl LogRecordExporter for CountingExporter {
    fn export(&self, batch: LogBatch<'_>) -> AsyncResult {
        self.count.fetch_add(batch.len() as u64, Ordering::Relaxed);
        // Simulate some processing time
        // Varying this will affect the number of logs dropped
        // and can be used to test the batch log processor
        // in a various scenarios.
        std::thread::sleep(Duration::from_millis(10));
        AsyncResult::of_success()
    }
}

fn main() {
    let total_logs_to_emit: u64 = 40_000_000;
    let num_threads: u64 = 4;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .init();

    let exporter = CountingExporter::default();
    let count = Arc::clone(&exporter.count);
    let processor = Arc::new(BatchLogRecordProcessor::builder(exporter).build());
    {
        let logger_provider = SdkLoggerProvider::builder()
            .with_log_processor(Arc::clone(&processor))
            .build();
        let mut handles = vec![];

        let logs_per_thread = total_logs_to_emit / num_threads;

        for _ in 0..num_threads {
            let logger = logger_provider.logger("test_logger");
            let handle = std::thread::spawn(move || {
                for _ in 0..logs_per_thread {
                    logger.log_record_builder().with_body("test log").emit();
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let shutdown = logger_provider.shutdown();
        if !shutdown.join_until(Duration::from_secs(60)).is_success() {
            println!("Shutdown did not succeed: {:?}", shutdown.error());
        }
    }

    let logs_dropped_by_sdk = processor.dropped_logs_count() as u64;
    let count_logs_received_by_exporter = count.load(Ordering::Relaxed);

    println!(
        "Total logs emitted: {}",
        total_logs_to_emit.to_formatted_string(&Locale::en)
    );
    println!(
        "Logs received by exporter: {}",
        count_logs_received_by_exporter.to_formatted_string(&Locale::en)
    );
    println!(
        "Dropped logs count: {}",
        logs_dropped_by_sdk.to_formatted_string(&Locale::en)
    );

    if logs_dropped_by_sdk + count_logs_received_by_exporter == total_logs_to_emit {
        println!("Success! All logs are accounted for!");
    } else {
        println!(
            "Fail! {} logs are unaccounted for!",
            total_logs_to_emit.abs_diff(logs_dropped_by_sdk + count_logs_received_by_exporter)
        );
    }
}
