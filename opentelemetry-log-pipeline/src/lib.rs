//! # OpenTelemetry Log Pipeline
//!
//! The asynchronous log record processing and export pipeline of the
//! OpenTelemetry SDK. It decouples the thread that emits a log record from the
//! thread(s) that transmit batches of records to a collector.
//!
//! ```ascii
//!   +-----+---------------+   +-----------------------+   +-------------------+
//!   |     |               |   |                       |   |                   |
//!   | SDK | Logger.emit() +---> (Simple)LogProcessor  +--->  LogExporter      |
//!   |     |               |   | (Batch)LogProcessor   +--->  (OTLPExporter)   |
//!   +-----+---------------+   +-----------------------+   +-------------------+
//! ```
//!
//! Every operation that may complete later (export, flush, shutdown) returns
//! an [`AsyncResult`], which callers can join with a timeout, observe through
//! a callback, combine with [`AsyncResult::all_of`] or `.await`.
//!
//! ## Usage
//!
//! ```no_run
//! use opentelemetry_log_pipeline::logs::{
//!     BatchConfigBuilder, BatchLogRecordProcessor, NoopLogRecordExporter, SdkLoggerProvider,
//! };
//! use opentelemetry::logs::Severity;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = NoopLogRecordExporter; // Replace with an actual exporter
//! let processor = BatchLogRecordProcessor::builder(exporter)
//!     .with_batch_config(
//!         BatchConfigBuilder::default()
//!             .with_max_queue_size(2048)
//!             .with_max_export_batch_size(512)
//!             .with_scheduled_delay(Duration::from_secs(5))
//!             .build()?,
//!     )
//!     .build();
//!
//! let provider = SdkLoggerProvider::builder()
//!     .with_log_processor(processor)
//!     .build();
//!
//! provider
//!     .logger("my-component")
//!     .log_record_builder()
//!     .with_severity(Severity::Warn)
//!     .with_body("checkout failed")
//!     .with_attribute("order_id", 12345)
//!     .emit();
//!
//! provider.shutdown().join_until(Duration::from_secs(5));
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Feature Flags
//!
//! * `internal-logs` (default): routes the pipeline's own diagnostics to
//!   `tracing` through the OpenTelemetry internal logging macros.
//! * `testing`: exposes [`logs::InMemoryLogExporter`] outside of this crate's
//!   unit tests.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/open-telemetry/opentelemetry-rust/main/assets/logo.svg"
)]

mod async_result;
pub mod error;
pub mod logs;

pub use async_result::AsyncResult;
pub use opentelemetry_sdk::Resource;
