//! kperf, an HTTP/1.x GET profiler.
//!
//! kperf fires a fixed number of GET requests at one URL from a fixed number of
//! concurrent workers and reports status distribution, response times and
//! response sizes. The HTTP client is written from scratch on top of Tokio TCP
//! and rustls, so that each step (dial, write, header parse, body framing) is
//! observable and failures are classified precisely.
//!
//! # Architecture
//!
//! - [`http`]: the client. Request building, dialing, response parsing
//!   (content-length, chunked and close-delimited framing) and keep-alive.
//! - [`Scenario`]: what is measured (URL, protocol version, what to keep from
//!   each response) glued to an executor.
//! - [`Executor`]: runs the scenario. [`QueueExecutor`] feeds a bounded job
//!   queue to a pool of workers, each owning one client.
//! - [`Metric`]: one sample per GET attempt. [`Sample`] is either a parsed
//!   response or a failure message, never both.
//! - [`Aggregate`]: folds samples into histograms and raw series.
//! - [`Report`]: final statistics computed from an aggregate.
//! - [`Reporter`]: sends a report to the terminal or elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use kperf::{
//!     aggregate::ProfileAggregate,
//!     executor::QueueExecutor,
//!     report::{ProfileReport, StdoutReporter},
//!     Reporter, Scenario,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kperf::BoxError> {
//!     let aggregate: ProfileAggregate = Scenario::builder()
//!         .name("example.com")
//!         .url("example.com")
//!         .executor(QueueExecutor::builder().requests(200).workers(10).build())
//!         .build()
//!         .run()
//!         .await?;
//!
//!     StdoutReporter::default()
//!         .report(ProfileReport::from(aggregate))
//!         .await
//! }
//! ```
//!
//! # Feature flags
//!
//! - `internals`: exposes the building blocks of [`QueueExecutor`] (execution
//!   context, producer, worker spawning) for custom executors.

/// Metric aggregators
pub mod aggregate;
/// Orchestrators that define how requests actually run
pub mod executor;
/// From-scratch HTTP/1.x client
pub mod http;
/// Single samples
pub mod metric;
/// Reports and Reporters
pub mod report;
/// What is being measured
pub mod scenario;
/// Cancellation signal
pub mod shutdown;

pub use aggregate::Aggregate;
pub use executor::{Executor, QueueExecutor};
pub use metric::{Metric, Sample};
pub use report::{Report, Reporter};
pub use scenario::Scenario;
pub use shutdown::Shutdown;

/// Error type crossing the executor, scenario and reporter boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Procedural macros to reduce boilerplate
pub mod macros {
    pub use kperf_macros::*;
}
