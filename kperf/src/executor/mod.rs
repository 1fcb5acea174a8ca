//! Executors: orchestration of a run
//!
//! The `Executor` trait is the runtime hook that executes a [`Scenario`]. The
//! built-in [`QueueExecutor`] runs a fixed amount of work with constant
//! concurrency.
//!
//! # High-level flow
//! 1. A producer task pre-loads a bounded job queue with one token per request
//!    and closes it.
//! 2. N worker tasks are spawned. Each owns exactly one [`HttpClient`] (and so at
//!    most one connection) and repeatedly:
//!    - pulls a token, stopping once the queue is empty and closed,
//!    - performs one GET,
//!    - turns the outcome into a [`Sample`] (failures included) and pushes it on
//!      the result channel,
//!    - signals one unit of progress, if progress is on.
//! 3. A single aggregator task drains the result channel into an [`Aggregate`];
//!    a single progress task is the only writer to the progress display.
//! 4. The executor joins all workers. Their senders going away closes the result
//!    and progress channels, which ends the aggregator and progress tasks.
//!
//! # Guarantees
//! - One token is exactly one GET attempt. Nothing is retried.
//! - Connections are never shared across workers.
//! - Results arrive in completion order, not job order. Aggregates only hold
//!   order-independent data (histograms, samples sorted at report time).
//! - Only the dial step observes the scenario's shutdown signal; a worker also
//!   stops pulling new tokens once shutdown is raised.
//!
//! [`HttpClient`]: crate::http::HttpClient
//! [`Sample`]: crate::metric::Sample

pub mod progress;
pub mod queue;

pub use progress::{Progress, ProgressLine};
pub use queue::{QueueExecutor, WorkItem};

use std::future::Future;

use crate::{aggregate::Aggregate, metric::Sample, scenario::Scenario, BoxError};

pub trait Executor<A>
where
    Self: Send + Sync + Sized,
    A: Aggregate<Metric = Sample>,
{
    /// Execute the scenario and return the final aggregate.
    fn exec(&self, scenario: &Scenario<Self>) -> impl Future<Output = Result<A, BoxError>> + Send;
}
