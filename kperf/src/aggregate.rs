use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;

use crate::macros::aggregate;
use crate::metric::{Metric, Sample};

/// The `Aggregate` trait defines how raw [`Metric`] values are collected into an
/// intermediate representation that keeps everything a [`Report`] needs.
///
/// **Important:** `Aggregate` implementations should **not** compute final statistics
/// such as means or medians. Those belong in a [`Report`], which is converted from
/// an `Aggregate` and performs the final processing.
///
/// # Role
///
/// - Collect individual [`Metric`] samples produced by the workers of a run.
/// - Store the raw data (histograms, per-sample values) needed later.
/// - Be owned by exactly one consumer: the aggregator task of the run.
///
/// # Example
/// ```rust
/// use kperf::{Aggregate, Metric, macros::*};
///
/// #[metric]
/// struct Latency(u64);
///
/// #[aggregate]
/// struct Total {
///     count: u64,
///     sum: u128,
/// }
///
/// impl Aggregate for Total {
///     type Metric = Latency;
///
///     fn new() -> Self {
///         Self { count: 0, sum: 0 }
///     }
///
///     fn consume(&mut self, metric: &Self::Metric) {
///         self.count += 1;
///         self.sum += metric.0 as u128;
///     }
/// }
/// ```
///
/// [`Report`]: crate::report::Report
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    ///
    /// This default implementation calls [`consume`](Aggregate::consume) for each metric.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);
}

/// Profile-mode accumulator.
///
/// Failures only feed `fatal_errors`. Every response feeds the status
/// histograms and appends its time and size, in arrival order.
#[aggregate]
#[derive(Default)]
pub struct ProfileAggregate {
    /// Keyed by status text (`200 OK`).
    pub status: BTreeMap<String, u64>,
    pub status_code: BTreeMap<u16, u64>,
    /// Keyed by truncated error message.
    pub fatal_errors: BTreeMap<String, u64>,
    pub response_times: Vec<u64>,
    pub response_sizes: Vec<u64>,
}

impl ProfileAggregate {
    pub fn responses(&self) -> u64 {
        self.status_code.values().sum()
    }

    pub fn failures(&self) -> u64 {
        self.fatal_errors.values().sum()
    }
}

impl Aggregate for ProfileAggregate {
    type Metric = Sample;

    fn new() -> Self {
        ProfileAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric {
            Sample::Failure { message } => {
                *self.fatal_errors.entry(message.clone()).or_default() += 1;
            }
            Sample::Response {
                status,
                status_code,
                size,
                time_ms,
                ..
            } => {
                *self.status.entry(status.clone()).or_default() += 1;
                *self.status_code.entry(*status_code).or_default() += 1;
                self.response_times.push(*time_ms);
                self.response_sizes.push(*size);
            }
        }
    }
}

/// Getter-mode accumulator: status and errors plus the last response's body and heads.
#[aggregate]
#[derive(Default)]
pub struct GetAggregate {
    pub status: BTreeMap<String, u64>,
    pub fatal_errors: BTreeMap<String, u64>,
    pub body: Option<String>,
    pub request_head: Option<String>,
    pub response_head: Option<String>,
}

impl Aggregate for GetAggregate {
    type Metric = Sample;

    fn new() -> Self {
        GetAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric {
            Sample::Failure { message } => {
                *self.fatal_errors.entry(message.clone()).or_default() += 1;
            }
            Sample::Response {
                status,
                body,
                request_head,
                response_head,
                ..
            } => {
                *self.status.entry(status.clone()).or_default() += 1;
                self.body = body.clone();
                self.request_head = request_head.clone();
                self.response_head = response_head.clone();
            }
        }
    }
}

/// Single consumer of a run's result channel.
///
/// Drains `rx` until every sender is gone, folding metrics in batches of up to
/// `batch_size`.
pub async fn aggregator_task<A: Aggregate>(
    mut rx: mpsc::Receiver<A::Metric>,
    batch_size: usize,
) -> A {
    let mut agg = A::new();
    let mut batch = Vec::with_capacity(batch_size);

    // Receive the first metric or end the loop once all senders are dropped
    while let Some(metric) = rx.recv().await {
        batch.push(metric);

        // Then take whatever is already queued
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(metric) => batch.push(metric),
                Err(_) => break,
            }
        }

        agg.aggregate(&batch);
        batch.clear();
    }
    agg
}
