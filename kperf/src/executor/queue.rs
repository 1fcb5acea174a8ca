use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use typed_builder::TypedBuilder;

use super::progress::{progress_task, ProgressLine};
use super::Executor;
use crate::aggregate::{aggregator_task, Aggregate};
use crate::http::HttpClient;
use crate::metric::Sample;
use crate::scenario::Scenario;
use crate::shutdown::Shutdown;
use crate::BoxError;
use internals::*;

/// Upper bound on metrics folded per aggregator wake-up.
const AGGREGATE_BATCH: usize = 256;

/// Anonymous unit of work: its index only bounds the number of attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkItem(pub usize);

/// Runs `requests` GETs spread over `workers` concurrent workers.
///
/// - The job queue and result channel both hold `requests` entries, so neither
///   the producer nor a worker ever waits on a full queue.
/// - `sleep` bounds a random pause (uniform in `[0, sleep]`) between two
///   consecutive GETs of the same worker.
/// - `progress` turns on the single-line progress display on stderr.
#[derive(Clone, Debug, TypedBuilder)]
pub struct QueueExecutor {
    #[builder(default = 100)]
    pub requests: usize,
    #[builder(default = 5)]
    pub workers: usize,
    #[builder(default = Duration::ZERO)]
    pub sleep: Duration,
    #[builder(default)]
    pub progress: bool,
}

impl<A> Executor<A> for QueueExecutor
where
    A: Aggregate<Metric = Sample> + 'static,
{
    async fn exec(&self, scenario: &Scenario<Self>) -> Result<A, BoxError> {
        let capacity = self.requests.max(1);
        let (jobs_tx, jobs_rx) = mpsc::channel(capacity);
        let (results_tx, results_rx) = mpsc::channel(capacity);

        let (progress_tx, progress) = if self.progress {
            let (tx, rx) = mpsc::unbounded_channel();
            let line = ProgressLine::new(io::stderr(), self.requests as u64);
            (Some(tx), Some(tokio::spawn(progress_task(rx, line))))
        } else {
            (None, None)
        };

        tracing::info!(scenario = %scenario.name, requests = self.requests, "Spawning producer...");
        let producer = tokio::spawn(producer_task(jobs_tx, self.requests));

        let ctx = ExecutionContext {
            jobs: Arc::new(Mutex::new(jobs_rx)),
            results: results_tx,
            progress: progress_tx,
            shutdown: scenario.shutdown.clone(),
        };
        tracing::info!(workers = self.workers, "Spawning workers...");
        let handles = spawn_workers(ctx, scenario, self.workers, self.sleep);
        let aggregator = tokio::spawn(aggregator_task::<A>(results_rx, AGGREGATE_BATCH));

        for res in join_all(handles).await {
            res?;
        }
        producer.await?;
        tracing::info!("Workers done, draining results...");

        // Every sender lived in a worker, so both channels are closed by now.
        if let Some(progress) = progress {
            progress.await?;
        }
        let agg = aggregator.await?;

        tracing::info!("Done running scenario: {}!", scenario.name);
        Ok(agg)
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

mod internals {
    use super::*;

    /// Channels and signals shared by the workers of one run.
    #[derive(Clone)]
    pub struct ExecutionContext {
        pub jobs: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
        pub results: mpsc::Sender<Sample>,
        pub progress: Option<mpsc::UnboundedSender<()>>,
        pub shutdown: Shutdown,
    }

    /// Fill the job queue with `requests` tokens, then close it by dropping the sender.
    pub async fn producer_task(tx: mpsc::Sender<WorkItem>, requests: usize) {
        for i in 0..requests {
            if tx.send(WorkItem(i)).await.is_err() {
                break;
            }
        }
    }

    /// Spawn `workers` Tokio tasks, each with its own client for `scenario`.
    pub fn spawn_workers<E>(
        ctx: ExecutionContext,
        scenario: &Scenario<E>,
        workers: usize,
        sleep: Duration,
    ) -> Vec<JoinHandle<()>> {
        let url: Arc<str> = Arc::from(scenario.url.as_str());
        (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    client: scenario.client(),
                    url: Arc::clone(&url),
                    verbose: scenario.verbose,
                    keep_body: scenario.keep_body,
                    sleep,
                };
                tokio::spawn(worker.run(ctx.clone()))
            })
            .collect()
    }

    pub struct Worker {
        pub id: usize,
        pub client: HttpClient,
        pub url: Arc<str>,
        pub verbose: bool,
        pub keep_body: bool,
        pub sleep: Duration,
    }

    impl Worker {
        pub async fn run(mut self, mut ctx: ExecutionContext) {
            let mut pacer = Pacer::new(self.sleep);

            loop {
                let job = tokio::select! {
                    biased;
                    _ = ctx.shutdown.triggered() => None,
                    job = next_job(&ctx.jobs) => job,
                };
                let Some(WorkItem(index)) = job else {
                    break;
                };

                if let Some(pause) = pacer.next_pause() {
                    tokio::time::sleep(pause).await;
                }

                let sample = match self.client.get(&self.url).await {
                    Ok(res) => Sample::from_response(res, self.keep_body),
                    Err(e) => {
                        if self.verbose {
                            tracing::warn!(worker = self.id, job = index, url = %self.url, error = %e, "GET failed");
                        }
                        Sample::failure(&e)
                    }
                };

                if let Some(progress) = &ctx.progress {
                    let _ = progress.send(());
                }
                if ctx.results.send(sample).await.is_err() {
                    break;
                }
            }

            self.client.close();
            tracing::debug!(worker = self.id, "worker finished");
        }
    }

    /// Random pause between two consecutive GETs of one worker.
    ///
    /// Uniform in `[0, bound]` at millisecond resolution. Nothing before the
    /// first GET, and nothing at all for a zero bound.
    pub struct Pacer {
        rng: Option<SmallRng>,
        bound_ms: u64,
        first: bool,
    }

    impl Pacer {
        pub fn new(bound: Duration) -> Self {
            Self::with_rng(bound, SmallRng::from_entropy)
        }

        pub(crate) fn with_rng(bound: Duration, rng: impl FnOnce() -> SmallRng) -> Self {
            let bound_ms = bound.as_millis() as u64;
            Self {
                rng: (bound_ms > 0).then(rng),
                bound_ms,
                first: true,
            }
        }

        pub fn next_pause(&mut self) -> Option<Duration> {
            let first = std::mem::replace(&mut self.first, false);
            let rng = self.rng.as_mut()?;
            if first {
                return None;
            }
            Some(Duration::from_millis(rng.gen_range(0..=self.bound_ms)))
        }
    }

    async fn next_job(jobs: &Mutex<mpsc::Receiver<WorkItem>>) -> Option<WorkItem> {
        jobs.lock().await.recv().await
    }
}
