//! Reports and reporters.
//!
//! A [`Report`] is built from a finished [`Aggregate`] and does the final
//! number crunching. A [`Reporter`] sends a report somewhere: the terminal,
//! JSON on stdout, a file.

mod export;
mod format;
pub mod stats;
mod stdout;
mod table;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::aggregate::{Aggregate, GetAggregate, ProfileAggregate};
use crate::BoxError;

pub use export::CsvExporter;
pub use format::NumberFormat;
pub use stats::{success_rate, SizeSummary, TimeSummary};
pub use stdout::{BodyReporter, JsonReporter, StdoutReporter};

pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

#[async_trait]
pub trait Reporter<A: Aggregate, R: Report<A>> {
    async fn report(&self, report: R) -> Result<(), BoxError>;
}

/// Profile-mode statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// Attempts that produced a parsed response, whatever its status.
    pub requests: u64,
    /// Attempts that produced no response.
    pub failures: u64,
    /// Percentage of 2xx responses over `requests`.
    pub success_rate: f64,
    pub status: BTreeMap<String, u64>,
    pub status_code: BTreeMap<u16, u64>,
    /// Absent when no response was parsed.
    pub time: Option<TimeSummary>,
    pub size: Option<SizeSummary>,
    pub fatal_errors: BTreeMap<String, u64>,
}

impl From<ProfileAggregate> for ProfileReport {
    fn from(agg: ProfileAggregate) -> Self {
        Self {
            requests: agg.responses(),
            failures: agg.failures(),
            success_rate: success_rate(&agg.status_code),
            time: TimeSummary::from_samples(&agg.response_times),
            size: SizeSummary::from_samples(&agg.response_sizes),
            status: agg.status,
            status_code: agg.status_code,
            fatal_errors: agg.fatal_errors,
        }
    }
}
impl Report<ProfileAggregate> for ProfileReport {}

/// Getter-mode outcome: the body of the last response, plus heads when captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetReport {
    pub status: BTreeMap<String, u64>,
    pub body: Option<String>,
    pub request_head: Option<String>,
    pub response_head: Option<String>,
    pub fatal_errors: BTreeMap<String, u64>,
}

impl From<GetAggregate> for GetReport {
    fn from(agg: GetAggregate) -> Self {
        Self {
            status: agg.status,
            body: agg.body,
            request_head: agg.request_head,
            response_head: agg.response_head,
            fatal_errors: agg.fatal_errors,
        }
    }
}
impl Report<GetAggregate> for GetReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_report_from_aggregate() {
        let agg = ProfileAggregate {
            status: BTreeMap::from([("200 OK".into(), 3), ("500 Internal Server Error".into(), 1)]),
            status_code: BTreeMap::from([(200, 3), (500, 1)]),
            fatal_errors: BTreeMap::from([("dial timeout after 60s".into(), 2)]),
            response_times: vec![40, 10, 30, 20],
            response_sizes: vec![100, 100, 90, 512],
        };
        let report = ProfileReport::from(agg);

        assert_eq!(report.requests, 4);
        assert_eq!(report.failures, 2);
        assert_eq!(report.success_rate, 75.0);
        assert_eq!(report.time.unwrap().median, 30);
        assert_eq!(report.size.unwrap(), SizeSummary { smallest: 90, largest: 512 });
    }

    #[test]
    fn all_failures_still_report() {
        let agg = ProfileAggregate {
            fatal_errors: BTreeMap::from([("dial failed: refused".into(), 10)]),
            ..ProfileAggregate::default()
        };
        let report = ProfileReport::from(agg);
        assert_eq!(report.requests, 0);
        assert_eq!(report.success_rate, 0.0);
        assert!(report.time.is_none() && report.size.is_none());
        assert_eq!(report.failures, 10);
    }
}
