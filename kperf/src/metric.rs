use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::http::{HttpError, Response};
use crate::macros::metric;

/// A single sample produced by one unit of work.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
}

/// Longest failure message kept as a fatal-error key.
pub const ERROR_KEY_LEN: usize = 40;

/// Result of one GET attempt.
#[metric]
pub enum Sample {
    /// A response was read and parsed.
    Response {
        /// Status text, e.g. `200 OK`.
        status: String,
        status_code: u16,
        /// Transport bytes, head included.
        size: u64,
        time_ms: u64,
        /// Kept only when the scenario asks for it.
        body: Option<String>,
        request_head: Option<String>,
        response_head: Option<String>,
    },
    /// No valid response: transport or parse failure.
    Failure { message: String },
}

impl Sample {
    pub fn from_response(res: Response, keep_body: bool) -> Self {
        Sample::Response {
            status: res.status,
            status_code: res.status_code,
            size: res.size,
            time_ms: res.elapsed.as_millis() as u64,
            body: keep_body.then(|| String::from_utf8_lossy(&res.body).into_owned()),
            request_head: res.request_head,
            response_head: res.response_head,
        }
    }

    /// Failure sample keyed by the error message, cut to [`ERROR_KEY_LEN`].
    pub fn failure(err: &HttpError) -> Self {
        Sample::Failure {
            message: truncate(&err.to_string(), ERROR_KEY_LEN),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Sample::Failure { .. })
    }
}

/// At most `max` characters of `s`.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
