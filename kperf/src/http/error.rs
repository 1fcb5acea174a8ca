use std::io;
use std::time::Duration;

use crate::http::response::ReadState;

/// Errors produced by a single GET attempt.
///
/// Inside a run these never escape a worker: each one is turned into a failure
/// sample keyed by (a truncated form of) its message.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The URL could not be parsed into scheme, host and path.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The dial did not finish within the connector's deadline.
    #[error("dial timeout after {0:?}")]
    DialTimeout(Duration),

    /// The run was cancelled while a dial was in flight.
    #[error("dial cancelled")]
    Cancelled,

    /// TCP connect or TLS handshake failed.
    #[error("dial failed: {0}")]
    DialFailure(io::Error),

    /// Writing the request head failed.
    #[error("write failed: {0}")]
    WriteFailure(io::Error),

    /// Reading from the connection failed with something other than a clean end-of-stream.
    #[error("read failed: {0}")]
    Read(io::Error),

    #[error("malformed status line: {0}")]
    MalformedStatusLine(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// A transfer-encoding other than `chunked`.
    #[error("unsupported transfer-encoding: {0}")]
    UnsupportedEncoding(String),

    /// Chunked trailers, whether announced by a `Trailer` header or found after the last chunk.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    /// The peer closed the stream while more of the response was expected.
    #[error("unexpected end of stream in {0}")]
    UnexpectedEndOfStream(ReadState),
}
