//! From-scratch HTTP/1.x GET client.
//!
//! Layered leaf-first: [`request`] turns a URL into a target and a request head,
//! [`connector`] dials it, [`response`] parses what comes back (with
//! [`chunked`] and [`counting`] as stream helpers), and [`client`] ties them
//! together around a single reusable connection.

pub mod chunked;
pub mod client;
pub mod connector;
pub mod counting;
pub mod error;
pub mod request;
pub mod response;

pub use client::{HttpClient, Response};
pub use connector::{Connection, Connector, DIAL_TIMEOUT};
pub use error::HttpError;
pub use request::{HttpVersion, TargetRequest, USER_AGENT};
pub use response::{read_response, RawResponse, ReadState};
