use std::fmt;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::http::error::HttpError;

/// Identifies the client in every request head.
pub const USER_AGENT: &str = concat!("kperf/", env!("CARGO_PKG_VERSION"));

/// Protocol version written on the request line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVersion {
    /// One connection per request: the client closes after every call.
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "1.0",
            HttpVersion::Http11 => "1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.as_str())
    }
}

/// A normalized GET target together with its serialized request head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRequest {
    use_tls: bool,
    host: String,
    server_name: String,
    address: String,
    path: String,
    head: String,
}

impl TargetRequest {
    /// Normalize `raw` and serialize the request head.
    ///
    /// A URL without an `http://` or `https://` prefix is treated as HTTPS. The
    /// resulting address always carries an explicit port.
    pub fn build(raw: &str, version: HttpVersion) -> Result<Self, HttpError> {
        let raw = raw.trim();
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&with_scheme).map_err(|e| HttpError::InvalidUrl(format!("{raw}: {e}")))?;
        let use_tls = url.scheme() == "https";
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(HttpError::InvalidUrl(format!("{raw}: missing host"))),
        };
        let server_name = match url.host() {
            Some(Host::Domain(d)) => d.to_string(),
            Some(Host::Ipv4(a)) => a.to_string(),
            Some(Host::Ipv6(a)) => a.to_string(),
            None => return Err(HttpError::InvalidUrl(format!("{raw}: missing host"))),
        };
        let port = url.port().unwrap_or(if use_tls { 443 } else { 80 });

        let mut path = normalize_path(url.path());
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let head = format!(
            "GET {path} HTTP/{}\r\nHOST: {host}\r\nUser-Agent: {USER_AGENT}\r\nAccept: */*\r\n\r\n",
            version.as_str()
        );

        Ok(Self {
            use_tls,
            address: format!("{host}:{port}"),
            host,
            server_name,
            path,
            head,
        })
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Hostname as written in the URL (brackets kept for IPv6 literals).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host without IPv6 brackets, as TLS expects it.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// `host:port`, the dial target.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serialized request line and headers, terminated by the blank line.
    pub fn head(&self) -> &str {
        &self.head
    }
}

/// Append `/` to directory-like paths: those without a trailing slash whose
/// last segment has no `.`.
fn normalize_path(path: &str) -> String {
    if path.ends_with('/') {
        return path.to_string();
    }
    let last = path.rsplit('/').next().unwrap_or(path);
    if last.contains('.') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}
