use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use typed_builder::TypedBuilder;

use crate::http::connector::{Connection, Connector};
use crate::http::error::HttpError;
use crate::http::request::{HttpVersion, TargetRequest};
use crate::http::response::read_response;
use crate::shutdown::Shutdown;

/// Outcome of a successful GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Status text, e.g. `404 Not Found`.
    pub status: String,
    pub status_code: u16,
    pub body: Vec<u8>,
    /// Bytes read off the wire, head included.
    pub size: u64,
    /// From the start of the request write to the end of the response read.
    pub elapsed: Duration,
    /// Raw request head, when head capture is on.
    pub request_head: Option<String>,
    /// Raw response head, when head capture is on.
    pub response_head: Option<String>,
}

/// Minimal blocking-style HTTP/1.x GET client.
///
/// Owns at most one connection. Under HTTP/1.1 the connection is reused across
/// calls until the server asks to close it or an error occurs; under HTTP/1.0
/// it is closed after every call.
#[derive(TypedBuilder)]
pub struct HttpClient {
    #[builder(default)]
    version: HttpVersion,
    /// Keep the raw request and response heads on every [`Response`].
    #[builder(default)]
    capture_heads: bool,
    #[builder(default)]
    connector: Connector,
    #[builder(default = Shutdown::never())]
    shutdown: Shutdown,
    #[builder(default, setter(skip))]
    conn: Option<Connection>,
}

impl HttpClient {
    pub fn new(version: HttpVersion) -> Self {
        Self::builder().version(version).build()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Issue one GET against `url`.
    pub async fn get(&mut self, url: &str) -> Result<Response, HttpError> {
        let request = match TargetRequest::build(url, self.version) {
            Ok(request) => request,
            Err(e) => {
                if self.version == HttpVersion::Http10 {
                    self.close();
                }
                return Err(e);
            }
        };

        let result = self.exchange(&request).await;
        if result.is_err() || self.version == HttpVersion::Http10 {
            self.close();
        }
        result
    }

    async fn exchange(&mut self, request: &TargetRequest) -> Result<Response, HttpError> {
        let conn = match &mut self.conn {
            Some(conn) => {
                tracing::trace!(address = request.address(), "reusing connection");
                conn
            }
            slot @ None => {
                let conn = self.connector.connect(request, &mut self.shutdown).await?;
                slot.insert(conn)
            }
        };

        let started = Instant::now();
        conn.write_all(request.head().as_bytes())
            .await
            .map_err(HttpError::WriteFailure)?;
        conn.flush().await.map_err(HttpError::WriteFailure)?;

        let raw = read_response(&mut *conn, self.capture_heads).await?;
        let elapsed = started.elapsed();

        if raw.close {
            tracing::trace!(address = request.address(), "server closed the connection");
            self.conn = None;
        }

        Ok(Response {
            status: raw.status,
            status_code: raw.status_code,
            body: raw.body,
            size: raw.transport_bytes,
            elapsed,
            request_head: self.capture_heads.then(|| request.head().to_string()),
            response_head: raw.head,
        })
    }

    /// Drop the current connection, if any.
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            tracing::trace!("connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    /// Serves `response` to every request head it sees; counts accepted connections.
    async fn serve(response: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(answer(stream, response));
            }
        });
        (url, accepted)
    }

    async fn answer(stream: TcpStream, response: &'static str) {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.is_empty() {
                continue;
            }
            if write.write_all(response.as_bytes()).await.is_err() {
                return;
            }
            if response.contains("Connection: close") {
                return;
            }
        }
    }

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
    const OK_CLOSE: &str = "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nbye";

    #[tokio::test]
    async fn reuses_connection_under_http11() {
        let (url, accepted) = serve(OK).await;
        let mut client = HttpClient::new(HttpVersion::Http11);
        for _ in 0..3 {
            let res = client.get(&url).await.unwrap();
            assert_eq!(res.status_code, 200);
            assert_eq!(res.body, b"hello");
            assert_eq!(res.size, OK.len() as u64);
        }
        assert!(client.is_connected());
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn http10_closes_after_every_call() {
        let (url, accepted) = serve(OK).await;
        let mut client = HttpClient::new(HttpVersion::Http10);
        for _ in 0..3 {
            client.get(&url).await.unwrap();
            assert!(!client.is_connected());
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connection_close_forces_redial() {
        let (url, accepted) = serve(OK_CLOSE).await;
        let mut client = HttpClient::new(HttpVersion::Http11);
        let res = client.get(&url).await.unwrap();
        assert_eq!(res.body, b"bye");
        assert!(!client.is_connected());
        client.get(&url).await.unwrap();
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dial_failure_leaves_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let mut client = HttpClient::new(HttpVersion::Http11);
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, HttpError::DialFailure(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn failed_tls_handshake_stores_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("https://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(OK.as_bytes()).await;
            }
        });

        let mut client = HttpClient::new(HttpVersion::Http11);
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, HttpError::DialFailure(_)), "{err}");
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn invalid_url_fails_before_dialing() {
        let mut client = HttpClient::new(HttpVersion::Http10);
        let err = client.get("http://").await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn parse_error_drops_connection() {
        let (url, _) = serve("HTTP/1.1 abc\r\n\r\n").await;
        let mut client = HttpClient::new(HttpVersion::Http11);
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, HttpError::MalformedStatusLine(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn captures_heads_when_asked() {
        let (url, _) = serve(OK).await;
        let mut client = HttpClient::builder().capture_heads(true).build();
        let res = client.get(&url).await.unwrap();
        let request_head = res.request_head.unwrap();
        assert!(request_head.starts_with("GET / HTTP/1.1\r\nHOST: 127.0.0.1\r\n"));
        assert_eq!(res.response_head.as_deref(), Some("HTTP/1.1 200 OK\nContent-Length: 5\n\n"));
    }
}
