use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use typed_builder::TypedBuilder;

use crate::http::error::HttpError;
use crate::http::request::TargetRequest;
use crate::shutdown::Shutdown;

/// Fixed deadline for establishing a connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// An open connection, plain or TLS.
#[derive(Debug)]
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_flush(cx),
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Connection::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Connection::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Dials TCP or TLS-over-TCP connections.
///
/// The TLS configuration is built once and shared read-only by every clone.
#[derive(Clone, Debug, TypedBuilder)]
pub struct Connector {
    #[builder(default = DIAL_TIMEOUT)]
    timeout: Duration,
    #[builder(default = default_tls_config())]
    tls: Arc<ClientConfig>,
}

impl Default for Connector {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Connector {
    /// Dial `request.address()`, racing the dial against the timeout and `shutdown`.
    ///
    /// Never retries.
    pub async fn connect(
        &self,
        request: &TargetRequest,
        shutdown: &mut Shutdown,
    ) -> Result<Connection, HttpError> {
        self.race(self.dial(request), shutdown).await
    }

    /// Bound `dial` by the connector's timeout and abandon it once `shutdown` fires.
    async fn race<F>(&self, dial: F, shutdown: &mut Shutdown) -> Result<Connection, HttpError>
    where
        F: Future<Output = Result<Connection, HttpError>>,
    {
        tokio::select! {
            res = tokio::time::timeout(self.timeout, dial) => {
                res.map_err(|_| HttpError::DialTimeout(self.timeout))?
            }
            _ = shutdown.triggered() => Err(HttpError::Cancelled),
        }
    }

    async fn dial(&self, request: &TargetRequest) -> Result<Connection, HttpError> {
        let tcp = TcpStream::connect(request.address())
            .await
            .map_err(HttpError::DialFailure)?;
        // Request heads are small and written in one go.
        let _ = tcp.set_nodelay(true);

        if !request.use_tls() {
            tracing::trace!(address = request.address(), "plain connection established");
            return Ok(Connection::Plain(tcp));
        }

        let name = ServerName::try_from(request.server_name().to_string()).map_err(|e| {
            HttpError::DialFailure(io::Error::new(io::ErrorKind::InvalidInput, e))
        })?;
        let stream = TlsConnector::from(Arc::clone(&self.tls))
            .connect(name, tcp)
            .await
            .map_err(HttpError::DialFailure)?;
        tracing::trace!(address = request.address(), "tls connection established");
        Ok(Connection::Tls(Box::new(stream)))
    }
}

fn default_tls_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map(|builder| {
        builder
            .with_root_certificates(roots.clone())
            .with_no_client_auth()
    })
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to the process-default TLS provider");
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    });
    Arc::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::HttpVersion;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn dials_plain_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.is_ok() });

        let request =
            TargetRequest::build(&format!("http://127.0.0.1:{port}/"), HttpVersion::Http11)
                .unwrap();
        let conn = Connector::default()
            .connect(&request, &mut Shutdown::never())
            .await
            .unwrap();
        assert!(matches!(conn, Connection::Plain(_)));
        assert!(accept.await.unwrap());
    }

    #[tokio::test]
    async fn refused_dial_is_a_dial_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let request =
            TargetRequest::build(&format!("http://127.0.0.1:{port}/"), HttpVersion::Http11)
                .unwrap();
        let err = Connector::default()
            .connect(&request, &mut Shutdown::never())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::DialFailure(_)), "{err}");
    }

    #[tokio::test]
    async fn raised_shutdown_cancels_the_dial() {
        let (mut shutdown, tx) = Shutdown::new();
        tx.send(true).unwrap();
        let err = Connector::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .race(std::future::pending(), &mut shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Cancelled), "{err}");
    }

    #[tokio::test]
    async fn shutdown_during_a_stalled_dial() {
        let (mut shutdown, tx) = Shutdown::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
        });
        let err = Connector::default()
            .race(std::future::pending(), &mut shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Cancelled), "{err}");
    }

    #[tokio::test]
    async fn stalled_dial_times_out() {
        let timeout = Duration::from_millis(50);
        let err = Connector::builder()
            .timeout(timeout)
            .build()
            .race(std::future::pending(), &mut Shutdown::never())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::DialTimeout(t) if t == timeout), "{err}");
    }

    #[tokio::test]
    async fn dial_error_passes_through_the_race() {
        let err = Connector::default()
            .race(
                async { Err(HttpError::DialFailure(io::ErrorKind::ConnectionRefused.into())) },
                &mut Shutdown::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::DialFailure(_)), "{err}");
    }

    #[test]
    fn ipv6_literal_is_a_valid_tls_name() {
        let request = TargetRequest::build("https://[::1]:8443/", HttpVersion::Http11).unwrap();
        let name = ServerName::try_from(request.server_name().to_string()).unwrap();
        assert!(matches!(name, ServerName::IpAddress(_)));
    }

    #[tokio::test]
    async fn tls_handshake_against_plain_server_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket
                    .write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
                    .await;
            }
        });

        let request =
            TargetRequest::build(&format!("https://127.0.0.1:{port}/"), HttpVersion::Http11)
                .unwrap();
        assert!(request.use_tls());
        let err = Connector::default()
            .connect(&request, &mut Shutdown::never())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::DialFailure(_)), "{err}");
    }
}
