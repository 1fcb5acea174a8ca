//! HTTP/1.x response reader.
//!
//! Parsing walks `StatusLine -> Headers -> Body` once, without going
//! back. The raw stream is wrapped in a [`CountingReader`] before the first read
//! so the transport byte count covers the status line, headers and body.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::http::chunked::ChunkedDecoder;
use crate::http::counting::CountingReader;
use crate::http::error::HttpError;

/// Where the reader was when it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadState {
    StatusLine,
    Headers,
    Body,
}

impl fmt::Display for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadState::StatusLine => "status line",
            ReadState::Headers => "headers",
            ReadState::Body => "body",
        };
        f.write_str(s)
    }
}

/// A fully read response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    /// Status line minus the protocol version, e.g. `200 OK`.
    pub status: String,
    pub status_code: u16,
    /// `-1` when the body is chunked, `0` when no length was announced.
    pub content_length: i64,
    pub chunked: bool,
    /// The peer asked for `Connection: close`; the caller must drop the connection.
    pub close: bool,
    pub body: Vec<u8>,
    /// Bytes read off the wire for this response.
    pub transport_bytes: u64,
    /// Status line and header lines exactly as read, when head capture is on.
    pub head: Option<String>,
}

/// Framing facts gathered from the header section.
#[derive(Debug, Default)]
struct Framing {
    content_length: i64,
    chunked: bool,
    close: bool,
}

/// Read one response off `stream`.
///
/// With `capture_head` set the status line and headers are also kept verbatim
/// in [`RawResponse::head`].
pub async fn read_response<R>(stream: R, capture_head: bool) -> Result<RawResponse, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(CountingReader::new(stream));
    let mut head = capture_head.then(String::new);

    let (status, status_code) = read_status_line(&mut reader, head.as_mut()).await?;
    let framing = read_headers(&mut reader, head.as_mut()).await?;
    let body = read_body(&mut reader, &framing).await?;

    Ok(RawResponse {
        status,
        status_code,
        content_length: framing.content_length,
        chunked: framing.chunked,
        close: framing.close,
        body,
        transport_bytes: reader.get_ref().count(),
        head,
    })
}

/// One line without its `\n` / `\r\n` terminator; `None` on a clean end-of-stream.
pub(crate) async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

async fn read_status_line<R>(
    reader: &mut R,
    head: Option<&mut String>,
) -> Result<(String, u16), HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader)
        .await
        .map_err(HttpError::Read)?
        .ok_or(HttpError::UnexpectedEndOfStream(ReadState::StatusLine))?;
    if let Some(head) = head {
        head.push_str(&line);
        head.push('\n');
    }
    parse_status_line(&line)
}

/// Split `HTTP/1.1 200 OK` into (`200 OK`, 200).
fn parse_status_line(line: &str) -> Result<(String, u16), HttpError> {
    let (_, rest) = line
        .split_once(' ')
        .ok_or_else(|| HttpError::MalformedStatusLine(line.to_string()))?;
    let status = rest.trim().to_string();
    let code = status.split(' ').next().unwrap_or("");
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::MalformedStatusLine(line.to_string()));
    }
    let status_code = code
        .parse::<u16>()
        .map_err(|_| HttpError::MalformedStatusLine(line.to_string()))?;
    if status_code < 100 {
        return Err(HttpError::MalformedStatusLine(line.to_string()));
    }
    Ok((status, status_code))
}

async fn read_headers<R>(reader: &mut R, mut head: Option<&mut String>) -> Result<Framing, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut framing = Framing::default();
    loop {
        let line = read_line(reader)
            .await
            .map_err(HttpError::Read)?
            .ok_or(HttpError::UnexpectedEndOfStream(ReadState::Headers))?;
        if let Some(head) = head.as_deref_mut() {
            head.push_str(&line);
            head.push('\n');
        }
        if line.is_empty() {
            return Ok(framing);
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_ascii_lowercase();
        match key.as_str() {
            "content-length" => {
                framing.content_length = value
                    .parse::<i64>()
                    .map_err(|_| HttpError::MalformedHeader(line.clone()))?;
            }
            "transfer-encoding" => {
                if value != "chunked" {
                    return Err(HttpError::UnsupportedEncoding(value));
                }
                framing.content_length = -1;
                framing.chunked = true;
            }
            "connection" => {
                if value == "close" {
                    framing.close = true;
                }
            }
            "trailer" => return Err(HttpError::UnsupportedFeature("chunked trailer")),
            _ => {}
        }
    }
}

async fn read_body<R>(reader: &mut R, framing: &Framing) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    if framing.close {
        match reader.read_to_end(&mut body).await {
            Ok(_) => {}
            // TLS peers that hang up without close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
            Err(e) => return Err(HttpError::Read(e)),
        }
    } else if framing.content_length > 0 {
        let want = framing.content_length as u64;
        let n = (&mut *reader)
            .take(want)
            .read_to_end(&mut body)
            .await
            .map_err(HttpError::Read)?;
        if (n as u64) < want {
            return Err(HttpError::UnexpectedEndOfStream(ReadState::Body));
        }
    } else if framing.chunked {
        ChunkedDecoder::new(reader).read_to_end(&mut body).await?;
    }
    Ok(body)
}
