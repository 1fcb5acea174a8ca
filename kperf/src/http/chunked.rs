//! Streaming decoder for `Transfer-Encoding: chunked` bodies.
//!
//! The wire format is a sequence of `<hex size>\r\n<size bytes>\r\n` chunks
//! closed by a zero-size chunk and a blank line. Chunk extensions are skipped.
//! Trailer fields after the last chunk are not supported.

use std::io;

use tokio::io::{AsyncBufRead, AsyncReadExt};

use crate::http::error::HttpError;
use crate::http::response::{read_line, ReadState};

/// Pulls decoded chunks off a buffered stream, one at a time.
///
/// Once the terminal chunk has been consumed the decoder is exhausted and every
/// further call yields `None`; nothing past the terminator is read.
#[derive(Debug)]
pub struct ChunkedDecoder<R> {
    reader: R,
    done: bool,
}

impl<R: AsyncBufRead + Unpin> ChunkedDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Next chunk's payload, or `None` at the end of the body.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, HttpError> {
        if self.done {
            return Ok(None);
        }

        let line = read_line(&mut self.reader)
            .await
            .map_err(HttpError::Read)?
            .ok_or(HttpError::UnexpectedEndOfStream(ReadState::Body))?;
        let size = parse_chunk_size(&line)?;

        if size == 0 {
            match read_line(&mut self.reader).await.map_err(HttpError::Read)? {
                // Peer closed right after the last chunk.
                None => {}
                Some(l) if l.is_empty() => {}
                Some(_) => return Err(HttpError::UnsupportedFeature("chunked trailer")),
            }
            self.done = true;
            return Ok(None);
        }

        let mut data = Vec::new();
        let n = (&mut self.reader)
            .take(size)
            .read_to_end(&mut data)
            .await
            .map_err(HttpError::Read)?;
        if (n as u64) < size {
            return Err(HttpError::UnexpectedEndOfStream(ReadState::Body));
        }

        let mut crlf = [0u8; 2];
        self.reader.read_exact(&mut crlf).await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                HttpError::UnexpectedEndOfStream(ReadState::Body)
            } else {
                HttpError::Read(e)
            }
        })?;
        if &crlf != b"\r\n" {
            return Err(HttpError::MalformedChunk(
                "chunk data not followed by CRLF".to_string(),
            ));
        }

        Ok(Some(data))
    }

    /// Drain the remaining chunks into `out`, returning the decoded length.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, HttpError> {
        let mut total = 0;
        while let Some(chunk) = self.next_chunk().await? {
            total += chunk.len();
            out.extend_from_slice(&chunk);
        }
        Ok(total)
    }
}

fn parse_chunk_size(line: &str) -> Result<u64, HttpError> {
    let hex = line.split(';').next().unwrap_or("").trim();
    u64::from_str_radix(hex, 16)
        .map_err(|_| HttpError::MalformedChunk(format!("invalid chunk size {line:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const WIKIPEDIA: &[u8] = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";

    #[tokio::test]
    async fn decodes_wikipedia() {
        let mut decoder = ChunkedDecoder::new(WIKIPEDIA);
        let mut out = Vec::new();
        let n = decoder.read_to_end(&mut out).await.unwrap();
        assert_eq!(n, 9);
        assert_eq!(out, b"Wikipedia");
    }

    #[tokio::test]
    async fn ends_exactly_at_terminal_chunk() {
        let input: Vec<u8> = [WIKIPEDIA, b"NEXT".as_slice()].concat();
        let mut decoder = ChunkedDecoder::new(BufReader::new(input.as_slice()));

        assert_eq!(decoder.next_chunk().await.unwrap().unwrap(), b"Wiki");
        assert_eq!(decoder.next_chunk().await.unwrap().unwrap(), b"pedia");
        assert!(!decoder.is_done());
        assert!(decoder.next_chunk().await.unwrap().is_none());
        assert!(decoder.is_done());
        // Exhausted for good.
        assert!(decoder.next_chunk().await.unwrap().is_none());

        let mut rest = Vec::new();
        decoder.into_inner().read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"NEXT");
    }

    #[tokio::test]
    async fn survives_arbitrary_read_boundaries() {
        let stream = tokio_test::io::Builder::new()
            .read(b"4\r")
            .read(b"\nWi")
            .read(b"ki\r\n5")
            .read(b"\r\npedia\r\n0\r\n")
            .read(b"\r\n")
            .build();
        let mut decoder = ChunkedDecoder::new(BufReader::new(stream));
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Wikipedia");
    }

    #[tokio::test]
    async fn ignores_chunk_extensions_and_case() {
        let input = b"A;name=value\r\n0123456789\r\n0\r\n\r\n";
        let mut out = Vec::new();
        ChunkedDecoder::new(&input[..])
            .read_to_end(&mut out)
            .await
            .unwrap();
        assert_eq!(out, b"0123456789");
    }

    #[tokio::test]
    async fn rejects_bad_size() {
        let err = ChunkedDecoder::new(&b"zz\r\nabc\r\n"[..])
            .next_chunk()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::MalformedChunk(_)));
    }

    #[tokio::test]
    async fn rejects_missing_crlf_after_data() {
        let err = ChunkedDecoder::new(&b"3\r\nabcX\r\n"[..])
            .next_chunk()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::MalformedChunk(_)));
    }

    #[tokio::test]
    async fn trailer_after_last_chunk_is_unsupported() {
        let mut out = Vec::new();
        let err = ChunkedDecoder::new(&b"3\r\nabc\r\n0\r\nExpires: never\r\n\r\n"[..])
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedFeature(_)));
    }

    #[tokio::test]
    async fn premature_close_is_unexpected_eof() {
        let mut out = Vec::new();
        let err = ChunkedDecoder::new(&b"8\r\nabc"[..])
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HttpError::UnexpectedEndOfStream(ReadState::Body)
        ));

        let err = ChunkedDecoder::new(&b"3\r\nabc\r\n"[..])
            .read_to_end(&mut out)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HttpError::UnexpectedEndOfStream(ReadState::Body)
        ));
    }
}
