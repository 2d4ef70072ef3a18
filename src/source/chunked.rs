//! Chunked transfer-encoding framer (RFC 7230 section 4.1).
//!
//! Wire format: `<hex-length>[;ext]CRLF<payload>CRLF`, ended by a zero-length chunk.
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::FramingError;

/// Upper bound for a length line, terminator included.
pub const MAX_LENGTH_LINE: usize = 1024;

/// Default upper bound for a single chunk payload (16 MiB).
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 16 * 1024 * 1024;

/// Reconstructs chunk payloads from a buffered byte source.
pub struct ChunkReader<R> {
    source: R,
    max_chunk_len: usize,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> ChunkReader<R> {
    pub fn new(source: R, max_chunk_len: usize) -> ChunkReader<R> {
        ChunkReader {
            source,
            max_chunk_len,
            finished: false,
        }
    }

    /// Returns the next payload, or `None` once the zero-length chunk was seen.
    ///
    /// Nothing past the zero-length chunk's length line is ever read.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        if self.finished {
            return Ok(None);
        }
        let line = self.read_length_line().await?;
        let len = parse_length(&line)?;
        if len == 0 {
            self.finished = true;
            return Ok(None);
        }
        if len > self.max_chunk_len as u64 {
            return Err(FramingError::ChunkTooLarge {
                len,
                max: self.max_chunk_len,
            });
        }

        let mut payload = vec![0u8; len as usize];
        self.source
            .read_exact(&mut payload)
            .await
            .map_err(|e| closed_or_io(e, "chunk payload"))?;
        let mut terminator = [0u8; 2];
        self.source
            .read_exact(&mut terminator)
            .await
            .map_err(|e| closed_or_io(e, "chunk terminator"))?;
        if &terminator != b"\r\n" {
            return Err(FramingError::MissingTerminator(terminator));
        }

        Ok(Some(payload))
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    // a bare LF does not end the line, only CRLF does
    async fn read_length_line(&mut self) -> Result<Vec<u8>, FramingError> {
        let mut line = Vec::with_capacity(8);
        loop {
            if line.len() >= MAX_LENGTH_LINE {
                return Err(FramingError::LengthLineTooLong(MAX_LENGTH_LINE));
            }
            let limit = (MAX_LENGTH_LINE - line.len()) as u64;
            let n = (&mut self.source)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await?;
            if n == 0 {
                return Err(FramingError::StreamClosed("chunk length line"));
            }
            if line.ends_with(b"\r\n") {
                line.truncate(line.len() - 2);
                return Ok(line);
            }
        }
    }
}

fn parse_length(line: &[u8]) -> Result<u64, FramingError> {
    let text = String::from_utf8_lossy(line);
    // chunk extensions are ignored
    let size = text.split(';').next().unwrap_or_default().trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FramingError::InvalidLength(text.into_owned()));
    }
    u64::from_str_radix(size, 16).map_err(|_| FramingError::InvalidLength(text.into_owned()))
}

fn closed_or_io(e: std::io::Error, what: &'static str) -> FramingError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FramingError::StreamClosed(what)
    } else {
        FramingError::Io(e)
    }
}
