//! Lazy sequence of JSON events over a chunked stream.
use tokio::io::AsyncBufRead;

use super::chunked::ChunkReader;
use crate::error::FramingError;

/// Decoded RSVP notification, before projection.
pub type RawEvent = serde_json::Value;

/// Pull-based, single-pass decoder: each call to [`EventDecoder::next`]
/// reads chunks until one of them parses as JSON.
pub struct EventDecoder<R> {
    chunks: ChunkReader<R>,
    decoded: u64,
    skipped: u64,
}

impl<R: AsyncBufRead + Unpin> EventDecoder<R> {
    pub fn new(chunks: ChunkReader<R>) -> EventDecoder<R> {
        EventDecoder {
            chunks,
            decoded: 0,
            skipped: 0,
        }
    }

    /// Next event, or `None` at end of stream.
    ///
    /// Payloads that are empty or not JSON are logged and skipped; only
    /// framing errors end the sequence early.
    pub async fn next(&mut self) -> Result<Option<RawEvent>, FramingError> {
        while let Some(chunk) = self.chunks.next_chunk().await? {
            match decode(&chunk) {
                Ok(event) => {
                    self.decoded += 1;
                    return Ok(Some(event));
                }
                Err(DecodeError::Empty) => {
                    tracing::debug!("skipping empty payload ({} bytes)", chunk.len());
                    self.skipped += 1;
                }
                Err(DecodeError::Json(e, text)) => {
                    tracing::warn!("failed to decode payload: {e}, payload: {text:?}");
                    self.skipped += 1;
                }
            }
        }
        Ok(None)
    }

    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Number of payloads dropped because they were empty or not JSON.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn into_inner(self) -> R {
        self.chunks.into_inner()
    }
}

enum DecodeError {
    Empty,
    Json(serde_json::Error, String),
}

fn decode(payload: &[u8]) -> Result<RawEvent, DecodeError> {
    let text = String::from_utf8_lossy(payload);
    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    serde_json::from_str(&text).map_err(|e| DecodeError::Json(e, text.into_owned()))
}
