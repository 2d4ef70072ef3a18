//! Fakes and fixtures shared by the unit tests.
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use crate::error::SinkError;
use crate::projector::Record;
use crate::sink::Sink;
use crate::source::events::RawEvent;
use crate::source::ByteSource;

/// Frames payloads with chunked transfer-encoding, including the final zero-length chunk.
pub fn chunked(payloads: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in payloads {
        out.extend_from_slice(format!("{:x}\r\n", p.len()).as_bytes());
        out.extend_from_slice(p);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

/// Trimmed-down Meetup RSVP notification.
pub fn rsvp_event(time: i64) -> RawEvent {
    json!({
        "venue": {"venue_name": "Betahaus", "venue_id": 24628300},
        "visibility": "public",
        "response": "yes",
        "guests": 0,
        "member": {"member_id": 185623432, "member_name": "Ada"},
        "rsvp_id": 1833409287,
        "mtime": 1589471964418i64,
        "event": {
            "event_name": "Rust Meetup",
            "event_id": "270944216",
            "time": time,
            "event_url": "https://www.meetup.com/rust-berlin/events/270944216/"
        },
        "group": {
            "group_city": "Berlin",
            "group_country": "de",
            "group_id": 18585396,
            "group_name": "Rust Berlin",
            "group_lon": 13.38,
            "group_lat": 52.52
        }
    })
}

pub fn rsvp_payload(event_id: &str) -> Vec<u8> {
    let mut event = rsvp_event(1589472001234);
    event["event"]["event_id"] = json!(event_id);
    serde_json::to_vec(&event).unwrap()
}

pub fn record(event_id: &str) -> Record {
    Record {
        city: String::from("Berlin"),
        latitude: 52.52,
        longitude: 13.38,
        date: String::from("20200514"),
        event_id: event_id.to_owned(),
        group_id: String::from("18585396"),
        member_id: String::from("185623432"),
    }
}

/// Byte source over any buffered reader that counts `close` calls.
pub struct TestSource<R> {
    inner: R,
    closes: Arc<AtomicUsize>,
}

impl TestSource<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        TestSource::new(Cursor::new(bytes))
    }
}

impl<R> TestSource<R> {
    pub fn new(inner: R) -> Self {
        TestSource {
            inner,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TestSource<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<R: AsyncBufRead + Unpin> AsyncBufRead for TestSource<R> {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<&[u8]>> {
        Pin::new(&mut self.get_mut().inner).poll_fill_buf(cx)
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.get_mut().inner).consume(amt)
    }
}

impl<R: AsyncBufRead + Unpin> ByteSource for TestSource<R> {
    async fn close(&mut self) -> std::io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct SinkState {
    pub committed: Vec<Record>,
    pub rollbacks: usize,
    pub closes: usize,
}

/// In-memory sink; optionally rejects the n-th commit (1-based).
#[derive(Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
    pending: Option<Vec<Record>>,
    fail_on: Option<usize>,
    fail_close: bool,
    commits: usize,
}

impl MemorySink {
    pub fn failing_on(commit: usize) -> Self {
        MemorySink {
            fail_on: Some(commit),
            ..Default::default()
        }
    }

    pub fn failing_close() -> Self {
        MemorySink {
            fail_close: true,
            ..Default::default()
        }
    }

    pub fn state(&self) -> Arc<Mutex<SinkState>> {
        Arc::clone(&self.state)
    }

    pub fn committed(&self) -> Vec<Record> {
        self.state.lock().unwrap().committed.clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }
}

impl Sink for MemorySink {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.pending = Some(Vec::new());
        Ok(())
    }

    async fn execute(&mut self, record: &Record) -> Result<(), SinkError> {
        self.pending
            .as_mut()
            .ok_or(SinkError::NoTransaction)?
            .push(record.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        let pending = self.pending.take().ok_or(SinkError::NoTransaction)?;
        self.commits += 1;
        if self.fail_on == Some(self.commits) {
            return Err(SinkError::Rejected(format!("commit #{}", self.commits)));
        }
        self.state.lock().unwrap().committed.extend(pending);
        Ok(())
    }

    async fn rollback(&mut self) {
        self.pending = None;
        self.state.lock().unwrap().rollbacks += 1;
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.state.lock().unwrap().closes += 1;
        if self.fail_close {
            return Err(SinkError::Rejected(String::from("close")));
        }
        Ok(())
    }
}
