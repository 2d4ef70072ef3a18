//! Pipeline driver: stream events in, records out, one at a time.
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::PipelineError;
use crate::projector::Projector;
use crate::sink::{self, Sink};
use crate::source::events::EventDecoder;
use crate::source::ByteSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Starting,
    Running,
    Stopping,
    Failed,
    Closed,
}

/// How a run that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Zero-length chunk received.
    Exhausted,
    /// Shutdown requested.
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub events: u64,
    pub payloads_skipped: u64,
    pub projections_skipped: u64,
    pub records_written: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events, {} records written, {} payloads skipped, {} events skipped",
            self.events, self.records_written, self.payloads_skipped, self.projections_skipped
        )
    }
}

/// How a run ended, with the statistics gathered up to that point.
#[derive(Debug)]
pub struct Report {
    pub result: Result<Outcome, PipelineError>,
    pub stats: Stats,
}

pub struct Pipeline<R: ByteSource, S: Sink> {
    events: EventDecoder<R>,
    projector: Arc<dyn Projector + Send + Sync>,
    sink: S,
    state: State,
    stats: Stats,
}

impl<R: ByteSource, S: Sink> Pipeline<R, S> {
    /// Takes ownership of ready-to-use handles; nothing is opened here.
    pub fn new(
        events: EventDecoder<R>,
        projector: Arc<dyn Projector + Send + Sync>,
        sink: S,
    ) -> Pipeline<R, S> {
        Pipeline {
            events,
            projector,
            sink,
            state: State::Starting,
            stats: Stats::default(),
        }
    }

    /// Runs until the stream ends, `shutdown` turns true, or a fatal error.
    ///
    /// Both the sink and the byte source are closed exactly once before this
    /// returns, whichever way the loop ended.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Report {
        tracing::info!("listener is running, projector {}", self.projector.get_name());
        self.transition(State::Running);
        let result = self.process(&mut shutdown).await;
        self.transition(match &result {
            Ok(_) => State::Stopping,
            Err(_) => State::Failed,
        });
        let stats = self.close().await;
        Report { result, stats }
    }

    async fn process(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Outcome, PipelineError> {
        loop {
            if *shutdown.borrow() {
                return Ok(Outcome::Cancelled);
            }
            // an abandoned read is never resumed, so it cannot lose a record
            let next = tokio::select! {
                biased;
                _ = cancelled(shutdown) => return Ok(Outcome::Cancelled),
                next = self.events.next() => next?,
            };
            let Some(event) = next else {
                return Ok(Outcome::Exhausted);
            };
            self.stats.events = self.events.decoded();
            tracing::debug!("event: {event}");

            let record = match self.projector.project(&event) {
                Ok(record) => record,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("skipping event: {e}, event: {event}");
                    self.stats.projections_skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::debug!("unprojectable event: {event}");
                    return Err(e.into());
                }
            };
            tracing::debug!("record: {record:?}");

            sink::append(&mut self.sink, &record).await?;
            self.stats.records_written += 1;
        }
    }

    async fn close(mut self) -> Stats {
        sink::release(&mut self.sink).await;
        tracing::info!("sink connection closed");

        self.stats.events = self.events.decoded();
        self.stats.payloads_skipped = self.events.skipped();
        let mut source = self.events.into_inner();
        if let Err(e) = source.close().await {
            tracing::warn!("closing stream: {e}");
        }
        tracing::info!("stream connection closed");

        self.state = State::Closed;
        tracing::debug!("pipeline state: {:?}", self.state);
        self.stats
    }

    fn transition(&mut self, to: State) {
        tracing::debug!("pipeline state: {:?} -> {:?}", self.state, to);
        self.state = to;
    }
}

// resolves once shutdown is requested; never if the sender is gone
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
