//! ## rsvp-listener
//! Long-running listener that ingests the Meetup RSVP stream into ClickHouse.
//!
//! ## Installation
//! Just use cargo.
//!
//! ## Configuration
//! Example config:
//! ```toml
//! projector = "rsvp"
//! custom.timezone = "Europe/Berlin"   # date column zone (default: local time)
//!
//! [stream]
//! host = "stream.meetup.com"
//! path = "/2/rsvps"
//! max_chunk_bytes = 1048576
//!
//! [sink]
//! host = "localhost:9000"
//! user = "default"
//! password = ""
//! database = "meetup"
//! table = "cities"
//! ```
//! Any key can be overridden from the environment, e.g. `RSVP_SINK__PASSWORD`.
//!
//! ## How it works
//! The stream is a plain HTTP/1.1 response with chunked transfer-encoding,
//! one RSVP notification per chunk. [ChunkReader] rebuilds the chunks from the
//! raw body, [EventDecoder] turns them into JSON events (skipping anything that
//! is not JSON), a [Projector] reduces each event to a seven-column [Record],
//! and the [Pipeline] writes every record in its own transaction.
//!
//! Records are written strictly in stream order, one at a time. Events lacking
//! a required field or carrying an unreadable timestamp are logged and skipped;
//! framing and sink failures stop the listener. On every exit path both
//! connections are released exactly once.
//!
//! Run with `--init-table` once to (re)create the target table.
//!
//! [ChunkReader]: source::chunked::ChunkReader
//! [EventDecoder]: source::events::EventDecoder
//! [Projector]: projector::Projector
//! [Record]: projector::Record
//! [Pipeline]: pipeline::Pipeline

pub mod error;
pub mod pipeline;
pub mod projector;
pub mod settings;
pub mod sink;
pub mod source;

#[cfg(test)]
mod testing;
