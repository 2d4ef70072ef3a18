//! Persistent store the records are appended to.
pub mod clickhouse;

use crate::error::SinkError;
use crate::projector::Record;

/// Transactional append-only store.
///
/// A record is written with `begin`, `execute` and `commit`; nothing becomes
/// visible before `commit` returns successfully.
#[allow(async_fn_in_trait)]
pub trait Sink {
    async fn begin(&mut self) -> Result<(), SinkError>;
    async fn execute(&mut self, record: &Record) -> Result<(), SinkError>;
    async fn commit(&mut self) -> Result<(), SinkError>;
    /// Abandons the open transaction, if any.
    async fn rollback(&mut self);
    /// Releases the connection. Later calls are no-ops.
    async fn close(&mut self) -> Result<(), SinkError>;
}

/// Writes one record in its own transaction; on failure the transaction is
/// rolled back and the error returned.
pub async fn append<S: Sink>(sink: &mut S, record: &Record) -> Result<(), SinkError> {
    sink.begin().await?;
    let result = match sink.execute(record).await {
        Ok(()) => sink.commit().await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        sink.rollback().await;
    }
    result
}

/// Closes the sink; a failure is logged, not returned.
pub async fn release<S: Sink>(sink: &mut S) {
    if let Err(e) = sink.close().await {
        tracing::warn!("closing sink: {e}");
    }
}
