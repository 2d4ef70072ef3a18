//! Byte source abstraction and the stream side of the pipeline.
pub mod chunked;
pub mod events;
pub mod http;

use tokio::io::{AsyncBufRead, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Buffered byte access to a chunked response body, plus a way to release
/// the underlying connection.
#[allow(async_fn_in_trait)]
pub trait ByteSource: AsyncBufRead + Unpin {
    async fn close(&mut self) -> std::io::Result<()>;
}

impl ByteSource for BufReader<TcpStream> {
    async fn close(&mut self) -> std::io::Result<()> {
        self.get_mut().shutdown().await
    }
}
