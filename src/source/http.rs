//! Plain HTTP/1.1 connector for the chunked event stream.
//!
//! The response body is handed over untouched so the chunk framing can be
//! reconstructed by [`ChunkReader`](super::chunked::ChunkReader).
use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::settings::Stream;

const DEFAULT_PORT: u16 = 80;
const MAX_HEADER_LINES: usize = 128;

/// Opens the stream and consumes the response head.
pub async fn connect(settings: &Stream) -> Result<BufReader<TcpStream>> {
    let addr = if settings.host.contains(':') {
        settings.host.clone()
    } else {
        format!("{}:{}", settings.host, DEFAULT_PORT)
    };
    let mut conn = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connecting to {addr}"))?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nUser-Agent: rsvp-listener/{}\r\n\r\n",
        settings.path,
        settings.host,
        env!("CARGO_PKG_VERSION"),
    );
    conn.write_all(request.as_bytes())
        .await
        .context("sending request")?;

    let mut reader = BufReader::new(conn);
    read_response_head(&mut reader).await?;
    tracing::info!("connected to http://{}{}", settings.host, settings.path);
    Ok(reader)
}

/// Checks the status line and headers; leaves the reader at the first body byte.
async fn read_response_head<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
    let status = read_line(reader).await?;
    let code = status.split_whitespace().nth(1).unwrap_or_default();
    if code != "200" {
        bail!("unexpected response status: {status}");
    }

    let mut chunked = false;
    for _ in 0..MAX_HEADER_LINES {
        let line = read_line(reader).await?;
        if line.is_empty() {
            if !chunked {
                bail!("response is not chunked");
            }
            return Ok(());
        }
        if let Some((name, value)) = line.split_once(':') {
            tracing::debug!("response header {}: {}", name.trim(), value.trim());
            if name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
            {
                chunked = true;
            }
        }
    }
    Err(anyhow!("response head exceeds {MAX_HEADER_LINES} lines"))
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        bail!("connection closed while reading response head");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
