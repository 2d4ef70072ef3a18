use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rsvp_listener::{
    pipeline::{Outcome, Pipeline},
    projector::get_projector,
    settings::Settings,
    sink::{self, clickhouse::ClickHouseSink},
    source::{chunked::ChunkReader, events::EventDecoder, http},
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[doc(hidden)]
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: String,

    /// Drop and recreate the target table, then exit
    #[arg(long)]
    init_table: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::new(&args.config).context("cannot load config")?;
    let projector = get_projector(settings.projector(), settings.custom.clone())
        .context("failed to create projector")?;

    let mut sink = ClickHouseSink::connect(&settings.sink, settings.table())
        .await
        .context("connecting to ClickHouse")?;
    if args.init_table {
        let created = sink.create_table().await;
        sink::release(&mut sink).await;
        return created.context("creating table");
    }

    let source = match http::connect(&settings.stream).await {
        Ok(source) => source,
        Err(e) => {
            sink::release(&mut sink).await;
            return Err(e.context("connecting to stream"));
        }
    };

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("user stopped program");
        let _ = stop.send(true);
    });

    let events = EventDecoder::new(ChunkReader::new(source, settings.max_chunk_bytes()));
    let report = Pipeline::new(events, projector, sink).run(shutdown).await;
    tracing::info!("{}", report.stats);
    match report.result? {
        Outcome::Exhausted => tracing::info!("stream ended"),
        Outcome::Cancelled => tracing::info!("listener stopped"),
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
