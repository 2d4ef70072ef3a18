//! Application config
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::source::chunked::DEFAULT_MAX_CHUNK_BYTES;

/// Event stream endpoint
#[derive(Deserialize, Debug, Clone)]
pub struct Stream {
    /// host of the stream, optionally with `:port` (default port 80)
    pub host: String,
    /// request path, e.g. `/2/rsvps`
    pub path: String,
    /// largest chunk accepted from the stream (default: 16 MiB)
    pub max_chunk_bytes: Option<usize>,
}

/// ClickHouse sink
#[derive(Deserialize, Debug, Clone)]
pub struct Sink {
    /// ClickHouse native protocol address, e.g. `localhost:9000`
    pub host: String,
    /// user name (default: "default")
    pub user: Option<String>,
    /// password (default: empty)
    pub password: Option<String>,
    /// database (schema) name
    pub database: String,
    /// table to insert into (default: "cities")
    pub table: Option<String>,
}

impl Sink {
    /// Connection URL understood by `clickhouse_rs::Pool`.
    pub fn url(&self) -> String {
        format!(
            "tcp://{}:{}@{}/{}",
            self.user.as_deref().unwrap_or("default"),
            self.password.as_deref().unwrap_or_default(),
            self.host,
            self.database
        )
    }
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    /// name of projector to use (default: "rsvp")
    pub projector: Option<String>,
    /// projector-specific configuration
    pub custom: Option<toml::Value>,
    pub stream: Stream,
    pub sink: Sink,
}

impl Settings {
    pub fn new(cfgfile: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(cfgfile).required(true))
            .add_source(
                Environment::with_prefix("RSVP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let mut settings: Settings = cfg.try_deserialize()?;
        settings.fill_defaults();
        Ok(settings)
    }

    fn fill_defaults(&mut self) {
        self.projector.get_or_insert_with(|| String::from("rsvp"));
        self.stream
            .max_chunk_bytes
            .get_or_insert(DEFAULT_MAX_CHUNK_BYTES);
        self.sink.user.get_or_insert_with(|| String::from("default"));
        self.sink.password.get_or_insert_with(String::new);
        self.sink.table.get_or_insert_with(|| String::from("cities"));
    }

    pub fn projector(&self) -> &str {
        self.projector.as_deref().unwrap_or("rsvp")
    }

    pub fn table(&self) -> &str {
        self.sink.table.as_deref().unwrap_or("cities")
    }

    pub fn max_chunk_bytes(&self) -> usize {
        self.stream.max_chunk_bytes.unwrap_or(DEFAULT_MAX_CHUNK_BYTES)
    }
}
