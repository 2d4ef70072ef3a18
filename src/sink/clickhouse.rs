//! ClickHouse sink
use clickhouse_rs::{types::Value, Block, ClientHandle, Pool};

use super::Sink;
use crate::error::SinkError;
use crate::projector::Record;
use crate::settings;

/// ClickHouse row - vector of columns, each column is tuple of its name and value
pub type Row = Vec<(String, Value)>;

pub struct ClickHouseSink {
    handle: Option<ClientHandle>,
    table: String,
    pending: Option<Block>,
}

impl ClickHouseSink {
    pub async fn connect(settings: &settings::Sink, table: &str) -> Result<Self, SinkError> {
        let pool = Pool::new(settings.url());
        let handle = pool.get_handle().await?;
        tracing::info!(
            "connected to ClickHouse at {}, database {}, table {}",
            settings.host,
            settings.database,
            table
        );
        Ok(ClickHouseSink {
            handle: Some(handle),
            table: table.to_owned(),
            pending: None,
        })
    }

    /// Drops and recreates the target table. Any content is deleted.
    pub async fn create_table(&mut self) -> Result<(), SinkError> {
        let ch = self.handle.as_mut().ok_or(SinkError::Closed)?;
        ch.execute(format!("DROP TABLE IF EXISTS {}", self.table))
            .await?;
        ch.execute(format!(
            "CREATE TABLE {} (
                city String,
                lat Float64,
                lon Float64,
                date String,
                eid String,
                gid String,
                mid String
            ) ENGINE = MergeTree ORDER BY tuple()",
            self.table
        ))
        .await?;
        tracing::info!("created table {}", self.table);
        Ok(())
    }
}

/// Column layout of the `cities` table
pub fn to_row(record: &Record) -> Row {
    vec![
        (String::from("city"), Value::from(record.city.clone())),
        (String::from("lat"), Value::from(record.latitude)),
        (String::from("lon"), Value::from(record.longitude)),
        (String::from("date"), Value::from(record.date.clone())),
        (String::from("eid"), Value::from(record.event_id.clone())),
        (String::from("gid"), Value::from(record.group_id.clone())),
        (String::from("mid"), Value::from(record.member_id.clone())),
    ]
}

impl Sink for ClickHouseSink {
    // a transaction is a single pending block, inserted atomically on commit
    async fn begin(&mut self) -> Result<(), SinkError> {
        if self.handle.is_none() {
            return Err(SinkError::Closed);
        }
        self.pending = Some(Block::with_capacity(1));
        Ok(())
    }

    async fn execute(&mut self, record: &Record) -> Result<(), SinkError> {
        let block = self.pending.as_mut().ok_or(SinkError::NoTransaction)?;
        block.push(to_row(record))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        let block = self.pending.take().ok_or(SinkError::NoTransaction)?;
        let ch = self.handle.as_mut().ok_or(SinkError::Closed)?;
        ch.insert(&self.table, block).await?;
        Ok(())
    }

    async fn rollback(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("rolled back pending insert into {}", self.table);
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.pending = None;
        if self.handle.take().is_some() {
            tracing::info!("ClickHouse connection closed");
        }
        Ok(())
    }
}
