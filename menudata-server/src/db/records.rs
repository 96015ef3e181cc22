//! Record execution - runs a `QueryStatement` and decodes rows
//!
//! Rows become key-ordered JSON objects (column name -> value). Column types
//! are mapped by their MySQL type name; anything textual falls through to a
//! string and SQL NULL is always `null`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use menudata_core::QueryStatement;
use serde_json::Value;
use sqlx::mysql::{MySqlColumn, MySqlRow};
use sqlx::{Column, MySqlPool, Row, TypeInfo, ValueRef};

/// One result row, keys sorted by column name
pub type Record = BTreeMap<String, Value>;

/// Query execution error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("timed out waiting for a pooled connection")]
    PoolTimedOut,

    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),

    #[error("failed to decode column '{column}': {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::PoolTimedOut,
            other => Self::Sqlx(other),
        }
    }
}

/// Anything that can execute an objects statement (testable)
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, statement: &QueryStatement) -> Result<Vec<Record>, DbError>;
}

#[async_trait]
impl RecordSource for MySqlPool {
    async fn fetch(&self, statement: &QueryStatement) -> Result<Vec<Record>, DbError> {
        let mut query = sqlx::query(statement.sql());
        for binding in statement.bindings() {
            query = query.bind(binding.value.as_str());
        }

        let rows = query.fetch_all(self).await?;
        rows.iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: &MySqlRow) -> Result<Record, DbError> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column).map_err(|source| DbError::Decode {
            column: column.name().to_owned(),
            source,
        })?;
        record.insert(column.name().to_owned(), value);
    }
    Ok(record)
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> Result<Value, sqlx::Error> {
    let idx = column.ordinal();
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match column.type_info().name() {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(idx)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::from(row.try_get::<u64, _>(idx)?),
        "YEAR" => Value::from(row.try_get_unchecked::<i64, _>(idx)?),
        "FLOAT" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(idx)?),
        // Exact decimals keep their textual form
        "DECIMAL" => Value::String(row.try_get_unchecked::<String, _>(idx)?),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "DATETIME" => Value::String(
            row.try_get::<NaiveDateTime, _>(idx)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
        "JSON" => row.try_get::<Value, _>(idx)?,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            Value::String(STANDARD.encode(row.try_get_unchecked::<Vec<u8>, _>(idx)?))
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };

    Ok(value)
}

/// In-memory record source
///
/// Applies the statement's bindings as string equality on the stored rows,
/// preserving insertion order like an unindexed table scan.
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Vec<Record>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of statements executed so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch(&self, statement: &QueryStatement) -> Result<Vec<Record>, DbError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .rows
            .iter()
            .filter(|row| {
                statement.bindings().iter().all(|binding| {
                    row.get(binding.column).and_then(Value::as_str) == Some(binding.value.as_str())
                })
            })
            .cloned()
            .collect())
    }
}
