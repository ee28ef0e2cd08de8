use crate::{
    errors::ChatError,
    providers::db::storage::Storage,
    types::{QueryResult, Row as JsonRow},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde_json::Value;
use std::{
    error::Error,
    fmt::{self, Debug, Write},
    str::FromStr,
};
use tokio_postgres::{
    types::{FromSql, Type},
    NoTls, Row, SimpleQueryMessage,
};
use tracing::{debug, debug_span, Instrument};
use uuid::Uuid;

/// The default maximum number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// A provider for executing SQL against PostgreSQL through a connection pool.
///
/// Cloning is cheap and shares the same pool, so every concurrent request
/// acquires its own connection.
#[derive(Clone)]
pub struct PostgresProvider {
    pool: Pool,
}

impl PostgresProvider {
    /// Creates a provider from a `postgres://` or `postgresql://` connection string.
    ///
    /// The string is parsed once here; no connection is opened until the first query.
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, ChatError> {
        let pg_config = parse_database_url(database_url)?;
        Self::from_config(pg_config, max_size)
    }

    /// Creates a provider from an already built `tokio_postgres::Config`.
    pub fn from_config(
        pg_config: tokio_postgres::Config,
        max_size: usize,
    ) -> Result<Self, ChatError> {
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Acquires a connection and runs a trivial query.
    pub async fn check_connection(&self) -> Result<(), ChatError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| ChatError::StorageConnection(e.to_string()))?;
        Ok(())
    }
}

impl Debug for PostgresProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresProvider")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .finish_non_exhaustive()
    }
}

/// Parses a connection string, rejecting anything that is not a Postgres URL.
pub fn parse_database_url(database_url: &str) -> Result<tokio_postgres::Config, ChatError> {
    let url = database_url.trim();
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        return Err(ChatError::InvalidConnectionString(
            "DATABASE_URL must start with postgresql://".to_string(),
        ));
    }
    tokio_postgres::Config::from_str(url)
        .map_err(|e| ChatError::InvalidConnectionString(e.to_string()))
}

#[async_trait]
impl Storage for PostgresProvider {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, ChatError> {
        if sql.trim().is_empty() {
            return Err(ChatError::EmptyQuery);
        }

        let span = debug_span!(
            "db.query",
            sql = %sql,
            rows = tracing::field::Empty,
        );

        let client = self.pool.get().instrument(span.clone()).await?;

        // A prepared statement holds exactly one command.
        if is_multi_statement(sql) {
            let messages = client.simple_query(sql).instrument(span.clone()).await?;
            let result = last_result_set(messages);
            span.record("rows", result.row_count());
            debug!(columns = result.columns.len(), rows = result.row_count(), "<-- Multi-statement query materialized");
            return Ok(result);
        }

        let statement = client.prepare(sql).instrument(span.clone()).await?;
        let rows = client
            .query(&statement, &[])
            .instrument(span.clone())
            .await?;
        span.record("rows", rows.len());

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = rows
            .iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(columns = columns.len(), rows = rows.len(), "<-- Query materialized");
        Ok(QueryResult { columns, rows })
    }
}

/// True when `sql` holds a `;` before its final terminator.
///
/// A `;` inside a string literal also counts; such a statement then runs
/// through the simple protocol, which handles single statements as well.
pub fn is_multi_statement(sql: &str) -> bool {
    sql.trim().trim_end_matches(';').contains(';')
}

/// Keeps the result of the last statement of a simple-protocol batch.
/// Values arrive in text form.
fn last_result_set(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut current = QueryResult::default();
    let mut last = QueryResult::default();
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                current.columns = columns.iter().map(|c| c.name().to_string()).collect();
            }
            SimpleQueryMessage::Row(row) => {
                if current.columns.is_empty() {
                    current.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let map = current
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| {
                        let value = row
                            .get(idx)
                            .map(|v| Value::String(v.to_string()))
                            .unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect();
                current.rows.push(map);
            }
            SimpleQueryMessage::CommandComplete(_) => {
                last = std::mem::take(&mut current);
            }
            _ => {}
        }
    }
    last
}

fn row_to_json(row: &Row) -> Result<JsonRow, ChatError> {
    let mut map = JsonRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_to_json(row, idx, column.type_())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

/// Converts one column of a row to JSON based on its Postgres type.
///
/// Types without a mapping are rendered from their wire bytes: UTF-8 text
/// (enums, domains over text) as a string, anything else as `\x` hex.
fn column_to_json(row: &Row, idx: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::from),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(float4_to_json),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::from),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)?
            .map(decimal_to_json),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::String)
        }
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(timestamp_to_json),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|t| Value::String(t.to_rfc3339())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| Value::String(d.to_string())),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::String(t.to_string())),
        Type::UUID => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(|u| Value::String(u.to_string())),
        Type::INTERVAL => row
            .try_get::<_, Option<PgInterval>>(idx)?
            .map(|i| Value::String(i.to_string())),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?,
        Type::BOOL_ARRAY => array_to_json(row, idx, |v: bool| Value::from(v))?,
        Type::INT2_ARRAY => array_to_json(row, idx, |v: i16| Value::from(v))?,
        Type::INT4_ARRAY => array_to_json(row, idx, |v: i32| Value::from(v))?,
        Type::INT8_ARRAY => array_to_json(row, idx, |v: i64| Value::from(v))?,
        Type::FLOAT4_ARRAY => array_to_json(row, idx, float4_to_json)?,
        Type::FLOAT8_ARRAY => array_to_json(row, idx, |v: f64| Value::from(v))?,
        Type::NUMERIC_ARRAY => array_to_json(row, idx, decimal_to_json)?,
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
            array_to_json(row, idx, Value::String)?
        }
        Type::TIMESTAMP_ARRAY => array_to_json(row, idx, timestamp_to_json)?,
        Type::TIMESTAMPTZ_ARRAY => {
            array_to_json(row, idx, |t: DateTime<Utc>| Value::String(t.to_rfc3339()))?
        }
        Type::DATE_ARRAY => array_to_json(row, idx, |d: NaiveDate| Value::String(d.to_string()))?,
        Type::UUID_ARRAY => array_to_json(row, idx, |u: Uuid| Value::String(u.to_string()))?,
        Type::INTERVAL_ARRAY => {
            array_to_json(row, idx, |i: PgInterval| Value::String(i.to_string()))?
        }
        Type::JSON_ARRAY | Type::JSONB_ARRAY => array_to_json(row, idx, |v: Value| v)?,
        ref other => {
            debug!(column = idx, pg_type = %other, "No mapping for column type, rendering raw value.");
            row.try_get::<_, Option<RawValue>>(idx)?.map(RawValue::into_json)
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Converts a one-dimensional array column, mapping `NULL` elements to `null`.
fn array_to_json<'a, T, F>(row: &'a Row, idx: usize, convert: F) -> Result<Option<Value>, tokio_postgres::Error>
where
    T: FromSql<'a>,
    F: Fn(T) -> Value,
{
    let items = row.try_get::<_, Option<Vec<Option<T>>>>(idx)?;
    Ok(items.map(|items| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map(&convert).unwrap_or(Value::Null))
                .collect(),
        )
    }))
}

fn float4_to_json(f: f32) -> Value {
    Value::from(f as f64)
}

fn timestamp_to_json(t: NaiveDateTime) -> Value {
    Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn decimal_to_json(d: Decimal) -> Value {
    d.to_f64()
        .map(Value::from)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

/// A Postgres `interval`, decoded from its binary form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgInterval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl<'a> FromSql<'a> for PgInterval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 16 {
            return Err(format!("invalid interval length {}", raw.len()).into());
        }
        Ok(Self {
            microseconds: i64::from_be_bytes(raw[0..8].try_into()?),
            days: i32::from_be_bytes(raw[8..12].try_into()?),
            months: i32::from_be_bytes(raw[12..16].try_into()?),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

/// Renders like Postgres' default `IntervalStyle`, e.g. `1 year 2 mons 3 days 04:05:06.5`.
impl fmt::Display for PgInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let (years, months) = (self.months / 12, self.months % 12);
        for (amount, unit) in [(years, "year"), (months, "mon"), (self.days, "day")] {
            if amount != 0 {
                let plural = if amount == 1 { "" } else { "s" };
                parts.push(format!("{amount} {unit}{plural}"));
            }
        }

        if self.microseconds != 0 || parts.is_empty() {
            let sign = if self.microseconds < 0 { "-" } else { "" };
            let total = self.microseconds.unsigned_abs();
            let (secs, micros) = (total / 1_000_000, total % 1_000_000);
            let mut time = format!(
                "{sign}{:02}:{:02}:{:02}",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            );
            if micros != 0 {
                let fraction = format!("{micros:06}");
                time.push('.');
                time.push_str(fraction.trim_end_matches('0'));
            }
            parts.push(time);
        }

        f.write_str(&parts.join(" "))
    }
}

/// The wire bytes of a value whose type has no dedicated mapping.
struct RawValue(Vec<u8>);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

impl RawValue {
    fn into_json(self) -> Value {
        match String::from_utf8(self.0) {
            Ok(text) => Value::String(text),
            Err(e) => {
                let hex = e.as_bytes().iter().fold(String::from("\\x"), |mut acc, b| {
                    let _ = write!(acc, "{b:02x}");
                    acc
                });
                Value::String(hex)
            }
        }
    }
}
