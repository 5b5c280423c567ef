//! `PostgreSQL` Backend
//!
//! Opens `tokio-postgres` connections from decrypted credentials
//! (`url` is the host name).
//!
//! # Implementation Notes
//! - DB-API semantics: the first statement outside a transaction opens one
//!   implicitly; it stays open until `commit` or `rollback`
//! - Parameters are JSON values bound according to the prepared statement's
//!   parameter types; `null` binds as SQL NULL for any type
//! - JSON/JSONB preserved as nested JSON
//! - BYTEA data is Base64-encoded for JSON safety
//! - Connect deadline is the client's configured timeout
//! - `executescript` commits a pending transaction first; transaction
//!   control inside the script is tracked
//! - `sync` is a no-op

use async_trait::async_trait;
use base64::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::debug;

use crate::engine::{Backend, Connection, ConnectionFactory, Credentials, Rows, SharedConnection};
use crate::error::{FortressError, Result};
use crate::statement::{transaction_state_after, Statement, StatementKind, TransactionControl};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Factory for `PostgreSQL` connections
#[derive(Debug, Clone)]
pub struct PostgresEngine {
    connect_timeout: Duration,
}

impl PostgresEngine {
    /// Engine giving up on connects after `connect_timeout`
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ConnectionFactory for PostgresEngine {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn connect(&self, credentials: Credentials) -> Result<SharedConnection> {
        let connection = PostgresConnection::open(&credentials, self.connect_timeout).await?;
        Ok(Arc::new(connection))
    }
}

/// Live `PostgreSQL` connection
pub struct PostgresConnection {
    client: Client,
    in_transaction: AtomicBool,
    /// Serializes statements so implicit BEGIN and the statement stay together
    lock: Mutex<()>,
}

impl PostgresConnection {
    /// Connect with `credentials`
    pub async fn open(credentials: &Credentials, connect_timeout: Duration) -> Result<Self> {
        let pg_config = build_pg_config(credentials, connect_timeout)?;

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            FortressError::connection(format!("Failed to connect to PostgreSQL: {e}"))
        })?;

        // Drives the socket until the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "postgres connection closed");
            }
        });

        debug!(host = %credentials.url, database = %credentials.database, "postgres connection opened");

        Ok(Self { client, in_transaction: AtomicBool::new(false), lock: Mutex::new(()) })
    }

    async fn begin_implicit(&self, statement: &Statement) -> Result<()> {
        if statement.kind() != StatementKind::Transaction && !self.in_transaction() {
            self.client
                .batch_execute("BEGIN")
                .await
                .map_err(|e| FortressError::query_failed(format!("Failed to begin transaction: {e}")))?;
            self.in_transaction.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn track_transaction(&self, statements: &[Statement]) {
        let open = transaction_state_after(self.in_transaction(), statements);
        self.in_transaction.store(open, Ordering::SeqCst);
    }

    async fn finish_transaction(&self, command: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if !self.in_transaction() {
            return Ok(());
        }

        self.client
            .batch_execute(command)
            .await
            .map_err(|e| FortressError::query_failed(format!("{command} failed: {e}")))?;
        self.in_transaction.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<Rows> {
        let statement = Statement::parse(sql)?;
        let _guard = self.lock.lock().await;

        self.begin_implicit(&statement).await?;
        let rows = execute_query(&self.client, sql, params).await?;
        self.track_transaction(std::slice::from_ref(&statement));
        Ok(rows)
    }

    async fn executemany(&self, sql: &str, param_sets: &[Vec<serde_json::Value>]) -> Result<Rows> {
        let statement = Statement::parse(sql)?;
        let _guard = self.lock.lock().await;

        self.begin_implicit(&statement).await?;

        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to prepare query: {e}")))?;

        let mut total = 0u64;
        for params in param_sets {
            let bound = bind_params(params, stmt.params())?;
            let refs: Vec<&(dyn ToSql + Sync)> =
                bound.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
            total += self
                .client
                .execute(&stmt, &refs)
                .await
                .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;
        }

        Ok(Rows::with_rows_affected(total, None))
    }

    async fn executescript(&self, script: &str) -> Result<()> {
        let statements = Statement::parse_script(script)?;
        let _guard = self.lock.lock().await;

        if self.in_transaction() {
            self.client
                .batch_execute("COMMIT")
                .await
                .map_err(|e| FortressError::query_failed(format!("COMMIT failed: {e}")))?;
            self.in_transaction.store(false, Ordering::SeqCst);
        }

        if let Err(e) = self.client.batch_execute(script).await {
            // A BEGIN in the script may have left the server in an aborted
            // transaction; keep it tracked so rollback() clears it
            let opened = statements
                .iter()
                .any(|s| s.transaction_control() == Some(TransactionControl::Begin));
            self.in_transaction.store(opened, Ordering::SeqCst);
            return Err(FortressError::query_failed(format!("Failed to execute script: {e}")));
        }

        self.track_transaction(&statements);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.finish_transaction("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Build `tokio_postgres::Config` from credentials
fn build_pg_config(credentials: &Credentials, connect_timeout: Duration) -> Result<Config> {
    credentials.validate()?;

    let mut pg_config = Config::new();
    pg_config
        .host(&credentials.url)
        .port(credentials.port)
        .user(&credentials.username)
        .password(&credentials.password)
        .dbname(&credentials.database)
        .application_name("fortress-sdk")
        .connect_timeout(connect_timeout);

    Ok(pg_config)
}

/// Execute one statement and buffer its result
async fn execute_query(client: &Client, sql: &str, params: &[serde_json::Value]) -> Result<Rows> {
    let stmt = client
        .prepare(sql)
        .await
        .map_err(|e| FortressError::query_failed(format!("Failed to prepare query: {e}")))?;

    let bound = bind_params(params, stmt.params())?;
    let refs: Vec<&(dyn ToSql + Sync)> =
        bound.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

    // Check if this is a SELECT query (returns rows)
    if stmt.columns().is_empty() {
        let rows_affected = client
            .execute(&stmt, &refs)
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;
        return Ok(Rows::with_rows_affected(rows_affected, None));
    }

    let rows = client
        .query(&stmt, &refs)
        .await
        .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;

    let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
    let data = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;

    Ok(Rows::with_result_set(columns, data))
}

/// Bind JSON parameters to the statement's parameter types
fn bind_params(values: &[serde_json::Value], types: &[Type]) -> Result<Vec<BoxedParam>> {
    if values.len() != types.len() {
        return Err(FortressError::validation(format!(
            "Statement expects {} parameter(s), got {}",
            types.len(),
            values.len()
        )));
    }

    values.iter().zip(types).enumerate().map(|(idx, (value, ty))| json_to_sql(idx, value, ty)).collect()
}

/// `Some(None)` for JSON null, `Some(Some(v))` when `convert` accepts the value
fn nullable<T>(
    value: &serde_json::Value,
    convert: impl FnOnce(&serde_json::Value) -> Option<T>,
) -> Option<Option<T>> {
    if value.is_null() {
        Some(None)
    } else {
        convert(value).map(Some)
    }
}

fn json_to_sql(idx: usize, value: &serde_json::Value, ty: &Type) -> Result<BoxedParam> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    // Never echo the value itself
    let mismatch = || {
        FortressError::validation(format!(
            "Parameter {} cannot be bound as PostgreSQL type '{}'",
            idx + 1,
            ty.name()
        ))
    };

    let param: BoxedParam = match *ty {
        Type::BOOL => Box::new(nullable(value, serde_json::Value::as_bool).ok_or_else(mismatch)?),
        Type::INT2 => Box::new(
            nullable(value, |v| v.as_i64().and_then(|i| i16::try_from(i).ok())).ok_or_else(mismatch)?,
        ),
        Type::INT4 => Box::new(
            nullable(value, |v| v.as_i64().and_then(|i| i32::try_from(i).ok())).ok_or_else(mismatch)?,
        ),
        Type::INT8 => Box::new(nullable(value, serde_json::Value::as_i64).ok_or_else(mismatch)?),
        #[allow(clippy::cast_possible_truncation)]
        Type::FLOAT4 => {
            Box::new(nullable(value, |v| v.as_f64().map(|f| f as f32)).ok_or_else(mismatch)?)
        }
        Type::FLOAT8 => Box::new(nullable(value, serde_json::Value::as_f64).ok_or_else(mismatch)?),
        Type::JSON | Type::JSONB => {
            Box::new(nullable(value, |v| Some(v.clone())).ok_or_else(mismatch)?)
        }
        Type::BYTEA => Box::new(
            nullable(value, |v| {
                v.as_str().and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok())
            })
            .ok_or_else(mismatch)?,
        ),
        Type::UUID => Box::new(
            nullable(value, |v| v.as_str().and_then(|s| uuid::Uuid::parse_str(s).ok()))
                .ok_or_else(mismatch)?,
        ),
        Type::TIMESTAMPTZ => Box::new(
            nullable(value, |v| {
                v.as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
            })
            .ok_or_else(mismatch)?,
        ),
        Type::TIMESTAMP => Box::new(
            nullable(value, |v| {
                v.as_str().and_then(|s| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                        .ok()
                })
            })
            .ok_or_else(mismatch)?,
        ),
        Type::DATE => Box::new(
            nullable(value, |v| v.as_str().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
                .ok_or_else(mismatch)?,
        ),
        // Text and everything else: strings as-is, other JSON as its text
        _ => Box::new(
            nullable(value, |v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .ok_or_else(mismatch)?,
        ),
    };

    Ok(param)
}

/// Convert a `PostgreSQL` row to a JSON-safe `Vec`
fn row_to_json(row: &Row) -> Result<Vec<serde_json::Value>> {
    (0..row.len()).map(|idx| postgres_value_to_json(row, idx)).collect()
}

/// Read a nullable column as `T`
fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| {
        FortressError::query_failed(format!(
            "Failed to convert PostgreSQL type '{}' to JSON: {e}",
            row.columns()[idx].type_().name()
        ))
    })
}

/// Convert `PostgreSQL` value to JSON value
fn postgres_value_to_json(row: &Row, idx: usize) -> Result<serde_json::Value> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use serde_json::Value;

    let float = |f: f64| serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number); // Handle NaN/Infinity as null

    let value = match *row.columns()[idx].type_() {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::from),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|f| float(f64::from(f))),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(float),
        Type::JSON | Type::JSONB => get::<Value>(row, idx)?,
        Type::BYTEA => get::<Vec<u8>>(row, idx)?
            .map(|b| Value::String(base64::engine::general_purpose::STANDARD.encode(b))),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(|v| Value::String(v.to_rfc3339())),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(|v| Value::String(v.format("%Y-%m-%d").to_string())),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(|v| Value::String(v.format("%H:%M:%S%.f").to_string())),
        Type::UUID => get::<uuid::Uuid>(row, idx)?.map(|v| Value::String(v.to_string())),
        // Text types and anything else the server can hand back as text
        _ => get::<String>(row, idx)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}
