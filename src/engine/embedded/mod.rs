//! Embedded Backend (`libSQL`)
//!
//! Opens `libSQL` databases from decrypted credentials:
//! - Local files and `:memory:` (`url` is a path, optionally `file:` prefixed)
//! - Remote databases (`libsql://`, `http(s)://`, `ws(s)://`), auth token in `password`
//! - Embedded replicas of a remote database, when a replica directory is configured
//!
//! # Implementation Notes
//! - DB-API semantics: a write statement outside a transaction opens one
//!   implicitly; it stays open until `commit` or `rollback`
//! - `executescript` commits a pending transaction first
//! - BLOB data is Base64-encoded for JSON safety
//! - `sync` pulls frames from the primary for replicas and is a no-op otherwise

use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Database, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::engine::{Backend, Connection, ConnectionFactory, Credentials, Rows, SharedConnection};
use crate::error::{FortressError, Result};
use crate::statement::{Statement, StatementKind};

const REMOTE_SCHEMES: [&str; 5] = ["libsql://", "http://", "https://", "ws://", "wss://"];

/// How an embedded database is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local file or in-memory database
    Local,
    /// Statements run on the remote primary
    Remote,
    /// Local replica, reads served locally
    Replica,
}

/// Factory for embedded connections
#[derive(Debug, Clone, Default)]
pub struct EmbeddedEngine {
    replica_dir: Option<PathBuf>,
}

impl EmbeddedEngine {
    /// Engine opening remote databases directly
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine keeping embedded replicas of remote databases in `dir`
    #[must_use]
    pub fn with_replica_dir(dir: impl Into<PathBuf>) -> Self {
        Self { replica_dir: Some(dir.into()) }
    }
}

#[async_trait]
impl ConnectionFactory for EmbeddedEngine {
    fn backend(&self) -> Backend {
        Backend::Embedded
    }

    async fn connect(&self, credentials: Credentials) -> Result<SharedConnection> {
        let connection = EmbeddedConnection::open(&credentials, self.replica_dir.as_deref()).await?;
        Ok(Arc::new(connection))
    }
}

/// Live embedded connection
pub struct EmbeddedConnection {
    database: Database,
    conn: libsql::Connection,
    mode: Mode,
    /// Serializes statements so implicit BEGIN and the statement stay together
    lock: Mutex<()>,
}

impl EmbeddedConnection {
    /// Open the database `credentials` point at
    pub async fn open(credentials: &Credentials, replica_dir: Option<&Path>) -> Result<Self> {
        let url = credentials.url.as_str();

        let (database, mode) = if is_remote_url(url) {
            let token = credentials.password.clone();
            match replica_dir {
                Some(dir) => {
                    tokio::fs::create_dir_all(dir).await.map_err(|e| {
                        FortressError::connection(format!("Could not create replica directory: {e}"))
                    })?;
                    let path = dir.join(replica_file_name(&credentials.database));
                    let database = Builder::new_remote_replica(path, url.to_string(), token)
                        .build()
                        .await
                        .map_err(open_error)?;
                    (database, Mode::Replica)
                }
                None => {
                    let database =
                        Builder::new_remote(url.to_string(), token).build().await.map_err(open_error)?;
                    (database, Mode::Remote)
                }
            }
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            let database = Builder::new_local(path).build().await.map_err(open_error)?;
            (database, Mode::Local)
        };

        let conn = database.connect().map_err(open_error)?;
        debug!(database = %credentials.database, ?mode, "embedded database opened");

        Ok(Self { database, conn, mode, lock: Mutex::new(()) })
    }

    /// How this connection reaches its database
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    async fn begin_implicit(&self, statement: &Statement) -> Result<()> {
        if statement.kind() == StatementKind::Write && self.conn.is_autocommit() {
            self.conn
                .execute("BEGIN", ())
                .await
                .map_err(|e| FortressError::query_failed(format!("Failed to begin transaction: {e}")))?;
        }
        Ok(())
    }

    async fn run(&self, sql: &str, params: &[serde_json::Value]) -> Result<Rows> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to prepare query: {e}")))?;

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let params = positional(params);

        if columns.is_empty() {
            let affected = stmt
                .execute(params)
                .await
                .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;
            return Ok(Rows::with_rows_affected(affected as u64, Some(self.conn.last_insert_rowid())));
        }

        let mut rows = stmt
            .query(params)
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;

        let mut data = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to fetch row: {e}")))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value = row.get_value(idx as i32).map_err(|e| {
                    FortressError::query_failed(format!("Failed to read column {idx}: {e}"))
                })?;
                values.push(value_to_json(value));
            }
            data.push(values);
        }

        Ok(Rows::with_result_set(columns, data))
    }

    async fn finish_transaction(&self, command: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if self.conn.is_autocommit() {
            return Ok(());
        }

        self.conn
            .execute(command, ())
            .await
            .map_err(|e| FortressError::query_failed(format!("{command} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Connection for EmbeddedConnection {
    fn backend(&self) -> Backend {
        Backend::Embedded
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<Rows> {
        let statement = Statement::parse(sql)?;
        let _guard = self.lock.lock().await;

        self.begin_implicit(&statement).await?;
        self.run(sql, params).await
    }

    async fn executemany(&self, sql: &str, param_sets: &[Vec<serde_json::Value>]) -> Result<Rows> {
        let statement = Statement::parse(sql)?;
        let _guard = self.lock.lock().await;

        self.begin_implicit(&statement).await?;

        let mut total = 0u64;
        for params in param_sets {
            let affected = self
                .conn
                .execute(sql, positional(params))
                .await
                .map_err(|e| FortressError::query_failed(format!("Failed to execute query: {e}")))?;
            total += affected;
        }

        Ok(Rows::with_rows_affected(total, None))
    }

    async fn executescript(&self, script: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        if !self.conn.is_autocommit() {
            self.conn
                .execute("COMMIT", ())
                .await
                .map_err(|e| FortressError::query_failed(format!("COMMIT failed: {e}")))?;
        }

        self.conn
            .execute_batch(script)
            .await
            .map_err(|e| FortressError::query_failed(format!("Failed to execute script: {e}")))?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.finish_transaction("COMMIT").await
    }

    async fn rollback(&self) -> Result<()> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn sync(&self) -> Result<()> {
        if self.mode != Mode::Replica {
            debug!(mode = ?self.mode, "sync skipped, no local replica");
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        self.database
            .sync()
            .await
            .map_err(|e| FortressError::connection(format!("Replica sync failed: {e}")))?;
        debug!("embedded replica synced");
        Ok(())
    }
}

fn is_remote_url(url: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Replica file name for a database, restricted to filename-safe characters
fn replica_file_name(database: &str) -> String {
    let name: String = database
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{name}.db")
}

fn open_error(error: libsql::Error) -> FortressError {
    FortressError::connection(format!("Failed to open embedded database: {error}"))
}

fn positional(params: &[serde_json::Value]) -> Params {
    Params::Positional(params.iter().map(json_to_value).collect())
}

/// Convert a JSON parameter to a `libSQL` value
///
/// Booleans become 0/1; arrays and objects are bound as their JSON text.
fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// Convert a `libSQL` value to JSON
fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // Handle NaN/Infinity as null
        Value::Text(s) => serde_json::Value::String(s),
        Value::Blob(b) => {
            // Encode BLOB as Base64 for JSON safety
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_credentials() -> Credentials {
        Credentials::new(":memory:", "scratch", 1, "local", "unused")
    }

    async fn open_memory() -> EmbeddedConnection {
        EmbeddedConnection::open(&memory_credentials(), None).await.unwrap()
    }

    async fn seeded() -> EmbeddedConnection {
        let conn = open_memory().await;
        conn.executescript(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, avatar BLOB);
             INSERT INTO users (name, score) VALUES ('alice', 9.5);
             INSERT INTO users (name, score) VALUES ('bob', NULL);",
        )
        .await
        .unwrap();
        conn
    }

    #[test]
    fn test_remote_url_detection() {
        assert!(is_remote_url("libsql://acme.turso.io"));
        assert!(is_remote_url("https://acme.turso.io"));
        assert!(is_remote_url("wss://acme.turso.io"));
        assert!(!is_remote_url(":memory:"));
        assert!(!is_remote_url("/var/data/app.db"));
        assert!(!is_remote_url("file:app.db"));
    }

    #[test]
    fn test_replica_file_name() {
        assert_eq!(replica_file_name("app"), "app.db");
        assert_eq!(replica_file_name("../etc/passwd"), "___etc_passwd.db");
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&json!(null)), Value::Null);
        assert_eq!(json_to_value(&json!(true)), Value::Integer(1));
        assert_eq!(json_to_value(&json!(42)), Value::Integer(42));
        assert_eq!(json_to_value(&json!(1.5)), Value::Real(1.5));
        assert_eq!(json_to_value(&json!("x")), Value::Text("x".to_string()));
        assert_eq!(json_to_value(&json!({"a": 1})), Value::Text(r#"{"a":1}"#.to_string()));
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(Value::Real(f64::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(Value::Blob(vec![1, 2, 3])), json!("AQID"));
        assert_eq!(value_to_json(Value::Integer(-7)), json!(-7));
    }

    #[tokio::test]
    async fn test_factory_opens_local_database() {
        let connection = EmbeddedEngine::new().connect(memory_credentials()).await.unwrap();
        assert_eq!(connection.backend(), Backend::Embedded);

        let mut rows = connection.execute("SELECT 1 + 1 AS two", &[]).await.unwrap();
        assert_eq!(rows.columns, vec!["two".to_string()]);
        assert_eq!(rows.fetchone(), Some(vec![json!(2)]));
    }

    #[tokio::test]
    async fn test_query_with_params() {
        let conn = seeded().await;

        let mut rows = conn
            .execute("SELECT name, score FROM users WHERE name = ?", &[json!("alice")])
            .await
            .unwrap();
        assert_eq!(rows.columns, vec!["name".to_string(), "score".to_string()]);
        assert_eq!(rows.fetchall(), vec![vec![json!("alice"), json!(9.5)]]);

        let mut rows = conn.execute("SELECT score FROM users WHERE name = 'bob'", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![serde_json::Value::Null]));
    }

    #[tokio::test]
    async fn test_insert_reports_rowcount_and_lastrowid() {
        let conn = seeded().await;

        let rows = conn
            .execute("INSERT INTO users (name) VALUES (?)", &[json!("carol")])
            .await
            .unwrap();
        assert_eq!(rows.rowcount, 1);
        assert_eq!(rows.lastrowid, Some(3));
    }

    #[tokio::test]
    async fn test_write_opens_implicit_transaction() {
        let conn = seeded().await;
        assert!(!conn.in_transaction());

        conn.execute("SELECT * FROM users", &[]).await.unwrap();
        assert!(!conn.in_transaction());

        conn.execute("DELETE FROM users", &[]).await.unwrap();
        assert!(conn.in_transaction());

        conn.rollback().await.unwrap();
        assert!(!conn.in_transaction());

        let mut rows = conn.execute("SELECT COUNT(*) FROM users", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![json!(2)]));
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let conn = seeded().await;

        conn.execute("UPDATE users SET score = 1.0 WHERE name = 'bob'", &[]).await.unwrap();
        conn.commit().await.unwrap();
        assert!(!conn.in_transaction());

        conn.rollback().await.unwrap();
        let mut rows = conn.execute("SELECT score FROM users WHERE name = 'bob'", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![json!(1.0)]));
    }

    #[tokio::test]
    async fn test_commit_and_rollback_without_transaction() {
        let conn = open_memory().await;
        conn.commit().await.unwrap();
        conn.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_executemany_sums_rowcount() {
        let conn = seeded().await;

        let rows = conn
            .executemany(
                "INSERT INTO users (name, score) VALUES (?, ?)",
                &[vec![json!("d"), json!(1)], vec![json!("e"), json!(2)], vec![json!("f"), json!(null)]],
            )
            .await
            .unwrap();
        assert_eq!(rows.rowcount, 3);
        assert!(conn.in_transaction());
    }

    #[tokio::test]
    async fn test_blob_round_trip_as_base64() {
        let conn = seeded().await;
        conn.execute("UPDATE users SET avatar = X'DEADBEEF' WHERE name = 'alice'", &[])
            .await
            .unwrap();

        let mut rows =
            conn.execute("SELECT avatar FROM users WHERE name = 'alice'", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![json!("3q2+7w==")]));
    }

    #[tokio::test]
    async fn test_invalid_sql() {
        let conn = open_memory().await;

        let err = conn.execute("SELEC nonsense", &[]).await.unwrap_err();
        assert!(matches!(err, FortressError::QueryFailed(_)));

        let err = conn.execute("SELECT 1; SELECT 2", &[]).await.unwrap_err();
        assert!(matches!(err, FortressError::Validation(_)));

        let err = conn.execute("  ", &[]).await.unwrap_err();
        assert!(matches!(err, FortressError::Validation(_)));
    }

    #[tokio::test]
    async fn test_executescript_commits_pending_transaction() {
        let conn = seeded().await;
        conn.execute("DELETE FROM users WHERE name = 'bob'", &[]).await.unwrap();
        assert!(conn.in_transaction());

        conn.executescript("CREATE TABLE audit (id INTEGER); INSERT INTO audit VALUES (1);")
            .await
            .unwrap();
        assert!(!conn.in_transaction());

        conn.rollback().await.unwrap();
        let mut rows = conn.execute("SELECT COUNT(*) FROM users", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![json!(1)]));
    }

    #[tokio::test]
    async fn test_replica_dir_failure_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let credentials =
            Credentials::new("libsql://app.example.invalid", "app", 443, "svc", "secret-token");
        let err = EmbeddedConnection::open(&credentials, Some(&blocker.join("replicas")))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, FortressError::Connection(_)));
        assert!(err.message().contains("replica directory"));
        assert!(!err.message().contains("secret-token"));
    }

    #[tokio::test]
    async fn test_sync_is_noop_for_local() {
        let conn = open_memory().await;
        assert_eq!(conn.mode(), Mode::Local);
        conn.sync().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let credentials = Credentials::new(
            format!("file:{}", path.display()),
            "app",
            1,
            "local",
            "unused",
        );

        let conn = EmbeddedConnection::open(&credentials, None).await.unwrap();
        conn.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)", &[]).await.unwrap();
        conn.execute("INSERT INTO kv VALUES (?, ?)", &[json!("a"), json!("1")]).await.unwrap();
        conn.commit().await.unwrap();
        drop(conn);

        let conn = EmbeddedConnection::open(&credentials, None).await.unwrap();
        let mut rows = conn.execute("SELECT v FROM kv WHERE k = 'a'", &[]).await.unwrap();
        assert_eq!(rows.fetchone(), Some(vec![json!("1")]));
    }
}
