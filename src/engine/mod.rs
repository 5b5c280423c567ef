//! Connection Backends and the Connection/Cursor Contract
//!
//! This module defines the capability contract every live connection handed
//! out by the SDK conforms to, independent of the backend behind it.
//! Each backend (embedded `libSQL`, `PostgreSQL`) provides a [`ConnectionFactory`]
//! that turns decrypted [`Credentials`] into a [`SharedConnection`].
//!
//! # Backend Selection
//! The backend is fixed when the client is constructed, never inferred from
//! the credentials. A client therefore only ever builds one kind of connection.
//!
//! # Backend Isolation
//! Each backend implementation is completely independent.
//! The only shared pieces are the JSON row representation ([`Rows`]) and the
//! statement classifier in [`crate::statement`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{FortressError, Result};

pub mod cursor;

#[cfg(feature = "embedded")]
pub mod embedded;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use cursor::{ConnectionExt, Cursor};

/// Supported connection backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded SQL engine (`libSQL`), reached via URL + auth token
    Embedded,
    /// Relational database (`PostgreSQL`), reached via host/port/user/password/database
    Postgres,
}

impl Backend {
    /// Get the backend name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = FortressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" | "libsql" => Ok(Self::Embedded),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(FortressError::validation(format!(
                "Unknown backend '{other}' (expected 'embedded' or 'postgres')"
            ))),
        }
    }
}

/// Decrypted connection credentials
///
/// Produced by decrypting the control plane's connection details and passed
/// by value into a [`ConnectionFactory`]. Never persisted; zeroized on drop.
/// WARNING: Sensitive data, do not log or include in error messages
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Host name (relational) or database URL (embedded)
    #[serde(default)]
    pub url: String,

    /// Database name
    #[serde(default)]
    pub database: String,

    /// Port number
    #[serde(default)]
    pub port: u16,

    /// User name
    #[serde(default)]
    pub username: String,

    /// Password (relational) or auth token (embedded)
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Create credentials from their parts
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        database: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse the decrypted JSON document and require every field
    ///
    /// A partially populated credential is never returned.
    pub fn from_json(plaintext: &str) -> Result<Self> {
        // serde's message may quote the input, so it is not forwarded
        let credentials: Self = serde_json::from_str(plaintext).map_err(|_| {
            FortressError::invalid_connection_details("connection details are not a valid JSON object")
        })?;

        credentials.validate()?;
        Ok(credentials)
    }

    /// Check that no field is missing or empty
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("url", self.url.is_empty()),
            ("database", self.database.is_empty()),
            ("port", self.port == 0),
            ("username", self.username.is_empty()),
            ("password", self.password.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FortressError::invalid_connection_details(format!(
                "missing or empty field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Buffered result of a single statement execution
///
/// Rows are JSON values so both backends share one representation.
/// Fetching consumes rows from the front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rows {
    /// Column names in result set (empty for statements without a result set)
    pub columns: Vec<String>,

    /// Remaining, not yet fetched rows
    pub rows: VecDeque<Vec<serde_json::Value>>,

    /// Rows produced or affected by the statement, -1 when unknown
    pub rowcount: i64,

    /// Row id of the last inserted row (embedded backend only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastrowid: Option<i64>,
}

impl Rows {
    /// Result of a statement that returns rows
    #[must_use]
    pub fn with_result_set(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let rowcount = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        Self { columns, rows: rows.into(), rowcount, lastrowid: None }
    }

    /// Result of a statement that only modifies data
    #[must_use]
    pub fn with_rows_affected(rows_affected: u64, lastrowid: Option<i64>) -> Self {
        Self {
            columns: Vec::new(),
            rows: VecDeque::new(),
            rowcount: i64::try_from(rows_affected).unwrap_or(i64::MAX),
            lastrowid,
        }
    }

    /// Result with nothing to report
    #[must_use]
    pub fn empty() -> Self {
        Self { rowcount: -1, ..Self::default() }
    }

    /// Fetch the next row, if any
    pub fn fetchone(&mut self) -> Option<Vec<serde_json::Value>> {
        self.rows.pop_front()
    }

    /// Fetch up to `size` rows
    pub fn fetchmany(&mut self, size: usize) -> Vec<Vec<serde_json::Value>> {
        let take = size.min(self.rows.len());
        self.rows.drain(..take).collect()
    }

    /// Fetch all remaining rows
    pub fn fetchall(&mut self) -> Vec<Vec<serde_json::Value>> {
        self.rows.drain(..).collect()
    }
}

/// Connection capability contract
///
/// Implemented by every backend connection. Connections are shared
/// ([`SharedConnection`]) and serialize their own statements internally,
/// so all methods take `&self`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Backend this connection talks to
    fn backend(&self) -> Backend;

    /// Whether a transaction is currently open
    fn in_transaction(&self) -> bool;

    /// Execute one statement with positional parameters
    ///
    /// Opens an implicit transaction where the backend requires one.
    /// Empty and multi-statement input is rejected; use [`Connection::executescript`].
    async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<Rows>;

    /// Execute one statement once per parameter set
    ///
    /// The returned rowcount is the sum over all executions.
    async fn executemany(&self, sql: &str, param_sets: &[Vec<serde_json::Value>]) -> Result<Rows>;

    /// Execute a script of `;`-separated statements without parameters
    async fn executescript(&self, script: &str) -> Result<()>;

    /// Commit the open transaction (no-op when none is open)
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction (no-op when none is open)
    async fn rollback(&self) -> Result<()>;

    /// Synchronize an embedded replica with its primary
    ///
    /// No-op for backends and modes without a local replica.
    async fn sync(&self) -> Result<()>;
}

/// A live connection shared between the cache and its callers
pub type SharedConnection = Arc<dyn Connection>;

/// Builds live connections from decrypted credentials
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Backend of the connections this factory builds
    fn backend(&self) -> Backend;

    /// Open a connection
    ///
    /// Failures (bad host, rejected auth) surface as [`FortressError::Connection`].
    async fn connect(&self, credentials: Credentials) -> Result<SharedConnection>;
}
