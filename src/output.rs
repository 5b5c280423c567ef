//! JSON Output Envelope Types
//!
//! Structured JSON output for the `fortress` CLI. Every command prints
//! exactly one envelope to stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::engine::Rows;
use crate::error::FortressError;

/// Success envelope for command results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed (e.g. `databases list`, `query`)
    pub command: String,

    /// Command-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for command failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Command that was attempted
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, command: command.into(), error }
    }

    /// Create error envelope from `FortressError`
    pub fn from_error(command: impl Into<String>, err: &FortressError) -> Self {
        Self::new(
            command,
            ErrorInfo {
                code: err.error_code().to_string(),
                message: err.message(),
                retryable: err.is_retryable(),
            },
        )
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., `VALIDATION_ERROR`, `DECRYPTION_ERROR`)
    pub code: String,

    /// Human-readable error message (no sensitive data)
    pub message: String,

    /// Whether retrying later may succeed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorInfo {
    /// Create a new, non-retryable error info
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), retryable: false }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,

    /// Number of rows returned or affected (query results only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rowcount: Option<i64>,
}

impl Metadata {
    /// Create new metadata with just execution time
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rowcount: None }
    }

    /// Create new metadata with execution time and row count
    #[must_use]
    pub const fn with_rowcount(execution_ms: u64, rowcount: i64) -> Self {
        Self { execution_ms, rowcount: Some(rowcount) }
    }
}

/// Query result as printed by `fortress query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Column names (empty for statements without a result set)
    pub columns: Vec<String>,

    /// Result rows
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Row id of the last inserted row, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastrowid: Option<i64>,
}

impl From<Rows> for QueryOutput {
    fn from(mut rows: Rows) -> Self {
        let data = rows.fetchall();
        Self { columns: rows.columns, rows: data, lastrowid: rows.lastrowid }
    }
}
