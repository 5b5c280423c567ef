//! Cursor over a shared connection
//!
//! A [`Cursor`] owns a handle to a [`SharedConnection`] and the result of
//! the last statement it executed. Fetching reads from that buffered result.

use crate::engine::{Rows, SharedConnection};
use crate::error::Result;

/// Cursor bound to one connection
pub struct Cursor {
    connection: SharedConnection,
    result: Option<Rows>,

    /// Default number of rows returned by [`Cursor::fetchmany`]
    pub arraysize: usize,
}

impl Cursor {
    /// Create a cursor with no result yet
    #[must_use]
    pub fn new(connection: SharedConnection) -> Self {
        Self { connection, result: None, arraysize: 1 }
    }

    /// Connection this cursor executes on
    #[must_use]
    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    /// Execute a statement, replacing the previous result
    pub async fn execute(&mut self, sql: &str, params: &[serde_json::Value]) -> Result<&mut Self> {
        // Drop the old result first so a failed statement leaves nothing to fetch
        self.result = None;
        self.result = Some(self.connection.execute(sql, params).await?);
        Ok(self)
    }

    /// Execute a statement once per parameter set, replacing the previous result
    pub async fn executemany(
        &mut self,
        sql: &str,
        param_sets: &[Vec<serde_json::Value>],
    ) -> Result<&mut Self> {
        self.result = None;
        self.result = Some(self.connection.executemany(sql, param_sets).await?);
        Ok(self)
    }

    /// Column names of the current result set (empty without one)
    #[must_use]
    pub fn description(&self) -> &[String] {
        self.result.as_ref().map_or(&[], |rows| rows.columns.as_slice())
    }

    /// Rows produced or affected by the last statement, -1 before any
    #[must_use]
    pub fn rowcount(&self) -> i64 {
        self.result.as_ref().map_or(-1, |rows| rows.rowcount)
    }

    /// Row id of the last inserted row, when the backend reports one
    #[must_use]
    pub fn lastrowid(&self) -> Option<i64> {
        self.result.as_ref().and_then(|rows| rows.lastrowid)
    }

    /// Fetch the next row
    pub fn fetchone(&mut self) -> Option<Vec<serde_json::Value>> {
        self.result.as_mut().and_then(Rows::fetchone)
    }

    /// Fetch up to `size` rows, or [`Cursor::arraysize`] rows when `None`
    pub fn fetchmany(&mut self, size: Option<usize>) -> Vec<Vec<serde_json::Value>> {
        let size = size.unwrap_or(self.arraysize);
        self.result.as_mut().map(|rows| rows.fetchmany(size)).unwrap_or_default()
    }

    /// Fetch all remaining rows
    pub fn fetchall(&mut self) -> Vec<Vec<serde_json::Value>> {
        self.result.as_mut().map(Rows::fetchall).unwrap_or_default()
    }
}

/// Cursor retrieval on a shared connection
pub trait ConnectionExt {
    /// Open a new cursor on this connection
    fn cursor(&self) -> Cursor;
}

impl ConnectionExt for SharedConnection {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.clone())
    }
}
