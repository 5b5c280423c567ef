//! SQL Statement Classification
//!
//! Backends use this to decide when DB-API style implicit transactions
//! start and to reject input `execute` cannot handle.
//!
//! # Classification Strategy
//! - Comments are stripped, quoted text is skipped
//! - The leading keyword decides the kind (`EXPLAIN` is looked through)
//! - Anything unrecognised is `Other`; backends treat it conservatively

use crate::error::{FortressError, Result};

/// Kind of a single SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows without modifying data (SELECT, WITH, PRAGMA, SHOW, VALUES)
    Query,
    /// Modifies data (INSERT, UPDATE, DELETE, REPLACE, UPSERT, MERGE)
    Write,
    /// Changes schema (CREATE, DROP, ALTER, TRUNCATE, ...)
    Ddl,
    /// Transaction control (BEGIN, COMMIT, END, ROLLBACK, SAVEPOINT, RELEASE)
    Transaction,
    /// Anything else
    Other,
}

/// Transaction control statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionControl {
    /// BEGIN / START TRANSACTION
    Begin,
    /// COMMIT / END
    Commit,
    /// ROLLBACK (without TO SAVEPOINT)
    Rollback,
    /// SAVEPOINT, RELEASE, ROLLBACK TO
    Savepoint,
}

/// A statement validated for single execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    kind: StatementKind,
    normalized: String,
}

impl Statement {
    /// Parse a single statement
    ///
    /// Rejects empty input and input containing more than one statement
    /// (a trailing semicolon is allowed).
    pub fn parse(sql: &str) -> Result<Self> {
        let stripped = strip_comments(sql);
        let normalized = stripped.trim().trim_end_matches(';').trim().to_string();

        if normalized.is_empty() {
            return Err(FortressError::validation("SQL statement cannot be empty"));
        }

        if contains_unquoted_semicolon(&normalized) {
            return Err(FortressError::validation(
                "Multiple statements are not supported by execute; use executescript",
            ));
        }

        let normalized = normalized.to_uppercase();
        let kind = classify(&normalized);
        Ok(Self { kind, normalized })
    }

    /// Statement kind
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Transaction control detail, for `Transaction` statements
    #[must_use]
    pub fn transaction_control(&self) -> Option<TransactionControl> {
        if self.kind != StatementKind::Transaction {
            return None;
        }

        let sql = self.normalized.as_str();
        let control = if sql.starts_with("BEGIN") || sql.starts_with("START TRANSACTION") {
            TransactionControl::Begin
        } else if sql.starts_with("COMMIT") || sql.starts_with("END") {
            TransactionControl::Commit
        } else if sql.starts_with("ROLLBACK") && !sql.contains(" TO ") {
            TransactionControl::Rollback
        } else {
            TransactionControl::Savepoint
        };
        Some(control)
    }

    /// Parse every statement of a script
    ///
    /// Statements are separated by semicolons outside quoted text and
    /// dollar-quoted bodies; empty statements are skipped.
    pub fn parse_script(script: &str) -> Result<Vec<Self>> {
        let stripped = strip_comments(script);

        split_unquoted(&stripped)
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Transaction state after running `statements` from state `open`
#[must_use]
pub fn transaction_state_after(open: bool, statements: &[Statement]) -> bool {
    statements.iter().fold(open, |open, statement| match statement.transaction_control() {
        Some(TransactionControl::Begin) => true,
        Some(TransactionControl::Commit | TransactionControl::Rollback) => false,
        Some(TransactionControl::Savepoint) | None => open,
    })
}

/// Strip SQL comments from a statement
///
/// Handles:
/// - Line comments: -- comment
/// - Block comments: /* comment */
///
/// Comment markers inside quoted text are left alone.
fn strip_comments(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            result.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                result.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                // Line comment: skip until newline
                chars.next();
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                // Block comment: skip until */
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Whether a semicolon appears outside quoted text
fn contains_unquoted_semicolon(sql: &str) -> bool {
    split_unquoted(sql).len() > 1
}

/// Split on semicolons outside quotes and `$tag$` bodies
fn split_unquoted(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'$' => {
                if let Some(tag_len) = dollar_tag_len(&bytes[i..]) {
                    let tag = &sql[i..i + tag_len];
                    i += tag_len;
                    // Land on the last byte of the closing tag
                    i = match sql[i..].find(tag) {
                        Some(end) => i + end + tag_len - 1,
                        None => bytes.len(),
                    };
                }
            }
            b';' => {
                pieces.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    pieces.push(&sql[start..]);
    pieces
}

/// Length of a `$tag$` delimiter at the start of `bytes`, if one is there
fn dollar_tag_len(bytes: &[u8]) -> Option<usize> {
    let close = bytes.get(1..)?.iter().position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))? + 1;
    (bytes[close] == b'$').then_some(close + 1)
}

/// Strip EXPLAIN/EXPLAIN ANALYZE/EXPLAIN QUERY PLAN prefix
fn strip_explain_prefix(sql: &str) -> Option<&str> {
    ["EXPLAIN QUERY PLAN", "EXPLAIN ANALYZE", "EXPLAIN"]
        .iter()
        .find_map(|prefix| sql.strip_prefix(prefix))
        .map(str::trim_start)
}

fn classify(sql: &str) -> StatementKind {
    if strip_explain_prefix(sql).is_some() {
        return StatementKind::Query;
    }

    let keyword = sql.split(|c: char| c.is_whitespace() || c == '(').next().unwrap_or_default();

    match keyword {
        "SELECT" | "WITH" | "PRAGMA" | "SHOW" | "VALUES" | "TABLE" | "DESCRIBE" => {
            StatementKind::Query
        }
        "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "UPSERT" | "MERGE" | "COPY" => {
            StatementKind::Write
        }
        "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" | "COMMENT" | "GRANT" | "REVOKE"
        | "REINDEX" => StatementKind::Ddl,
        "BEGIN" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
            StatementKind::Transaction
        }
        "START" if sql.starts_with("START TRANSACTION") => StatementKind::Transaction,
        _ => StatementKind::Other,
    }
}
