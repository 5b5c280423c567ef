//! Fortress SDK
//!
//! Client library for the Fortress multi-tenant database platform. It talks
//! to the Fortress control plane to manage databases and tenants, decrypts
//! the connection details the control plane hands out, and returns live,
//! cached connections to the database behind a tenant or database id.
//!
//! # Core Principles
//! - Credentials never leave the process in plaintext and are never logged
//! - One backend per client, chosen at construction
//! - At most one connection per database per client, shared by all tenants on it
//! - Every fallible operation returns [`Result`]
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`crypto`] - Connection-detail decryption (ECDH P-256, AES-128-CBC, HMAC-SHA1)
//! - [`client`] - Control-plane HTTP client
//! - [`cache`] - Per-client connection cache
//! - [`engine`] - Connection/cursor contract and the backends
//! - [`statement`] - SQL statement classification
//! - [`config`] - Client configuration and stored profiles
//! - [`output`] - JSON output envelopes for the CLI
//! - [`sdk`] - The [`Fortress`] client

pub mod cache;
pub mod client;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod output;
pub mod sdk;
pub mod statement;

// Re-export commonly used types for convenience
pub use client::{
    ConnectionDetails, ConnectionKind, ConnectionSource, ControlPlaneClient, DatabaseRecord,
    IsolationLevel, Platform, TenantOptions, TenantRecord,
};
pub use config::{resolve_config, save_profile, ClientConfig, ConfigLocation, StoredProfile};
pub use engine::{
    Backend, Connection, ConnectionExt, ConnectionFactory, Credentials, Cursor, Rows,
    SharedConnection,
};
pub use error::{FortressError, Result};
pub use sdk::Fortress;
