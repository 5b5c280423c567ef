//! SDK Entry Point
//!
//! [`Fortress`] owns a control-plane client, the connection factory for the
//! backend picked at construction, and the connection cache. The cache lives
//! and dies with the client instance.

use std::sync::Arc;

use crate::cache::ConnectionCache;
use crate::client::{ControlPlaneClient, DatabaseRecord, Platform, TenantOptions, TenantRecord};
use crate::config::ClientConfig;
use crate::engine::{Backend, ConnectionFactory, SharedConnection};
use crate::error::{FortressError, Result};

#[cfg(feature = "embedded")]
use crate::engine::embedded::EmbeddedEngine;
#[cfg(feature = "postgres")]
use crate::engine::postgres::PostgresEngine;

/// Fortress client
///
/// ```no_run
/// # async fn example() -> fortress::Result<()> {
/// use fortress::{ConnectionExt, Fortress};
///
/// let client = Fortress::new("my-org", "my-api-key")?;
/// let connection = client.connect_tenant("customer-a").await?;
///
/// let mut cursor = connection.cursor();
/// cursor.execute("SELECT id, name FROM users WHERE active = $1", &[true.into()]).await?;
/// for row in cursor.fetchall() {
///     println!("{row:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Fortress {
    control_plane: ControlPlaneClient,
    factory: Arc<dyn ConnectionFactory>,
    cache: ConnectionCache,
}

impl Fortress {
    /// Client connecting to `PostgreSQL` databases
    ///
    /// Fails with [`FortressError::Configuration`] when either argument is empty.
    #[cfg(feature = "postgres")]
    pub fn new(org_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(org_id, api_key), Backend::Postgres)
    }

    /// Client connecting to embedded (`libSQL`) databases
    #[cfg(feature = "embedded")]
    pub fn embedded(org_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(org_id, api_key), Backend::Embedded)
    }

    /// Client for `backend` with full configuration
    pub fn from_config(config: ClientConfig, backend: Backend) -> Result<Self> {
        let factory: Arc<dyn ConnectionFactory> = match backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres => Arc::new(PostgresEngine::new(config.timeout)),
            #[cfg(feature = "embedded")]
            Backend::Embedded => Arc::new(match &config.replica_dir {
                Some(dir) => EmbeddedEngine::with_replica_dir(dir),
                None => EmbeddedEngine::new(),
            }),
            #[allow(unreachable_patterns)]
            other => {
                return Err(FortressError::configuration(format!(
                    "Backend '{other}' is not compiled in (enable the '{other}' feature)"
                )))
            }
        };

        Self::with_factory(config, factory)
    }

    /// Client building connections with a caller-supplied factory
    pub fn with_factory(config: ClientConfig, factory: Arc<dyn ConnectionFactory>) -> Result<Self> {
        let control_plane = ControlPlaneClient::new(&config)?;
        Ok(Self { control_plane, factory, cache: ConnectionCache::new() })
    }

    /// Backend of the connections this client opens
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.factory.backend()
    }

    /// Underlying control-plane client
    #[must_use]
    pub const fn control_plane(&self) -> &ControlPlaneClient {
        &self.control_plane
    }

    /// Create a database; returns its id
    pub async fn create_database(&self, platform: Platform, alias: &str) -> Result<String> {
        self.control_plane.create_database(platform, alias).await
    }

    /// Delete a database
    ///
    /// A cached connection to it stays in the cache.
    pub async fn delete_database(&self, database_id: &str) -> Result<()> {
        self.control_plane.delete_database(database_id).await
    }

    /// List databases
    pub async fn list_databases(&self) -> Result<Vec<DatabaseRecord>> {
        self.control_plane.list_databases().await
    }

    /// Create a tenant
    pub async fn create_tenant(&self, tenant_name: &str, options: &TenantOptions) -> Result<()> {
        self.control_plane.create_tenant(tenant_name, options).await
    }

    /// Delete a tenant
    pub async fn delete_tenant(&self, tenant_name: &str) -> Result<()> {
        self.control_plane.delete_tenant(tenant_name).await
    }

    /// List tenants
    pub async fn list_tenants(&self) -> Result<Vec<TenantRecord>> {
        self.control_plane.list_tenants().await
    }

    /// Shared connection to a database, opened on first use
    pub async fn connect_database(&self, database_id: &str) -> Result<SharedConnection> {
        self.cache.resolve_database(database_id, &self.control_plane, self.factory.as_ref()).await
    }

    /// Alias of [`Fortress::connect_database`]
    pub async fn connect(&self, database_id: &str) -> Result<SharedConnection> {
        self.connect_database(database_id).await
    }

    /// Shared connection to the database hosting a tenant
    pub async fn connect_tenant(&self, tenant_id: &str) -> Result<SharedConnection> {
        self.cache.resolve_tenant(tenant_id, &self.control_plane, self.factory.as_ref()).await
    }

    /// Number of open, cached connections
    pub async fn cached_connections(&self) -> usize {
        self.cache.len().await
    }
}

impl std::fmt::Debug for Fortress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fortress")
            .field("control_plane", &self.control_plane)
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}
