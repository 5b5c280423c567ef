//! Connection Cache
//!
//! Memoizes one live connection per database id and remembers which database
//! hosts each tenant, so repeated `connect_*` calls neither re-fetch
//! credentials nor reopen connections.
//!
//! # Concurrency
//! Each key owns a [`OnceCell`]. The map lock is only held to find or insert
//! the cell; initialization runs outside it, and concurrent callers for the
//! same key wait on the cell. A failed initialization removes the empty cell
//! from its map, so the maps only hold live entries and the next caller
//! retries.
//!
//! Entries are never evicted or revalidated.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::client::{ConnectionDetails, ConnectionKind, ConnectionSource};
use crate::engine::{ConnectionFactory, SharedConnection};
use crate::error::{FortressError, Result};

type Slot<T> = Arc<OnceCell<T>>;

/// Per-client connection cache
#[derive(Default)]
pub struct ConnectionCache {
    /// database id -> live connection
    connections: Mutex<HashMap<String, Slot<SharedConnection>>>,
    /// tenant id -> database id
    tenants: Mutex<HashMap<String, Slot<String>>>,
}

impl ConnectionCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection for a database, opening it on first use
    pub async fn resolve_database(
        &self,
        database_id: &str,
        source: &dyn ConnectionSource,
        factory: &dyn ConnectionFactory,
    ) -> Result<SharedConnection> {
        let slot = self.connection_slot(database_id).await;
        if let Some(connection) = slot.get() {
            debug!(database_id, "connection cache hit");
            return Ok(connection.clone());
        }

        let outcome = slot
            .get_or_try_init(|| async {
                let details = source.connection_details(database_id, ConnectionKind::Database).await?;
                let connection = factory.connect(details.credentials).await?;
                info!(database_id, backend = %factory.backend(), "connection opened");
                Ok::<_, FortressError>(connection)
            })
            .await
            .cloned();

        settle(&self.connections, database_id, &slot, outcome).await
    }

    /// Connection for the database hosting a tenant
    ///
    /// The first call fetches the tenant's connection details once; the
    /// resulting connection is shared with `resolve_database` on the same
    /// database id.
    pub async fn resolve_tenant(
        &self,
        tenant_id: &str,
        source: &dyn ConnectionSource,
        factory: &dyn ConnectionFactory,
    ) -> Result<SharedConnection> {
        let alias = self.tenant_slot(tenant_id).await;

        let outcome = alias
            .get_or_try_init(|| async {
                let ConnectionDetails { database_id, credentials } =
                    source.connection_details(tenant_id, ConnectionKind::Tenant).await?;

                let slot = self.connection_slot(&database_id).await;
                let opened = slot
                    .get_or_try_init(|| async {
                        let connection = factory.connect(credentials).await?;
                        info!(tenant_id, database_id = %database_id, backend = %factory.backend(), "connection opened");
                        Ok::<_, FortressError>(connection)
                    })
                    .await
                    .cloned();
                settle(&self.connections, &database_id, &slot, opened).await?;

                Ok::<_, FortressError>(database_id)
            })
            .await
            .cloned();
        let database_id = settle(&self.tenants, tenant_id, &alias, outcome).await?;

        self.resolve_database(&database_id, source, factory).await
    }

    /// Number of open connections
    pub async fn len(&self) -> usize {
        self.connections.lock().await.values().filter(|slot| slot.initialized()).count()
    }

    /// Whether no connection is open
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a connection to `database_id` is open
    pub async fn contains_database(&self, database_id: &str) -> bool {
        self.connections
            .lock()
            .await
            .get(database_id)
            .is_some_and(|slot| slot.initialized())
    }

    /// Database hosting `tenant_id`, once resolved
    pub async fn tenant_database(&self, tenant_id: &str) -> Option<String> {
        self.tenants.lock().await.get(tenant_id).and_then(|slot| slot.get().cloned())
    }

    async fn connection_slot(&self, database_id: &str) -> Slot<SharedConnection> {
        let mut connections = self.connections.lock().await;
        connections.entry(database_id.to_string()).or_default().clone()
    }

    async fn tenant_slot(&self, tenant_id: &str) -> Slot<String> {
        let mut tenants = self.tenants.lock().await;
        tenants.entry(tenant_id.to_string()).or_default().clone()
    }
}

/// Reconcile `slot` with its map once initialization finished
///
/// On failure an empty slot is dropped from the map. On success the slot is
/// put back if a concurrent failure removed it; if another slot for the key
/// has already been initialized, its value wins.
async fn settle<T: Clone>(
    map: &Mutex<HashMap<String, Slot<T>>>,
    key: &str,
    slot: &Slot<T>,
    outcome: Result<T>,
) -> Result<T> {
    let mut map = map.lock().await;

    let value = match outcome {
        Ok(value) => value,
        Err(err) => {
            if map.get(key).is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized()) {
                map.remove(key);
            }
            return Err(err);
        }
    };

    match map.get(key) {
        Some(current) if Arc::ptr_eq(current, slot) => Ok(value),
        Some(current) => match current.get() {
            Some(winner) => Ok(winner.clone()),
            None => {
                map.insert(key.to_string(), slot.clone());
                Ok(value)
            }
        },
        None => {
            map.insert(key.to_string(), slot.clone());
            Ok(value)
        }
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache").finish_non_exhaustive()
    }
}
