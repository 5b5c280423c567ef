//! Control-Plane Client
//!
//! Thin typed wrapper over the Fortress REST API. Every request carries the
//! `Api-Key` header and targets `{base_url}/v1/organization/{org_id}/...`.
//!
//! # Status Mapping
//! - `200`: success, body decoded (absent fields default to empty/zero)
//! - `400`: [`FortressError::Validation`] with the server's message
//! - `500` and anything else: [`FortressError::Internal`]
//! - transport deadline exceeded: [`FortressError::Timeout`]
//!
//! Connection details come back encrypted to the client's [`RecipientKey`]
//! and are decrypted here, so callers only ever see [`Credentials`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::crypto::RecipientKey;
use crate::engine::Credentials;
use crate::error::{FortressError, Result};

/// Header carrying the api key
const API_KEY_HEADER: &str = "Api-Key";

/// Query parameter carrying the recipient public key on `get_uri`
const PUBLIC_KEY_PARAM: &str = "public_key";

/// What a `get_uri` request asks connection details for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// A tenant; the response names the database hosting it
    Tenant,
    /// A database, addressed directly
    Database,
}

impl ConnectionKind {
    /// Path segment used by the control plane
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::Database => "database",
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConnectionKind {
    type Err = FortressError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tenant" => Ok(Self::Tenant),
            "database" => Ok(Self::Database),
            other => Err(FortressError::validation(format!(
                "Invalid connection kind '{other}' (expected 'tenant' or 'database')"
            ))),
        }
    }
}

/// Hosting platform for a new database or dedicated tenant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Customer-owned cloud account
    Aws,
    /// Fortress-managed infrastructure
    #[default]
    Managed,
}

impl std::str::FromStr for Platform {
    type Err = FortressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "managed" => Ok(Self::Managed),
            other => Err(FortressError::validation(format!(
                "Invalid platform '{other}' (expected 'aws' or 'managed')"
            ))),
        }
    }
}

/// Tenant isolation level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Tenant lives in an existing shared database
    #[default]
    Shared,
    /// Tenant gets its own database
    Dedicated,
}

impl std::str::FromStr for IsolationLevel {
    type Err = FortressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "dedicated" => Ok(Self::Dedicated),
            other => Err(FortressError::validation(format!(
                "Invalid isolation level '{other}' (expected 'shared' or 'dedicated')"
            ))),
        }
    }
}

/// Database as listed by the control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseRecord {
    pub id: String,
    pub alias: String,
    /// Size in bytes
    pub size: u64,
    pub average_read_iops: f64,
    pub average_write_iops: f64,
    pub created_date: String,
}

/// Tenant as listed by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantRecord {
    pub id: String,
    pub alias: String,
    pub database_id: String,
    pub created_date: String,
}

/// Options for [`ControlPlaneClient::create_tenant`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TenantOptions {
    pub isolation_level: IsolationLevel,
    pub platform: Platform,
    /// Human-readable alias (may be empty)
    pub alias: String,
    /// Database hosting a shared tenant (may be empty)
    pub database_id: String,
}

/// Decrypted connection details
#[derive(Debug, Clone)]
pub struct ConnectionDetails {
    /// Database the credentials open; for tenants, the hosting database
    pub database_id: String,
    pub credentials: Credentials,
}

/// Source of decrypted connection details
///
/// [`ControlPlaneClient`] is the production implementation; the connection
/// cache only depends on this seam.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Fetch and decrypt connection details for a tenant or database
    async fn connection_details(&self, id: &str, kind: ConnectionKind)
        -> Result<ConnectionDetails>;
}

#[derive(Deserialize)]
struct CreateDatabaseResponse {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct DatabaseList {
    #[serde(default)]
    databases: Vec<DatabaseRecord>,
}

#[derive(Deserialize)]
struct TenantList {
    #[serde(default)]
    tenants: Vec<TenantRecord>,
}

#[derive(Deserialize)]
struct UriResponse {
    #[serde(default)]
    connection_details: String,
    #[serde(default)]
    database_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the Fortress control plane
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: Url,
    org_id: String,
    api_key: String,
    timeout: Duration,
    key: RecipientKey,
}

impl ControlPlaneClient {
    /// Create a client
    ///
    /// Fails with [`FortressError::Configuration`] before any network call when
    /// the org id or api key is empty or the base URL is unusable.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            FortressError::configuration(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FortressError::configuration(format!(
                "Base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let key = match config.private_key.as_deref() {
            Some(pem_body) => RecipientKey::from_pem_body(pem_body)
                .map_err(|_| FortressError::configuration("Configured private key is not a valid P-256 key"))?,
            None => RecipientKey::generate(),
        };

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fortress-sdk-rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FortressError::configuration(format!("Could not build HTTP client: {e}")))?;

        debug!(org_id = %config.org_id, base_url = %base_url, "control-plane client created");

        Ok(Self {
            http,
            base_url,
            org_id: config.org_id.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
            key,
        })
    }

    /// Organization this client acts for
    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Recipient key connection details are encrypted to
    #[must_use]
    pub const fn recipient_key(&self) -> &RecipientKey {
        &self.key
    }

    /// Create a database; returns its id
    pub async fn create_database(&self, platform: Platform, alias: &str) -> Result<String> {
        let url = self.endpoint(&["database"])?;
        let body = serde_json::json!({ "platform": platform, "alias": alias });

        let response: CreateDatabaseResponse =
            self.request(Method::POST, url, Some(body)).await?;
        Ok(response.id)
    }

    /// Delete a database
    pub async fn delete_database(&self, database_id: &str) -> Result<()> {
        require_id(database_id, "database id")?;
        let url = self.endpoint(&["database", database_id])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// List databases in the organization
    pub async fn list_databases(&self) -> Result<Vec<DatabaseRecord>> {
        let url = self.endpoint(&["databases"])?;
        let response: DatabaseList = self.request(Method::GET, url, None).await?;
        Ok(response.databases)
    }

    /// Create a tenant
    pub async fn create_tenant(&self, tenant_name: &str, options: &TenantOptions) -> Result<()> {
        require_id(tenant_name, "tenant name")?;
        let url = self.endpoint(&["tenant", tenant_name])?;
        let body = serde_json::to_value(options)
            .map_err(|e| FortressError::internal(format!("Could not encode request: {e}")))?;

        self.send(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    /// Delete a tenant
    pub async fn delete_tenant(&self, tenant_name: &str) -> Result<()> {
        require_id(tenant_name, "tenant name")?;
        let url = self.endpoint(&["tenant", tenant_name])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// List tenants in the organization
    pub async fn list_tenants(&self) -> Result<Vec<TenantRecord>> {
        let url = self.endpoint(&["tenants"])?;
        let response: TenantList = self.request(Method::GET, url, None).await?;
        Ok(response.tenants)
    }

    /// Fetch and decrypt connection details for a tenant or database
    ///
    /// For databases a response without `database_id` falls back to `id`;
    /// for tenants it is required.
    pub async fn get_uri(&self, id: &str, kind: ConnectionKind) -> Result<ConnectionDetails> {
        require_id(id, "id")?;
        let mut url = self.endpoint(&[kind.as_str(), id, "uri"])?;
        url.query_pairs_mut().append_pair(PUBLIC_KEY_PARAM, &self.key.public_key_base64());

        let response: UriResponse = self.request(Method::GET, url, None).await?;

        if response.connection_details.is_empty() {
            return Err(FortressError::invalid_connection_details(
                "response carries no connection details",
            ));
        }

        let plaintext = self.key.decrypt(&response.connection_details)?;
        let credentials = Credentials::from_json(&plaintext)?;

        let database_id = match kind {
            ConnectionKind::Database if response.database_id.is_empty() => id.to_string(),
            ConnectionKind::Tenant if response.database_id.is_empty() => {
                return Err(FortressError::invalid_connection_details(
                    "tenant response does not name its database",
                ));
            }
            _ => response.database_id,
        };

        debug!(%kind, id, database_id = %database_id, "connection details decrypted");
        Ok(ConnectionDetails { database_id, credentials })
    }

    /// `{base_url}/v1/organization/{org_id}/{segments...}`, segments percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FortressError::configuration("Base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["v1", "organization", self.org_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode its JSON body
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, url, body).await?;
        let text = response.text().await.map_err(|e| self.transport_error(&e))?;

        // Bodies without content decode like an empty object
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            FortressError::internal(format!("Unexpected control-plane response: {e}"))
        })
    }

    /// Send a request; anything other than 200 becomes an error
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        debug!(%method, path = url.path(), "control-plane request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let message = error_message(status, response).await;
        warn!(%method, path = url.path(), status = status.as_u16(), "control-plane request failed");

        Err(match status {
            StatusCode::BAD_REQUEST => FortressError::validation(message),
            StatusCode::INTERNAL_SERVER_ERROR => FortressError::internal(message),
            other => FortressError::internal(format!("unexpected status {}: {message}", other.as_u16())),
        })
    }

    fn transport_error(&self, error: &reqwest::Error) -> FortressError {
        if error.is_timeout() {
            FortressError::timeout(format!(
                "control-plane request exceeded {} ms",
                self.timeout.as_millis()
            ))
        } else {
            FortressError::internal(format!("control-plane request failed: {error}"))
        }
    }
}

#[async_trait]
impl ConnectionSource for ControlPlaneClient {
    async fn connection_details(
        &self,
        id: &str,
        kind: ConnectionKind,
    ) -> Result<ConnectionDetails> {
        self.get_uri(id, kind).await
    }
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneClient")
            .field("base_url", &self.base_url.as_str())
            .field("org_id", &self.org_id)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("key", &self.key)
            .finish()
    }
}

fn require_id(id: &str, what: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(FortressError::validation(format!("{what} cannot be empty")));
    }
    Ok(())
}

/// Server message from `{"message": ...}`, the raw body, or the status line
async fn error_message(status: StatusCode, response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        return body.message;
    }

    let text = text.trim();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testing::{credentials_json, seal};
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> ControlPlaneClient {
        let config = ClientConfig::new("acme", "test-key").with_base_url(server.url());
        ControlPlaneClient::new(&config).unwrap()
    }

    #[test]
    fn test_new_requires_credentials() {
        let err = ControlPlaneClient::new(&ClientConfig::new("", "key")).unwrap_err();
        assert!(matches!(err, FortressError::Configuration(_)));

        let err = ControlPlaneClient::new(&ClientConfig::new("org", "")).unwrap_err();
        assert!(matches!(err, FortressError::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_bad_private_key() {
        let config = ClientConfig::new("org", "key").with_private_key("bm90IGEga2V5");
        let err = ControlPlaneClient::new(&config).unwrap_err();
        assert!(matches!(err, FortressError::Configuration(_)));
    }

    #[test]
    fn test_connection_kind_from_str() {
        assert_eq!("tenant".parse::<ConnectionKind>().unwrap(), ConnectionKind::Tenant);
        assert_eq!("database".parse::<ConnectionKind>().unwrap(), ConnectionKind::Database);

        let err = "table".parse::<ConnectionKind>().unwrap_err();
        assert!(matches!(err, FortressError::Validation(_)));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let config = ClientConfig::new("acme corp", "k").with_base_url("https://api.example.com/");
        let client = ControlPlaneClient::new(&config).unwrap();

        let url = client.endpoint(&["tenant", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/organization/acme%20corp/tenant/a%2Fb");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = ControlPlaneClient::new(&ClientConfig::new("org", "super-secret")).unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_create_database() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/organization/acme/database")
            .match_header("api-key", "test-key")
            .match_body(Matcher::Json(serde_json::json!({"platform": "managed", "alias": "main"})))
            .with_status(200)
            .with_body(r#"{"id":"db-123"}"#)
            .create_async()
            .await;

        let id = client(&server).create_database(Platform::Managed, "main").await.unwrap();
        assert_eq!(id, "db-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_validation_error_carries_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/organization/acme/database")
            .with_status(400)
            .with_body(r#"{"message":"alias already taken"}"#)
            .create_async()
            .await;

        let err = client(&server).create_database(Platform::Aws, "main").await.unwrap_err();
        assert!(matches!(err, FortressError::Validation(_)));
        assert!(err.message().contains("alias already taken"));
    }

    #[tokio::test]
    async fn test_error_body_fallbacks() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v1/organization/acme/database/db-1")
            .with_status(500)
            .with_body("database is locked")
            .create_async()
            .await;
        server
            .mock("DELETE", "/v1/organization/acme/database/db-2")
            .with_status(503)
            .create_async()
            .await;

        let client = client(&server);

        let err = client.delete_database("db-1").await.unwrap_err();
        assert!(matches!(err, FortressError::Internal(_)));
        assert!(err.message().contains("database is locked"));
        assert!(err.is_retryable());

        let err = client.delete_database("db-2").await.unwrap_err();
        assert!(matches!(err, FortressError::Internal(_)));
        assert!(err.message().contains("503"));
    }

    #[tokio::test]
    async fn test_list_databases_defaults_missing_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/organization/acme/databases")
            .with_status(200)
            .with_body(
                r#"{"databases":[
                    {"id":"db-1","alias":"main","size":2048,"average_read_iops":1.5,
                     "average_write_iops":0.5,"created_date":"2024-05-01"},
                    {"id":"db-2"}
                ]}"#,
            )
            .create_async()
            .await;

        let databases = client(&server).list_databases().await.unwrap();
        assert_eq!(databases.len(), 2);
        assert_eq!(databases[0].size, 2048);
        assert!((databases[0].average_read_iops - 1.5).abs() < f64::EPSILON);
        assert_eq!(databases[1].alias, "");
        assert_eq!(databases[1].size, 0);
    }

    #[tokio::test]
    async fn test_list_tenants_empty_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/organization/acme/tenants")
            .with_status(200)
            .create_async()
            .await;

        assert!(client(&server).list_tenants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_tenant_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/organization/acme/tenant/customer-a")
            .match_body(Matcher::Json(serde_json::json!({
                "isolation_level": "shared",
                "platform": "managed",
                "alias": "Customer A",
                "database_id": "db-1"
            })))
            .with_status(200)
            .create_async()
            .await;

        let options = TenantOptions {
            alias: "Customer A".to_string(),
            database_id: "db-1".to_string(),
            ..TenantOptions::default()
        };
        client(&server).create_tenant("customer-a", &options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_uri_database() {
        let mut server = mockito::Server::new_async().await;
        let client = client(&server);
        let sealed = seal(&client.recipient_key().public_key(), credentials_json("db.internal", "app").as_bytes()).unwrap();

        let mock = server
            .mock("GET", "/v1/organization/acme/database/db-1/uri")
            .match_query(Matcher::UrlEncoded(
                "public_key".into(),
                client.recipient_key().public_key_base64(),
            ))
            .with_status(200)
            .with_body(serde_json::json!({ "connection_details": sealed }).to_string())
            .create_async()
            .await;

        let details = client.get_uri("db-1", ConnectionKind::Database).await.unwrap();
        assert_eq!(details.database_id, "db-1");
        assert_eq!(details.credentials.url, "db.internal");
        assert_eq!(details.credentials.database, "app");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_uri_tenant_requires_database_id() {
        let mut server = mockito::Server::new_async().await;
        let client = client(&server);
        let sealed = seal(&client.recipient_key().public_key(), credentials_json("db.internal", "app").as_bytes()).unwrap();

        server
            .mock("GET", "/v1/organization/acme/tenant/t-1/uri")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::json!({ "connection_details": sealed, "database_id": "db-9" }).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/v1/organization/acme/tenant/t-2/uri")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::json!({ "connection_details": sealed }).to_string())
            .create_async()
            .await;

        let details = client.get_uri("t-1", ConnectionKind::Tenant).await.unwrap();
        assert_eq!(details.database_id, "db-9");

        let err = client.get_uri("t-2", ConnectionKind::Tenant).await.unwrap_err();
        assert!(matches!(err, FortressError::InvalidConnectionDetails(_)));
    }

    #[tokio::test]
    async fn test_get_uri_foreign_ciphertext() {
        let mut server = mockito::Server::new_async().await;
        let client = client(&server);
        let stranger = RecipientKey::generate();
        let sealed = seal(&stranger.public_key(), credentials_json("db.internal", "app").as_bytes()).unwrap();

        server
            .mock("GET", "/v1/organization/acme/database/db-1/uri")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::json!({ "connection_details": sealed }).to_string())
            .create_async()
            .await;

        let err = client.get_uri("db-1", ConnectionKind::Database).await.unwrap_err();
        assert!(matches!(err, FortressError::Decryption(_)));
    }

    #[tokio::test]
    async fn test_get_uri_incomplete_credentials() {
        let mut server = mockito::Server::new_async().await;
        let client = client(&server);
        let sealed = seal(&client.recipient_key().public_key(), br#"{"url":"db.internal"}"#).unwrap();

        server
            .mock("GET", "/v1/organization/acme/database/db-1/uri")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(serde_json::json!({ "connection_details": sealed }).to_string())
            .create_async()
            .await;

        let err = client.get_uri("db-1", ConnectionKind::Database).await.unwrap_err();
        assert!(matches!(err, FortressError::InvalidConnectionDetails(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and never answer
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ClientConfig::new("acme", "k")
            .with_base_url(format!("http://{addr}"))
            .with_timeout(Duration::from_millis(200));
        let client = ControlPlaneClient::new(&config).unwrap();

        let err = client.list_databases().await.unwrap_err();
        assert!(matches!(err, FortressError::Timeout(_)));
        assert!(err.message().contains("200 ms"));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected_locally() {
        let server = mockito::Server::new_async().await;
        let client = client(&server);

        assert!(matches!(client.delete_tenant("").await, Err(FortressError::Validation(_))));
        assert!(matches!(
            client.get_uri(" ", ConnectionKind::Database).await,
            Err(FortressError::Validation(_))
        ));
    }
}
