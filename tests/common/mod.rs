//! Shared fixtures for integration tests
//!
//! The control plane encrypts connection details to the client's recipient
//! key. The crate's own fixture sealer produces that wire format so a mock
//! control plane can hand out credentials the SDK accepts.

#![allow(dead_code)]

use fortress::crypto::testing::seal;
use fortress::{Backend, ClientConfig, Fortress};

/// Credential document pointing the embedded backend at `url`
pub fn embedded_credentials(url: &str, database: &str) -> String {
    serde_json::json!({
        "url": url,
        "database": database,
        "port": 1,
        "username": "local",
        "password": "unused-token",
    })
    .to_string()
}

/// Embedded-backend client talking to `server`
pub fn embedded_client(server: &mockito::ServerGuard) -> Fortress {
    let config = ClientConfig::new("acme", "test-key").with_base_url(server.url());
    Fortress::from_config(config, Backend::Embedded).expect("valid config")
}

/// `{"connection_details": ..}` body sealed to `client`'s key
pub fn uri_body(client: &Fortress, credentials: &str, database_id: Option<&str>) -> String {
    let recipient = client.control_plane().recipient_key().public_key();
    let sealed = seal(&recipient, credentials.as_bytes()).expect("seal fixture");
    let mut body = serde_json::json!({ "connection_details": sealed });
    if let Some(database_id) = database_id {
        body["database_id"] = serde_json::Value::String(database_id.to_string());
    }
    body.to_string()
}
