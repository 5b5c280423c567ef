//! Configuration Management
//!
//! This module builds the [`ClientConfig`] a Fortress client is constructed
//! from, and loads/saves named profiles.
//!
//! # Configuration Locations
//! - Local: `.fortress/config.json` (per-project)
//! - Global: `~/.config/fortress/profiles.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Environment variables (`FORTRESS_ORG_ID`, `FORTRESS_API_KEY`, ...)
//! 2. Named profile, or the registry's default profile
//! 3. Built-in defaults
//!
//! Local profiles override global profiles with the same name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{FortressError, Result};

/// Control-plane base URL
pub const DEFAULT_BASE_URL: &str = "https://api.fortress.build";

/// Control-plane request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Environment variable overriding the organization id
pub const ENV_ORG_ID: &str = "FORTRESS_ORG_ID";
/// Environment variable overriding the api key
pub const ENV_API_KEY: &str = "FORTRESS_API_KEY";
/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "FORTRESS_BASE_URL";
/// Environment variable overriding the request timeout (milliseconds)
pub const ENV_TIMEOUT_MS: &str = "FORTRESS_TIMEOUT_MS";
/// Environment variable holding the recipient private key (PEM body)
pub const ENV_PRIVATE_KEY: &str = "FORTRESS_PRIVATE_KEY";

/// Everything needed to construct a Fortress client
#[derive(Clone)]
pub struct ClientConfig {
    /// Organization id (required)
    pub org_id: String,

    /// Api key sent as `Api-Key` header (required)
    /// WARNING: Sensitive data, do not log or include in error messages
    pub api_key: String,

    /// Control-plane base URL
    pub base_url: String,

    /// Deadline for each control-plane request and database connect
    pub timeout: Duration,

    /// Recipient private key as PEM body; a fresh key is generated when absent
    /// WARNING: Sensitive data, do not log or include in error messages
    pub private_key: Option<String>,

    /// Directory for embedded replicas (embedded backend only)
    pub replica_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a config with default base URL and timeout
    pub fn new(org_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            private_key: None,
            replica_dir: None,
        }
    }

    /// Use a different control-plane base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a fixed recipient private key (PEM body)
    #[must_use]
    pub fn with_private_key(mut self, pem_body: impl Into<String>) -> Self {
        self.private_key = Some(pem_body.into());
        self
    }

    /// Keep embedded replicas in `dir`
    #[must_use]
    pub fn with_replica_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.replica_dir = Some(dir.into());
        self
    }

    /// Fail fast on settings a client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.org_id.trim().is_empty() {
            return Err(FortressError::configuration("Organization ID is required"));
        }

        if self.api_key.trim().is_empty() {
            return Err(FortressError::configuration("API Key is required"));
        }

        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            FortressError::configuration(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FortressError::configuration(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(FortressError::configuration("Timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Apply environment overrides read through `env`
    ///
    /// Empty variables are ignored.
    pub fn apply_env(mut self, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(org_id) = var(ENV_ORG_ID) {
            self.org_id = org_id;
        }
        if let Some(api_key) = var(ENV_API_KEY) {
            self.api_key = api_key;
        }
        if let Some(base_url) = var(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(timeout_ms) = var(ENV_TIMEOUT_MS) {
            let timeout_ms = timeout_ms.trim().parse::<u64>().map_err(|_| {
                FortressError::configuration(format!(
                    "{ENV_TIMEOUT_MS} must be a number of milliseconds"
                ))
            })?;
            self.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(private_key) = var(ENV_PRIVATE_KEY) {
            self.private_key = Some(private_key);
        }

        Ok(self)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("org_id", &self.org_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("replica_dir", &self.replica_dir)
            .finish()
    }
}

/// Stored client profile
///
/// Secrets may be referenced through environment variables instead of
/// being written to disk.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Organization id
    pub org_id: String,

    /// Api key stored directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name holding the api key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Control-plane base URL (default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds (default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Environment variable name holding the recipient private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_env: Option<String>,

    /// Directory for embedded replicas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_dir: Option<PathBuf>,
}

impl StoredProfile {
    /// Resolve environment references and return a `ClientConfig`
    pub fn resolve(&self) -> Result<ClientConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
        let api_key = match (&self.api_key, &self.api_key_env) {
            (_, Some(env_var)) => env(env_var).ok_or_else(|| {
                FortressError::configuration(format!(
                    "Environment variable {env_var} not found for api key"
                ))
            })?,
            (Some(api_key), None) => api_key.clone(),
            (None, None) => String::new(),
        };

        let mut config = ClientConfig::new(self.org_id.clone(), api_key);

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(env_var) = &self.private_key_env {
            let private_key = env(env_var).ok_or_else(|| {
                FortressError::configuration(format!(
                    "Environment variable {env_var} not found for private key"
                ))
            })?;
            config.private_key = Some(private_key);
        }
        config.replica_dir = self.replica_dir.clone();

        Ok(config)
    }
}

impl std::fmt::Debug for StoredProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredProfile")
            .field("org_id", &self.org_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("private_key_env", &self.private_key_env)
            .field("replica_dir", &self.replica_dir)
            .finish()
    }
}

/// Profile registry (stored in config files)
///
/// ```json
/// {
///   "profiles": {
///     "prod": { "org_id": "acme", "api_key_env": "FORTRESS_PROD_KEY" },
///     "dev": { "org_id": "acme-dev", "api_key": "..." }
///   },
///   "default": "dev"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRegistry {
    /// Profiles by name
    #[serde(default)]
    pub profiles: HashMap<String, StoredProfile>,

    /// Name of the default profile (must exist in profiles map)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ProfileRegistry {
    /// Merge `local` over `self` (local wins per profile name and for the default pointer)
    #[must_use]
    pub fn merged_with(mut self, local: Self) -> Self {
        self.profiles.extend(local.profiles);
        if local.default.is_some() {
            self.default = local.default;
        }
        self
    }

    /// Look up a profile by name, or the default profile when `name` is `None`
    pub fn profile(&self, name: Option<&str>) -> Result<&StoredProfile> {
        let name = match name {
            Some(n) => n,
            None => self.default.as_deref().ok_or_else(|| {
                let available: Vec<_> = self.profiles.keys().collect();
                FortressError::configuration(format!(
                    "No default profile set. Available profiles: {available:?}"
                ))
            })?,
        };

        self.profiles.get(name).ok_or_else(|| {
            let available: Vec<_> = self.profiles.keys().collect();
            FortressError::configuration(format!(
                "Profile '{name}' not found. Available profiles: {available:?}"
            ))
        })
    }
}

/// Configuration file location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Local config: `.fortress/config.json`
    Local,
    /// Global config: `~/.config/fortress/profiles.json`
    Global,
}

/// Get path to local config file (`.fortress/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        FortressError::configuration(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".fortress").join("config.json"))
}

/// Get path to global config file (`~/.config/fortress/profiles.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        FortressError::configuration("Could not determine user config directory")
    })?;

    Ok(config_dir.join("fortress").join("profiles.json"))
}

/// Load a profile registry; a missing file is an empty registry
pub fn load_registry(path: &Path) -> Result<ProfileRegistry> {
    if !path.exists() {
        return Ok(ProfileRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| FortressError::configuration(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents)
        .map_err(|e| FortressError::configuration(format!("Invalid config file format: {e}")))
}

/// Save a profile registry, creating parent directories
pub fn save_registry(path: &Path, registry: &ProfileRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            FortressError::configuration(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| FortressError::configuration(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| FortressError::configuration(format!("Could not write config file: {e}")))
}

/// Load both registries, local taking precedence
pub fn load_with_precedence() -> Result<ProfileRegistry> {
    let global = load_registry(&global_config_path()?)?;
    let local = load_registry(&local_config_path()?)?;
    Ok(global.merged_with(local))
}

/// Resolve the client config for `profile` (or the default profile)
///
/// Without a named profile and without a default, the config starts from
/// built-in defaults and relies on the environment.
pub fn resolve_config(profile: Option<&str>) -> Result<ClientConfig> {
    let registry = load_with_precedence()?;
    resolve_config_from(&registry, profile, |key| std::env::var(key).ok())
}

/// [`resolve_config`] against an explicit registry and environment
pub fn resolve_config_from(
    registry: &ProfileRegistry,
    profile: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
    let base = match (profile, &registry.default) {
        (Some(_), _) | (None, Some(_)) => registry.profile(profile)?.resolve_with(&env)?,
        (None, None) => ClientConfig::new("", ""),
    };

    let config = base.apply_env(&env)?;
    config.validate()?;
    Ok(config)
}

/// Save a profile to `location`; the first profile saved becomes the default
pub fn save_profile(name: &str, profile: StoredProfile, location: ConfigLocation) -> Result<PathBuf> {
    let path = match location {
        ConfigLocation::Local => local_config_path()?,
        ConfigLocation::Global => global_config_path()?,
    };

    save_profile_to(&path, name, profile)?;
    Ok(path)
}

/// Save a profile into the registry file at `path`
pub fn save_profile_to(path: &Path, name: &str, profile: StoredProfile) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FortressError::configuration("Profile name cannot be empty"));
    }

    let mut registry = load_registry(path)?;
    registry.profiles.insert(name.to_string(), profile);
    if registry.default.is_none() {
        registry.default = Some(name.to_string());
    }

    save_registry(path, &registry)
}
