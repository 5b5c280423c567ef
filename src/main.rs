//! Fortress CLI Entry Point
//!
//! Subcommands:
//! - `configure` - Interactively save a client profile
//! - `databases list|create|delete` - Manage databases
//! - `tenants list|create|delete` - Manage tenants
//! - `query` - Run one statement against a database or tenant
//!
//! All output to stdout is JSON-only. Logs go to stderr (`FORTRESS_LOG`).

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use fortress::config::{self, ConfigLocation, StoredProfile, DEFAULT_BASE_URL};
use fortress::output::{ErrorEnvelope, Metadata, QueryOutput, SuccessEnvelope};
use fortress::{
    Backend, ConnectionExt, Fortress, FortressError, IsolationLevel, Platform, Result,
    TenantOptions,
};

/// Fortress - multi-tenant database platform CLI
#[derive(Parser)]
#[command(name = "fortress")]
#[command(about = "Manage Fortress databases and tenants and run SQL against them")]
#[command(version)]
struct Cli {
    /// Profile to use (defaults to the registry's default profile)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Connection backend used by `query` (embedded or postgres)
    #[arg(long, global = true, default_value = "postgres")]
    backend: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a client profile
    Configure {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Save to the user config instead of `.fortress/config.json`
        #[arg(long)]
        global: bool,
    },

    /// Manage databases
    Databases {
        #[command(subcommand)]
        action: DatabaseAction,
    },

    /// Manage tenants
    Tenants {
        #[command(subcommand)]
        action: TenantAction,
    },

    /// Execute one SQL statement
    Query {
        /// Database to run against
        #[arg(long, conflicts_with = "tenant", required_unless_present = "tenant")]
        database: Option<String>,

        /// Tenant to run against
        #[arg(long)]
        tenant: Option<String>,

        /// Positional parameter as JSON (plain text is bound as a string); repeatable
        #[arg(long = "param")]
        params: Vec<String>,

        /// SQL statement
        sql: String,
    },
}

#[derive(Subcommand)]
enum DatabaseAction {
    /// List databases
    List,

    /// Create a database
    Create {
        /// Hosting platform (aws or managed)
        #[arg(long, default_value = "managed")]
        platform: String,

        /// Human-readable alias
        #[arg(long, default_value = "")]
        alias: String,
    },

    /// Delete a database
    Delete {
        /// Database id
        id: String,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// List tenants
    List,

    /// Create a tenant
    Create {
        /// Tenant name
        name: String,

        /// Isolation level (shared or dedicated)
        #[arg(long, default_value = "shared")]
        isolation: String,

        /// Hosting platform (aws or managed)
        #[arg(long, default_value = "managed")]
        platform: String,

        /// Human-readable alias
        #[arg(long, default_value = "")]
        alias: String,

        /// Database hosting a shared tenant
        #[arg(long, default_value = "")]
        database: String,
    },

    /// Delete a tenant
    Delete {
        /// Tenant name
        name: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::Databases { action: DatabaseAction::List } => "databases list",
            Self::Databases { action: DatabaseAction::Create { .. } } => "databases create",
            Self::Databases { action: DatabaseAction::Delete { .. } } => "databases delete",
            Self::Tenants { action: TenantAction::List } => "tenants list",
            Self::Tenants { action: TenantAction::Create { .. } } => "tenants create",
            Self::Tenants { action: TenantAction::Delete { .. } } => "tenants delete",
            Self::Query { .. } => "query",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.name();
    let start = Instant::now();

    match run(&cli).await {
        Ok((data, rowcount)) => {
            let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let meta = match rowcount {
                Some(rowcount) => Metadata::with_rowcount(elapsed, rowcount),
                None => Metadata::new(elapsed),
            };
            print_json(&SuccessEnvelope::new(command, data, meta));
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_json(&ErrorEnvelope::from_error(command, &err));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays JSON-only
fn init_tracing() {
    let filter = EnvFilter::try_from_env("FORTRESS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => println!(
            r#"{{"ok":false,"command":"","error":{{"code":"INTERNAL_ERROR","message":"Could not serialize output: {e}"}}}}"#
        ),
    }
}

async fn run(cli: &Cli) -> Result<(serde_json::Value, Option<i64>)> {
    match &cli.command {
        Commands::Configure { name, global } => {
            let location = if *global { ConfigLocation::Global } else { ConfigLocation::Local };
            let profile = prompt_profile()
                .map_err(|e| FortressError::configuration(format!("Prompt failed: {e:#}")))?;
            let path = config::save_profile(name, profile, location)?;

            Ok((serde_json::json!({ "profile": name, "path": path }), None))
        }

        Commands::Databases { action } => {
            let client = build_client(cli)?;
            let data = match action {
                DatabaseAction::List => to_json(&client.list_databases().await?)?,
                DatabaseAction::Create { platform, alias } => {
                    let id = client.create_database(platform.parse::<Platform>()?, alias).await?;
                    serde_json::json!({ "id": id })
                }
                DatabaseAction::Delete { id } => {
                    client.delete_database(id).await?;
                    serde_json::json!({ "id": id })
                }
            };
            Ok((data, None))
        }

        Commands::Tenants { action } => {
            let client = build_client(cli)?;
            let data = match action {
                TenantAction::List => to_json(&client.list_tenants().await?)?,
                TenantAction::Create { name, isolation, platform, alias, database } => {
                    let options = TenantOptions {
                        isolation_level: isolation.parse::<IsolationLevel>()?,
                        platform: platform.parse::<Platform>()?,
                        alias: alias.clone(),
                        database_id: database.clone(),
                    };
                    client.create_tenant(name, &options).await?;
                    serde_json::json!({ "name": name })
                }
                TenantAction::Delete { name } => {
                    client.delete_tenant(name).await?;
                    serde_json::json!({ "name": name })
                }
            };
            Ok((data, None))
        }

        Commands::Query { database, tenant, params, sql } => {
            let client = build_client(cli)?;
            let connection = match (database, tenant) {
                (Some(database), _) => client.connect_database(database).await?,
                (None, Some(tenant)) => client.connect_tenant(tenant).await?,
                (None, None) => {
                    return Err(FortressError::validation("Either --database or --tenant is required"))
                }
            };

            let params: Vec<serde_json::Value> =
                params.iter().map(String::as_str).map(parse_param).collect();

            let mut cursor = connection.cursor();
            cursor.execute(sql, &params).await?;
            let rowcount = cursor.rowcount();
            let output = QueryOutput {
                columns: cursor.description().to_vec(),
                rows: cursor.fetchall(),
                lastrowid: cursor.lastrowid(),
            };

            // One-shot invocation: persist writes before exiting
            connection.commit().await?;

            Ok((to_json(&output)?, Some(rowcount)))
        }
    }
}

fn build_client(cli: &Cli) -> Result<Fortress> {
    let backend: Backend = cli.backend.parse()?;
    let config = config::resolve_config(cli.profile.as_deref())?;
    Fortress::from_config(config, backend)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| FortressError::internal(format!("Could not serialize output: {e}")))
}

/// JSON when it parses, the raw text otherwise
fn parse_param(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn prompt_profile() -> anyhow::Result<StoredProfile> {
    use dialoguer::{Confirm, Input, Password};

    let org_id: String = Input::new().with_prompt("Organization ID").interact_text()?;

    let from_env = Confirm::new()
        .with_prompt("Read the API key from an environment variable?")
        .default(false)
        .interact()?;

    let (api_key, api_key_env) = if from_env {
        let var: String = Input::new()
            .with_prompt("Environment variable name")
            .default(config::ENV_API_KEY.to_string())
            .interact_text()?;
        (None, Some(var))
    } else {
        let key = Password::new().with_prompt("API key").interact()?;
        (Some(key), None)
    };

    let base_url: String = Input::new()
        .with_prompt("Base URL")
        .default(DEFAULT_BASE_URL.to_string())
        .interact_text()?;

    anyhow::ensure!(!org_id.trim().is_empty(), "organization id cannot be empty");

    Ok(StoredProfile {
        org_id,
        api_key,
        api_key_env,
        base_url: (base_url != DEFAULT_BASE_URL).then_some(base_url),
        ..StoredProfile::default()
    })
}
