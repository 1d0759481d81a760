//! api-client
//!
//! Command-line front end for the authenticated client. Sends one request per
//! invocation through the refresh coordinator and prints the response
//! envelope as JSON on stdout. Logs go to stderr.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use api_client::{ApiClient, ApiResponse, Config};
use clap::Parser;
use common::Secret;
use credentials::{CredentialStore, FileCredentialStore};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        refresh_path = %config.api.refresh_path,
        credentials = %config.credentials.path.display(),
        headers = config.headers.len(),
        "configuration loaded"
    );

    let store: Arc<dyn CredentialStore> = Arc::new(
        FileCredentialStore::load(config.credentials.path.clone())
            .await
            .with_context(|| {
                format!(
                    "failed to load credentials from {}",
                    config.credentials.path.display()
                )
            })?,
    );
    let client = ApiClient::from_config(&config, store);

    if let Some(request) = cli.request() {
        let response: ApiResponse<Value> = client
            .send(request)
            .await
            .context("credential store failure")?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        if !response.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match cli.command {
        Command::Login {
            access_token,
            refresh_token,
        } => {
            client
                .login(Secret::new(access_token), Secret::new(refresh_token))
                .await
                .context("failed to store credentials")?;
            println!("{}", json!({"logged_in": true}));
        }
        Command::Logout => {
            client
                .logout()
                .await
                .context("failed to clear credentials")?;
            println!("{}", json!({"logged_in": false}));
        }
        Command::Status => {
            let logged_in = client
                .is_logged_in()
                .await
                .context("failed to read credentials")?;
            let network = client.check_network().await;
            println!("{}", json!({"logged_in": logged_in, "network": network}));
        }
        Command::Get { .. }
        | Command::Delete { .. }
        | Command::Post { .. }
        | Command::Put { .. }
        | Command::Patch { .. } => {}
    }

    Ok(())
}
