//! Ignis Orchestrator
//!
//! Webhook-driven lifecycle orchestrator for ephemeral CI runner microVMs.
//!
//! Architecture:
//! - Payload: decodes and verifies GitHub `workflow_job` deliveries
//! - Service: host allocation, instance spec construction, the
//!   queued/completed lifecycle
//! - API: the axum webhook endpoint plus a health check
//!
//! A queued workflow job gets a microVM created on the least-loaded
//! backend host; the matching completed event tears it down again. All
//! correlation state is in memory and does not survive a restart.

mod api;
mod config;
mod payload;
mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::payload::GithubParser;
use crate::service::Lifecycle;
use ignis_client::HttpConnector;

#[derive(Parser)]
#[command(name = "ignis-orchestrator")]
#[command(about = "Webhook-driven microVM runner orchestrator", long_about = None)]
struct Cli {
    /// Backend host address; repeat or comma-separate for a pool
    #[arg(long = "host", env = "IGNIS_HOSTS", value_delimiter = ',', required = true)]
    hosts: Vec<String>,

    /// GitHub PAT with repo scope, used to register runners
    #[arg(long, env = "IGNIS_API_TOKEN")]
    api_token: String,

    /// SSH public key to add to runner VMs
    #[arg(long, env = "IGNIS_SSH_PUBLIC_KEY", default_value = "")]
    ssh_public_key: String,

    /// Shared secret for webhook signature verification
    #[arg(long, env = "IGNIS_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    /// Label a job must carry to be scheduled here; repeatable
    #[arg(long = "label", env = "IGNIS_LABELS", value_delimiter = ',')]
    labels: Vec<String>,

    /// Repository owner (user or organisation)
    #[arg(long, env = "IGNIS_OWNER")]
    owner: String,

    /// Repository name
    #[arg(long, env = "IGNIS_REPO")]
    repo: String,

    /// Address to serve the webhook endpoint on
    #[arg(long, env = "IGNIS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            hosts: cli.hosts,
            api_token: cli.api_token,
            ssh_public_key: cli.ssh_public_key,
            webhook_secret: cli.webhook_secret,
            required_labels: cli.labels,
            owner: cli.owner,
            repo: cli.repo,
            bind_addr: cli.bind_addr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ignis_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ignis Orchestrator...");

    let config: Config = Cli::parse().into();
    config.validate().context("invalid configuration")?;

    info!(
        hosts = config.hosts.len(),
        repo = %format!("{}/{}", config.owner, config.repo),
        "configuration loaded"
    );

    let parser = Arc::new(GithubParser::new(config.webhook_secret.clone()));
    let bind_addr = config.bind_addr.clone();

    let lifecycle = Arc::new(Lifecycle::new(config, Box::new(HttpConnector)));

    let app = api::create_router(AppState { parser, lifecycle });

    info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("failed to start server")?;

    Ok(())
}
