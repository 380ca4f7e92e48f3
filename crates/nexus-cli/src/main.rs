//! Nexus CLI - fleet inspection without a TUI.
//!
//! Connects the configured MCP fleet and prints server statuses,
//! aggregated tools, or full artifact listings. The interactive agent
//! surface lives elsewhere; this binary exists to verify a deployment
//! end to end.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nexus_artifacts::ArtifactManager;
use nexus_events::EventBus;
use nexus_mcp::{load_mcp_config, ConnectionManager};
use nexus_tools::{McpToolProvider, ToolProvider};

#[derive(Parser)]
#[command(name = "nexus", about = "Nexus agent runtime fleet inspector", version)]
struct Cli {
    /// Path to the MCP server configuration file.
    #[arg(long, env = "NEXUS_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Use OAuth when connecting to remote servers.
    #[arg(long)]
    auth: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect the fleet and print per-server connection statuses.
    Servers,
    /// List the aggregated tool definitions across the fleet.
    Tools,
    /// Fetch and print artifact collections for every server.
    Artifacts {
        /// Per-fetch timeout in seconds.
        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = load_mcp_config(cli.config.as_deref()).context("loading MCP configuration")?;
    let event_bus = EventBus::new();
    let fleet = Arc::new(ConnectionManager::new(config, event_bus.clone()));

    let connected = fleet.initialize(cli.auth).await?;
    info!(connected, "Fleet initialized");

    match cli.command {
        Command::Servers => {
            let statuses = fleet.server_statuses().await;
            if statuses.is_empty() {
                println!("no servers configured");
            }
            let mut names: Vec<_> = statuses.keys().cloned().collect();
            names.sort();
            for name in names {
                println!("{name}: {}", statuses[&name]);
            }
        },
        Command::Tools => {
            let provider = McpToolProvider::new(Arc::clone(&fleet));
            for spec in provider.tool_definitions().await {
                let description = spec.description.unwrap_or_default();
                println!("{}\t{description}", spec.name);
            }
        },
        Command::Artifacts { timeout_secs } => {
            let artifacts = ArtifactManager::new(Arc::clone(&fleet), event_bus);
            let all = artifacts
                .all_servers_artifacts(Some(Duration::from_secs(timeout_secs)))
                .await;
            let mut names: Vec<_> = all.keys().cloned().collect();
            names.sort();
            for name in names {
                let collection = &all[&name];
                println!(
                    "{name}: {} tools, {} prompts, {} resources",
                    collection.tools.len(),
                    collection.prompts.len(),
                    collection.resources.len()
                );
            }
        },
    }

    fleet.cleanup().await;
    Ok(())
}
