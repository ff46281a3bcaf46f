//! harbor — local dev CLI for port coordination and account management.
//!
//! `harbor serve` runs the port coordination server; the `ports` subcommands
//! talk to a running coordinator over its HTTP control plane; the `accounts`
//! subcommands edit the YAML accounts config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harbormaster::{COORDINATION_PORT, HubConfig, PortCoordinator};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// harbor — local dev coordination CLI.
#[derive(Parser)]
#[command(
    name = "harbor",
    version,
    about = "harbor — port coordination and account management for local dev"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the port coordination server
    Serve {
        /// Port for the coordination server itself
        #[arg(short, long, default_value_t = COORDINATION_PORT)]
        port: u16,
    },
    /// Talk to a running coordination server
    Ports {
        /// Coordination server port
        #[arg(short, long, default_value_t = COORDINATION_PORT)]
        port: u16,
        #[command(subcommand)]
        command: PortsCommands,
    },
    /// Manage the accounts config file
    Accounts {
        /// Path to the accounts config [default: $HARBOR_CONFIG or ~/.config/harbormaster/accounts.yml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        command: AccountsCommands,
    },
}

#[derive(Subcommand)]
enum PortsCommands {
    /// List all active port assignments
    List,
    /// Show the port assigned to an instance
    Get { instance_id: String },
    /// Assign ports to one or more instances
    Assign {
        instance_ids: Vec<String>,
        /// Preferred port for the batch
        #[arg(short, long)]
        port: Option<u32>,
    },
    /// Release the assignment for an instance
    Release { instance_id: String },
    /// Shut down the coordination server
    Close,
}

#[derive(Subcommand)]
enum AccountsCommands {
    /// List configured accounts
    List,
    /// Set the default account
    SetDefault { name: String },
    /// Remove an account
    Remove { name: String },
    /// Rename an account
    Rename { from: String, to: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => run_serve(port).await?,
        Commands::Ports { port, command } => run_ports(port, command).await?,
        Commands::Accounts { config, command } => run_accounts(config, command)?,
    }

    Ok(())
}

/// Run the coordination server until Ctrl-C or a /close request stops it.
async fn run_serve(port: u16) -> Result<()> {
    let coordinator = PortCoordinator::with_port(port);
    let running = coordinator
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start coordination server: {}", e))?;

    println!("Port coordination server listening on {}", running.addr);

    // Ctrl-C handler — cancels the server token for graceful shutdown
    let cancel = running.cancellation_token();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down coordination server...");
        cancel.cancel();
    });

    running
        .wait()
        .await
        .map_err(|e| anyhow::anyhow!("Coordination server error: {}", e))?;

    tracing::info!("Coordination server stopped");
    Ok(())
}

/// Client side of the control plane: one request, print the result.
async fn run_ports(port: u16, command: PortsCommands) -> Result<()> {
    let base = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();

    match command {
        PortsCommands::List => {
            let body: Value = check(client.get(format!("{base}/servers")).send().await?)
                .await?
                .json()
                .await?;
            println!("{} active assignment(s)", body["count"]);
            if let Some(servers) = body["servers"].as_object() {
                for (instance, port) in servers {
                    println!("  {instance} -> {port}");
                }
            }
        }
        PortsCommands::Get { instance_id } => {
            let body: Value = check(
                client
                    .get(format!("{base}/servers/{instance_id}"))
                    .send()
                    .await?,
            )
            .await?
            .json()
            .await?;
            println!("{instance_id} -> {}", body["port"]);
        }
        PortsCommands::Assign { instance_ids, port } => {
            let body: Value = check(
                client
                    .post(format!("{base}/servers"))
                    .json(&json!({ "instanceIds": instance_ids, "port": port }))
                    .send()
                    .await?,
            )
            .await?
            .json()
            .await?;
            let ports = body["ports"].as_array().cloned().unwrap_or_default();
            for (instance, port) in instance_ids.iter().zip(&ports) {
                println!("{instance} -> {port}");
            }
        }
        PortsCommands::Release { instance_id } => {
            check(
                client
                    .delete(format!("{base}/servers/{instance_id}"))
                    .send()
                    .await?,
            )
            .await?;
            println!("Released {instance_id}");
        }
        PortsCommands::Close => {
            check(client.post(format!("{base}/close")).send().await?).await?;
            println!("Coordination server shutting down");
        }
    }

    Ok(())
}

/// Turn a non-success control-plane response into an error carrying the
/// server's message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(anyhow::anyhow!("{message}"))
}

fn run_accounts(config_path: Option<PathBuf>, command: AccountsCommands) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => HubConfig::default_path().context("cannot resolve config path")?,
    };
    let mut config = HubConfig::load_or_default(&path)
        .with_context(|| format!("failed to load accounts config from {}", path.display()))?;

    match command {
        AccountsCommands::List => {
            if config.accounts.is_empty() {
                println!("No accounts configured ({})", path.display());
                return Ok(());
            }
            for account in &config.accounts {
                let marker = if config.default_account.as_deref() == Some(account.name.as_str()) {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{}{marker}  id={}  env={:?}  auth={:?}",
                    account.name, account.account_id, account.env, account.auth_type
                );
            }
            return Ok(());
        }
        AccountsCommands::SetDefault { name } => {
            config.set_default_account(&name)?;
            println!("Default account set to '{name}'");
        }
        AccountsCommands::Remove { name } => {
            config.remove_account(&name)?;
            println!("Removed account '{name}'");
        }
        AccountsCommands::Rename { from, to } => {
            config.rename_account(&from, &to)?;
            println!("Renamed account '{from}' to '{to}'");
        }
    }

    config
        .save(&path)
        .with_context(|| format!("failed to save accounts config to {}", path.display()))?;
    Ok(())
}
