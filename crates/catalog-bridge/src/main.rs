use std::{path::PathBuf, process, sync::Arc};

use anyhow::Context;
use catalog_bridge::config::DEFAULT_CONFIG_FILE;
use catalog_bridge::http_mock::HttpMode;
use catalog_bridge::{
    AppState, BridgeConfig, CatalogSender, CatalogStore, ConfigError, ProviderClient, TaskQueue,
    router, run_worker,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-bridge")]
#[command(
    about = "WhatsApp Cloud API bridge that answers catalog button clicks with the current PDF",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook and management HTTP server.
    Serve {
        #[arg(long, value_name = "CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective configuration and report missing values.
    CheckConfig {
        #[arg(long, value_name = "CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(_) => 0,
        Err(err) => {
            if !matches!(err, CliError::Validation { .. }) {
                eprintln!("error: {err}");
            }
            err.exit_code()
        }
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve { config, host, port } => handle_serve(config, host, port),
        Command::CheckConfig { config } => handle_check_config(config),
    }
}

fn handle_check_config(config_path: PathBuf) -> Result<(), CliError> {
    let config = BridgeConfig::load(&config_path)?;
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        let message = json!({
            "error": "missing required values",
            "missing": missing,
        });
        println!("{}", to_pretty(&message));
        return Err(CliError::Validation {
            missing: missing.iter().map(|key| key.to_string()).collect(),
        });
    }
    let output = json!({
        "config": config,
        "catalog_present": config.catalog_path.exists(),
    });
    println!("{}", to_pretty(&output));
    Ok(())
}

fn handle_serve(config_path: PathBuf, host: String, port: Option<u16>) -> Result<(), CliError> {
    let mut config = BridgeConfig::load(&config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    let config = Arc::new(config);
    log_startup_hints(&config);

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::Listen(err.to_string()))?;
    runtime.block_on(run_server(config, host))
}

fn log_startup_hints(config: &BridgeConfig) {
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "credentials not configured; sends will be refused"
        );
    }
    if config.http_mode == HttpMode::Mock {
        warn!("HTTP_MODE=mock: provider calls are recorded, not sent");
    }
    if !config.catalog_path.exists() {
        info!(
            path = %config.catalog_path.display(),
            "no catalog yet; upload one through /send-initial-message"
        );
    }
}

async fn run_server(config: Arc<BridgeConfig>, host: String) -> Result<(), CliError> {
    let provider = ProviderClient::new(&config)
        .context("failed to build provider client")
        .map_err(CliError::Startup)?;
    info!(
        http_mode = provider.mode().as_str(),
        messages_url = provider.messages_url(),
        "provider client ready"
    );
    let catalog = CatalogStore::new(config.catalog_path.clone());
    catalog
        .ensure_dir()
        .with_context(|| {
            format!(
                "failed to create catalog directory for {}",
                catalog.path().display()
            )
        })
        .map_err(CliError::Startup)?;

    let (tasks, receiver) = TaskQueue::new();
    let sender = CatalogSender::new(config.clone(), provider.clone(), catalog.clone());
    tokio::spawn(run_worker(receiver, sender));

    let state = AppState {
        config: config.clone(),
        provider,
        catalog,
        tasks,
    };
    let bind_addr = format!("{host}:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| CliError::Listen(err.to_string()))?;
    info!("listening on http://{bind_addr} (webhook at /webhook)");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .map_err(|err| CliError::Listen(err.to_string()))
}

async fn wait_for_shutdown() {
    signal::ctrl_c().await.ok();
    info!("shutting down");
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("missing required values: {}", missing.join(", "))]
    Validation { missing: Vec<String> },
    #[error("startup failed: {0:#}")]
    Startup(#[source] anyhow::Error),
    #[error("listener failure: {0}")]
    Listen(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::Validation { .. } => 2,
            CliError::Startup(_) => 3,
            CliError::Listen(_) => 7,
        }
    }
}
