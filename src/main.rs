use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use casedesk::settings::DEFAULT_SETTINGS_FILE;
use casedesk::web::{GatewayState, start_server};
use casedesk::{Config, Settings, connect_from_config};

const DEFAULT_LOG_FILTER: &str = "casedesk=info,tower_http=info";

#[derive(Parser)]
#[command(name = "casedesk", version)]
#[command(about = "Case-management API over DynamoDB and S3")]
struct Cli {
    /// Settings file. A missing file means built-in defaults.
    #[arg(short, long, global = true, env = "CASEDESK_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen address, overriding CASEDESK_BIND
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Resolve configuration, print it and exit
    CheckConfig,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    let mut config = Config::resolve(&settings).context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::CheckConfig => {
            print_config(&config);
            Ok(())
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting casedesk (backend {}, lookup {}, passwords {})",
        config.storage.backend.as_str(),
        config.storage.lookup_mode.as_str(),
        config.credentials.password_scheme.as_str()
    );
    let store = connect_from_config(&config.storage)
        .await
        .context("failed to connect to the store")?;
    let state = Arc::new(GatewayState::new(&store, &config));
    start_server(config.server.bind, Arc::clone(&state)).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    if let Some(tx) = state.shutdown_tx.write().await.take() {
        let _ = tx.send(());
    }
    Ok(())
}

fn print_config(config: &Config) {
    let storage = &config.storage;
    println!("bind:             {}", config.server.bind);
    println!("max upload bytes: {}", config.server.max_upload_bytes);
    println!(
        "cors origins:     {}",
        if config.server.cors_origins.is_empty() {
            "*".to_string()
        } else {
            config.server.cors_origins.join(", ")
        }
    );
    println!("store backend:    {}", storage.backend.as_str());
    println!("lookup mode:      {}", storage.lookup_mode.as_str());
    println!("region:           {}", storage.region);
    if let Some(endpoint) = &storage.endpoint_url {
        println!("endpoint:         {}", endpoint);
    }
    println!("bucket:           {}", storage.bucket);
    println!(
        "tables:           users={} cases={} documents={} chats={}",
        storage.tables.users, storage.tables.cases, storage.tables.documents, storage.tables.chats
    );
    println!(
        "password scheme:  {}",
        config.credentials.password_scheme.as_str()
    );
}
