use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use merkle_whitelist_service::config::load_config;
use merkle_whitelist_service::kv::DynamoDbKvStore;
use merkle_whitelist_service::object_store::S3ObjectStore;
use merkle_whitelist_service::server::{shutdown_signal, start_server};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Off-chain whitelist-to-Merkle-tree service.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Bind address for the server, overrides the config file/env value
    #[clap(short, long, value_parser)]
    bind: Option<String>,

    /// Enable verbose logging (can be specified multiple times)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "merkle_whitelist_service=info,tower_http=debug".into()),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = load_config(cli.config.as_deref().and_then(|p| p.to_str()))?;

    if let Some(bind) = cli.bind {
        config.listen_addr = bind.parse()?;
    }

    let object_store: Arc<dyn merkle_whitelist_service::object_store::ObjectStore> =
        Arc::new(S3ObjectStore::from_env().await);
    let kv = Arc::new(
        DynamoDbKvStore::from_env(
            config.dynamodb_roots_table_name.clone(),
            config.dynamodb_proofs_table_name.clone(),
        )
        .await,
    );

    info!("starting merkle-whitelist-service on {}", config.listen_addr);

    tokio::select! {
        result = start_server(object_store, kv.clone(), kv, config) => {
            if let Err(err) = result {
                eprintln!("server error: {err}");
                return Err(err);
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received, shutting down");
        }
    }

    Ok(())
}
