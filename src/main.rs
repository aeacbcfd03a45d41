//! files-api server binary.

use clap::{Parser, Subcommand};
use files_api::api::{rest, AppState};
use files_api::config::{Config, StorageBackend};
use files_api::store::{LocalStore, ObjectStore, S3Store};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "files-api")]
#[command(about = "REST facade over an object-storage bucket", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Port to listen on (overrides REST_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "files_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.rest_port);
            let store = build_store(&config).await?;
            let state = AppState::new(store, config);

            let addr = format!("0.0.0.0:{port}").parse()?;
            rest::serve(addr, state).await?;
        }
    }

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config.s3_bucket_name.clone().ok_or_else(|| {
                anyhow::anyhow!("S3_BUCKET_NAME must be set when STORAGE_BACKEND is 's3'")
            })?;
            tracing::info!(bucket = %bucket, "using s3 backend");
            Arc::new(S3Store::from_env(bucket).await)
        }
        StorageBackend::Local => {
            tracing::info!(root = %config.local_storage_path, "using local backend");
            Arc::new(LocalStore::new(&config.local_storage_path)?)
        }
    };
    Ok(store)
}
