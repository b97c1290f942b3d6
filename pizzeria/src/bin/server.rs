use clap::Parser;
use common::config::Config;
use pizzeria::auth::{AuthClient, StaticAuth};
use pizzeria::http::{AppState, run_server};
use pizzeria::sqlite_storage::SqliteStorage;
use pizzeria::storage::{OrderStore, RemoteCartStore};
use std::error::Error;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: String,
}

fn initialize_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::load(&args.config)?;
    initialize_tracing(&config.server.log_level);

    let storage = Arc::new(SqliteStorage::new(&config.common.database_url).await?);
    storage.initialize_schema().await?;

    let carts: Arc<dyn RemoteCartStore> = storage.clone();
    let orders: Arc<dyn OrderStore> = storage;
    let auth: Arc<dyn AuthClient> = Arc::new(StaticAuth::new());

    let state = AppState::new(carts, orders, auth);
    run_server(config.server, state).await
}
