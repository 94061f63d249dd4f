use bourse::api::{create_router, AppState};
use bourse::config::AppConfig;
use bourse::error::Result;
use bourse::services::PriceFeed;
use bourse::PostgresStore;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bourse", about = "Simulated stock brokerage service")]
struct Cli {
    /// Directory holding default.toml / local.toml
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations, start the price feed and the JSON API
    Serve,
    /// Run pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config.logging.level);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Config error: {}", e);
        }
        return Err(bourse::BourseError::Internal(
            "invalid configuration".to_string(),
        ));
    }

    let store = PostgresStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;

    match cli.command {
        Commands::Migrate => {
            info!("Migrations complete");
            Ok(())
        }
        Commands::Serve => serve(store, config).await,
    }
}

async fn serve(store: PostgresStore, config: AppConfig) -> Result<()> {
    let feed = PriceFeed::new(store.clone(), config.feed.clone()).spawn();

    let state = AppState::new(store, config.auth.admin_key.clone());
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("API listening on {}", config.server.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    feed.abort();
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    } else {
        info!("Shutdown signal received");
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},bourse=debug,sqlx=warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
