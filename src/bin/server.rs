//! Seisqual server binary.
//!
//! ## Environment variables
//!
//! | Variable                    | Required | Description                          |
//! |-----------------------------|----------|--------------------------------------|
//! | `DATABASE_URL`              | No       | SQLite URL (default: seisqual.db)    |
//! | `SEISQUAL_BIND`             | No       | Bind address (default: 0.0.0.0:8080) |
//! | `SEISQUAL_MAX_PAYLOAD_SIZE` | No       | Request size cap in bytes            |

use clap::Parser;
use seisqual::api::{build_router, AppState};
use seisqual::config::AppConfig;
use seisqual::db;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "seisqual-server",
    about = "Seisqual — seismic qualification data service"
)]
struct CliArgs {
    /// SQLite connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Port to listen on (default: 8080)
    #[arg(long, short)]
    port: Option<u16>,

    /// Bind address (overrides --port)
    #[arg(long)]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,seisqual=debug")),
        )
        .init();

    let args = CliArgs::parse();
    let config = AppConfig::from_env(args.database_url, args.bind_address, args.port);

    info!(bind = %config.bind_address, "Starting seisqual server");

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let app = build_router(AppState { db: pool })
        .layer(axum::extract::DefaultBodyLimit::max(config.max_payload_size));
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Seisqual listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Seisqual shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        info!("Failed to install Ctrl+C handler; running without graceful shutdown");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
