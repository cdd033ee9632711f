//! OnlyGames auth API server binary.
//!
//! Prints `{"port": N}` to stdout once bound so callers using an ephemeral
//! port can discover it.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use og_api::config::ApiConfig;
use og_core::store::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,og_api=debug,og_core=debug";

/// Credential store backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// PostgreSQL at `--database-url`.
    Postgres,
    /// Process memory. Accounts vanish on exit.
    Memory,
}

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "og_api_server", about = "OnlyGames auth API server")]
struct Args {
    /// Address to listen on (port 0 = ephemeral).
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Credential store backend.
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres)]
    store: StoreKind,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the port message.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    // A missing signing secret stops the server here.
    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    info!(
        bind_addr = %config.bind_addr,
        store = ?args.store,
        token_ttl_secs = config.auth.token_ttl.num_seconds(),
        "starting og_api_server"
    );

    let store: Arc<dyn CredentialStore> = match args.store {
        StoreKind::Postgres => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(config.auth.store_timeout)
                .connect(&config.database_url)
                .await?;

            let store = PgCredentialStore::new(pool);
            info!("running database migrations");
            store.migrate().await?;
            Arc::new(store)
        }
        StoreKind::Memory => {
            warn!("using in-memory credential store; accounts are lost on exit");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let state = og_api::AppState::new(store, &config.auth)?;
    let app = og_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    println!("{}", serde_json::json!({ "port": local_addr.port() }));
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
