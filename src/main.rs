use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use pinfile_core::RepositoryHandle;
use pinfile_core::config::load_route_table;

/// Serve files from local Git repositories as they were at a given commit.
#[derive(Parser, Debug)]
#[command(name = "pinfile-run")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PINFILE_PORT")]
    port: u16,

    /// Path to the YAML configuration declaring the served paths
    #[arg(long, env = "PINFILE_CONFIG")]
    config: PathBuf,

    /// Address to bind
    #[arg(long, env = "PINFILE_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Replace failure detail in 500 responses with a generic message
    #[arg(long, env = "PINFILE_REDACT_ERRORS")]
    redact_errors: bool,
}

/// Main entry point for the pinfile server
///
/// Loads the route table once, then serves it over HTTP until Ctrl-C.
///
/// # Environment Variables
/// - `PINFILE_PORT`: listening port (required unless `--port` is given)
/// - `PINFILE_CONFIG`: configuration file (required unless `--config` is given)
/// - `PINFILE_BIND`: bind address (default: "0.0.0.0")
/// - `PINFILE_REDACT_ERRORS`: hide failure detail in 500 responses
///
/// # Returns
/// * `Ok(())` - If the server shuts down cleanly
/// * `Err(anyhow::Error)` - If the configuration is invalid or the listener cannot be bound
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pinfile=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let routes = load_route_table(&args.config)?;

    for route in routes.iter() {
        tracing::info!(
            "serve {} corresponding to repo {} and file {}",
            route.endpoint(),
            route.repository().display(),
            route.path()
        );
        if let Err(e) = RepositoryHandle::open(route.repository()) {
            tracing::warn!(endpoint = route.endpoint(), "repository not available: {}", e);
        }
    }

    let state = AppState::new(routes).with_redacted_errors(args.redact_errors);
    let app = api_rest::router(state);

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ Starting pinfile on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("pinfile stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
