//! Roombook - room booking server
//!
//! Serves the booking protocol over TCP until interrupted.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roombook_net::Server;

mod cli;
mod state;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Roombook");

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Migrations and admin bootstrap touch the database synchronously
    let startup = tokio::task::spawn_blocking(move || state::AppState::bootstrap(&config)).await;
    let app_state = match startup {
        Ok(Ok(state)) => state,
        Ok(Err(e)) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Startup task failed: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::start(&app_state.listen_addr, app_state.server_options()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server on {}: {}", app_state.listen_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %server.addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    server.shutdown();
    tracing::info!("Roombook stopped");
}
