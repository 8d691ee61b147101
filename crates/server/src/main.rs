use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use subwatch_notify::DispatchRunner;
use subwatch_server::state::local_now;
use subwatch_server::{build_router, AppState};
use subwatch_store::SubscriptionStore;

/// Subscription tracker with due-date push notifications.
#[derive(Parser, Debug)]
#[command(name = "subwatch-server", version, about)]
struct Cli {
    /// Config profile; keys are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "SUBWATCH_PROFILE")]
    profile: Option<String>,

    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Directory holding subscriptions.json (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and run the background dispatcher (default)
    Serve,
    /// Run a single dispatch cycle, print the report as JSON and exit
    DispatchOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    subwatch_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = subwatch_core::Config::for_profile(cli.profile.as_deref().unwrap_or(""));
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }
    config.log_summary();

    let store = Arc::new(SubscriptionStore::open(config.storage.store_path())?);
    let state = Arc::new(AppState::from_config(&config, store)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, state).await,
        Command::DispatchOnce => {
            let report = state.dispatcher.run_cycle(local_now()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: &subwatch_core::Config, state: Arc<AppState>) -> anyhow::Result<()> {
    let runner = if config.notify.dispatch_enabled {
        Some(DispatchRunner::new(state.dispatcher.clone()).spawn())
    } else {
        info!("Background dispatch disabled");
        None
    };

    let app = build_router(state, &config.server.cors_origin);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(runner) = runner {
        runner.stop().await;
    }
    info!("subwatch-server exited cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl_c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
