//! MCP Gateway Registry server binary.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use mgr_infrastructure::config::ConfigLoader;
use mgr_infrastructure::di::init_app;
use mgr_server::routes::build_router;
use mgr_server::state::AppState;
use mgr_server::workers::spawn_workers;

#[derive(Parser)]
#[command(name = "mgr-server", about = "MCP Gateway Registry", version)]
struct Cli {
    /// Explicit configuration file (otherwise config/{MGR_ENV}.yaml)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mgr_infrastructure::logging::init(cli.json_logs);

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let config = loader.load()?;
    let bind_addr = format!("{}:{}", config.http.host, config.http.port);

    let ctx = std::sync::Arc::new(init_app(config).await?);
    let state = AppState::new(ctx)?;

    let cancel = CancellationToken::new();
    let workers = spawn_workers(state.clone(), cancel.clone());

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "mgr-server listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    for worker in workers {
        let _ = worker.await;
    }
    Ok(())
}
