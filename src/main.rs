use anyhow::{Context, Result};
use clap::Parser;
use douane::{create_router, AppState, Config};
use tracing::info;

#[derive(Parser)]
#[command(name = "douane", about = "LLM-backed customs tariff lookup service")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/douane")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("starting {}", cfg.service.name);
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);

    let state = AppState::new(cfg)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}
