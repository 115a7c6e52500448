use std::sync::Arc;

use tokio::net::TcpListener;

use promptpair::config::Config;
use promptpair::dispatch::http::HttpDispatch;
use promptpair::form::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env next to the binary first, then the cargo project root
    // (target/release/../..), then dotenvy's default CWD search.
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.to_path_buf()));
    match exe_dir {
        Some(dir) if dir.join(".env").exists() => {
            dotenvy::from_path(dir.join(".env")).ok();
        }
        Some(dir) if dir.join("../../.env").exists() => {
            dotenvy::from_path(dir.join("../../.env")).ok();
        }
        _ => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("promptpair starting");

    let config = Config::load()?;
    tracing::debug!(?config, "configuration loaded");

    let client = HttpDispatch::new(&config.base_url, config.api_key.clone(), config.timeout)?;
    tracing::info!("forwarding completions to {}", client.base_url());
    let state = AppState::new(Arc::new(client), config.num_pairs, config.defaults.clone())?;
    let app = form::router(Arc::new(state));

    let listener = TcpListener::bind(&config.bind)
        .await
        .inspect_err(|e| tracing::error!("failed to bind {}: {e}", config.bind))?;
    tracing::info!(
        "listening on http://{} ({} prompt pairs)",
        listener.local_addr()?,
        config.num_pairs
    );

    axum::serve(listener, app).await?;

    tracing::info!("promptpair shutting down");
    Ok(())
}
