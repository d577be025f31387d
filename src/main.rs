use anyhow::Context;
use clap::Parser;
use tracing::info;

use kitchen_api::{bootstrap, build_router, config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::parse();

    bootstrap(&config)
        .await
        .with_context(|| format!("failed to prepare data root {}", config.root.display()))?;
    info!(
        recipes = %config.recipes_file().display(),
        media = %config.media_dir().display(),
        "data root ready"
    );

    let state = AppState::from_config(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("listening on {}", listener.local_addr()?);
    info!("API: http://{}/api/recipes", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
