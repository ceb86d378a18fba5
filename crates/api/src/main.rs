use anyhow::Context;

use catalog_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.database.is_none() {
        tracing::warn!("DATABASE_URL not set; using in-memory product store");
    }

    let app = catalog_api::app::build_app(&config)
        .await
        .context("failed to initialize product store")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
