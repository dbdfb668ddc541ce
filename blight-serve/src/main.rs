use blight_serve::{config::AppConfig, model, observability, server, ModelHost};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Init
    observability::init_tracing();
    let metrics = observability::install_metrics()?;
    model::loader::init_ort()?;

    // 2. Load Config
    let config_path = std::env::var("BLIGHT_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = AppConfig::load(&config_path)?;
    config.apply_env()?;

    // 3. Load the model; no model, no server
    info!("Loading model from {}", config.model.path);
    let model = model::loader::load_model(&config.model.path)?;
    let host = ModelHost::from_config(Arc::new(model), &config.model);
    info!(
        "Serving {} classes: {:?}",
        host.labels().len(),
        host.labels().iter().collect::<Vec<_>>()
    );

    // 4. Create Router
    let app = server::routes::create_router(host, &config, Some(metrics));

    // 5. Bind & Serve
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server listening on http://{}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
