use chat_relay_server::{
    build_router,
    config::{ClientConfig, ServerConfig},
    llm::build_client,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay_server=info,tower_http=info".into()),
        )
        .with_target(true)
        .init();

    info!("chat-relay-server v{}", env!("CARGO_PKG_VERSION"));

    let server_config = ServerConfig::from_env()?;
    let client_config = ClientConfig::from_env();
    info!(mode = client_config.mode(), "Upstream configured");

    let client = build_client(&client_config);
    let app = build_router(client, &server_config.static_dir);

    let addr = server_config.addr();
    info!(static_dir = %server_config.static_dir.display(), "Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
