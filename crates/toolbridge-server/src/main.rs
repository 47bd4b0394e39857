use std::{net::SocketAddr, sync::Arc};

use toolbridge_server::{AppState, McpService, ServerConfig, create_router};
use toolbridge_session::SessionRouter;
use toolbridge_tools::{MemoryRecordStore, builtin_tools};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let session = Arc::new(SessionRouter::new(config.routing_policy));
    let store = Arc::new(MemoryRecordStore::new());
    let registry = builtin_tools(
        Arc::clone(&session),
        store,
        config.telegram.clone(),
        config.github.clone(),
    );
    let service = Arc::new(McpService::new(Arc::new(registry)));

    tracing::info!(
        tools = service.tool_count(),
        policy = ?config.routing_policy,
        telegram = config.telegram.is_some(),
        github = config.github.is_some(),
        "server configured"
    );

    let app = create_router(AppState { session, service });

    let host = if config.bind_all {
        [0, 0, 0, 0]
    } else {
        [127, 0, 0, 1]
    };
    let addr = SocketAddr::from((host, config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    tracing::info!("MCP endpoint at http://{addr}/mcp");

    axum::serve(listener, app).await?;
    Ok(())
}
