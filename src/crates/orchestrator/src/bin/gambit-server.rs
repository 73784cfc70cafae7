//! Gambit server binary
//!
//! Standalone HTTP server exposing planning, execution and event-stream
//! endpoints over the agent engine.

use llm::{OpenAiClient, ProviderConfig};
use orchestrator::api::create_router;
use orchestrator::service::AgentService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tooling::config::EngineConfig;
use tooling::tools::builtin_registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tooling::logging::init();

    let config = EngineConfig::from_env()?;
    tracing::info!(?config, "engine configuration loaded");

    let provider = ProviderConfig::from_env()?;
    tracing::info!(model = %provider.model, base_url = %provider.base_url, "LLM provider configured");
    let model = Arc::new(OpenAiClient::new(provider));

    let workspace_root = std::env::current_dir()?;
    let tools = Arc::new(builtin_registry(&config, workspace_root)?);
    tracing::info!(tools = ?tools.names(), "tool registry initialized");

    let service = Arc::new(AgentService::new(model, tools, config));
    service.registry().spawn_sweeper(Duration::from_secs(60));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let router = create_router(service.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gambit server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(service))
        .await?;

    Ok(())
}

async fn shutdown_signal(service: Arc<AgentService>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown requested; cancelling pending executions");
    service.shutdown();
}
