use std::sync::Arc;

use anyhow::Context;

use arogya_assist::advisory::AdvisoryClient;
use arogya_assist::channels::CliChannel;
use arogya_assist::config::AssistConfig;
use arogya_assist::llm::{LlmConfig, create_provider};
use arogya_assist::server;
use arogya_assist::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AssistConfig::from_env().map_err(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export GEMINI_API_KEY=...");
        e
    })?;

    eprintln!("🩺 Arogya Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   API: http://{}:{}/api/sessions", config.bind, config.port);
    eprintln!("   Log WS: ws://{}:{}/ws/sessions/{{id}}", config.bind, config.port);

    let llm = create_provider(&LlmConfig::from(&config)).context("creating advisory provider")?;
    let advisory = AdvisoryClient::new(llm);
    let store = Arc::new(SessionStore::new(advisory, config.timings));

    let server_store = store.clone();
    let bind = config.bind.clone();
    let port = config.port;
    let server = tokio::spawn(async move {
        if let Err(e) = server::serve(&bind, port, server_store).await {
            tracing::error!(error = %e, "Session server stopped");
        }
    });

    if config.cli_enabled {
        eprintln!("   Terminal: enabled (/quit to exit)\n");
        CliChannel::new(store).run().await?;
        server.abort();
    } else {
        eprintln!("   Terminal: disabled, Ctrl-C to stop\n");
        tokio::select! {
            _ = server => {}
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                tracing::info!("Shutting down");
            }
        }
    }

    Ok(())
}
