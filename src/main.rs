//! Roast Arena server entry point.

use clap::Parser;
use roast_arena::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roast_arena=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    tracing::info!(?config, "starting");

    roast_arena::server::serve(config).await?;
    Ok(())
}
