use tracing::info;

use hush_relay::{Dispatcher, RelayConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hush=debug,tower_http=debug".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let addr = config.addr()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Hush relay listening on {}", addr);
    axum::serve(listener, app(Dispatcher::new())).await?;

    Ok(())
}
