//! metabridge gateway binary: one platform instance on one port.

use metabridge_core::{Platform, PlatformConfig, Seed};
use metabridge_gateway::{build_router, AppState, HttpPeerTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlatformConfig::load()?;
    let seed: Seed = config.seed.parse()?;
    let platform = Platform::from_seed(config.platform_id.clone(), seed)?;
    let transport = HttpPeerTransport::new(&config)?;

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        platform = %config.platform_id,
        seed = ?seed,
        peers = config.peers.len(),
        "starting gateway on {}",
        addr
    );

    let app = build_router(AppState::new(platform, config, transport));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
