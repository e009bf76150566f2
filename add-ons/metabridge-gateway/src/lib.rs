//! metabridge gateway: the HTTP face of one platform.
//!
//! Serves the platform's records, accepts local imports, and speaks the package exchange
//! protocol with the peers listed in [`PlatformConfig::peers`].

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use metabridge_core::{PeerTransport, Platform, PlatformConfig};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod peer;
pub mod routes;

pub use error::ApiError;
pub use peer::HttpPeerTransport;

/// Header naming the sending platform on `/receive`.
pub const ORIGIN_HEADER: &str = "x-origin-platform";

#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<Platform>,
    pub config: Arc<PlatformConfig>,
    pub transport: Arc<dyn PeerTransport>,
}

impl AppState {
    pub fn new(
        platform: Platform,
        config: PlatformConfig,
        transport: impl PeerTransport + 'static,
    ) -> Self {
        Self {
            platform: Arc::new(platform),
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_package_bytes;
    routes::router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
