//! Platform handle: the single lock around [`PlatformState`], the reset snapshot, and the
//! export / receive halves of the exchange protocol.
//!
//! Packaging and unpacking run outside the lock; only the logical store mutation is serialized.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::error::{ExchangeError, ExchangeResult};
use crate::package::{build_package, read_payload, PayloadRole};
use crate::seed::Seed;
use crate::state::PlatformState;
use crate::types::{Entity, ExchangePayload, ImportRequest, Metadata, ReceiveReport};

/// Delivers an exchange package to a peer's receive endpoint.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send `package` to `peer`, announcing `origin` as the sender. Returns the peer's
    /// acknowledgement body.
    async fn deliver(
        &self,
        peer: &str,
        origin: &str,
        package: Vec<u8>,
    ) -> ExchangeResult<serde_json::Value>;
}

pub struct Platform {
    id: String,
    state: Mutex<PlatformState>,
    snapshot: PlatformState,
}

impl Platform {
    pub fn new(id: impl Into<String>, snapshot: PlatformState) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(snapshot.clone()),
            snapshot,
        }
    }

    pub fn from_seed(id: impl Into<String>, seed: Seed) -> ExchangeResult<Self> {
        Ok(Self::new(id, seed.load()?))
    }

    /// This platform's identifier, as written into provenance tags.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run a read-only closure against the current state.
    pub async fn read<R>(&self, f: impl FnOnce(&PlatformState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    pub async fn import(&self, request: ImportRequest) -> ExchangeResult<Entity> {
        self.state.lock().await.import(request)
    }

    /// Local edit: shallow-merge `partial` into an entity's metadata.
    pub async fn update_metadata(&self, id: &str, partial: Metadata) -> ExchangeResult<Entity> {
        let mut state = self.state.lock().await;
        state.store.update_metadata(id, partial).cloned()
    }

    /// Restore the startup snapshot. Anything learned since startup is dropped.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = self.snapshot.clone();
        info!(platform = %self.id, "platform state reset to snapshot");
    }

    /// Package an entity for export without sending it.
    pub async fn export_package(&self, id: &str) -> ExchangeResult<Vec<u8>> {
        let payload = self.read(|state| state.export_payload(id)).await?;
        build_package(PayloadRole::Export, &payload)
    }

    /// Export protocol: package `id` and deliver it to `peer`.
    #[instrument(skip(self, transport), fields(platform = %self.id))]
    pub async fn export_to(
        &self,
        id: &str,
        peer: &str,
        transport: &dyn PeerTransport,
    ) -> ExchangeResult<serde_json::Value> {
        let package = self.export_package(id).await?;
        let ack = transport.deliver(peer, &self.id, package).await?;
        info!(id = %id, peer = %peer, "exported entity");
        Ok(ack)
    }

    /// Receive protocol: unpack an `EXPORT` package sent by `origin` and apply it.
    #[instrument(skip(self, package), fields(platform = %self.id, bytes = package.len()))]
    pub async fn receive_package(
        &self,
        package: &[u8],
        origin: &str,
    ) -> ExchangeResult<ReceiveReport> {
        if origin.trim().is_empty() {
            return Err(ExchangeError::MissingParameter("origin platform".into()));
        }
        let payload: ExchangePayload = read_payload(package, PayloadRole::Export)?;
        self.state.lock().await.receive(&self.id, origin, payload)
    }
}
