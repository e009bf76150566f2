//! Outbound side of the exchange: POSTs packages to a peer's `/receive` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use metabridge_core::{ExchangeError, ExchangeResult, PeerTransport, PlatformConfig};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::ORIGIN_HEADER;

/// HTTP transport to the peers named in the platform config.
///
/// Each attempt is bounded by `peer_timeout_secs`. Transport errors (connect, timeout) are
/// retried up to `peer_retries` times; a peer that answers with a non-2xx status is not. A 409
/// after a retry is reported separately since the timed-out attempt may have landed.
pub struct HttpPeerTransport {
    client: reqwest::Client,
    config: PlatformConfig,
}

impl HttpPeerTransport {
    pub fn new(config: &PlatformConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.peer_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn receive_url(&self, peer: &str) -> Option<String> {
        self.config
            .peer_url(peer)
            .map(|base| format!("{}/receive", base))
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn deliver(
        &self,
        peer: &str,
        origin: &str,
        package: Vec<u8>,
    ) -> ExchangeResult<serde_json::Value> {
        let url = self
            .receive_url(peer)
            .ok_or_else(|| ExchangeError::UnknownPeer(peer.to_string()))?;

        let mut attempt = 0;
        let response = loop {
            debug!(url = %url, attempt, "sending package to peer");
            let sent = self
                .client
                .post(&url)
                .header(ORIGIN_HEADER, origin)
                .header(CONTENT_TYPE, "application/zip")
                .body(package.clone())
                .send()
                .await;
            match sent {
                Ok(response) => break response,
                Err(err) if attempt < self.config.peer_retries => {
                    attempt += 1;
                    warn!(peer = %peer, attempt, error = %err, "peer call failed, retrying");
                }
                Err(err) => {
                    return Err(ExchangeError::PeerUnavailable(format!("{}: {}", peer, err)));
                }
            }
        };

        let status = response.status();
        if status == StatusCode::CONFLICT && attempt > 0 {
            // A timed-out attempt may have been applied before the retry arrived.
            let body = response.text().await.unwrap_or_default();
            warn!(peer = %peer, attempt, "peer reports a conflict after a retried delivery");
            return Err(ExchangeError::PeerUnavailable(format!(
                "{} answered {} on retry {}, an earlier attempt may already have been applied: {}",
                peer, status, attempt, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::PeerUnavailable(format!(
                "{} answered {}: {}",
                peer, status, body
            )));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ExchangeError::PeerUnavailable(format!("{}: invalid reply: {}", peer, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpPeerTransport {
        let mut config = PlatformConfig::default();
        config
            .peers
            .insert("openBIS".into(), "http://127.0.0.1:5001/".into());
        config.peer_timeout_secs = 1;
        config.peer_retries = 0;
        HttpPeerTransport::new(&config).unwrap()
    }

    #[test]
    fn receive_url_is_built_from_peer_base() {
        let t = transport();
        assert_eq!(
            t.receive_url("openbis").as_deref(),
            Some("http://127.0.0.1:5001/receive")
        );
        assert_eq!(t.receive_url("ghost"), None);
    }

    #[tokio::test]
    async fn conflict_after_timed_out_attempt_is_reported_as_possibly_applied() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // First call outlives the client timeout, the retry answers 409.
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let app = axum::Router::new().route(
            "/receive",
            axum::routing::post(move || {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                    (axum::http::StatusCode::CONFLICT, "duplicate title")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = PlatformConfig::default();
        config.peers.insert("openBIS".into(), url);
        config.peer_timeout_secs = 1;
        config.peer_retries = 1;
        let err = HttpPeerTransport::new(&config)
            .unwrap()
            .deliver("openBIS", "AiiDA", b"zip".to_vec())
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match err {
            ExchangeError::PeerUnavailable(message) => {
                assert!(message.contains("409"));
                assert!(message.contains("may already have been applied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_peer_is_rejected_before_any_call() {
        let err = transport()
            .deliver("ghost", "AiiDA", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownPeer(_)));
    }
}
