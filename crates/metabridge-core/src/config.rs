//! Platform configuration loaded from a TOML file and the environment.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for one platform instance.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | platform_id | AiiDA | Identifier written into provenance tags and sent to peers. |
/// | host / port | 127.0.0.1 / 5002 | Listen address of the gateway. |
/// | seed | aiida | Bundled startup dataset: aiida, openbis or empty. |
/// | peers | {} | Peer platform id -> base URL. |
/// | peer_timeout_secs | 10 | Per-attempt timeout of an outbound export. |
/// | peer_retries | 1 | Extra attempts after a transport failure. |
/// | max_package_bytes | 16 MiB | Largest accepted package body. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub platform_id: String,
    pub host: String,
    pub port: u16,
    pub seed: String,
    #[serde(default)]
    pub peers: BTreeMap<String, String>,
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
    #[serde(default = "default_peer_retries")]
    pub peer_retries: u32,
    #[serde(default = "default_max_package_bytes")]
    pub max_package_bytes: usize,
}

fn default_peer_timeout_secs() -> u64 {
    10
}

fn default_peer_retries() -> u32 {
    1
}

fn default_max_package_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform_id: "AiiDA".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5002,
            seed: "aiida".to_string(),
            peers: BTreeMap::new(),
            peer_timeout_secs: default_peer_timeout_secs(),
            peer_retries: default_peer_retries(),
            max_package_bytes: default_max_package_bytes(),
        }
    }
}

impl PlatformConfig {
    /// Load config from file and environment. Precedence: `METABRIDGE__*` env vars > file at
    /// `METABRIDGE_CONFIG` (default `config/platform`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("METABRIDGE_CONFIG").unwrap_or_else(|_| "config/platform".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("platform_id", defaults.platform_id)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("seed", defaults.seed)?
            .set_default("peer_timeout_secs", defaults.peer_timeout_secs)?
            .set_default("peer_retries", i64::from(defaults.peer_retries))?
            .set_default("max_package_bytes", defaults.max_package_bytes as u64)?;

        let path = Path::new(config_path);
        let with_ext = path.with_extension("toml");
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else if with_ext.exists() {
            builder.add_source(config::File::from(with_ext))
        } else {
            builder
        };

        builder
            .add_source(config::Environment::with_prefix("METABRIDGE").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Base URL of a configured peer. Names match case-insensitively since environment
    /// overrides arrive lower-cased.
    pub fn peer_url(&self, peer: &str) -> Option<&str> {
        self.peers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(peer))
            .map(|(_, url)| url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = PlatformConfig::load_from("does/not/exist").unwrap();
        assert_eq!(cfg.port, 5002);
        assert_eq!(cfg.peer_timeout_secs, 10);
        assert_eq!(cfg.peer_retries, 1);
        assert_eq!(cfg.max_package_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn peer_url_strips_trailing_slash() {
        let mut cfg = PlatformConfig::default();
        cfg.peers
            .insert("openBIS".into(), "http://127.0.0.1:5001/".into());
        assert_eq!(cfg.peer_url("openBIS"), Some("http://127.0.0.1:5001"));
        assert_eq!(cfg.peer_url("openbis"), Some("http://127.0.0.1:5001"));
        assert_eq!(cfg.peer_url("nobody"), None);
    }
}
