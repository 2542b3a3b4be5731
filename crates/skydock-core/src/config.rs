//! skydock.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Skydock configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkydockConfig {
    pub edge: Option<EdgeSection>,
    pub docker: Option<DockerSection>,
}

/// Reverse-proxy routing settings for exposed apps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSection {
    /// Root domain for app hostnames (apps become `<name>.<base_domain>`).
    pub base_domain: String,
    /// Docker network the edge router reaches containers on.
    pub network: String,
    /// Router entrypoint name (e.g. "web" or "websecure").
    pub scheme: Option<String>,
    pub enable_tls: Option<bool>,
    /// Certificate resolver name, only meaningful with TLS enabled.
    pub cert_resolver: Option<String>,
}

/// Container-engine runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerSection {
    /// Prefix for managed container names.
    pub name_prefix: Option<String>,
    /// Upper bound on a single deploy, in seconds.
    pub deploy_timeout_secs: Option<u64>,
}

impl SkydockConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SkydockConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
