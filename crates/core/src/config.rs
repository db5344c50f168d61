use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::BrowserKind;

/// Assembled, immutable-for-the-process configuration. Built by layering
/// defaults, an optional `coordinator.toml`, environment variables, and
/// CLI flags (in increasing precedence) — the merge itself happens in
/// the CLI crate; this type is just the resolved result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub default_kind: Option<BrowserKind>,
    pub headless: bool,
    /// 0 means "ask the OS for a free port".
    pub proxy_port: u16,
    pub ipc_timeout: Duration,
    pub readiness_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_kind: None,
            headless: true,
            proxy_port: 0,
            ipc_timeout: Duration::from_secs(5),
            readiness_timeout: Duration::from_secs(15),
        }
    }
}

/// Mirrors `CoordinatorConfig` field-for-field but with every field
/// optional, for deserializing a partial `coordinator.toml` or a partial
/// set of environment overrides before merging onto the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConfig {
    pub default_kind: Option<BrowserKind>,
    pub headless: Option<bool>,
    pub proxy_port: Option<u16>,
    pub ipc_timeout_secs: Option<u64>,
    pub readiness_timeout_secs: Option<u64>,
}

impl CoordinatorConfig {
    pub fn merge(mut self, partial: PartialConfig) -> Self {
        if let Some(kind) = partial.default_kind {
            self.default_kind = Some(kind);
        }
        if let Some(headless) = partial.headless {
            self.headless = headless;
        }
        if let Some(port) = partial.proxy_port {
            self.proxy_port = port;
        }
        if let Some(secs) = partial.ipc_timeout_secs {
            self.ipc_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = partial.readiness_timeout_secs {
            self.readiness_timeout = Duration::from_secs(secs);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_overrides_present_fields() {
        let base = CoordinatorConfig::default();
        let merged = base.clone().merge(PartialConfig { headless: Some(false), ..Default::default() });
        assert!(!merged.headless);
        assert_eq!(merged.proxy_port, base.proxy_port);
        assert_eq!(merged.ipc_timeout, base.ipc_timeout);
    }
}
