use std::path::PathBuf;

use anyhow::{Context, Result};
use bcd_core::config::{CoordinatorConfig, PartialConfig};
use bcd_core::types::BrowserKind;

/// Layers defaults < `coordinator.toml` < `BCD_*` env vars. CLI flags
/// are applied by the caller after this returns.
pub fn load(workspace: Option<&std::path::Path>) -> Result<CoordinatorConfig> {
    let mut config = CoordinatorConfig::default();

    if let Some(path) = config_file_path(workspace) {
        if path.exists() {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let partial: PartialConfig = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            config = config.merge(partial);
        }
    }

    config = config.merge(env_overrides());
    Ok(config)
}

fn config_file_path(workspace: Option<&std::path::Path>) -> Option<PathBuf> {
    let base = workspace.map(PathBuf::from).or_else(dirs::config_dir)?;
    Some(base.join("coordinator.toml"))
}

fn env_overrides() -> PartialConfig {
    PartialConfig {
        default_kind: std::env::var("BCD_DEFAULT_BROWSER").ok().and_then(|v| parse_kind(&v)),
        headless: std::env::var("BCD_HEADLESS").ok().and_then(|v| v.parse().ok()),
        proxy_port: std::env::var("BCD_PROXY_PORT").ok().and_then(|v| v.parse().ok()),
        ipc_timeout_secs: std::env::var("BCD_IPC_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()),
        readiness_timeout_secs: std::env::var("BCD_READINESS_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()),
    }
}

fn parse_kind(v: &str) -> Option<BrowserKind> {
    match v.to_ascii_lowercase().as_str() {
        "chrome" => Some(BrowserKind::Chrome),
        "edge" => Some(BrowserKind::Edge),
        "chromium" => Some(BrowserKind::Chromium),
        "brave" => Some(BrowserKind::Brave),
        "firefox" => Some(BrowserKind::Firefox),
        _ => None,
    }
}
