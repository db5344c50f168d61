use std::path::PathBuf;
use std::sync::Arc;

use bcd_core::Controller;
use bcd_core::config::CoordinatorConfig;
use bcd_core::control_server;
use tracing::info;

use crate::error::Result;

pub async fn run(workspace: Option<PathBuf>, config: CoordinatorConfig) -> Result<()> {
    let controller = Arc::new(Controller::start(workspace.clone(), config).await?);
    info!(target = "bcd.cli", port = controller.proxy_port(), "coordinator listening");

    let control_handle = control_server::spawn(workspace, Arc::clone(&controller)).await?;

    wait_for_shutdown_signal().await;
    info!(target = "bcd.cli", "shutdown requested");

    control_handle.abort();
    controller.shutdown().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(windows)]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
