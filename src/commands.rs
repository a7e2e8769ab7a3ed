//! Tauri IPC commands for the splash page.

use crate::launch::LaunchPhase;
use crate::server::{ServerHandle, ServerManager};
use crate::splash::SplashController;

use std::sync::Arc;

use serde::Serialize;
use tauri::State;

/// Launch status snapshot for the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchStatus {
    pub phase: String,
    pub message: String,
    pub app_url: Option<String>,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub ready: bool,
}

/// Called by the splash page once it has subscribed to status events.
///
/// The handshake protocol:
/// 1. Splash page subscribes to launch-status events
/// 2. Splash page calls frontend_ready (this command)
/// 3. Launcher responds with the current LaunchStatus
/// 4. If the sequence already advanced, the page has the latest phase
/// 5. Otherwise it waits for events
#[tauri::command]
pub async fn frontend_ready(
    splash: State<'_, Arc<SplashController>>,
    manager: State<'_, Arc<ServerManager>>,
) -> Result<LaunchStatus, String> {
    tracing::info!("Splash page ready, returning current launch status");

    let (phase, message) = splash.status();
    let handle = manager.handle().await;

    Ok(build_launch_status(phase, &message, handle.as_ref()))
}

/// Converts internal launch state to the frontend-facing status.
pub fn build_launch_status(
    phase: LaunchPhase,
    message: &str,
    handle: Option<&ServerHandle>,
) -> LaunchStatus {
    LaunchStatus {
        phase: phase.as_str().into(),
        message: message.into(),
        app_url: handle.map(|h| h.url()),
        port: handle.map(|h| h.port),
        pid: handle.map(|h| h.pid),
        ready: phase == LaunchPhase::Ready && handle.is_some(),
    }
}
