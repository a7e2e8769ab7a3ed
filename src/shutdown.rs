//! Guaranteed process teardown.
//!
//! The server runs as a detached process with no one joining it, so
//! normal unwind would never end the launcher. Teardown asks the server
//! to stop, bounded by a hard ceiling, then exits unconditionally.

use crate::server::ServerManager;

use std::sync::Arc;
use std::time::Duration;

use tauri::{AppHandle, Manager};
use tracing::{error, info};

/// Hard ceiling on teardown, independent of the configured shutdown
/// timeout. Process exit is never delayed past this point.
const TEARDOWN_CEILING: Duration = Duration::from_secs(10);

/// Stop the server (bounded) and end the process.
///
/// Invoked when the native window closes, when the user accepts an
/// update, and on fatal startup errors.
pub fn terminate(app_handle: &AppHandle, code: i32) -> ! {
    if let Some(manager) = app_handle.try_state::<Arc<ServerManager>>() {
        let manager = manager.inner().clone();
        tauri::async_runtime::block_on(async move {
            match tokio::time::timeout(TEARDOWN_CEILING, manager.stop()).await {
                Ok(Ok(())) => info!("Server stopped successfully"),
                Ok(Err(e)) => error!("Failed to stop server: {e}"),
                Err(_) => error!("Server stop exceeded teardown ceiling; exiting anyway"),
            }
        });
    }

    std::process::exit(code);
}

/// Unrecoverable startup error: log it, then tear down.
pub fn fatal(app_handle: &AppHandle, error: &dyn std::fmt::Display) -> ! {
    error!("Fatal startup error: {error}");
    terminate(app_handle, 1)
}
