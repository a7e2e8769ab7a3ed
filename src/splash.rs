//! Splash window lifecycle and the background startup sequence.

use crate::launch::{LaunchPhase, LaunchState};
use crate::server::{LauncherConfig, ServerManager};
use crate::update::{self, UpdateOutcome};
use crate::{shutdown, window};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tauri::{AppHandle, Emitter, Manager, WebviewUrl, WebviewWindowBuilder};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_shell::ShellExt;
use tracing::{error, info, warn};

pub const SPLASH_LABEL: &str = "splash";

// Splash event name (must match ui/splash.html)
const EVENT_LAUNCH_STATUS: &str = "launch-status";

const SPLASH_WIDTH: f64 = 400.0;
const SPLASH_HEIGHT: f64 = 250.0;

/// Delay between splash creation and the start of heavy work, so the
/// window has painted before the webview competes for the CPU.
const SPLASH_PAINT_DELAY: Duration = Duration::from_millis(200);

/// How the splash hands control back to the main flow.
pub enum Release {
    /// Create the main window, then close the splash
    OpenWindow { url: String },
    /// End the whole process (update accepted or unrecoverable error)
    Terminate,
}

/// Owns the splash window and the launch state shown on it.
///
/// All status text reaches the splash page as Tauri events drained by
/// the webview's own event loop; the background task never touches
/// window objects directly.
pub struct SplashController {
    app: AppHandle,
    state: LaunchState,
    released: AtomicBool,
}

impl SplashController {
    /// Create the centered, borderless, fixed-size splash window.
    pub fn open(app: &AppHandle) -> tauri::Result<Arc<Self>> {
        let _window =
            WebviewWindowBuilder::new(app, SPLASH_LABEL, WebviewUrl::App("splash.html".into()))
                .title("AppShell")
                .inner_size(SPLASH_WIDTH, SPLASH_HEIGHT)
                .resizable(false)
                .decorations(false)
                .always_on_top(true)
                .center()
                .build()?;

        // Events emitted before the splash page subscribes are lost;
        // the page recovers them through the frontend_ready handshake.
        Ok(Arc::new(Self {
            app: app.clone(),
            state: LaunchState::new(),
            released: AtomicBool::new(false),
        }))
    }

    /// Current phase and status text.
    pub fn status(&self) -> (LaunchPhase, String) {
        (self.state.phase(), self.state.message())
    }

    /// Advance the launch state and push the new status to the splash.
    ///
    /// Regressions are refused by the state machine and dropped here.
    pub fn set_phase(&self, phase: LaunchPhase, message: &str) {
        if !self.state.advance(phase, message) {
            return;
        }
        info!("Launch phase: {} - {message}", phase.as_str());
        self.emit_status(phase, message);
    }

    fn emit_status(&self, phase: LaunchPhase, message: &str) {
        let payload = serde_json::json!({
            "phase": phase.as_str(),
            "message": message,
        });
        self.app
            .emit_to(SPLASH_LABEL, EVENT_LAUNCH_STATUS, payload)
            .ok();
    }

    /// Hand control back to the main flow. Effective exactly once per
    /// process lifetime; later calls are logged and dropped.
    ///
    /// The main window is created before the splash closes so the
    /// app-level exit request never fires during the hand-off.
    pub fn release(&self, release: Release) {
        if self.released.swap(true, Ordering::SeqCst) {
            warn!("Release requested more than once; ignoring");
            return;
        }

        match release {
            Release::OpenWindow { url } => {
                let app = self.app.clone();
                let result = self.app.run_on_main_thread(move || {
                    let parsed = match url.parse::<tauri::Url>() {
                        Ok(u) => u,
                        Err(e) => shutdown::fatal(&app, &format!("invalid server url {url:?}: {e}")),
                    };
                    match window::create(&app, parsed) {
                        Ok(_) => {
                            if let Some(splash) = app.get_webview_window(SPLASH_LABEL) {
                                splash.destroy().ok();
                            }
                        }
                        // No window, no server worth serving: fatal
                        Err(e) => shutdown::fatal(&app, &e),
                    }
                });

                if let Err(e) = result {
                    error!("Failed to reach main thread for window creation: {e}");
                    std::process::exit(1);
                }
            }
            Release::Terminate => {
                info!("Terminating from splash stage");
                self.app.exit(0);
            }
        }
    }
}

/// The single background task driving the startup sequence:
/// update check, update decision, server start, release.
pub async fn run_launch_sequence(
    app: AppHandle,
    splash: Arc<SplashController>,
    manager: Arc<ServerManager>,
    config: LauncherConfig,
) {
    tokio::time::sleep(SPLASH_PAINT_DELAY).await;

    splash.set_phase(LaunchPhase::CheckingUpdate, "Checking for updates...");

    let outcome = if config.update.enabled {
        update::check(
            env!("CARGO_PKG_VERSION"),
            &config.update.manifest_url,
            Duration::from_secs(config.update.check_timeout_secs),
        )
        .await
    } else {
        UpdateOutcome::NoUpdate
    };

    if let UpdateOutcome::UpdateAvailable {
        latest_version,
        download_url,
    } = outcome
    {
        splash.set_phase(
            LaunchPhase::UpdateOffered,
            &format!("Version {latest_version} is available"),
        );

        if offer_update(&app, &latest_version).await {
            if !download_url.is_empty() {
                if let Err(e) = app.shell().open(&download_url, None) {
                    warn!("Failed to open download page: {e}");
                }
            }
            splash.set_phase(LaunchPhase::Aborted, "Update accepted, closing...");
            splash.release(Release::Terminate);
            return;
        }
    }

    // CheckFailed is handled exactly like NoUpdate: startup never blocks
    // on network problems.
    splash.set_phase(LaunchPhase::StartingServer, "Starting application server...");

    let url = match manager.start().await {
        Ok(handle) => handle.url(),
        Err(e) => {
            // Fail open: there is no feedback channel from the server,
            // so the window opens against the configured address anyway.
            error!("Server start failed: {e}\nHint: {}", e.recovery_hint());
            format!("http://{}:{}", config.server.host, config.server.port)
        }
    };

    splash.set_phase(LaunchPhase::Ready, "Ready");
    splash.release(Release::OpenWindow { url });
}

/// Blocking confirmation dialog parented to the splash window.
///
/// Returns true when the user chooses to update now.
async fn offer_update(app: &AppHandle, latest_version: &str) -> bool {
    let app = app.clone();
    let message = format!(
        "Version {latest_version} is available (you have {}).\n\nUpdate now?",
        env!("CARGO_PKG_VERSION"),
    );

    let answer = tauri::async_runtime::spawn_blocking(move || {
        let mut dialog = app
            .dialog()
            .message(&message)
            .title("Update available")
            .kind(MessageDialogKind::Info)
            .buttons(MessageDialogButtons::OkCancelCustom(
                "Update now".into(),
                "Later".into(),
            ));

        if let Some(splash) = app.get_webview_window(SPLASH_LABEL) {
            dialog = dialog.parent(&splash);
        }

        dialog.blocking_show()
    })
    .await;

    answer.unwrap_or_else(|e| {
        warn!("Update dialog task failed: {e}");
        false
    })
}
