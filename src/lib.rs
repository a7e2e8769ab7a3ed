mod commands;
mod launch;
mod logging;
mod server;
mod shutdown;
mod splash;
mod update;
mod window;

use logging::setup_logging;
use server::{LauncherConfig, ServerManager};
use splash::SplashController;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use tauri::Manager;
use tracing::info;

/// Directory holding the bundled web application inside the resource dir.
const APP_ROOT_DIR: &str = "webapp";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            // Focus existing window on second instance attempt
            if let Some(win) = app
                .get_webview_window(window::MAIN_LABEL)
                .or_else(|| app.get_webview_window(splash::SPLASH_LABEL))
            {
                win.show().ok();
                win.set_focus().ok();
            }
        }))
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            std::fs::create_dir_all(&data_dir)?;

            setup_logging(&data_dir)?;

            info!("Starting AppShell v{}", env!("CARGO_PKG_VERSION"));
            info!("Data directory: {:?}", data_dir);

            // Load or create config
            let config = LauncherConfig::load_or_create(&data_dir)
                .map_err(|e| format!("Config error: {}", e))?;

            let app_root = resolve_app_root(app);
            info!("App root: {:?}", app_root);

            let manager = Arc::new(ServerManager::new(app_root, data_dir, config.clone()));
            app.manage(manager.clone());

            // Setup signal handlers for graceful shutdown on Unix
            #[cfg(unix)]
            {
                let manager_for_signals = manager.clone();
                std::thread::spawn(move || {
                    use signal_hook::consts::{SIGINT, SIGTERM};
                    use signal_hook::iterator::Signals;
                    use tracing::error;

                    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to register signal handlers: {e}");
                            return;
                        }
                    };

                    if let Some(sig) = signals.forever().next() {
                        info!("Received signal {sig}, shutting down...");

                        tauri::async_runtime::block_on(async {
                            match manager_for_signals.stop().await {
                                Ok(()) => info!("Server stopped due to signal {sig}"),
                                Err(e) => error!("Failed to stop server on signal: {e}"),
                            }
                        });

                        std::process::exit(0);
                    }
                });
            }

            // Open the splash and drive the whole startup sequence from
            // a single background task.
            let controller = SplashController::open(app.handle())?;
            app.manage(controller.clone());

            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(splash::run_launch_sequence(
                app_handle, controller, manager, config,
            ));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![commands::frontend_ready])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            use tauri::RunEvent;

            // Fires when the last window closes (or on explicit exit);
            // the detached server process must not outlive us.
            if let RunEvent::ExitRequested { api, code, .. } = event {
                info!("Exit requested (code: {:?})", code);
                api.prevent_exit();
                shutdown::terminate(app_handle, code.unwrap_or(0));
            }
        });
}

/// Resolve the directory holding the web application.
///
/// Bundled installs carry it inside the Tauri resource dir; running
/// from source falls back to the working directory.
fn resolve_app_root(app: &tauri::App) -> PathBuf {
    if let Ok(resource_dir) = app.path().resource_dir() {
        let bundled = resource_dir.join(APP_ROOT_DIR);
        if bundled.exists() {
            return bundled;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
