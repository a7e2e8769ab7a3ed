//! Native application window bound to the server's loopback URL.

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tracing::info;

pub const MAIN_LABEL: &str = "main";

const WINDOW_TITLE: &str = "AppShell";
const WINDOW_WIDTH: f64 = 1024.0;
const WINDOW_HEIGHT: f64 = 768.0;
const WINDOW_MIN_WIDTH: f64 = 800.0;
const WINDOW_MIN_HEIGHT: f64 = 600.0;

/// Create the single main window pointed at the server URL.
///
/// Idempotent: if the window already exists it is returned as-is, so
/// the window is created at most once per process lifetime.
pub fn create(app: &AppHandle, url: tauri::Url) -> tauri::Result<WebviewWindow> {
    if let Some(existing) = app.get_webview_window(MAIN_LABEL) {
        return Ok(existing);
    }

    info!("Opening main window at {url}");

    let window = WebviewWindowBuilder::new(app, MAIN_LABEL, WebviewUrl::External(url))
        .title(WINDOW_TITLE)
        .inner_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .min_inner_size(WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT)
        .resizable(true)
        .center()
        .build()?;

    window.set_focus().ok();

    Ok(window)
}
