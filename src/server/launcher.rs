//! Embedded server process lifecycle.

use crate::server::{LauncherConfig, LauncherError, LauncherResult, LockFile, PortManager};

use std::panic::Location;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use error_location::ErrorLocation;
use tokio::sync::Mutex;
use tracing::{info, warn};

const SERVER_BINARY: &str = "appshell-server";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const READY_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identity of the running server process.
///
/// Existence means a start was requested, not that the server is
/// accepting connections; readiness is probed separately.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    pub pid: u32,
    pub port: u16,
}

impl ServerHandle {
    /// Loopback URL the native window should load.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// Manages the appshell-server process lifecycle.
///
/// Responsibilities:
/// - Start the server as a standalone detached process
/// - Probe readiness with a bounded loopback poll
/// - Handle graceful shutdown with a hard-kill fallback
/// - Maintain lock file
pub struct ServerManager {
    config: LauncherConfig,
    app_root: PathBuf,
    data_dir: PathBuf,
    launched: AtomicBool,
    handle: Mutex<Option<ServerHandle>>,
    lock_file: Mutex<Option<LockFile>>,
}

impl ServerManager {
    /// Create a new server manager.
    ///
    /// `app_root` is the directory holding the bundled web application
    /// (resource dir in production, working directory when run from source).
    pub fn new(app_root: PathBuf, data_dir: PathBuf, config: LauncherConfig) -> Self {
        Self {
            config,
            app_root,
            data_dir,
            launched: AtomicBool::new(false),
            handle: Mutex::new(None),
            lock_file: Mutex::new(None),
        }
    }

    /// Find the appshell-server binary.
    ///
    /// Search order:
    /// 1. Sibling to current exe (bundled production + dev builds)
    /// 2. Installed at <data_dir>/bin/appshell-server
    /// 3. System PATH
    fn find_server_binary(&self) -> LauncherResult<PathBuf> {
        let name = format!("{SERVER_BINARY}{}", std::env::consts::EXE_SUFFIX);

        // 1. Sibling to current executable
        if let Ok(exe) = std::env::current_exe()
            && let Some(exe_dir) = exe.parent()
        {
            let sibling = exe_dir.join(&name);
            if sibling.exists() {
                info!("Using {SERVER_BINARY} (sibling): {}", sibling.display());
                return Ok(sibling);
            }
        }

        // 2. Installed location
        let installed = self.data_dir.join("bin").join(&name);
        if installed.exists() {
            info!("Using {SERVER_BINARY} (installed): {}", installed.display());
            return Ok(installed);
        }

        // 3. System PATH
        #[cfg(unix)]
        if let Ok(output) = std::process::Command::new("which")
            .arg(SERVER_BINARY)
            .output()
            && output.status.success()
        {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                info!("Using {SERVER_BINARY} (PATH): {}", path);
                return Ok(PathBuf::from(path));
            }
        }

        Err(LauncherError::BinaryNotFound {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Start the server and probe until it answers on the loopback port.
    ///
    /// At most one start per process lifetime; a second call fails with
    /// `AlreadyLaunched` even if the first attempt errored, because no
    /// path in the launcher retries.
    ///
    /// Readiness degrades rather than fails: if the probe never answers
    /// within the startup timeout, a fixed grace delay is waited and the
    /// call still returns Ok. The native window may then load before the
    /// server accepts connections.
    pub async fn start(&self) -> LauncherResult<ServerHandle> {
        if self.launched.swap(true, Ordering::SeqCst) {
            return Err(LauncherError::AlreadyLaunched {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.ensure_data_dir()?;

        // Find available port, preferring the configured one
        let port =
            PortManager::find_available(self.config.server.port, self.config.server.port_range)?;

        info!("Using port {port}");

        // Acquire lock file; released on drop if anything below fails
        let mut lock = LockFile::acquire(&self.data_dir, port)?;

        let handle = self.spawn_process(port)?;

        // The detached server must keep the lock held even if the
        // launcher dies before a clean stop.
        if let Err(e) = lock.record_server_pid(handle.pid) {
            warn!("Failed to record server pid in lock file: {e}");
        }

        *self.lock_file.lock().await = Some(lock);
        *self.handle.lock().await = Some(handle.clone());

        if !self.wait_ready(port).await {
            // Fall back to the fixed grace delay and proceed anyway; there
            // is no feedback channel that would make waiting longer useful.
            let grace = Duration::from_millis(self.config.timeouts.ready_grace_ms);
            warn!(
                "Proceeding after fixed {}ms grace delay without readiness confirmation",
                grace.as_millis()
            );
            tokio::time::sleep(grace).await;
        }

        info!("Server started on port {port} (pid {})", handle.pid);

        Ok(handle)
    }

    /// Spawn appshell-server as a standalone detached process.
    ///
    /// Running the server in its own process keeps its signal handling
    /// isolated from the launcher; no process-global handler state is
    /// ever touched.
    fn spawn_process(&self, port: u16) -> LauncherResult<ServerHandle> {
        let server_binary = self.find_server_binary()?;

        let log_file = self
            .data_dir
            .join(&self.config.logging.directory)
            .join("appshell-server.log");

        let mut cmd = std::process::Command::new(&server_binary);
        cmd.current_dir(&self.app_root)
            .env("APPSHELL_SERVER_PORT", port.to_string())
            .env("APPSHELL_SERVER_HOST", &self.config.server.host)
            .env("APPSHELL_APP_ROOT", &self.app_root)
            .env("APPSHELL_LOG_LEVEL", &self.config.logging.level)
            .env("APPSHELL_LOG_FILE", &log_file)
            .env("APPSHELL_HEADLESS", "1") // native window supplies the UI
            .env("APPSHELL_DEV_MODE", "0");

        // Detach on Unix
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        // Close stdio - server logs to file via APPSHELL_LOG_FILE
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let child = cmd.spawn().map_err(|e| LauncherError::ProcessSpawn {
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let pid = child.id();
        info!("Spawned standalone {SERVER_BINARY} with PID: {pid}");

        // Don't keep the child handle - it's detached
        drop(child);

        Ok(ServerHandle { pid, port })
    }

    /// Poll the loopback port until the server answers.
    ///
    /// Any HTTP response counts as accepting connections; the launcher
    /// does not interpret the body.
    async fn wait_ready(&self, port: u16) -> bool {
        let timeout = Duration::from_secs(self.config.timeouts.startup_timeout_secs);
        let start = Instant::now();

        let Ok(client) = reqwest::Client::builder()
            .timeout(READY_PROBE_TIMEOUT)
            .build()
        else {
            return false;
        };

        let url = format!("http://127.0.0.1:{port}/");

        while start.elapsed() < timeout {
            tokio::time::sleep(READY_POLL_INTERVAL).await;

            if client.get(&url).send().await.is_ok() {
                info!("Server readiness probe passed");
                return true;
            }
        }

        warn!(
            "Server readiness probe timed out after {}s",
            timeout.as_secs()
        );
        false
    }

    /// Get the running server handle, if a start succeeded.
    pub async fn handle(&self) -> Option<ServerHandle> {
        self.handle.lock().await.clone()
    }

    /// Stop the server: graceful signal, bounded wait, then hard kill.
    ///
    /// Always returns within roughly the shutdown timeout; the hard kill
    /// at the end guarantees the detached process does not outlive us.
    pub async fn stop(&self) -> LauncherResult<()> {
        let handle = self.handle.lock().await.take();

        if let Some(ServerHandle { pid, port }) = handle {
            let timeout = Duration::from_secs(self.config.timeouts.shutdown_timeout_secs);

            #[cfg(unix)]
            {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;

                info!("Sending SIGTERM to pid {pid}");
                kill(Pid::from_raw(pid as i32), Signal::SIGTERM).ok();
            }

            #[cfg(windows)]
            {
                use windows_sys::Win32::System::Console::{
                    CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent,
                };

                info!("Sending CTRL_BREAK to pid {pid}");
                unsafe {
                    GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid);
                }
            }

            // Wait for the port to stop answering, bounded by the timeout
            let start = Instant::now();
            while start.elapsed() < timeout {
                if let Ok(client) = reqwest::Client::builder()
                    .timeout(Duration::from_millis(500))
                    .build()
                {
                    let url = format!("http://127.0.0.1:{port}/");
                    if client.get(&url).send().await.is_err() {
                        info!("Server stopped responding, shutdown complete");
                        break;
                    }
                }
                tokio::time::sleep(STOP_POLL_INTERVAL).await;
            }

            // Force kill if still running after timeout
            info!("Force killing server process (PID: {pid})");

            #[cfg(unix)]
            {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;

                kill(Pid::from_raw(pid as i32), Signal::SIGKILL).ok();
            }

            #[cfg(windows)]
            {
                std::process::Command::new("taskkill")
                    .args(["/F", "/PID", &pid.to_string()])
                    .output()
                    .ok();
            }
        }

        // Release lock file
        if let Some(mut lock) = self.lock_file.lock().await.take() {
            lock.release();
        }

        info!("Server stopped");

        Ok(())
    }

    /// Ensure data directory structure exists.
    fn ensure_data_dir(&self) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| LauncherError::DataDirCreation {
            path: self.data_dir.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let logs_dir = self.data_dir.join(&self.config.logging.directory);
        std::fs::create_dir_all(&logs_dir).map_err(|e| LauncherError::DataDirCreation {
            path: logs_dir,
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(())
    }
}
