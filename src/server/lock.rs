//! Lock file marking a live launcher/server pair.

use crate::server::{LauncherError, LauncherResult};

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const LOCK_FILENAME: &str = "server.lock";

/// On-disk contents of the lock.
///
/// Both pids matter for staleness: the server runs detached, so it can
/// outlive the launcher that spawned it, and it does not exist yet when
/// the lock is first taken.
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    launcher_pid: u32,
    #[serde(default)]
    server_pid: Option<u32>,
    port: u16,
    started_at: String,
}

impl LockInfo {
    /// The lock is held as long as either recorded process is alive.
    fn is_live(&self) -> bool {
        pid_alive(self.launcher_pid) || self.server_pid.is_some_and(pid_alive)
    }
}

/// Owns the lock file for the lifetime of this launcher.
///
/// Removed on release/drop; a file left behind by a crash is reclaimed
/// once both recorded processes are gone.
pub struct LockFile {
    path: PathBuf,
    file: Option<File>,
    port: u16,
}

impl LockFile {
    /// Take the lock, refusing while a previous launcher or its
    /// detached server is still alive.
    pub fn acquire(data_dir: &Path, port: u16) -> LauncherResult<Self> {
        let path = data_dir.join(LOCK_FILENAME);

        if path.exists() {
            if let Ok(existing) = Self::read(&path) {
                if existing.is_live() {
                    return Err(LauncherError::AlreadyRunning {
                        path,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                tracing::info!(
                    "Reclaiming stale lock (launcher pid {}, server pid {:?})",
                    existing.launcher_pid,
                    existing.server_pid
                );
            }
            // Stale or unreadable, either way it no longer binds us
            std::fs::remove_file(&path).ok();
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600); // owner read/write only

        let file = options
            .open(&path)
            .map_err(|e| LauncherError::LockAcquisition {
                path: path.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut lock = Self {
            path,
            file: Some(file),
            port,
        };
        lock.write(None)?;

        Ok(lock)
    }

    /// Record the detached server's pid once it has been spawned, so
    /// staleness detection survives the launcher dying first.
    pub fn record_server_pid(&mut self, pid: u32) -> LauncherResult<()> {
        self.write(Some(pid))
    }

    fn write(&mut self, server_pid: Option<u32>) -> LauncherResult<()> {
        let info = LockInfo {
            launcher_pid: std::process::id(),
            server_pid,
            port: self.port,
            started_at: chrono::Utc::now().to_rfc3339(),
        };

        let content = serde_json::to_string_pretty(&info)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(file) = self.file.as_mut() {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        Ok(())
    }

    fn read(path: &Path) -> std::io::Result<LockInfo> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Delete the lock file. Also runs on drop.
    pub fn release(&mut self) {
        self.file.take();
        std::fs::remove_file(&self.path).ok();
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Whether a process with the given pid exists.
#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    // Signal 0 probes existence without delivering anything
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(windows)]
fn pid_alive(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }

        let mut exit_code: u32 = 0;
        let ok = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);

        ok != 0 && exit_code == STILL_ACTIVE as u32
    }
}
