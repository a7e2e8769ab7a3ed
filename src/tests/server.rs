//! Unit tests for port allocation, lock file, and the server manager.

use crate::server::{
    LauncherConfig, LauncherError, LockFile, PortManager, ServerHandle, ServerManager,
};

use std::net::TcpListener;

// =============================================================================
// PortManager
// =============================================================================

#[test]
fn test_bound_port_reported_unavailable() {
    let busy = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let busy_port = busy.local_addr().unwrap().port();

    assert!(!PortManager::is_available(busy_port));
}

#[test]
fn given_preferred_port_busy_when_finding_then_range_fallback_used() {
    let busy = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let busy_port = busy.local_addr().unwrap().port();

    let found = PortManager::find_available(busy_port, (busy_port, busy_port + 20)).unwrap();

    assert_ne!(found, busy_port);
    assert!(found > busy_port && found <= busy_port + 20);
}

#[test]
fn given_exhausted_range_when_finding_then_no_available_port() {
    let busy = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let busy_port = busy.local_addr().unwrap().port();

    let result = PortManager::find_available(busy_port, (busy_port, busy_port));

    assert!(matches!(
        result,
        Err(LauncherError::NoAvailablePort { .. })
    ));
}

// =============================================================================
// LockFile
// =============================================================================

#[test]
fn test_lock_acquire_writes_file_and_release_removes_it() {
    let dir = tempfile::tempdir().unwrap();

    let mut lock = LockFile::acquire(dir.path(), 8501).unwrap();
    let lock_path = dir.path().join("server.lock");
    assert!(lock_path.exists());

    let content = std::fs::read_to_string(&lock_path).unwrap();
    assert!(content.contains(&std::process::id().to_string()));
    assert!(content.contains("8501"));

    lock.release();
    assert!(!lock_path.exists());
}

#[test]
fn given_live_lock_when_acquiring_again_then_already_running() {
    let dir = tempfile::tempdir().unwrap();

    let _lock = LockFile::acquire(dir.path(), 8501).unwrap();

    // Our own PID is alive, so the second acquire must refuse
    assert!(matches!(
        LockFile::acquire(dir.path(), 8502),
        Err(LauncherError::AlreadyRunning { .. })
    ));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("server.lock");

    {
        let _lock = LockFile::acquire(dir.path(), 8501).unwrap();
        assert!(lock_path.exists());
    }

    assert!(!lock_path.exists());
}

#[cfg(unix)]
fn reaped_pid() -> u32 {
    // A reaped child's PID is (almost certainly) no longer running
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

#[cfg(unix)]
#[test]
fn given_stale_lock_from_dead_processes_when_acquiring_then_lock_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("server.lock");
    let dead_pid = reaped_pid();

    std::fs::write(
        &lock_path,
        format!(
            r#"{{"launcher_pid":{dead_pid},"server_pid":null,"port":8501,"started_at":"2024-01-01T00:00:00Z"}}"#
        ),
    )
    .unwrap();

    let _lock = LockFile::acquire(dir.path(), 8502).unwrap();
    let content = std::fs::read_to_string(&lock_path).unwrap();
    assert!(content.contains(&std::process::id().to_string()));
}

#[cfg(unix)]
#[test]
fn given_dead_launcher_with_live_server_when_acquiring_then_already_running() {
    let dir = tempfile::tempdir().unwrap();
    let dead_pid = reaped_pid();

    // The server outlived the launcher that spawned it: still locked.
    // Our own PID stands in for the live detached server.
    std::fs::write(
        dir.path().join("server.lock"),
        format!(
            r#"{{"launcher_pid":{dead_pid},"server_pid":{},"port":8501,"started_at":"2024-01-01T00:00:00Z"}}"#,
            std::process::id()
        ),
    )
    .unwrap();

    assert!(matches!(
        LockFile::acquire(dir.path(), 8502),
        Err(LauncherError::AlreadyRunning { .. })
    ));
}

#[test]
fn test_recorded_server_pid_persisted_in_lock_file() {
    let dir = tempfile::tempdir().unwrap();

    let mut lock = LockFile::acquire(dir.path(), 8501).unwrap();
    lock.record_server_pid(424242).unwrap();

    let content = std::fs::read_to_string(dir.path().join("server.lock")).unwrap();
    assert!(content.contains("424242"));
    assert!(content.contains(&std::process::id().to_string()));
}

// =============================================================================
// ServerManager
// =============================================================================

fn test_manager() -> (ServerManager, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let manager = ServerManager::new(
        dir.path().join("webapp"),
        dir.path().to_path_buf(),
        LauncherConfig::default(),
    );
    (manager, dir)
}

#[tokio::test]
async fn given_no_server_binary_when_starting_then_binary_not_found() {
    let (manager, _dir) = test_manager();

    assert!(matches!(
        manager.start().await,
        Err(LauncherError::BinaryNotFound { .. })
    ));
    assert!(manager.handle().await.is_none());
}

#[tokio::test]
async fn test_second_start_refused_even_after_failure() {
    let (manager, _dir) = test_manager();

    // First attempt fails (no binary in the test environment) but still
    // consumes the single start permitted per process lifetime.
    assert!(manager.start().await.is_err());

    assert!(matches!(
        manager.start().await,
        Err(LauncherError::AlreadyLaunched { .. })
    ));
}

#[tokio::test]
async fn given_failed_start_then_lock_file_released() {
    let (manager, dir) = test_manager();

    let _ = manager.start().await;

    assert!(!dir.path().join("server.lock").exists());
}

#[tokio::test]
async fn test_stop_without_start_is_a_no_op() {
    let (manager, _dir) = test_manager();

    assert!(manager.stop().await.is_ok());
}

#[test]
fn test_server_handle_url() {
    let handle = ServerHandle {
        pid: 42,
        port: 8501,
    };

    assert_eq!(handle.url(), "http://127.0.0.1:8501");
}
