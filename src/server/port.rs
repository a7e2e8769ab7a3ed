//! Port allocation and availability checking.

use crate::server::{LauncherError, LauncherResult};

use std::panic::Location;

use error_location::ErrorLocation;

const HOST: &str = "127.0.0.1";

pub struct PortManager;

impl PortManager {
    /// Find an available port, preferring the given port.
    ///
    /// Algorithm:
    /// 1. Try preferred port first
    /// 2. If unavailable, scan range sequentially
    /// 3. Return first available port
    pub fn find_available(preferred: u16, range: (u16, u16)) -> LauncherResult<u16> {
        // Try preferred port first
        if Self::is_available(preferred) {
            return Ok(preferred);
        }

        // Search in range
        for port in range.0..=range.1 {
            if port != preferred && Self::is_available(port) {
                return Ok(port);
            }
        }

        Err(LauncherError::NoAvailablePort {
            start: range.0,
            end: range.1,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Check if a port is available for binding.
    ///
    /// Attempts to bind to 127.0.0.1:port. If successful,
    /// the port is available. The socket is immediately
    /// released when the listener is dropped.
    pub fn is_available(port: u16) -> bool {
        std::net::TcpListener::bind((HOST, port)).is_ok()
    }
}
