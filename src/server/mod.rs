mod config;
mod error;
mod launcher;
mod lock;
mod port;

pub use config::{
    CONFIG_VERSION, LauncherConfig, LoggingSettings, ServerSettings, TimeoutSettings,
    UpdateSettings,
};
pub use error::{LauncherError, Result as LauncherResult};
pub use launcher::{ServerHandle, ServerManager};
pub use lock::LockFile;
pub use port::PortManager;
