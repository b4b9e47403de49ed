//! Platform helpers: process liveness and well-known paths.

use crate::config::RegistryConfig;
use crate::error::{Result, StringyError};
use std::path::PathBuf;

/// Check if a process with the given PID is alive.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }
        // Signal 0 probes existence; EPERM means it exists but is not ours
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        tracing::debug!("Process alive check not implemented for this platform");
        let _ = pid;
        true
    }
}

/// Get the Stringy global configuration directory.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/stringy` (XDG_CONFIG_HOME)
/// - **Windows**: `%APPDATA%\stringy`
/// - **macOS**: `~/Library/Application Support/stringy`
pub fn stringy_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| StringyError::Config {
        message: "Could not determine platform config directory".to_string(),
    })?;
    Ok(config_dir.join(RegistryConfig::APP_CONFIG_DIR_NAME))
}

/// Path to the global service registry database.
pub fn registry_db_path() -> Result<PathBuf> {
    Ok(stringy_config_dir()?.join(RegistryConfig::DB_FILENAME))
}
