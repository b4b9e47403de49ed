//! Centralized configuration for Stringy.
//!
//! Constants for the service registry, the IPC transport and service
//! resolution. Runtime-tunable resolution behavior lives in
//! [`crate::retry::ResolvePolicy`], whose defaults come from [`LocatorConfig`].

use std::time::Duration;

/// Service registry and IPC transport configuration.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Directory name under the platform config dir.
    pub const APP_CONFIG_DIR_NAME: &'static str = "stringy";
    pub const DB_FILENAME: &'static str = "registry.db";
    pub const BUSY_TIMEOUT_MS: u32 = 5_000;

    pub const IPC_BIND_ADDR: &'static str = "127.0.0.1:0";
    pub const IPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const MAX_IPC_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB
    pub const MAX_IPC_CONNECTIONS: usize = 32;
}

/// Defaults for resolving an interface to a live instance.
pub struct LocatorConfig;

impl LocatorConfig {
    pub const RESOLVE_MAX_ATTEMPTS: u32 = 8;
    pub const RESOLVE_BASE_DELAY: Duration = Duration::from_millis(100);
    pub const RESOLVE_MAX_DELAY: Duration = Duration::from_secs(1);
    pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(LocatorConfig::RESOLVE_TIMEOUT > RegistryConfig::IPC_CONNECT_TIMEOUT);
        assert!(LocatorConfig::RESOLVE_MAX_DELAY >= LocatorConfig::RESOLVE_BASE_DELAY);
        assert!(LocatorConfig::RESOLVE_MAX_ATTEMPTS > 0);
    }
}
