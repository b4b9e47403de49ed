//! Hosting a service: IPC server plus registry entry.

use crate::ipc::{IpcServer, IpcServerHandle, ServiceDispatch};
use crate::registry::ServiceRegistry;
use crate::types::InterfaceDescriptor;
use crate::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// A running service instance.
///
/// Starting a host declares the interface and registers this process as its
/// instance. Shutting down (or dropping) withdraws the instance entry but
/// leaves the declaration in place, so later resolutions wait for a new
/// instance instead of failing with `NotFound`.
pub struct ServiceHost {
    descriptor: InterfaceDescriptor,
    registry: ServiceRegistry,
    server: IpcServerHandle,
    pid: u32,
    running: bool,
}

impl ServiceHost {
    /// Start serving `dispatch` and register it in `registry`.
    pub async fn start<D: ServiceDispatch>(registry: ServiceRegistry, dispatch: Arc<D>) -> Result<Self> {
        let descriptor = dispatch.descriptor();
        let server = IpcServer::start(dispatch).await?;
        let pid = std::process::id();

        registry.register_instance(&descriptor, pid, server.port)?;
        info!("Serving {} on {} (PID {})", descriptor, server.addr(), pid);

        Ok(Self {
            descriptor,
            registry,
            server,
            pid,
            running: true,
        })
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }

    pub fn port(&self) -> u16 {
        self.server.port
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Withdraw the instance entry and stop the server.
    ///
    /// Connections with a call in flight are dropped. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        // Only remove the entry if it still points at this process
        if let Err(e) = self
            .registry
            .unregister_instance_for_pid(&self.descriptor, self.pid)
        {
            warn!("Failed to unregister {}: {}", self.descriptor, e);
        }
        self.server.shutdown();
        info!("Stopped serving {}", self.descriptor);
    }
}

impl Drop for ServiceHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Lookup;
    use crate::stringy::StringyService;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_registers_and_shutdown_withdraws() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ServiceRegistry::open_at(&temp_dir.path().join("registry.db")).unwrap();

        let mut host = ServiceHost::start(registry.clone(), Arc::new(StringyService))
            .await
            .unwrap();
        let instance = registry.get_instance(host.descriptor()).unwrap().unwrap();
        assert_eq!(instance.pid, std::process::id());
        assert_eq!(instance.port, host.port());

        host.shutdown();
        assert!(!host.is_running());
        assert!(matches!(
            registry.lookup(host.descriptor()).unwrap(),
            Lookup::Declared(None)
        ));

        // Second shutdown is a no-op
        host.shutdown();
    }

    #[tokio::test]
    async fn test_drop_withdraws_instance() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ServiceRegistry::open_at(&temp_dir.path().join("registry.db")).unwrap();

        let host = ServiceHost::start(registry.clone(), Arc::new(StringyService))
            .await
            .unwrap();
        let descriptor = host.descriptor().clone();
        drop(host);

        assert!(registry.get_instance(&descriptor).unwrap().is_none());
    }
}
