//! Service Locator: resolves a named, versioned interface to a live handle.
//!
//! Resolution consults the [`ServiceRegistry`]. An interface that was never
//! declared fails with `NotFound` immediately, without touching the network.
//! A declared interface is polled with bounded backoff until an instance
//! accepts a connection and confirms, through the describe handshake, that
//! it serves exactly the requested descriptor; otherwise resolution fails
//! with `Unavailable`.

use crate::handle::ServiceHandle;
use crate::ipc::{IpcClient, DESCRIBE_METHOD};
use crate::registry::{Lookup, ServiceRegistry};
use crate::retry::{retry_async, ResolvePolicy};
use crate::types::{InterfaceDescriptor, InterfaceVersion};
use crate::{platform, Result, StringyError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;
use tracing::{debug, info};

/// Resolves interfaces to [`ServiceHandle`]s and shares connections between
/// resolutions of the same descriptor.
pub struct ServiceLocator {
    registry: ServiceRegistry,
    policy: ResolvePolicy,
    connections: Mutex<HashMap<InterfaceDescriptor, Weak<IpcClient>>>,
}

impl ServiceLocator {
    /// Create a locator backed by the given registry with the default policy.
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry,
            policy: ResolvePolicy::default(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Create a locator backed by the registry at the default platform location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(ServiceRegistry::open()?))
    }

    /// Replace the resolution policy.
    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ResolvePolicy {
        &self.policy
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Resolve `(name, version)` to a live handle.
    pub async fn resolve(&self, name: &str, version: InterfaceVersion) -> Result<ServiceHandle> {
        self.resolve_descriptor(&InterfaceDescriptor::new(name, version))
            .await
    }

    /// Resolve a descriptor to a live handle.
    ///
    /// Waits up to the policy's timeout for an instance to become reachable.
    pub async fn resolve_descriptor(&self, descriptor: &InterfaceDescriptor) -> Result<ServiceHandle> {
        // A withdrawn interface is not served from the cache
        if let Lookup::Undeclared = self.lookup(descriptor).await? {
            debug!("Interface {} is not registered", descriptor);
            return Err(not_found(descriptor));
        }

        if let Some(conn) = self.cached(descriptor) {
            debug!("Reusing connection to {} for {}", conn.addr(), descriptor);
            return Ok(ServiceHandle::new(descriptor.clone(), conn));
        }

        let started = Instant::now();
        let attempt = retry_async(
            &self.policy,
            || self.try_connect(descriptor),
            |e: &StringyError| e.is_transport_failure(),
        );

        let conn = match tokio::time::timeout(self.policy.timeout, attempt).await {
            Ok((Ok(conn), stats)) => {
                info!(
                    "Resolved {} to {} (PID {}) after {} attempt(s)",
                    descriptor,
                    conn.addr(),
                    conn.instance_pid,
                    stats.attempts
                );
                conn
            }
            Ok((Err(e), _)) if e.is_transport_failure() => {
                return Err(unavailable(descriptor, started));
            }
            Ok((Err(e), _)) => return Err(e),
            Err(_) => return Err(unavailable(descriptor, started)),
        };

        self.remember(descriptor, &conn);
        Ok(ServiceHandle::new(descriptor.clone(), conn))
    }

    /// One resolution attempt. Transport-class errors are retried.
    async fn try_connect(&self, descriptor: &InterfaceDescriptor) -> Result<Arc<IpcClient>> {
        let instance = match self.lookup(descriptor).await? {
            Lookup::Undeclared => return Err(not_found(descriptor)),
            Lookup::Declared(None) => {
                return Err(StringyError::transport(format!(
                    "no running instance registered for {}",
                    descriptor
                )))
            }
            Lookup::Declared(Some(instance)) => instance,
        };

        if !platform::is_process_alive(instance.pid) {
            debug!(
                "Instance PID {} for {} is dead, removing entry",
                instance.pid, descriptor
            );
            let registry = self.registry.clone();
            let stale = descriptor.clone();
            let pid = instance.pid;
            tokio::task::spawn_blocking(move || registry.unregister_instance_for_pid(&stale, pid))
                .await
                .map_err(|e| StringyError::Other(format!("Registry cleanup task failed: {}", e)))??;
            return Err(StringyError::InstanceLost {
                pid: instance.pid,
                port: instance.port,
            });
        }

        let addr = instance.addr();
        let conn = IpcClient::connect(addr, instance.pid).await?;

        // Whatever answers on a registered port without describing itself is
        // not a usable instance yet
        let described = conn
            .call(DESCRIBE_METHOD, serde_json::json!({}))
            .await
            .map_err(|e| {
                if e.is_transport_failure() {
                    e
                } else {
                    StringyError::transport(format!("Describe rejected by {}: {}", addr, e))
                }
            })?;
        let served: InterfaceDescriptor = serde_json::from_value(described).map_err(|e| {
            StringyError::transport(format!("Malformed describe response: {}", e))
        })?;

        if &served != descriptor {
            return Err(StringyError::transport(format!(
                "Instance at {} serves {}, expected {}",
                conn.addr(),
                served,
                descriptor
            )));
        }

        Ok(Arc::new(conn))
    }

    /// Registry lookup on the blocking pool; rusqlite calls block the thread.
    async fn lookup(&self, descriptor: &InterfaceDescriptor) -> Result<Lookup> {
        let registry = self.registry.clone();
        let descriptor = descriptor.clone();
        tokio::task::spawn_blocking(move || registry.lookup(&descriptor))
            .await
            .map_err(|e| StringyError::Other(format!("Registry lookup task failed: {}", e)))?
    }

    fn cached(&self, descriptor: &InterfaceDescriptor) -> Option<Arc<IpcClient>> {
        let connections = self.connections.lock().ok()?;
        connections
            .get(descriptor)
            .and_then(Weak::upgrade)
            .filter(|conn| conn.is_open())
    }

    fn remember(&self, descriptor: &InterfaceDescriptor, conn: &Arc<IpcClient>) {
        if let Ok(mut connections) = self.connections.lock() {
            connections.retain(|_, weak| weak.strong_count() > 0);
            connections.insert(descriptor.clone(), Arc::downgrade(conn));
        }
    }
}

fn not_found(descriptor: &InterfaceDescriptor) -> StringyError {
    StringyError::NotFound {
        interface: descriptor.name.clone(),
        version: descriptor.version.to_string(),
    }
}

fn unavailable(descriptor: &InterfaceDescriptor, started: Instant) -> StringyError {
    StringyError::Unavailable {
        interface: descriptor.name.clone(),
        version: descriptor.version.to_string(),
        waited: started.elapsed(),
    }
}
