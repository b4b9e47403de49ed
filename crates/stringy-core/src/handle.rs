//! Reference-counted binding to one live service instance.

use crate::ipc::IpcClient;
use crate::types::InterfaceDescriptor;
use crate::{Result, StringyError};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Opaque handle to one resolved service instance.
///
/// Cloning yields another reference to the same connection. The connection
/// is released when the last clone (and the locator's cache, which holds
/// only a weak reference) is gone. Once the instance is lost or the handle
/// is closed, every call through any clone fails with a transport error;
/// a new [`resolve`](crate::ServiceLocator::resolve) is required.
#[derive(Clone)]
pub struct ServiceHandle {
    descriptor: InterfaceDescriptor,
    conn: Arc<IpcClient>,
}

impl ServiceHandle {
    pub(crate) fn new(descriptor: InterfaceDescriptor, conn: Arc<IpcClient>) -> Self {
        Self { descriptor, conn }
    }

    /// The interface this handle is bound to.
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// PID of the instance behind this handle.
    pub fn instance_pid(&self) -> u32 {
        self.conn.instance_pid
    }

    /// Endpoint of the instance behind this handle.
    pub fn addr(&self) -> SocketAddr {
        self.conn.addr()
    }

    /// True while the underlying connection has not failed or been closed.
    pub fn is_valid(&self) -> bool {
        self.conn.is_open()
    }

    /// Close the underlying connection for every clone of this handle.
    pub async fn close(&self) {
        self.conn.close().await;
    }

    /// Issue one raw JSON-RPC call. Used by the dispatcher.
    pub(crate) async fn invoke(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if self.conn.is_closed() {
            return Err(StringyError::HandleClosed {
                interface: self.descriptor.to_string(),
            });
        }
        self.conn.call(method, params).await
    }

    /// True if both handles ride on the same underlying connection.
    pub fn shares_connection_with(&self, other: &ServiceHandle) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("descriptor", &self.descriptor.to_string())
            .field("addr", &self.conn.addr())
            .field("pid", &self.conn.instance_pid)
            .field("valid", &self.is_valid())
            .finish()
    }
}
