//! TCP IPC client for one connection to a service instance.
//!
//! Provides a `call()` method for JSON-RPC method invocation and tracks
//! whether the connection is still usable.
//!
//! # Thread Safety
//!
//! The client uses a tokio `Mutex` to serialize access to the TCP stream, so
//! concurrent callers sharing one connection are answered strictly in the
//! order they acquire the lock. Once a transport failure is observed the
//! connection is marked lost and every later call fails immediately.

use super::protocol::{check_frame_len, read_frame, write_frame, IpcRequest, IpcResponse};
use crate::config::RegistryConfig;
use crate::{Result, StringyError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const STATE_OPEN: u8 = 0;
const STATE_LOST: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// IPC client connected to one service instance.
#[derive(Debug)]
pub struct IpcClient {
    stream: Mutex<TcpStream>,
    addr: SocketAddr,
    next_id: AtomicU64,
    state: AtomicU8,
    /// PID of the service instance (for error reporting).
    pub instance_pid: u32,
    /// Port of the service instance (for error reporting).
    pub instance_port: u16,
}

impl IpcClient {
    /// Connect to a service instance's IPC server.
    ///
    /// Uses the configured connection timeout from `RegistryConfig`.
    pub async fn connect(addr: SocketAddr, pid: u32) -> Result<Self> {
        let lost = || StringyError::InstanceLost {
            pid,
            port: addr.port(),
        };
        let stream = tokio::time::timeout(
            RegistryConfig::IPC_CONNECT_TIMEOUT,
            TcpStream::connect(addr),
        )
        .await
        .map_err(|_| lost())?
        .map_err(|_| lost())?;

        debug!("IPC client connected to {} (PID {})", addr, pid);

        Ok(Self {
            stream: Mutex::new(stream),
            addr,
            next_id: AtomicU64::new(1),
            state: AtomicU8::new(STATE_OPEN),
            instance_pid: pid,
            instance_port: addr.port(),
        })
    }

    /// Call a JSON-RPC method on the service instance.
    ///
    /// Returns the result value on success. I/O and framing errors, a
    /// malformed response or a response for another request mark the
    /// connection lost and return `InstanceLost` or `Transport`. An error
    /// object from the remote side is classified by
    /// [`StringyError::from_rpc_error`] and leaves the connection usable.
    pub async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        self.ensure_open()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = IpcRequest::new(method, params, id);
        let request_bytes = serde_json::to_vec(&request)
            .map_err(|e| StringyError::transport(format!("Failed to encode request: {}", e)))?;
        // An oversized request never reaches the wire and leaves the connection usable
        check_frame_len(request_bytes.len())?;

        let response_bytes = {
            let mut stream = self.stream.lock().await;
            // Another caller may have lost the connection while we waited
            self.ensure_open()?;
            let (mut reader, mut writer) = stream.split();

            if let Err(e) = write_frame(&mut writer, &request_bytes).await {
                return Err(self.mark_lost(&e));
            }

            match read_frame(&mut reader).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Err(self.mark_lost(&"connection closed by peer")),
                Err(e) => return Err(self.mark_lost(&e)),
            }
        };

        let response: IpcResponse = match serde_json::from_slice(&response_bytes) {
            Ok(resp) => resp,
            Err(e) => {
                self.state.store(STATE_LOST, Ordering::Release);
                return Err(StringyError::transport(format!(
                    "Failed to parse IPC response: {}",
                    e
                )));
            }
        };

        if response.id != Some(id) {
            self.state.store(STATE_LOST, Ordering::Release);
            return Err(StringyError::transport(format!(
                "Response id {:?} does not match request id {}",
                response.id, id
            )));
        }

        response.into_result()
    }

    /// Close the connection for every holder. Idempotent.
    pub async fn close(&self) {
        if self.state.swap(STATE_CLOSED, Ordering::AcqRel) == STATE_CLOSED {
            return;
        }
        let mut stream = self.stream.lock().await;
        if let Err(e) = stream.shutdown().await {
            debug!("IPC shutdown of {} failed: {}", self.addr, e);
        }
    }

    /// True while no transport failure has been observed and `close` was not called.
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_OPEN
    }

    /// True once `close` was called.
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_CLOSED
    }

    /// Get the address of the connected instance.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => Ok(()),
            STATE_CLOSED => Err(StringyError::transport(format!(
                "connection to {} was closed",
                self.addr
            ))),
            _ => Err(self.lost()),
        }
    }

    fn mark_lost(&self, cause: &dyn std::fmt::Display) -> StringyError {
        if self
            .state
            .compare_exchange(STATE_OPEN, STATE_LOST, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!(
                "Lost service instance PID {} at {}: {}",
                self.instance_pid, self.addr, cause
            );
        }
        self.lost()
    }

    fn lost(&self) -> StringyError {
        StringyError::InstanceLost {
            pid: self.instance_pid,
            port: self.instance_port,
        }
    }
}
