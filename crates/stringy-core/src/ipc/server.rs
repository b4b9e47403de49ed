//! TCP IPC server hosting one service interface.
//!
//! Binds an OS-assigned port on the loopback interface and dispatches
//! JSON-RPC calls to a [`ServiceDispatch`].
//!
//! # Thread Safety
//!
//! Each connection is handled in its own spawned task and answers its
//! requests strictly in arrival order. Shutdown drops every connection at
//! once, including those with a call in flight, which callers observe as a
//! lost instance.

use super::protocol::{
    check_frame_len, codes, read_frame, write_frame, IpcRequest, IpcResponse, DESCRIBE_METHOD,
    JSONRPC_VERSION,
};
use crate::config::RegistryConfig;
use crate::types::InterfaceDescriptor;
use crate::{Result, StringyError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running server. Dropping it stops the server.
pub struct IpcServerHandle {
    pub addr: SocketAddr,
    pub port: u16,
    stop_tx: watch::Sender<bool>,
    accept_task: Option<JoinHandle<()>>,
}

impl IpcServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and drop every open connection, abandoning calls
    /// still being processed.
    pub fn shutdown(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

impl Drop for IpcServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

/// Implemented by every hosted service.
#[async_trait::async_trait]
pub trait ServiceDispatch: Send + Sync + 'static {
    /// The interface name and version this service implements.
    fn descriptor(&self) -> InterfaceDescriptor;

    /// Run `method`. Errors are reported to the caller with
    /// [`StringyError::to_rpc_error_code`].
    async fn dispatch(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, StringyError>;
}

pub struct IpcServer;

impl IpcServer {
    /// Bind a loopback port and serve `dispatch` from background tasks
    /// until the returned handle is shut down or dropped.
    pub async fn start<D: ServiceDispatch>(dispatch: Arc<D>) -> Result<IpcServerHandle> {
        let listener = TcpListener::bind(RegistryConfig::IPC_BIND_ADDR).await?;
        let addr = listener.local_addr()?;

        info!("IPC server for {} listening on {}", dispatch.descriptor(), addr);

        let (stop_tx, stop_rx) = watch::channel(false);
        let accept_task = tokio::spawn(Self::accept_loop(listener, dispatch, stop_rx));

        Ok(IpcServerHandle {
            addr,
            port: addr.port(),
            stop_tx,
            accept_task: Some(accept_task),
        })
    }

    async fn accept_loop<D: ServiceDispatch>(
        listener: TcpListener,
        dispatch: Arc<D>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let slots = Arc::new(Semaphore::new(RegistryConfig::MAX_IPC_CONNECTIONS));

        loop {
            let (stream, peer) = tokio::select! {
                _ = stop_rx.wait_for(|stop| *stop) => {
                    info!("IPC server on {:?} stopping", listener.local_addr().ok());
                    return;
                }
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("IPC accept failed: {}", e);
                        continue;
                    }
                },
            };

            let Ok(permit) = slots.clone().try_acquire_owned() else {
                warn!(
                    "Refusing IPC connection from {}: {} connections already open",
                    peer,
                    RegistryConfig::MAX_IPC_CONNECTIONS
                );
                continue;
            };

            let dispatch = dispatch.clone();
            let mut conn_stop = stop_rx.clone();
            tokio::spawn(async move {
                debug!("IPC connection from {}", peer);
                if let Err(e) = Self::serve_connection(stream, &*dispatch, &mut conn_stop).await {
                    debug!("IPC connection from {} closed: {}", peer, e);
                }
                drop(permit);
            });
        }
    }

    async fn serve_connection<D: ServiceDispatch>(
        mut stream: TcpStream,
        dispatch: &D,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let (mut reader, mut writer) = stream.split();

        loop {
            let frame = tokio::select! {
                _ = stop_rx.wait_for(|stop| *stop) => return Ok(()),
                frame = read_frame(&mut reader) => match frame? {
                    Some(frame) => frame,
                    None => return Ok(()),
                },
            };

            // Stopping abandons the call; the caller reads EOF
            let response = tokio::select! {
                _ = stop_rx.wait_for(|stop| *stop) => return Ok(()),
                response = Self::process_request(&frame, dispatch) => response,
            };

            write_frame(&mut writer, &Self::encode_response(response)?).await?;
        }
    }

    /// Serialize a response. One too large to frame is replaced by an error
    /// for the same id, leaving the connection usable.
    fn encode_response(response: IpcResponse) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(&response)?;
        if let Err(e) = check_frame_len(payload.len()) {
            warn!("Replacing response to request {:?}: {}", response.id, e);
            let replacement = IpcResponse::error(
                response.id,
                codes::INTERNAL_ERROR,
                format!("Response too large: {}", e),
            );
            return Ok(serde_json::to_vec(&replacement)?);
        }
        Ok(payload)
    }

    async fn process_request<D: ServiceDispatch>(frame: &[u8], dispatch: &D) -> IpcResponse {
        let mut request: IpcRequest = match serde_json::from_slice(frame) {
            Ok(req) => req,
            Err(e) => {
                return IpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {}", e));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return IpcResponse::error(
                request.id,
                codes::INVALID_REQUEST,
                "Invalid Request: expected jsonrpc 2.0",
            );
        }

        if request.method == DESCRIBE_METHOD {
            return match serde_json::to_value(dispatch.descriptor()) {
                Ok(value) => IpcResponse::success(request.id, value),
                Err(e) => IpcResponse::error(request.id, codes::INTERNAL_ERROR, e.to_string()),
            };
        }

        let params = request.params_or_empty();
        match dispatch.dispatch(&request.method, params).await {
            Ok(result) => IpcResponse::success(request.id, result),
            Err(e) => {
                debug!("{} failed: {}", request.method, e);
                IpcResponse::failure(request.id, &e)
            }
        }
    }
}
