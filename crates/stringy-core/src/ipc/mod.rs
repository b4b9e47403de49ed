//! Local IPC between callers and service instances.
//!
//! Uses length-prefixed JSON-RPC 2.0 over `127.0.0.1` TCP connections.
//!
//! # Architecture
//!
//! - **Server**: Runs inside the service process, accepts connections, dispatches method calls
//! - **Client**: One connection from a caller to an instance, shared by its handles
//! - **Protocol**: Shared framing and JSON-RPC types used by both

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{IpcRequest, IpcResponse, DESCRIBE_METHOD};
pub use server::{IpcServer, IpcServerHandle, ServiceDispatch};
