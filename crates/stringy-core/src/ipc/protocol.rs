//! Wire format shared by callers and service instances.
//!
//! Every message is one frame: a 4-byte big-endian length, then that many
//! bytes of UTF-8 JSON-RPC 2.0. Request ids are numeric.
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```

use crate::config::RegistryConfig;
use crate::{Result, StringyError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const JSONRPC_VERSION: &str = "2.0";

/// Method answered by the server itself with the descriptor it hosts.
pub const DESCRIBE_METHOD: &str = "rpc.describe";

/// Standard JSON-RPC 2.0 error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<u64>,
}

impl IpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(id),
        }
    }

    /// Parameters, defaulting to an empty object when omitted.
    pub fn params_or_empty(&mut self) -> Value {
        self.params
            .take()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IpcError>,
    pub id: Option<u64>,
}

impl IpcResponse {
    pub fn success(id: Option<u64>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<u64>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(IpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Error response for a failed dispatch.
    pub fn failure(id: Option<u64>, err: &StringyError) -> Self {
        Self::error(id, err.to_rpc_error_code(), err.to_string())
    }

    /// The result value, or the remote error classified for the caller.
    pub fn into_result(self) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(StringyError::from_rpc_error(err.code, err.message));
        }
        self.result
            .ok_or_else(|| StringyError::transport("IPC response missing result"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Reject payloads larger than the frame limit.
pub fn check_frame_len(len: usize) -> Result<()> {
    if len > RegistryConfig::MAX_IPC_MESSAGE_SIZE {
        return Err(StringyError::transport(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len,
            RegistryConfig::MAX_IPC_MESSAGE_SIZE
        )));
    }
    Ok(())
}

/// Read one frame. `None` means the peer closed the stream between frames.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut header).await {
        return match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Ok(None),
            _ => Err(e.into()),
        };
    }

    let len = u32::from_be_bytes(header) as usize;
    check_frame_len(len)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    check_frame_len(payload.len())?;

    writer
        .write_all(&(payload.len() as u32).to_be_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req = IpcRequest::new("hash", serde_json::json!({"input": "616263"}), 9);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "hash",
                "params": {"input": "616263"},
                "id": 9
            })
        );
    }

    #[test]
    fn test_request_without_params_defaults_to_empty_object() {
        let mut req: IpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"rpc.describe","id":1}"#).unwrap();
        assert_eq!(req.params_or_empty(), serde_json::json!({}));
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp = IpcResponse::error(Some(1), codes::METHOD_NOT_FOUND, "Unknown method: explode");
        let json = serde_json::to_value(&resp).unwrap();

        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32601);
    }

    #[test]
    fn test_into_result_classifies_remote_errors() {
        let invalid = IpcResponse::error(Some(1), codes::INVALID_PARAMS, "bad hex");
        assert!(invalid.into_result().unwrap_err().is_transport_failure());

        let domain = IpcResponse::error(Some(2), -32010, "refused");
        assert!(domain.into_result().unwrap_err().is_application_failure());

        let empty = IpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: None,
            id: Some(3),
        };
        assert!(empty.into_result().unwrap_err().is_transport_failure());
    }

    #[tokio::test]
    async fn test_frame_header_is_big_endian_length() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"abc").await.unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 3]);

        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(b"abc".to_vec()));
    }

    #[tokio::test]
    async fn test_empty_stream_reads_as_closed() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_error() {
        let mut buf = 10u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"short");

        let mut cursor = std::io::Cursor::new(buf);
        assert!(read_frame(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_header_is_transport_failure() {
        let huge = (RegistryConfig::MAX_IPC_MESSAGE_SIZE + 1) as u32;
        let mut buf = huge.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 8]);

        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(err.is_transport_failure());
    }
}
