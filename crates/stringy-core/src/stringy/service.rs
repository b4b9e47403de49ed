//! Service-side dispatch for the Stringy interface.

use super::{ops, OperationInput, HASH, REVERSE, SPLIT, SUMMARIZE};
use crate::ipc::ServiceDispatch;
use crate::types::InterfaceDescriptor;
use crate::StringyError;
use tracing::debug;

/// Implements the four Stringy operations for an IPC server.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringyService;

impl StringyService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ServiceDispatch for StringyService {
    fn descriptor(&self) -> InterfaceDescriptor {
        super::descriptor()
    }

    async fn dispatch(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, StringyError> {
        if ![REVERSE, HASH, SPLIT, SUMMARIZE].contains(&method) {
            return Err(StringyError::MethodNotFound {
                method: method.to_string(),
            });
        }

        let args: OperationInput =
            serde_json::from_value(params).map_err(|e| StringyError::InvalidParams {
                message: format!("{}: {}", method, e),
            })?;
        let input = args.input.as_bytes();

        debug!("Serving {} for {} byte(s)", method, input.len());

        let result = match method {
            REVERSE => serde_json::to_value(ops::reverse(input))?,
            HASH => serde_json::to_value(ops::hash(input))?,
            SPLIT => serde_json::to_value(ops::split(input))?,
            _ => serde_json::to_value(ops::summarize(input)?)?,
        };

        Ok(result)
    }
}
