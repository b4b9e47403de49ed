//! Call Dispatcher: issues one operation through a [`ServiceHandle`].
//!
//! Two conventions:
//!
//! - [`call`] returns a scalar result as a [`CallResult`].
//! - [`call_with_callback`] delivers a variable-length result to a callback.
//!   The callback runs inline, on the caller's task, after the response has
//!   been fully demarshaled and the connection released. It runs exactly
//!   once on success and never on failure; the `FnOnce` bound rules out a
//!   second delivery. A panic inside the callback propagates to the caller.
//!
//! Neither function retries. Errors are classified as transport or
//! application failures by [`StringyError`].

use crate::error::CallResult;
use crate::handle::ServiceHandle;
use crate::StringyError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Invoke a scalar-returning operation.
pub async fn call<A, T>(handle: &ServiceHandle, operation: &str, args: &A) -> CallResult<T>
where
    A: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let params = serde_json::to_value(args).map_err(|e| {
        StringyError::transport(format!("Failed to marshal arguments for {}: {}", operation, e))
    })?;

    debug!("Dispatching {} on {}", operation, handle.descriptor());

    let value = handle.invoke(operation, params).await?;

    serde_json::from_value(value).map_err(|e| {
        StringyError::transport(format!("Failed to demarshal result of {}: {}", operation, e))
    })
}

/// Invoke a variable-length-result operation and hand the payload to `callback`.
///
/// Returns only after the remote operation has completed and, on success,
/// `callback` has returned; its return value is passed through.
pub async fn call_with_callback<A, T, F, R>(
    handle: &ServiceHandle,
    operation: &str,
    args: &A,
    callback: F,
) -> CallResult<R>
where
    A: Serialize + ?Sized,
    T: DeserializeOwned,
    F: FnOnce(T) -> R,
{
    let payload: T = call(handle, operation, args).await?;
    Ok(callback(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{IpcServer, IpcServerHandle, ServiceDispatch};
    use crate::registry::ServiceRegistry;
    use crate::retry::ResolvePolicy;
    use crate::types::{InterfaceDescriptor, InterfaceVersion};
    use crate::ServiceLocator;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ListDispatch;

    #[async_trait::async_trait]
    impl ServiceDispatch for ListDispatch {
        fn descriptor(&self) -> InterfaceDescriptor {
            InterfaceDescriptor::new("test.IList", InterfaceVersion::new(1, 0))
        }

        async fn dispatch(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, StringyError> {
            match method {
                "count" => Ok(serde_json::json!(params["n"].as_u64().unwrap_or(0))),
                "range" => {
                    let n = params["n"].as_u64().unwrap_or(0);
                    Ok(serde_json::json!((0..n).collect::<Vec<_>>()))
                }
                "garbage" => Ok(serde_json::json!({"not": "a list"})),
                "domain" => Err(StringyError::Application {
                    code: -32001,
                    message: "out of range".to_string(),
                }),
                _ => Err(StringyError::MethodNotFound {
                    method: method.to_string(),
                }),
            }
        }
    }

    async fn setup() -> (ServiceHandle, IpcServerHandle, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let registry = ServiceRegistry::open_at(&temp_dir.path().join("registry.db")).unwrap();
        let server = IpcServer::start(Arc::new(ListDispatch)).await.unwrap();
        let descriptor = ListDispatch.descriptor();
        registry
            .register_instance(&descriptor, std::process::id(), server.port)
            .unwrap();

        let locator = ServiceLocator::new(registry).with_policy(
            ResolvePolicy::new()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(10))
                .with_jitter(false),
        );
        let handle = locator.resolve_descriptor(&descriptor).await.unwrap();
        (handle, server, temp_dir)
    }

    #[tokio::test]
    async fn test_call_returns_scalar() {
        let (handle, _server, _temp_dir) = setup().await;

        let n: u64 = call(&handle, "count", &serde_json::json!({"n": 5})).await.unwrap();
        assert_eq!(n, 5);
    }

    #[tokio::test]
    async fn test_callback_invoked_exactly_once_before_return() {
        let (handle, _server, _temp_dir) = setup().await;

        let mut deliveries = 0;
        let mut received = Vec::new();
        call_with_callback(&handle, "range", &serde_json::json!({"n": 3}), |items: Vec<u64>| {
            deliveries += 1;
            received = items;
        })
        .await
        .unwrap();

        assert_eq!(deliveries, 1);
        assert_eq!(received, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_callback_not_invoked_on_demarshal_failure() {
        let (handle, _server, _temp_dir) = setup().await;

        let mut invoked = false;
        let err = call_with_callback(&handle, "garbage", &serde_json::json!({}), |_: Vec<u64>| {
            invoked = true;
        })
        .await
        .unwrap_err();

        assert!(err.is_transport_failure());
        assert!(!invoked);
    }

    #[tokio::test]
    async fn test_application_failure_is_distinct() {
        let (handle, _server, _temp_dir) = setup().await;

        let mut invoked = false;
        let err = call_with_callback(&handle, "domain", &serde_json::json!({}), |_: Vec<u64>| {
            invoked = true;
        })
        .await
        .unwrap_err();

        assert!(err.is_application_failure());
        assert!(!invoked);
        // The connection survives a domain error
        assert!(handle.is_valid());
    }

    #[tokio::test]
    async fn test_callback_not_invoked_after_instance_lost() {
        let (handle, mut server, _temp_dir) = setup().await;
        server.shutdown();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut invoked = false;
        let err = call_with_callback(&handle, "range", &serde_json::json!({"n": 1}), |_: Vec<u64>| {
            invoked = true;
        })
        .await
        .unwrap_err();

        assert!(err.is_transport_failure());
        assert!(!invoked);
        assert!(!handle.is_valid());
    }

    #[tokio::test]
    async fn test_closed_handle_fails_with_transport_error() {
        let (handle, _server, _temp_dir) = setup().await;
        let other = handle.clone();
        handle.close().await;

        let err = call::<_, u64>(&other, "count", &serde_json::json!({"n": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, StringyError::HandleClosed { .. }));
        assert!(err.is_transport_failure());
    }

    #[tokio::test]
    async fn test_callback_return_value_passes_through() {
        let (handle, _server, _temp_dir) = setup().await;

        let total = call_with_callback(&handle, "range", &serde_json::json!({"n": 4}), |items: Vec<u64>| {
            items.iter().sum::<u64>()
        })
        .await
        .unwrap();

        assert_eq!(total, 6);
    }
}
