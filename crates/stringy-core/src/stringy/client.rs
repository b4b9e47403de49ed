//! Caller-side stubs for the Stringy interface.

use super::{OperationInput, HASH, REVERSE, SPLIT, SUMMARIZE};
use crate::dispatch::{call, call_with_callback};
use crate::error::CallResult;
use crate::handle::ServiceHandle;
use crate::locator::ServiceLocator;
use crate::types::{ByteString, CharacterSequence, HashValue, Summary};
use crate::Result;

/// Typed view over a [`ServiceHandle`] bound to `stringy.IStringy@1.0`.
///
/// Cheap to clone; clones share the same connection.
#[derive(Debug, Clone)]
pub struct StringyClient {
    handle: ServiceHandle,
}

impl StringyClient {
    /// Resolve the Stringy service through `locator`.
    pub async fn connect(locator: &ServiceLocator) -> Result<Self> {
        let handle = locator.resolve_descriptor(&super::descriptor()).await?;
        Ok(Self { handle })
    }

    /// Wrap an already-resolved handle.
    pub fn from_handle(handle: ServiceHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Reverse `input` and pass the result to `callback`.
    pub async fn reverse<F, R>(&self, input: &ByteString, callback: F) -> CallResult<R>
    where
        F: FnOnce(ByteString) -> R,
    {
        call_with_callback(&self.handle, REVERSE, &args(input), callback).await
    }

    pub async fn hash(&self, input: &ByteString) -> CallResult<HashValue> {
        call(&self.handle, HASH, &args(input)).await
    }

    /// Split `input` into signed characters and pass them to `callback`.
    pub async fn split<F, R>(&self, input: &ByteString, callback: F) -> CallResult<R>
    where
        F: FnOnce(CharacterSequence) -> R,
    {
        call_with_callback(&self.handle, SPLIT, &args(input), callback).await
    }

    pub async fn summarize<F, R>(&self, input: &ByteString, callback: F) -> CallResult<R>
    where
        F: FnOnce(Summary) -> R,
    {
        call_with_callback(&self.handle, SUMMARIZE, &args(input), callback).await
    }
}

fn args(input: &ByteString) -> OperationInput {
    OperationInput {
        input: input.clone(),
    }
}

/// Resolve the service and reverse `input`.
///
/// Resolution failures (`NotFound`, `Unavailable`) surface before any call
/// is attempted.
pub async fn reverse(locator: &ServiceLocator, input: &ByteString) -> Result<ByteString> {
    StringyClient::connect(locator)
        .await?
        .reverse(input, |reversed| reversed)
        .await
}

/// Resolve the service and hash `input`.
pub async fn hash(locator: &ServiceLocator, input: &ByteString) -> Result<HashValue> {
    StringyClient::connect(locator).await?.hash(input).await
}

/// Resolve the service and split `input`.
pub async fn split(locator: &ServiceLocator, input: &ByteString) -> Result<CharacterSequence> {
    StringyClient::connect(locator)
        .await?
        .split(input, |chars| chars)
        .await
}

/// Resolve the service and summarize `input`.
pub async fn summarize(locator: &ServiceLocator, input: &ByteString) -> Result<Summary> {
    StringyClient::connect(locator)
        .await?
        .summarize(input, |summary| summary)
        .await
}
