//! The Stringy interface: four byte-string operations served over IPC.
//!
//! | Method      | Result                                       | Delivery |
//! |-------------|----------------------------------------------|----------|
//! | `reverse`   | [`ByteString`]                               | callback |
//! | `hash`      | [`HashValue`](crate::types::HashValue)       | return   |
//! | `split`     | [`CharacterSequence`](crate::types::CharacterSequence) | callback |
//! | `summarize` | [`Summary`](crate::types::Summary)           | callback |
//!
//! Every method takes `{"input": <hex>}` as its parameters.

mod client;
pub mod ops;
mod service;

pub use client::{hash, reverse, split, summarize, StringyClient};
pub use service::StringyService;

use crate::types::{ByteString, InterfaceDescriptor, InterfaceVersion};
use serde::{Deserialize, Serialize};

/// Registered name of the interface.
pub const INTERFACE_NAME: &str = "stringy.IStringy";

/// The only version this crate serves and requests.
pub const INTERFACE_VERSION: InterfaceVersion = InterfaceVersion::new(1, 0);

pub const REVERSE: &str = "reverse";
pub const HASH: &str = "hash";
pub const SPLIT: &str = "split";
pub const SUMMARIZE: &str = "summarize";

/// Descriptor for `stringy.IStringy@1.0`.
pub fn descriptor() -> InterfaceDescriptor {
    InterfaceDescriptor::new(INTERFACE_NAME, INTERFACE_VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OperationInput {
    pub input: ByteString,
}
