//! Stringy Core - locating and calling versioned services across processes.
//!
//! A service process hosts an interface (a name plus a `major.minor`
//! version) and registers itself in a SQLite registry shared by every
//! process of the same user. Callers resolve the interface through a
//! [`ServiceLocator`] to a [`ServiceHandle`], then issue calls through it.
//! Scalar results come back as a [`CallResult`]; variable-length results are
//! delivered to a callback exactly once, before the call returns.
//!
//! The bundled `stringy.IStringy@1.0` interface offers four byte-string
//! operations: reverse, hash, split and summarize.
//!
//! # Example
//!
//! ```rust,ignore
//! use stringy_core::{ByteString, ServiceLocator, StringyClient};
//!
//! #[tokio::main]
//! async fn main() -> stringy_core::Result<()> {
//!     let locator = ServiceLocator::open_default()?;
//!     let client = StringyClient::connect(&locator).await?;
//!
//!     let input = ByteString::from("hello");
//!     client
//!         .reverse(&input, |reversed| println!("{}", reversed.to_string_lossy()))
//!         .await?;
//!     println!("{}", client.hash(&input).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod host;
pub mod ipc;
pub mod locator;
pub mod platform;
pub mod registry;
pub mod retry;
pub mod stringy;
pub mod types;

pub use error::{CallResult, Result, StringyError};
pub use handle::ServiceHandle;
pub use host::ServiceHost;
pub use locator::ServiceLocator;
pub use registry::ServiceRegistry;
pub use retry::ResolvePolicy;
pub use stringy::{StringyClient, StringyService};
pub use types::{
    ByteString, CharacterSequence, HashValue, InterfaceDescriptor, InterfaceVersion, Summary,
};
