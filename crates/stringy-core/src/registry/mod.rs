//! Global service registry for cross-process discovery.
//!
//! A SQLite-backed registry that stores:
//! - **Interface declarations**: `(name, version)` pairs a caller may expect to resolve
//! - **Instance entries**: the running process (PID, port) serving each declaration
//!
//! # Location
//!
//! The registry database lives at a platform-standard config directory:
//! - **Linux**: `~/.config/stringy/registry.db`
//! - **Windows**: `%APPDATA%\stringy\registry.db`
//! - **macOS**: `~/Library/Application Support/stringy/registry.db`

pub mod service_registry;

pub use service_registry::{InstanceEntry, InterfaceEntry, Lookup, ServiceRegistry};
