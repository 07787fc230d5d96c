//! Read-only client core for the Gaffer test-analytics API.
//!
//! Layers, leaves first:
//! - [`transport`]: one authenticated `GET` with per-attempt timeout and bounded retry
//! - [`resolver`]: credential capability gate and the scoped-credential project cache
//! - [`operations`]: typed read operations, dispatched through [`GafferClient::invoke`]
//! - [`mirrored`]: upstream bodies passed through verbatim after a typed shape check
//!
//! It contains **no** MCP protocol code; `gaffer-mcp` adapts these operations into tools.

pub mod client;
pub mod credential;
pub mod error;
pub mod mirrored;
pub mod operations;
pub mod query;
pub mod resolver;
pub mod transport;

pub use client::GafferClient;
pub use credential::{Credential, CredentialKind, CredentialRequirement};
pub use error::{GafferError, Result};
pub use mirrored::Mirrored;
pub use operations::Operation;
pub use transport::{Transport, TransportConfig};
