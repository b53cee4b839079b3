//! Transport abstractions and the error model shared by the Brook client crates.

#![warn(missing_docs)]

pub use url;

pub mod error;
/// HTTP client abstraction used by the Brook crates.
pub mod http_client;
/// WebSocket client abstraction used by the channel session.
pub mod websocket;
