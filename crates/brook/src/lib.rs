//! # Brook
//!
//! Client library for the Brook backend-as-a-service platform.
//!
//! The client is a tree of chainable accessors mirroring the backend's REST
//! resource hierarchy. Each accessor narrows the target and returns a value
//! exposing only the operations valid at that node; nothing touches the
//! network until a terminal verb is awaited.
//!
//! ## Example
//!
//! ```no_run
//! use brook::{Brook, ClientConfig, Filter};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let config = ClientConfig::builder().host("api.example.com").build();
//!     let client = Brook::new(config)?;
//!
//!     // Adopts the returned user's key for subsequent calls.
//!     client.login("a@b.com", "pw").await?;
//!
//!     // POST /api/v1/apps/kit/collections/posts/data
//!     let created = client
//!         .app("kit")
//!         .collection("posts")
//!         .data()
//!         .post(&json!({"title": "hello"}))
//!         .await?;
//!     println!("created: {created:?}");
//!
//!     // GET /api/v1/apps/kit/users?where={"active":true}
//!     let active = client
//!         .app("kit")
//!         .users()
//!         .get(Some(&Filter::new().where_clause(json!({"active": true}))))
//!         .await?;
//!     println!("active users: {active:?}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub use brook_common::{error, http_client, url, websocket};

/// Real-time channel session over a persistent socket.
pub mod channel;
/// Client facade root.
pub mod client;
/// Client configuration.
pub mod config;
/// GET-style query filters.
pub mod filter;
/// Deferred request executors.
pub mod invoke;
/// Typed resource-path nodes.
pub mod resources;
/// Parsed-or-raw response bodies.
pub mod response;

pub use brook_common::error::{ClientError, HttpError, Result};
pub use channel::{ChannelError, ChannelEvent, ChannelSession, ChannelState};
pub use client::Brook;
pub use config::ClientConfig;
pub use filter::Filter;
pub use invoke::Upload;
pub use response::ResponseBody;
