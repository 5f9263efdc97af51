//! # SocketAPI
//!
//! A framework for real-time APIs over a single multiplexed WebSocket
//! connection.
//!
//! ## Features
//!
//! - **One socket, many endpoints**: JSON frames carry a `type` and a
//!   `channel`; the server dispatches each as a request/response *action*
//!   or a publish/subscribe *channel* operation
//! - **Declarative endpoints**: handlers register with a typed parameter
//!   table; payloads are validated and coerced before a handler runs
//! - **Dependencies**: a parameter can be a nested sub-endpoint whose
//!   inputs live under the same key, resolved recursively — cycles are
//!   rejected at registration
//! - **Subscribe-time binding**: channels can require parameters at
//!   subscribe time and replay them on every later delivery
//! - **Uniform fan-out**: channel invocations behave identically whether
//!   they originate in a frame handler, a worker task, or another process
//!   (via the loopback broadcast ingress)
//! - **Mountable**: the WebSocket route and the ingress are plain axum
//!   routers, embeddable in any host application
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use socketapi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut app = SocketApp::new();
//!
//!     app.action(
//!         Action::new("add", handler_fn(|args: Args| async move {
//!             Ok(Some(json!(args.as_i64("a")? + args.as_i64("b")?)))
//!         }))
//!         .param(Param::int("a"))
//!         .param(Param::int("b")),
//!     )?;
//!
//!     let chat = app.channel(
//!         Channel::new("chat", handler_fn(|args: Args| async move {
//!             Ok(Some(json!({"message": args.as_str("message")?})))
//!         }))
//!         .param(Param::str("message").default(json!("Welcome"))),
//!     )?;
//!
//!     app.action(
//!         Action::new("send", handler_fn(move |args: Args| {
//!             let chat = chat.clone();
//!             async move {
//!                 let text = args.as_str("text")?.to_string();
//!                 chat.publish(args.ctx(), json!({"message": text})).await?;
//!                 Ok(None)
//!             }
//!         }))
//!         .param(Param::str("text")),
//!     )?;
//!
//!     app.serve().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Action, Args, CallContext, Channel, Dependency, Handler, HandlerResult, Param,
        ParamType, SocketError, SocketResult, handler_fn,
    };

    // === Config ===
    pub use crate::config::SocketConfig;

    // === Server ===
    pub use crate::server::{
        ChannelHandle, IngressExposure, SocketApp, SocketHost, SocketRouter,
        WebSocketExposure,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
