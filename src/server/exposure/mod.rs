//! Exposure modules: mountable routes over the application host
//!
//! Each exposure consumes a shared [`SocketHost`] and produces a plain
//! axum `Router`, so the framework never assumes sole ownership of the
//! HTTP server — a larger application can merge both routers into its
//! own.
//!
//! [`SocketHost`]: crate::server::host::SocketHost

pub mod ingress;
pub mod websocket;

pub use ingress::{BROADCAST_PATH, IngressExposure};
pub use websocket::WebSocketExposure;
