//! WebSocket exposure: the multiplexed real-time endpoint
//!
//! A single `/ws` route carries every action, subscription, and broadcast
//! for a connection. Frames are classified by their `type` field and
//! dispatched against the endpoint registry.
//!
//! # Architecture
//!
//! ```text
//! Client ──ws──▶ /ws ──▶ ws_handler() ──▶ per-session frame loop
//!                                              │
//!                            action ──▶ resolve args ──▶ invoke ──▶ reply
//!                            subscribe/unsubscribe ──▶ SubscriptionEngine
//!                                              │
//!                     broadcast (any origin) ──▶ data frames via outbox
//! ```
//!
//! # Protocol
//!
//! Client → Server (JSON):
//! - `{"type": "action", "channel": "add", "data": {"a": 5, "b": 3}}`
//! - `{"type": "subscribe", "channel": "chat", "data": {...}}`
//! - `{"type": "unsubscribe", "channel": "chat"}`
//!
//! Server → Client (JSON):
//! - `{"type": "action", "channel": "add", "status": "completed", "data": 8}`
//! - `{"type": "subscribed", "channel": "chat"}`
//! - `{"type": "unsubscribed", "channel": "chat"}`
//! - `{"type": "data", "channel": "chat", "data": {...}}`
//! - `{"type": "error", "message": "..."}`

mod handler;
pub mod protocol;

use crate::server::host::SocketHost;
use axum::{Router, routing::get};
use std::sync::Arc;

pub use handler::ws_handler;

/// WebSocket exposure implementation
///
/// Produces a mountable axum router with the `/ws` endpoint. The router
/// carries its own state, so it can be merged into any host application
/// alongside other routes.
pub struct WebSocketExposure;

impl WebSocketExposure {
    /// Build the `/ws` router over the given host
    pub fn build_router(host: Arc<SocketHost>) -> Router {
        Router::new().route("/ws", get(ws_handler)).with_state(host)
    }
}
