//! Broadcast ingress: the cross-process fan-out endpoint
//!
//! `POST /_broadcast` with body `{"channel": "<name>", "data": {...}}`
//! triggers exactly the fan-out an in-process channel call would. The
//! route is guarded by the configured peer allow-list; everything outside
//! it gets a 403 and causes no broadcast.
//!
//! The peer address comes from [`ConnectInfo`], so the application must be
//! served with `into_make_service_with_connect_info::<SocketAddr>()` — the
//! builder's `serve` does this.
//!
//! Responses: 200 on success (empty body), 403 (peer not allowed),
//! 404 (unknown channel), 400 (malformed body).

use crate::core::error::{IngressError, SocketError};
use crate::server::host::SocketHost;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::post};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

/// The stable path of the broadcast ingress
pub const BROADCAST_PATH: &str = "/_broadcast";

/// Broadcast ingress exposure implementation
///
/// Produces a mountable axum router with the single `POST /_broadcast`
/// route, mergeable into any host application.
pub struct IngressExposure;

impl IngressExposure {
    /// Build the ingress router over the given host
    pub fn build_router(host: Arc<SocketHost>) -> Router {
        Router::new()
            .route(BROADCAST_PATH, post(ingress_handler))
            .with_state(host)
    }
}

pub(crate) async fn ingress_handler(
    State(host): State<Arc<SocketHost>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Response {
    if !host.config().allows_peer(peer.ip()) {
        tracing::warn!(peer = %peer, "Broadcast rejected: peer not in allow-list");
        return IngressError::Forbidden {
            peer: peer.to_string(),
        }
        .into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return IngressError::MalformedBody {
                message: e.to_string(),
            }
            .into_response();
        }
    };
    let Some(object) = payload.as_object() else {
        return IngressError::MalformedBody {
            message: "body must be a JSON object".to_string(),
        }
        .into_response();
    };
    let Some(channel) = object.get("channel").and_then(Value::as_str) else {
        return IngressError::MalformedBody {
            message: "missing 'channel'".to_string(),
        }
        .into_response();
    };
    let data = match object.get("data") {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(_) => {
            return IngressError::MalformedBody {
                message: "'data' must be an object".to_string(),
            }
            .into_response();
        }
    };

    match host.broadcast(channel, data).await {
        Ok(()) => {
            tracing::debug!(channel = %channel, peer = %peer, "Ingress broadcast dispatched");
            StatusCode::OK.into_response()
        }
        Err(SocketError::UnknownChannel { name }) => {
            IngressError::UnknownChannel { name }.into_response()
        }
        Err(e) => {
            tracing::error!(channel = %channel, error = %e, "Ingress broadcast failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
