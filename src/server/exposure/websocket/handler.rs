//! WebSocket upgrade handler and per-session frame loop
//!
//! Each accepted connection gets:
//!
//! 1. A session registered with the subscription engine
//! 2. A writer task draining the session's outbox to the socket
//! 3. A read loop classifying inbound frames and dispatching them
//!
//! A failure while processing one frame is answered with an `error` frame
//! and the loop continues; only transport close (or an unresponsive
//! outbox) tears the session down. Action responses are enqueued before
//! the loop reads the next inbound frame, so they are ordered with respect
//! to the client's subsequent messages.

use super::protocol::{ActionStatus, ClientFrame, ServerFrame};
use crate::core::error::{HandlerError, SocketError};
use crate::core::handler::CallContext;
use crate::core::resolver;
use crate::server::host::SocketHost;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::stream::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// How long session teardown waits for the writer to drain the outbox
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket upgrade handler for GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(host): State<Arc<SocketHost>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, host))
}

/// Run one session to completion
async fn handle_socket(socket: WebSocket, host: Arc<SocketHost>) {
    let (session_id, mut outbox_rx) = host.engine().connect().await;
    let (mut ws_write, mut ws_read) = socket.split();

    // Writer task: the single drain of this session's outbox.
    let write_engine = host.engine().clone();
    let write_session = session_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if ws_write.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            session_id = %write_session,
                            "WebSocket write failed, closing"
                        );
                        write_engine.detach(&write_session).await;
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %write_session,
                        error = %e,
                        "Failed to serialize outbound frame"
                    );
                }
            }
        }
    });

    // Read loop: text frames only; everything else is transport noise.
    while let Some(result) = ws_read.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_frame(&host, &session_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(session_id = %session_id, "Client sent close frame");
                break;
            }
            Ok(Message::Ping(_)) => {
                // axum answers pings automatically
            }
            Ok(_) => {
                // Binary and pong frames are ignored
            }
            Err(e) => {
                tracing::debug!(
                    session_id = %session_id,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    // Detach drops the outbox sender; the writer drains what is queued and
    // exits on its own.
    host.engine().detach(&session_id).await;
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, write_handle).await;
}

/// Classify and dispatch a single inbound frame
async fn handle_frame(host: &Arc<SocketHost>, session_id: &str, text: &str) {
    let engine = host.engine();

    let raw: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            engine
                .send_to(session_id, ServerFrame::error(format!("Invalid message: {}", e)))
                .await;
            return;
        }
    };

    let frame = match ClientFrame::classify(&raw) {
        Ok(frame) => frame,
        Err(message) => {
            engine.send_to(session_id, ServerFrame::error(message)).await;
            return;
        }
    };

    match frame {
        ClientFrame::Action { channel, data } => {
            let Some(descriptor) = host.registry().action(&channel) else {
                let err = SocketError::UnknownAction { name: channel };
                engine
                    .send_to(session_id, ServerFrame::error(err.to_string()))
                    .await;
                return;
            };

            let ctx = CallContext::for_session(session_id);
            let args = match resolver::resolve(descriptor.schema(), &data, &ctx).await {
                Ok(args) => args,
                Err(e) => {
                    tracing::debug!(
                        action = %channel,
                        session_id = %session_id,
                        error = ?e,
                        "Action argument binding failed"
                    );
                    engine
                        .send_to(session_id, ServerFrame::error(e.to_string()))
                        .await;
                    return;
                }
            };

            match descriptor.handler().call(args).await {
                Ok(data) => {
                    engine
                        .send_to(
                            session_id,
                            ServerFrame::Action {
                                channel,
                                status: ActionStatus::Completed,
                                data,
                            },
                        )
                        .await;
                }
                Err(e) => {
                    let fault = HandlerError::new(channel, e);
                    tracing::warn!(
                        session_id = %session_id,
                        error = %fault.source,
                        "Action handler failed"
                    );
                    engine
                        .send_to(session_id, ServerFrame::error(fault.to_string()))
                        .await;
                }
            }
        }
        ClientFrame::Subscribe { channel, data } => {
            let Some(descriptor) = host.registry().channel(&channel) else {
                let err = SocketError::UnknownChannel { name: channel };
                engine
                    .send_to(session_id, ServerFrame::error(err.to_string()))
                    .await;
                return;
            };
            if let Err(e) = engine.subscribe(&descriptor, session_id, &data).await {
                engine
                    .send_to(session_id, ServerFrame::error(e.to_string()))
                    .await;
            }
        }
        ClientFrame::Unsubscribe { channel } => {
            engine.unsubscribe(&channel, session_id).await;
        }
    }
}
