//! Subscription engine: session table, subscription records, and fan-out
//!
//! The engine tracks every live session and, per channel, the ordered set
//! of subscription records. When a channel is invoked — from a frame, from
//! another handler, or through the broadcast ingress — the engine snapshots
//! the subscriber list, re-binds arguments per subscriber (call-time values
//! overlaid on subscribe-time `bound_args`), runs the channel handler, and
//! queues one `data` frame on each subscriber's outbox.
//!
//! # Architecture
//!
//! ```text
//! frame loop ──subscribe/unsubscribe──▶ SubscriptionEngine
//! any task ───broadcast(channel)──────▶        │
//!                                      snapshot subscribers
//!                                              │
//!                                  per subscriber: overlay args,
//!                                  resolve, invoke, enqueue frame
//!                                              │
//!                                      bounded outbox ──▶ writer task
//! ```
//!
//! Locking follows a readers/writer discipline: broadcasts take read
//! guards, subscribe/unsubscribe/detach take write guards. When both maps
//! are needed the session map is always locked before the channel map.
//! Outboxes are bounded; a producer that cannot enqueue within
//! [`OUTBOX_SEND_TIMEOUT`] treats the session as unresponsive and closes
//! it.

use crate::core::endpoint::EndpointDescriptor;
use crate::core::error::{SocketError, ValidationError, ValidationReason};
use crate::core::handler::CallContext;
use crate::core::resolver;
use crate::server::exposure::websocket::protocol::ServerFrame;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Process-unique session identifier
pub type SessionId = String;

/// Capacity of each session's outbound frame queue
pub(crate) const OUTBOX_CAPACITY: usize = 64;

/// How long a producer may wait on a full outbox before the session is
/// treated as unresponsive and closed
pub(crate) const OUTBOX_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-session state owned by the engine
struct SessionEntry {
    /// Sender half of the bounded outbox; the writer task drains the other
    outbox: mpsc::Sender<ServerFrame>,
    /// Channels this session subscribes to (lookup-only back-pointers)
    channels: HashSet<String>,
    /// Terminal flag; a closing session silently drops broadcast frames
    closed: Arc<AtomicBool>,
}

/// Per-(channel, session) subscription state
struct SubscriptionRecord {
    session: SessionId,
    /// Required-on-subscribe values captured at subscribe time
    bound_args: Map<String, Value>,
    /// Monotonic insertion sequence, for tie-breaking when iterating
    #[allow(dead_code)]
    created: u64,
}

/// A subscriber snapshot taken at the start of one broadcast
struct DeliveryTarget {
    session: SessionId,
    bound_args: Map<String, Value>,
    outbox: mpsc::Sender<ServerFrame>,
    closed: Arc<AtomicBool>,
}

/// Tracks sessions and subscriptions; fans out channel invocations
#[derive(Default)]
pub struct SubscriptionEngine {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    channels: RwLock<HashMap<String, Vec<SubscriptionRecord>>>,
    seq: AtomicU64,
}

impl SubscriptionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session
    ///
    /// Returns the session id and the receiving half of its outbox; the
    /// caller owns the single writer that drains it.
    pub async fn connect(&self) -> (SessionId, mpsc::Receiver<ServerFrame>) {
        let session_id = format!("conn_{}", Uuid::new_v4().simple());
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);

        let entry = SessionEntry {
            outbox: tx,
            channels: HashSet::new(),
            closed: Arc::new(AtomicBool::new(false)),
        };
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), entry);

        tracing::debug!(session_id = %session_id, "WebSocket session connected");
        (session_id, rx)
    }

    /// Remove a session and all of its subscription records
    ///
    /// Emits no frames; the session is closing. Idempotent.
    pub async fn detach(&self, session: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(entry) = sessions.remove(session) else {
            return;
        };
        entry.closed.store(true, Ordering::SeqCst);

        let mut channels = self.channels.write().await;
        for channel in &entry.channels {
            if let Some(records) = channels.get_mut(channel) {
                records.retain(|r| r.session != session);
            }
        }
        tracing::debug!(session_id = %session, "WebSocket session detached");
    }

    /// Mark a session closed and detach it
    async fn close(&self, session: &str) {
        if let Some(entry) = self.sessions.read().await.get(session) {
            entry.closed.store(true, Ordering::SeqCst);
        }
        self.detach(session).await;
    }

    /// Enqueue a frame on a session's outbox, preserving FIFO order
    pub async fn send_to(&self, session: &str, frame: ServerFrame) {
        let target = {
            let sessions = self.sessions.read().await;
            sessions
                .get(session)
                .map(|e| (e.outbox.clone(), e.closed.clone()))
        };
        let Some((outbox, closed)) = target else {
            return;
        };
        self.enqueue(session, &outbox, &closed, frame).await;
    }

    async fn enqueue(
        &self,
        session: &str,
        outbox: &mpsc::Sender<ServerFrame>,
        closed: &Arc<AtomicBool>,
        frame: ServerFrame,
    ) {
        if closed.load(Ordering::SeqCst) {
            return;
        }
        match tokio::time::timeout(OUTBOX_SEND_TIMEOUT, outbox.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                // Receiver dropped: the writer is gone
                self.close(session).await;
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %session,
                    "Outbox full past deadline, closing unresponsive session"
                );
                self.close(session).await;
            }
        }
    }

    /// Subscribe a session to a channel
    ///
    /// Binds the channel's required-on-subscribe parameters from `payload`
    /// as the subscription's `bound_args` (a resubscribe replaces them and
    /// keeps the count at one), emits a `subscribed` frame, and — when the
    /// channel has `default_response` — synthesizes one invocation
    /// delivered only to this session.
    pub async fn subscribe(
        &self,
        descriptor: &EndpointDescriptor,
        session: &str,
        payload: &Map<String, Value>,
    ) -> Result<(), SocketError> {
        let schema = descriptor.schema();
        let mut bound_args = Map::new();
        for param in schema.subscribe_params() {
            let raw = payload.get(&param.name).ok_or_else(|| {
                SocketError::from(ValidationError::new(
                    schema.endpoint(),
                    ValidationReason::MissingField {
                        field: param.name.clone(),
                    },
                ))
            })?;
            let coerced = param.ty.coerce(raw).ok_or_else(|| {
                SocketError::from(ValidationError::new(
                    schema.endpoint(),
                    ValidationReason::WrongType {
                        field: param.name.clone(),
                        expected: param.ty.name(),
                    },
                ))
            })?;
            bound_args.insert(param.name.clone(), coerced);
        }

        {
            let mut sessions = self.sessions.write().await;
            let Some(entry) = sessions.get_mut(session) else {
                return Ok(());
            };
            entry.channels.insert(descriptor.name.clone());

            let mut channels = self.channels.write().await;
            let records = channels.entry(descriptor.name.clone()).or_default();
            if let Some(existing) = records.iter_mut().find(|r| r.session == session) {
                existing.bound_args = bound_args.clone();
            } else {
                records.push(SubscriptionRecord {
                    session: session.to_string(),
                    bound_args: bound_args.clone(),
                    created: self.seq.fetch_add(1, Ordering::Relaxed),
                });
            }
        }

        self.send_to(
            session,
            ServerFrame::Subscribed {
                channel: descriptor.name.clone(),
            },
        )
        .await;

        if descriptor.default_response {
            // Subscribe-time self-prime: only the new subscriber sees it.
            let mut effective = bound_args;
            for (key, value) in payload {
                effective.insert(key.clone(), value.clone());
            }
            if let Some(frame) = self
                .invoke_for_subscriber(descriptor, session, &effective)
                .await
            {
                self.send_to(session, frame).await;
            }
        }

        Ok(())
    }

    /// Remove a session's subscription to a channel
    ///
    /// Idempotent: unsubscribing a channel that was never subscribed still
    /// emits `unsubscribed`.
    pub async fn unsubscribe(&self, channel: &str, session: &str) {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(entry) = sessions.get_mut(session) {
                entry.channels.remove(channel);
            }
            let mut channels = self.channels.write().await;
            if let Some(records) = channels.get_mut(channel) {
                records.retain(|r| r.session != session);
            }
        }
        self.send_to(
            session,
            ServerFrame::Unsubscribed {
                channel: channel.to_string(),
            },
        )
        .await;
    }

    /// Fan a channel invocation out to every current subscriber
    ///
    /// The subscriber set is snapshotted before enumeration, so a session
    /// subscribing mid-broadcast is not observed by this one. Per
    /// subscriber, `call_args` are overlaid on its `bound_args`, the
    /// resolver re-binds, and the handler's return value becomes the
    /// `data` payload; a handler fault drops that subscriber's frame only.
    pub async fn broadcast(
        &self,
        descriptor: &EndpointDescriptor,
        call_args: &Map<String, Value>,
    ) {
        let targets: Vec<DeliveryTarget> = {
            let sessions = self.sessions.read().await;
            let channels = self.channels.read().await;
            let Some(records) = channels.get(&descriptor.name) else {
                return;
            };
            records
                .iter()
                .filter_map(|record| {
                    sessions.get(&record.session).map(|entry| DeliveryTarget {
                        session: record.session.clone(),
                        bound_args: record.bound_args.clone(),
                        outbox: entry.outbox.clone(),
                        closed: entry.closed.clone(),
                    })
                })
                .collect()
        };

        for target in targets {
            if target.closed.load(Ordering::SeqCst) {
                continue;
            }
            let mut effective = target.bound_args;
            for (key, value) in call_args {
                effective.insert(key.clone(), value.clone());
            }
            if let Some(frame) = self
                .invoke_for_subscriber(descriptor, &target.session, &effective)
                .await
            {
                self.enqueue(&target.session, &target.outbox, &target.closed, frame)
                    .await;
            }
        }
    }

    /// Resolve, invoke, and package one delivery for one subscriber
    ///
    /// Returns `None` when the handler returned nothing or when binding or
    /// the handler failed — the frame is simply dropped for that
    /// subscriber.
    async fn invoke_for_subscriber(
        &self,
        descriptor: &EndpointDescriptor,
        session: &str,
        effective: &Map<String, Value>,
    ) -> Option<ServerFrame> {
        let ctx = CallContext::for_session(session);
        let args = match resolver::resolve(descriptor.schema(), effective, &ctx).await {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(
                    channel = %descriptor.name,
                    session_id = %session,
                    error = %e,
                    "Dropping delivery: argument binding failed"
                );
                return None;
            }
        };

        match descriptor.handler().call(args).await {
            Ok(Some(data)) => Some(ServerFrame::Data {
                channel: descriptor.name.clone(),
                data,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    channel = %descriptor.name,
                    session_id = %session,
                    error = %e,
                    "Dropping delivery: channel handler failed"
                );
                None
            }
        }
    }

    /// Number of live sessions (for monitoring and tests)
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of subscribers on a channel
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Whether a session currently subscribes to a channel
    pub async fn is_subscribed(&self, channel: &str, session: &str) -> bool {
        self.channels
            .read()
            .await
            .get(channel)
            .is_some_and(|records| records.iter().any(|r| r.session == session))
    }
}
