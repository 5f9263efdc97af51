//! Application host: the immutable state every exposure shares
//!
//! [`SocketHost`] is built once by [`SocketApp::build`] and shared behind
//! an `Arc`. It owns the compiled endpoint registry (read-only from here
//! on), the subscription engine, the configuration, and the loopback
//! client — everything the WebSocket exposure and the broadcast ingress
//! need. Nothing in it assumes sole ownership of the HTTP server: both
//! exposures are plain mountable routers over this state.
//!
//! [`SocketApp::build`]: crate::server::builder::SocketApp::build

use crate::config::SocketConfig;
use crate::core::error::SocketError;
use crate::core::handler::CallContext;
use crate::core::registry::EndpointRegistry;
use crate::server::engine::SubscriptionEngine;
use crate::server::loopback::LoopbackBroadcaster;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

/// Deferred binding for channel handles created before the app is built
pub(crate) type HostSlot = Arc<OnceLock<Arc<SocketHost>>>;

/// All framework state shared by the exposures
pub struct SocketHost {
    config: Arc<SocketConfig>,
    registry: EndpointRegistry,
    engine: Arc<SubscriptionEngine>,
    loopback: LoopbackBroadcaster,
}

impl SocketHost {
    pub(crate) fn new(config: SocketConfig, registry: EndpointRegistry) -> Self {
        let loopback = LoopbackBroadcaster::new(&config);
        Self {
            config: Arc::new(config),
            registry,
            engine: Arc::new(SubscriptionEngine::new()),
            loopback,
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// The compiled endpoint tables; read-only after startup
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<SubscriptionEngine> {
        &self.engine
    }

    pub(crate) fn loopback(&self) -> &LoopbackBroadcaster {
        &self.loopback
    }

    /// Invoke a channel by name, fanning out to every current subscriber
    ///
    /// `data` must be a JSON object of call-time arguments. This is the
    /// path the broadcast ingress takes, and what a bound
    /// [`ChannelHandle::publish`] delegates to.
    pub async fn broadcast(&self, channel: &str, data: Value) -> Result<(), SocketError> {
        let descriptor = self
            .registry
            .channel(channel)
            .ok_or_else(|| SocketError::UnknownChannel {
                name: channel.to_string(),
            })?;
        let call_args = as_object(channel, data)?;
        self.engine.broadcast(&descriptor, &call_args).await;
        Ok(())
    }
}

fn as_object(channel: &str, data: Value) -> Result<Map<String, Value>, SocketError> {
    use crate::core::error::{ValidationError, ValidationReason};
    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ValidationError::new(channel, ValidationReason::PayloadNotAnObject).into()),
    }
}

/// A cheap-to-clone handle to a registered channel
///
/// Handles are handed out at registration but only bind to the running
/// application at build time. [`publish`] inspects the caller's
/// [`CallContext`]: bound invocations fan out through the engine
/// directly, detached ones POST to the application's own ingress so the
/// result is indistinguishable.
///
/// [`publish`]: ChannelHandle::publish
#[derive(Clone)]
pub struct ChannelHandle {
    name: String,
    slot: HostSlot,
}

impl ChannelHandle {
    pub(crate) fn new(name: String, slot: HostSlot) -> Self {
        Self { name, slot }
    }

    /// The channel this handle publishes to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the channel with `data` as call-time arguments
    pub async fn publish(&self, ctx: &CallContext, data: Value) -> Result<(), SocketError> {
        let Some(host) = self.slot.get() else {
            return Err(SocketError::NotStarted);
        };
        if ctx.is_bound() {
            host.broadcast(&self.name, data).await
        } else {
            host.loopback().post(&self.name, &data).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::Channel;
    use crate::core::handler::{Args, handler_fn};
    use crate::core::param::Param;
    use crate::server::exposure::websocket::protocol::ServerFrame;
    use serde_json::json;

    fn test_host() -> SocketHost {
        let mut registry = EndpointRegistry::new();
        registry
            .register_channel(
                Channel::new(
                    "chat",
                    handler_fn(|args: Args| async move {
                        let message = args.as_str("message")?.to_string();
                        Ok(Some(json!({"message": message})))
                    }),
                )
                .param(Param::str("message").default(json!("Welcome"))),
            )
            .expect("channel should register");
        SocketHost::new(SocketConfig::default(), registry)
    }

    #[tokio::test]
    async fn test_broadcast_unknown_channel() {
        let host = test_host();
        let err = host
            .broadcast("nonexistent", json!({}))
            .await
            .expect_err("unknown channel should fail");
        assert_eq!(err.to_string(), "Channel 'nonexistent' not found.");
    }

    #[tokio::test]
    async fn test_broadcast_rejects_non_object_data() {
        let host = test_host();
        let err = host
            .broadcast("chat", json!("not an object"))
            .await
            .expect_err("non-object data should fail");
        assert!(matches!(err, SocketError::Validation(_)));
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_engine_subscribers() {
        let host = test_host();
        let (session, mut rx) = host.engine().connect().await;
        let descriptor = host.registry().channel("chat").unwrap();
        host.engine()
            .subscribe(&descriptor, &session, &Map::new())
            .await
            .unwrap();
        let _ = rx.try_recv().expect("subscribed frame");

        host.broadcast("chat", json!({"message": "hi"}))
            .await
            .expect("broadcast should succeed");
        let frame = rx.try_recv().expect("data frame");
        assert!(matches!(frame, ServerFrame::Data { .. }));
    }

    #[tokio::test]
    async fn test_unbuilt_handle_reports_not_started() {
        let handle = ChannelHandle::new("chat".to_string(), HostSlot::default());
        let err = handle
            .publish(&CallContext::detached(), json!({}))
            .await
            .expect_err("handle is not bound yet");
        assert!(matches!(err, SocketError::NotStarted));
    }

    #[tokio::test]
    async fn test_bound_context_publishes_directly() {
        let slot = HostSlot::default();
        let handle = ChannelHandle::new("chat".to_string(), slot.clone());
        let host = Arc::new(test_host());
        slot.set(host.clone()).ok();

        let (session, mut rx) = host.engine().connect().await;
        let descriptor = host.registry().channel("chat").unwrap();
        host.engine()
            .subscribe(&descriptor, &session, &Map::new())
            .await
            .unwrap();
        let _ = rx.try_recv().expect("subscribed frame");

        // A bound context goes straight through the engine, no HTTP.
        handle
            .publish(
                &CallContext::for_session(&session),
                json!({"message": "direct"}),
            )
            .await
            .expect("bound publish should succeed");
        let frame = rx.try_recv().expect("data frame");
        assert!(matches!(frame, ServerFrame::Data { .. }));
    }
}
