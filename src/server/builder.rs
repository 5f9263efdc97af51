//! SocketApp: registration surface and server assembly
//!
//! The application is assembled in two phases. During registration,
//! actions and channels (directly or via routers) are compiled into the
//! endpoint registry; [`build`] then freezes the registry into a
//! [`SocketHost`], binds every channel handle handed out so far, and
//! produces the mountable axum router (WebSocket route plus broadcast
//! ingress). [`serve`] is the batteries-included path: bind, serve, and
//! shut down gracefully on SIGTERM or Ctrl+C.
//!
//! [`build`]: SocketApp::build
//! [`serve`]: SocketApp::serve
//! [`SocketHost`]: crate::server::host::SocketHost

use crate::config::SocketConfig;
use crate::core::endpoint::{Action, Channel};
use crate::core::error::RegistrationError;
use crate::core::registry::EndpointRegistry;
use crate::server::exposure::{IngressExposure, WebSocketExposure};
use crate::server::host::{ChannelHandle, HostSlot, SocketHost};
use crate::server::router::SocketRouter;
use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for a socketapi application
///
/// # Example
///
/// ```ignore
/// let mut app = SocketApp::new();
/// app.action(
///     Action::new("add", handler_fn(|args: Args| async move {
///         Ok(Some(json!(args.as_i64("a")? + args.as_i64("b")?)))
///     }))
///     .param(Param::int("a"))
///     .param(Param::int("b")),
/// )?;
/// app.serve().await?;
/// ```
pub struct SocketApp {
    config: SocketConfig,
    registry: EndpointRegistry,
    slot: HostSlot,
    router_slots: Vec<HostSlot>,
}

impl SocketApp {
    /// Create an application with default configuration
    pub fn new() -> Self {
        Self::with_config(SocketConfig::default())
    }

    /// Create an application with explicit configuration
    pub fn with_config(config: SocketConfig) -> Self {
        Self {
            config,
            registry: EndpointRegistry::new(),
            slot: HostSlot::default(),
            router_slots: Vec::new(),
        }
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Register an action
    pub fn action(&mut self, action: Action) -> Result<(), RegistrationError> {
        self.registry.register_action(action)
    }

    /// Register a channel
    ///
    /// The returned [`ChannelHandle`] can be captured by other handlers or
    /// worker tasks; it binds to the running application at build time.
    pub fn channel(&mut self, channel: Channel) -> Result<ChannelHandle, RegistrationError> {
        let handle = ChannelHandle::new(channel.name.clone(), self.slot.clone());
        self.registry.register_channel(channel)?;
        Ok(handle)
    }

    /// Merge a router's endpoint tables into the application
    ///
    /// Name collisions within a kind are fatal, exactly as if the
    /// endpoints had been registered directly.
    pub fn include_router(&mut self, router: SocketRouter) -> Result<(), RegistrationError> {
        let SocketRouter { registry, slot } = router;
        self.registry.merge(registry)?;
        self.router_slots.push(slot);
        Ok(())
    }

    /// Freeze the registry and produce the host plus the mountable router
    ///
    /// The returned router carries the WebSocket route (`/ws`) and the
    /// broadcast ingress. To embed it in a larger application, merge it
    /// into your own router — but serve the result with
    /// `into_make_service_with_connect_info::<SocketAddr>()`, which the
    /// ingress allow-list check depends on.
    pub fn build(self) -> (Arc<SocketHost>, Router) {
        let host = Arc::new(SocketHost::new(self.config, self.registry));

        let _ = self.slot.set(host.clone());
        for slot in &self.router_slots {
            let _ = slot.set(host.clone());
        }

        let router = WebSocketExposure::build_router(host.clone())
            .merge(IngressExposure::build_router(host.clone()));
        (host, router)
    }

    /// Bind to the configured address and serve until shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let (_host, app) = self.build();

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("socketapi listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for SocketApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::{Args, CallContext, handler_fn};
    use crate::core::param::Param;
    use serde_json::json;

    fn noop_action(name: &str) -> Action {
        Action::new(name, handler_fn(|_args: Args| async move { Ok(None) }))
    }

    fn echo_channel(name: &str) -> Channel {
        Channel::new(
            name,
            handler_fn(|args: Args| async move {
                let message = args.as_str("message")?.to_string();
                Ok(Some(json!({"message": message})))
            }),
        )
        .param(Param::str("message").default(json!("Welcome")))
    }

    #[test]
    fn test_register_and_build() {
        let mut app = SocketApp::new();
        app.action(noop_action("ping")).unwrap();
        let handle = app.channel(echo_channel("chat")).unwrap();

        let (host, _router) = app.build();
        assert!(host.registry().action("ping").is_some());
        assert!(host.registry().channel("chat").is_some());
        assert_eq!(handle.name(), "chat");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut app = SocketApp::new();
        app.action(noop_action("ping")).unwrap();
        assert!(app.action(noop_action("ping")).is_err());
    }

    #[test]
    fn test_include_router_merges_endpoints() {
        let mut router = SocketRouter::new();
        router.action(noop_action("from_router")).unwrap();
        router.channel(echo_channel("test_channel")).unwrap();

        let mut app = SocketApp::new();
        app.action(noop_action("direct")).unwrap();
        app.include_router(router).unwrap();

        let (host, _router) = app.build();
        assert!(host.registry().action("from_router").is_some());
        assert!(host.registry().action("direct").is_some());
        assert!(host.registry().channel("test_channel").is_some());
    }

    #[test]
    fn test_include_router_collision_fails() {
        let mut router = SocketRouter::new();
        router.action(noop_action("ping")).unwrap();

        let mut app = SocketApp::new();
        app.action(noop_action("ping")).unwrap();
        assert!(app.include_router(router).is_err());
    }

    #[tokio::test]
    async fn test_router_handles_bind_at_build() {
        let mut router = SocketRouter::new();
        let handle = router.channel(echo_channel("test_channel")).unwrap();

        let mut app = SocketApp::new();
        app.include_router(router).unwrap();

        // Before build the handle is unbound.
        let err = handle
            .publish(&CallContext::detached(), json!({}))
            .await
            .expect_err("unbound handle must fail");
        assert!(matches!(err, crate::core::error::SocketError::NotStarted));

        let (host, _axum_router) = app.build();

        // After build a bound-context publish reaches the engine directly.
        let (session, mut rx) = host.engine().connect().await;
        let descriptor = host.registry().channel("test_channel").unwrap();
        host.engine()
            .subscribe(&descriptor, &session, &serde_json::Map::new())
            .await
            .unwrap();
        let _ = rx.try_recv().expect("subscribed frame");

        handle
            .publish(&CallContext::for_session(&session), json!({"message": "hi"}))
            .await
            .expect("bound publish should succeed");
        assert!(rx.try_recv().is_ok(), "data frame delivered");
    }

    #[test]
    fn test_custom_config_is_kept() {
        let config = SocketConfig {
            host: "127.0.0.1".to_string(),
            port: 9200,
            ..SocketConfig::default()
        };
        let app = SocketApp::with_config(config);
        assert_eq!(app.config().port, 9200);

        let (host, _router) = app.build();
        assert_eq!(host.config().port, 9200);
    }
}
