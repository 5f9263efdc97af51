//! Server module: sessions, fan-out, and the mountable exposures

pub mod builder;
pub mod engine;
pub mod exposure;
pub mod host;
pub mod loopback;
pub mod router;

pub use builder::SocketApp;
pub use engine::{SessionId, SubscriptionEngine};
pub use exposure::{BROADCAST_PATH, IngressExposure, WebSocketExposure};
pub use host::{ChannelHandle, SocketHost};
pub use loopback::LoopbackBroadcaster;
pub use router::SocketRouter;
