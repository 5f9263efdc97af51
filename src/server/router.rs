//! Router composition
//!
//! A [`SocketRouter`] is a registry fragment: it offers the same
//! registration surface as [`SocketApp`] and is merged into the
//! application at startup with `include_router`. There is no runtime
//! dispatch difference between endpoints registered directly and through
//! a router; a name collision within a kind fails the merge.
//!
//! Channel handles handed out by a router stay unbound until the owning
//! application is built, at which point they all attach to the same host.
//!
//! [`SocketApp`]: crate::server::builder::SocketApp

use crate::core::endpoint::{Action, Channel};
use crate::core::error::RegistrationError;
use crate::core::registry::EndpointRegistry;
use crate::server::host::{ChannelHandle, HostSlot};

/// A registry fragment, mergeable into a [`SocketApp`] at startup
///
/// [`SocketApp`]: crate::server::builder::SocketApp
#[derive(Default)]
pub struct SocketRouter {
    pub(crate) registry: EndpointRegistry,
    pub(crate) slot: HostSlot,
}

impl SocketRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action on this fragment
    pub fn action(&mut self, action: Action) -> Result<(), RegistrationError> {
        self.registry.register_action(action)
    }

    /// Register a channel on this fragment
    ///
    /// The returned handle becomes usable once the application that
    /// includes this router is built.
    pub fn channel(&mut self, channel: Channel) -> Result<ChannelHandle, RegistrationError> {
        let handle = ChannelHandle::new(channel.name.clone(), self.slot.clone());
        self.registry.register_channel(channel)?;
        Ok(handle)
    }
}
