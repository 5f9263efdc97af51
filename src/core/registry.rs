//! The endpoint registry
//!
//! Two disjoint name spaces — actions and channels — each a map from name
//! to compiled descriptor. The registry is only written during startup;
//! once the application is built it is shared behind an `Arc` and read
//! without synchronization.
//!
//! Routers are registry fragments: [`merge`] takes the table union, and a
//! name collision within a kind is fatal at startup.
//!
//! [`merge`]: EndpointRegistry::merge

use crate::core::endpoint::{Action, Channel, EndpointDescriptor};
use crate::core::error::RegistrationError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// The action and channel tables
#[derive(Default)]
pub struct EndpointRegistry {
    actions: HashMap<String, Arc<EndpointDescriptor>>,
    channels: HashMap<String, Arc<EndpointDescriptor>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register an action
    pub fn register_action(&mut self, action: Action) -> Result<(), RegistrationError> {
        let descriptor = EndpointDescriptor::from_action(action)?;
        Self::insert(&mut self.actions, descriptor, "action")
    }

    /// Compile and register a channel
    pub fn register_channel(&mut self, channel: Channel) -> Result<(), RegistrationError> {
        let descriptor = EndpointDescriptor::from_channel(channel)?;
        Self::insert(&mut self.channels, descriptor, "channel")
    }

    fn insert(
        table: &mut HashMap<String, Arc<EndpointDescriptor>>,
        descriptor: EndpointDescriptor,
        kind: &'static str,
    ) -> Result<(), RegistrationError> {
        match table.entry(descriptor.name.clone()) {
            Entry::Occupied(_) => Err(RegistrationError::DuplicateEndpoint {
                kind,
                name: descriptor.name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(descriptor));
                Ok(())
            }
        }
    }

    /// Look up an action by name
    pub fn action(&self, name: &str) -> Option<Arc<EndpointDescriptor>> {
        self.actions.get(name).cloned()
    }

    /// Look up a channel by name
    pub fn channel(&self, name: &str) -> Option<Arc<EndpointDescriptor>> {
        self.channels.get(name).cloned()
    }

    /// Merge another registry into this one by table union
    ///
    /// A duplicate name within a kind fails; actions and channels may share
    /// names because the wire `type` field disambiguates them.
    pub fn merge(&mut self, other: EndpointRegistry) -> Result<(), RegistrationError> {
        for (name, descriptor) in other.actions {
            match self.actions.entry(name) {
                Entry::Occupied(slot) => {
                    return Err(RegistrationError::DuplicateEndpoint {
                        kind: "action",
                        name: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(descriptor);
                }
            }
        }
        for (name, descriptor) in other.channels {
            match self.channels.entry(name) {
                Entry::Occupied(slot) => {
                    return Err(RegistrationError::DuplicateEndpoint {
                        kind: "channel",
                        name: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(descriptor);
                }
            }
        }
        Ok(())
    }

    /// Names of all registered actions
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.keys().map(|s| s.as_str()).collect()
    }

    /// Names of all registered channels
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.channels.is_empty()
    }
}
