//! Endpoint and dependency builders
//!
//! [`Action`] and [`Channel`] are the two registrable endpoint kinds; a
//! [`Dependency`] is structurally the same thing but is never addressable
//! from the wire — it lives inside a parameter and is resolved recursively
//! when its parent binds arguments.
//!
//! Registration compiles each builder into an immutable
//! [`EndpointDescriptor`]; descriptors never change after startup, which is
//! what makes lock-free concurrent registry reads safe.

use crate::core::error::RegistrationError;
use crate::core::handler::Handler;
use crate::core::param::Param;
use crate::core::schema::EndpointSchema;
use std::sync::{Arc, Mutex};

/// Which table an endpoint lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Request/response: one invocation, one reply to the caller
    Action,
    /// Publish/subscribe: one invocation, a `data` frame per subscriber
    Channel,
}

/// A request/response endpoint under construction
pub struct Action {
    pub(crate) name: String,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) params: Vec<Param>,
}

impl Action {
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
            params: Vec::new(),
        }
    }

    /// Declare the next parameter, in order
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }
}

/// A publish/subscribe endpoint under construction
pub struct Channel {
    pub(crate) name: String,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) params: Vec<Param>,
    pub(crate) default_response: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
            params: Vec::new(),
            default_response: false,
        }
    }

    /// Declare the next parameter, in order
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Synthesize an invocation for a subscriber right after it subscribes
    ///
    /// Only the new subscriber receives the resulting `data` frame.
    pub fn default_response(mut self, enabled: bool) -> Self {
        self.default_response = enabled;
        self
    }
}

/// A sub-endpoint bound to a parameter of its parent
///
/// Handles are cheap to clone and share structure, so the same dependency
/// can back parameters of several endpoints. Parameters may be added after
/// cloning, which permits mutually-referential graphs — the schema
/// compiler rejects those at registration.
#[derive(Clone)]
pub struct Dependency {
    pub(crate) inner: Arc<DependencyInner>,
}

pub(crate) struct DependencyInner {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) params: Mutex<Vec<Param>>,
}

impl Dependency {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            inner: Arc::new(DependencyInner {
                handler,
                params: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Declare the next parameter of the dependency, in order
    pub fn param(self, param: Param) -> Self {
        self.inner
            .params
            .lock()
            .expect("dependency parameter list poisoned")
            .push(param);
        self
    }
}

/// A compiled endpoint: immutable after registration
pub struct EndpointDescriptor {
    pub name: String,
    pub kind: EndpointKind,
    pub default_response: bool,
    pub(crate) schema: EndpointSchema,
    pub(crate) handler: Arc<dyn Handler>,
}

impl EndpointDescriptor {
    pub(crate) fn from_action(action: Action) -> Result<Self, RegistrationError> {
        let schema = EndpointSchema::compile(&action.name, &action.params)?;
        Ok(Self {
            name: action.name,
            kind: EndpointKind::Action,
            default_response: false,
            schema,
            handler: action.handler,
        })
    }

    pub(crate) fn from_channel(channel: Channel) -> Result<Self, RegistrationError> {
        let schema = EndpointSchema::compile(&channel.name, &channel.params)?;
        Ok(Self {
            name: channel.name,
            kind: EndpointKind::Channel,
            default_response: channel.default_response,
            schema,
            handler: channel.handler,
        })
    }

    pub(crate) fn schema(&self) -> &EndpointSchema {
        &self.schema
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::{Args, handler_fn};
    use serde_json::json;

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_args: Args| async move { Ok(None) })
    }

    #[test]
    fn test_action_builder_keeps_param_order() {
        let action = Action::new("add", noop())
            .param(Param::int("a"))
            .param(Param::int("b"));
        assert_eq!(action.name, "add");
        assert_eq!(action.params.len(), 2);
        assert_eq!(action.params[0].name(), "a");
        assert_eq!(action.params[1].name(), "b");
    }

    #[test]
    fn test_channel_default_response_is_off() {
        let channel = Channel::new("news", noop());
        assert!(!channel.default_response);

        let channel = Channel::new("news", noop()).default_response(true);
        assert!(channel.default_response);
    }

    #[test]
    fn test_descriptor_from_channel() {
        let channel = Channel::new("chat", noop())
            .param(Param::str("message").default(json!("Welcome")))
            .default_response(true);
        let desc = EndpointDescriptor::from_channel(channel).expect("should compile");
        assert_eq!(desc.name, "chat");
        assert_eq!(desc.kind, EndpointKind::Channel);
        assert!(desc.default_response);
    }

    #[test]
    fn test_dependency_clones_share_params() {
        let dep = Dependency::new(noop()).param(Param::int("a"));
        let clone = dep.clone();
        let _ = clone.param(Param::str("b"));
        assert_eq!(dep.inner.params.lock().unwrap().len(), 2);
    }
}
