//! Core module containing the endpoint model of the framework

pub mod endpoint;
pub mod error;
pub mod handler;
pub mod param;
pub mod registry;
pub(crate) mod resolver;
pub mod schema;

pub use endpoint::{Action, Channel, Dependency, EndpointDescriptor, EndpointKind};
pub use error::{
    HandlerError, IngressError, LoopbackError, RegistrationError, SocketError, SocketResult,
    ValidationError, ValidationReason,
};
pub use handler::{Args, CallContext, Handler, HandlerResult, handler_fn};
pub use param::{Param, ParamKind, ParamType};
pub use registry::EndpointRegistry;
pub use schema::EndpointSchema;
