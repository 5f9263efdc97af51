//! Typed error handling for the socketapi framework
//!
//! Errors fall into two families with very different lifecycles:
//!
//! - **Registration-time** errors ([`RegistrationError`]) are fatal: a
//!   duplicate endpoint name or a cyclic dependency graph aborts startup.
//! - **Frame-time** errors ([`ValidationError`], [`HandlerError`]) are
//!   reported to the offending session as an `error` frame and never
//!   terminate the connection.
//!
//! Ingress failures ([`IngressError`]) are HTTP-only: they map to status
//! codes for the caller of the broadcast endpoint and never reach
//! WebSocket clients.
//!
//! The `Display` implementations of the frame-time errors are the exact
//! strings placed in outbound `error` frames, so changing them is a wire
//! protocol change.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// The umbrella error type for the socketapi framework
#[derive(Debug)]
pub enum SocketError {
    /// Startup-time registration failure
    Registration(RegistrationError),

    /// Parameter validation or dependency binding failure
    Validation(ValidationError),

    /// A user-supplied handler returned an error
    Handler(HandlerError),

    /// The named action is not registered
    UnknownAction { name: String },

    /// The named channel is not registered
    UnknownChannel { name: String },

    /// The out-of-context broadcast client could not reach the ingress
    Loopback(LoopbackError),

    /// A channel handle was used before the application was built
    NotStarted,
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::Registration(e) => write!(f, "{}", e),
            SocketError::Validation(e) => write!(f, "{}", e),
            SocketError::Handler(e) => write!(f, "{}", e),
            SocketError::UnknownAction { name } => {
                write!(f, "Action '{}' not found.", name)
            }
            SocketError::UnknownChannel { name } => {
                write!(f, "Channel '{}' not found.", name)
            }
            SocketError::Loopback(e) => write!(f, "{}", e),
            SocketError::NotStarted => {
                write!(f, "Application is not running; channel handles bind at build time")
            }
        }
    }
}

impl std::error::Error for SocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SocketError::Registration(e) => Some(e),
            SocketError::Validation(e) => Some(e),
            SocketError::Handler(e) => Some(e),
            SocketError::Loopback(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Registration errors
// =============================================================================

/// Errors raised while compiling and registering endpoints
///
/// These are always fatal at startup; the frame loop never sees them.
#[derive(Debug)]
pub enum RegistrationError {
    /// Two endpoints of the same kind share a name
    DuplicateEndpoint {
        kind: &'static str,
        name: String,
    },

    /// A dependency reaches itself through its own parameter tree
    CyclicDependency {
        endpoint: String,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicateEndpoint { kind, name } => {
                write!(f, "Duplicate {} '{}'", kind, name)
            }
            RegistrationError::CyclicDependency { endpoint } => {
                write!(
                    f,
                    "Cyclic dependency graph while compiling endpoint '{}'",
                    endpoint
                )
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<RegistrationError> for SocketError {
    fn from(err: RegistrationError) -> Self {
        SocketError::Registration(err)
    }
}

// =============================================================================
// Validation errors
// =============================================================================

/// Parameter validation failure for a named endpoint
///
/// `Display` renders the exact wire message; the finer-grained [`reason`]
/// is kept for logging only.
///
/// [`reason`]: ValidationError::reason
#[derive(Debug)]
pub struct ValidationError {
    /// Endpoint whose parameters failed to bind
    pub endpoint: String,
    /// What went wrong, for diagnostics
    pub reason: ValidationReason,
}

/// The specific way a payload failed validation
#[derive(Debug)]
pub enum ValidationReason {
    /// A required field was absent and had no default
    MissingField { field: String },

    /// A field was present but could not be coerced to the declared type
    WrongType {
        field: String,
        expected: &'static str,
    },

    /// A dependency parameter's payload was not a JSON object
    NotAnObject { field: String },

    /// The top-level call payload was not a JSON object
    PayloadNotAnObject,
}

impl ValidationError {
    pub fn new(endpoint: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid parameters for action '{}'", self.endpoint)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for SocketError {
    fn from(err: ValidationError) -> Self {
        SocketError::Validation(err)
    }
}

// =============================================================================
// Handler errors
// =============================================================================

/// A user handler (endpoint or dependency) returned an error
///
/// The wire rendering is deliberately generic; the underlying cause is
/// logged server-side and never leaked to clients.
#[derive(Debug)]
pub struct HandlerError {
    /// Endpoint whose handler (or whose dependency's handler) failed
    pub endpoint: String,
    /// The error the handler returned
    pub source: anyhow::Error,
}

impl HandlerError {
    pub fn new(endpoint: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            endpoint: endpoint.into(),
            source,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Internal error in handler '{}'.", self.endpoint)
    }
}

impl std::error::Error for HandlerError {}

impl From<HandlerError> for SocketError {
    fn from(err: HandlerError) -> Self {
        SocketError::Handler(err)
    }
}

// =============================================================================
// Loopback errors
// =============================================================================

/// Failures of the out-of-context broadcast client
#[derive(Debug)]
pub enum LoopbackError {
    /// The POST to the ingress could not be sent or completed
    Request { url: String, message: String },

    /// The ingress answered with a non-success status
    Status { url: String, status: u16 },
}

impl fmt::Display for LoopbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopbackError::Request { url, message } => {
                write!(f, "Broadcast loopback to {} failed: {}", url, message)
            }
            LoopbackError::Status { url, status } => {
                write!(f, "Broadcast loopback to {} returned status {}", url, status)
            }
        }
    }
}

impl std::error::Error for LoopbackError {}

impl From<LoopbackError> for SocketError {
    fn from(err: LoopbackError) -> Self {
        SocketError::Loopback(err)
    }
}

// =============================================================================
// Ingress errors
// =============================================================================

/// Errors returned to HTTP callers of the broadcast ingress
///
/// These never reach WebSocket clients; they map straight to status codes.
#[derive(Debug)]
pub enum IngressError {
    /// Peer address is not in the configured allow-list
    Forbidden { peer: String },

    /// The request named a channel that is not registered
    UnknownChannel { name: String },

    /// The request body was not a well-formed `{channel, data}` object
    MalformedBody { message: String },
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressError::Forbidden { peer } => {
                write!(f, "Peer '{}' is not allowed to broadcast", peer)
            }
            IngressError::UnknownChannel { name } => {
                write!(f, "Channel '{}' not found.", name)
            }
            IngressError::MalformedBody { message } => {
                write!(f, "Malformed broadcast body: {}", message)
            }
        }
    }
}

impl std::error::Error for IngressError {}

impl IngressError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngressError::Forbidden { .. } => StatusCode::FORBIDDEN,
            IngressError::UnknownChannel { .. } => StatusCode::NOT_FOUND,
            IngressError::MalformedBody { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            IngressError::Forbidden { .. } => "FORBIDDEN_PEER",
            IngressError::UnknownChannel { .. } => "UNKNOWN_CHANNEL",
            IngressError::MalformedBody { .. } => "MALFORMED_BODY",
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for socketapi operations
pub type SocketResult<T> = Result<T, SocketError>;
