//! The uniform handler invocation shim
//!
//! User handlers have heterogeneous logical signatures, but the core only
//! ever sees one shape: an async callable taking validated [`Args`] and
//! returning an optional JSON value. Returning `Ok(None)` from a channel
//! handler suppresses the `data` frame for that delivery; returning
//! `Ok(None)` from an action omits the `data` field of the response.
//!
//! [`CallContext`] is the explicit marker that tells a [`ChannelHandle`]
//! whether the current invocation is bound to a live session (direct
//! fan-out) or detached (fan-out via the loopback ingress). It is threaded
//! through `Args` by the frame loop; no global state is consulted.
//!
//! [`ChannelHandle`]: crate::server::host::ChannelHandle

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// What a handler returns: a JSON value, nothing, or an error
///
/// Errors are handler faults: the core reports a generic `error` frame (or
/// drops the affected subscriber's frame during a broadcast) and logs the
/// cause.
pub type HandlerResult = anyhow::Result<Option<Value>>;

/// An opaque async endpoint or dependency handler
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, args: Args) -> HandlerResult;
}

/// Wrap an async closure as a [`Handler`]
///
/// # Example
///
/// ```rust,ignore
/// let add = handler_fn(|args: Args| async move {
///     let sum = args.as_i64("a")? + args.as_i64("b")?;
///     Ok(Some(serde_json::json!(sum)))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn call(&self, args: Args) -> HandlerResult {
        (self.f)(args).await
    }
}

/// Marks whether an invocation runs on behalf of a live session
///
/// The frame loop attaches a bound context to every handler it invokes;
/// code running outside any session uses [`CallContext::detached`], which
/// routes channel publications through the HTTP loopback so fan-out
/// behaves identically everywhere.
#[derive(Debug, Clone)]
pub struct CallContext {
    session: Option<String>,
}

impl CallContext {
    /// A context with no bound session (worker tasks, background jobs)
    pub fn detached() -> Self {
        Self { session: None }
    }

    /// A context bound to the given session
    pub(crate) fn for_session(session: impl Into<String>) -> Self {
        Self {
            session: Some(session.into()),
        }
    }

    /// Whether this invocation serves a live session
    pub fn is_bound(&self) -> bool {
        self.session.is_some()
    }

    /// The bound session id, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }
}

/// Validated arguments handed to a handler
///
/// Values have already been coerced against the endpoint's declared
/// parameter types, so the typed accessors only fail when a handler asks
/// for a name or type it never declared — which is a handler fault.
#[derive(Debug)]
pub struct Args {
    values: Map<String, Value>,
    ctx: CallContext,
}

impl Args {
    pub(crate) fn new(values: Map<String, Value>, ctx: CallContext) -> Self {
        Self { values, ctx }
    }

    /// The invocation context attached by the caller
    pub fn ctx(&self) -> &CallContext {
        &self.ctx
    }

    /// Raw access to a bound argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All bound arguments, in declaration order
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn as_i64(&self, name: &str) -> anyhow::Result<i64> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not an integer", name))
    }

    pub fn as_f64(&self, name: &str) -> anyhow::Result<f64> {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not a float", name))
    }

    pub fn as_str(&self, name: &str) -> anyhow::Result<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not a string", name))
    }

    pub fn as_bool(&self, name: &str) -> anyhow::Result<bool> {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| anyhow::anyhow!("argument '{}' is not a boolean", name))
    }

    /// Consume the arguments, yielding the underlying map
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}
