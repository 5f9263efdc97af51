//! Argument binding and dependency resolution
//!
//! [`resolve`] turns a JSON payload into validated [`Args`] for one
//! handler invocation. It walks the compiled schema in declaration order:
//! plain values are coerced against their declared types, and dependency
//! parameters recursively resolve and invoke their own handlers, binding
//! the returned value.
//!
//! The resolver is re-entrant and stateless — any number of resolutions
//! may run concurrently, and dependency results are never memoized across
//! invocations.

use crate::core::error::{HandlerError, SocketError, ValidationError, ValidationReason};
use crate::core::handler::{Args, CallContext};
use crate::core::schema::{CompiledKind, EndpointSchema};
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Bind `payload` against `schema`, resolving dependencies depth-first
///
/// Dependency handlers run as part of resolution; a failing dependency is
/// a handler fault, not a validation error.
pub(crate) fn resolve<'a>(
    schema: &'a EndpointSchema,
    payload: &'a Map<String, Value>,
    ctx: &'a CallContext,
) -> BoxFuture<'a, Result<Args, SocketError>> {
    Box::pin(async move {
        let mut bound = Map::new();

        for param in &schema.params {
            match &param.kind {
                CompiledKind::Value | CompiledKind::SubscribeOnly => {
                    let raw = match payload.get(&param.name) {
                        Some(value) => value.clone(),
                        None => match &param.default {
                            Some(default) => default.clone(),
                            None => {
                                return Err(ValidationError::new(
                                    schema.endpoint(),
                                    ValidationReason::MissingField {
                                        field: param.name.clone(),
                                    },
                                )
                                .into());
                            }
                        },
                    };

                    let coerced = param.ty.coerce(&raw).ok_or_else(|| {
                        SocketError::from(ValidationError::new(
                            schema.endpoint(),
                            ValidationReason::WrongType {
                                field: param.name.clone(),
                                expected: param.ty.name(),
                            },
                        ))
                    })?;
                    bound.insert(param.name.clone(), coerced);
                }
                CompiledKind::Dependency(dep) => {
                    let nested_payload = match payload.get(&param.name) {
                        Some(Value::Object(map)) => map.clone(),
                        Some(_) => {
                            return Err(ValidationError::new(
                                schema.endpoint(),
                                ValidationReason::NotAnObject {
                                    field: param.name.clone(),
                                },
                            )
                            .into());
                        }
                        None => {
                            return Err(ValidationError::new(
                                schema.endpoint(),
                                ValidationReason::MissingField {
                                    field: param.name.clone(),
                                },
                            )
                            .into());
                        }
                    };

                    let nested_args = resolve(&dep.schema, &nested_payload, ctx).await?;
                    let value = dep
                        .handler
                        .call(nested_args)
                        .await
                        .map_err(|e| {
                            SocketError::from(HandlerError::new(schema.endpoint(), e))
                        })?
                        .unwrap_or(Value::Null);
                    bound.insert(param.name.clone(), value);
                }
            }
        }

        Ok(Args::new(bound, ctx.clone()))
    })
}
