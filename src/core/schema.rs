//! Compiled endpoint schemas
//!
//! At registration every endpoint's declared parameter list is compiled
//! into an [`EndpointSchema`]: an ordered list of compiled parameters with
//! every dependency's own schema compiled recursively beneath it. The
//! resolver walks this tree depth-first at call time; nothing is compiled
//! on the hot path.
//!
//! The compiler also detects cycles: a dependency reachable from itself
//! through its parameter tree fails registration, so cyclic graphs can
//! never execute.

use crate::core::error::RegistrationError;
use crate::core::handler::Handler;
use crate::core::param::{Param, ParamKind, ParamType};
use serde_json::Value;
use std::sync::Arc;

/// A compiled, immutable validation schema for one endpoint
pub struct EndpointSchema {
    pub(crate) endpoint: String,
    pub(crate) params: Vec<CompiledParam>,
}

/// One compiled parameter
pub(crate) struct CompiledParam {
    pub(crate) name: String,
    pub(crate) ty: ParamType,
    pub(crate) default: Option<Value>,
    pub(crate) kind: CompiledKind,
}

/// The compiled form of [`ParamKind`]
pub(crate) enum CompiledKind {
    Value,
    SubscribeOnly,
    Dependency(Arc<CompiledDependency>),
}

/// A dependency with its nested schema, ready to resolve
pub(crate) struct CompiledDependency {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) schema: EndpointSchema,
}

impl EndpointSchema {
    /// Compile the declared parameters of `endpoint`
    ///
    /// Nested dependency schemas carry the top-level endpoint name so every
    /// validation error below this endpoint reports the name the client
    /// actually invoked.
    pub(crate) fn compile(
        endpoint: &str,
        params: &[Param],
    ) -> Result<Self, RegistrationError> {
        let mut path = Vec::new();
        Self::compile_inner(endpoint, params, &mut path)
    }

    fn compile_inner(
        endpoint: &str,
        params: &[Param],
        path: &mut Vec<*const ()>,
    ) -> Result<Self, RegistrationError> {
        let mut compiled = Vec::with_capacity(params.len());

        for param in params {
            let kind = match &param.kind {
                ParamKind::Value => CompiledKind::Value,
                ParamKind::SubscribeOnly => CompiledKind::SubscribeOnly,
                ParamKind::Dependency(dep) => {
                    let node = Arc::as_ptr(&dep.inner) as *const ();
                    if path.contains(&node) {
                        return Err(RegistrationError::CyclicDependency {
                            endpoint: endpoint.to_string(),
                        });
                    }

                    let nested_params = dep
                        .inner
                        .params
                        .lock()
                        .expect("dependency parameter list poisoned")
                        .clone();

                    path.push(node);
                    let schema = Self::compile_inner(endpoint, &nested_params, path)?;
                    path.pop();

                    CompiledKind::Dependency(Arc::new(CompiledDependency {
                        handler: dep.inner.handler.clone(),
                        schema,
                    }))
                }
            };

            compiled.push(CompiledParam {
                name: param.name.clone(),
                ty: param.ty,
                default: param.default.clone(),
                kind,
            });
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            params: compiled,
        })
    }

    /// The endpoint name validation errors report
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The required-on-subscribe parameters, in declaration order
    pub(crate) fn subscribe_params(&self) -> impl Iterator<Item = &CompiledParam> {
        self.params
            .iter()
            .filter(|p| matches!(p.kind, CompiledKind::SubscribeOnly))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::Dependency;
    use crate::core::handler::{Args, handler_fn};
    use serde_json::json;

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_args: Args| async move { Ok(None) })
    }

    #[test]
    fn test_compile_plain_params() {
        let schema = EndpointSchema::compile(
            "add",
            &[Param::int("a"), Param::int("b")],
        )
        .expect("should compile");
        assert_eq!(schema.endpoint(), "add");
        assert_eq!(schema.params.len(), 2);
        assert!(matches!(schema.params[0].kind, CompiledKind::Value));
    }

    #[test]
    fn test_compile_nested_dependency() {
        let inner = Dependency::new(noop())
            .param(Param::int("a"))
            .param(Param::str("b"));
        let outer = Dependency::new(noop()).param(Param::dependency("x", inner));

        let schema = EndpointSchema::compile(
            "action_with_nested_dependency",
            &[Param::dependency("dep", outer)],
        )
        .expect("should compile");

        let CompiledKind::Dependency(dep) = &schema.params[0].kind else {
            panic!("expected a dependency parameter");
        };
        let CompiledKind::Dependency(nested) = &dep.schema.params[0].kind else {
            panic!("expected a nested dependency parameter");
        };
        assert_eq!(nested.schema.params.len(), 2);
        // Nested errors report the top-level endpoint name
        assert_eq!(nested.schema.endpoint(), "action_with_nested_dependency");
    }

    #[test]
    fn test_compile_rejects_cycles() {
        let a = Dependency::new(noop());
        let b = Dependency::new(noop()).param(Param::dependency("a", a.clone()));
        let a = a.param(Param::dependency("b", b));

        let result = EndpointSchema::compile("looped", &[Param::dependency("a", a)]);
        assert!(matches!(
            result,
            Err(RegistrationError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_self_reference() {
        let a = Dependency::new(noop());
        let a = a.clone().param(Param::dependency("again", a));

        let result = EndpointSchema::compile("selfie", &[Param::dependency("a", a)]);
        assert!(matches!(
            result,
            Err(RegistrationError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_diamond_sharing_is_not_a_cycle() {
        // The same dependency backing two sibling parameters is fine; only
        // reachability from itself is rejected.
        let shared = Dependency::new(noop()).param(Param::int("n"));
        let schema = EndpointSchema::compile(
            "diamond",
            &[
                Param::dependency("left", shared.clone()),
                Param::dependency("right", shared),
            ],
        );
        assert!(schema.is_ok());
    }

    #[test]
    fn test_subscribe_params_filter() {
        let schema = EndpointSchema::compile(
            "priv",
            &[
                Param::str("token").on_subscribe(),
                Param::str("message").default(json!("")),
            ],
        )
        .expect("should compile");

        let names: Vec<&str> = schema.subscribe_params().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["token"]);
    }
}
