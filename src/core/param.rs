//! Parameter descriptors for endpoint registration
//!
//! Rust has no runtime signature introspection, so the parameters a handler
//! expects are declared explicitly when the endpoint is registered. Each
//! [`Param`] carries a name, a declared type, an optional default, and a
//! kind:
//!
//! - plain **value** parameters are read from the call payload;
//! - **required-on-subscribe** parameters (channels only) are bound once at
//!   subscribe time and replayed on every later broadcast to that
//!   subscriber;
//! - **dependency** parameters bind the return value of a nested handler
//!   whose own parameters live under the same key in the payload.

use crate::core::endpoint::Dependency;
use serde_json::Value;

/// The declared type of a parameter
///
/// Coercion is lax in the way mainstream schema libraries are: a string
/// that unambiguously parses as a number satisfies `Int`/`Float`, a number
/// renders into a `Str`, and `"true"`/`"false"` satisfy `Bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Str,
    Bool,
    Object,
    Array,
    /// Accepts any JSON value unchanged
    Any,
}

impl ParamType {
    /// Human-readable type name, used in validation diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Int => "integer",
            ParamType::Float => "float",
            ParamType::Str => "string",
            ParamType::Bool => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
            ParamType::Any => "any",
        }
    }

    /// Coerce `value` to this type, returning the normalized value
    ///
    /// Returns `None` when the value cannot represent the declared type.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match self {
            ParamType::Int => match value {
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Some(Value::from(i))
                    } else {
                        // Accept whole-valued floats the way lax schema
                        // validators do (5.0 -> 5).
                        n.as_f64()
                            .filter(|f| f.fract() == 0.0)
                            .map(|f| Value::from(f as i64))
                    }
                }
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Float => match value {
                Value::Number(n) => n.as_f64().map(Value::from),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Str => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) => Some(Value::from(n.to_string())),
                _ => None,
            },
            ParamType::Bool => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) => match s.as_str() {
                    "true" => Some(Value::from(true)),
                    "false" => Some(Value::from(false)),
                    _ => None,
                },
                _ => None,
            },
            ParamType::Object => value.is_object().then(|| value.clone()),
            ParamType::Array => value.is_array().then(|| value.clone()),
            ParamType::Any => Some(value.clone()),
        }
    }
}

/// How a parameter gets its value
#[derive(Clone)]
pub enum ParamKind {
    /// Read from the call payload (or the default)
    Value,
    /// Bound at subscribe time and merged into every later broadcast
    SubscribeOnly,
    /// Bound to the return value of a nested dependency handler
    Dependency(Dependency),
}

/// A single declared parameter of an endpoint or dependency
#[derive(Clone)]
pub struct Param {
    pub(crate) name: String,
    pub(crate) ty: ParamType,
    pub(crate) default: Option<Value>,
    pub(crate) kind: ParamKind,
}

impl Param {
    /// Declare a value parameter with an explicit type
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            kind: ParamKind::Value,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Str)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Bool)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Object)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Array)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Any)
    }

    /// Declare a dependency parameter
    ///
    /// The payload under `name` must be a (possibly empty) JSON object
    /// holding the dependency's own parameters; the bound value is whatever
    /// the dependency handler returns.
    pub fn dependency(name: impl Into<String>, dep: Dependency) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Any,
            default: None,
            kind: ParamKind::Dependency(dep),
        }
    }

    /// Give the parameter a default, making it optional in the payload
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark the parameter as required-on-subscribe (channels only)
    ///
    /// The value must be present in the subscribe payload; it is captured
    /// there and overlaid under every later broadcast to that subscriber.
    pub fn on_subscribe(mut self) -> Self {
        self.kind = ParamKind::SubscribeOnly;
        self
    }

    /// The declared parameter name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_accepts_integers() {
        assert_eq!(ParamType::Int.coerce(&json!(5)), Some(json!(5)));
        assert_eq!(ParamType::Int.coerce(&json!(-3)), Some(json!(-3)));
    }

    #[test]
    fn test_int_coerces_numeric_strings() {
        assert_eq!(ParamType::Int.coerce(&json!("5")), Some(json!(5)));
        assert_eq!(ParamType::Int.coerce(&json!(" 42 ")), Some(json!(42)));
        assert_eq!(ParamType::Int.coerce(&json!("not_an_int")), None);
    }

    #[test]
    fn test_int_accepts_whole_floats_only() {
        assert_eq!(ParamType::Int.coerce(&json!(5.0)), Some(json!(5)));
        assert_eq!(ParamType::Int.coerce(&json!(5.5)), None);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(ParamType::Float.coerce(&json!(1.5)), Some(json!(1.5)));
        assert_eq!(ParamType::Float.coerce(&json!(2)), Some(json!(2.0)));
        assert_eq!(ParamType::Float.coerce(&json!("3.25")), Some(json!(3.25)));
        assert_eq!(ParamType::Float.coerce(&json!("abc")), None);
    }

    #[test]
    fn test_str_coerces_numbers() {
        assert_eq!(ParamType::Str.coerce(&json!("hi")), Some(json!("hi")));
        assert_eq!(ParamType::Str.coerce(&json!(7)), Some(json!("7")));
        assert_eq!(ParamType::Str.coerce(&json!(true)), None);
        assert_eq!(ParamType::Str.coerce(&json!({})), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(ParamType::Bool.coerce(&json!(true)), Some(json!(true)));
        assert_eq!(ParamType::Bool.coerce(&json!("false")), Some(json!(false)));
        assert_eq!(ParamType::Bool.coerce(&json!("yes")), None);
        assert_eq!(ParamType::Bool.coerce(&json!(1)), None);
    }

    #[test]
    fn test_object_and_array() {
        assert!(ParamType::Object.coerce(&json!({"a": 1})).is_some());
        assert!(ParamType::Object.coerce(&json!([1])).is_none());
        assert!(ParamType::Array.coerce(&json!([1, 2])).is_some());
        assert!(ParamType::Array.coerce(&json!({})).is_none());
    }

    #[test]
    fn test_any_passes_everything_through() {
        for value in [json!(null), json!(1), json!("x"), json!({"k": []})] {
            assert_eq!(ParamType::Any.coerce(&value), Some(value.clone()));
        }
    }

    #[test]
    fn test_param_builders() {
        let p = Param::int("a");
        assert_eq!(p.name(), "a");
        assert_eq!(p.ty, ParamType::Int);
        assert!(p.default.is_none());
        assert!(matches!(p.kind, ParamKind::Value));

        let p = Param::str("message").default(json!("Welcome"));
        assert_eq!(p.default, Some(json!("Welcome")));

        let p = Param::str("token").on_subscribe();
        assert!(matches!(p.kind, ParamKind::SubscribeOnly));
    }
}
