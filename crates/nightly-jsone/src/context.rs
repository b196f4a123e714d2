//! Render context: JSON data plus caller-supplied helper functions.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{RenderError, Result};

/// A function a template may call, such as `as_slugid('decision')`.
///
/// Helpers receive already-evaluated arguments. They may keep interior
/// state, but only for the lifetime of the render call that owns them.
pub trait Helper {
    fn call(&self, args: &[Value]) -> Result<Value>;
}

impl<F> Helper for F
where
    F: Fn(&[Value]) -> Result<Value>,
{
    fn call(&self, args: &[Value]) -> Result<Value> {
        self(args)
    }
}

/// What a name resolves to in a context.
pub enum Binding<'c> {
    Value(&'c Value),
    Helper(&'c dyn Helper),
}

/// A scope of names visible to expressions.
///
/// `$let`, `$map` and `$sort` push child scopes; lookups walk outwards so
/// inner names shadow outer ones.
pub struct Context<'a> {
    values: Map<String, Value>,
    helpers: HashMap<String, &'a dyn Helper>,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    pub fn new(values: Map<String, Value>) -> Self {
        Context {
            values,
            helpers: HashMap::new(),
            parent: None,
        }
    }

    /// Build a context from a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self::new(values)),
            other => Err(RenderError::template(format!(
                "context must be an object, got {}",
                crate::value::type_name(&other)
            ))),
        }
    }

    /// Register a helper function under `name`.
    pub fn with_helper(mut self, name: impl Into<String>, helper: &'a dyn Helper) -> Self {
        self.helpers.insert(name.into(), helper);
        self
    }

    pub fn child<'b>(&'b self, values: Map<String, Value>) -> Context<'b> {
        Context {
            values,
            helpers: HashMap::new(),
            parent: Some(self),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Binding<'_>> {
        if let Some(value) = self.values.get(name) {
            return Some(Binding::Value(value));
        }
        if let Some(helper) = self.helpers.get(name) {
            return Some(Binding::Helper(*helper));
        }
        self.parent.and_then(|parent| parent.resolve(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        match self.resolve(name)? {
            Binding::Value(value) => Some(value),
            Binding::Helper(_) => None,
        }
    }
}
