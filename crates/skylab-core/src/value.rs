// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Value representation for module exports.
//!
//! Exports are dynamically typed: a module may export a plain object, an
//! array, a string, or a host-provided function. Objects and arrays are
//! shared by reference, so every consumer of a cached module observes the
//! same underlying data.

use crate::error::Result;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A shared, mutable, string-keyed object.
///
/// Cloning an `ObjectRef` yields another handle to the same underlying
/// object. Module exports rely on this: every `require` of a cached module
/// returns a handle to the identical object.
#[derive(Debug, Clone, Default)]
pub struct ObjectRef(Arc<RwLock<FxHashMap<String, Value>>>);

impl ObjectRef {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.write().insert(key.into(), value);
    }

    /// Returns true if a value is stored under `key`.
    pub fn has(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns the property names, in arbitrary order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Returns true if both handles refer to the same underlying object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A shared, mutable array of values.
#[derive(Debug, Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    /// Creates a new empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the element at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Appends `value` to the end of the array.
    pub fn push(&self, value: Value) {
        self.0.write().push(value);
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns a snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Returns true if both handles refer to the same underlying array.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A host-provided callable value.
#[derive(Clone)]
pub struct FunctionRef {
    name: Option<String>,
    body: Arc<NativeFn>,
}

impl FunctionRef {
    /// Creates an anonymous function from a closure.
    pub fn new(body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            name: None,
            body: Arc::new(body),
        }
    }

    /// Creates a named function from a closure.
    pub fn named(
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Some(name.into()),
            body: Arc::new(body),
        }
    }

    /// Returns the function name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invokes the function with the given arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.body)(args)
    }

    /// Returns true if both handles refer to the same underlying function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A module export value.
///
/// Values are thread-safe and can be shared freely between module trees
/// and host threads.
#[derive(Debug, Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array reference
    Array(ArrayRef),
    /// Object reference
    Object(ObjectRef),
    /// Function reference
    Function(FunctionRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                // Handle NaN comparisons
                if a.is_nan() && b.is_nan() {
                    false
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the string contents if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value if this value is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the object handle if this value is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns the array handle if this value is an array.
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Converts a parsed JSON document into a value.
    ///
    /// JSON objects become [`ObjectRef`]s and JSON arrays become
    /// [`ArrayRef`]s; each call produces fresh references.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => {
                let out = ArrayRef::new();
                for item in arr {
                    out.push(Value::from_json(item));
                }
                Value::Array(out)
            }
            serde_json::Value::Object(obj) => {
                let out = ObjectRef::new();
                for (key, item) in obj {
                    out.set(key.clone(), Value::from_json(item));
                }
                Value::Object(out)
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(arr) => write!(f, "[Array({})]", arr.len()),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(func) => {
                if let Some(name) = func.name() {
                    write!(f, "[Function: {}]", name)
                } else {
                    write!(f, "[Function (anonymous)]")
                }
            }
        }
    }
}
