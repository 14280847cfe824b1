//! Runtime value representation
//!
//! Shared value representation for the whole engine.
//! - Numbers, Bools, Null: Immediate values (stack-allocated)
//! - Strings: Heap-allocated, reference-counted (Arc<String>), immutable
//! - Arrays: Copy-on-write (ValueArray wrapping Arc<Vec<Value>>), value semantics
//! - Maps: Copy-on-write string-keyed records (ValueMap), the projection target
//!   for deferred field access
//! - Functions: References to `TailFn` definitions, callable through capture
//! - Deferred: A recorded call that has not run yet (the recursive arm of the
//!   value union)

use crate::call::DeferredCall;
use crate::tail_fn::TailFn;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Copy-on-write array. Cheap to clone (refcount bump).
/// Mutations on a shared array clone the inner Vec first (Arc::make_mut).
#[derive(Clone, Debug)]
pub struct ValueArray(Arc<Vec<Value>>);

impl ValueArray {
    pub fn new() -> Self {
        ValueArray(Arc::new(Vec::new()))
    }

    pub fn from_vec(v: Vec<Value>) -> Self {
        ValueArray(Arc::new(v))
    }

    /// Read access — no clone needed.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get element by index — returns reference into inner Vec.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Mutating access — triggers CoW if Arc is shared.
    pub fn push(&mut self, value: Value) {
        Arc::make_mut(&mut self.0).push(value);
    }

    pub fn set(&mut self, index: usize, value: Value) -> bool {
        let inner = Arc::make_mut(&mut self.0);
        if index < inner.len() {
            inner[index] = value;
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, index: usize) -> Value {
        Arc::make_mut(&mut self.0).remove(index)
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = Value>) {
        Arc::make_mut(&mut self.0).extend(iter);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl Default for ValueArray {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ValueArray {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl From<Vec<Value>> for ValueArray {
    fn from(v: Vec<Value>) -> Self {
        ValueArray::from_vec(v)
    }
}

impl FromIterator<Value> for ValueArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ValueArray(Arc::new(iter.into_iter().collect()))
    }
}

/// Copy-on-write string-keyed map. Cheap to clone (refcount bump).
/// Mutations clone the inner HashMap if shared (Arc::make_mut).
///
/// This is the "declared projectable fields" target: deferred field access
/// (`Field` / `FieldDelete`) projects by key into one of these.
#[derive(Clone, Debug, Default)]
pub struct ValueMap(Arc<HashMap<String, Value>>);

impl ValueMap {
    pub fn new() -> Self {
        ValueMap(Arc::new(HashMap::new()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: String, value: Value) {
        Arc::make_mut(&mut self.0).insert(key, value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        Arc::make_mut(&mut self.0).remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> std::collections::hash_map::Keys<'_, String, Value> {
        self.0.keys()
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl From<HashMap<String, Value>> for ValueMap {
    fn from(m: HashMap<String, Value>) -> Self {
        ValueMap(Arc::new(m))
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        ValueMap(Arc::new(iter.into_iter().collect()))
    }
}

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    /// Numeric value (IEEE 754 double-precision)
    Number(f64),
    /// String value (reference-counted, immutable)
    String(Arc<String>),
    /// Boolean value
    Bool(bool),
    /// Null value
    Null,
    /// Array value (copy-on-write, value semantics)
    Array(ValueArray),
    /// Map value (copy-on-write, string-keyed)
    Map(ValueMap),
    /// First-class reference to a definition (callable through capture)
    Function(TailFn),
    /// A deferred call — recorded, not yet executed
    Deferred(Box<DeferredCall>),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Create a new array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(ValueArray::from_vec(values))
    }

    /// Create a new map value from key/value pairs
    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Deferred(_) => "deferred call",
        }
    }

    /// True if this value is a deferred call that has not been resolved.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// Narrow to a number, or fail with a type error naming what was found.
    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::TypeError {
                msg: format!("expected number, got {}", other.type_name()),
            }),
        }
    }

    /// Narrow to a string slice.
    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(s) => Ok(s.as_str()),
            other => Err(RuntimeError::TypeError {
                msg: format!("expected string, got {}", other.type_name()),
            }),
        }
    }

    /// Narrow to a bool.
    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::TypeError {
                msg: format!("expected bool, got {}", other.type_name()),
            }),
        }
    }

    /// Narrow to an array.
    pub fn as_array(&self) -> Result<&ValueArray, RuntimeError> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(RuntimeError::TypeError {
                msg: format!("expected array, got {}", other.type_name()),
            }),
        }
    }

    /// Narrow to a map.
    pub fn as_map(&self) -> Result<&ValueMap, RuntimeError> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(RuntimeError::TypeError {
                msg: format!("expected map, got {}", other.type_name()),
            }),
        }
    }
}

impl From<DeferredCall> for Value {
    fn from(call: DeferredCall) -> Self {
        Value::Deferred(Box::new(call))
    }
}

impl PartialEq for Value {
    /// Equality contract:
    ///
    /// **Value types** (content equality — two equal values may be different
    /// allocations): Number, String, Bool, Null, Array, Map.
    ///
    /// **Reference-ish types**:
    /// - Function: compared by definition name (closures have no content
    ///   equality)
    /// - Deferred: same target name and equal arguments — two separately
    ///   recorded calls to the same operation with the same arguments are
    ///   the same pending work
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.name() == b.name(),
            (Value::Deferred(a), Value::Deferred(b)) => a == b,
            // Different variants are never equal
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // Format number nicely (no trailing .0 for whole numbers)
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s.as_ref()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(arr) => {
                let elements: Vec<String> = arr.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Map(map) => write!(f, "<map size={}>", map.len()),
            Value::Function(func) => write!(f, "{}", func),
            Value::Deferred(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Null => write!(f, "Null"),
            Value::Array(arr) => write!(f, "Array({:?})", arr.as_slice()),
            Value::Map(map) => write!(f, "Map(size={})", map.len()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Deferred(call) => write!(f, "Deferred({})", call),
        }
    }
}

/// Runtime error type
///
/// Operation failures propagate unchanged through the resolver loop: the
/// engine never wraps them, and a failed resolution returns no partial
/// result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    /// Unrecognized feature-set token at definition time
    #[error("Invalid feature set: '{token}' (expected base, nested, capture, or full)")]
    InvalidConfiguration { token: String },
    /// Type error
    #[error("Type error: {msg}")]
    TypeError { msg: String },
    /// Division by zero
    #[error("Division by zero")]
    DivideByZero,
    /// Invalid numeric result (NaN, Infinity)
    #[error("Invalid numeric result")]
    InvalidNumericResult,
    /// Array index out of bounds
    #[error("Index out of bounds: {index} (len {len})")]
    OutOfBounds { index: usize, len: usize },
    /// Invalid index (non-integer or negative)
    #[error("Invalid index: expected a whole non-negative number")]
    InvalidIndex,
    /// Missing map field
    #[error("Unknown field: {name}")]
    UnknownField { name: String },
    /// Unhashable type
    #[error("Cannot hash type {type_name} - only number, string, bool, null are hashable")]
    UnhashableType { type_name: String },
    /// Builtin operation invoked with the wrong number of arguments
    #[error("{name} expects {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Argument access past the end of the combined argument view
    #[error("Missing argument at position {index}")]
    MissingArgument { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_creation() {
        let val = Value::Number(42.0);
        assert_eq!(val.to_string(), "42");
    }

    #[test]
    fn test_string_value() {
        let val = Value::string("hello");
        assert_eq!(val.to_string(), "hello");
    }

    #[test]
    fn test_array_display() {
        let val = Value::array(vec![Value::Number(1.0), Value::string("a")]);
        assert_eq!(val.to_string(), "[1, a]");
    }

    #[test]
    fn test_array_cow() {
        let mut a = ValueArray::from_vec(vec![Value::Number(1.0)]);
        let b = a.clone();
        a.push(Value::Number(2.0));
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_map_cow() {
        let mut a = ValueMap::new();
        a.insert("x".to_string(), Value::Number(1.0));
        let b = a.clone();
        a.insert("y".to_string(), Value::Number(2.0));
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_as_number_type_error() {
        let err = Value::string("nope").as_number().unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeError {
                msg: "expected number, got string".to_string()
            }
        );
    }

    #[test]
    fn test_cross_variant_inequality() {
        assert_ne!(Value::Number(0.0), Value::Null);
        assert_ne!(Value::Bool(false), Value::Number(0.0));
    }
}
