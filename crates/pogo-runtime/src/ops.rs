//! Builtin operations
//!
//! The closed set of operation kinds the capture layer can defer, plus the
//! concrete evaluators that run once operands are resolved. Dispatch goes
//! through a static table built into the binary and indexed by operation
//! kind — never patched per instance.
//!
//! Binary evaluation is an explicit two-step dispatch: the left operand's
//! handler is consulted first; if it does not handle the operand pair, the
//! right operand's reflected handler gets a chance before the pair is
//! rejected as a type error.

use crate::call::Args;
use crate::value::{RuntimeError, Value};
use ordered_float::OrderedFloat;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Closed operation-kind enumeration.
///
/// Resolution triggering and deferral construction are engine entry points,
/// deliberately absent from this set — capture can never intercept them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Abs,
    /// Numeric conversion
    ToNumber,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Boolean conversion
    ToBool,
    /// Hash conversion
    HashOf,
    // Container access
    Len,
    Index,
    IndexSet,
    IndexDelete,
    Contains,
    Iter,
    /// Invocation of the eventual resolution
    Call,
    // Context scope
    ScopeEnter,
    ScopeExit,
    // Projection by declared field name
    Field,
    FieldDelete,
    /// String conversion
    ToStr,
}

impl OpKind {
    /// The static table entry for this kind.
    pub(crate) fn builtin(self) -> &'static BuiltinOp {
        &OP_TABLE[self as usize]
    }

    /// Stable operation name (used in diagnostics and rendering).
    pub fn name(self) -> &'static str {
        self.builtin().name
    }
}

/// Argument-count contract of a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    AtLeast(usize),
}

/// One row of the static dispatch table.
pub(crate) struct BuiltinOp {
    pub(crate) kind: OpKind,
    pub(crate) name: &'static str,
    pub(crate) arity: Arity,
}

/// Static dispatch table, indexed by `OpKind as usize`. Built once into the
/// binary, never mutated.
static OP_TABLE: [BuiltinOp; 28] = [
    BuiltinOp { kind: OpKind::Add, name: "add", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Sub, name: "sub", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Mul, name: "mul", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Div, name: "div", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Rem, name: "rem", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Neg, name: "neg", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Abs, name: "abs", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::ToNumber, name: "to_number", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Eq, name: "eq", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Ne, name: "ne", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Lt, name: "lt", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Le, name: "le", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Gt, name: "gt", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Ge, name: "ge", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::ToBool, name: "to_bool", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::HashOf, name: "hash", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Len, name: "len", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Index, name: "index", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::IndexSet, name: "index_set", arity: Arity::Exact(3) },
    BuiltinOp { kind: OpKind::IndexDelete, name: "index_delete", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Contains, name: "contains", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::Iter, name: "iter", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Call, name: "call", arity: Arity::AtLeast(1) },
    BuiltinOp { kind: OpKind::ScopeEnter, name: "scope_enter", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::ScopeExit, name: "scope_exit", arity: Arity::Exact(1) },
    BuiltinOp { kind: OpKind::Field, name: "field", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::FieldDelete, name: "field_delete", arity: Arity::Exact(2) },
    BuiltinOp { kind: OpKind::ToStr, name: "to_str", arity: Arity::Exact(1) },
];

/// Evaluate a builtin operation against concrete operands.
///
/// Deferred operands are not special-cased here: a deferred value reaching a
/// concrete evaluator falls through every handler and surfaces as a type
/// error (this is what the basic resolver's unsupported nested usage runs
/// into).
pub(crate) fn eval(kind: OpKind, args: &Args) -> Result<Value, RuntimeError> {
    let builtin = kind.builtin();
    match builtin.arity {
        Arity::Exact(n) if args.len() != n => {
            return Err(RuntimeError::ArityMismatch {
                name: builtin.name.to_string(),
                expected: n,
                got: args.len(),
            });
        }
        Arity::AtLeast(n) if args.len() < n => {
            return Err(RuntimeError::ArityMismatch {
                name: builtin.name.to_string(),
                expected: n,
                got: args.len(),
            });
        }
        _ => {}
    }

    match kind {
        OpKind::Add
        | OpKind::Sub
        | OpKind::Mul
        | OpKind::Div
        | OpKind::Rem
        | OpKind::Eq
        | OpKind::Ne
        | OpKind::Lt
        | OpKind::Le
        | OpKind::Gt
        | OpKind::Ge
        | OpKind::Contains => eval_binary(kind, args.value(0)?, args.value(1)?),
        OpKind::Neg
        | OpKind::Abs
        | OpKind::ToNumber
        | OpKind::ToBool
        | OpKind::HashOf
        | OpKind::Len
        | OpKind::Iter
        | OpKind::ScopeEnter
        | OpKind::ScopeExit
        | OpKind::ToStr => eval_unary(kind, args.value(0)?),
        OpKind::Index => eval_index(args.value(0)?, args.value(1)?),
        OpKind::IndexSet => eval_index_set(args.value(0)?, args.value(1)?, args.value(2)?),
        OpKind::IndexDelete => eval_index_delete(args.value(0)?, args.value(1)?),
        OpKind::Field => eval_field(args.value(0)?, args.value(1)?),
        OpKind::FieldDelete => eval_field_delete(args.value(0)?, args.value(1)?),
        OpKind::Call => eval_call(args),
    }
}

/// Binary evaluation: left handler, then the right operand's reflected
/// handler, then rejection.
pub(crate) fn eval_binary(kind: OpKind, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    // Structural equality is defined for every operand pair.
    match kind {
        OpKind::Eq => return Ok(Value::Bool(lhs == rhs)),
        OpKind::Ne => return Ok(Value::Bool(lhs != rhs)),
        _ => {}
    }

    if let Some(result) = binary_handler(lhs, kind, rhs) {
        return result;
    }
    if let Some(result) = reflected_handler(rhs, kind, lhs) {
        return result;
    }
    Err(RuntimeError::TypeError {
        msg: format!(
            "unsupported operand types for {}: {} and {}",
            kind.name(),
            lhs.type_name(),
            rhs.type_name()
        ),
    })
}

/// The left operand's handler. `None` means "this operand pair is not mine".
fn binary_handler(lhs: &Value, kind: OpKind, rhs: &Value) -> Option<Result<Value, RuntimeError>> {
    match (lhs, kind) {
        (Value::Number(a), OpKind::Add) => rhs_number(rhs).map(|b| numeric_result(a + b)),
        (Value::Number(a), OpKind::Sub) => rhs_number(rhs).map(|b| numeric_result(a - b)),
        (Value::Number(a), OpKind::Mul) => rhs_number(rhs).map(|b| numeric_result(a * b)),
        (Value::Number(a), OpKind::Div) => rhs_number(rhs).map(|b| {
            if b == 0.0 {
                Err(RuntimeError::DivideByZero)
            } else {
                numeric_result(a / b)
            }
        }),
        (Value::Number(a), OpKind::Rem) => rhs_number(rhs).map(|b| {
            if b == 0.0 {
                Err(RuntimeError::DivideByZero)
            } else {
                numeric_result(a % b)
            }
        }),
        (Value::Number(a), OpKind::Lt) => rhs_number(rhs).map(|b| Ok(Value::Bool(*a < b))),
        (Value::Number(a), OpKind::Le) => rhs_number(rhs).map(|b| Ok(Value::Bool(*a <= b))),
        (Value::Number(a), OpKind::Gt) => rhs_number(rhs).map(|b| Ok(Value::Bool(*a > b))),
        (Value::Number(a), OpKind::Ge) => rhs_number(rhs).map(|b| Ok(Value::Bool(*a >= b))),
        (Value::String(a), OpKind::Add) => match rhs {
            Value::String(b) => Some(Ok(Value::string(format!("{}{}", a, b)))),
            _ => None,
        },
        (Value::String(a), OpKind::Mul) => rhs_number(rhs).map(|n| repeat_string(a, n)),
        (Value::String(a), OpKind::Lt) => rhs_str(rhs).map(|b| Ok(Value::Bool(a.as_str() < b))),
        (Value::String(a), OpKind::Le) => rhs_str(rhs).map(|b| Ok(Value::Bool(a.as_str() <= b))),
        (Value::String(a), OpKind::Gt) => rhs_str(rhs).map(|b| Ok(Value::Bool(a.as_str() > b))),
        (Value::String(a), OpKind::Ge) => rhs_str(rhs).map(|b| Ok(Value::Bool(a.as_str() >= b))),
        (Value::String(a), OpKind::Contains) => rhs_str(rhs)
            .map(|needle| Ok(Value::Bool(a.contains(needle)))),
        (Value::Array(a), OpKind::Add) => match rhs {
            Value::Array(b) => {
                let mut joined = a.clone();
                joined.extend(b.iter().cloned());
                Some(Ok(Value::Array(joined)))
            }
            _ => None,
        },
        (Value::Array(a), OpKind::Contains) => {
            Some(Ok(Value::Bool(a.iter().any(|item| item == rhs))))
        }
        (Value::Map(m), OpKind::Contains) => match rhs {
            Value::String(key) => Some(Ok(Value::Bool(m.contains_key(key)))),
            _ => None,
        },
        _ => None,
    }
}

/// The right operand's reflected handler, consulted only when the left
/// operand's handler declined.
fn reflected_handler(rhs: &Value, kind: OpKind, lhs: &Value) -> Option<Result<Value, RuntimeError>> {
    match (rhs, kind) {
        // number * string repeats the string, whichever side the number is on
        (Value::String(s), OpKind::Mul) => match lhs {
            Value::Number(n) => Some(repeat_string(s, *n)),
            _ => None,
        },
        _ => None,
    }
}

fn rhs_number(rhs: &Value) -> Option<f64> {
    match rhs {
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

fn rhs_str(rhs: &Value) -> Option<&str> {
    match rhs {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Guard against NaN/Infinity escaping arithmetic.
fn numeric_result(n: f64) -> Result<Value, RuntimeError> {
    if n.is_nan() || n.is_infinite() {
        return Err(RuntimeError::InvalidNumericResult);
    }
    Ok(Value::Number(n))
}

fn repeat_string(s: &str, count: f64) -> Result<Value, RuntimeError> {
    if count.fract() != 0.0 || count < 0.0 {
        return Err(RuntimeError::TypeError {
            msg: "string repetition count must be a whole non-negative number".to_string(),
        });
    }
    Ok(Value::string(s.repeat(count as usize)))
}

fn eval_unary(kind: OpKind, operand: &Value) -> Result<Value, RuntimeError> {
    match kind {
        OpKind::Neg => Ok(Value::Number(-operand.as_number()?)),
        OpKind::Abs => Ok(Value::Number(operand.as_number()?.abs())),
        OpKind::ToNumber => match operand {
            Value::Number(n) => Ok(Value::Number(*n)),
            Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s.trim().parse::<f64>().map(Value::Number).map_err(|_| {
                RuntimeError::TypeError {
                    msg: format!("cannot parse '{}' as a number", s),
                }
            }),
            other => Err(RuntimeError::TypeError {
                msg: format!("cannot convert {} to number", other.type_name()),
            }),
        },
        OpKind::ToBool => match operand {
            // No implicit conversions: only bools convert to bool.
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(RuntimeError::TypeError {
                msg: format!("cannot convert {} to bool", other.type_name()),
            }),
        },
        OpKind::HashOf => {
            let key = HashKey::from_value(operand)?;
            // Folded to 53 bits so the result is an exactly representable
            // integer.
            Ok(Value::Number((compute_hash(&key) >> 11) as f64))
        }
        OpKind::Len => match operand {
            Value::Array(a) => Ok(Value::Number(a.len() as f64)),
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            Value::Map(m) => Ok(Value::Number(m.len() as f64)),
            other => Err(RuntimeError::TypeError {
                msg: format!("{} has no length", other.type_name()),
            }),
        },
        OpKind::Iter => match operand {
            Value::Array(a) => Ok(Value::Array(a.clone())),
            Value::String(s) => Ok(Value::Array(
                s.chars().map(|c| Value::string(c.to_string())).collect(),
            )),
            Value::Map(m) => {
                // Keys in sorted order so iteration is deterministic.
                let mut keys: Vec<&String> = m.keys().collect();
                keys.sort();
                Ok(Value::Array(
                    keys.into_iter().map(|k| Value::string(k.clone())).collect(),
                ))
            }
            other => Err(RuntimeError::TypeError {
                msg: format!("{} is not iterable", other.type_name()),
            }),
        },
        OpKind::ScopeEnter | OpKind::ScopeExit => Err(RuntimeError::TypeError {
            msg: format!("{} does not support scoped use", operand.type_name()),
        }),
        OpKind::ToStr => Ok(Value::string(operand.to_string())),
        _ => unreachable!("non-unary kind routed to eval_unary"),
    }
}

/// Validate a numeric index against a length (whole, non-negative, in
/// bounds).
fn checked_index(idx: &Value, len: usize) -> Result<usize, RuntimeError> {
    let n = match idx {
        Value::Number(n) => *n,
        _ => return Err(RuntimeError::InvalidIndex),
    };
    if n.fract() != 0.0 || n < 0.0 {
        return Err(RuntimeError::InvalidIndex);
    }
    let index = n as usize;
    if index >= len {
        return Err(RuntimeError::OutOfBounds { index, len });
    }
    Ok(index)
}

fn eval_index(target: &Value, idx: &Value) -> Result<Value, RuntimeError> {
    match target {
        Value::Array(arr) => {
            let index = checked_index(idx, arr.len())?;
            Ok(arr.as_slice()[index].clone())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let index = checked_index(idx, chars.len())?;
            Ok(Value::string(chars[index].to_string()))
        }
        Value::Map(m) => {
            let key = idx.as_str()?;
            m.get(key).cloned().ok_or_else(|| RuntimeError::UnknownField {
                name: key.to_string(),
            })
        }
        other => Err(RuntimeError::TypeError {
            msg: format!("cannot index {}", other.type_name()),
        }),
    }
}

/// Index assignment returns the updated container (value semantics).
fn eval_index_set(target: &Value, idx: &Value, value: &Value) -> Result<Value, RuntimeError> {
    match target {
        Value::Array(arr) => {
            let index = checked_index(idx, arr.len())?;
            let mut updated = arr.clone();
            updated.set(index, value.clone());
            Ok(Value::Array(updated))
        }
        Value::Map(m) => {
            let key = idx.as_str()?;
            let mut updated = m.clone();
            updated.insert(key.to_string(), value.clone());
            Ok(Value::Map(updated))
        }
        other => Err(RuntimeError::TypeError {
            msg: format!("cannot index {}", other.type_name()),
        }),
    }
}

/// Index deletion returns the container without the slot (value semantics).
fn eval_index_delete(target: &Value, idx: &Value) -> Result<Value, RuntimeError> {
    match target {
        Value::Array(arr) => {
            let index = checked_index(idx, arr.len())?;
            let mut updated = arr.clone();
            updated.remove(index);
            Ok(Value::Array(updated))
        }
        Value::Map(m) => {
            let key = idx.as_str()?;
            let mut updated = m.clone();
            if updated.remove(key).is_none() {
                return Err(RuntimeError::UnknownField {
                    name: key.to_string(),
                });
            }
            Ok(Value::Map(updated))
        }
        other => Err(RuntimeError::TypeError {
            msg: format!("cannot index {}", other.type_name()),
        }),
    }
}

fn eval_field(target: &Value, name: &Value) -> Result<Value, RuntimeError> {
    let name = name.as_str()?;
    let map = target.as_map()?;
    map.get(name).cloned().ok_or_else(|| RuntimeError::UnknownField {
        name: name.to_string(),
    })
}

fn eval_field_delete(target: &Value, name: &Value) -> Result<Value, RuntimeError> {
    let name = name.as_str()?;
    let map = target.as_map()?;
    let mut updated = map.clone();
    if updated.remove(name).is_none() {
        return Err(RuntimeError::UnknownField {
            name: name.to_string(),
        });
    }
    Ok(Value::Map(updated))
}

/// Invoke the callee (first slot) with the remaining arguments. The callee's
/// operation runs exactly once; a deferred return value is the resolver's
/// business, not ours.
fn eval_call(args: &Args) -> Result<Value, RuntimeError> {
    let callee = args.value(0)?;
    match callee {
        Value::Function(func) => {
            let mut call_args = Args::from_positional(args.positional()[1..].iter().cloned());
            for (name, value) in args.named() {
                call_args = call_args.with_named(name.clone(), value.clone());
            }
            func.invoke_once(&call_args)
        }
        other => Err(RuntimeError::TypeError {
            msg: format!("cannot call {}", other.type_name()),
        }),
    }
}

/// Wrapper type for hashable values.
///
/// Only Number, String, Bool, Null can be hashed; containers, functions and
/// deferred calls cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HashKey {
    /// Number value with IEEE 754 canonicalization
    Number(OrderedFloat<f64>),
    String(Arc<String>),
    Bool(bool),
    Null,
}

impl HashKey {
    fn from_value(value: &Value) -> Result<Self, RuntimeError> {
        match value {
            Value::Number(n) => {
                // Canonicalize NaN so all NaN values hash alike.
                let normalized = if n.is_nan() { f64::NAN } else { *n };
                Ok(HashKey::Number(OrderedFloat(normalized)))
            }
            Value::String(s) => Ok(HashKey::String(Arc::clone(s))),
            Value::Bool(b) => Ok(HashKey::Bool(*b)),
            Value::Null => Ok(HashKey::Null),
            _ => Err(RuntimeError::UnhashableType {
                type_name: value.type_name().to_string(),
            }),
        }
    }
}

/// Deterministic hash for a HashKey (DefaultHasher, reproducible within a
/// build).
fn compute_hash(key: &HashKey) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
