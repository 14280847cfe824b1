//! Operator capture
//!
//! Applying an operation to an unresolved deferred call cannot execute
//! anything, so these operator methods record the operation instead: the
//! result is a new deferred call meaning "apply this operation to
//! [self, operands...] once self resolves". Operands are inspected
//! left-to-right — the same order as concrete handler-then-reflected
//! dispatch — and the first deferred operand whose feature set enables
//! capture claims the operation. A deferred operand without capture anywhere
//! in the operand list fails at construction, before any resolver runs.
//!
//! With no deferred operand at all, the operation evaluates immediately
//! through the static builtin table.

use crate::call::{Args, DeferredCall};
use crate::feature_set::FeatureSet;
use crate::ops::{self, OpKind};
use crate::value::{RuntimeError, Value};

/// Capture-or-evaluate for one recorded operation.
fn apply(kind: OpKind, args: Args) -> Result<Value, RuntimeError> {
    let mut first_deferred: Option<FeatureSet> = None;
    let mut captures = false;
    for value in args.iter() {
        if let Value::Deferred(call) = value {
            let feature_set = call.feature_set();
            if first_deferred.is_none() {
                first_deferred = Some(feature_set);
            }
            if feature_set.captures_operators() {
                captures = true;
                break;
            }
        }
    }
    match (first_deferred, captures) {
        (None, _) => ops::eval(kind, &args),
        (Some(_), true) => Ok(Value::Deferred(Box::new(DeferredCall::builtin(
            kind.builtin(),
            args,
        )))),
        (Some(feature_set), false) => Err(RuntimeError::TypeError {
            msg: format!(
                "operator '{}' applied to a deferred call, but feature set '{}' does not enable operator capture",
                kind.name(),
                feature_set
            ),
        }),
    }
}

fn binary(kind: OpKind, lhs: &Value, rhs: &Value) -> Result<Value, RuntimeError> {
    apply(kind, Args::from_positional(vec![lhs.clone(), rhs.clone()]))
}

fn unary(kind: OpKind, operand: &Value) -> Result<Value, RuntimeError> {
    apply(kind, Args::from_positional(vec![operand.clone()]))
}

impl Value {
    // Arithmetic

    pub fn add(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Add, self, rhs)
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Sub, self, rhs)
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Mul, self, rhs)
    }

    pub fn div(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Div, self, rhs)
    }

    pub fn rem(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Rem, self, rhs)
    }

    pub fn neg(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::Neg, self)
    }

    pub fn abs(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::Abs, self)
    }

    /// Numeric conversion of the value (or of the eventual resolution).
    pub fn to_number(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::ToNumber, self)
    }

    // Comparison

    pub fn equals(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Eq, self, rhs)
    }

    pub fn not_equals(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Ne, self, rhs)
    }

    pub fn less_than(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Lt, self, rhs)
    }

    pub fn less_equal(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Le, self, rhs)
    }

    pub fn greater_than(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Gt, self, rhs)
    }

    pub fn greater_equal(&self, rhs: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Ge, self, rhs)
    }

    // Conversions

    pub fn to_bool(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::ToBool, self)
    }

    pub fn hash_value(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::HashOf, self)
    }

    /// String conversion (standard display form of the eventual resolution).
    pub fn stringify(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::ToStr, self)
    }

    // Container access

    pub fn length(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::Len, self)
    }

    pub fn index(&self, idx: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Index, self, idx)
    }

    pub fn index_set(&self, idx: &Value, value: &Value) -> Result<Value, RuntimeError> {
        apply(
            OpKind::IndexSet,
            Args::from_positional(vec![self.clone(), idx.clone(), value.clone()]),
        )
    }

    pub fn index_delete(&self, idx: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::IndexDelete, self, idx)
    }

    pub fn contains(&self, needle: &Value) -> Result<Value, RuntimeError> {
        binary(OpKind::Contains, self, needle)
    }

    /// Materialize the elements of the value (or of the eventual
    /// resolution).
    pub fn iterate(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::Iter, self)
    }

    // Invocation

    /// Call the value (or the eventual resolution) with the given
    /// arguments.
    pub fn call_with(&self, args: impl Into<Args>) -> Result<Value, RuntimeError> {
        let args = args.into();
        let mut combined = Args::from_positional(
            std::iter::once(self.clone()).chain(args.positional().iter().cloned()),
        );
        for (name, value) in args.named() {
            combined = combined.with_named(name.clone(), value.clone());
        }
        apply(OpKind::Call, combined)
    }

    // Context scope

    pub fn scope_enter(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::ScopeEnter, self)
    }

    pub fn scope_exit(&self) -> Result<Value, RuntimeError> {
        unary(OpKind::ScopeExit, self)
    }

    // Projection

    /// Field of the eventual resolution, by declared field name.
    pub fn field(&self, name: &str) -> Result<Value, RuntimeError> {
        binary(OpKind::Field, self, &Value::string(name))
    }

    pub fn field_delete(&self, name: &str) -> Result<Value, RuntimeError> {
        binary(OpKind::FieldDelete, self, &Value::string(name))
    }
}
