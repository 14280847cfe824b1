//! Deferred calls and their argument store
//!
//! A `DeferredCall` is an immutable record of "invoke this operation with
//! these arguments, later". Its arguments live in an [`Args`] store that
//! exposes one index-stable combined view — positional arguments first, then
//! named arguments in insertion order — which is what the nested resolver
//! scans and splices through.

use crate::feature_set::FeatureSet;
use crate::ops::BuiltinOp;
use crate::tail_fn::TailFn;
use crate::value::{RuntimeError, Value};
use std::fmt;

/// Positional and named arguments of a single call.
///
/// The combined view is index-stable: indices `0..positional_len` address
/// positional arguments, indices `positional_len..len` address named
/// arguments in the order they were added. Resolved sub-results are spliced
/// back through this view without disturbing any other slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positional(values: impl IntoIterator<Item = Value>) -> Self {
        Args {
            positional: values.into_iter().collect(),
            named: Vec::new(),
        }
    }

    /// Builder-style named argument. Insertion order is preserved and is
    /// part of the combined view's index assignment.
    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.push((name.into(), value));
        self
    }

    /// Builder-style positional argument.
    pub fn with_positional(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    /// Length of the combined view.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &[(String, Value)] {
        &self.named
    }

    /// Get by combined index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        if index < self.positional.len() {
            self.positional.get(index)
        } else {
            self.named.get(index - self.positional.len()).map(|(_, v)| v)
        }
    }

    /// Overwrite the slot at a combined index. Returns false if out of range.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        if index < self.positional.len() {
            self.positional[index] = value;
            true
        } else if let Some(slot) = self.named.get_mut(index - self.positional.len()) {
            slot.1 = value;
            true
        } else {
            false
        }
    }

    /// Move the value out of a slot, leaving `Null` behind. The caller is
    /// expected to overwrite the slot before it is read again.
    pub fn take(&mut self, index: usize) -> Option<Value> {
        if index < self.positional.len() {
            Some(std::mem::replace(&mut self.positional[index], Value::Null))
        } else {
            self.named
                .get_mut(index - self.positional.len())
                .map(|slot| std::mem::replace(&mut slot.1, Value::Null))
        }
    }

    /// Look up a named argument by name.
    pub fn named_value(&self, name: &str) -> Option<&Value> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Required argument at a combined index.
    pub fn value(&self, index: usize) -> Result<&Value, RuntimeError> {
        self.get(index)
            .ok_or(RuntimeError::MissingArgument { index })
    }

    /// Required numeric argument at a combined index.
    pub fn number(&self, index: usize) -> Result<f64, RuntimeError> {
        self.value(index)?.as_number()
    }

    /// Numeric argument with a default when the slot is absent.
    pub fn number_or(&self, index: usize, default: f64) -> Result<f64, RuntimeError> {
        match self.get(index) {
            Some(v) => v.as_number(),
            None => Ok(default),
        }
    }

    /// Iterate the combined view in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.positional
            .iter()
            .chain(self.named.iter().map(|(_, v)| v))
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args::from_positional(values)
    }
}

impl<const N: usize> From<[Value; N]> for Args {
    fn from(values: [Value; N]) -> Self {
        Args::from_positional(values)
    }
}

impl fmt::Display for Args {
    /// `<arg1>, <arg2>, ..., <name>=<val>, ...` — original order, each value
    /// in its standard display form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}", value)?;
        }
        for (name, value) in &self.named {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// What a deferred call will invoke: always a concrete invocable, never a
/// proxy or another deferred indirection.
#[derive(Clone)]
pub(crate) enum Target {
    /// A user definition.
    Defined(TailFn),
    /// An entry of the static builtin-operation table (operator capture).
    Builtin(&'static BuiltinOp),
}

impl Target {
    fn name(&self) -> &str {
        match self {
            Target::Defined(f) => f.name(),
            Target::Builtin(b) => b.name,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Defined(func) => write!(f, "{}", func),
            Target::Builtin(b) => write!(f, "<builtin {}>", b.name),
        }
    }
}

/// A recorded intention to invoke an operation with specific arguments.
///
/// Created per deferred call-site activation, consumed when its resolution
/// frame is popped and invoked. Resolution never shares state across
/// concurrent top-level resolutions.
#[derive(Clone)]
pub struct DeferredCall {
    target: Target,
    args: Args,
    feature_set: FeatureSet,
}

impl DeferredCall {
    pub(crate) fn new(target: Target, args: Args, feature_set: FeatureSet) -> Self {
        DeferredCall {
            target,
            args,
            feature_set,
        }
    }

    /// Record a builtin operation applied to the given operands (operator
    /// capture). Capture-produced calls always carry the full feature set.
    pub(crate) fn builtin(op: &'static BuiltinOp, args: Args) -> Self {
        DeferredCall::new(Target::Builtin(op), args, FeatureSet::Full)
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub(crate) fn args_mut(&mut self) -> &mut Args {
        &mut self.args
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    /// Name of the operation this call will invoke.
    pub fn target_name(&self) -> &str {
        self.target.name()
    }

    /// Run the target operation once against the current arguments.
    ///
    /// Arguments are handed over as they are — the caller (a resolver) is
    /// responsible for having resolved them first, or for accepting whatever
    /// the operation does with a deferred argument.
    pub(crate) fn invoke(&self) -> Result<Value, RuntimeError> {
        match &self.target {
            Target::Defined(func) => func.invoke_once(&self.args),
            Target::Builtin(b) => crate::ops::eval(b.kind, &self.args),
        }
    }

    /// Drive this call to a concrete value.
    ///
    /// The resolver is chosen by the call's feature set: nested-resolution
    /// feature sets get the stack machine, the rest get the plain trampoline.
    pub fn resolve(self) -> Result<Value, RuntimeError> {
        crate::resolver::resolve(self)
    }
}

impl PartialEq for DeferredCall {
    /// Two recorded calls are equal when they would invoke the same-named
    /// operation with equal arguments.
    fn eq(&self, other: &Self) -> bool {
        self.target.name() == other.target.name() && self.args == other.args
    }
}

impl fmt::Display for DeferredCall {
    /// Pinned diagnostic rendering:
    /// `<wrapper-repr>.defer(<arg1>, <arg2>, ..., <name>=<val>, ...)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.defer({})", self.target, self.args)
    }
}

impl fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredCall({})", self)
    }
}
