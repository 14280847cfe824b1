//! Definition surface
//!
//! A `TailFn` wraps an operation so call sites can either run it to
//! completion (`call`) or record the invocation for later (`defer`).
//! Returning a deferred call from a tail position is what keeps host
//! recursion flat: the resolver loops instead of the stack growing.

use crate::call::{Args, DeferredCall, Target};
use crate::feature_set::FeatureSet;
use crate::value::{RuntimeError, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Operation type wrapped by a definition.
///
/// Operations receive the argument store and return either a concrete value
/// or a deferred call (as `Value::Deferred`) describing the next step. Arc
/// provides thread safety and cheap cloning for sharing definitions across
/// resolutions.
pub type NativeOp = Arc<dyn Fn(&Args) -> Result<Value, RuntimeError> + Send + Sync>;

struct Inner {
    name: String,
    feature_set: FeatureSet,
    op: NativeOp,
}

/// A deferred-call-producing definition.
///
/// Cloning is cheap (refcount bump); clones share the wrapped operation.
/// Every resolution triggered through a clone owns its own resolution
/// state, so the same definition may be resolved concurrently from
/// independent threads.
///
/// # Examples
///
/// ```
/// use pogo_runtime::{TailFn, Value};
///
/// let factorial = TailFn::recursive("factorial", |this, args| {
///     let n = args.number(0)?;
///     let acc = args.number_or(1, 1.0)?;
///     if n <= 1.0 {
///         Ok(Value::Number(acc))
///     } else {
///         Ok(this.defer([Value::Number(n - 1.0), Value::Number(n * acc)]).into())
///     }
/// });
///
/// assert_eq!(factorial.call([Value::Number(5.0)]).unwrap(), Value::Number(120.0));
/// ```
#[derive(Clone)]
pub struct TailFn(Arc<Inner>);

impl TailFn {
    /// Define an operation with the full feature set (nested resolution and
    /// operator capture).
    pub fn new(
        name: impl Into<String>,
        op: impl Fn(&Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        Self::with_feature_set(name, FeatureSet::Full, op)
    }

    /// Define an operation with an explicit feature set.
    pub fn with_feature_set(
        name: impl Into<String>,
        feature_set: FeatureSet,
        op: impl Fn(&Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        debug!(name = %name, feature_set = %feature_set, "tail fn defined");
        TailFn(Arc::new(Inner {
            name,
            feature_set,
            op: Arc::new(op),
        }))
    }

    /// Define an operation from a feature-set name string.
    ///
    /// The token is validated here, at definition time: an unrecognized
    /// name fails immediately with `InvalidConfiguration` and never
    /// survives to call time.
    pub fn with_feature_set_str(
        name: impl Into<String>,
        feature_set: &str,
        op: impl Fn(&Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Result<Self, RuntimeError> {
        let feature_set = feature_set.parse::<FeatureSet>()?;
        Ok(Self::with_feature_set(name, feature_set, op))
    }

    /// Define a self-referential operation with the full feature set.
    ///
    /// The operation receives a handle to its own definition, so a tail
    /// position can defer to itself:
    ///
    /// ```
    /// use pogo_runtime::{TailFn, Value};
    ///
    /// let countdown = TailFn::recursive("countdown", |this, args| {
    ///     let n = args.number(0)?;
    ///     if n <= 0.0 {
    ///         Ok(Value::Null)
    ///     } else {
    ///         Ok(this.defer([Value::Number(n - 1.0)]).into())
    ///     }
    /// });
    /// assert_eq!(countdown.call([Value::Number(100_000.0)]).unwrap(), Value::Null);
    /// ```
    pub fn recursive(
        name: impl Into<String>,
        op: impl Fn(&TailFn, &Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        Self::recursive_with_feature_set(name, FeatureSet::Full, op)
    }

    /// Define a self-referential operation with an explicit feature set.
    pub fn recursive_with_feature_set(
        name: impl Into<String>,
        feature_set: FeatureSet,
        op: impl Fn(&TailFn, &Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        debug!(name = %name, feature_set = %feature_set, "tail fn defined");
        TailFn(Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            Inner {
                name,
                feature_set,
                op: Arc::new(move |args: &Args| {
                    // Invocation always goes through a live handle, which
                    // keeps the definition alive for the upgrade.
                    let this = TailFn(weak.upgrade().expect("definition dropped mid-invocation"));
                    op(&this, args)
                }),
            }
        }))
    }

    /// Define a self-referential operation from a feature-set name string,
    /// validated immediately.
    pub fn recursive_with_feature_set_str(
        name: impl Into<String>,
        feature_set: &str,
        op: impl Fn(&TailFn, &Args) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Result<Self, RuntimeError> {
        let feature_set = feature_set.parse::<FeatureSet>()?;
        Ok(Self::recursive_with_feature_set(name, feature_set, op))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.0.feature_set
    }

    /// Record a call without resolving it. This is the tail-position
    /// mechanism: return the deferred call instead of recursing.
    pub fn defer(&self, args: impl Into<Args>) -> DeferredCall {
        DeferredCall::new(
            Target::Defined(self.clone()),
            args.into(),
            self.0.feature_set,
        )
    }

    /// Call the operation and drive it to a concrete value. Equivalent to
    /// `defer(args).resolve()`.
    pub fn call(&self, args: impl Into<Args>) -> Result<Value, RuntimeError> {
        self.defer(args).resolve()
    }

    /// Run the wrapped operation exactly once, without resolving its
    /// result.
    pub(crate) fn invoke_once(&self, args: &Args) -> Result<Value, RuntimeError> {
        (self.0.op)(args)
    }
}

impl PartialEq for TailFn {
    /// Definitions compare by name (operations have no content equality).
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl fmt::Display for TailFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<tail fn {}>", self.0.name)
    }
}

impl fmt::Debug for TailFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailFn")
            .field("name", &self.0.name)
            .field("feature_set", &self.0.feature_set)
            .finish()
    }
}
