//! Resolution engines
//!
//! Both resolvers drive a deferred call to a concrete value in a tight
//! synchronous loop with O(1) host-stack growth per logical step. The
//! basic trampoline only follows return-value deferral; the nested stack
//! machine additionally resolves deferred calls embedded anywhere in an
//! argument tree. Each top-level resolution owns its own state — nothing is
//! shared across concurrent resolutions.

mod basic;
mod nested;

use crate::call::DeferredCall;
use crate::value::{RuntimeError, Value};

/// Drive a deferred call to a concrete value, choosing the engine by the
/// call's feature set.
pub(crate) fn resolve(initial: DeferredCall) -> Result<Value, RuntimeError> {
    if initial.feature_set().resolves_nested_calls() {
        nested::resolve(initial)
    } else {
        basic::resolve(initial)
    }
}
